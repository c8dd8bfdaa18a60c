use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use omn_types::api::{CreateGroupRequest, DmThreadResponse, SendMessageRequest, StartDmRequest};
use omn_types::events::GatewayEvent;
use omn_types::messaging::{DmThread, derive_dm_threads};
use omn_types::models::{GroupChat, Message};
use omn_types::session::Session;

use crate::calendar::non_blank;
use crate::error::ApiError;
use crate::state::{AppState, run_db};

const MAX_MESSAGE_LEN: usize = 4000;

// -- Direct messages --

/// `GET /dms`: the caller's direct conversations in first-seen order.
pub async fn list_dms(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<DmThreadResponse>>, ApiError> {
    let me = session.user_id;
    let sets = run_db(&state, move |db| db.dm_recipient_sets(me)).await?;

    Ok(Json(
        derive_dm_threads(me, sets)
            .into_iter()
            .map(|thread| thread_response(&thread, me))
            .collect(),
    ))
}

/// `POST /dms`: open a conversation. The first time, a starter message is
/// posted so the thread shows up for both members.
pub async fn start_dm(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<StartDmRequest>,
) -> Result<(StatusCode, Json<DmThreadResponse>), ApiError> {
    let thread = dm_thread(&session, req.user_id)?;
    let other = req.user_id;
    let other_name = run_db(&state, move |db| db.get_user_by_id(other))
        .await?
        .map(|row| row.name)
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    let key = thread.key();
    let starter = Message {
        id: Uuid::new_v4(),
        sender: session.user_id,
        group_id: None,
        recipients: thread.members.to_vec(),
        text: format!("Chat started between {} and {}", session.name, other_name),
        timestamp: Utc::now(),
    };

    let created = run_db(&state, move |db| db.open_dm_thread(&key, &starter)).await?;

    let status = if created {
        info!("{} started a conversation with {}", session.name, other_name);
        state.dispatcher.broadcast(GatewayEvent::MessagesChanged {
            group_id: None,
            members: thread.members.to_vec(),
        });
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(thread_response(&thread, session.user_id))))
}

pub async fn dm_messages(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let key = dm_thread(&session, user_id)?.key();
    let messages = run_db(&state, move |db| db.dm_messages(&key)).await?;
    Ok(Json(messages))
}

pub async fn send_dm(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let thread = dm_thread(&session, user_id)?;
    let text = message_text(&req.text)?;

    if run_db(&state, move |db| db.get_user_by_id(user_id)).await?.is_none() {
        return Err(ApiError::not_found("user not found"));
    }

    let message = Message {
        id: Uuid::new_v4(),
        sender: session.user_id,
        group_id: None,
        recipients: thread.members.to_vec(),
        text,
        timestamp: Utc::now(),
    };

    let stored = message.clone();
    let key = thread.key();
    run_db(&state, move |db| db.insert_message(&stored, Some(&key))).await?;

    state.dispatcher.broadcast(GatewayEvent::MessagesChanged {
        group_id: None,
        members: thread.members.to_vec(),
    });

    Ok((StatusCode::CREATED, Json(message)))
}

/// `DELETE /dms/{user_id}`: removes the whole conversation for both members.
pub async fn delete_dm(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let thread = dm_thread(&session, user_id)?;
    let key = thread.key();
    let deleted = run_db(&state, move |db| db.delete_dm_thread(&key)).await?;
    if deleted == 0 {
        return Err(ApiError::not_found("conversation not found"));
    }

    info!("{} deleted a conversation ({} messages)", session.name, deleted);
    state.dispatcher.broadcast(GatewayEvent::MessagesChanged {
        group_id: None,
        members: thread.members.to_vec(),
    });

    Ok(StatusCode::NO_CONTENT)
}

fn dm_thread(session: &Session, other: Uuid) -> Result<DmThread, ApiError> {
    if other == session.user_id {
        return Err(ApiError::validation("you can't message yourself"));
    }
    Ok(DmThread::between(session.user_id, other))
}

fn thread_response(thread: &DmThread, me: Uuid) -> DmThreadResponse {
    DmThreadResponse {
        members: thread.members.to_vec(),
        with: thread.other(me),
    }
}

fn message_text(raw: &str) -> Result<String, ApiError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ApiError::validation("message is empty"));
    }
    if text.chars().count() > MAX_MESSAGE_LEN {
        return Err(ApiError::validation("message is too long"));
    }
    Ok(text.to_string())
}

// -- Group chats --

pub async fn list_groups(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<GroupChat>>, ApiError> {
    let me = session.user_id;
    let groups = run_db(&state, move |db| db.list_group_chats(me)).await?;
    Ok(Json(groups))
}

/// `POST /groups`: the creator is always a member.
pub async fn create_group(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupChat>), ApiError> {
    let mut members = vec![session.user_id];
    for id in req.members {
        if !members.contains(&id) {
            members.push(id);
        }
    }
    if members.len() < 2 {
        return Err(ApiError::validation("a group needs at least one other member"));
    }

    let group = GroupChat {
        id: Uuid::new_v4(),
        name: non_blank(req.name),
        members,
        created_at: Utc::now(),
    };

    let stored = group.clone();
    let unknown = run_db(&state, move |db| {
        for &id in &stored.members {
            if db.get_user_by_id(id)?.is_none() {
                return Ok(Some(id));
            }
        }
        db.insert_group_chat(&stored)?;
        Ok(None)
    })
    .await?;
    if let Some(id) = unknown {
        return Err(ApiError::validation(format!("unknown user {}", id)));
    }

    info!(
        "{} created group {} with {} members",
        session.name,
        group.id,
        group.members.len()
    );
    state.dispatcher.broadcast(GatewayEvent::GroupChatsChanged {
        members: group.members.clone(),
    });

    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn group_messages(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, ApiError> {
    member_group(&state, &session, group_id).await?;
    let messages = run_db(&state, move |db| db.group_messages(group_id)).await?;
    Ok(Json(messages))
}

pub async fn send_group_message(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let text = message_text(&req.text)?;
    let group = member_group(&state, &session, group_id).await?;

    let message = Message {
        id: Uuid::new_v4(),
        sender: session.user_id,
        group_id: Some(group_id),
        recipients: Vec::new(),
        text,
        timestamp: Utc::now(),
    };

    let stored = message.clone();
    run_db(&state, move |db| db.insert_message(&stored, None)).await?;

    state.dispatcher.broadcast(GatewayEvent::MessagesChanged {
        group_id: Some(group_id),
        members: group.members,
    });

    Ok((StatusCode::CREATED, Json(message)))
}

/// `DELETE /groups/{id}`: removes the group and its messages.
pub async fn delete_group(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(group_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let group = member_group(&state, &session, group_id).await?;
    run_db(&state, move |db| db.delete_group_chat(group_id)).await?;

    info!("{} deleted group {}", session.name, group_id);
    state.dispatcher.broadcast(GatewayEvent::GroupChatsChanged {
        members: group.members.clone(),
    });
    state.dispatcher.broadcast(GatewayEvent::MessagesChanged {
        group_id: Some(group_id),
        members: group.members,
    });

    Ok(StatusCode::NO_CONTENT)
}

async fn member_group(
    state: &AppState,
    session: &Session,
    group_id: Uuid,
) -> Result<GroupChat, ApiError> {
    let group = run_db(state, move |db| db.get_group_chat(group_id))
        .await?
        .ok_or_else(|| ApiError::not_found("group not found"))?;

    if !group.has_member(session.user_id) {
        warn!("{} is not a member of group {}", session.user_id, group_id);
        return Err(ApiError::forbidden("not a member of this group"));
    }
    Ok(group)
}
