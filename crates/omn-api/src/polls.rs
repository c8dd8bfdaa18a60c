use std::collections::BTreeMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use omn_db::VoteOutcome;
use omn_types::access::{
    can_create_poll, can_remove_poll, can_see_poll, can_vote, houses_allowed_for_new_poll,
};
use omn_types::api::{CreatePollRequest, PollQuery, PollView, VoteRequest};
use omn_types::events::GatewayEvent;
use omn_types::models::Poll;
use omn_types::session::Session;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

/// Polls stay open for a day.
const POLL_LIFETIME_HOURS: i64 = 24;

/// `GET /polls[?device_id=..]`: unexpired polls open to the caller's house,
/// newest first. With a device id, each poll carries that device's vote.
pub async fn list_polls(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<PollQuery>,
) -> Result<Json<Vec<PollView>>, ApiError> {
    let now = Utc::now();
    let role = session.role;
    let device_id = query.device_id.filter(|d| !d.trim().is_empty());

    let views = run_db(&state, move |db| {
        let mut views = Vec::new();
        for poll in db.list_polls()? {
            if !poll.is_active(now) || !can_see_poll(role, &poll) {
                continue;
            }
            let voted_option = match &device_id {
                Some(device) => db.get_device_vote(poll.id, device)?,
                None => None,
            };
            views.push(PollView { poll, voted_option });
        }
        Ok(views)
    })
    .await?;

    Ok(Json(views))
}

pub async fn create_poll(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreatePollRequest>,
) -> Result<(StatusCode, Json<PollView>), ApiError> {
    if !can_create_poll(session.role) {
        warn!("{} ({}) may not create polls", session.name, session.role);
        return Err(ApiError::forbidden(
            "only social chairs and administrators can create polls",
        ));
    }

    let question = req.question.trim().to_string();
    let options = poll_options(&req.options)?;
    if question.is_empty() {
        return Err(ApiError::validation("please enter a question and all options"));
    }

    let now = Utc::now();
    let poll = Poll {
        id: Uuid::new_v4(),
        question,
        votes: options.iter().map(|o| (o.clone(), 0)).collect::<BTreeMap<_, _>>(),
        options,
        expires_at: now + Duration::hours(POLL_LIFETIME_HOURS),
        houses_allowed: houses_allowed_for_new_poll(session.role, &req.houses_allowed),
        created_by: session.user_id,
        created_at: now,
    };

    let stored = poll.clone();
    run_db(&state, move |db| db.insert_poll(&stored)).await?;

    info!(
        "{} opened poll {} for {} houses",
        session.name,
        poll.id,
        poll.houses_allowed.len()
    );
    state.dispatcher.broadcast(GatewayEvent::PollsChanged);

    Ok((
        StatusCode::CREATED,
        Json(PollView {
            poll,
            voted_option: None,
        }),
    ))
}

/// Trimmed options; every one non-empty and distinct, at least two.
fn poll_options(raw: &[String]) -> Result<Vec<String>, ApiError> {
    let options: Vec<String> = raw.iter().map(|o| o.trim().to_string()).collect();
    if options.len() < 2 || options.iter().any(|o| o.is_empty()) {
        return Err(ApiError::validation(
            "please enter a question and at least two options",
        ));
    }
    for (i, option) in options.iter().enumerate() {
        if options[..i].contains(option) {
            return Err(ApiError::validation(format!("duplicate option '{}'", option)));
        }
    }
    Ok(options)
}

pub async fn vote(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(poll_id): Path<Uuid>,
    Json(req): Json<VoteRequest>,
) -> Result<Json<PollView>, ApiError> {
    let device_id = req.device_id.trim().to_string();
    if device_id.is_empty() {
        return Err(ApiError::validation("device_id is required"));
    }

    let poll = run_db(&state, move |db| db.get_poll(poll_id))
        .await?
        .ok_or_else(|| ApiError::not_found("poll not found"))?;

    if !can_vote(session.role, &poll) {
        return Err(ApiError::forbidden("your house is not part of this poll"));
    }
    if !poll.is_active(Utc::now()) {
        return Err(ApiError::conflict("poll has expired"));
    }
    if !poll.has_option(&req.option) {
        return Err(ApiError::validation(format!("'{}' is not an option", req.option)));
    }

    let option = req.option.clone();
    let device = device_id.clone();
    let (outcome, poll) = run_db(&state, move |db| {
        let outcome = db.record_vote(poll_id, &device, &option)?;
        let poll = db
            .get_poll(poll_id)?
            .ok_or_else(|| anyhow::anyhow!("poll {} vanished while voting", poll_id))?;
        Ok((outcome, poll))
    })
    .await?;

    match outcome {
        VoteOutcome::Unchanged => {
            return Err(ApiError::conflict("already voted for this option"));
        }
        VoteOutcome::Recorded => info!("{} voted on poll {}", session.name, poll_id),
        VoteOutcome::Moved { from } => {
            info!("{} moved their vote on poll {} from '{}'", session.name, poll_id, from)
        }
    }
    state.dispatcher.broadcast(GatewayEvent::PollsChanged);

    Ok(Json(PollView {
        poll,
        voted_option: Some(req.option),
    }))
}

pub async fn delete_poll(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(poll_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let poll = run_db(&state, move |db| db.get_poll(poll_id))
        .await?
        .ok_or_else(|| ApiError::not_found("poll not found"))?;

    if !can_remove_poll(session.role, &poll) {
        warn!("{} ({}) may not remove poll {}", session.name, session.role, poll_id);
        return Err(ApiError::forbidden(
            "only administrators or socials of an allowed house can remove polls",
        ));
    }

    run_db(&state, move |db| db.delete_poll(poll_id)).await?;

    info!("{} removed poll {}", session.name, poll_id);
    state.dispatcher.broadcast(GatewayEvent::PollsChanged);

    Ok(StatusCode::NO_CONTENT)
}
