use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use omn_types::House;
use omn_types::access::{can_act_on_request, can_see_request, can_submit_request};
use omn_types::api::{EventRequestInbox, SubmitEventRequest};
use omn_types::directory::normalize_house_key;
use omn_types::events::GatewayEvent;
use omn_types::models::{Decision, EventRequest, RequestStatus};
use omn_types::session::Session;

use crate::calendar::non_blank;
use crate::error::ApiError;
use crate::state::{AppState, run_db};

/// `GET /event-requests`: the caller's inbox, newest first, with per-status
/// counts over the visible requests.
pub async fn list_requests(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<EventRequestInbox>, ApiError> {
    let all = run_db(&state, |db| db.list_event_requests()).await?;
    let requests: Vec<EventRequest> = all
        .into_iter()
        .filter(|r| can_see_request(session.role, r))
        .collect();

    Ok(Json(inbox(requests)))
}

fn inbox(requests: Vec<EventRequest>) -> EventRequestInbox {
    let count = |status| requests.iter().filter(|r| r.status == status).count();
    let (pending, approved, declined) = (
        count(RequestStatus::Pending),
        count(RequestStatus::Approved),
        count(RequestStatus::Declined),
    );
    EventRequestInbox {
        requests,
        pending,
        approved,
        declined,
    }
}

pub async fn submit_request(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<SubmitEventRequest>,
) -> Result<(StatusCode, Json<EventRequest>), ApiError> {
    if !can_submit_request(session.role) {
        warn!("{} ({}) may not submit event requests", session.name, session.role);
        return Err(ApiError::forbidden(
            "only social chairs and administrators can submit requests",
        ));
    }

    let to_house = normalize_house_key(&req.to_house)
        .house()
        .filter(|h| h.is_fraternity())
        .ok_or_else(|| ApiError::validation("to_house must name a fraternity"))?;

    let mut pairs: Vec<House> = Vec::with_capacity(req.pairs.len());
    for house in req.pairs {
        if !pairs.contains(&house) {
            pairs.push(house);
        }
    }

    let request = EventRequest {
        id: Uuid::new_v4(),
        event_type: req.event_type,
        date: req.date,
        theme: non_blank(req.theme),
        pairs,
        message: non_blank(req.message),
        from_role: session.role,
        from_house: session.house(),
        to_house,
        submitted_at: Utc::now(),
        status: RequestStatus::Pending,
        sender_id: session.user_id,
    };

    let stored = request.clone();
    run_db(&state, move |db| db.insert_event_request(&stored)).await?;

    info!(
        "{} sent a {} request to {} for {}",
        session.name,
        request.event_type.as_str(),
        to_house,
        request.date
    );
    state
        .dispatcher
        .broadcast(GatewayEvent::EventRequestsChanged { to_house });

    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn approve_request(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<EventRequest>, ApiError> {
    decide(state, session, request_id, Decision::Approve).await
}

pub async fn decline_request(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<EventRequest>, ApiError> {
    decide(state, session, request_id, Decision::Decline).await
}

async fn decide(
    state: AppState,
    session: Session,
    request_id: Uuid,
    decision: Decision,
) -> Result<Json<EventRequest>, ApiError> {
    let mut request = run_db(&state, move |db| db.get_event_request(request_id))
        .await?
        .ok_or_else(|| ApiError::not_found("request not found"))?;

    if !can_act_on_request(session.role, &request) {
        warn!(
            "{} ({}) may not decide request {} for {}",
            session.name, session.role, request_id, request.to_house
        );
        return Err(ApiError::forbidden(
            "only the receiving house's social chair can decide this request",
        ));
    }

    let next = request.status.apply(decision)?;

    // The row is only updated while still pending; a concurrent decision wins.
    let applied = run_db(&state, move |db| db.decide_event_request(request_id, next)).await?;
    if !applied {
        return Err(ApiError::conflict("request was already decided"));
    }
    request.status = next;

    info!("{} marked request {} {}", session.name, request_id, next);
    state.dispatcher.broadcast(GatewayEvent::EventRequestsChanged {
        to_house: request.to_house,
    });

    Ok(Json(request))
}
