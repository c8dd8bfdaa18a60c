use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use omn_types::House;
use omn_types::access::{can_create_event, can_remove_event, can_see_event, event_host};
use omn_types::api::{CreateEventRequest, EventQuery};
use omn_types::events::GatewayEvent;
use omn_types::models::{Event, EventType};
use omn_types::session::Session;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

/// `GET /events[?date=YYYY-MM-DD]`: events the caller's house hosts or is
/// paired on, ordered by date.
pub async fn list_events(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<EventQuery>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let events = run_db(&state, move |db| db.list_events(query.date)).await?;

    Ok(Json(
        events
            .into_iter()
            .filter(|ev| can_see_event(session.role, ev))
            .collect(),
    ))
}

pub async fn create_event(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    if !can_create_event(session.role) {
        warn!("{} ({}) may not add events", session.name, session.role);
        return Err(ApiError::forbidden(
            "only fraternity social chairs and administrators can add events",
        ));
    }
    let host = event_host(session.role, req.host_house)
        .ok_or_else(|| ApiError::validation("host house must be a fraternity"))?;

    let theme = non_blank(req.theme);
    let name = non_blank(req.name);
    let pairs = paired_houses(host, &req.pairs);

    match req.event_type {
        EventType::Darty | EventType::NightParty => {
            if theme.is_none() || pairs.is_empty() {
                return Err(ApiError::validation(
                    "parties need a theme and at least one paired house",
                ));
            }
        }
        EventType::Philanthropy => {
            if name.is_none() {
                return Err(ApiError::validation("philanthropy events need a name"));
            }
        }
    }

    let event = Event {
        id: Uuid::new_v4(),
        event_type: req.event_type,
        date: req.date,
        theme,
        name,
        description: non_blank(req.description),
        time: req.time,
        host_house: host,
        pairs,
        created_by: session.user_id,
        created_at: Utc::now(),
    };

    let stored = event.clone();
    let inserted = run_db(&state, move |db| db.insert_event(&stored)).await?;
    if !inserted {
        return Err(ApiError::conflict(format!(
            "a {} already exists on {}",
            event.event_type.as_str(),
            event.date
        )));
    }

    info!(
        "{} added {} on {} hosted by {}",
        session.name,
        event.event_type.as_str(),
        event.date,
        event.host_house
    );
    state.dispatcher.broadcast(GatewayEvent::EventsChanged);

    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(event_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let event = run_db(&state, move |db| db.get_event(event_id))
        .await?
        .ok_or_else(|| ApiError::not_found("event not found"))?;

    if !can_see_event(session.role, &event) {
        return Err(ApiError::not_found("event not found"));
    }
    if !can_remove_event(session.role, &event) {
        warn!("{} ({}) may not remove event {}", session.name, session.role, event_id);
        return Err(ApiError::forbidden("only the host's social chair can remove this event"));
    }

    run_db(&state, move |db| db.delete_event(event_id)).await?;

    info!("{} removed event {}", session.name, event_id);
    state.dispatcher.broadcast(GatewayEvent::EventsChanged);

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Requested pairs without duplicates and without the host itself.
fn paired_houses(host: House, requested: &[House]) -> Vec<House> {
    let mut pairs = Vec::with_capacity(requested.len());
    for &house in requested {
        if house != host && !pairs.contains(&house) {
            pairs.push(house);
        }
    }
    pairs
}
