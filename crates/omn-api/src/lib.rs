pub mod auth;
pub mod calendar;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod polls;
pub mod requests;
pub mod state;
pub mod users;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, patch, post},
};

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// HTTP API routes. Everything except login sits behind [`middleware::require_auth`].
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/events", get(calendar::list_events).post(calendar::create_event))
        .route("/events/{event_id}", delete(calendar::delete_event))
        .route(
            "/event-requests",
            get(requests::list_requests).post(requests::submit_request),
        )
        .route("/event-requests/{request_id}/approve", post(requests::approve_request))
        .route("/event-requests/{request_id}/decline", post(requests::decline_request))
        .route("/polls", get(polls::list_polls).post(polls::create_poll))
        .route("/polls/{poll_id}", delete(polls::delete_poll))
        .route("/polls/{poll_id}/vote", post(polls::vote))
        .route("/dms", get(messages::list_dms).post(messages::start_dm))
        .route(
            "/dms/{user_id}/messages",
            get(messages::dm_messages).post(messages::send_dm),
        )
        .route("/dms/{user_id}", delete(messages::delete_dm))
        .route("/groups", get(messages::list_groups).post(messages::create_group))
        .route(
            "/groups/{group_id}/messages",
            get(messages::group_messages).post(messages::send_group_message),
        )
        .route("/groups/{group_id}", delete(messages::delete_group))
        .route("/users", get(users::list_users))
        .route("/users/me", patch(users::update_me))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}
