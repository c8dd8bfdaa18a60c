use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use omn_types::session::Session;

use crate::auth::decode_token;
use crate::error::ApiError;
use crate::state::AppState;

/// Validate the bearer JWT and hand the handlers a [`Session`].
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?;

    let claims = decode_token(&state.jwt_secret, token).map_err(|e| {
        debug!("Rejected token: {}", e);
        ApiError::Unauthorized("invalid or expired token".into())
    })?;

    req.extensions_mut().insert(Session::from(claims));
    Ok(next.run(req).await)
}
