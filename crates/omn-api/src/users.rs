use axum::{Extension, Json, extract::State};
use tracing::info;

use omn_db::RenameOutcome;
use omn_types::api::UpdateProfileRequest;
use omn_types::models::User;
use omn_types::session::Session;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

const MAX_NAME_LEN: usize = 32;

/// `GET /users`: everyone's id, name and role. Credentials never leave the DB.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(_session): Extension<Session>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = run_db(&state, |db| db.list_users()).await?;
    Ok(Json(users))
}

/// `PATCH /users/me`. The token keeps the old name until the next login.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::validation(format!(
            "name must be 1 to {} characters",
            MAX_NAME_LEN
        )));
    }

    let me = session.user_id;
    let new_name = name.clone();
    match run_db(&state, move |db| db.rename_user(me, &new_name)).await? {
        RenameOutcome::Renamed => {}
        RenameOutcome::NameTaken => return Err(ApiError::conflict("that name is taken")),
        RenameOutcome::NoSuchUser => return Err(ApiError::not_found("user not found")),
    }

    info!("{} is now known as {}", session.name, name);

    Ok(Json(User {
        id: me,
        name,
        role: session.role,
    }))
}
