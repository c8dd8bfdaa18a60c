use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use omn_db::Database;
use omn_types::Role;
use omn_types::api::{LoginRequest, LoginResponse};
use omn_types::directory::{Membership, house_membership, normalize_house_key};
use omn_types::session::Claims;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

const INVALID_LOGIN: &str = "invalid name or password";

/// Argon2id hash at the default cost that no password produces. Logins for
/// unknown names are verified against it.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$b21uLWxvZ2luLWR1bW15IQ\
                          $AnDfYPFN8Ei8hz7e3SbSI7SHLLTjtq3jaBsqCogntmg";

/// `POST /auth/login`. The house must be recognized, the password must verify,
/// and the user's role must belong to the entered house.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if normalize_house_key(&req.house).house().is_none() {
        return Err(ApiError::validation("unrecognized house"));
    }

    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Unauthorized(INVALID_LOGIN.into()));
    }

    let lookup = name.clone();
    let row = run_db(&state, move |db| db.get_user_by_name(&lookup)).await?;

    // Unknown names still pay for one Argon2 verification.
    let stored_hash = row.as_ref().map_or(DUMMY_HASH, |row| row.password_hash.as_str());
    let verified = password_matches(stored_hash, &req.password);

    let row = match row {
        Some(row) if verified => row,
        Some(row) => {
            warn!("Bad password for '{}'", row.name);
            return Err(ApiError::Unauthorized(INVALID_LOGIN.into()));
        }
        None => {
            warn!("Login for unknown user '{}'", name);
            return Err(ApiError::Unauthorized(INVALID_LOGIN.into()));
        }
    };

    let house = match house_membership(&req.house, &row.role) {
        Membership::Member(house) => house,
        Membership::NotMember(house) => {
            warn!("'{}' ({}) tried to log in to {}", row.name, row.role, house);
            return Err(ApiError::forbidden("not in this house"));
        }
        Membership::UnrecognizedHouse(_) => {
            return Err(ApiError::validation("unrecognized house"));
        }
    };

    let user = row.into_user()?;
    let token = create_token(
        &state.jwt_secret,
        state.token_ttl_days,
        user.id,
        &user.name,
        user.role,
    )?;

    info!("{} logged in as {} ({})", user.name, user.role, house);

    Ok(Json(LoginResponse {
        user_id: user.id,
        name: user.name,
        role: user.role,
        house,
        token,
    }))
}

pub fn create_token(
    secret: &str,
    ttl_days: i64,
    user_id: Uuid,
    name: &str,
    role: Role,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        name: name.to_string(),
        role,
        exp: (chrono::Utc::now() + chrono::Duration::days(ttl_days)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_token(secret: &str, token: &str) -> anyhow::Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

fn password_matches(stored_hash: &str, password: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Unreadable password hash: {}", e);
            false
        }
    }
}

/// Hash a password with Argon2id.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

/// One operator-provided account.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub name: String,
    /// Identifier or label, any case.
    pub role: String,
    pub password: String,
}

/// Import accounts, hashing their passwords. Names that already exist and
/// unknown roles are skipped. Returns how many accounts were created.
pub fn seed_users(db: &Database, users: &[SeedUser]) -> anyhow::Result<usize> {
    let mut created = 0;

    for user in users {
        let name = user.name.trim();
        if name.is_empty() {
            warn!("Skipping seed user with empty name");
            continue;
        }
        let Some(role) = Role::parse_loose(&user.role) else {
            warn!("Skipping seed user '{}': unknown role '{}'", name, user.role);
            continue;
        };
        if db.get_user_by_name(name)?.is_some() {
            continue;
        }

        let hash = hash_password(&user.password)?;
        db.create_user(Uuid::new_v4(), name, role.as_str(), &hash)?;
        created += 1;
    }

    if created > 0 {
        info!("Seeded {} users", created);
    }
    Ok(created)
}
