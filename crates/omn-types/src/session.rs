use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::directory::canonical_house_for_role;
use crate::roles::{House, Role};

/// JWT claims. Shared by the REST middleware and the gateway handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub role: Role,
    pub exp: usize,
}

/// The authenticated caller, rebuilt from verified claims on every request
/// and handed to handlers explicitly. Dropping the token ends the session.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub name: String,
    pub role: Role,
}

impl Session {
    /// `None` for administrators.
    pub fn house(&self) -> Option<House> {
        canonical_house_for_role(self.role)
    }
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            name: claims.name,
            role: claims.role,
        }
    }
}
