use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

use omn_api::auth::SeedUser;

const DEV_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub seed_file: Option<PathBuf>,
    pub token_ttl_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("OMN_JWT_SECRET").unwrap_or_else(|_| {
            warn!("OMN_JWT_SECRET not set, using the development secret");
            DEV_SECRET.into()
        });

        Ok(Self {
            jwt_secret,
            db_path: env::var("OMN_DB_PATH").unwrap_or_else(|_| "omn.db".into()).into(),
            host: env::var("OMN_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("OMN_PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()
                .context("OMN_PORT must be a port number")?,
            seed_file: env::var("OMN_SEED_FILE").ok().map(PathBuf::from),
            token_ttl_days: env::var("OMN_TOKEN_TTL_DAYS")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .context("OMN_TOKEN_TTL_DAYS must be a whole number of days")?,
        })
    }

    /// Accounts from the seed file, or none when no file is configured.
    pub fn load_seed_users(&self) -> Result<Vec<SeedUser>> {
        let Some(path) = &self.seed_file else {
            return Ok(Vec::new());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading seed file {}", path.display()))?;
        parse_seed_users(&raw).with_context(|| format!("parsing seed file {}", path.display()))
    }
}

fn parse_seed_users(raw: &str) -> Result<Vec<SeedUser>> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_file_format() {
        let users = parse_seed_users(
            r#"[{ "name": "Alice", "role": "KKG_SOCIAL", "password": "OMNKKG" },
                { "name": "Olivia", "role": "Owner", "password": "hunter2" }]"#,
        )
        .unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].role, "Owner");
        assert!(parse_seed_users(r#"{ "name": "Alice" }"#).is_err());
    }
}
