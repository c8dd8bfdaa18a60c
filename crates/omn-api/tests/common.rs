use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::Value;
use tower::ServiceExt;

use omn_api::auth::{SeedUser, seed_users};
use omn_api::{AppState, AppStateInner};
use omn_db::Database;
use omn_gateway::Dispatcher;

pub const PASSWORD: &str = "OMNKKG";

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Fresh in-memory app with one account per `(name, role)`, all sharing
    /// [`PASSWORD`].
    pub fn new(users: &[(&str, &str)]) -> Self {
        let db = Database::open_in_memory().unwrap();
        let seeds: Vec<SeedUser> = users
            .iter()
            .map(|(name, role)| SeedUser {
                name: name.to_string(),
                role: role.to_string(),
                password: PASSWORD.to_string(),
            })
            .collect();
        seed_users(&db, &seeds).unwrap();

        let state: AppState = Arc::new(AppStateInner {
            db,
            jwt_secret: "test-secret".into(),
            token_ttl_days: 1,
            dispatcher: Dispatcher::new(),
        });

        Self {
            router: omn_api::router(state.clone()),
            state,
        }
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn login(&self, name: &str, house: &str) -> String {
        let (status, body) = self
            .request(
                "POST",
                "/auth/login",
                None,
                Some(serde_json::json!({ "name": name, "house": house, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }
}
