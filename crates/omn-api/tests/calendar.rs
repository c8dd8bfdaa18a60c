mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::{Value, json};

fn party() -> Value {
    json!({
        "event_type": "Night Party",
        "date": "2026-10-31",
        "theme": "Neon",
        "time": { "start": "22:00:00", "end": "02:00:00" },
        "pairs": ["KKG"]
    })
}

fn visible_count(body: &Value) -> usize {
    body.as_array().unwrap().len()
}

#[tokio::test]
async fn events_are_visible_to_host_pairs_and_admins() {
    let app = TestApp::new(&[
        ("Olivia", "OWNER"),
        ("Alice", "KKG_SOCIAL"),
        ("Ava", "AXO_SOCIAL"),
    ]);
    let owner = app.login("Olivia", "SIG_CHI").await;
    let kkg = app.login("Alice", "KKG").await;
    let axo = app.login("Ava", "AXO").await;

    let (status, created) = app.request("POST", "/events", Some(&owner), Some(party())).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["host_house"], "SIG_CHI");
    assert_eq!(created["pairs"], json!(["KKG"]));

    let (_, body) = app.request("GET", "/events", Some(&kkg), None).await;
    assert_eq!(visible_count(&body), 1);
    let (_, body) = app.request("GET", "/events", Some(&axo), None).await;
    assert_eq!(visible_count(&body), 0);
    let (_, body) = app.request("GET", "/events?date=2026-10-31", Some(&owner), None).await;
    assert_eq!(visible_count(&body), 1);
    let (_, body) = app.request("GET", "/events?date=2026-11-01", Some(&owner), None).await;
    assert_eq!(visible_count(&body), 0);
}

#[tokio::test]
async fn only_fraternity_chairs_and_admins_add_events() {
    let app = TestApp::new(&[("Alice", "KKG_SOCIAL"), ("Dan", "DKE_SOCIAL"), ("Ben", "BROTHER")]);
    let kkg = app.login("Alice", "KKG").await;
    let dke = app.login("Dan", "DKE").await;
    let brother = app.login("Ben", "SIG_CHI").await;

    let (status, _) = app.request("POST", "/events", Some(&kkg), Some(party())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.request("POST", "/events", Some(&brother), Some(party())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A chair always hosts as their own house.
    let mut body = party();
    body["host_house"] = json!("SAE");
    let (status, created) = app.request("POST", "/events", Some(&dke), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["host_house"], "DKE");
}

#[tokio::test]
async fn one_event_of_a_type_per_day() {
    let app = TestApp::new(&[("Dan", "DKE_SOCIAL")]);
    let dke = app.login("Dan", "DKE").await;

    let (status, _) = app.request("POST", "/events", Some(&dke), Some(party())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app.request("POST", "/events", Some(&dke), Some(party())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "a Night Party already exists on 2026-10-31");

    let darty = json!({
        "event_type": "Darty",
        "date": "2026-10-31",
        "theme": "Beach",
        "pairs": ["DG"]
    });
    let (status, _) = app.request("POST", "/events", Some(&dke), Some(darty)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn parties_need_theme_and_pairs() {
    let app = TestApp::new(&[("Dan", "DKE_SOCIAL")]);
    let dke = app.login("Dan", "DKE").await;

    let no_pairs = json!({ "event_type": "Darty", "date": "2026-11-01", "theme": "Beach" });
    let (status, _) = app.request("POST", "/events", Some(&dke), Some(no_pairs)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let philanthropy = json!({ "event_type": "Philanthropy", "date": "2026-11-01" });
    let (status, _) = app.request("POST", "/events", Some(&dke), Some(philanthropy)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let philanthropy = json!({
        "event_type": "Philanthropy",
        "date": "2026-11-01",
        "name": "Pancake breakfast"
    });
    let (status, _) = app.request("POST", "/events", Some(&dke), Some(philanthropy)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn host_chair_removes_event() {
    let app = TestApp::new(&[("Dan", "DKE_SOCIAL"), ("Alice", "KKG_SOCIAL")]);
    let dke = app.login("Dan", "DKE").await;
    let kkg = app.login("Alice", "KKG").await;

    let (_, created) = app.request("POST", "/events", Some(&dke), Some(party())).await;
    let uri = format!("/events/{}", created["id"].as_str().unwrap());

    let (status, _) = app.request("DELETE", &uri, Some(&kkg), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.request("DELETE", &uri, Some(&dke), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.request("DELETE", &uri, Some(&dke), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
