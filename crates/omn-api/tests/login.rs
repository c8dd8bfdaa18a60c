mod common;

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use common::{PASSWORD, TestApp};
use serde_json::json;

#[tokio::test]
async fn member_logs_in_with_loose_house_text() {
    let app = TestApp::new(&[("Alice", "KKG_SOCIAL")]);

    let (status, body) = app
        .request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "name": " alice ", "house": "kkg", "password": PASSWORD })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Alice");
    assert_eq!(body["role"], "KKG_SOCIAL");
    assert_eq!(body["house"], "KKG");
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn wrong_house_is_rejected() {
    let app = TestApp::new(&[("Alice", "KKG_SOCIAL")]);

    let (status, body) = app
        .request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "name": "Alice", "house": "APHI", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not in this house");

    let (status, body) = app
        .request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "name": "Alice", "house": "Hogwarts", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unrecognized house");
}

#[tokio::test]
async fn bad_credentials_do_not_say_which_part_failed() {
    let app = TestApp::new(&[("Alice", "KKG_SOCIAL")]);

    for (name, password) in [("Alice", "wrong"), ("Nobody", PASSWORD)] {
        let (status, body) = app
            .request(
                "POST",
                "/auth/login",
                None,
                Some(json!({ "name": name, "house": "KKG", "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid name or password");
    }
}

#[tokio::test]
async fn unknown_names_cost_as_much_as_wrong_passwords() {
    let app = TestApp::new(&[("Alice", "KKG_SOCIAL")]);

    let mut elapsed = [Duration::ZERO; 2];
    for _ in 0..3 {
        for (slot, name) in ["Alice", "Nobody"].into_iter().enumerate() {
            let started = Instant::now();
            let (status, _) = app
                .request(
                    "POST",
                    "/auth/login",
                    None,
                    Some(json!({ "name": name, "house": "KKG", "password": "wrong" })),
                )
                .await;
            elapsed[slot] += started.elapsed();
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
    }

    let [wrong_password, unknown_name] = elapsed;
    assert!(
        unknown_name * 4 > wrong_password && wrong_password * 4 > unknown_name,
        "wrong password took {wrong_password:?}, unknown name took {unknown_name:?}"
    );
}

#[tokio::test]
async fn administrators_log_in_through_sig_chi() {
    let app = TestApp::new(&[("Olivia", "Owner")]);
    app.login("Olivia", "Sig Chi").await;
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = TestApp::new(&[]);

    let (status, _) = app.request("GET", "/events", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.request("GET", "/polls", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn users_can_rename_themselves() {
    let app = TestApp::new(&[("Alice", "KKG_SOCIAL"), ("Ava", "AXO_SOCIAL")]);
    let token = app.login("Alice", "KKG").await;

    let (status, body) = app
        .request("PATCH", "/users/me", Some(&token), Some(json!({ "name": "Ava" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (status, body) = app
        .request("PATCH", "/users/me", Some(&token), Some(json!({ "name": "Allie" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Allie");

    let (_, users) = app.request("GET", "/users", Some(&token), None).await;
    let names: Vec<&str> = users
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Allie", "Ava"]);
    assert!(users[0].get("password_hash").is_none());
}
