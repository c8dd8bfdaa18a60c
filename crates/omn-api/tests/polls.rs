mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::TestApp;
use serde_json::json;
use uuid::Uuid;

use omn_types::House;
use omn_types::models::Poll;

#[tokio::test]
async fn creator_house_is_always_allowed() {
    let app = TestApp::new(&[("Alice", "KKG_SOCIAL")]);
    let kkg = app.login("Alice", "KKG").await;

    let (status, poll) = app
        .request(
            "POST",
            "/polls",
            Some(&kkg),
            Some(json!({ "question": "Theme?", "options": ["Neon", "Toga"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{poll}");
    assert_eq!(poll["houses_allowed"], json!(["KKG"]));
    assert_eq!(poll["votes"], json!({ "Neon": 0, "Toga": 0 }));

    let (_, poll) = app
        .request(
            "POST",
            "/polls",
            Some(&kkg),
            Some(json!({
                "question": "Date?",
                "options": ["Fri", "Sat"],
                "houses_allowed": ["AXO"],
            })),
        )
        .await;
    assert_eq!(poll["houses_allowed"], json!(["AXO", "KKG"]));
}

#[tokio::test]
async fn device_vote_moves_instead_of_growing() {
    let app = TestApp::new(&[
        ("Alice", "KKG_SOCIAL"),
        ("Kara", "KKG_SISTER"),
        ("Amy", "AXO_SISTER"),
    ]);
    let chair = app.login("Alice", "KKG").await;
    let sister = app.login("Kara", "KKG").await;
    let outsider = app.login("Amy", "AXO").await;

    let (_, poll) = app
        .request(
            "POST",
            "/polls",
            Some(&chair),
            Some(json!({
                "question": "Theme?",
                "options": ["Neon", "Toga"],
                "houses_allowed": ["KKG"],
            })),
        )
        .await;
    let vote_uri = format!("/polls/{}/vote", poll["id"].as_str().unwrap());

    let (status, body) = app
        .request(
            "POST",
            &vote_uri,
            Some(&sister),
            Some(json!({ "option": "Neon", "device_id": "phone-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["votes"], json!({ "Neon": 1, "Toga": 0 }));

    let (status, body) = app
        .request(
            "POST",
            &vote_uri,
            Some(&sister),
            Some(json!({ "option": "Neon", "device_id": "phone-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already voted for this option");

    let (status, body) = app
        .request(
            "POST",
            &vote_uri,
            Some(&sister),
            Some(json!({ "option": "Toga", "device_id": "phone-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["votes"], json!({ "Neon": 0, "Toga": 1 }));
    assert_eq!(body["voted_option"], "Toga");

    let (_, list) = app
        .request("GET", "/polls?device_id=phone-1", Some(&sister), None)
        .await;
    assert_eq!(list[0]["voted_option"], "Toga");

    let (_, list) = app.request("GET", "/polls", Some(&outsider), None).await;
    assert!(list.as_array().unwrap().is_empty());
    let (status, _) = app
        .request(
            "POST",
            &vote_uri,
            Some(&outsider),
            Some(json!({ "option": "Neon", "device_id": "phone-2" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn polls_need_two_distinct_options() {
    let app = TestApp::new(&[("Alice", "KKG_SOCIAL"), ("Kara", "KKG_SISTER")]);
    let chair = app.login("Alice", "KKG").await;
    let sister = app.login("Kara", "KKG").await;

    for options in [json!(["Only"]), json!(["Neon", ""]), json!(["Neon", "Neon"])] {
        let (status, _) = app
            .request(
                "POST",
                "/polls",
                Some(&chair),
                Some(json!({ "question": "Theme?", "options": options })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, _) = app
        .request(
            "POST",
            "/polls",
            Some(&sister),
            Some(json!({ "question": "Theme?", "options": ["a", "b"] })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn allowed_chairs_and_admins_remove_polls() {
    let app = TestApp::new(&[
        ("Alice", "KKG_SOCIAL"),
        ("Ava", "AXO_SOCIAL"),
        ("Bea", "BLUECH_SOCIAL"),
    ]);
    let kkg = app.login("Alice", "KKG").await;
    let axo = app.login("Ava", "AXO").await;
    let admin = app.login("Bea", "SIG CHI").await;

    let (_, poll) = app
        .request(
            "POST",
            "/polls",
            Some(&kkg),
            Some(json!({ "question": "Theme?", "options": ["a", "b"] })),
        )
        .await;
    let uri = format!("/polls/{}", poll["id"].as_str().unwrap());

    let (status, _) = app.request("DELETE", &uri, Some(&axo), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.request("DELETE", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = app.request("GET", "/polls", Some(&kkg), None).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn expired_polls_are_hidden_and_refuse_votes() {
    let app = TestApp::new(&[("Alice", "KKG_SOCIAL"), ("Kara", "KKG_SISTER")]);
    let sister = app.login("Kara", "KKG").await;
    let creator = app
        .state
        .db
        .get_user_by_name("Alice")
        .unwrap()
        .unwrap()
        .into_user()
        .unwrap();

    let opened = Utc::now() - Duration::hours(30);
    let poll = Poll {
        id: Uuid::new_v4(),
        question: "Theme?".into(),
        options: vec!["Neon".into(), "Toga".into()],
        votes: [("Neon".to_string(), 0), ("Toga".to_string(), 0)].into(),
        expires_at: opened + Duration::hours(24),
        houses_allowed: vec![House::Kkg],
        created_by: creator.id,
        created_at: opened,
    };
    app.state.db.insert_poll(&poll).unwrap();

    let (status, list) = app.request("GET", "/polls", Some(&sister), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(list.as_array().unwrap().is_empty(), "{list}");

    let (status, body) = app
        .request(
            "POST",
            &format!("/polls/{}/vote", poll.id),
            Some(&sister),
            Some(json!({ "option": "Neon", "device_id": "phone-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "poll has expired");
}
