mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn direct_messages_form_one_thread() {
    let app = TestApp::new(&[("Alice", "KKG_SOCIAL"), ("Dan", "DKE_SOCIAL")]);
    let alice = app.login("Alice", "KKG").await;
    let dan = app.login("Dan", "DKE").await;

    let (_, users) = app.request("GET", "/users", Some(&alice), None).await;
    let dan_id = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["name"] == "Dan")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, thread) = app
        .request("POST", "/dms", Some(&alice), Some(json!({ "user_id": dan_id })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(thread["with"], dan_id.as_str());

    // Starting again reuses the thread.
    let (status, _) = app
        .request("POST", "/dms", Some(&alice), Some(json!({ "user_id": dan_id })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/dms/{}/messages", dan_id);
    let (status, _) = app
        .request("POST", &uri, Some(&alice), Some(json!({ "text": "see you saturday" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, messages) = app.request("GET", &uri, Some(&alice), None).await;
    let texts: Vec<&str> = messages
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["Chat started between Alice and Dan", "see you saturday"]);

    let (_, threads) = app.request("GET", "/dms", Some(&dan), None).await;
    assert_eq!(threads.as_array().unwrap().len(), 1);

    let (status, _) = app
        .request("DELETE", &format!("/dms/{}", dan_id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, threads) = app.request("GET", "/dms", Some(&dan), None).await;
    assert!(threads.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn cannot_message_yourself() {
    let app = TestApp::new(&[("Alice", "KKG_SOCIAL")]);
    let (status, login) = app
        .request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "name": "Alice", "house": "KKG", "password": common::PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = login["token"].as_str().unwrap();

    let (status, body) = app
        .request("POST", "/dms", Some(token), Some(json!({ "user_id": login["user_id"] })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "you can't message yourself");
}

#[tokio::test]
async fn groups_are_members_only() {
    let app = TestApp::new(&[
        ("Alice", "KKG_SOCIAL"),
        ("Dan", "DKE_SOCIAL"),
        ("Ava", "AXO_SOCIAL"),
    ]);
    let alice = app.login("Alice", "KKG").await;
    let dan = app.login("Dan", "DKE").await;
    let ava = app.login("Ava", "AXO").await;

    let (_, users) = app.request("GET", "/users", Some(&alice), None).await;
    let dan_id = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["name"] == "Dan")
        .unwrap()["id"]
        .clone();

    let (status, group) = app
        .request(
            "POST",
            "/groups",
            Some(&alice),
            Some(json!({ "name": "Socials", "members": [dan_id] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{group}");
    assert_eq!(group["members"].as_array().unwrap().len(), 2);
    let group_id = group["id"].as_str().unwrap();
    let messages_uri = format!("/groups/{}/messages", group_id);

    let (status, _) = app
        .request("POST", &messages_uri, Some(&dan), Some(json!({ "text": "hello" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.request("GET", &messages_uri, Some(&ava), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, groups) = app.request("GET", "/groups", Some(&ava), None).await;
    assert!(groups.as_array().unwrap().is_empty());

    let (_, messages) = app.request("GET", &messages_uri, Some(&alice), None).await;
    assert_eq!(messages[0]["text"], "hello");

    let (status, _) = app
        .request("DELETE", &format!("/groups/{}", group_id), Some(&dan), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, groups) = app.request("GET", "/groups", Some(&alice), None).await;
    assert!(groups.as_array().unwrap().is_empty());
}
