mod common;

use axum::body::Body;
use axum::extract::ws::Utf8Bytes;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use common::test_app;
use teamchat_gateway::ConnectionRecord;
use teamchat_types::Message;
use teamchat_types::api::{SearchResponse, UserPreferences, UsersResponse};

async fn call(app: &common::TestApp, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn register_listener(app: &common::TestApp, name: &str) -> mpsc::Receiver<Utf8Bytes> {
    let (tx, rx) = mpsc::channel(16);
    app.gateway.registry().register(
        ConnectionRecord {
            id: Uuid::new_v4(),
            display_name: name.to_string(),
            remote_addr: "10.0.0.7:51234".parse().unwrap(),
            local_addr: "10.0.0.1:8080".parse().unwrap(),
        },
        tx,
    );
    rx
}

#[tokio::test]
async fn index_page_is_served() {
    let app = test_app();
    let (status, body) = call(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<h1>teamchat</h1>");
}

#[tokio::test]
async fn users_lists_registered_connections() {
    let app = test_app();
    let (status, body) = call(&app, get("/api/users")).await;
    assert_eq!(status, StatusCode::OK);
    let users: UsersResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(users.count, 0);

    let _rx = register_listener(&app, "alice");
    let (_, body) = call(&app, get("/api/users")).await;
    let users: UsersResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(users.count, 1);
    assert_eq!(users.users[0].username, "alice");
    assert_eq!(users.users[0].remote_addr, "10.0.0.7:51234");
    assert_eq!(users.users[0].local_addr, "10.0.0.1:8080");
}

#[tokio::test]
async fn broadcast_is_stamped_fanned_out_and_stored() {
    let app = test_app();
    let mut rx = register_listener(&app, "alice");

    let (status, _) = call(&app, post_json("/api/broadcast", r#"{"content":"deploy done"}"#)).await;
    assert_eq!(status, StatusCode::OK);

    let frame = rx.recv().await.unwrap();
    let msg: Message = serde_json::from_str(frame.as_str()).unwrap();
    assert_eq!(msg.content, "deploy done");
    assert_eq!(msg.username, "Anonymous");
    assert_eq!(msg.channel, "general");
    assert!(!msg.time.is_empty());

    let stored = app.db.load_recent_history(Some("general"), 10).unwrap();
    assert_eq!(stored, vec![msg]);
}

#[tokio::test]
async fn broadcast_rejects_malformed_body() {
    let app = test_app();
    let (status, _) = call(&app, post_json("/api/broadcast", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, get("/api/broadcast")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn search_requires_query() {
    let app = test_app();
    let (status, body) = call(&app, get("/api/search?channel=general")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"Query parameter 'q' is required");
}

#[tokio::test]
async fn search_without_matches_returns_empty() {
    let app = test_app();
    let (status, body) = call(&app, get("/api/search?q=foo&channel=general")).await;
    assert_eq!(status, StatusCode::OK);

    let found: SearchResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(found.count, 0);
    assert!(found.results.is_empty());
}

#[tokio::test]
async fn search_finds_messages_in_default_channel() {
    let app = test_app();
    for content in ["lunch?", "standup at ten", "lunch at noon"] {
        app.db
            .append_message(&Message {
                username: "bob".into(),
                content: content.into(),
                time: "11:00:00".into(),
                channel: "general".into(),
                ..Default::default()
            })
            .unwrap();
    }

    let (status, body) = call(&app, get("/api/search?q=lunch")).await;
    assert_eq!(status, StatusCode::OK);

    let found: SearchResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(found.count, 2);
    assert_eq!(found.results[0].content, "lunch at noon");
    assert_eq!(found.results[1].content, "lunch?");
}

#[tokio::test]
async fn search_input_is_not_interpreted_as_sql() {
    let app = test_app();
    app.db
        .append_message(&Message {
            username: "bob".into(),
            content: "secret".into(),
            channel: "private".into(),
            ..Default::default()
        })
        .unwrap();

    let uri = "/api/search?q=%25%27%20OR%20%271%27%3D%271&channel=general%27%20OR%20%271%27%3D%271";
    let (status, body) = call(&app, get(uri)).await;
    assert_eq!(status, StatusCode::OK);

    let found: SearchResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(found.count, 0);
}

#[tokio::test]
async fn preferences_require_username() {
    let app = test_app();
    let (status, body) = call(&app, get("/api/preferences")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"Username required");

    let (status, _) = call(&app, post_json("/api/preferences", r#"{"theme":"dark"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn preferences_default_then_roundtrip() {
    let app = test_app();
    let (status, body) = call(&app, get("/api/preferences?username=alice")).await;
    assert_eq!(status, StatusCode::OK);
    let prefs: UserPreferences = serde_json::from_slice(&body).unwrap();
    assert_eq!(prefs, UserPreferences::default());

    let (status, _) = call(
        &app,
        post_json(
            "/api/preferences?username=alice",
            r#"{"theme":"dark","notifications":false,"language":"pt"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, get("/api/preferences?username=alice")).await;
    let prefs: UserPreferences = serde_json::from_slice(&body).unwrap();
    assert_eq!(prefs.theme, "dark");
    assert!(!prefs.notifications);
    assert_eq!(prefs.language, "pt");
}
