use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use messagely_api::auth::{AppState, AppStateInner, create_token};
use messagely_db::Database;

const SECRET: &str = "test-secret";

fn state() -> AppState {
    let db = Database::open_in_memory().unwrap();
    for (username, first) in [("alice", "Alice"), ("bob", "Bob"), ("carol", "Carol")] {
        db.create_user(username, "not-a-real-hash", first, "Example", "555-0100").unwrap();
    }
    Arc::new(AppStateInner {
        db,
        jwt_secret: SECRET.into(),
        token_ttl: chrono::Duration::days(1),
    })
}

fn token(username: &str) -> String {
    create_token(SECRET, username, chrono::Duration::days(1)).unwrap()
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    as_user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = as_user {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(user)));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn alice_to_bob(app: &Router, body: &str) -> String {
    let (status, json) = send(
        app,
        Method::POST,
        "/messages",
        Some("alice"),
        Some(json!({ "toUser": "bob", "body": body })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["message"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn conversation_between_alice_and_bob() {
    let app = messagely_api::router(state());
    let id = alice_to_bob(&app, "hi").await;
    let uri = format!("/messages/{}", id);
    let read_uri = format!("/messages/{}/read", id);

    let (status, json) = send(&app, Method::GET, &uri, Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"]["body"], "hi");
    assert_eq!(json["message"]["from_user"]["first_name"], "Alice");
    assert_eq!(json["message"]["to_user"]["username"], "bob");
    assert!(json["message"]["read_at"].is_null());

    let (status, json) = send(&app, Method::GET, &uri, Some("carol"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["status"], 400);

    let (status, _) = send(&app, Method::POST, &read_uri, Some("alice"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, receipt) = send(&app, Method::POST, &read_uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["message"]["id"], id.as_str());
    assert!(receipt["message"]["read_at"].is_string());

    let (status, json) = send(&app, Method::GET, &uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"]["read_at"], receipt["message"]["read_at"]);
}

#[tokio::test]
async fn second_mark_read_returns_first_timestamp() {
    let app = messagely_api::router(state());
    let id = alice_to_bob(&app, "hi").await;
    let read_uri = format!("/messages/{}/read", id);

    let (_, first) = send(&app, Method::POST, &read_uri, Some("bob"), None).await;
    let (status, second) = send(&app, Method::POST, &read_uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["message"]["read_at"], second["message"]["read_at"]);
}

#[tokio::test]
async fn unknown_message_is_not_found() {
    let app = messagely_api::router(state());
    let uri = format!("/messages/{}", uuid::Uuid::new_v4());

    let (status, json) = send(&app, Method::GET, &uri, Some("carol"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["status"], 404);

    let (status, _) = send(&app, Method::POST, &format!("{}/read", uri), Some("bob"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_rejects_invalid_messages() {
    let app = messagely_api::router(state());

    for body in [
        json!({ "to_username": "bob", "body": "" }),
        json!({ "to_username": "ghost", "body": "hello?" }),
        json!({ "to_username": "alice", "body": "memo" }),
    ] {
        let (status, json) = send(&app, Method::POST, "/messages", Some("alice"), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"]["message"].is_string());
    }

    let (status, json) = send(&app, Method::GET, "/users/alice/from", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["messages"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn requests_without_valid_token_are_rejected() {
    let app = messagely_api::router(state());

    let (status, json) = send(&app, Method::GET, "/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["status"], 401);

    let request = Request::builder()
        .uri("/users")
        .header(header::AUTHORIZATION, "Bearer not.a.jwt")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_then_login() {
    let app = messagely_api::router(state());
    let registration = json!({
        "username": "dave",
        "password": "correct horse",
        "first_name": "Dave",
        "last_name": "Example",
        "phone": "555-0199",
    });

    let (status, json) = send(&app, Method::POST, "/auth/register", None, Some(registration.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(json["token"].is_string());

    let (status, _) = send(&app, Method::POST, "/auth/register", None, Some(registration)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": "dave", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = json["token"].as_str().unwrap().to_string();

    let request = Request::builder()
        .uri("/users/dave")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": "dave", "password": "wrong password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_routes_are_owner_only() {
    let app = messagely_api::router(state());
    alice_to_bob(&app, "one").await;
    alice_to_bob(&app, "two").await;

    let (status, json) = send(&app, Method::GET, "/users/bob/to", Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);
    let bodies: Vec<&str> = json["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["body"].as_str().unwrap())
        .collect();
    assert_eq!(bodies, vec!["one", "two"]);

    let (status, _) = send(&app, Method::GET, "/users/bob/to", Some("alice"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(&app, Method::GET, "/users/alice", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user"]["first_name"], "Alice");
    assert!(json["user"].get("password").is_none());

    let (status, json) = send(&app, Method::GET, "/users", Some("carol"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["users"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn malformed_input_gets_json_error() {
    let app = messagely_api::router(state());

    for body in [
        json!({ "toUser": "bob" }),
        json!({ "toUser": "bob", "body": null }),
        json!({ "toUser": "bob", "body": "hi", "priority": "high" }),
    ] {
        let (status, json) = send(&app, Method::POST, "/messages", Some("alice"), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["status"], 400);
        assert!(json["error"]["message"].is_string());
    }

    let (status, json) = send(&app, Method::GET, "/messages/not-a-uuid", Some("alice"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["status"], 400);

    let (status, json) = send(&app, Method::POST, "/messages/not-a-uuid/read", Some("bob"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["status"], 400);

    let (status, json) =
        send(&app, Method::POST, "/auth/login", None, Some(json!({ "username": "alice" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["status"], 400);
}

#[tokio::test]
async fn registering_an_existing_username_conflicts() {
    let app = messagely_api::router(state());
    let (status, json) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "username": "alice",
            "password": "another password",
            "first_name": "Other",
            "last_name": "Alice",
            "phone": "555-0142",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["status"], 409);
}
