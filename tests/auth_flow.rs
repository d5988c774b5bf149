use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use fittrack::{app::build_app, mail::Outbox, state::AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    outbox: Arc<Outbox>,
}

impl TestApp {
    fn new() -> Self {
        let outbox = Arc::new(Outbox::new());
        let state = AppState::fake_with(outbox.clone());
        Self {
            router: build_app(state),
            outbox,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn register(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/users",
            None,
            Some(json!({ "name": "A", "email": email, "password": password })),
        )
        .await
    }

    async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    async fn last_reset_token(&self) -> String {
        let mail = self.outbox.last().await.expect("reset email sent");
        let marker = "/api/users/reset-password/";
        let start = mail.html_body.find(marker).expect("reset link") + marker.len();
        mail.html_body[start..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect()
    }
}

#[tokio::test]
async fn full_account_lifecycle() {
    let app = TestApp::new();

    let (status, body) = app.register("a@x.com", "longpass1").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["email"], "a@x.com");
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["user"].get("password").is_none());
    assert!(!body["token"].as_str().unwrap().is_empty());

    let (status, body) = app.login("a@x.com", "wrongpass").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app.login("a@x.com", "longpass1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["token"].as_str().unwrap().is_empty());

    let (status, _) = app
        .send(
            Method::POST,
            "/api/users/forgot-password",
            None,
            Some(json!({ "email": "a@x.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let raw = app.last_reset_token().await;

    let uri = format!("/api/users/reset-password/{raw}");
    let (status, _) = app
        .send(Method::POST, &uri, None, Some(json!({ "password": "newpass123" })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(Method::POST, &uri, None, Some(json!({ "password": "again12345" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.login("a@x.com", "longpass1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.login("a@x.com", "newpass123").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let app = TestApp::new();
    assert_eq!(app.register("a@x.com", "longpass1").await.0, StatusCode::CREATED);

    let (status, body) = app.register("a@x.com", "otherpass1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already exists");

    assert_eq!(app.login("a@x.com", "longpass1").await.0, StatusCode::OK);
}

#[tokio::test]
async fn short_password_is_rejected() {
    let app = TestApp::new();
    let (status, body) = app.register("a@x.com", "short").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn profile_routes_require_bearer() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/api/users/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .send(Method::GET, "/api/users/profile", Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_update_change_password_logout_and_delete() {
    let app = TestApp::new();
    let (_, body) = app.register("a@x.com", "longpass1").await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(Method::GET, "/api/users/profile", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "A");

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/users/profile/update",
            Some(&token),
            Some(json!({ "name": "Renamed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Renamed");
    assert_eq!(body["user"]["email"], "a@x.com");

    let (status, _) = app
        .send(
            Method::PUT,
            "/api/users/profile/update",
            Some(&token),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::PUT,
            "/api/users/profile/change-password",
            Some(&token),
            Some(json!({ "oldPassword": "nottheone", "newPassword": "newpass123" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::PUT,
            "/api/users/profile/change-password",
            Some(&token),
            Some(json!({ "oldPassword": "longpass1", "newPassword": "newpass123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.login("a@x.com", "newpass123").await.0, StatusCode::OK);

    let (status, body) = app
        .send(Method::GET, "/api/users/profile/logout", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_null());

    let (status, _) = app
        .send(Method::DELETE, "/api/users/profile/delete", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    // the token is still well-formed but its subject is gone
    let (status, _) = app
        .send(Method::GET, "/api/users/profile", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.login("a@x.com", "newpass123").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn forgot_password_for_unknown_email() {
    let app = TestApp::new();
    let (status, _) = app
        .send(
            Method::POST,
            "/api/users/forgot-password",
            None,
            Some(json!({ "email": "nobody@x.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn forgot_password_reports_delivery_failure() {
    let state = AppState::fake_with(Arc::new(Outbox::failing()));
    let router = build_app(state);
    let register = Request::builder()
        .method(Method::POST)
        .uri("/api/users")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "name": "A", "email": "a@x.com", "password": "longpass1" }).to_string(),
        ))
        .unwrap();
    assert_eq!(
        router.clone().oneshot(register).await.unwrap().status(),
        StatusCode::CREATED
    );

    let forgot = Request::builder()
        .method(Method::POST)
        .uri("/api/users/forgot-password")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "email": "a@x.com" }).to_string()))
        .unwrap();
    let res = router.oneshot(forgot).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["message"], "Email could not be sent");
}

#[tokio::test]
async fn health_check() {
    let app = TestApp::new();
    let res = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn unreadable_bodies_use_the_error_envelope() {
    let app = TestApp::new();

    let no_content_type = Request::builder()
        .method(Method::POST)
        .uri("/api/users/login")
        .body(Body::from(json!({ "email": "a@x.com" }).to_string()))
        .unwrap();
    let res = app.router.clone().oneshot(no_content_type).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
    assert!(!body["message"].as_str().unwrap().is_empty());

    let malformed = Request::builder()
        .method(Method::POST)
        .uri("/api/users")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let res = app.router.clone().oneshot(malformed).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn profile_update_to_taken_email_conflicts() {
    let app = TestApp::new();
    app.register("a@x.com", "longpass1").await;
    let (_, body) = app.register("b@x.com", "longpass1").await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/users/profile/update",
            Some(&token),
            Some(json!({ "email": "A@x.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email already in use");
}
