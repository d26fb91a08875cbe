#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Body,
    extract::Query,
    http::{Method, Request, StatusCode, header},
    routing::get,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use bookswap_api::auth::{AppState, AppStateInner};
use bookswap_api::lookup::BookLookup;
use bookswap_db::Database;

pub const JWT_SECRET: &str = "test-secret";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        // Port 9 (discard) is never listened on in test environments.
        Self::with_books_api("http://127.0.0.1:9/volumes")
    }

    pub fn with_books_api(url: &str) -> Self {
        Self::with_books_api_key(url, None)
    }

    pub fn with_books_api_key(url: &str, key: Option<&str>) -> Self {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        let state: AppState = Arc::new(AppStateInner {
            db,
            jwt_secret: JWT_SECRET.to_string(),
            token_ttl_days: 1,
            books: BookLookup::new(reqwest::Client::new(), url, key.map(str::to_string)),
        });
        Self {
            router: bookswap_api::router(state.clone()),
            state,
            _dir: dir,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::GET, uri, token, None)).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request(Method::POST, uri, token, Some(body))).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::DELETE, uri, token, None)).await
    }

    /// Registers `username` and returns its bearer token.
    pub async fn register(&self, username: &str) -> String {
        let (status, body) = self
            .post(
                "/api/register/",
                None,
                json!({ "username": username, "password": "hunter2hunter2", "email": format!("{username}@campus.edu") }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn create_listing(&self, token: &str, body: Value) -> Value {
        let (status, body) = self.post("/api/listings/create/", Some(token), body).await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn book(title: &str) -> Value {
    json!({
        "title": title,
        "author": "Some Author",
        "condition": "GOOD",
        "price": "12.50"
    })
}

pub type SeenQueries = Arc<Mutex<Vec<HashMap<String, String>>>>;

/// Serves `body` with `status` on `/volumes` from an ephemeral local port and
/// records the query string of every call. Returns the endpoint URL.
pub async fn spawn_books_api(status: StatusCode, body: Value) -> (String, SeenQueries) {
    let seen: SeenQueries = Arc::default();
    let recorder = seen.clone();

    let app = Router::new().route(
        "/volumes",
        get(move |Query(params): Query<HashMap<String, String>>| {
            let body = body.clone();
            let recorder = recorder.clone();
            async move {
                recorder.lock().unwrap().push(params);
                (status, Json(body))
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/volumes"), seen)
}
