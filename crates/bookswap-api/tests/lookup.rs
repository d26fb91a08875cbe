mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{TestApp, spawn_books_api};

fn calculus_volume() -> serde_json::Value {
    json!({
        "totalItems": 1,
        "items": [{
            "volumeInfo": {
                "title": "Calculus: Early Transcendentals",
                "authors": ["James Stewart", "Daniel Clegg"],
                "industryIdentifiers": [
                    { "type": "ISBN_10", "identifier": "1285741552" },
                    { "type": "ISBN_13", "identifier": "9781285741550" }
                ],
                "imageLinks": {
                    "smallThumbnail": "http://books.example/small.jpg",
                    "thumbnail": "http://books.example/large.jpg"
                }
            }
        }]
    })
}

#[tokio::test]
async fn requires_isbn_or_query() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/books/lookup/", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Provide an ISBN or a search query (q).");

    let (status, _) = app.get("/api/books/lookup/?isbn=&q=", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn isbn_lookup_normalizes_first_result() {
    let (url, seen) = spawn_books_api(StatusCode::OK, calculus_volume()).await;
    let app = TestApp::with_books_api(&url);

    let (status, body) = app.get("/api/books/lookup/?isbn=1285741552", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "title": "Calculus: Early Transcendentals",
            "author": "James Stewart, Daniel Clegg",
            "cover_image_url": "http://books.example/large.jpg",
            "isbn": "9781285741550"
        })
    );

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["q"], "isbn:1285741552");
    assert_eq!(seen[0]["maxResults"], "1");
    assert!(!seen[0].contains_key("key"));
}

#[tokio::test]
async fn free_text_query_is_sent_verbatim() {
    let (url, seen) = spawn_books_api(StatusCode::OK, calculus_volume()).await;
    let app = TestApp::with_books_api(&url);

    let (status, _) = app.get("/api/books/lookup/?q=stewart%20calculus", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(seen.lock().unwrap()[0]["q"], "stewart calculus");
}

#[tokio::test]
async fn sparse_result_falls_back_to_requested_isbn_and_defaults() {
    let (url, _) = spawn_books_api(StatusCode::OK, json!({ "items": [{ "volumeInfo": {} }] })).await;
    let app = TestApp::with_books_api(&url);

    let (status, body) = app.get("/api/books/lookup/?isbn=9780000000001", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Unknown Title");
    assert_eq!(body["author"], "Unknown Author");
    assert_eq!(body["cover_image_url"], "");
    assert_eq!(body["isbn"], "9780000000001");
}

#[tokio::test]
async fn no_results_is_not_found() {
    let (url, _) = spawn_books_api(StatusCode::OK, json!({ "totalItems": 0 })).await;
    let app = TestApp::with_books_api(&url);

    let (status, body) = app.get("/api/books/lookup/?q=nothing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No book found for that query.");

    let (url, _) = spawn_books_api(StatusCode::OK, json!({ "items": [] })).await;
    let app = TestApp::with_books_api(&url);
    let (status, _) = app.get("/api/books/lookup/?q=nothing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upstream_error_status_is_service_unavailable() {
    let (url, _) = spawn_books_api(StatusCode::FORBIDDEN, json!({ "error": "quota" })).await;
    let app = TestApp::with_books_api(&url);

    let (status, body) = app.get("/api/books/lookup/?isbn=123", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("Google API Error: "), "{message}");
    assert!(message.contains("403"), "{message}");
}

#[tokio::test]
async fn unreachable_upstream_is_service_unavailable() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/books/lookup/?isbn=123", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().starts_with("Google API Error: "));
}

#[tokio::test]
async fn configured_api_key_is_sent() {
    let (url, seen) = spawn_books_api(StatusCode::OK, calculus_volume()).await;
    let app = TestApp::with_books_api_key(&url, Some("abc"));

    let (status, _) = app.get("/api/books/lookup/?isbn=1285741552", None).await;
    assert_eq!(status, StatusCode::OK);

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0]["key"], "abc");
    assert_eq!(seen[0]["q"], "isbn:1285741552");
}

#[tokio::test]
async fn blank_api_key_is_not_sent() {
    let (url, seen) = spawn_books_api(StatusCode::OK, calculus_volume()).await;
    let app = TestApp::with_books_api_key(&url, Some(""));

    let (status, _) = app.get("/api/books/lookup/?q=calculus", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!seen.lock().unwrap()[0].contains_key("key"));
}
