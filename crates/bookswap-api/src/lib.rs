pub mod auth;
pub mod conversations;
pub mod error;
pub mod listings;
pub mod lookup;
pub mod middleware;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{error, warn};

use bookswap_db::Database;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::require_auth;

/// All `/api` routes plus `/health`. Layers such as CORS and tracing are left
/// to the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/register/", post(auth::register))
        .route("/api/login/", post(auth::login))
        .route("/api/books/lookup/", get(lookup::lookup_book))
        .route("/api/listings/", get(listings::list_listings))
        .route("/api/listings/{id}/", get(listings::get_listing))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/api/listings/create/", post(listings::create_listing))
        .route("/api/listings/delete/{id}/", delete(listings::delete_listing))
        .route(
            "/api/listings/{id}/conversations/",
            post(conversations::open_conversation),
        )
        .route("/api/conversations/", get(conversations::list_conversations))
        .route(
            "/api/conversations/{id}/messages/",
            get(conversations::get_messages).post(conversations::send_message),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
        .map_err(ApiError::from)
}

/// Timestamp format stored in every `created_at` column. Fixed-width, so
/// string order is time order.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') has no offset: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}
