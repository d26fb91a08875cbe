use std::error::Error as _;

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::Deserialize;
use tracing::{debug, warn};

use bookswap_types::api::{LookupQuery, LookupResponse};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};

pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/books/v1/volumes";

const UNKNOWN_TITLE: &str = "Unknown Title";
const UNKNOWN_AUTHOR: &str = "Unknown Author";
const PLACEHOLDER_ISBN: &str = "0000000000000";

/// Client for the Google Books volumes search endpoint.
#[derive(Clone)]
pub struct BookLookup {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

// -- Upstream payload --

#[derive(Debug, Default, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Option<Vec<Volume>>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    #[serde(rename = "volumeInfo", default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    #[serde(default)]
    pub industry_identifiers: Vec<IndustryIdentifier>,
    pub image_links: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
pub struct IndustryIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub identifier: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLinks {
    pub thumbnail: Option<String>,
    pub small_thumbnail: Option<String>,
}

impl BookLookup {
    pub fn new(http: reqwest::Client, api_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            api_url: api_url.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    /// Runs one search and returns the first volume, if any.
    pub async fn search(&self, term: &str) -> Result<Option<VolumeInfo>, reqwest::Error> {
        let mut req = self
            .http
            .get(&self.api_url)
            .query(&[("q", term), ("maxResults", "1")]);
        if let Some(key) = &self.api_key {
            req = req.query(&[("key", key.as_str())]);
        }

        let body: VolumesResponse = req.send().await?.error_for_status()?.json().await?;

        Ok(body
            .items
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|v| v.volume_info))
    }
}

/// Turns the first search hit into the sell-form prefill.
///
/// Missing fields fall back to fixed placeholders. The ISBN-13 is taken from
/// the volume's identifiers first, then from the ISBN the caller searched
/// with, and finally a run of zeros.
pub fn normalize(info: VolumeInfo, requested_isbn: Option<&str>) -> LookupResponse {
    let isbn = info
        .industry_identifiers
        .into_iter()
        .find(|id| id.kind == "ISBN_13")
        .map(|id| id.identifier)
        .or_else(|| requested_isbn.map(str::to_string))
        .unwrap_or_else(|| PLACEHOLDER_ISBN.to_string());

    let links = info.image_links.unwrap_or_default();
    let cover_image_url = links
        .thumbnail
        .filter(|u| !u.is_empty())
        .or(links.small_thumbnail)
        .unwrap_or_default();

    let author = match info.authors {
        Some(authors) if !authors.is_empty() => authors.join(", "),
        _ => UNKNOWN_AUTHOR.to_string(),
    };

    LookupResponse {
        title: info.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        author,
        cover_image_url,
        isbn,
    }
}

/// GET /api/books/lookup/?isbn=...|q=...
pub async fn lookup_book(
    State(state): State<AppState>,
    query: Result<Query<LookupQuery>, QueryRejection>,
) -> ApiResult<Json<LookupResponse>> {
    let Query(query) = query?;

    let isbn = query.isbn.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let text = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let term = match (isbn, text) {
        (Some(isbn), _) => format!("isbn:{isbn}"),
        (None, Some(text)) => text.to_string(),
        (None, None) => {
            return Err(ApiError::BadRequest(
                "Provide an ISBN or a search query (q).".into(),
            ));
        }
    };

    debug!("Book lookup for '{}'", term);

    let volume = state
        .books
        .search(&term)
        .await
        .map_err(|e| {
            let message = describe(e);
            warn!("Book lookup for '{}' failed: {}", term, message);
            ApiError::Upstream(format!("Google API Error: {message}"))
        })?
        .ok_or_else(|| ApiError::NotFound("No book found for that query.".into()))?;

    Ok(Json(normalize(volume, isbn)))
}

/// Error text with its source chain, minus the request URL (it may carry the API key).
fn describe(err: reqwest::Error) -> String {
    let err = err.without_url();
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
