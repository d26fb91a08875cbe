use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};

use bookswap_db::models::{ListingRow, NewListing};
use bookswap_types::api::{CreateListingRequest, ListingResponse};
use bookswap_types::models::{Category, Condition, Price};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::Claims;
use crate::{now_timestamp, parse_timestamp, run_db};

const MAX_TITLE_LEN: usize = 255;
const MAX_ISBN_LEN: usize = 13;
const MAX_COVER_URL_LEN: usize = 500;
const MAX_COURSE_CODE_LEN: usize = 20;

/// Open Library medium-size cover for an ISBN.
pub fn cover_url_for_isbn(isbn: &str) -> String {
    format!("https://covers.openlibrary.org/b/isbn/{isbn}-M.jpg")
}

/// Cover URL to store for a new listing. An explicit URL wins; otherwise one is
/// derived from the ISBN. With neither, the cover stays empty.
pub fn resolve_cover_url(isbn: &str, explicit: Option<&str>) -> String {
    match explicit {
        Some(url) => url.to_string(),
        None if !isbn.is_empty() => cover_url_for_isbn(isbn),
        None => String::new(),
    }
}

/// POST /api/listings/create/
pub async fn create_listing(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreateListingRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;

    let title = required_text("title", &req.title, MAX_TITLE_LEN)?;
    let author = required_text("author", &req.author, MAX_TITLE_LEN)?;
    let isbn = optional_text("isbn", req.isbn.as_deref(), MAX_ISBN_LEN)?.unwrap_or_default();
    let explicit_cover =
        optional_text("cover_image_url", req.cover_image_url.as_deref(), MAX_COVER_URL_LEN)?;
    let course_code = optional_text("course_code", req.course_code.as_deref(), MAX_COURSE_CODE_LEN)?;

    let cover_image_url = resolve_cover_url(&isbn, explicit_cover.as_deref());
    let created_at = now_timestamp();

    let seller_id = claims.sub.to_string();
    let new = OwnedListing {
        title,
        author,
        isbn,
        cover_image_url,
        price: req.price,
        condition: req.condition,
        category: req.category,
        course_code,
        created_at,
    };

    let row = run_db(&state, move |db| {
        let id = db.insert_listing(&new.as_new_listing(&seller_id))?;
        db.get_listing(id)?
            .ok_or_else(|| anyhow::anyhow!("listing {} vanished after insert", id))
    })
    .await?;

    info!("Listing {} '{}' created by {}", row.id, row.title, claims.username);

    Ok((StatusCode::CREATED, Json(listing_response(row))))
}

/// GET /api/listings/
pub async fn list_listings(State(state): State<AppState>) -> ApiResult<Json<Vec<ListingResponse>>> {
    let rows = run_db(&state, |db| db.list_listings()).await?;
    Ok(Json(rows.into_iter().map(listing_response).collect()))
}

/// GET /api/listings/{id}/
pub async fn get_listing(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ListingResponse>> {
    let Path(id) = path?;
    let row = run_db(&state, move |db| db.get_listing(id))
        .await?
        .ok_or_else(ApiError::not_found)?;
    Ok(Json(listing_response(row)))
}

/// DELETE /api/listings/delete/{id}/
///
/// Only the caller's own listings are candidates, so someone else's listing
/// is reported as not found.
pub async fn delete_listing(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;
    let seller_id = claims.sub.to_string();
    let deleted = run_db(&state, move |db| db.delete_listing_for_seller(id, &seller_id)).await?;

    if !deleted {
        return Err(ApiError::not_found());
    }

    info!("Listing {} deleted by {}", id, claims.username);
    Ok(StatusCode::NO_CONTENT)
}

struct OwnedListing {
    title: String,
    author: String,
    isbn: String,
    cover_image_url: String,
    price: Price,
    condition: Condition,
    category: Category,
    course_code: Option<String>,
    created_at: String,
}

impl OwnedListing {
    fn as_new_listing<'a>(&'a self, seller_id: &'a str) -> NewListing<'a> {
        NewListing {
            seller_id,
            title: &self.title,
            author: &self.author,
            isbn: &self.isbn,
            cover_image_url: &self.cover_image_url,
            price_cents: self.price.cents(),
            condition: self.condition.as_str(),
            category: self.category.as_str(),
            course_code: self.course_code.as_deref(),
            created_at: &self.created_at,
        }
    }
}

fn required_text(field: &str, value: &str, max: usize) -> ApiResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{field} is required")));
    }
    check_len(field, value, max)?;
    Ok(value.to_string())
}

/// Blank strings count as absent.
fn optional_text(field: &str, value: Option<&str>, max: usize) -> ApiResult<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => {
            check_len(field, v, max)?;
            Ok(Some(v.to_string()))
        }
        None => Ok(None),
    }
}

fn check_len(field: &str, value: &str, max: usize) -> ApiResult<()> {
    if value.chars().count() > max {
        return Err(ApiError::BadRequest(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

pub(crate) fn listing_response(row: ListingRow) -> ListingResponse {
    ListingResponse {
        condition: row.condition.parse().unwrap_or_else(|e| {
            warn!("Corrupt condition on listing {}: {}", row.id, e);
            Condition::Good
        }),
        category: row.category.parse().unwrap_or_else(|e| {
            warn!("Corrupt category on listing {}: {}", row.id, e);
            Category::General
        }),
        price: Price::from_cents(row.price_cents).unwrap_or_else(|e| {
            warn!("Corrupt price {} on listing {}: {}", row.price_cents, row.id, e);
            Price::default()
        }),
        created_at: parse_timestamp(&row.created_at),
        id: row.id,
        title: row.title,
        author: row.author,
        isbn: row.isbn,
        cover_image_url: row.cover_image_url,
        course_code: row.course_code,
        is_active: row.is_active,
        seller: row.seller_username,
        seller_email: row.seller_email,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_cover_from_isbn_when_no_url_given() {
        assert_eq!(
            resolve_cover_url("1234567890123", None),
            "https://covers.openlibrary.org/b/isbn/1234567890123-M.jpg"
        );
    }

    #[test]
    fn explicit_cover_wins_over_isbn() {
        assert_eq!(
            resolve_cover_url("1234567890123", Some("https://example.com/c.jpg")),
            "https://example.com/c.jpg"
        );
    }

    #[test]
    fn no_isbn_and_no_url_leaves_cover_empty() {
        assert_eq!(resolve_cover_url("", None), "");
    }

    #[test]
    fn blank_optional_text_is_absent() {
        assert_eq!(optional_text("isbn", Some("   "), 13).unwrap(), None);
        assert_eq!(optional_text("isbn", None, 13).unwrap(), None);
        assert!(optional_text("isbn", Some("12345678901234"), 13).is_err());
    }

    #[test]
    fn required_text_is_trimmed_and_checked() {
        assert_eq!(required_text("title", "  Dune ", 255).unwrap(), "Dune");
        assert!(required_text("title", "   ", 255).is_err());
    }
}
