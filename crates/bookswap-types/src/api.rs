use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Category, Condition, Price};

// -- JWT Claims --

/// JWT claims issued at register/login and checked by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// -- Auth --

/// Missing fields deserialize as empty so the handler can answer with a
/// readable 400 instead of a rejection.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default, alias = "password1")]
    pub password: String,
    /// Confirmation field sent by the registration form.
    pub password2: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Listings --

#[derive(Debug, Deserialize)]
pub struct CreateListingRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    pub isbn: Option<String>,
    pub condition: Condition,
    pub price: Price,
    #[serde(alias = "image_url")]
    pub cover_image_url: Option<String>,
    pub course_code: Option<String>,
    #[serde(default)]
    pub category: Category,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListingResponse {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub condition: Condition,
    pub category: Category,
    pub price: Price,
    pub cover_image_url: String,
    pub course_code: Option<String>,
    pub is_active: bool,
    /// Seller's username.
    pub seller: String,
    pub seller_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

// -- Book lookup --

#[derive(Debug, Default, Deserialize)]
pub struct LookupQuery {
    pub isbn: Option<String>,
    pub q: Option<String>,
}

/// Prefill payload for the "sell a book" form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResponse {
    pub title: String,
    pub author: String,
    pub cover_image_url: String,
    pub isbn: String,
}

// -- Conversations --

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub id: Uuid,
    pub listing_id: i64,
    pub listing_title: String,
    pub buyer: String,
    pub seller: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
