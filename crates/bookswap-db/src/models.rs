//! Database row types. These map directly to SQLite rows and stay
//! independent of the bookswap-types API models.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub password: String,
    pub created_at: String,
}

/// Listing joined with its seller's public fields.
pub struct ListingRow {
    pub id: i64,
    pub seller_id: String,
    pub seller_username: String,
    pub seller_email: Option<String>,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub cover_image_url: String,
    pub price_cents: i64,
    pub condition: String,
    pub category: String,
    pub course_code: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

pub struct NewListing<'a> {
    pub seller_id: &'a str,
    pub title: &'a str,
    pub author: &'a str,
    pub isbn: &'a str,
    pub cover_image_url: &'a str,
    pub price_cents: i64,
    pub condition: &'a str,
    pub category: &'a str,
    pub course_code: Option<&'a str>,
    pub created_at: &'a str,
}

pub struct ConversationRow {
    pub id: String,
    pub listing_id: i64,
    pub listing_title: String,
    pub buyer_id: String,
    pub buyer_username: String,
    pub seller_id: String,
    pub seller_username: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_username: String,
    pub content: String,
    pub created_at: String,
}
