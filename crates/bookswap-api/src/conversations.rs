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
use uuid::Uuid;

use bookswap_db::models::{ConversationRow, MessageRow};
use bookswap_types::api::{ConversationResponse, MessageResponse, SendMessageRequest};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::Claims;
use crate::{now_timestamp, parse_timestamp, run_db};

const MAX_MESSAGE_LEN: usize = 5000;

/// POST /api/listings/{id}/conversations/
///
/// Opens the caller's conversation with the seller about a listing. A buyer
/// has at most one per listing; asking again returns the existing one.
pub async fn open_conversation(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let Path(listing_id) = path?;
    let buyer_id = claims.sub.to_string();

    let listing = run_db(&state, move |db| db.get_listing(listing_id))
        .await?
        .ok_or_else(ApiError::not_found)?;

    if listing.seller_id == buyer_id {
        return Err(ApiError::BadRequest(
            "You cannot start a conversation about your own listing.".into(),
        ));
    }

    let conversation_id = Uuid::new_v4().to_string();
    let created_at = now_timestamp();
    let seller_id = listing.seller_id;

    let (row, created) = run_db(&state, move |db| {
        db.get_or_create_conversation(&conversation_id, listing_id, &buyer_id, &seller_id, &created_at)
    })
    .await?;

    let status = if created {
        info!("Conversation {} opened by {} on listing {}", row.id, claims.username, listing_id);
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(conversation_response(row))))
}

/// GET /api/conversations/
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<ConversationResponse>>> {
    let user_id = claims.sub.to_string();
    let rows = run_db(&state, move |db| db.list_conversations_for_user(&user_id)).await?;
    Ok(Json(rows.into_iter().map(conversation_response).collect()))
}

/// GET /api/conversations/{id}/messages/
pub async fn get_messages(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<MessageResponse>>> {
    let Path(conversation_id) = path?;
    let cid = conversation_id.to_string();
    let uid = claims.sub.to_string();

    let rows = run_db(&state, move |db| {
        // Outsiders see the same thing as for a conversation that doesn't exist
        match db.get_conversation_for_participant(&cid, &uid)? {
            Some(_) => db.get_messages(&cid).map(Some),
            None => Ok(None),
        }
    })
    .await?
    .ok_or_else(ApiError::not_found)?;

    Ok(Json(rows.into_iter().map(message_response).collect()))
}

/// POST /api/conversations/{id}/messages/
pub async fn send_message(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(conversation_id) = path?;
    let Json(req) = payload?;

    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::BadRequest("Message content is required".into()));
    }
    if content.chars().count() > MAX_MESSAGE_LEN {
        return Err(ApiError::BadRequest(format!(
            "Message must be at most {MAX_MESSAGE_LEN} characters"
        )));
    }

    let message_id = Uuid::new_v4();
    let now = now_timestamp();

    let cid = conversation_id.to_string();
    let uid = claims.sub.to_string();
    let mid = message_id.to_string();
    let stored_content = content.clone();
    let stored_at = now.clone();

    let found = run_db(&state, move |db| {
        if db.get_conversation_for_participant(&cid, &uid)?.is_none() {
            return Ok(false);
        }
        db.insert_message(&mid, &cid, &uid, &stored_content, &stored_at)?;
        Ok(true)
    })
    .await?;

    if !found {
        return Err(ApiError::not_found());
    }

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            id: message_id,
            conversation_id,
            sender: claims.username,
            content,
            timestamp: parse_timestamp(&now),
        }),
    ))
}

fn conversation_response(row: ConversationRow) -> ConversationResponse {
    ConversationResponse {
        id: parse_uuid(&row.id, "conversation"),
        listing_id: row.listing_id,
        listing_title: row.listing_title,
        buyer: row.buyer_username,
        seller: row.seller_username,
        created_at: parse_timestamp(&row.created_at),
    }
}

fn message_response(row: MessageRow) -> MessageResponse {
    MessageResponse {
        id: parse_uuid(&row.id, "message"),
        conversation_id: parse_uuid(&row.conversation_id, "conversation"),
        sender: row.sender_username,
        content: row.content,
        timestamp: parse_timestamp(&row.created_at),
    }
}

fn parse_uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} id '{}': {}", what, raw, e);
        Uuid::nil()
    })
}
