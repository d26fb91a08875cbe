use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use anyhow::{Context, bail};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};
use uuid::Uuid;

use bookswap_db::{Database, is_unique_violation, is_unique_violation_on};
use bookswap_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error::{ApiError, ApiResult};
use crate::lookup::BookLookup;

const MAX_USERNAME_LEN: usize = 150;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub books: BookLookup,
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;

    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("Missing username or password".into()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ApiError::BadRequest(format!(
            "Username must be at most {MAX_USERNAME_LEN} characters"
        )));
    }
    if req.password2.as_deref().is_some_and(|p| p != req.password) {
        return Err(ApiError::BadRequest("Passwords do not match".into()));
    }

    let email = req.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
    if email.is_some_and(|e| !e.contains('@')) {
        return Err(ApiError::BadRequest("Enter a valid email address".into()));
    }

    if state.db.get_user_by_username(username)?.is_some() {
        return Err(ApiError::BadRequest("Username already exists".into()));
    }
    if let Some(email) = email {
        if state.db.get_user_by_email(email)?.is_some() {
            return Err(ApiError::BadRequest("Email already exists".into()));
        }
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let user_id = Uuid::new_v4();

    state
        .db
        .create_user(&user_id.to_string(), username, email, &password_hash)
        .map_err(|e| {
            // Lost a race with a concurrent registration
            if is_unique_violation_on(&e, "users.email") {
                ApiError::BadRequest("Email already exists".into())
            } else if is_unique_violation(&e) {
                ApiError::BadRequest("Username already exists".into())
            } else {
                ApiError::Internal(e)
            }
        })?;

    let token = create_token(&state.jwt_secret, state.token_ttl_days, user_id, username)?;

    info!("Registered user {}", username);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id,
            username: username.to_string(),
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;

    let user = state
        .db
        .get_user_by_username(req.username.trim())?
        .ok_or(ApiError::Unauthorized)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("stored hash for {} is unreadable: {}", user.username, e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| {
            warn!("Failed login for {}", user.username);
            ApiError::Unauthorized
        })?;

    let user_id = user.id.parse::<Uuid>().map_err(anyhow::Error::from)?;

    let token = create_token(&state.jwt_secret, state.token_ttl_days, user_id, &user.username)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        token,
    }))
}

pub fn create_token(
    secret: &str,
    ttl_days: i64,
    user_id: Uuid,
    username: &str,
) -> anyhow::Result<String> {
    if ttl_days <= 0 {
        bail!("token lifetime must be positive, got {} days", ttl_days);
    }
    let expires_at = chrono::Duration::try_days(ttl_days)
        .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
        .with_context(|| format!("token lifetime of {} days is out of range", ttl_days))?;

    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: expires_at.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
