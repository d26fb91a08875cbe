use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use bookswap_api::lookup::DEFAULT_API_URL;

/// JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

/// Token lifetimes are capped at ten years.
const MAX_TOKEN_TTL_DAYS: i64 = 3650;

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub books_api_url: String,
    pub books_api_key: Option<String>,
    pub lookup_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = get("BOOKSWAP_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("BOOKSWAP_JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }

        let host = get("BOOKSWAP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("BOOKSWAP_PORT")
            .unwrap_or_else(|| "8000".into())
            .parse()
            .context("BOOKSWAP_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("BOOKSWAP_HOST must be an IP address")?;

        let db_path: PathBuf = get("BOOKSWAP_DB_PATH")
            .unwrap_or_else(|| "bookswap.db".into())
            .into();

        let token_ttl_days: i64 = get("BOOKSWAP_TOKEN_TTL_DAYS")
            .unwrap_or_else(|| "30".into())
            .parse()
            .context("BOOKSWAP_TOKEN_TTL_DAYS must be a whole number of days")?;
        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&token_ttl_days) {
            bail!(
                "BOOKSWAP_TOKEN_TTL_DAYS must be between 1 and {}, got {}",
                MAX_TOKEN_TTL_DAYS,
                token_ttl_days
            );
        }

        let lookup_timeout_secs: u64 = get("BOOKSWAP_LOOKUP_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        Ok(Self {
            addr,
            db_path,
            jwt_secret,
            token_ttl_days,
            books_api_url: get("GOOGLE_BOOKS_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into()),
            books_api_key: get("GOOGLE_BOOKS_API_KEY").filter(|k| !k.is_empty()),
            lookup_timeout: Duration::from_secs(lookup_timeout_secs),
        })
    }
}
