use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// JWT secrets that must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub content_seed: Option<u64>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub gemini_base_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = get("BIZMATE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("BIZMATE_JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }

        let host = get("BIZMATE_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("BIZMATE_PORT")
            .unwrap_or_else(|| "8000".into())
            .parse()
            .context("BIZMATE_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", host, port))?;

        let token_ttl_minutes: i64 = get("BIZMATE_TOKEN_TTL_MINUTES")
            .unwrap_or_else(|| "30".into())
            .parse()
            .context("BIZMATE_TOKEN_TTL_MINUTES must be a whole number of minutes")?;
        if token_ttl_minutes <= 0 {
            bail!("BIZMATE_TOKEN_TTL_MINUTES must be positive");
        }

        let content_seed = get("BIZMATE_CONTENT_SEED")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("BIZMATE_CONTENT_SEED must be an unsigned integer")?;

        Ok(Self {
            addr,
            db_path: get("BIZMATE_DB_PATH").unwrap_or_else(|| "bizmate.db".into()).into(),
            jwt_secret,
            token_ttl_minutes,
            content_seed,
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL"),
            gemini_base_url: get("GEMINI_BASE_URL"),
        })
    }
}
