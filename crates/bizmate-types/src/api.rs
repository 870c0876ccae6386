use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{PostStatus, Sender};

// -- JWT Claims --

/// Bearer token claims. `sub` is the numeric user id; `iat`/`exp` are unix
/// seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub iat: u64,
    pub exp: u64,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
    pub access_token: String,
    pub token_type: String,
}

/// OAuth2 password-grant style form. `username` carries the email.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self { access_token, token_type: "bearer".to_string() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
}

// -- Business profile --

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub business_name: String,
    pub niche: String,
    pub products: String,
    pub tone_of_voice: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub user_id: i64,
    pub business_name: String,
    pub niche: String,
    pub products: String,
    pub tone_of_voice: String,
    pub location: Option<String>,
}

// -- Scheduler --

fn default_post_platform() -> String {
    "Instagram".to_string()
}

#[derive(Debug, Deserialize)]
pub struct PostRequest {
    pub title: String,
    pub content: String,
    #[serde(default = "default_post_platform")]
    pub platform: String,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub scheduled_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub image_prompt: Option<String>,
}

/// Naive datetimes as sent by `<input type="datetime-local">`, read as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"];

/// RFC 3339 first; a timestamp without an offset is taken to be UTC.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    parse_datetime(raw.trim())
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid datetime: {raw:?}")))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub platform: String,
    pub status: PostStatus,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub image_prompt: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub message: String,
}

// -- Marketing --

#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    pub topic: String,
    #[serde(default)]
    pub tone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub title: String,
    pub content: String,
    pub hashtags: Vec<String>,
    pub image_prompt: String,
}

// -- Chatbot --

fn default_chat_platform() -> String {
    "Web".to_string()
}

fn default_customer_name() -> String {
    "Guest".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub content: String,
    #[serde(default = "default_chat_platform")]
    pub platform: String,
    #[serde(default)]
    pub conversation_id: Option<i64>,
    #[serde(default)]
    pub customer_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub author: String,
    pub conversation_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ConversationRequest {
    #[serde(default = "default_customer_name")]
    pub customer_name: String,
    #[serde(default = "default_chat_platform")]
    pub platform: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub id: i64,
    pub user_id: i64,
    pub customer_name: String,
    pub platform: String,
    pub last_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: i64,
    pub conversation_id: i64,
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
