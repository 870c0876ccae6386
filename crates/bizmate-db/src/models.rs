//! Database row types. These map directly to SQLite rows and are kept
//! separate from the bizmate-types wire models so the storage layer does not
//! follow API shape changes.

use bizmate_types::models::{PostStatus, Sender};
use chrono::{DateTime, Utc};

pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub hashed_password: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRow {
    pub id: i64,
    pub user_id: i64,
    pub business_name: String,
    pub niche: String,
    pub products: String,
    pub tone_of_voice: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostRow {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub platform: String,
    pub status: PostStatus,
    pub image_prompt: Option<String>,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationRow {
    pub id: i64,
    pub user_id: i64,
    pub customer_name: String,
    pub platform: String,
    pub last_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageRow {
    pub id: i64,
    pub conversation_id: i64,
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

// -- Writable fields --
//
// The owner id is never part of these: it is passed separately on every call
// and cannot be changed after creation.

#[derive(Debug, Clone)]
pub struct ProfileFields {
    pub business_name: String,
    pub niche: String,
    pub products: String,
    pub tone_of_voice: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PostFields {
    pub title: String,
    pub content: String,
    pub platform: String,
    pub status: PostStatus,
    pub image_prompt: Option<String>,
    pub scheduled_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ConversationFields {
    pub customer_name: String,
    pub platform: String,
}
