use bizmate_types::models::{PostStatus, Sender};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::models::{
    ConversationFields, ConversationRow, MessageRow, PostFields, PostRow, ProfileFields,
    ProfileRow, UserRow,
};
use crate::{Database, DbError, Result};

// Every resource query below carries `user_id = ?` in the same statement that
// reads or mutates the row, so ownership is never checked separately from
// the operation it guards.

const USER_COLUMNS: &str = "id, email, hashed_password, is_active, created_at";
const PROFILE_COLUMNS: &str =
    "id, user_id, business_name, niche, products, tone_of_voice, location";
const POST_COLUMNS: &str =
    "id, user_id, title, content, platform, status, image_prompt, scheduled_time, created_at";
const CONVERSATION_COLUMNS: &str =
    "id, user_id, customer_name, platform, last_message, updated_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, sender, content, timestamp";

impl Database {
    // -- Users --

    pub fn create_user(&self, email: &str, hashed_password: &str) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            let created_at = format_timestamp(Utc::now());
            conn.query_row(
                &format!(
                    "INSERT INTO users (email, hashed_password, created_at) VALUES (?1, ?2, ?3)
                     RETURNING {USER_COLUMNS}"
                ),
                params![email, hashed_password, created_at],
                user_from_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    DbError::DuplicateEmail
                }
                other => other.into(),
            })
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                    [email],
                    user_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                    [id],
                    user_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn set_user_active(&self, id: i64, active: bool) -> Result<()> {
        self.with_conn_mut(|conn| {
            let changed =
                conn.execute("UPDATE users SET is_active = ?1 WHERE id = ?2", params![active, id])?;
            expect_one(changed)
        })
    }

    // -- Business profiles --

    pub fn get_profile(&self, owner_id: i64) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, owner_id))
    }

    /// Insert the owner's profile, or overwrite every field of the existing
    /// one. A single statement against the unique `user_id` column, so two
    /// racing calls for the same owner still leave exactly one row.
    pub fn upsert_profile(&self, owner_id: i64, fields: &ProfileFields) -> Result<ProfileRow> {
        self.with_conn_mut(|conn| {
            let row = conn.query_row(
                &format!(
                    "INSERT INTO business_profiles
                        (user_id, business_name, niche, products, tone_of_voice, location)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(user_id) DO UPDATE SET
                        business_name = excluded.business_name,
                        niche         = excluded.niche,
                        products      = excluded.products,
                        tone_of_voice = excluded.tone_of_voice,
                        location      = excluded.location
                     RETURNING {PROFILE_COLUMNS}"
                ),
                params![
                    owner_id,
                    fields.business_name,
                    fields.niche,
                    fields.products,
                    fields.tone_of_voice,
                    fields.location,
                ],
                profile_from_row,
            )?;
            Ok(row)
        })
    }

    // -- Posts --

    pub fn create_post(&self, owner_id: i64, fields: &PostFields) -> Result<PostRow> {
        self.with_conn_mut(|conn| {
            let row = conn.query_row(
                &format!(
                    "INSERT INTO posts
                        (user_id, title, content, platform, status, image_prompt, scheduled_time, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     RETURNING {POST_COLUMNS}"
                ),
                params![
                    owner_id,
                    fields.title,
                    fields.content,
                    fields.platform,
                    fields.status.as_str(),
                    fields.image_prompt,
                    fields.scheduled_time.map(format_timestamp),
                    format_timestamp(Utc::now()),
                ],
                post_from_row,
            )?;
            Ok(row)
        })
    }

    /// Owner's posts in insertion order.
    pub fn list_posts(&self, owner_id: i64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {POST_COLUMNS} FROM posts WHERE user_id = ?1 ORDER BY id"
            ))?;
            let rows = stmt
                .query_map([owner_id], post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_post(&self, owner_id: i64, post_id: i64) -> Result<PostRow> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1 AND user_id = ?2"),
                params![post_id, owner_id],
                post_from_row,
            )
            .optional()?
            .ok_or(DbError::NotFound)
        })
    }

    /// Replace every writable field. `user_id` and `created_at` never change.
    pub fn update_post(&self, owner_id: i64, post_id: i64, fields: &PostFields) -> Result<PostRow> {
        self.with_conn_mut(|conn| {
            conn.query_row(
                &format!(
                    "UPDATE posts SET
                        title = ?3, content = ?4, platform = ?5, status = ?6,
                        image_prompt = ?7, scheduled_time = ?8
                     WHERE id = ?1 AND user_id = ?2
                     RETURNING {POST_COLUMNS}"
                ),
                params![
                    post_id,
                    owner_id,
                    fields.title,
                    fields.content,
                    fields.platform,
                    fields.status.as_str(),
                    fields.image_prompt,
                    fields.scheduled_time.map(format_timestamp),
                ],
                post_from_row,
            )
            .optional()?
            .ok_or(DbError::NotFound)
        })
    }

    pub fn delete_post(&self, owner_id: i64, post_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM posts WHERE id = ?1 AND user_id = ?2",
                params![post_id, owner_id],
            )?;
            expect_one(deleted)
        })
    }

    // -- Conversations --

    pub fn create_conversation(
        &self,
        owner_id: i64,
        fields: &ConversationFields,
    ) -> Result<ConversationRow> {
        self.with_conn_mut(|conn| {
            let row = conn.query_row(
                &format!(
                    "INSERT INTO conversations (user_id, customer_name, platform, updated_at)
                     VALUES (?1, ?2, ?3, ?4)
                     RETURNING {CONVERSATION_COLUMNS}"
                ),
                params![
                    owner_id,
                    fields.customer_name,
                    fields.platform,
                    format_timestamp(Utc::now()),
                ],
                conversation_from_row,
            )?;
            Ok(row)
        })
    }

    pub fn list_conversations(&self, owner_id: i64) -> Result<Vec<ConversationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE user_id = ?1 ORDER BY id"
            ))?;
            let rows = stmt
                .query_map([owner_id], conversation_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_conversation(&self, owner_id: i64, conversation_id: i64) -> Result<ConversationRow> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1 AND user_id = ?2"
                ),
                params![conversation_id, owner_id],
                conversation_from_row,
            )
            .optional()?
            .ok_or(DbError::NotFound)
        })
    }

    pub fn update_conversation(
        &self,
        owner_id: i64,
        conversation_id: i64,
        fields: &ConversationFields,
    ) -> Result<ConversationRow> {
        self.with_conn_mut(|conn| {
            conn.query_row(
                &format!(
                    "UPDATE conversations SET customer_name = ?3, platform = ?4, updated_at = ?5
                     WHERE id = ?1 AND user_id = ?2
                     RETURNING {CONVERSATION_COLUMNS}"
                ),
                params![
                    conversation_id,
                    owner_id,
                    fields.customer_name,
                    fields.platform,
                    format_timestamp(Utc::now()),
                ],
                conversation_from_row,
            )
            .optional()?
            .ok_or(DbError::NotFound)
        })
    }

    /// Messages go with the conversation (`ON DELETE CASCADE`).
    pub fn delete_conversation(&self, owner_id: i64, conversation_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM conversations WHERE id = ?1 AND user_id = ?2",
                params![conversation_id, owner_id],
            )?;
            expect_one(deleted)
        })
    }

    // -- Messages --

    /// Append a message and refresh the conversation's denormalized
    /// `last_message`/`updated_at` in one transaction. Fails with `NotFound`
    /// unless the conversation belongs to `owner_id`.
    pub fn append_message(
        &self,
        owner_id: i64,
        conversation_id: i64,
        sender: Sender,
        content: &str,
    ) -> Result<MessageRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = format_timestamp(Utc::now());

            let touched = tx.execute(
                "UPDATE conversations SET last_message = ?1, updated_at = ?2
                 WHERE id = ?3 AND user_id = ?4",
                params![content, now, conversation_id, owner_id],
            )?;
            if touched == 0 {
                return Err(DbError::NotFound);
            }

            let row = tx.query_row(
                &format!(
                    "INSERT INTO messages (conversation_id, sender, content, timestamp)
                     VALUES (?1, ?2, ?3, ?4)
                     RETURNING {MESSAGE_COLUMNS}"
                ),
                params![conversation_id, sender.as_str(), content, now],
                message_from_row,
            )?;

            tx.commit()?;
            Ok(row)
        })
    }

    pub fn list_messages(&self, owner_id: i64, conversation_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            // Distinguish "empty conversation" from "not yours".
            let owned = conn
                .query_row(
                    "SELECT 1 FROM conversations WHERE id = ?1 AND user_id = ?2",
                    params![conversation_id, owner_id],
                    |_| Ok(()),
                )
                .optional()?;
            if owned.is_none() {
                return Err(DbError::NotFound);
            }

            let mut stmt = conn.prepare(
                "SELECT m.id, m.conversation_id, m.sender, m.content, m.timestamp
                 FROM messages m
                 JOIN conversations c ON c.id = m.conversation_id
                 WHERE m.conversation_id = ?1 AND c.user_id = ?2
                 ORDER BY m.id",
            )?;
            let rows = stmt
                .query_map(params![conversation_id, owner_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_profile(conn: &Connection, owner_id: i64) -> Result<Option<ProfileRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM business_profiles WHERE user_id = ?1"),
            [owner_id],
            profile_from_row,
        )
        .optional()?;
    Ok(row)
}

fn expect_one(changed: usize) -> Result<()> {
    if changed == 0 {
        Err(DbError::NotFound)
    } else {
        Ok(())
    }
}

// -- Row mapping --

/// RFC 3339 with as many fractional digits as needed, so stored values
/// round-trip exactly.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_column<T, E>(
    row: &Row<'_>,
    idx: usize,
    parse: impl FnOnce(&str) -> std::result::Result<T, E>,
) -> rusqlite::Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    parse(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    parse_column(row, idx, |s| DateTime::parse_from_rfc3339(s).map(|ts| ts.with_timezone(&Utc)))
}

fn optional_timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get_ref(idx)? {
        rusqlite::types::ValueRef::Null => Ok(None),
        _ => timestamp_column(row, idx).map(Some),
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        hashed_password: row.get(2)?,
        is_active: row.get(3)?,
        created_at: timestamp_column(row, 4)?,
    })
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        business_name: row.get(2)?,
        niche: row.get(3)?,
        products: row.get(4)?,
        tone_of_voice: row.get(5)?,
        location: row.get(6)?,
    })
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        platform: row.get(4)?,
        status: parse_column(row, 5, |s| s.parse::<PostStatus>())?,
        image_prompt: row.get(6)?,
        scheduled_time: optional_timestamp_column(row, 7)?,
        created_at: timestamp_column(row, 8)?,
    })
}

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        customer_name: row.get(2)?,
        platform: row.get(3)?,
        last_message: row.get(4)?,
        updated_at: timestamp_column(row, 5)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender: parse_column(row, 2, |s| s.parse::<Sender>())?,
        content: row.get(3)?,
        timestamp: timestamp_column(row, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn db_with_user(email: &str) -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(email, "$argon2id$stub").unwrap();
        (db, user.id)
    }

    fn post(title: &str) -> PostFields {
        PostFields {
            title: title.to_string(),
            content: "body".to_string(),
            platform: "Instagram".to_string(),
            status: PostStatus::Draft,
            image_prompt: None,
            scheduled_time: None,
        }
    }

    #[test]
    fn duplicate_email_is_reported() {
        let (db, _) = db_with_user("a@example.com");
        let err = db.create_user("a@example.com", "other").err().unwrap();
        assert!(matches!(err, DbError::DuplicateEmail));
    }

    #[test]
    fn new_users_are_active() {
        let (db, id) = db_with_user("a@example.com");
        let user = db.get_user_by_id(id).unwrap().unwrap();
        assert!(user.is_active);
        assert_eq!(user.email, "a@example.com");

        db.set_user_active(id, false).unwrap();
        assert!(!db.get_user_by_id(id).unwrap().unwrap().is_active);
        assert!(matches!(db.set_user_active(9999, false), Err(DbError::NotFound)));
    }

    #[test]
    fn upsert_overwrites_every_field() {
        let (db, id) = db_with_user("a@example.com");
        let first = db
            .upsert_profile(
                id,
                &ProfileFields {
                    business_name: "Bean There".into(),
                    niche: "coffee".into(),
                    products: "espresso".into(),
                    tone_of_voice: "warm".into(),
                    location: Some("Lisbon".into()),
                },
            )
            .unwrap();
        let second = db
            .upsert_profile(
                id,
                &ProfileFields {
                    business_name: "Bean There Again".into(),
                    niche: "tea".into(),
                    products: "matcha".into(),
                    tone_of_voice: "calm".into(),
                    location: None,
                },
            )
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.niche, "tea");
        assert_eq!(second.location, None);
        assert_eq!(db.get_profile(id).unwrap(), Some(second));
    }

    #[test]
    fn scheduled_time_round_trips_exactly() {
        let (db, id) = db_with_user("a@example.com");
        let when = Utc.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).unwrap()
            + chrono::Duration::nanoseconds(535_897_000);
        let mut fields = post("pi day");
        fields.status = PostStatus::Scheduled;
        fields.scheduled_time = Some(when);

        let created = db.create_post(id, &fields).unwrap();
        assert_eq!(created.scheduled_time, Some(when));
        assert_eq!(db.get_post(id, created.id).unwrap().scheduled_time, Some(when));
    }

    #[test]
    fn update_keeps_owner_and_creation_time() {
        let (db, id) = db_with_user("a@example.com");
        let created = db.create_post(id, &post("v1")).unwrap();

        let mut fields = post("v2");
        fields.status = PostStatus::Published;
        let updated = db.update_post(id, created.id, &fields).unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.user_id, id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.title, "v2");
        assert_eq!(updated.status, PostStatus::Published);
    }

    #[test]
    fn append_message_updates_conversation_summary() {
        let (db, id) = db_with_user("a@example.com");
        let convo = db
            .create_conversation(
                id,
                &ConversationFields { customer_name: "Guest".into(), platform: "Web".into() },
            )
            .unwrap();
        assert_eq!(convo.last_message, None);

        db.append_message(id, convo.id, Sender::User, "hello").unwrap();
        db.append_message(id, convo.id, Sender::Bot, "hi there").unwrap();

        let convo = db.get_conversation(id, convo.id).unwrap();
        assert_eq!(convo.last_message.as_deref(), Some("hi there"));

        let messages = db.list_messages(id, convo.id).unwrap();
        let senders: Vec<Sender> = messages.iter().map(|m| m.sender).collect();
        assert_eq!(senders, vec![Sender::User, Sender::Bot]);
    }

    #[test]
    fn deleting_conversation_removes_its_messages() {
        let (db, id) = db_with_user("a@example.com");
        let convo = db
            .create_conversation(
                id,
                &ConversationFields { customer_name: "Ana".into(), platform: "WhatsApp".into() },
            )
            .unwrap();
        db.append_message(id, convo.id, Sender::Customer, "price?").unwrap();

        db.delete_conversation(id, convo.id).unwrap();

        let remaining: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(matches!(db.list_messages(id, convo.id), Err(DbError::NotFound)));
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let (db, id) = db_with_user("a@example.com");
        let first = db.create_post(id, &post("one")).unwrap();
        db.delete_post(id, first.id).unwrap();
        let second = db.create_post(id, &post("two")).unwrap();
        assert!(second.id > first.id);
    }
}
