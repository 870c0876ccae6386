use rusqlite::{Connection, TransactionBehavior};
use tracing::info;

use crate::Result;

/// Bring the schema up to date. The write lock is taken before the version
/// is read, so a second handle opening the same file waits on the busy
/// timeout and then finds the schema already in place.
pub fn run(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = tx
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        tx.execute_batch(
            "
            CREATE TABLE users (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                email           TEXT NOT NULL UNIQUE,
                hashed_password TEXT NOT NULL,
                is_active       INTEGER NOT NULL DEFAULT 1,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE business_profiles (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id         INTEGER NOT NULL UNIQUE REFERENCES users(id),
                business_name   TEXT NOT NULL,
                niche           TEXT NOT NULL,
                products        TEXT NOT NULL,
                tone_of_voice   TEXT NOT NULL,
                location        TEXT
            );

            CREATE TABLE posts (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id         INTEGER NOT NULL REFERENCES users(id),
                title           TEXT NOT NULL,
                content         TEXT NOT NULL,
                platform        TEXT NOT NULL,
                status          TEXT NOT NULL DEFAULT 'draft',
                image_prompt    TEXT,
                scheduled_time  TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_posts_owner ON posts(user_id, id);

            CREATE TABLE conversations (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id         INTEGER NOT NULL REFERENCES users(id),
                customer_name   TEXT NOT NULL DEFAULT 'Guest',
                platform        TEXT NOT NULL,
                last_message    TEXT,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_conversations_owner ON conversations(user_id, id);

            CREATE TABLE messages (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                sender          TEXT NOT NULL,
                content         TEXT NOT NULL,
                timestamp       TEXT NOT NULL
            );

            CREATE INDEX idx_messages_conversation ON messages(conversation_id, id);

            INSERT INTO schema_version (version) VALUES (1);
            "
        )?;
    }

    tx.commit()?;
    info!("Database migrations complete");
    Ok(())
}
