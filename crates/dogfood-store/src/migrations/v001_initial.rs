//! v001 -- Initial schema creation.
//!
//! Creates the two core tables: `links` and `messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Links (conversation pairs)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS links (
    id     TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    user_a TEXT NOT NULL,               -- UUID of one participant
    user_b TEXT NOT NULL                -- UUID of the other participant
);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id             TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    link_id        TEXT NOT NULL,               -- FK -> links(id)
    sender_id      TEXT NOT NULL,               -- UUID
    receiver_id    TEXT NOT NULL,               -- UUID
    message_type   TEXT NOT NULL,               -- 'text' | 'image' | 'audio'
    content        TEXT,                        -- body, text messages only
    media_url      TEXT,                        -- media ref, image/audio only
    media_metadata TEXT NOT NULL DEFAULT '{}',  -- JSON object
    status         TEXT NOT NULL DEFAULT 'sent',-- 'sent'|'delivered'|'read'
    created_at     TEXT NOT NULL,               -- ISO-8601 / RFC-3339
    updated_at     TEXT NOT NULL,

    FOREIGN KEY (link_id) REFERENCES links(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_link_created
    ON messages(link_id, created_at DESC);

CREATE INDEX IF NOT EXISTS idx_messages_receiver_status
    ON messages(receiver_id, status);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
