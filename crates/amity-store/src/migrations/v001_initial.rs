//! v001 -- Initial schema creation.
//!
//! Creates the four core tables: `users`, `user_roles`, `photos` and
//! `messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY NOT NULL,          -- UUID v4
    username      TEXT NOT NULL UNIQUE COLLATE NOCASE,
    known_as      TEXT NOT NULL,
    gender        TEXT NOT NULL COLLATE NOCASE,
    date_of_birth TEXT NOT NULL,                      -- YYYY-MM-DD
    created_at    TEXT NOT NULL,                      -- RFC-3339
    last_active   TEXT NOT NULL,                      -- RFC-3339
    introduction  TEXT,
    looking_for   TEXT,
    interests     TEXT,
    city          TEXT,
    country       TEXT
);

CREATE INDEX IF NOT EXISTS idx_users_gender_dob ON users(gender, date_of_birth);

-- ----------------------------------------------------------------
-- Role tags
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS user_roles (
    user_id TEXT NOT NULL,                            -- FK -> users(id)
    role    TEXT NOT NULL,                            -- Member / Moderator / Admin

    PRIMARY KEY (user_id, role),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Photos
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS photos (
    id          TEXT PRIMARY KEY NOT NULL,            -- UUID v4
    user_id     TEXT NOT NULL,                        -- FK -> users(id)
    url         TEXT NOT NULL,
    public_id   TEXT,                                 -- NULL: not deletable remotely
    is_main     INTEGER NOT NULL DEFAULT 0,           -- boolean 0/1
    is_approved INTEGER NOT NULL DEFAULT 0,           -- boolean 0/1
    created_at  TEXT NOT NULL,

    CHECK (is_main = 0 OR is_approved = 1),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_photos_user ON photos(user_id);

-- at most one main photo per user
CREATE UNIQUE INDEX IF NOT EXISTS idx_photos_single_main
    ON photos(user_id) WHERE is_main = 1;

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id                 TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    sender_id          TEXT NOT NULL,                 -- FK -> users(id)
    sender_username    TEXT NOT NULL COLLATE NOCASE,
    recipient_id       TEXT NOT NULL,                 -- FK -> users(id)
    recipient_username TEXT NOT NULL COLLATE NOCASE,
    content            TEXT NOT NULL,
    date_read          TEXT,                          -- NULL until the thread is opened
    message_sent       TEXT NOT NULL,                 -- RFC-3339
    sender_deleted     INTEGER NOT NULL DEFAULT 0,
    recipient_deleted  INTEGER NOT NULL DEFAULT 0,

    FOREIGN KEY (sender_id) REFERENCES users(id) ON DELETE RESTRICT,
    FOREIGN KEY (recipient_id) REFERENCES users(id) ON DELETE RESTRICT
);

CREATE INDEX IF NOT EXISTS idx_messages_recipient
    ON messages(recipient_username, message_sent DESC);
CREATE INDEX IF NOT EXISTS idx_messages_sender
    ON messages(sender_username, message_sent DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
