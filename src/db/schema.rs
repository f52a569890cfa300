//! SQL DDL for initializing the credential storage.

/// SQLite schema with:
/// - `account`: application users; `email` UNIQUE
/// - `spotify_credential`: `user_id` UNIQUE (the Spotify user id), tokens overwritten on reconnect
/// - `account_id` optional FK to `account(id)`
/// - timestamps stored as RFC3339 TEXT
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS account (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    email_verified INTEGER NOT NULL DEFAULT 0,
    image TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS spotify_credential (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL UNIQUE,
    display_name TEXT NOT NULL,
    access_token TEXT NOT NULL,
    refresh_token TEXT NOT NULL,
    account_id TEXT NULL REFERENCES account(id) ON DELETE CASCADE ON UPDATE CASCADE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_spotify_credential_account_id ON spotify_credential(account_id);
"#;
