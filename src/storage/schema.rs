use rusqlite::Connection;

pub mod tables {
    pub const KV: &str = "kv";
    pub const MEDIA: &str = "media";

    #[cfg(test)]
    pub const ALL_TABLES: &[&str] = &[KV, MEDIA];
}

pub mod columns {
    pub const KEY: &str = "key";
    pub const VALUE: &str = "value";

    pub const KIND: &str = "kind";
    pub const ID: &str = "id";
    pub const MIME_TYPE: &str = "mime_type";
    pub const BYTES: &str = "bytes";
    pub const CREATED_AT: &str = "created_at";
}

/// Keys of the JSON collections inside the `kv` table
pub mod keys {
    pub const MUSIC: &str = "tunecent_user_music";
    pub const CAMPAIGNS: &str = "tunecent_user_campaigns";
    pub const INVESTMENTS: &str = "tunecent_investments";
    pub const PLAY_HISTORY: &str = "tunecent_play_history";
    pub const USER_PROGRESS: &str = "tunecent_user_progress";

    pub const ALL_KEYS: &[&str] = &[MUSIC, CAMPAIGNS, INVESTMENTS, PLAY_HISTORY, USER_PROGRESS];
}

pub use columns::*;
pub use tables::*;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS media (
    kind TEXT NOT NULL,
    id TEXT NOT NULL,
    mime_type TEXT NOT NULL,
    bytes BLOB NOT NULL,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (kind, id)
);
"#;

pub fn init(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA)
}
