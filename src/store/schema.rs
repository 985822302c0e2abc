//! Database schema definitions

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{RegistryError, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating registry schema v{}", SCHEMA_VERSION);
        conn.execute_batch(REGISTRY_SCHEMA)
            .map_err(|e| RegistryError::Database(format!("Failed to create tables: {}", e)))?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(RegistryError::Database(format!(
            "Database schema v{} is newer than supported v{}",
            current_version, SCHEMA_VERSION
        )));
    } else {
        info!("Registry schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &Connection) -> Result<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )
    .map_err(|e| RegistryError::Database(format!("Failed to create schema_version table: {}", e)))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .optional()?;

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?)", [version])?;
    Ok(())
}

/// Registry tables. `member_id` columns in side tables are weak references
/// and carry no foreign key to `members`. Integer columns hold `u64` values
/// bit-cast to `i64`, so they carry no sign checks.
const REGISTRY_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS registry_counter (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    last_member_id INTEGER NOT NULL
);

INSERT OR IGNORE INTO registry_counter (id, last_member_id) VALUES (1, 0);

CREATE TABLE IF NOT EXISTS members (
    member_id INTEGER PRIMARY KEY,
    nickname TEXT NOT NULL,
    owner TEXT NOT NULL,
    registered_at INTEGER NOT NULL,
    bio TEXT NOT NULL DEFAULT '',
    preferences_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS visibility_grants (
    member_id INTEGER NOT NULL,
    viewer TEXT NOT NULL,
    granted INTEGER NOT NULL,
    PRIMARY KEY (member_id, viewer)
);

CREATE TABLE IF NOT EXISTS activity_log (
    member_id INTEGER PRIMARY KEY,
    last_login INTEGER NOT NULL,
    total_logins INTEGER NOT NULL,
    last_action TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reputation (
    member_id INTEGER PRIMARY KEY,
    score INTEGER NOT NULL,
    endorsements INTEGER NOT NULL,
    last_updated INTEGER NOT NULL
);
"#;
