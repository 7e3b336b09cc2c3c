//! Connection pool construction.

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::error::{DatabaseError, Result};

const MAX_CONNECTIONS: u32 = 5;

/// Open (creating if missing) a pooled connection to a database file.
pub async fn create_pool(path: impl AsRef<Path>) -> Result<Pool<Sqlite>> {
    let path = path.as_ref();
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await
        .map_err(|e| DatabaseError::Open(format!("{}: {e}", path.display())))?;

    tracing::info!(path = %path.display(), "database pool created");
    Ok(pool)
}

/// Open an in-memory database.
///
/// Capped to a single connection so every caller sees the same memory
/// database; used by tests.
pub async fn create_memory_pool() -> Result<Pool<Sqlite>> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| DatabaseError::Open(e.to_string()))?
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| DatabaseError::Open(format!("in-memory: {e}")))?;

    Ok(pool)
}
