//! JobPilot database layer.
//!
//! `SQLite` access through `SQLx` with embedded, versioned migrations.
//!
//! Two tables carry the whole data model: `job_postings` (immutable revision
//! rows for scraped postings) and `application_attempts` (the attempt state
//! machine, with a partial unique index on the idempotency key so that
//! concurrent workers insert-or-skip rather than double-apply).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod attempts;
pub mod connection;
pub mod error;
pub mod migrations;
pub mod postings;

pub use attempts::{ApplicationAttempt, AttemptState};
pub use error::{DatabaseError, Result};
pub use postings::{PostingRecord, StoredPosting};

use std::path::Path;

/// High-level database handle that bundles pool creation and migrations.
#[derive(Debug, Clone)]
pub struct Database {
    pool: sqlx::Pool<sqlx::Sqlite>,
}

impl Database {
    /// Open (creating if missing) the database at `path` and run migrations.
    ///
    /// # Errors
    /// Returns `DatabaseError` if the file cannot be opened or a migration
    /// fails.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let pool = connection::create_pool(path).await?;
        migrations::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Open a migrated in-memory database. Used by tests.
    ///
    /// # Errors
    /// Returns `DatabaseError` if pool creation or a migration fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = connection::create_memory_pool().await?;
        migrations::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Current schema version (highest applied migration).
    ///
    /// # Errors
    /// Returns `DatabaseError` if the migrations table cannot be queried.
    pub async fn schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(&self.pool).await
    }

    /// The underlying connection pool, for the query modules.
    #[must_use]
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Sqlite> {
        &self.pool
    }
}
