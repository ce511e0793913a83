//! `immigration` table definitions.
//!
//! The logical schema is the same on every engine: a surrogate `id`, the
//! natural key columns under a `UNIQUE` constraint, and four counts. Dates
//! are stored as ISO `YYYY-MM-DD` text so both engines sort them
//! chronologically and read them back identically.

use switchy_database::Database;

use crate::DbError;

/// SQL engine behind a [`crate::sql::SqlStorage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlEngine {
    /// `PostgreSQL` over the network.
    Postgres,
    /// `SQLite` file on local disk.
    Sqlite,
}

impl SqlEngine {
    /// Returns the engine name for log messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Returns the `CREATE TABLE` statement for this engine.
    #[must_use]
    pub const fn create_table_sql(self) -> &'static str {
        match self {
            Self::Postgres => {
                "CREATE TABLE IF NOT EXISTS immigration (
                    id                BIGSERIAL PRIMARY KEY,
                    date              TEXT NOT NULL,
                    control_point     TEXT NOT NULL,
                    direction         TEXT NOT NULL,
                    hk_residents      BIGINT NOT NULL DEFAULT 0,
                    mainland_visitors BIGINT NOT NULL DEFAULT 0,
                    other_visitors    BIGINT NOT NULL DEFAULT 0,
                    total             BIGINT NOT NULL DEFAULT 0,
                    UNIQUE (date, control_point, direction)
                )"
            }
            Self::Sqlite => {
                "CREATE TABLE IF NOT EXISTS immigration (
                    id                INTEGER PRIMARY KEY AUTOINCREMENT,
                    date              TEXT NOT NULL,
                    control_point     TEXT NOT NULL,
                    direction         TEXT NOT NULL,
                    hk_residents      INTEGER NOT NULL DEFAULT 0,
                    mainland_visitors INTEGER NOT NULL DEFAULT 0,
                    other_visitors    INTEGER NOT NULL DEFAULT 0,
                    total             INTEGER NOT NULL DEFAULT 0,
                    UNIQUE (date, control_point, direction)
                )"
            }
        }
    }
}

/// Creates the `immigration` table and its date index if they don't
/// already exist.
///
/// # Errors
///
/// Returns [`DbError`] if any DDL statement fails.
pub async fn ensure_schema(db: &dyn Database, engine: SqlEngine) -> Result<(), DbError> {
    db.exec_raw(engine.create_table_sql()).await?;

    db.exec_raw("CREATE INDEX IF NOT EXISTS idx_immigration_date ON immigration (date)")
        .await?;

    log::info!("{} schema ready", engine.name());
    Ok(())
}
