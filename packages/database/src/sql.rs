//! [`Storage`] over a `switchy_database` connection.

use async_trait::async_trait;
use hk_immigration_database_models::{StorageHealth, StoredRecord, UpsertOutcome};
use hk_immigration_source_models::TrafficRecord;
use switchy_database::Database;

use crate::schema::{SqlEngine, ensure_schema};
use crate::{DbError, Storage, queries};

/// A `PostgreSQL` or `SQLite` table behind the [`Storage`] trait.
pub struct SqlStorage {
    db: Box<dyn Database>,
    engine: SqlEngine,
}

impl SqlStorage {
    /// Wraps an open connection, creating the table if needed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if schema creation fails.
    pub async fn new(db: Box<dyn Database>, engine: SqlEngine) -> Result<Self, DbError> {
        ensure_schema(db.as_ref(), engine).await?;
        Ok(Self { db, engine })
    }
}

#[async_trait]
impl Storage for SqlStorage {
    fn engine(&self) -> &'static str {
        self.engine.name()
    }

    async fn upsert(&self, record: &TrafficRecord) -> Result<UpsertOutcome, DbError> {
        queries::upsert_record(self.db.as_ref(), record).await
    }

    async fn list_all(&self) -> Result<Vec<StoredRecord>, DbError> {
        queries::list_records(self.db.as_ref()).await
    }

    async fn ping(&self) -> StorageHealth {
        match queries::ping(self.db.as_ref()).await {
            Ok(()) => StorageHealth::Healthy,
            Err(e) => {
                log::warn!("{} ping failed: {e}", self.engine.name());
                StorageHealth::Unreachable {
                    reason: e.to_string(),
                }
            }
        }
    }
}
