#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Storage for passenger traffic records.
//!
//! The ingestion pipeline and the query path only ever see the [`Storage`]
//! trait. Which engine sits behind it is decided once, at startup, by
//! [`db::connect`]:
//!
//! - [`sql::SqlStorage`] over `switchy_database`, either `PostgreSQL`
//!   (network) or `SQLite` (embedded file). Both share one SQL dialect for
//!   the upsert and read paths; only the DDL differs.
//! - [`memory::MemoryStorage`], an in-process table for tests and dry runs.

pub mod db;
pub mod memory;
pub mod paths;
pub mod queries;
pub mod schema;
pub mod sql;

use async_trait::async_trait;
use hk_immigration_database_models::{StorageHealth, StoredRecord, UpsertOutcome};
use hk_immigration_source_models::TrafficRecord;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// The backend could not be opened or reached.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of what went wrong.
        message: String,
    },

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// I/O error (creating the data directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable table of traffic records keyed by `(date, control point,
/// direction)`.
///
/// Implementations must make [`Storage::upsert`] atomic per record and
/// idempotent: applying the same record any number of times converges to
/// the same stored row. Only the four count fields are ever overwritten.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Returns a short engine name for log messages.
    fn engine(&self) -> &'static str;

    /// Inserts `record`, or overwrites the counts of the row with the same
    /// natural key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails.
    async fn upsert(&self, record: &TrafficRecord) -> Result<UpsertOutcome, DbError>;

    /// Reads every stored row. No ordering is guaranteed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the read fails or a row cannot be decoded.
    async fn list_all(&self) -> Result<Vec<StoredRecord>, DbError>;

    /// Probes whether the backend is reachable.
    async fn ping(&self) -> StorageHealth;
}
