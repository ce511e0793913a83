//! In-process [`Storage`] for tests and dry runs.
//!
//! Nothing is persisted; the table lives as long as the value does.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use hk_immigration_database_models::{StorageHealth, StoredRecord, UpsertOutcome};
use hk_immigration_source_models::{NaturalKey, TrafficRecord};
use tokio::sync::RwLock;

use crate::{DbError, Storage};

#[derive(Default)]
struct Table {
    rows: BTreeMap<NaturalKey, StoredRecord>,
    next_id: i64,
}

/// A [`Storage`] backed by a `BTreeMap` keyed on the natural key.
///
/// Outages can be simulated with [`MemoryStorage::set_reachable`] and
/// [`MemoryStorage::fail_writes_after`].
#[derive(Default)]
pub struct MemoryStorage {
    table: RwLock<Table>,
    unreachable: AtomicBool,
    writes_before_failure: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the backend reachable or not. While unreachable, every
    /// operation fails.
    pub fn set_reachable(&self, reachable: bool) {
        self.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// Lets `writes` more upserts succeed, then fails every one after.
    pub fn fail_writes_after(&self, writes: usize) {
        self.writes_before_failure.store(writes, Ordering::SeqCst);
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> Result<(), DbError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(DbError::Connection {
                message: "memory storage marked unreachable".to_string(),
            });
        }
        Ok(())
    }

    fn check_write_budget(&self) -> Result<(), DbError> {
        if !self.fail_writes.load(Ordering::SeqCst) {
            return Ok(());
        }
        let remaining = self.writes_before_failure.load(Ordering::SeqCst);
        if remaining == 0 {
            return Err(DbError::Connection {
                message: "memory storage write failed".to_string(),
            });
        }
        self.writes_before_failure
            .store(remaining - 1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn engine(&self) -> &'static str {
        "memory"
    }

    async fn upsert(&self, record: &TrafficRecord) -> Result<UpsertOutcome, DbError> {
        self.check_reachable()?;

        let mut table = self.table.write().await;
        self.check_write_budget()?;

        let key = record.key();
        if let Some(existing) = table.rows.get_mut(&key) {
            existing.apply_counts(record);
            return Ok(UpsertOutcome::Updated { id: existing.id });
        }

        table.next_id += 1;
        let id = table.next_id;
        table.rows.insert(key, StoredRecord::from_record(id, record));
        drop(table);

        Ok(UpsertOutcome::Inserted { id })
    }

    async fn list_all(&self) -> Result<Vec<StoredRecord>, DbError> {
        self.check_reachable()?;
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn ping(&self) -> StorageHealth {
        match self.check_reachable() {
            Ok(()) => StorageHealth::Healthy,
            Err(e) => StorageHealth::Unreachable {
                reason: e.to_string(),
            },
        }
    }
}
