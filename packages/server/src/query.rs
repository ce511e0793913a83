//! Read path: stored rows to compact records.

use std::sync::Arc;

use hk_immigration_database::{DbError, Storage};
use hk_immigration_server_models::CompactRecord;

/// Serves stored traffic rows in compact form.
///
/// Codes are computed from the stored text on every read; storage never
/// holds them.
#[derive(Clone)]
pub struct QueryService {
    storage: Arc<dyn Storage>,
}

impl QueryService {
    /// Creates a query service over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Returns every stored row as a [`CompactRecord`], ordered by date,
    /// control point code, direction code, then id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if storage cannot be read.
    pub async fn fetch_compact(&self) -> Result<Vec<CompactRecord>, DbError> {
        let rows = self.storage.list_all().await?;

        let mut records: Vec<CompactRecord> = rows.iter().map(CompactRecord::from).collect();
        records.sort_by_key(|r| (r.date, r.control_point_id, r.direction_id, r.id));

        log::debug!("Encoded {} compact records", records.len());
        Ok(records)
    }
}
