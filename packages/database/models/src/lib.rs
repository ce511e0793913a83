#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Row types and operation results for the `immigration` table.
//!
//! These represent data as stored in and read back from a storage backend.
//! They are distinct from the compact API types in
//! `hk_immigration_server_models` and the freshly parsed
//! [`TrafficRecord`] in `hk_immigration_source_models`.

use chrono::NaiveDate;
use hk_immigration_source_models::TrafficRecord;
use hk_immigration_traffic_models::Direction;
use serde::{Deserialize, Serialize};

/// A traffic row as read back from storage.
///
/// `direction` is kept as the stored text rather than a [`Direction`]: the
/// table may hold values written by other tools, and encoding happens at
/// read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Surrogate key assigned on first insert. Stable across updates.
    pub id: i64,
    /// Calendar day.
    pub date: NaiveDate,
    /// Control point name.
    pub control_point: String,
    /// Direction text.
    pub direction: String,
    /// Hong Kong residents.
    pub hk_residents: u64,
    /// Mainland visitors.
    pub mainland_visitors: u64,
    /// Other visitors.
    pub other_visitors: u64,
    /// Total as last supplied by the feed.
    pub total: u64,
}

impl StoredRecord {
    /// Builds the stored form of `record` under surrogate key `id`.
    #[must_use]
    pub fn from_record(id: i64, record: &TrafficRecord) -> Self {
        Self {
            id,
            date: record.date,
            control_point: record.control_point.clone(),
            direction: record.direction.as_ref().to_string(),
            hk_residents: record.hk_residents,
            mainland_visitors: record.mainland_visitors,
            other_visitors: record.other_visitors,
            total: record.total,
        }
    }

    /// Overwrites the four count fields from `record`, leaving the key
    /// and surrogate id untouched.
    pub const fn apply_counts(&mut self, record: &TrafficRecord) {
        self.hk_residents = record.hk_residents;
        self.mainland_visitors = record.mainland_visitors;
        self.other_visitors = record.other_visitors;
        self.total = record.total;
    }

    /// Parses the stored direction text.
    #[must_use]
    pub fn direction(&self) -> Direction {
        Direction::normalize(&self.direction).0
    }
}

/// What an upsert did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpsertOutcome {
    /// The natural key was new; a row was created.
    Inserted {
        /// Surrogate key of the new row.
        id: i64,
    },
    /// The natural key existed; its counts were overwritten.
    Updated {
        /// Surrogate key of the existing row.
        id: i64,
    },
}

impl UpsertOutcome {
    /// Returns the surrogate key of the affected row.
    #[must_use]
    pub const fn id(self) -> i64 {
        match self {
            Self::Inserted { id } | Self::Updated { id } => id,
        }
    }
}

/// Result of a storage liveness probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StorageHealth {
    /// The backend answered.
    Healthy,
    /// The backend could not be reached.
    Unreachable {
        /// Why the probe failed.
        reason: String,
    },
}

impl StorageHealth {
    /// Returns `true` for [`StorageHealth::Healthy`].
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}
