#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API response types for the hk-immigration server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the storage row types so the wire contract can evolve on its own.

use chrono::NaiveDate;
use hk_immigration_database_models::StoredRecord;
use hk_immigration_ingest_models::{IngestSummary, RowFailure, RunState};
use hk_immigration_traffic_models::{
    ControlPoint, Direction, UNKNOWN_CODE, encode_control_point, encode_direction,
};
use serde::{Deserialize, Serialize};

/// A traffic row with its categorical text replaced by table codes.
///
/// Field names are part of the published payload shape and stay
/// `snake_case`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactRecord {
    /// Surrogate key.
    pub id: i64,
    /// Calendar day, `YYYY-MM-DD`.
    pub date: NaiveDate,
    /// Control point code, or `-1` for a name missing from the table.
    pub control_point_id: i32,
    /// `0` for arrivals, `1` for everything else.
    pub direction_id: i32,
    /// Hong Kong residents.
    pub hk_residents: u64,
    /// Mainland visitors.
    pub mainland_visitors: u64,
    /// Other visitors.
    pub other_visitors: u64,
    /// Total as supplied by the feed.
    pub total: u64,
}

impl From<&StoredRecord> for CompactRecord {
    fn from(row: &StoredRecord) -> Self {
        Self {
            id: row.id,
            date: row.date,
            control_point_id: encode_control_point(&row.control_point),
            direction_id: encode_direction(&row.direction),
            hk_residents: row.hk_residents,
            mainland_visitors: row.mainland_visitors,
            other_visitors: row.other_visitors,
            total: row.total,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// `"healthy"` or `"unhealthy"`.
    pub status: String,
    /// Storage engine name.
    pub engine: String,
    /// Why storage is unreachable, when it is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Server version.
    pub version: String,
}

/// One entry of a code table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCode {
    /// Compact code.
    pub code: i32,
    /// Text the code stands for.
    pub name: String,
}

/// The code tables needed to decode [`CompactRecord`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDictionary {
    /// Control point codes in code order.
    pub control_points: Vec<ApiCode>,
    /// Direction codes in code order.
    pub directions: Vec<ApiCode>,
    /// Code used for control point names missing from the table.
    pub unknown_code: i32,
}

impl ApiDictionary {
    /// Builds the dictionary from the compiled-in tables.
    #[must_use]
    pub fn current() -> Self {
        Self {
            control_points: ControlPoint::all()
                .iter()
                .map(|point| ApiCode {
                    code: point.code(),
                    name: point.to_string(),
                })
                .collect(),
            directions: Direction::all()
                .iter()
                .map(|direction| ApiCode {
                    code: direction.code(),
                    name: direction.to_string(),
                })
                .collect(),
            unknown_code: UNKNOWN_CODE,
        }
    }
}

/// Result of an ingestion run triggered over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiIngestSummary {
    /// Feed identifier.
    pub feed: String,
    /// `"COMPLETED"` or `"ABORTED"`.
    pub state: String,
    /// Why the run was aborted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Data rows read.
    pub rows_seen: u64,
    /// New natural keys written.
    pub inserted: u64,
    /// Existing natural keys overwritten.
    pub updated: u64,
    /// Rows for removed control points.
    pub skipped: u64,
    /// Rows not stored.
    pub failed: u64,
    /// Per-row failures in feed order.
    pub failures: Vec<RowFailure>,
    /// Run time in seconds.
    pub duration_secs: f64,
}

impl From<IngestSummary> for ApiIngestSummary {
    fn from(summary: IngestSummary) -> Self {
        let (state, reason) = match &summary.state {
            RunState::Completed => ("COMPLETED", None),
            RunState::Aborted(reason) => ("ABORTED", Some(reason.to_string())),
        };

        Self {
            feed: summary.feed,
            state: state.to_string(),
            reason,
            rows_seen: summary.rows_seen,
            inserted: summary.inserted,
            updated: summary.updated,
            skipped: summary.skipped,
            failed: summary.failed,
            failures: summary.failures,
            duration_secs: summary.duration.as_secs_f64(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hk_immigration_ingest_models::AbortReason;
    use std::time::Duration;

    fn stored(control_point: &str, direction: &str) -> StoredRecord {
        StoredRecord {
            id: 9,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            control_point: control_point.to_string(),
            direction: direction.to_string(),
            hk_residents: 100,
            mainland_visitors: 200,
            other_visitors: 50,
            total: 350,
        }
    }

    #[test]
    fn compact_record_encodes_and_keeps_counts() {
        let compact = CompactRecord::from(&stored("Shenzhen Bay", "Departure"));
        assert_eq!(compact.control_point_id, 3);
        assert_eq!(compact.direction_id, 1);
        assert_eq!(
            (compact.hk_residents, compact.mainland_visitors, compact.other_visitors, compact.total),
            (100, 200, 50, 350)
        );
    }

    #[test]
    fn unknown_control_point_gets_sentinel() {
        let compact = CompactRecord::from(&stored("Kai Tak Heliport", "Arrival"));
        assert_eq!(compact.control_point_id, -1);
        assert_eq!(compact.direction_id, 0);
    }

    #[test]
    fn compact_record_wire_shape() {
        let json = serde_json::to_value(CompactRecord::from(&stored("Airport", "Arrival"))).unwrap();
        assert_eq!(json["date"], "2024-01-01");
        assert_eq!(json["control_point_id"], 2);
        assert_eq!(json["direction_id"], 0);
        assert_eq!(json["hk_residents"], 100);
        assert_eq!(json.as_object().unwrap().len(), 8);
    }

    #[test]
    fn dictionary_lists_every_code() {
        let dictionary = ApiDictionary::current();
        assert_eq!(dictionary.control_points.len(), 16);
        assert_eq!(dictionary.control_points[0].name, "Lo Wu");
        assert_eq!(dictionary.control_points[15].code, 15);
        assert_eq!(dictionary.directions.len(), 2);
        assert_eq!(dictionary.unknown_code, -1);
    }

    #[test]
    fn aborted_summary_carries_reason() {
        let api = ApiIngestSummary::from(IngestSummary::aborted(
            "immd",
            AbortReason::AlreadyRunning,
            Duration::from_millis(5),
        ));
        assert_eq!(api.state, "ABORTED");
        assert!(api.reason.unwrap().contains("already in progress"));
    }
}
