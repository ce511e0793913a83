#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The validated traffic record produced from one feed row, and the
//! structured failure produced when a row cannot be validated.
//!
//! Control point names stay free text here. Mapping them to compact codes
//! happens at read time (see [`hk_immigration_traffic_models`]) so the code
//! table can grow without touching stored rows.

use chrono::NaiveDate;
use hk_immigration_traffic_models::Direction;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// One row of daily passenger traffic through a control point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficRecord {
    /// Calendar day the counts cover.
    pub date: NaiveDate,
    /// Control point name exactly as the feed spells it.
    pub control_point: String,
    /// Direction of travel.
    pub direction: Direction,
    /// Hong Kong residents.
    pub hk_residents: u64,
    /// Mainland visitors.
    pub mainland_visitors: u64,
    /// Other visitors.
    pub other_visitors: u64,
    /// Total as published by the feed. Not recomputed from the other three.
    pub total: u64,
}

impl TrafficRecord {
    /// Returns the natural key identifying this row in storage.
    #[must_use]
    pub fn key(&self) -> NaturalKey {
        NaturalKey {
            date: self.date,
            control_point: self.control_point.clone(),
            direction: self.direction,
        }
    }
}

/// The `(date, control point, direction)` tuple that identifies a row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NaturalKey {
    /// Calendar day.
    pub date: NaiveDate,
    /// Control point name.
    pub control_point: String,
    /// Direction of travel.
    pub direction: Direction,
}

impl std::fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} / {} / {}",
            self.date.format("%Y-%m-%d"),
            self.control_point,
            self.direction
        )
    }
}

/// Why a row was rejected.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ParseFailureKind {
    /// Fewer fields than the feed layout requires, or an unreadable line.
    MalformedRow,
    /// The date column is not a `DD-MM-YYYY` date.
    InvalidDate,
}

/// A row that could not be turned into a [`TrafficRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    /// 1-based line number in the feed.
    pub line: u64,
    /// Failure category.
    pub kind: ParseFailureKind,
    /// Human-readable detail.
    pub reason: String,
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {} ({})", self.line, self.kind, self.reason)
    }
}

impl std::error::Error for ParseFailure {}
