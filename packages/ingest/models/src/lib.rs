#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ingestion run state, row failure, and summary types.

use std::fmt;
use std::time::Duration;

use hk_immigration_source_models::{ParseFailure, ParseFailureKind};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// Where a run currently is.
///
/// A run moves `Fetching → Parsing → Upserting → Completed`. Parsing and
/// upserting interleave row by row; `Parsing` is entered once the payload
/// is in hand and `Upserting` once the first valid row is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RunPhase {
    /// Checking storage and downloading the feed.
    Fetching,
    /// Reading rows from the downloaded payload.
    Parsing,
    /// Writing parsed rows to storage.
    Upserting,
    /// The feed was exhausted.
    Completed,
    /// The run stopped before reading any rows.
    Aborted,
}

/// Why a run stopped before reading any rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbortReason {
    /// The feed could not be downloaded.
    FetchFailed {
        /// Error from the last attempt.
        message: String,
    },
    /// Storage did not answer its liveness probe.
    StorageUnavailable {
        /// Why the probe failed.
        message: String,
    },
    /// Another run holds the run lock.
    AlreadyRunning,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchFailed { message } => write!(f, "fetch failed: {message}"),
            Self::StorageUnavailable { message } => write!(f, "storage unavailable: {message}"),
            Self::AlreadyRunning => f.write_str("another run is already in progress"),
        }
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    /// Every row was attempted. Individual rows may still have failed.
    Completed,
    /// Nothing was written.
    Aborted(AbortReason),
}

/// Why a single row was not stored.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// Too few fields or an unreadable line.
    MalformedRow,
    /// Unparsable date column.
    InvalidDate,
    /// The row parsed but the storage write failed.
    Storage,
}

impl From<ParseFailureKind> for FailureKind {
    fn from(kind: ParseFailureKind) -> Self {
        match kind {
            ParseFailureKind::MalformedRow => Self::MalformedRow,
            ParseFailureKind::InvalidDate => Self::InvalidDate,
        }
    }
}

/// One row that did not make it into storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFailure {
    /// 1-based line number in the feed.
    pub line: u64,
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable detail.
    pub reason: String,
}

impl From<ParseFailure> for RowFailure {
    fn from(failure: ParseFailure) -> Self {
        Self {
            line: failure.line,
            kind: failure.kind.into(),
            reason: failure.reason,
        }
    }
}

impl fmt::Display for RowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} ({})", self.line, self.reason, self.kind)
    }
}

/// Result of one ingestion run. Always produced, even when most rows fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Identifier of the feed that was read.
    pub feed: String,
    /// How the run ended.
    pub state: RunState,
    /// Data rows read after the header.
    pub rows_seen: u64,
    /// Rows whose natural key was new.
    pub inserted: u64,
    /// Rows that overwrote an existing natural key.
    pub updated: u64,
    /// Rows dropped because their control point is decommissioned.
    pub skipped: u64,
    /// Rows recorded in [`IngestSummary::failures`].
    pub failed: u64,
    /// Per-row failures in feed order.
    pub failures: Vec<RowFailure>,
    /// Wall-clock time of the run.
    pub duration: Duration,
}

impl IngestSummary {
    /// Starts an empty, completed summary for `feed`.
    #[must_use]
    pub fn new(feed: impl Into<String>) -> Self {
        Self {
            feed: feed.into(),
            state: RunState::Completed,
            rows_seen: 0,
            inserted: 0,
            updated: 0,
            skipped: 0,
            failed: 0,
            failures: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Builds the summary of a run that stopped for `reason`.
    #[must_use]
    pub fn aborted(feed: impl Into<String>, reason: AbortReason, duration: Duration) -> Self {
        Self {
            state: RunState::Aborted(reason),
            duration,
            ..Self::new(feed)
        }
    }

    /// Records a failed row.
    pub fn record_failure(&mut self, failure: RowFailure) {
        self.failed += 1;
        self.failures.push(failure);
    }

    /// Returns `true` if the run reached [`RunState::Completed`].
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self.state, RunState::Completed)
    }

    /// Returns the abort reason, if the run was aborted.
    #[must_use]
    pub const fn abort_reason(&self) -> Option<&AbortReason> {
        match &self.state {
            RunState::Completed => None,
            RunState::Aborted(reason) => Some(reason),
        }
    }

    /// Returns the terminal phase of the run.
    #[must_use]
    pub const fn phase(&self) -> RunPhase {
        match self.state {
            RunState::Completed => RunPhase::Completed,
            RunState::Aborted(_) => RunPhase::Aborted,
        }
    }
}
