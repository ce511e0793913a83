#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ingestion of the daily passenger traffic feed into storage.
//!
//! One [`IngestPipeline::run`] downloads the whole CSV document, then walks
//! it row by row: each row is parsed and, if valid, upserted before the next
//! row is read. Row-level problems are collected in the returned
//! [`IngestSummary`] and never stop the run. Only a failed fetch or an
//! unreachable store abort it, and both happen before any row is written.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hk_immigration_database::{DbError, Storage, db};
use hk_immigration_database_models::{StorageHealth, UpsertOutcome};
use hk_immigration_ingest_models::{
    AbortReason, FailureKind, IngestSummary, RowFailure, RunPhase,
};
use hk_immigration_source::SourceError;
use hk_immigration_source::feed::{FeedConfig, FileFeed, HttpFeed};
use hk_immigration_source::parsing::FeedRows;
use hk_immigration_source::progress::ProgressCallback;
use hk_immigration_source::FeedSource;
use tokio::sync::Mutex;

/// Errors that can occur while assembling a pipeline.
///
/// A run itself never fails; see [`IngestPipeline::run`].
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Feed configuration or client setup failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Storage could not be opened.
    #[error(transparent)]
    Database(#[from] DbError),
}

/// Fetches the feed and upserts its rows, one run at a time.
pub struct IngestPipeline {
    storage: Arc<dyn Storage>,
    feed: Arc<dyn FeedSource>,
    config: FeedConfig,
    run_lock: Mutex<()>,
}

impl IngestPipeline {
    /// Creates a pipeline over an already-open store and feed.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, feed: Arc<dyn FeedSource>, config: FeedConfig) -> Self {
        Self {
            storage,
            feed,
            config,
            run_lock: Mutex::new(()),
        }
    }

    /// Builds a pipeline from process configuration: the feed TOML at
    /// `config_path` (or the embedded default) with environment overrides,
    /// the storage named by `DATABASE_URL`, and either the HTTP feed or,
    /// when `file` is given, a local copy of it.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the configuration is invalid or storage
    /// cannot be opened.
    pub async fn from_env(
        config_path: Option<&Path>,
        file: Option<PathBuf>,
    ) -> Result<Self, IngestError> {
        let config = FeedConfig::load(config_path)?;
        let storage = db::connect_from_env().await?;

        let feed: Arc<dyn FeedSource> = match file {
            Some(path) => Arc::new(FileFeed::new(path)),
            None => Arc::new(HttpFeed::new(&config)?),
        };

        Ok(Self::new(storage, feed, config))
    }

    /// Returns the store this pipeline writes to.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Returns the active feed configuration.
    #[must_use]
    pub const fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Returns `true` while a run holds the run lock.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    /// Runs one ingestion pass.
    ///
    /// If another run on this pipeline is in flight, returns immediately
    /// with [`AbortReason::AlreadyRunning`]. Otherwise pings storage,
    /// fetches the feed, and upserts every valid row. The returned summary
    /// is [`RunState::Completed`](hk_immigration_ingest_models::RunState)
    /// whenever rows were attempted, however many of them failed.
    pub async fn run(&self, progress: &Arc<dyn ProgressCallback>) -> IngestSummary {
        let start = Instant::now();
        let feed_id = self.feed.id().to_string();

        let Ok(_guard) = self.run_lock.try_lock() else {
            log::warn!("{feed_id}: run requested while another is in progress");
            return IngestSummary::aborted(feed_id, AbortReason::AlreadyRunning, start.elapsed());
        };

        enter(&feed_id, RunPhase::Fetching, progress);

        if let StorageHealth::Unreachable { reason } = self.storage.ping().await {
            return abort(
                &feed_id,
                AbortReason::StorageUnavailable { message: reason },
                start,
                progress,
            );
        }

        log::info!("{feed_id}: fetching {}", self.feed.location());
        let bytes = match self.feed.fetch().await {
            Ok(bytes) => bytes,
            Err(e) => {
                return abort(
                    &feed_id,
                    AbortReason::FetchFailed {
                        message: e.to_string(),
                    },
                    start,
                    progress,
                );
            }
        };

        log::info!("{feed_id}: fetched {} bytes", bytes.len());
        enter(&feed_id, RunPhase::Parsing, progress);
        progress.set_total(estimate_rows(&bytes));

        let mut summary = IngestSummary::new(feed_id.clone());
        let mut upserting = false;

        for row in FeedRows::new(bytes.as_slice()) {
            summary.rows_seen += 1;
            progress.inc(1);

            let record = match row.result {
                Ok(record) => record,
                Err(failure) => {
                    log::warn!("{feed_id}: {failure}");
                    summary.record_failure(failure.into());
                    continue;
                }
            };

            if self.config.is_removed(&record.control_point) {
                log::debug!(
                    "{feed_id}: line {}: skipping removed control point {:?}",
                    row.line,
                    record.control_point
                );
                summary.skipped += 1;
                continue;
            }

            if !upserting {
                upserting = true;
                enter(&feed_id, RunPhase::Upserting, progress);
            }

            match self.storage.upsert(&record).await {
                Ok(UpsertOutcome::Inserted { id }) => {
                    log::debug!("{feed_id}: inserted {} as id {id}", record.key());
                    summary.inserted += 1;
                }
                Ok(UpsertOutcome::Updated { .. }) => summary.updated += 1,
                Err(e) => {
                    let failure = RowFailure {
                        line: row.line,
                        kind: FailureKind::Storage,
                        reason: format!("{}: {e}", record.key()),
                    };
                    log::warn!("{feed_id}: {failure}");
                    summary.record_failure(failure);
                }
            }
        }

        summary.duration = start.elapsed();
        enter(&feed_id, RunPhase::Completed, progress);
        log::info!(
            "{feed_id}: {} rows, {} inserted, {} updated, {} skipped, {} failed, took {:.1}s",
            summary.rows_seen,
            summary.inserted,
            summary.updated,
            summary.skipped,
            summary.failed,
            summary.duration.as_secs_f64()
        );
        progress.finish(format!(
            "{} inserted, {} updated, {} failed",
            summary.inserted, summary.updated, summary.failed
        ));

        summary
    }

    /// Runs the pipeline every `interval` until the task is dropped.
    ///
    /// The first run starts immediately. A tick that lands while a run is
    /// still in flight (for example one triggered over HTTP) is reported
    /// as already running and skipped.
    pub async fn run_periodically(
        self: Arc<Self>,
        interval: Duration,
        progress: Arc<dyn ProgressCallback>,
    ) {
        self.run_periodically_with(interval, progress, |summary| {
            if let Some(reason) = summary.abort_reason() {
                log::warn!("Scheduled run aborted: {reason}");
            }
        })
        .await;
    }

    /// Like [`Self::run_periodically`], handing every run's summary to
    /// `on_summary`.
    pub async fn run_periodically_with<F>(
        self: Arc<Self>,
        interval: Duration,
        progress: Arc<dyn ProgressCallback>,
        mut on_summary: F,
    ) where
        F: FnMut(&IngestSummary) + Send,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        log::info!(
            "Scheduled ingestion every {}s from {}",
            interval.as_secs(),
            self.feed.location()
        );

        loop {
            ticker.tick().await;
            let summary = self.run(&progress).await;
            on_summary(&summary);
        }
    }
}

fn abort(
    feed_id: &str,
    reason: AbortReason,
    start: Instant,
    progress: &Arc<dyn ProgressCallback>,
) -> IngestSummary {
    log::error!("{feed_id}: run aborted: {reason}");
    progress.finish(format!("aborted: {reason}"));
    IngestSummary::aborted(feed_id, reason, start.elapsed())
}

fn enter(feed_id: &str, phase: RunPhase, progress: &Arc<dyn ProgressCallback>) {
    log::info!("{feed_id}: {phase}");
    progress.set_message(phase.to_string());
}

/// Counts newline-terminated data lines, for sizing a progress bar.
fn estimate_rows(bytes: &[u8]) -> u64 {
    let lines = bytes.iter().filter(|b| **b == b'\n').count() as u64;
    let unterminated = u64::from(bytes.last().is_some_and(|b| *b != b'\n'));
    (lines + unterminated).saturating_sub(1)
}
