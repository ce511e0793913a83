#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal helpers for the ingestion CLI.
//!
//! [`RowsProgress`] renders an ingestion run's [`ProgressCallback`] updates
//! as an `indicatif` bar, and [`init_logger`] routes `log` output through
//! `indicatif-log-bridge` so log lines don't tear the bar.

use std::sync::Arc;
use std::time::Duration;

use hk_immigration_source::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// An `indicatif` bar counting feed rows.
///
/// Starts as a spinner showing the run phase and becomes a bar once the
/// row count is known.
pub struct RowsProgress {
    bar: ProgressBar,
    bar_style: ProgressStyle,
}

impl RowsProgress {
    /// Adds a row-counting bar to `multi`.
    #[must_use]
    pub fn new(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let bar_style = ProgressStyle::with_template(
            "  {msg} {wide_bar:.cyan/dim} {pos}/{len} rows {percent}% [{eta}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Arc::new(Self { bar, bar_style })
    }
}

impl ProgressCallback for RowsProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.bar_style.clone());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Initializes `pretty_env_logger` from `RUST_LOG`, wrapped so that log
/// lines are printed above any bar in the returned [`MultiProgress`].
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // Fails only if a logger is already installed (tests).
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_tracks_rows_after_total_is_known() {
        let multi = MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden());
        let progress = RowsProgress::new(&multi, "FETCHING");

        progress.set_total(3);
        progress.inc(1);
        progress.inc(2);
        progress.finish("done".to_string());
    }

    #[test]
    fn init_logger_is_repeatable() {
        let _first = init_logger();
        let _second = init_logger();
        log::info!("logger installed");
    }
}
