#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Passenger traffic feed fetching and CSV row parsing.
//!
//! A [`FeedSource`] produces the raw bytes of one published CSV document
//! (over HTTP, or from a local file for bulk loads). [`parsing`] turns each
//! row of that document into a validated
//! [`TrafficRecord`](hk_immigration_source_models::TrafficRecord) or a
//! structured [`ParseFailure`](hk_immigration_source_models::ParseFailure).

pub mod feed;
pub mod parsing;
pub mod progress;
pub mod retry;

use async_trait::async_trait;

/// Errors that can occur while fetching or configuring a feed.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The feed configuration could not be loaded.
    #[error("Config error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// The remote end answered, but not with a usable document.
    #[error("Fetch failed: {message}")]
    Fetch {
        /// Description of what went wrong.
        message: String,
    },
}

/// Anything that can hand the pipeline one complete CSV document.
///
/// Implementations must bound how long [`FeedSource::fetch`] can wait; the
/// ingestion run has no other cancellation point.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Returns a short identifier for log messages.
    fn id(&self) -> &str;

    /// Returns where the document comes from (URL or path).
    fn location(&self) -> String;

    /// Retrieves the raw document bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the document cannot be retrieved.
    async fn fetch(&self) -> Result<Vec<u8>, SourceError>;
}
