//! Feed configuration and the concrete [`FeedSource`] implementations.
//!
//! The default configuration is `feed.toml`, baked into the binary at
//! compile time. A different TOML file can replace it at startup, and a
//! handful of environment variables override individual fields after that.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{FeedSource, SourceError, retry};

/// Embedded default feed configuration.
const EMBEDDED_FEED_TOML: &str = include_str!("../feed.toml");

/// Overrides [`FeedConfig::url`].
pub const ENV_FEED_URL: &str = "HK_IMMIGRATION_FEED_URL";
/// Overrides [`FeedConfig::timeout_secs`].
pub const ENV_FETCH_TIMEOUT_SECS: &str = "HK_IMMIGRATION_FETCH_TIMEOUT_SECS";
/// Overrides [`FeedConfig::removed_control_points`] (comma separated).
pub const ENV_REMOVED_CONTROL_POINTS: &str = "HK_IMMIGRATION_REMOVED_CONTROL_POINTS";

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_max_retries() -> u32 {
    2
}

/// Where the passenger traffic feed lives and how to treat it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedConfig {
    /// Short identifier for log messages.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Download URL of the CSV document.
    pub url: String,
    /// Upper bound on a single HTTP attempt, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries after the first attempt for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Control points that have permanently ceased reporting. Rows naming
    /// one of these are skipped rather than written.
    #[serde(default)]
    pub removed_control_points: BTreeSet<String>,
}

impl FeedConfig {
    /// Loads the embedded default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if the embedded TOML is malformed.
    pub fn embedded() -> Result<Self, SourceError> {
        Self::parse_toml(EMBEDDED_FEED_TOML)
    }

    /// Loads a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, SourceError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_toml(&text)
    }

    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if the TOML is malformed or missing
    /// required keys.
    pub fn parse_toml(text: &str) -> Result<Self, SourceError> {
        toml::from_str(text).map_err(|e| SourceError::Config {
            message: e.to_string(),
        })
    }

    /// Loads the file at `path` if given, otherwise the embedded default,
    /// then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the chosen TOML cannot be loaded or an
    /// override is malformed.
    pub fn load(path: Option<&Path>) -> Result<Self, SourceError> {
        let base = match path {
            Some(path) => {
                log::info!("Loading feed config from {}", path.display());
                Self::from_file(path)?
            }
            None => Self::embedded()?,
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides looked up through `lookup` (normally the process
    /// environment).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if the timeout override is not a
    /// positive integer.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, SourceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_FEED_URL) {
            self.url = url;
        }

        if let Some(raw) = lookup(ENV_FETCH_TIMEOUT_SECS) {
            self.timeout_secs = raw
                .trim()
                .parse()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| SourceError::Config {
                    message: format!("{ENV_FETCH_TIMEOUT_SECS} must be a positive integer, got {raw:?}"),
                })?;
        }

        if let Some(raw) = lookup(ENV_REMOVED_CONTROL_POINTS) {
            self.removed_control_points = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(self)
    }

    /// Returns the per-attempt fetch timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns `true` if rows for `control_point` should be skipped.
    #[must_use]
    pub fn is_removed(&self, control_point: &str) -> bool {
        self.removed_control_points.contains(control_point)
    }
}

/// Downloads the feed over HTTP.
pub struct HttpFeed {
    id: String,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl HttpFeed {
    /// Builds an HTTP feed from `config`. Every request is bounded by
    /// [`FeedConfig::timeout`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &FeedConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent("hk-immigration/1.0")
            .connect_timeout(config.timeout())
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            id: config.id.clone(),
            url: config.url.clone(),
            max_retries: config.max_retries,
            client,
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeed {
    fn id(&self) -> &str {
        &self.id
    }

    fn location(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<Vec<u8>, SourceError> {
        retry::send_bytes(|| self.client.get(&self.url), self.max_retries).await
    }
}

/// Reads a previously downloaded copy of the feed from disk.
pub struct FileFeed {
    path: PathBuf,
}

impl FileFeed {
    /// Creates a feed backed by the CSV file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FeedSource for FileFeed {
    fn id(&self) -> &str {
        "file"
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Vec<u8>, SourceError> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::net::TcpListener;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn embedded_config_parses() {
        let config = FeedConfig::embedded().unwrap();
        assert_eq!(config.id, "immd_daily_passenger_traffic");
        assert!(config.url.starts_with("https://"));
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert!(config.removed_control_points.is_empty());
    }

    #[test]
    fn defaults_fill_optional_keys() {
        let config = FeedConfig::parse_toml(
            r#"
            id = "test"
            name = "Test"
            url = "http://localhost/feed.csv"
            "#,
        )
        .unwrap();
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.max_retries, 2);
        assert!(!config.is_removed("Hung Hom"));
    }

    #[test]
    fn missing_url_is_a_config_error() {
        let err = FeedConfig::parse_toml("id = \"x\"\nname = \"y\"").unwrap_err();
        assert!(matches!(err, SourceError::Config { .. }));
    }

    #[test]
    fn overrides_replace_fields() {
        let config = FeedConfig::embedded()
            .unwrap()
            .with_overrides(|key| match key {
                ENV_FEED_URL => Some("http://mirror.local/feed.csv".to_string()),
                ENV_FETCH_TIMEOUT_SECS => Some("3".to_string()),
                ENV_REMOVED_CONTROL_POINTS => Some("Hung Hom, China Ferry Terminal,".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.url, "http://mirror.local/feed.csv");
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert!(config.is_removed("Hung Hom"));
        assert!(config.is_removed("China Ferry Terminal"));
        assert_eq!(config.removed_control_points.len(), 2);
    }

    #[test]
    fn zero_timeout_override_is_rejected() {
        let result = FeedConfig::embedded().unwrap().with_overrides(|key| {
            (key == ENV_FETCH_TIMEOUT_SECS).then(|| "0".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn no_overrides_keeps_embedded_values() {
        let embedded = FeedConfig::embedded().unwrap();
        assert_eq!(embedded.clone().with_overrides(no_env).unwrap(), embedded);
    }

    #[tokio::test]
    async fn file_feed_reads_bytes() {
        let path = std::env::temp_dir().join(format!("feed-{}.csv", uuid::Uuid::new_v4()));
        std::fs::write(&path, "header\n01-01-2024,Airport,Arrival,1,2,3,6\n").unwrap();

        let feed = FileFeed::new(&path);
        let bytes = feed.fetch().await.unwrap();
        assert!(bytes.starts_with(b"header"));

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let feed = FileFeed::new("/definitely/not/here.csv");
        assert!(matches!(feed.fetch().await, Err(SourceError::Io(_))));
    }

    fn http_config(url: String, timeout_secs: u64, max_retries: u32) -> FeedConfig {
        FeedConfig {
            id: "local".to_string(),
            name: "Local".to_string(),
            url,
            timeout_secs,
            max_retries,
            removed_control_points: BTreeSet::new(),
        }
    }

    /// Answers every connection with `response` and counts requests.
    async fn serve(response: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/feed.csv", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (url, hits)
    }

    #[tokio::test]
    async fn http_feed_returns_the_body() {
        let (url, hits) = serve(
            "HTTP/1.1 200 OK\r\nContent-Length: 6\r\nConnection: close\r\n\r\nheader",
        )
        .await;

        let feed = HttpFeed::new(&http_config(url, 5, 2)).unwrap();
        assert_eq!(feed.fetch().await.unwrap(), b"header");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/feed.csv", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let feed = HttpFeed::new(&http_config(url, 1, 0)).unwrap();
        let start = Instant::now();
        let result = tokio::time::timeout(Duration::from_secs(10), feed.fetch())
            .await
            .expect("fetch must not hang past its own timeout");

        assert!(matches!(result, Err(SourceError::Http(ref e)) if e.is_timeout()));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let (url, hits) = serve(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let feed = HttpFeed::new(&http_config(url, 5, 2)).unwrap();
        let err = feed.fetch().await.unwrap_err();

        assert!(matches!(err, SourceError::Fetch { ref message } if message.contains("404")));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn server_errors_are_retried_up_to_the_limit() {
        let (url, hits) = serve(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let feed = HttpFeed::new(&http_config(url, 5, 1)).unwrap();
        let err = feed.fetch().await.unwrap_err();

        assert!(matches!(err, SourceError::Fetch { ref message } if message.contains("503")));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rate_limiting_is_retried() {
        let (url, hits) = serve(
            "HTTP/1.1 429 Too Many Requests\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let feed = HttpFeed::new(&http_config(url, 5, 1)).unwrap();
        assert!(feed.fetch().await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
