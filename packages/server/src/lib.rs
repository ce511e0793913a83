#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for Hong Kong immigration passenger traffic.
//!
//! Serves the compact traffic payload, its code dictionary, a health check
//! backed by a storage ping, and an endpoint that triggers an ingestion
//! run. Optionally runs ingestion in the background on a fixed interval.

mod handlers;
pub mod query;

use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use hk_immigration_database::DbError;
use hk_immigration_ingest::{IngestError, IngestPipeline};
use hk_immigration_source::progress::null_progress;

use crate::query::QueryService;

/// Comma-separated list of origins allowed by CORS.
pub const ENV_ALLOWED_ORIGINS: &str = "HK_IMMIGRATION_ALLOWED_ORIGINS";
/// Seconds between background ingestion runs.
pub const ENV_SYNC_INTERVAL_SECS: &str = "HK_IMMIGRATION_SYNC_INTERVAL_SECS";

/// Errors that can occur while starting the server or exporting data.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Invalid server environment.
    #[error("Config error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// Pipeline setup failed.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Storage read failed.
    #[error(transparent)]
    Database(#[from] DbError),

    /// Payload serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binding or serving failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    /// Ingestion pipeline; also owns the storage handle.
    pub pipeline: Arc<IngestPipeline>,
    /// Compact read path over the same storage.
    pub query: QueryService,
}

impl AppState {
    /// Builds state around `pipeline`, reading from the store it writes to.
    #[must_use]
    pub fn new(pipeline: Arc<IngestPipeline>) -> Self {
        let query = QueryService::new(pipeline.storage().clone());
        Self { pipeline, query }
    }
}

/// Listener and scheduling settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_addr: String,
    /// Port to bind.
    pub port: u16,
    /// CORS allowlist. Empty allows any origin.
    pub allowed_origins: Vec<String>,
    /// Background ingestion interval, if enabled.
    pub sync_interval: Option<Duration>,
}

impl ServerConfig {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if `PORT` or the sync interval is
    /// not a valid number.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if `PORT` or the sync interval is
    /// not a valid number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ServerError::Config {
                message: format!("PORT must be a port number, got {raw:?}"),
            })?,
            None => 8080,
        };

        let allowed_origins = lookup(ENV_ALLOWED_ORIGINS)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let sync_interval = match lookup(ENV_SYNC_INTERVAL_SECS) {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| ServerError::Config {
                        message: format!(
                            "{ENV_SYNC_INTERVAL_SECS} must be a positive integer, got {raw:?}"
                        ),
                    })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            bind_addr,
            port,
            allowed_origins,
            sync_interval,
        })
    }
}

/// Registers every route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::health)).service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/immigration-data", web::get().to(handlers::immigration_data))
            .route("/updatedb", web::post().to(handlers::update_db))
            .route("/updatedb", web::get().to(handlers::update_db))
            .route("/dictionary", web::get().to(handlers::dictionary)),
    );
}

fn cors(allowed_origins: &[String]) -> Cors {
    if allowed_origins.is_empty() {
        return Cors::permissive();
    }

    allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_any_header()
        .max_age(3600)
}

/// Starts the API server.
///
/// Spawns the background ingestion loop first if
/// [`ServerConfig::sync_interval`] is set. This is a regular async
/// function; the caller provides the runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an I/O error if the server fails to bind or encounters a
/// runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig, pipeline: Arc<IngestPipeline>) -> std::io::Result<()> {
    if let Some(interval) = config.sync_interval {
        actix_web::rt::spawn(pipeline.clone().run_periodically(interval, null_progress()));
    }

    if config.allowed_origins.is_empty() {
        log::warn!("{ENV_ALLOWED_ORIGINS} is unset; allowing any origin");
    } else {
        log::info!("CORS allowlist: {}", config.allowed_origins.join(", "));
    }

    let state = web::Data::new(AppState::new(pipeline));
    let allowed_origins = config.allowed_origins.clone();

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(cors(&allowed_origins))
            .wrap(middleware::Compress::default())
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await
}

/// Renders the full compact payload as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`ServerError`] if storage cannot be read.
pub async fn export_json(query: &QueryService) -> Result<String, ServerError> {
    let records = query.fetch_compact().await?;
    log::info!("Exporting {} compact records", records.len());
    Ok(serde_json::to_string_pretty(&records)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use async_trait::async_trait;
    use hk_immigration_database::memory::MemoryStorage;
    use hk_immigration_server_models::CompactRecord;
    use hk_immigration_source::feed::FeedConfig;
    use hk_immigration_source::{FeedSource, SourceError};

    struct StaticFeed(Option<&'static str>);

    #[async_trait]
    impl FeedSource for StaticFeed {
        fn id(&self) -> &str {
            "static"
        }

        fn location(&self) -> String {
            "memory".to_string()
        }

        async fn fetch(&self) -> Result<Vec<u8>, SourceError> {
            self.0
                .map(|body| body.as_bytes().to_vec())
                .ok_or_else(|| SourceError::Fetch {
                    message: "HTTP 404 Not Found".to_string(),
                })
        }
    }

    const FEED: &str = "Date,Control Point,Arrival / Departure,HK,Mainland,Other,Total\n\
                        01-01-2024,Airport,Arrival,10,20,5,35\n\
                        01-01-2024,Lo Wu,Departure,1,2,3,6\n\
                        01-01-2024,Lo Wu,Arrival\n";

    fn state(storage: Arc<MemoryStorage>, body: Option<&'static str>) -> web::Data<AppState> {
        let config = FeedConfig::parse_toml(
            "id = \"test\"\nname = \"Test\"\nurl = \"http://localhost/feed.csv\"",
        )
        .unwrap();
        let pipeline = IngestPipeline::new(storage, Arc::new(StaticFeed(body)), config);
        web::Data::new(AppState::new(Arc::new(pipeline)))
    }

    #[actix_web::test]
    async fn updatedb_then_read_compact_payload() {
        let storage = Arc::new(MemoryStorage::new());
        let app =
            test::init_service(App::new().app_data(state(storage, Some(FEED))).configure(configure))
                .await;

        let req = test::TestRequest::post().uri("/api/updatedb").to_request();
        let summary: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(summary["state"], "COMPLETED");
        assert_eq!(summary["inserted"], 2);
        assert_eq!(summary["failed"], 1);

        let req = test::TestRequest::get().uri("/api/immigration-data").to_request();
        let records: Vec<CompactRecord> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].control_point_id, 0);
        assert_eq!(records[0].direction_id, 1);
        assert_eq!(records[1].control_point_id, 2);
        assert_eq!(records[1].total, 35);
    }

    #[actix_web::test]
    async fn fetch_failure_maps_to_bad_gateway() {
        let storage = Arc::new(MemoryStorage::new());
        let app =
            test::init_service(App::new().app_data(state(storage, None)).configure(configure))
                .await;

        let req = test::TestRequest::get().uri("/api/updatedb").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[actix_web::test]
    async fn health_follows_storage_ping() {
        let storage = Arc::new(MemoryStorage::new());
        let app = test::init_service(
            App::new()
                .app_data(state(storage.clone(), Some(FEED)))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["engine"], "memory");

        storage.set_reachable(false);
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let req = test::TestRequest::post().uri("/api/updatedb").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn dictionary_is_served() {
        let app = test::init_service(
            App::new()
                .app_data(state(Arc::new(MemoryStorage::new()), None))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/dictionary").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["controlPoints"][4]["name"], "Hong Kong-Zhuhai-Macao Bridge");
        assert_eq!(body["directions"][0]["name"], "Arrival");
        assert_eq!(body["unknownCode"], -1);
    }

    #[::core::prelude::v1::test]
    fn config_defaults_and_overrides() {
        let defaults = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(defaults.bind_addr, "127.0.0.1");
        assert_eq!(defaults.port, 8080);
        assert!(defaults.allowed_origins.is_empty());
        assert_eq!(defaults.sync_interval, None);

        let config = ServerConfig::from_lookup(|key| match key {
            "PORT" => Some("9000".to_string()),
            ENV_ALLOWED_ORIGINS => Some("https://a.example, https://b.example".to_string()),
            ENV_SYNC_INTERVAL_SECS => Some("3600".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.allowed_origins.len(), 2);
        assert_eq!(config.sync_interval, Some(Duration::from_secs(3600)));
    }

    #[::core::prelude::v1::test]
    fn bad_numbers_are_config_errors() {
        assert!(ServerConfig::from_lookup(|key| (key == "PORT").then(|| "http".to_string())).is_err());
        assert!(
            ServerConfig::from_lookup(|key| (key == ENV_SYNC_INTERVAL_SECS).then(|| "0".to_string()))
                .is_err()
        );
    }

    #[tokio::test]
    async fn export_renders_json_array() {
        let storage = Arc::new(MemoryStorage::new());
        let json = export_json(&QueryService::new(storage)).await.unwrap();
        assert_eq!(json.trim(), "[]");
    }
}
