//! HTTP handler functions for the passenger traffic API.

use actix_web::{HttpResponse, web};
use hk_immigration_database_models::StorageHealth;
use hk_immigration_ingest_models::{AbortReason, RunState};
use hk_immigration_server_models::{ApiDictionary, ApiHealth, ApiIngestSummary};
use hk_immigration_source::progress::null_progress;

use crate::AppState;

/// `GET /` and `GET /api/health`
///
/// 200 when storage answers its ping, 503 otherwise.
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let storage = state.pipeline.storage();
    let engine = storage.engine().to_string();
    let version = env!("CARGO_PKG_VERSION").to_string();

    match storage.ping().await {
        StorageHealth::Healthy => HttpResponse::Ok().json(ApiHealth {
            status: "healthy".to_string(),
            engine,
            reason: None,
            version,
        }),
        StorageHealth::Unreachable { reason } => HttpResponse::ServiceUnavailable().json(ApiHealth {
            status: "unhealthy".to_string(),
            engine,
            reason: Some(reason),
            version,
        }),
    }
}

/// `GET /api/immigration-data`
///
/// Returns every stored row in compact form.
pub async fn immigration_data(state: web::Data<AppState>) -> HttpResponse {
    match state.query.fetch_compact().await {
        Ok(records) => {
            log::info!("Serving {} compact records", records.len());
            HttpResponse::Ok().json(records)
        }
        Err(e) => {
            log::error!("Failed to read immigration data: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to read immigration data"
            }))
        }
    }
}

/// `POST /api/updatedb` (also `GET`)
///
/// Runs one ingestion pass and returns its summary. Row failures don't
/// change the status code; only an aborted run does.
pub async fn update_db(state: web::Data<AppState>) -> HttpResponse {
    let summary = state.pipeline.run(&null_progress()).await;

    let mut response = match &summary.state {
        RunState::Completed => HttpResponse::Ok(),
        RunState::Aborted(AbortReason::AlreadyRunning) => HttpResponse::Conflict(),
        RunState::Aborted(AbortReason::FetchFailed { .. }) => HttpResponse::BadGateway(),
        RunState::Aborted(AbortReason::StorageUnavailable { .. }) => {
            HttpResponse::ServiceUnavailable()
        }
    };

    response.json(ApiIngestSummary::from(summary))
}

/// `GET /api/dictionary`
///
/// Returns the code tables used by `/api/immigration-data`.
pub async fn dictionary() -> HttpResponse {
    HttpResponse::Ok().json(ApiDictionary::current())
}
