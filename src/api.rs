//! HTTP surface of the service.
//!
//! `GET /api/v1/rainfall` returns the readings inside a versioned envelope:
//!   200 `{"ok": true, "fetchedAt": "...", "data": [...]}` plus `X-Cache: HIT|MISS`
//!   500 `{"ok": false, "error": "..."}`
//! A failed refresh is never partially serialized.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::cache::Snapshot;
use crate::logging::DataSource;
use crate::model::Reading;
use crate::pipeline::RainfallService;

pub const RAINFALL_PATH: &str = "/api/v1/rainfall";

pub static CACHE_HEADER: HeaderName = HeaderName::from_static("x-cache");

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RainfallOk<'a> {
    pub ok: bool,
    pub fetched_at: DateTime<Utc>,
    pub data: &'a [Reading],
}

#[derive(Debug, Serialize)]
pub struct RainfallErr {
    pub ok: bool,
    pub error: String,
}

impl<'a> From<&'a Snapshot> for RainfallOk<'a> {
    fn from(snap: &'a Snapshot) -> Self {
        RainfallOk {
            ok: true,
            fetched_at: snap.fetched_at,
            data: &snap.readings,
        }
    }
}

/// Router exposing the rainfall endpoint and a health probe.
pub fn router(service: Arc<RainfallService>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(RAINFALL_PATH, get(rainfall))
        .with_state(service)
}

/// `router` with permissive CORS, for browser dashboards.
pub fn router_with_cors(service: Arc<RainfallService>) -> Router {
    router(service).layer(CorsLayer::very_permissive())
}

async fn rainfall(State(service): State<Arc<RainfallService>>) -> Response {
    match service.readings().await {
        Ok(snap) => {
            tracing::debug!(
                source = %DataSource::Api,
                cache = snap.status.as_str(),
                count = snap.readings.len(),
                "serving readings"
            );
            let header = HeaderValue::from_static(snap.status.as_str());
            (
                StatusCode::OK,
                [(CACHE_HEADER.clone(), header)],
                Json(RainfallOk::from(&snap)),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(RainfallErr {
                ok: false,
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}
