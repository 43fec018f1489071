//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use cache::CacheMetrics;
use chrono::{DateTime, Utc};
use order_store::OrderRepository;
use serde::Serialize;

use crate::routes::orders::AppState;

pub const SERVICE_NAME: &str = "order-service";

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub service: &'static str,
    pub cache: CacheStatus,
}

/// Cache size next to the hit/miss counters.
#[derive(Serialize)]
pub struct CacheStatus {
    pub size: usize,
    #[serde(flatten)]
    pub metrics: CacheMetrics,
}

/// GET /health — liveness plus cache size and hit/miss counters.
pub async fn check<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
        service: SERVICE_NAME,
        cache: CacheStatus {
            size: state.order_service.cache_size().await,
            metrics: state.order_service.cache_metrics(),
        },
    })
}
