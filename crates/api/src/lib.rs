//! HTTP front end for the order service.
//!
//! Serves order lookups by identifier, accepts orders onto the ingestion
//! queue, and exposes health and Prometheus metrics, with structured logging
//! (tracing) on every request.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use domain::OrderService;
use ingest::QueueProducer;
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::OrderRepository;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Upper bound on handling a single request; slower requests get 408.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<R: OrderRepository + 'static>(
    state: Arc<AppState<R>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<R>))
        .route("/order/", get(routes::orders::get_without_id::<R>))
        .route("/order/{order_uid}", get(routes::orders::get::<R>))
        .route("/orders", post(routes::ingest::publish::<R>))
        .with_state(state)
        .merge(metrics_router)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state shared by the handlers.
pub fn create_state<R: OrderRepository + 'static>(
    order_service: Arc<OrderService<R>>,
    producer: QueueProducer,
) -> Arc<AppState<R>> {
    Arc::new(AppState {
        order_service,
        producer,
    })
}
