//! Order lookup endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{Order, OrderUid};
use domain::OrderService;
use ingest::QueueProducer;
use order_store::OrderRepository;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<R: OrderRepository> {
    pub order_service: Arc<OrderService<R>>,
    /// Publishing side of the ingestion queue.
    pub producer: QueueProducer,
}

/// GET /order/{order_uid} — returns the order, from the cache when possible.
#[tracing::instrument(skip(state))]
pub async fn get<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(order_uid): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .order_service
        .get_order(&OrderUid::new(order_uid))
        .await?;
    Ok(Json(order))
}

/// GET /order/ — a lookup without an identifier.
pub async fn get_without_id<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<Json<Order>, ApiError> {
    let order = state.order_service.get_order(&OrderUid::default()).await?;
    Ok(Json(order))
}
