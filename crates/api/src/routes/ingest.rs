//! Ingestion endpoint feeding the order queue.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use order_store::OrderRepository;
use serde::Serialize;

use crate::error::ApiError;
use crate::routes::orders::AppState;

#[derive(Serialize)]
pub struct PublishedResponse {
    pub partition: i32,
    pub offset: i64,
}

/// POST /orders — enqueues the raw body for the queue consumer.
///
/// The payload is not inspected here; decoding and validation happen when the
/// consumer processes it.
#[tracing::instrument(skip(state, body), fields(bytes = body.len()))]
pub async fn publish<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    body: Bytes,
) -> Result<(StatusCode, Json<PublishedResponse>), ApiError> {
    let offset = state.producer.publish(body.to_vec()).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(PublishedResponse {
            partition: state.producer.partition(),
            offset,
        }),
    ))
}
