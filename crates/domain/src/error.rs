//! Service error types.

use common::OrderUid;
use order_store::StoreError;
use thiserror::Error;

use crate::ValidationError;

/// Errors returned by [`OrderService`](crate::OrderService).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The payload could not be decoded into an order.
    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// The decoded order breaks a business rule.
    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// The order store returned an error.
    #[error("Persistence failed: {0}")]
    PersistenceFailed(#[source] StoreError),

    /// No order with the given identifier exists.
    #[error("Order not found: {0}")]
    NotFound(OrderUid),

    /// The caller passed an empty order identifier.
    #[error("Invalid order identifier")]
    InvalidIdentifier,
}

impl ServiceError {
    /// Returns true if processing the same input again could succeed.
    ///
    /// Decoding and validation failures are permanent. Store failures are
    /// transient unless the store reports a conflict or a damaged record.
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::PersistenceFailed(err) => err.is_transient(),
            _ => false,
        }
    }

    /// Short label used for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::MalformedPayload(_) => "malformed_payload",
            ServiceError::ValidationFailed(_) => "validation_failed",
            ServiceError::PersistenceFailed(_) => "persistence_failed",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::InvalidIdentifier => "invalid_identifier",
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(order_uid) => ServiceError::NotFound(order_uid),
            other => ServiceError::PersistenceFailed(other),
        }
    }
}
