//! Business rules an order must satisfy before it is stored.

use common::Order;
use thiserror::Error;

/// The first rule an order violates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("order_uid is required")]
    MissingOrderUid,

    #[error("track_number is required")]
    MissingTrackNumber,

    #[error("order must contain at least one item")]
    NoItems,
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingOrderUid => "order_uid",
            ValidationError::MissingTrackNumber => "track_number",
            ValidationError::NoItems => "items",
        }
    }
}

/// Checks `order_uid`, then `track_number`, then `items`, stopping at the first
/// violation.
pub fn validate(order: &Order) -> Result<(), ValidationError> {
    if order.order_uid.is_empty() {
        return Err(ValidationError::MissingOrderUid);
    }
    if order.track_number.is_empty() {
        return Err(ValidationError::MissingTrackNumber);
    }
    if order.items.is_empty() {
        return Err(ValidationError::NoItems);
    }
    Ok(())
}
