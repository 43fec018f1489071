use common::OrderUid;
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No order with the given identifier exists.
    #[error("Order not found: {0}")]
    NotFound(OrderUid),

    /// An order with the given identifier has already been stored.
    #[error("Order already exists: {0}")]
    AlreadyExists(OrderUid),

    /// The header row exists but a nested record is missing.
    #[error("Order {order_uid} is incomplete: missing {missing}")]
    Incomplete {
        order_uid: OrderUid,
        missing: &'static str,
    },

    /// The backend cannot serve requests right now.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns true if retrying the same call could succeed.
    ///
    /// Only connection-level database failures qualify. Constraint
    /// violations, bad column data and decode errors fail the same way on
    /// every attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Database(err) => matches!(
                err,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            _ => false,
        }
    }
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
