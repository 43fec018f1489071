use async_trait::async_trait;
use common::{Order, OrderUid};

use crate::Result;

/// Durable storage for order aggregates.
///
/// Writing an order is atomic: the header and every nested record are
/// stored together or not at all. Implementations must be thread-safe.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persists a new order aggregate.
    ///
    /// Fails with `AlreadyExists` if an order with the same identifier has
    /// already been stored.
    async fn create(&self, order: &Order) -> Result<()>;

    /// Reads a single order aggregate.
    ///
    /// Fails with `NotFound` if no such order exists.
    async fn read(&self, order_uid: &OrderUid) -> Result<Order>;

    /// Reads every stored order aggregate.
    async fn list_all(&self) -> Result<Vec<Order>>;
}
