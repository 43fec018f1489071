//! Message handler trait.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{OrderService, ServiceError};
use order_store::OrderRepository;

/// Trait for processing one message payload.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Processes a payload. The error decides how the failure policy reacts.
    async fn handle(&self, payload: &[u8]) -> Result<(), ServiceError>;
}

#[async_trait]
impl<R: OrderRepository> MessageHandler for OrderService<R> {
    async fn handle(&self, payload: &[u8]) -> Result<(), ServiceError> {
        self.process_message(payload).await.map(|_| ())
    }
}

#[async_trait]
impl<H: MessageHandler + ?Sized> MessageHandler for Arc<H> {
    async fn handle(&self, payload: &[u8]) -> Result<(), ServiceError> {
        (**self).handle(payload).await
    }
}
