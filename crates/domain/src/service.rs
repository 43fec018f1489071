//! Order service orchestrating the order store and the cache.

use cache::{CacheMetrics, OrderCache};
use common::{Order, OrderUid};
use order_store::OrderRepository;

use crate::error::ServiceError;
use crate::validation::validate;

/// Keeps the cache and the order store consistent.
///
/// Writes go to the store first and reach the cache only after the store
/// accepted them. Reads try the cache first and fall back to the store,
/// caching what they find. No cache lock is held across a store call.
pub struct OrderService<R: OrderRepository> {
    repository: R,
    cache: OrderCache,
}

impl<R: OrderRepository> OrderService<R> {
    /// Creates a service over the given repository and cache.
    pub fn new(repository: R, cache: OrderCache) -> Self {
        Self { repository, cache }
    }

    /// Returns a reference to the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Returns a reference to the cache.
    pub fn cache(&self) -> &OrderCache {
        &self.cache
    }

    /// Ingests one serialized order.
    ///
    /// Returns the identifier of the stored order. On any failure the cache is
    /// left untouched.
    #[tracing::instrument(skip(self, payload), fields(bytes = payload.len()))]
    pub async fn process_message(&self, payload: &[u8]) -> Result<OrderUid, ServiceError> {
        let result = self.ingest(payload).await;

        match &result {
            Ok(order_uid) => {
                metrics::counter!("orders_ingested_total").increment(1);
                tracing::info!(%order_uid, "order ingested");
            }
            Err(err) => {
                metrics::counter!("orders_ingest_failures_total", "kind" => err.kind())
                    .increment(1);
            }
        }
        result
    }

    async fn ingest(&self, payload: &[u8]) -> Result<OrderUid, ServiceError> {
        let order = Order::from_json(payload)?;
        validate(&order)?;

        self.repository
            .create(&order)
            .await
            .map_err(ServiceError::PersistenceFailed)?;

        let order_uid = order.order_uid.clone();
        self.cache.set(order_uid.clone(), order).await;
        Ok(order_uid)
    }

    /// Looks up an order, serving from the cache when possible.
    ///
    /// A cache miss reads the store and caches the result before returning it.
    #[tracing::instrument(skip(self, order_uid), fields(order_uid = %order_uid))]
    pub async fn get_order(&self, order_uid: &OrderUid) -> Result<Order, ServiceError> {
        if order_uid.is_empty() {
            return Err(ServiceError::InvalidIdentifier);
        }

        if let Some(order) = self.cache.get(order_uid).await {
            tracing::debug!("served from cache");
            return Ok(order);
        }

        let order = self.repository.read(order_uid).await?;
        self.cache.set(order_uid.clone(), order.clone()).await;
        tracing::debug!("served from store");
        Ok(order)
    }

    /// Loads every stored order into the cache.
    ///
    /// Returns the number of orders loaded. If the store listing fails nothing
    /// is cached.
    #[tracing::instrument(skip(self))]
    pub async fn warm_cache(&self) -> Result<usize, ServiceError> {
        let orders = self
            .repository
            .list_all()
            .await
            .map_err(ServiceError::PersistenceFailed)?;

        let count = orders.len();
        self.cache.load_all(orders).await;
        tracing::info!(count, "cache warmed");
        Ok(count)
    }

    /// Current hit/miss counters of the cache.
    pub fn cache_metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }

    /// Number of cached orders.
    pub async fn cache_size(&self) -> usize {
        self.cache.size().await
    }
}
