//! Concurrent order cache with hit/miss accounting.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use common::{Order, OrderUid};
use tokio::sync::RwLock;

use crate::CacheMetrics;

/// In-memory cache of order aggregates keyed by order id.
///
/// Lookups share a read lock; inserts take the write lock. Values move into
/// the cache on insert and are cloned on the way out, so a caller never holds
/// memory the cache can see. The counters live behind their own mutex and are
/// updated while the read guard is still held, which keeps a [`metrics`]
/// snapshot consistent: every `get` moves exactly one counter.
///
/// Cloning the cache yields another handle onto the same entries.
///
/// There is no eviction and no capacity bound. The cache grows with the
/// number of distinct orders seen.
///
/// [`metrics`]: OrderCache::metrics
#[derive(Clone, Default)]
pub struct OrderCache {
    orders: Arc<RwLock<HashMap<OrderUid, Order>>>,
    metrics: Arc<Mutex<CacheMetrics>>,
}

impl OrderCache {
    /// Creates a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `order` under `key`, replacing any previous entry.
    pub async fn set(&self, key: OrderUid, order: Order) {
        let mut orders = self.orders.write().await;
        orders.insert(key, order);
        let size = orders.len();
        drop(orders);

        metrics::gauge!("cache_entries").set(size as f64);
    }

    /// Returns a copy of the order stored under `key`.
    ///
    /// Counts a hit when the entry exists and a miss otherwise.
    pub async fn get(&self, key: &OrderUid) -> Option<Order> {
        let orders = self.orders.read().await;
        let found = orders.get(key).cloned();
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(found.is_some());
        drop(orders);

        if found.is_some() {
            metrics::counter!("cache_hits_total").increment(1);
        } else {
            metrics::counter!("cache_misses_total").increment(1);
        }
        found
    }

    /// Inserts every order under its own id in one exclusive section.
    ///
    /// Later duplicates overwrite earlier ones. Counters are untouched.
    pub async fn load_all(&self, orders: impl IntoIterator<Item = Order>) {
        let mut cached = self.orders.write().await;
        for order in orders {
            cached.insert(order.order_uid.clone(), order);
        }
        let size = cached.len();
        drop(cached);

        metrics::gauge!("cache_entries").set(size as f64);
        tracing::debug!(size, "cache bulk load complete");
    }

    /// Returns the number of cached orders.
    pub async fn size(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Returns a snapshot of the hit/miss counters.
    pub fn metrics(&self) -> CacheMetrics {
        *self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Item;

    fn make_order(uid: &str, track_number: &str) -> Order {
        Order {
            order_uid: OrderUid::new(uid),
            track_number: track_number.to_string(),
            items: vec![Item {
                name: "Widget".to_string(),
                price: 1000,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn set_then_get_returns_order() {
        let cache = OrderCache::new();
        let order = make_order("a", "T1");

        cache.set(order.order_uid.clone(), order.clone()).await;

        assert_eq!(cache.get(&OrderUid::new("a")).await, Some(order));
    }

    #[tokio::test]
    async fn returned_copy_is_isolated() {
        let cache = OrderCache::new();
        cache.set(OrderUid::new("a"), make_order("a", "T1")).await;

        let mut copy = cache.get(&OrderUid::new("a")).await.unwrap();
        copy.track_number = "CHANGED".to_string();
        copy.items.clear();

        let again = cache.get(&OrderUid::new("a")).await.unwrap();
        assert_eq!(again.track_number, "T1");
        assert_eq!(again.items.len(), 1);
    }

    #[tokio::test]
    async fn miss_increments_only_misses() {
        let cache = OrderCache::new();

        assert!(cache.get(&OrderUid::new("missing")).await.is_none());

        assert_eq!(cache.metrics(), CacheMetrics { hits: 0, misses: 1 });
    }

    #[tokio::test]
    async fn hit_increments_only_hits() {
        let cache = OrderCache::new();
        cache.set(OrderUid::new("a"), make_order("a", "T1")).await;

        cache.get(&OrderUid::new("a")).await;

        assert_eq!(cache.metrics(), CacheMetrics { hits: 1, misses: 0 });
    }

    #[tokio::test]
    async fn set_and_load_all_leave_counters_alone() {
        let cache = OrderCache::new();
        cache.set(OrderUid::new("a"), make_order("a", "T1")).await;
        cache.load_all(vec![make_order("b", "T2")]).await;

        assert_eq!(cache.metrics(), CacheMetrics::default());
    }

    #[tokio::test]
    async fn set_overwrites_existing_entry() {
        let cache = OrderCache::new();
        cache.set(OrderUid::new("a"), make_order("a", "T1")).await;
        cache.set(OrderUid::new("a"), make_order("a", "T2")).await;

        assert_eq!(cache.size().await, 1);
        let order = cache.get(&OrderUid::new("a")).await.unwrap();
        assert_eq!(order.track_number, "T2");
    }

    #[tokio::test]
    async fn load_all_distinct_ids() {
        let cache = OrderCache::new();
        cache
            .load_all(vec![make_order("a", "T1"), make_order("b", "T2")])
            .await;

        assert_eq!(cache.size().await, 2);
    }

    #[tokio::test]
    async fn load_all_duplicate_ids_last_write_wins() {
        let cache = OrderCache::new();
        cache
            .load_all(vec![make_order("a", "FIRST"), make_order("a", "SECOND")])
            .await;

        assert_eq!(cache.size().await, 1);
        let order = cache.get(&OrderUid::new("a")).await.unwrap();
        assert_eq!(order.track_number, "SECOND");
    }

    #[tokio::test]
    async fn clones_share_entries_and_counters() {
        let cache = OrderCache::new();
        let handle = cache.clone();

        handle.set(OrderUid::new("a"), make_order("a", "T1")).await;
        assert!(cache.get(&OrderUid::new("a")).await.is_some());

        assert_eq!(handle.metrics().hits, 1);
    }
}
