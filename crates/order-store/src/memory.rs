use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{Order, OrderRepository, OrderUid, Result, StoreError};

/// In-memory order repository.
///
/// Provides the same contract as the PostgreSQL implementation. Used for
/// tests and for running the service without a database. Failures can be
/// injected, and every call is counted so tests can assert on store traffic.
#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<OrderUid, Order>>>,
    fail_writes: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
    create_calls: Arc<AtomicUsize>,
    read_calls: Arc<AtomicUsize>,
    list_calls: Arc<AtomicUsize>,
}

impl InMemoryOrderRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-populated with the given orders.
    pub async fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let repository = Self::new();
        {
            let mut stored = repository.orders.write().await;
            for order in orders {
                stored.insert(order.order_uid.clone(), order);
            }
        }
        repository
    }

    /// Makes every subsequent `create` fail with `Unavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `read` and `list_all` fail with `Unavailable`.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Number of `create` calls received, including failed ones.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of `read` calls received, including failed ones.
    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// Number of `list_all` calls received, including failed ones.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: &Order) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }

        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.order_uid) {
            return Err(StoreError::AlreadyExists(order.order_uid.clone()));
        }
        orders.insert(order.order_uid.clone(), order.clone());
        Ok(())
    }

    async fn read(&self, order_uid: &OrderUid) -> Result<Order> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }

        self.orders
            .read()
            .await
            .get(order_uid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(order_uid.clone()))
    }

    async fn list_all(&self) -> Result<Vec<Order>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }

        let mut orders: Vec<_> = self.orders.read().await.values().cloned().collect();
        orders.sort_by(|a, b| a.order_uid.cmp(&b.order_uid));
        Ok(orders)
    }
}
