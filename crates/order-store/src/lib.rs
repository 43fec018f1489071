//! Durable storage for order aggregates.
//!
//! - [`OrderRepository`]: the storage contract used by the order service
//! - [`PostgresOrderRepository`]: sqlx/PostgreSQL implementation
//! - [`InMemoryOrderRepository`]: in-process implementation for tests and local runs

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{Order, OrderUid};
pub use error::{Result, StoreError};
pub use memory::InMemoryOrderRepository;
pub use postgres::PostgresOrderRepository;
pub use store::OrderRepository;
