//! Order service: the layer that keeps the cache and the order store consistent.
//!
//! - [`OrderService::process_message`]: decode, validate, store, then cache
//! - [`OrderService::get_order`]: cache-aside lookup
//! - [`OrderService::warm_cache`]: bulk load of every stored order at startup

pub mod error;
pub mod service;
pub mod validation;

pub use error::ServiceError;
pub use service::OrderService;
pub use validation::{ValidationError, validate};
