//! Shared types for the order cache service.
//!
//! - [`OrderUid`]: producer-assigned order identifier
//! - [`Order`] and its nested [`Delivery`], [`Payment`] and [`Item`] records

pub mod order;
pub mod types;

pub use order::{Delivery, Item, Order, Payment};
pub use types::OrderUid;
