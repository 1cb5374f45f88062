//! `turnstile-core`: sample domain records and their in-memory stores.
//!
//! This crate contains **pure domain** code (no HTTP, no persistence).

pub mod error;
pub mod model;
pub mod store;

pub use error::{DomainError, DomainResult};
pub use model::{Customer, Order, OrderItem, format_cents, sample_orders};
pub use store::{CustomerStore, OrderStore};
