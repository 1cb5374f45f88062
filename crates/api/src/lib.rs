//! HTTP API: server, routing, and request/response mapping.

pub mod app;
pub mod config;
pub mod context;
pub mod metrics;
pub mod middleware;
pub mod rate_limit;
pub mod tls;
pub mod validation;
