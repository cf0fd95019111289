//! # HTTP Middleware
//!
//! - `metrics`: request and error counters, read back through
//!   `GET /v1/admin/metrics`.

pub mod metrics;
