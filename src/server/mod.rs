//! HTTP Exposition Endpoint
//!
//! ```text
//! GET /metrics  → Prometheus text exposition of the MetricRegistry
//! GET <other>   → "healthy"
//! ```

mod http;

pub use http::{MetricsServer, DEFAULT_GRACE_PERIOD, HEALTHY_BODY};
