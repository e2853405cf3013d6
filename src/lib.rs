//! promgen - Synthetic Prometheus Metric Generator
//!
//! Registers a configurable number of counters, gauges, histograms and
//! summaries, writes random values into them on a timer, and exposes them
//! for scraping. Used to exercise metric collectors and pipelines with a
//! controlled metric count, label cardinality and series count.
//!
//! # Architecture
//!
//! ```text
//! GeneratorConfig → LabelSet → MetricRegistry ← MetricUpdater (periodic writes)
//!                                    ↓
//!                           MetricsServer (/metrics, /)
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - Collector endpoint probe
//! - [`config`] - Layered configuration (flags > file > defaults)
//! - [`error`] - Error types
//! - [`generator`] - Lifecycle controller and registration plans
//! - [`metrics`] - Labels, registry, summary collector, updater
//! - [`server`] - HTTP exposition endpoint

pub mod adapters;
pub mod config;
pub mod error;
pub mod generator;
pub mod metrics;
pub mod server;

// Re-export commonly used types
pub use config::{GeneratorConfig, MetricType};
pub use error::{Error, Result};
pub use generator::{FamilyPlan, Generator};
pub use metrics::{MetricKind, MetricRegistry, MetricUpdater};
pub use server::MetricsServer;
