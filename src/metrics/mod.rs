//! Synthetic Metrics
//!
//! Everything between the resolved configuration and the `/metrics` scrape:
//!
//! ```text
//! LabelSet ──▶ MetricRegistry ──▶ MetricUpdater (one task per family)
//!                    │
//!                    └──────────▶ text exposition (HTTP server)
//! ```
//!
//! # Modules
//!
//! - `labels` - static label generation and per-datapoint label mapping
//! - `registry` - instrument registration and exposition
//! - `summary` - quantile summary collector (absent from the Prometheus client)
//! - `updater` - periodic random value generation

mod labels;
mod registry;
mod summary;
mod updater;

use std::fmt;

pub use labels::{datapoint_labels, generate_labels, LabelSet, DATAPOINT_LABEL};
pub use registry::{Instrument, MetricRegistry};
pub use summary::{Summary, SummaryOpts, SummaryVec};
pub use updater::{MetricUpdater, UpdaterState};

/// Namespace prefixed to every generated metric name
pub const NAMESPACE: &str = "test";

/// Histogram bucket upper bounds
pub const DEFAULT_BUCKETS: &[f64] = &[0.1, 0.5, 1.0];

/// Summary objectives as (quantile, tolerated rank error)
pub const DEFAULT_OBJECTIVES: &[(f64, f64)] = &[(0.5, 0.05), (0.9, 0.01), (0.99, 0.001)];

/// A concrete metric family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
    Summary,
}

impl MetricKind {
    /// All families in their canonical cyclic order
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Counter,
        MetricKind::Gauge,
        MetricKind::Histogram,
        MetricKind::Summary,
    ];

    /// Short name used as metric name prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Summary => "summary",
        }
    }

    /// Unqualified instrument name for `index`, e.g. `counter3`
    pub fn instrument_name(&self, index: usize) -> String {
        format!("{}{}", self.as_str(), index)
    }

    /// Help text attached to every instrument of this family
    pub fn help(&self) -> String {
        format!("This is my {}", self.as_str())
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
