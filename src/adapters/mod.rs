//! Infrastructure Adapters
//!
//! Connections to systems outside the generator.

mod collector;

pub use collector::{CollectorProbe, DEFAULT_PROBE_TIMEOUT};
