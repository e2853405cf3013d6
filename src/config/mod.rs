//! Generator Configuration
//!
//! Resolves the [`GeneratorConfig`] from three layers, highest precedence
//! first:
//!
//! ```text
//! CLI flags / env vars  >  config.yaml  >  built-in defaults
//! ```

mod cli;
mod settings;

pub use cli::GenerateArgs;
pub use settings::{
    FileConfig, GeneratorConfig, MetricType, NormalParams, DEFAULT_ADDRESS, DEFAULT_CONFIG_PATH,
    DEFAULT_FREQUENCY_SECS,
};
