//! Command-line flags for the `generate` command.
//!
//! Every flag is optional so that an unset flag falls through to the config
//! file and then to the defaults.

use clap::Args;

use super::settings::{MetricType, DEFAULT_CONFIG_PATH};

/// Flags accepted by `promgen generate` (and by `promgen` without a subcommand)
#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Path to the YAML config file
    #[arg(long, env = "PROMGEN_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Type of metric to generate
    #[arg(long = "metric_type", env = "PROMGEN_METRIC_TYPE", value_enum)]
    pub metric_type: Option<MetricType>,

    /// Number of metrics to create per type
    #[arg(long = "metric_count", env = "PROMGEN_METRIC_COUNT")]
    pub metric_count: Option<usize>,

    /// Number of labels per metric
    #[arg(long = "label_count", env = "PROMGEN_LABEL_COUNT")]
    pub label_count: Option<usize>,

    /// Number of datapoints (series) per metric
    #[arg(long = "datapoint_count", env = "PROMGEN_DATAPOINT_COUNT")]
    pub datapoint_count: Option<usize>,

    /// Refresh interval in seconds
    #[arg(long = "metric_frequency", env = "PROMGEN_METRIC_FREQUENCY")]
    pub metric_frequency: Option<u64>,

    /// Server listening address
    #[arg(long = "listen_address", env = "PROMGEN_LISTEN_ADDRESS")]
    pub listen_address: Option<String>,

    /// Register a randomized mix of metric families (type `all` only)
    #[arg(
        long = "is_random",
        env = "PROMGEN_IS_RANDOM",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub is_random: Option<bool>,

    /// Mean of the normal distribution used for histograms and summaries
    #[arg(long = "normal.mean", env = "PROMGEN_NORMAL_MEAN")]
    pub normal_mean: Option<f64>,

    /// Standard deviation of the normal distribution used for histograms and summaries
    #[arg(long = "normal.domain", env = "PROMGEN_NORMAL_DOMAIN")]
    pub normal_domain: Option<f64>,

    /// Collector endpoint probed once at startup
    #[arg(long = "collector_endpoint", env = "PROMGEN_COLLECTOR_ENDPOINT")]
    pub collector_endpoint: Option<String>,
}
