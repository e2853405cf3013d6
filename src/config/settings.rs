//! Config file model and layered resolution.

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use clap::ValueEnum;
use rand_distr::Normal;
use serde::Deserialize;
use tracing::{debug, warn};

use super::cli::GenerateArgs;
use crate::error::{Error, Result};
use crate::metrics::MetricKind;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
pub const DEFAULT_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_FREQUENCY_SECS: u64 = 15;

const DEFAULT_METRICS_COUNT: usize = 1;
const DEFAULT_LABELS_COUNT: usize = 1;
const DEFAULT_DATAPOINT_COUNT: usize = 1;
const DEFAULT_NORMAL_MEAN: f64 = 0.00001;
const DEFAULT_NORMAL_DOMAIN: f64 = 0.0002;

// =============================================================================
// Metric Type Selection
// =============================================================================

/// Which metric families to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
    Summary,
    All,
}

impl MetricType {
    /// Concrete families covered by this selection, in registration order
    pub fn kinds(&self) -> Vec<MetricKind> {
        match self {
            MetricType::Counter => vec![MetricKind::Counter],
            MetricType::Gauge => vec![MetricKind::Gauge],
            MetricType::Histogram => vec![MetricKind::Histogram],
            MetricType::Summary => vec![MetricKind::Summary],
            MetricType::All => MetricKind::ALL.to_vec(),
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricType::Counter => write!(f, "counter"),
            MetricType::Gauge => write!(f, "gauge"),
            MetricType::Histogram => write!(f, "histogram"),
            MetricType::Summary => write!(f, "summary"),
            MetricType::All => write!(f, "all"),
        }
    }
}

impl FromStr for MetricType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "counter" => Ok(MetricType::Counter),
            "gauge" => Ok(MetricType::Gauge),
            "histogram" => Ok(MetricType::Histogram),
            "summary" => Ok(MetricType::Summary),
            "all" => Ok(MetricType::All),
            other => Err(Error::Config(format!("Invalid metric type: {}", other))),
        }
    }
}

// =============================================================================
// Config File
// =============================================================================

/// Contents of `config.yaml`. Zero or empty values count as unset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct FileConfig {
    pub address: Option<String>,
    #[serde(rename = "Type")]
    pub metric_type: Option<String>,
    pub metrics_count: Option<i64>,
    pub labels_count: Option<i64>,
    #[serde(rename = "DataPointCount")]
    pub datapoint_count: Option<i64>,
    pub frequency: Option<i64>,
    pub random: Option<bool>,
}

impl FileConfig {
    /// Parse a config file from YAML text
    pub fn parse(data: &str) -> std::result::Result<Self, serde_yaml::Error> {
        // An empty document deserializes to unit, not to a mapping
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(data)
    }

    /// Read and parse a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_load = |reason: String| Error::ConfigLoad {
            path: path.display().to_string(),
            reason,
        };

        let data = std::fs::read_to_string(path).map_err(|e| config_load(e.to_string()))?;
        Self::parse(&data).map_err(|e| config_load(e.to_string()))
    }

    fn positive(value: Option<i64>) -> Option<usize> {
        value.filter(|v| *v > 0).map(|v| v as usize)
    }
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Parameters of the normal distribution sampled for histograms and summaries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalParams {
    /// Distribution mean
    pub mean: f64,
    /// Standard deviation
    pub domain: f64,
}

impl NormalParams {
    pub fn distribution(&self) -> Result<Normal<f64>> {
        if !(self.domain.is_finite() && self.domain >= 0.0) {
            return Err(Error::Config(format!(
                "Invalid normal distribution: domain must be a finite non-negative number, got {}",
                self.domain
            )));
        }
        Normal::new(self.mean, self.domain).map_err(|e| {
            Error::Config(format!(
                "Invalid normal distribution (mean {}, domain {}): {}",
                self.mean, self.domain, e
            ))
        })
    }
}

impl Default for NormalParams {
    fn default() -> Self {
        Self {
            mean: DEFAULT_NORMAL_MEAN,
            domain: DEFAULT_NORMAL_DOMAIN,
        }
    }
}

/// Fully resolved generator configuration, immutable once loaded
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// HTTP listen address
    pub address: String,

    /// Metric families to generate
    pub metric_type: MetricType,

    /// Instruments per family
    pub metrics_count: usize,

    /// Static labels per instrument
    pub labels_count: usize,

    /// Series per instrument
    pub datapoint_count: usize,

    /// Update period
    pub frequency: Duration,

    /// Randomized family selection
    pub random: bool,

    /// Histogram and summary sample distribution
    pub normal: NormalParams,

    /// Downstream collector probed at startup
    pub collector_endpoint: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            metric_type: MetricType::All,
            metrics_count: DEFAULT_METRICS_COUNT,
            labels_count: DEFAULT_LABELS_COUNT,
            datapoint_count: DEFAULT_DATAPOINT_COUNT,
            frequency: Duration::from_secs(DEFAULT_FREQUENCY_SECS),
            random: false,
            normal: NormalParams::default(),
            collector_endpoint: None,
        }
    }
}

impl GeneratorConfig {
    /// Load the config file named by `args` and resolve it against the flags.
    ///
    /// A missing or unparseable file is not fatal: the defaults are used.
    pub fn load(args: &GenerateArgs) -> Result<Self> {
        let file = match FileConfig::load(&args.config) {
            Ok(file) => {
                debug!("Loaded config file {}", args.config);
                Some(file)
            }
            Err(e) if !e.is_fatal() => {
                warn!("{}; using defaults", e);
                None
            }
            Err(e) => return Err(e),
        };

        Self::resolve(file.as_ref(), args)
    }

    /// Layer defaults, then the config file, then the flags
    pub fn resolve(file: Option<&FileConfig>, args: &GenerateArgs) -> Result<Self> {
        let mut config = Self::default();

        if let Some(file) = file {
            if let Some(address) = file.address.as_ref().filter(|a| !a.is_empty()) {
                config.address = address.clone();
            }
            if let Some(metric_type) = file.metric_type.as_ref().filter(|t| !t.is_empty()) {
                match metric_type.parse() {
                    Ok(metric_type) => config.metric_type = metric_type,
                    Err(e) => warn!("{} in config file; using {}", e, config.metric_type),
                }
            }
            if let Some(count) = FileConfig::positive(file.metrics_count) {
                config.metrics_count = count;
            }
            if let Some(count) = FileConfig::positive(file.labels_count) {
                config.labels_count = count;
            }
            if let Some(count) = FileConfig::positive(file.datapoint_count) {
                config.datapoint_count = count;
            }
            if let Some(secs) = FileConfig::positive(file.frequency) {
                config.frequency = Duration::from_secs(secs as u64);
            }
            if file.random == Some(true) {
                config.random = true;
            }
        }

        if let Some(address) = &args.listen_address {
            config.address = address.clone();
        }
        if let Some(metric_type) = args.metric_type {
            config.metric_type = metric_type;
        }
        if let Some(count) = args.metric_count {
            config.metrics_count = count;
        }
        if let Some(count) = args.label_count {
            config.labels_count = count;
        }
        if let Some(count) = args.datapoint_count {
            config.datapoint_count = count;
        }
        if let Some(secs) = args.metric_frequency {
            config.frequency = Duration::from_secs(secs);
        }
        if let Some(random) = args.is_random {
            config.random = random;
        }
        if let Some(mean) = args.normal_mean {
            config.normal.mean = mean;
        }
        if let Some(domain) = args.normal_domain {
            config.normal.domain = domain;
        }
        if let Some(endpoint) = args.collector_endpoint.as_ref().filter(|e| !e.is_empty()) {
            config.collector_endpoint = Some(endpoint.clone());
        }

        Ok(config)
    }

    /// Reject values the generator cannot run with
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        if self.frequency.is_zero() {
            return Err(Error::Config(
                "Metric frequency must be at least 1 second".to_string(),
            ));
        }

        self.normal.distribution()?;
        Ok(())
    }

    /// The listen address as a socket address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.address
            .parse()
            .map_err(|e| Error::Config(format!("Invalid listen address {}: {}", self.address, e)))
    }
}
