//! Metric Registry
//!
//! Owns a local Prometheus registry (no process metrics, no global default
//! registry) and the per-series handles the updater writes to.
//!
//! Series for every `datapoint_id` are created at registration, so a scrape
//! sees all datapoints before the first update tick.

use std::sync::Arc;

use parking_lot::RwLock;
use prometheus::core::Collector;
use prometheus::{
    proto, Counter, CounterVec, Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec,
    Opts, Registry, TextEncoder,
};
use tracing::{debug, info};

use super::labels::LabelSet;
use super::summary::{Summary, SummaryOpts, SummaryVec};
use super::{MetricKind, DEFAULT_BUCKETS, DEFAULT_OBJECTIVES, NAMESPACE};
use crate::error::{Error, Result};

/// A registered instrument and its per-datapoint series
#[derive(Debug, Clone)]
pub struct Instrument<T> {
    /// Fully-qualified metric name
    pub name: String,
    /// One handle per datapoint, indexed by `datapoint_id`
    pub series: Vec<T>,
}

/// Registry of generated instruments
pub struct MetricRegistry {
    registry: Registry,
    labels: LabelSet,
    datapoint_count: usize,
    counters: RwLock<Vec<Instrument<Counter>>>,
    gauges: RwLock<Vec<Instrument<Gauge>>>,
    histograms: RwLock<Vec<Instrument<Histogram>>>,
    summaries: RwLock<Vec<Instrument<Summary>>>,
}

impl MetricRegistry {
    /// Create an empty registry whose instruments carry `labels` and
    /// `datapoint_count` series each
    pub fn new(labels: LabelSet, datapoint_count: usize) -> Arc<Self> {
        Arc::new(Self {
            registry: Registry::new(),
            labels,
            datapoint_count,
            counters: RwLock::new(Vec::new()),
            gauges: RwLock::new(Vec::new()),
            histograms: RwLock::new(Vec::new()),
            summaries: RwLock::new(Vec::new()),
        })
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn datapoint_count(&self) -> usize {
        self.datapoint_count
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register `count` instruments of `kind` with default buckets/objectives
    pub fn register(&self, kind: MetricKind, count: usize) -> Result<()> {
        match kind {
            MetricKind::Counter => self.register_counter(count),
            MetricKind::Gauge => self.register_gauge(count),
            MetricKind::Histogram => self.register_histogram(count, DEFAULT_BUCKETS.to_vec()),
            MetricKind::Summary => self.register_summary(count, DEFAULT_OBJECTIVES.to_vec()),
        }
    }

    /// Register `test_counter0..test_counter{count-1}`
    pub fn register_counter(&self, count: usize) -> Result<()> {
        let schema = self.labels.schema();
        let label_names = as_strs(&schema);

        for idx in 0..count {
            let kind = MetricKind::Counter;
            let opts = Opts::new(kind.instrument_name(idx), kind.help()).namespace(NAMESPACE);
            let vec = CounterVec::new(opts, &label_names)?;
            let instrument = self.install(vec, |vec, values| vec.get_metric_with_label_values(values))?;
            self.counters.write().push(instrument);
        }

        info!("Registered {} counter(s)", count);
        Ok(())
    }

    /// Register `test_gauge0..test_gauge{count-1}`
    pub fn register_gauge(&self, count: usize) -> Result<()> {
        let schema = self.labels.schema();
        let label_names = as_strs(&schema);

        for idx in 0..count {
            let kind = MetricKind::Gauge;
            let opts = Opts::new(kind.instrument_name(idx), kind.help()).namespace(NAMESPACE);
            let vec = GaugeVec::new(opts, &label_names)?;
            let instrument = self.install(vec, |vec, values| vec.get_metric_with_label_values(values))?;
            self.gauges.write().push(instrument);
        }

        info!("Registered {} gauge(s)", count);
        Ok(())
    }

    /// Register `test_histogram0..` with the given bucket upper bounds
    pub fn register_histogram(&self, count: usize, buckets: Vec<f64>) -> Result<()> {
        let schema = self.labels.schema();
        let label_names = as_strs(&schema);

        for idx in 0..count {
            let kind = MetricKind::Histogram;
            let opts = HistogramOpts::new(kind.instrument_name(idx), kind.help())
                .namespace(NAMESPACE)
                .buckets(buckets.clone());
            let vec = HistogramVec::new(opts, &label_names)?;
            let instrument = self.install(vec, |vec, values| vec.get_metric_with_label_values(values))?;
            self.histograms.write().push(instrument);
        }

        info!("Registered {} histogram(s)", count);
        Ok(())
    }

    /// Register `test_summary0..` with the given (quantile, error) objectives
    pub fn register_summary(&self, count: usize, objectives: Vec<(f64, f64)>) -> Result<()> {
        let schema = self.labels.schema();
        let label_names = as_strs(&schema);

        for idx in 0..count {
            let kind = MetricKind::Summary;
            let opts = SummaryOpts::new(kind.instrument_name(idx), kind.help())
                .namespace(NAMESPACE)
                .objectives(objectives.clone());
            let vec = SummaryVec::new(opts, &label_names)?;
            let instrument = self.install(vec, |vec, values| vec.get_metric_with_label_values(values))?;
            self.summaries.write().push(instrument);
        }

        info!("Registered {} summary(s)", count);
        Ok(())
    }

    /// Register `collector` and materialize one series per datapoint
    fn install<C, T, F>(&self, collector: C, child: F) -> Result<Instrument<T>>
    where
        C: Collector + Clone + 'static,
        F: Fn(&C, &[&str]) -> prometheus::Result<T>,
    {
        let name = collector
            .desc()
            .first()
            .map(|desc| desc.fq_name.clone())
            .unwrap_or_default();

        self.registry
            .register(Box::new(collector.clone()))
            .map_err(|e| match e {
                prometheus::Error::AlreadyReg => Error::DuplicateRegistration { name: name.clone() },
                other => Error::Prometheus(other),
            })?;

        let series = (0..self.datapoint_count)
            .map(|id| {
                let values = self.labels.datapoint_values(id);
                child(&collector, &as_strs(&values))
            })
            .collect::<prometheus::Result<Vec<T>>>()?;

        debug!("Registered {} with {} series", name, series.len());
        Ok(Instrument { name, series })
    }

    // =========================================================================
    // Access
    // =========================================================================

    pub fn counters(&self) -> Vec<Instrument<Counter>> {
        self.counters.read().clone()
    }

    pub fn gauges(&self) -> Vec<Instrument<Gauge>> {
        self.gauges.read().clone()
    }

    pub fn histograms(&self) -> Vec<Instrument<Histogram>> {
        self.histograms.read().clone()
    }

    pub fn summaries(&self) -> Vec<Instrument<Summary>> {
        self.summaries.read().clone()
    }

    /// Number of registered instruments of `kind`
    pub fn instrument_count(&self, kind: MetricKind) -> usize {
        match kind {
            MetricKind::Counter => self.counters.read().len(),
            MetricKind::Gauge => self.gauges.read().len(),
            MetricKind::Histogram => self.histograms.read().len(),
            MetricKind::Summary => self.summaries.read().len(),
        }
    }

    // =========================================================================
    // Exposition
    // =========================================================================

    /// Snapshot all metric families
    pub fn gather(&self) -> Vec<proto::MetricFamily> {
        self.registry.gather()
    }

    /// Content type of [`encode_text`](Self::encode_text)
    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }

    /// Serialize the registry in the Prometheus text exposition format
    pub fn encode_text(&self) -> Result<Vec<u8>> {
        let families = self.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        Ok(buffer)
    }
}

impl std::fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("labels", &self.labels.len())
            .field("datapoint_count", &self.datapoint_count)
            .field("counters", &self.counters.read().len())
            .field("gauges", &self.gauges.read().len())
            .field("histograms", &self.histograms.read().len())
            .field("summaries", &self.summaries.read().len())
            .finish()
    }
}

fn as_strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}
