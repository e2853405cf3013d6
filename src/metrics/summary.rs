//! Summary Collector
//!
//! The Prometheus client exposes counters, gauges and histograms but no
//! summaries, so this module provides a labelled summary implementing
//! [`Collector`] directly.
//!
//! Each child keeps a lifetime `sum`/`count` and a sliding window of recent
//! observations. Quantiles are computed by exact rank over the window, which
//! satisfies every configured error tolerance. The window spans `max_age`
//! and rotates in `age_buckets` steps.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use prometheus::core::{Collector, Desc};
use prometheus::{proto, Opts};

/// Default observation window
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(10 * 60);

/// Default number of rotation steps across the window
pub const DEFAULT_AGE_BUCKETS: u32 = 5;

/// Hard cap on retained observations per child
const MAX_WINDOW_SAMPLES: usize = 4096;

// =============================================================================
// Options
// =============================================================================

/// Options for a [`SummaryVec`]
#[derive(Debug, Clone)]
pub struct SummaryOpts {
    /// Metric name and help
    pub common_opts: Opts,
    /// (quantile, tolerated error) pairs
    pub objectives: Vec<(f64, f64)>,
    /// Observation window
    pub max_age: Duration,
    /// Rotation steps across the window
    pub age_buckets: u32,
}

impl SummaryOpts {
    pub fn new<S1: Into<String>, S2: Into<String>>(name: S1, help: S2) -> Self {
        Self {
            common_opts: Opts::new(name, help),
            objectives: Vec::new(),
            max_age: DEFAULT_MAX_AGE,
            age_buckets: DEFAULT_AGE_BUCKETS,
        }
    }

    pub fn namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.common_opts = self.common_opts.namespace(namespace);
        self
    }

    pub fn objectives(mut self, objectives: Vec<(f64, f64)>) -> Self {
        self.objectives = objectives;
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn age_buckets(mut self, age_buckets: u32) -> Self {
        self.age_buckets = age_buckets;
        self
    }

    fn validate(&self) -> prometheus::Result<()> {
        for (quantile, error) in &self.objectives {
            if !(0.0..=1.0).contains(quantile) {
                return Err(prometheus::Error::Msg(format!(
                    "summary quantile {} out of range [0, 1]",
                    quantile
                )));
            }
            if !(0.0..=1.0).contains(error) {
                return Err(prometheus::Error::Msg(format!(
                    "summary objective error {} out of range [0, 1]",
                    error
                )));
            }
        }
        if self.max_age.is_zero() || self.age_buckets == 0 {
            return Err(prometheus::Error::Msg(
                "summary window must have a positive max age and at least one age bucket"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Sliding Window
// =============================================================================

#[derive(Debug)]
struct Window {
    samples: VecDeque<(Instant, f64)>,
    max_age: Duration,
    rotation: Duration,
    next_rotation: Instant,
}

impl Window {
    fn new(max_age: Duration, age_buckets: u32, now: Instant) -> Self {
        let rotation = max_age / age_buckets;
        Self {
            samples: VecDeque::new(),
            max_age,
            rotation,
            next_rotation: now + rotation,
        }
    }

    fn observe(&mut self, value: f64, now: Instant) {
        self.maybe_rotate(now);
        if self.samples.len() == MAX_WINDOW_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back((now, value));
    }

    /// Drop expired samples, one rotation step at a time
    fn maybe_rotate(&mut self, now: Instant) {
        if now < self.next_rotation {
            return;
        }
        while self.next_rotation <= now {
            self.next_rotation += self.rotation;
        }
        let max_age = self.max_age;
        while let Some((at, _)) = self.samples.front() {
            if now.duration_since(*at) < max_age {
                break;
            }
            self.samples.pop_front();
        }
    }

    fn quantiles(&mut self, objectives: &[(f64, f64)], now: Instant) -> Vec<(f64, f64)> {
        self.maybe_rotate(now);

        let mut sorted: Vec<f64> = self.samples.iter().map(|(_, v)| *v).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        objectives
            .iter()
            .map(|(quantile, _)| (*quantile, rank(&sorted, *quantile)))
            .collect()
    }
}

/// Value at rank `ceil(q * n)` of a sorted slice; NaN when empty
fn rank(sorted: &[f64], quantile: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let n = sorted.len();
    let idx = ((quantile * n as f64).ceil() as usize).clamp(1, n) - 1;
    sorted[idx]
}

// =============================================================================
// Summary Child
// =============================================================================

#[derive(Debug)]
struct SummaryState {
    sum: f64,
    count: u64,
    window: Window,
}

#[derive(Debug)]
struct SummaryCore {
    label_pairs: Vec<proto::LabelPair>,
    objectives: Arc<Vec<(f64, f64)>>,
    state: Mutex<SummaryState>,
}

/// One labelled summary series
#[derive(Debug, Clone)]
pub struct Summary {
    core: Arc<SummaryCore>,
}

impl Summary {
    /// Record one observation
    pub fn observe(&self, value: f64) {
        self.observe_at(value, Instant::now());
    }

    fn observe_at(&self, value: f64, now: Instant) {
        let mut state = self.core.state.lock();
        state.sum += value;
        state.count += 1;
        state.window.observe(value, now);
    }

    /// Lifetime number of observations
    pub fn get_sample_count(&self) -> u64 {
        self.core.state.lock().count
    }

    /// Lifetime sum of observations
    pub fn get_sample_sum(&self) -> f64 {
        self.core.state.lock().sum
    }

    /// Current (quantile, value) pairs over the window
    pub fn quantiles(&self) -> Vec<(f64, f64)> {
        self.quantiles_at(Instant::now())
    }

    fn quantiles_at(&self, now: Instant) -> Vec<(f64, f64)> {
        self.core
            .state
            .lock()
            .window
            .quantiles(&self.core.objectives, now)
    }

    fn metric(&self) -> proto::Metric {
        let (sum, count, quantiles) = {
            let mut state = self.core.state.lock();
            let quantiles = state.window.quantiles(&self.core.objectives, Instant::now());
            (state.sum, state.count, quantiles)
        };

        let mut summary = proto::Summary::default();
        summary.set_sample_sum(sum);
        summary.set_sample_count(count);
        summary.quantile = quantiles
            .into_iter()
            .map(|(q, v)| {
                let mut quantile = proto::Quantile::default();
                quantile.set_quantile(q);
                quantile.set_value(v);
                quantile
            })
            .collect();

        let mut metric = proto::Metric::default();
        metric.label = self.core.label_pairs.clone();
        metric.set_summary(summary);
        metric
    }
}

// =============================================================================
// Summary Vec
// =============================================================================

/// A summary partitioned by label values
#[derive(Clone)]
pub struct SummaryVec {
    desc: Arc<Desc>,
    opts: Arc<SummaryOpts>,
    objectives: Arc<Vec<(f64, f64)>>,
    children: Arc<DashMap<Vec<String>, Summary>>,
}

impl SummaryVec {
    /// Create a summary vec with the given label names
    pub fn new(opts: SummaryOpts, label_names: &[&str]) -> prometheus::Result<Self> {
        opts.validate()?;

        let mut objectives = opts.objectives.clone();
        objectives.sort_by(|a, b| a.0.total_cmp(&b.0));

        let desc = Desc::new(
            opts.common_opts.fq_name(),
            opts.common_opts.help.clone(),
            label_names.iter().map(|l| l.to_string()).collect(),
            HashMap::new(),
        )?;

        Ok(Self {
            desc: Arc::new(desc),
            opts: Arc::new(opts),
            objectives: Arc::new(objectives),
            children: Arc::new(DashMap::new()),
        })
    }

    /// Fully-qualified metric name
    pub fn fq_name(&self) -> &str {
        &self.desc.fq_name
    }

    /// Get or create the child for `values`, given in label-name order
    pub fn get_metric_with_label_values(&self, values: &[&str]) -> prometheus::Result<Summary> {
        if values.len() != self.desc.variable_labels.len() {
            return Err(prometheus::Error::InconsistentCardinality {
                expect: self.desc.variable_labels.len(),
                got: values.len(),
            });
        }

        let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        let child = self
            .children
            .entry(key)
            .or_insert_with(|| self.new_child(values))
            .clone();
        Ok(child)
    }

    fn new_child(&self, values: &[&str]) -> Summary {
        let mut label_pairs: Vec<proto::LabelPair> = self
            .desc
            .variable_labels
            .iter()
            .zip(values)
            .map(|(name, value)| {
                let mut pair = proto::LabelPair::default();
                pair.set_name(name.clone());
                pair.set_value(value.to_string());
                pair
            })
            .collect();
        label_pairs.sort_by(|a, b| a.name().cmp(b.name()));

        Summary {
            core: Arc::new(SummaryCore {
                label_pairs,
                objectives: Arc::clone(&self.objectives),
                state: Mutex::new(SummaryState {
                    sum: 0.0,
                    count: 0,
                    window: Window::new(self.opts.max_age, self.opts.age_buckets, Instant::now()),
                }),
            }),
        }
    }
}

impl std::fmt::Debug for SummaryVec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryVec")
            .field("fq_name", &self.desc.fq_name)
            .field("children", &self.children.len())
            .finish()
    }
}

impl Collector for SummaryVec {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.desc]
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        let mut children: Vec<(Vec<String>, Summary)> = self
            .children
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        children.sort_by(|a, b| a.0.cmp(&b.0));

        let mut family = proto::MetricFamily::default();
        family.set_name(self.desc.fq_name.clone());
        family.set_help(self.desc.help.clone());
        family.set_type(proto::MetricType::SUMMARY);
        family.metric = children.iter().map(|(_, child)| child.metric()).collect();

        vec![family]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, Registry, TextEncoder};

    fn summary_vec() -> SummaryVec {
        let opts = SummaryOpts::new("latency", "Test summary")
            .namespace("test")
            .objectives(vec![(0.9, 0.01), (0.5, 0.05), (0.99, 0.001)]);
        SummaryVec::new(opts, &["datapoint_id"]).unwrap()
    }

    #[test]
    fn test_rank_quantiles() {
        let sorted: Vec<f64> = (1..=100).map(f64::from).collect();
        assert_eq!(rank(&sorted, 0.5), 50.0);
        assert_eq!(rank(&sorted, 0.9), 90.0);
        assert_eq!(rank(&sorted, 0.99), 99.0);
        assert_eq!(rank(&sorted, 0.0), 1.0);
        assert_eq!(rank(&sorted, 1.0), 100.0);
        assert!(rank(&[], 0.5).is_nan());
    }

    #[test]
    fn test_observe_tracks_sum_and_count() {
        let vec = summary_vec();
        let child = vec.get_metric_with_label_values(&["0"]).unwrap();
        for v in 1..=100 {
            child.observe(f64::from(v));
        }

        assert_eq!(child.get_sample_count(), 100);
        assert_eq!(child.get_sample_sum(), 5050.0);

        let quantiles = child.quantiles();
        assert_eq!(quantiles, vec![(0.5, 50.0), (0.9, 90.0), (0.99, 99.0)]);
    }

    #[test]
    fn test_empty_window_reports_nan() {
        let vec = summary_vec();
        let child = vec.get_metric_with_label_values(&["0"]).unwrap();
        assert!(child.quantiles().iter().all(|(_, v)| v.is_nan()));
    }

    #[test]
    fn test_window_expires_old_samples() {
        let opts = SummaryOpts::new("expiring", "Test summary")
            .objectives(vec![(0.5, 0.05)])
            .max_age(Duration::from_secs(10))
            .age_buckets(2);
        let vec = SummaryVec::new(opts, &[]).unwrap();
        let child = vec.get_metric_with_label_values(&[]).unwrap();

        let start = Instant::now();
        child.observe_at(1.0, start);
        child.observe_at(2.0, start + Duration::from_secs(6));

        // first sample is now older than max age
        let quantiles = child.quantiles_at(start + Duration::from_secs(11));
        assert_eq!(quantiles, vec![(0.5, 2.0)]);

        // lifetime totals are unaffected
        assert_eq!(child.get_sample_count(), 2);
        assert_eq!(child.get_sample_sum(), 3.0);

        let quantiles = child.quantiles_at(start + Duration::from_secs(30));
        assert!(quantiles[0].1.is_nan());
    }

    #[test]
    fn test_same_labels_share_child() {
        let vec = summary_vec();
        vec.get_metric_with_label_values(&["1"]).unwrap().observe(1.0);
        vec.get_metric_with_label_values(&["1"]).unwrap().observe(3.0);

        let child = vec.get_metric_with_label_values(&["1"]).unwrap();
        assert_eq!(child.get_sample_count(), 2);
    }

    #[test]
    fn test_label_cardinality_mismatch() {
        let vec = summary_vec();
        assert!(vec.get_metric_with_label_values(&["0", "extra"]).is_err());
    }

    #[test]
    fn test_invalid_objectives_rejected() {
        let opts = SummaryOpts::new("bad", "Bad summary").objectives(vec![(1.5, 0.01)]);
        assert!(SummaryVec::new(opts, &[]).is_err());
    }

    #[test]
    fn test_text_exposition() {
        let vec = summary_vec();
        let registry = Registry::new();
        registry.register(Box::new(vec.clone())).unwrap();

        vec.get_metric_with_label_values(&["0"]).unwrap().observe(0.25);

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("# TYPE test_latency summary"));
        assert!(text.contains("test_latency{datapoint_id=\"0\",quantile=\"0.5\"} 0.25"));
        assert!(text.contains("test_latency_sum{datapoint_id=\"0\"} 0.25"));
        assert!(text.contains("test_latency_count{datapoint_id=\"0\"} 1"));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = Registry::new();
        registry.register(Box::new(summary_vec())).unwrap();
        assert!(registry.register(Box::new(summary_vec())).is_err());
    }
}
