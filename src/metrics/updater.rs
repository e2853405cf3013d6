//! Metric Updater
//!
//! Drives one periodic task per metric family. Every tick writes a fresh
//! random value into each series of the family:
//!
//! | family    | write                        |
//! |-----------|------------------------------|
//! | counter   | `+= Uniform[0, 1)`           |
//! | gauge     | `= Uniform[0, 1)`            |
//! | histogram | `observe(Normal(mean, sd))`  |
//! | summary   | `observe(Normal(mean, sd))`  |
//!
//! A series is written by exactly one family task.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::registry::MetricRegistry;
use super::MetricKind;

/// Lifecycle of the updater
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdaterState {
    /// No family started yet
    Idle,
    /// At least one family task is ticking
    Running,
    /// Shutdown requested, waiting for tasks to exit
    Draining,
    /// All tasks joined
    Stopped,
}

impl std::fmt::Display for UpdaterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdaterState::Idle => write!(f, "Idle"),
            UpdaterState::Running => write!(f, "Running"),
            UpdaterState::Draining => write!(f, "Draining"),
            UpdaterState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Periodic writer of random metric values
pub struct MetricUpdater {
    registry: Arc<MetricRegistry>,
    period: Duration,
    normal: Normal<f64>,
    state: RwLock<UpdaterState>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<(MetricKind, JoinHandle<()>)>>,
}

impl MetricUpdater {
    pub fn new(registry: Arc<MetricRegistry>, period: Duration, normal: Normal<f64>) -> Self {
        Self {
            registry,
            period,
            normal,
            state: RwLock::new(UpdaterState::Idle),
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> UpdaterState {
        *self.state.read()
    }

    /// Families with a running task
    pub fn running_families(&self) -> Vec<MetricKind> {
        self.tasks.lock().iter().map(|(kind, _)| *kind).collect()
    }

    /// Spawn the periodic task for `kind`. Returns false if the family is
    /// already running or the updater is shutting down.
    pub fn start(&self, kind: MetricKind) -> bool {
        let mut state = self.state.write();
        if matches!(*state, UpdaterState::Draining | UpdaterState::Stopped) {
            warn!("Updater is {}, not starting {} updates", *state, kind);
            return false;
        }

        let mut tasks = self.tasks.lock();
        if tasks.iter().any(|(running, _)| *running == kind) {
            warn!("{} updates already running", kind);
            return false;
        }

        let handle = tokio::spawn(run_family(
            kind,
            Arc::clone(&self.registry),
            self.normal,
            self.period,
            self.cancel.child_token(),
        ));
        tasks.push((kind, handle));
        *state = UpdaterState::Running;

        debug!("Started {} updates every {:?}", kind, self.period);
        true
    }

    /// Cancel every family task and wait for them to exit
    pub async fn shutdown(&self) {
        {
            let mut state = self.state.write();
            if *state == UpdaterState::Stopped {
                return;
            }
            *state = UpdaterState::Draining;
        }

        self.cancel.cancel();
        let tasks: Vec<(MetricKind, JoinHandle<()>)> = std::mem::take(&mut *self.tasks.lock());
        for (kind, handle) in tasks {
            if let Err(e) = handle.await {
                warn!("{} update task ended abnormally: {}", kind, e);
            }
        }

        *self.state.write() = UpdaterState::Stopped;
        info!("Metric updater stopped");
    }

    /// Run one update pass for `kind` immediately
    pub fn tick(&self, kind: MetricKind) -> usize {
        update_family(kind, &self.registry, &self.normal)
    }
}

impl std::fmt::Debug for MetricUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricUpdater")
            .field("period", &self.period)
            .field("state", &self.state())
            .field("families", &self.running_families())
            .finish()
    }
}

#[instrument(skip(registry, normal, period, cancel))]
async fn run_family(
    kind: MetricKind,
    registry: Arc<MetricRegistry>,
    normal: Normal<f64>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("{} updates cancelled", kind);
                break;
            }
            _ = ticker.tick() => {
                debug!("Updating metrics ...");
                let writes = update_family(kind, &registry, &normal);
                debug!("Wrote {} {} values", writes, kind);
            }
        }
    }
}

/// Write one random value into every series of `kind`; returns the number of writes
fn update_family(kind: MetricKind, registry: &MetricRegistry, normal: &Normal<f64>) -> usize {
    let mut rng = rand::thread_rng();
    let mut writes = 0;

    match kind {
        MetricKind::Counter => {
            for instrument in registry.counters() {
                for series in &instrument.series {
                    series.inc_by(rng.gen::<f64>());
                    writes += 1;
                }
            }
        }
        MetricKind::Gauge => {
            for instrument in registry.gauges() {
                for series in &instrument.series {
                    series.set(rng.gen::<f64>());
                    writes += 1;
                }
            }
        }
        MetricKind::Histogram => {
            for instrument in registry.histograms() {
                for series in &instrument.series {
                    series.observe(normal.sample(&mut rng));
                    writes += 1;
                }
            }
        }
        MetricKind::Summary => {
            for instrument in registry.summaries() {
                for series in &instrument.series {
                    series.observe(normal.sample(&mut rng));
                    writes += 1;
                }
            }
        }
    }

    writes
}
