//! Startup, serving and shutdown of the generator.

use std::future::Future;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use super::plan::{plan_for, FamilyPlan};
use crate::adapters::{CollectorProbe, DEFAULT_PROBE_TIMEOUT};
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::metrics::{generate_labels, MetricRegistry, MetricUpdater, UpdaterState};
use crate::server::MetricsServer;

/// A configured generator with all metric families registered
pub struct Generator {
    config: GeneratorConfig,
    registry: Arc<MetricRegistry>,
    updater: MetricUpdater,
    plan: Vec<FamilyPlan>,
}

impl Generator {
    /// Validate `config` and register the families it asks for
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let plan = plan_for(&config);
        Self::with_plan(config, plan)
    }

    /// Like [`new`](Self::new) with an explicit registration plan
    pub fn with_plan(config: GeneratorConfig, plan: Vec<FamilyPlan>) -> Result<Self> {
        config.validate()?;

        let labels = generate_labels(config.labels_count);
        let registry = MetricRegistry::new(labels, config.datapoint_count);
        for family in &plan {
            registry.register(family.kind, family.count)?;
        }

        let updater = MetricUpdater::new(
            Arc::clone(&registry),
            config.frequency,
            config.normal.distribution()?,
        );

        Ok(Self {
            config,
            registry,
            updater,
            plan,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    pub fn plan(&self) -> &[FamilyPlan] {
        &self.plan
    }

    pub fn updater_state(&self) -> UpdaterState {
        self.updater.state()
    }

    /// Bind the HTTP listener on the configured address
    pub async fn bind(&self) -> Result<MetricsServer> {
        MetricsServer::bind(self.config.socket_addr()?, Arc::clone(&self.registry)).await
    }

    /// Log whether the configured collector is reachable. Never fails.
    pub async fn probe_collector(&self) {
        let Some(endpoint) = &self.config.collector_endpoint else {
            return;
        };

        let probe = match CollectorProbe::new(endpoint.clone(), DEFAULT_PROBE_TIMEOUT) {
            Ok(probe) => probe,
            Err(e) => {
                warn!("Collector probe unavailable: {}", e);
                return;
            }
        };

        match probe.check().await {
            Ok(status) => info!("Collector {} reachable ({})", endpoint, status),
            Err(e) if !e.is_fatal() => {
                warn!("{}", e);
                warn!("Continuing anyway - metrics are still served locally");
            }
            Err(e) => error!("Collector probe failed: {}", e),
        }
    }

    /// Start the updater tasks and serve on `server` until `shutdown`
    /// resolves, then drain HTTP and stop the updater
    #[instrument(skip_all)]
    pub async fn run<F>(self, server: MetricsServer, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("Server Started");
        if self.config.random {
            info!("Producing randomized metrics per type");
        } else {
            info!("Producing {} metric(s) per type", self.config.metrics_count);
        }
        for family in &self.plan {
            if !self.updater.start(family.kind) {
                warn!("{} updates not started", family.kind);
            }
        }
        info!(
            "Updating at a frequency of {} seconds",
            self.config.frequency.as_secs()
        );

        self.probe_collector().await;

        let served = server.serve(shutdown).await;
        if let Err(e) = &served {
            error!("Server Shutdown Failed: {}", e);
        }

        self.updater.shutdown().await;
        served
    }

    /// Bind on the configured address and [`run`](Self::run)
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let server = self.bind().await?;
        self.run(server, shutdown).await
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("config", &self.config)
            .field("plan", &self.plan)
            .field("updater", &self.updater)
            .finish()
    }
}
