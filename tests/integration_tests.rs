//! promgen Integration Tests
//!
//! End-to-end runs of the generator over a real listener:
//! - Configuration layering from a YAML file and flags
//! - Registration and exposition of every family
//! - Periodic updates visible on /metrics
//! - Health route and graceful shutdown

use std::io::Write;
use std::net::SocketAddr;
use std::time::Duration;

use promgen::config::{GenerateArgs, GeneratorConfig, MetricType};
use promgen::generator::FamilyPlan;
use promgen::metrics::NAMESPACE;
use promgen::{Generator, MetricKind};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

// =============================================================================
// Helpers
// =============================================================================

fn config(metric_type: MetricType) -> GeneratorConfig {
    GeneratorConfig {
        address: "127.0.0.1:0".to_string(),
        metric_type,
        metrics_count: 2,
        labels_count: 1,
        datapoint_count: 3,
        frequency: Duration::from_secs(1),
        ..Default::default()
    }
}

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<promgen::Result<()>>,
}

impl Running {
    async fn start(generator: Generator) -> Self {
        let server = generator.bind().await.unwrap();
        let addr = server.local_addr().unwrap();
        let (stop, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(generator.run(server, async {
            let _ = rx.await;
        }));
        Self { addr, stop, handle }
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        reqwest::get(format!("http://{}{}", self.addr, path))
            .await
            .unwrap()
    }

    async fn stop(self) -> promgen::Result<()> {
        let _ = self.stop.send(());
        self.handle.await.unwrap()
    }
}

/// Sample lines (not HELP/TYPE) whose metric name is exactly `name`
fn samples<'a>(body: &'a str, name: &str) -> Vec<&'a str> {
    body.lines()
        .filter(|l| !l.starts_with('#'))
        .filter(|l| {
            l.strip_prefix(name)
                .is_some_and(|rest| rest.starts_with('{') || rest.starts_with(' '))
        })
        .collect()
}

fn sample_value(line: &str) -> f64 {
    line.rsplit(' ').next().unwrap().parse().unwrap()
}

// =============================================================================
// Exposition Tests
// =============================================================================

mod exposition_tests {
    use super::*;

    #[tokio::test]
    async fn test_counter_family_end_to_end() {
        let running = Running::start(Generator::new(config(MetricType::Counter)).unwrap()).await;
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let response = running.get("/metrics").await;
        assert_eq!(response.status(), 200);
        let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/plain"));
        let body = response.text().await.unwrap();

        let type_lines: Vec<&str> = body.lines().filter(|l| l.starts_with("# TYPE")).collect();
        assert_eq!(
            type_lines,
            vec![
                "# TYPE test_counter0 counter",
                "# TYPE test_counter1 counter"
            ]
        );

        for name in ["test_counter0", "test_counter1"] {
            let lines = samples(&body, name);
            assert_eq!(lines.len(), 3, "{name}: {lines:?}");
            for id in 0..3 {
                let expected = format!("datapoint_id=\"{id}\"");
                let line = lines
                    .iter()
                    .find(|l| l.contains(&expected))
                    .unwrap_or_else(|| panic!("missing datapoint {id} for {name}"));
                assert!(line.contains("foo_0=\"bar_0\""));
                assert!(sample_value(line) >= 0.0);
            }
        }

        // one tick has run, so at least one series moved off zero
        assert!(samples(&body, "test_counter0")
            .iter()
            .chain(samples(&body, "test_counter1").iter())
            .any(|l| sample_value(l) > 0.0));

        assert!(running.stop().await.is_ok());
    }

    #[tokio::test]
    async fn test_all_families_exposed_before_first_tick() {
        let mut cfg = config(MetricType::All);
        cfg.frequency = Duration::from_secs(60);
        let running = Running::start(Generator::new(cfg).unwrap()).await;

        let body = running.get("/metrics").await.text().await.unwrap();
        for kind in MetricKind::ALL {
            for idx in 0..2 {
                let name = format!("{}_{}", NAMESPACE, kind.instrument_name(idx));
                assert!(
                    body.contains(&format!("# TYPE {name} {kind}")),
                    "missing {name}"
                );
            }
        }

        // histogram buckets and summary quantiles
        assert!(body.contains("test_histogram0_bucket{"));
        assert!(body.contains("le=\"0.5\""));
        assert!(body.contains("le=\"+Inf\""));
        assert!(body.contains("quantile=\"0.99\""));
        assert_eq!(samples(&body, "test_summary1_count").len(), 3);

        assert!(running.stop().await.is_ok());
    }

    #[tokio::test]
    async fn test_health_route() {
        let running = Running::start(Generator::new(config(MetricType::Gauge)).unwrap()).await;

        for path in ["/", "/healthz", "/anything/else"] {
            let response = running.get(path).await;
            assert_eq!(response.status(), 200);
            assert!(response.text().await.unwrap().contains("healthy"));
        }

        assert!(running.stop().await.is_ok());
    }

    #[tokio::test]
    async fn test_random_plan_exposes_only_planned_families() {
        let plan = vec![
            FamilyPlan {
                kind: MetricKind::Histogram,
                count: 3,
            },
            FamilyPlan {
                kind: MetricKind::Summary,
                count: 0,
            },
        ];
        let generator = Generator::with_plan(config(MetricType::All), plan).unwrap();
        let running = Running::start(generator).await;

        let body = running.get("/metrics").await.text().await.unwrap();
        assert!(body.contains("# TYPE test_histogram2 histogram"));
        assert!(!body.contains("test_counter"));
        assert!(!body.contains("test_gauge"));
        assert!(!body.contains("test_summary"));

        assert!(running.stop().await.is_ok());
    }
}

// =============================================================================
// Configuration Tests
// =============================================================================

mod config_tests {
    use super::*;

    #[tokio::test]
    async fn test_file_then_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "Address: \"127.0.0.1:0\"\nType: gauge\nMetricsCount: 3\nLabelsCount: 2\nDataPointCount: 2\nFrequency: 1\n"
        )
        .unwrap();

        let args = GenerateArgs {
            config: file.path().to_string_lossy().into_owned(),
            metric_count: Some(1),
            ..Default::default()
        };
        let cfg = GeneratorConfig::load(&args).unwrap();
        assert_eq!(cfg.metric_type, MetricType::Gauge);
        assert_eq!(cfg.metrics_count, 1);
        assert_eq!(cfg.labels_count, 2);

        let running = Running::start(Generator::new(cfg).unwrap()).await;
        let body = running.get("/metrics").await.text().await.unwrap();

        assert!(body.contains("# TYPE test_gauge0 gauge"));
        assert!(!body.contains("test_gauge1"));
        let lines = samples(&body, "test_gauge0");
        assert_eq!(lines.len(), 2);
        assert!(lines
            .iter()
            .all(|l| l.contains("foo_0=\"bar_0\"") && l.contains("foo_1=\"bar_1\"")));

        assert!(running.stop().await.is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let args = GenerateArgs {
            config: dir.path().join("absent.yaml").to_string_lossy().into_owned(),
            ..Default::default()
        };
        assert_eq!(
            GeneratorConfig::load(&args).unwrap(),
            GeneratorConfig::default()
        );
    }
}
