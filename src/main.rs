//! promgen - Synthetic Prometheus Metric Generator
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           promgen                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐    │
//! │  │   Updater    │───▶│   Registry   │◀───│ HTTP Server  │    │
//! │  │ (per family) │    │              │    │  /metrics    │    │
//! │  └──────────────┘    └──────────────┘    └──────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use clap::{Parser, Subcommand};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use promgen::config::{GenerateArgs, GeneratorConfig};
use promgen::error::Result;
use promgen::Generator;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Synthetic Prometheus metric generator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    generate: GenerateArgs,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate and serve synthetic metrics
    Generate(GenerateArgs),
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli);

    let args = match &cli.command {
        Some(Command::Generate(args)) => args,
        None => &cli.generate,
    };

    let config = GeneratorConfig::load(args).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;
    info!("Starting metric generator");
    info!("  Type: {}", config.metric_type);
    info!("  Metrics per type: {}", config.metrics_count);
    info!("  Labels per metric: {}", config.labels_count);
    info!("  Datapoints per metric: {}", config.datapoint_count);
    info!("  Random: {}", config.random);

    let generator = Generator::new(config).map_err(|e| {
        error!("Failed to initialize generator: {}", e);
        e
    })?;

    generator.run_until(shutdown_signal()).await.map_err(|e| {
        error!("Generator exited with error: {}", e);
        e
    })?;

    info!("Generator shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(cli: &Cli) {
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "reqwest=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if cli.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

// =============================================================================
// Signals
// =============================================================================

/// Resolves on SIGINT, SIGTERM or SIGQUIT (Ctrl-C elsewhere)
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigquit) =
            match (signal(SignalKind::terminate()), signal(SignalKind::quit())) {
                (Ok(term), Ok(quit)) => (term, quit),
                (Err(e), _) | (_, Err(e)) => {
                    warn!("Failed to install signal handlers, using Ctrl-C only: {}", e);
                    ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = ctrl_c() => info!("Received SIGINT"),
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigquit.recv() => info!("Received SIGQUIT"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await;
        info!("Received Ctrl-C");
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
