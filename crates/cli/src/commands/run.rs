//! `run` command implementation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use backends::{MemoryBus, MemoryCatalog};
use contracts::{CatalogStore, MessageBus, SelectorConfig};
use dispatcher::{DispatchSnapshot, DispatcherSettings, EventDispatcher, Publisher};
use ingestion::{IngestionError, Supervisor, SupervisorReport};
use tracing::{info, warn};
use triage::CatalogQueryEngine;

use crate::cli::RunArgs;
use crate::error::CliError;

/// Execute the `run` command
pub async fn run_selector(args: &RunArgs) -> Result<()> {
    let config = super::load_config(args.config.as_deref(), &args.connection)?;

    info!(
        listeners = config.listeners.len(),
        beam_radius_deg = config.triage.beam_radius_deg,
        result_channel = %config.bus.result_channel,
        "Configuration loaded"
    );

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    if args.dry_run {
        return dry_run(&config).await;
    }

    run_live(&config).await
}

/// Build the dispatcher shared by every listener
fn build_dispatcher<B, S>(bus: B, store: S, config: &SelectorConfig) -> EventDispatcher<B, S>
where
    B: MessageBus + Sync,
    S: CatalogStore + Sync,
{
    let engine = CatalogQueryEngine::new(store)
        .with_timeout(Duration::from_millis(config.catalog.timeout_ms));
    EventDispatcher::new(
        bus,
        engine,
        Publisher::from_settings(config.bus.result_channel.clone(), &config.triage),
        DispatcherSettings::from_config(config),
    )
}

#[cfg(feature = "live")]
async fn run_live(config: &SelectorConfig) -> Result<()> {
    use backends::{PostgresCatalog, RedisBus};

    let bus = RedisBus::connect(&config.bus.url)
        .await
        .map_err(|e| CliError::bus_connection(&config.bus.url, e))?;
    let catalog = PostgresCatalog::connect(&config.catalog)
        .await
        .map_err(CliError::catalog_connection)?;

    let mut subscriptions = Vec::with_capacity(config.listeners.len());
    for listener in &config.listeners {
        let subscription = bus
            .subscribe(&listener.patterns)
            .await
            .map_err(|e| IngestionError::subscribe(&listener.name, e))?;
        subscriptions.push((listener.name.clone(), subscription));
    }

    let dispatcher = Arc::new(build_dispatcher(bus, catalog, config));
    let mut supervisor = Supervisor::new(Arc::clone(&dispatcher));
    for (name, subscription) in subscriptions {
        supervisor.spawn_listener(name, subscription);
    }

    info!("Target selector running, press Ctrl+C to stop");
    let report = supervisor.run_until(shutdown_signal()).await;

    print_summary(&report, &dispatcher.metrics().snapshot());
    finish(report)
}

#[cfg(not(feature = "live"))]
async fn run_live(_config: &SelectorConfig) -> Result<()> {
    Err(CliError::LiveBackendsDisabled.into())
}

/// Wire listeners against in-memory backends, then shut down
async fn dry_run(config: &SelectorConfig) -> Result<()> {
    info!("Dry run mode - using in-memory bus and catalog");

    let bus = MemoryBus::new();
    let mut subscriptions = Vec::with_capacity(config.listeners.len());
    for listener in &config.listeners {
        let subscription = bus
            .subscribe(&listener.patterns)
            .map_err(|e| IngestionError::subscribe(&listener.name, e))
            .context("Dry run subscription failed")?;
        subscriptions.push((listener.name.clone(), subscription));
    }

    let dispatcher = Arc::new(build_dispatcher(bus, MemoryCatalog::default(), config));
    let mut supervisor = Supervisor::new(Arc::clone(&dispatcher));
    for (name, subscription) in subscriptions {
        supervisor.spawn_listener(name, subscription);
    }
    let report = supervisor.shutdown().await;

    print_summary(&report, &dispatcher.metrics().snapshot());
    finish(report)
}

fn finish(report: SupervisorReport) -> Result<()> {
    if report.is_clean() {
        info!("Target selector finished");
        Ok(())
    } else {
        Err(CliError::ListenersFailed {
            count: report.failures.len(),
        }
        .into())
    }
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Received shutdown signal, stopping listeners...");
}

fn print_summary(report: &SupervisorReport, snapshot: &DispatchSnapshot) {
    println!("\n=== Target Selector Summary ===\n");
    println!("Listeners:");
    for stats in &report.listeners {
        println!(
            "  - {}: received {}, handled {}, ignored {}, dropped {}, failed {}",
            stats.listener, stats.received, stats.handled, stats.ignored, stats.dropped, stats.failed
        );
    }
    for failure in &report.failures {
        println!("  ! {failure}");
    }
    println!("\n{snapshot}");
    println!();
}
