//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::file_not_found("Configuration", &args.config).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(capacity) = args.relay_capacity {
        info!(capacity, "Overriding relay capacity from CLI");
        blueprint.service.relay_capacity = capacity;
    }
    if let Some(max) = args.max_concurrency {
        info!(max, "Overriding fan-out concurrency from CLI");
        blueprint.fanout.max_concurrency = max;
    }
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after CLI overrides")?;

    info!(
        service = %blueprint.service.name,
        source_processors = blueprint.source_processors().count(),
        relay_processors = blueprint.relay_processors().count(),
        gateways = blueprint.fanout.gateways.len(),
        "Configuration loaded"
    );

    let pipeline_config = PipelineConfig {
        blueprint,
        events_path: args.events.clone(),
        fixtures_path: args.fixtures.clone(),
        batch_size: args.batch_size.max(1),
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    let pipeline = Pipeline::new(pipeline_config);

    // Dry run - load inputs and exit
    if args.dry_run {
        let (events, fixtures) = pipeline.load_inputs()?;
        info!(
            events = events.len(),
            listeners = fixtures.listeners.len(),
            "Dry run mode - configuration and inputs are valid, exiting"
        );
        print_config_summary(&pipeline.config().blueprint);
        return Ok(());
    }

    let timeout = async {
        if args.timeout == 0 {
            std::future::pending::<()>().await
        } else {
            tokio::time::sleep(Duration::from_secs(args.timeout)).await
        }
    };

    info!("Starting pipeline...");

    tokio::select! {
        result = pipeline.run() => {
            let stats = result.context("Pipeline execution failed")?;
            info!(
                records = stats.records_in,
                events = stats.events_published,
                failure_reports = stats.failure_reports.len(),
                duration_secs = stats.duration.as_secs_f64(),
                "Pipeline completed successfully"
            );
            stats.print_summary();
        }
        _ = timeout => {
            warn!(timeout_secs = args.timeout, "Pipeline timed out, stopping");
        }
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping pipeline...");
        }
    }

    info!("Chat Fanout finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::ServiceBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Service: {}", blueprint.service.name);
    println!("  Relay capacity: {}", blueprint.service.relay_capacity);
    println!(
        "  Fan-out concurrency: {}",
        blueprint.fanout.max_concurrency
    );

    println!("\nProcessors ({}):", blueprint.processors.len());
    for processor in &blueprint.processors {
        match processor.spec.publish_to() {
            Some(target) => println!(
                "  - {} ({}) -> {}",
                processor.name,
                processor.spec.kind_name(),
                target
            ),
            None => println!("  - {} ({})", processor.name, processor.spec.kind_name()),
        }
    }

    if !blueprint.fanout.gateways.is_empty() {
        println!("\nGateways ({}):", blueprint.fanout.gateways.len());
        for gateway in &blueprint.fanout.gateways {
            println!("  - {} ({:?})", gateway.channel, gateway.gateway_type);
        }
    }

    println!();
}
