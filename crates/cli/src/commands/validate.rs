//! `validate` command implementation.

use std::collections::HashSet;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    service: String,
    source_processor_count: usize,
    relay_processor_count: usize,
    gateway_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    service: blueprint.service.name.clone(),
                    source_processor_count: blueprint.source_processors().count(),
                    relay_processor_count: blueprint.relay_processors().count(),
                    gateway_count: blueprint.fanout.gateways.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
///
/// Wiring gaps between the two stages: derived events nobody fans out, and
/// fan-out processors listening on identifiers nothing publishes to.
fn collect_warnings(blueprint: &contracts::ServiceBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.processors.is_empty() {
        warnings.push("No processors configured - every record will be dropped".to_string());
    }

    let published: HashSet<&str> = blueprint
        .source_processors()
        .filter_map(|p| p.spec.publish_to())
        .collect();
    let consumed: HashSet<&str> = blueprint
        .relay_processors()
        .filter_map(|p| match &p.spec {
            contracts::ProcessorSpec::TopicFanout {
                channel_identifier, ..
            } => Some(channel_identifier.as_str()),
            _ => None,
        })
        .collect();

    for processor in blueprint.source_processors() {
        if let Some(target) = processor.spec.publish_to() {
            if !consumed.contains(target) {
                warnings.push(format!(
                    "Processor '{}' publishes to '{}' but no fan-out processor consumes it",
                    processor.name, target
                ));
            }
        }
    }

    for identifier in consumed.difference(&published) {
        warnings.push(format!(
            "Fan-out on '{}' has no first-stage publisher - only external envelopes will reach it",
            identifier
        ));
    }

    for gateway in &blueprint.fanout.gateways {
        if gateway.gateway_type == contracts::GatewayType::Log {
            warnings.push(format!(
                "Channel '{}' uses the log gateway - notifications are not delivered",
                gateway.channel
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Service: {}", summary.service);
            println!("  Source processors: {}", summary.source_processor_count);
            println!("  Fan-out processors: {}", summary.relay_processor_count);
            println!("  Gateways: {}", summary.gateway_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
