//! `info` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use contracts::{ProcessorConfig, ServiceBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    service: ServiceInfo,
    processors: Vec<ProcessorInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    gateways: Vec<GatewayInfo>,
}

#[derive(Serialize)]
struct ServiceInfo {
    name: String,
    relay_capacity: usize,
    max_concurrency: usize,
}

#[derive(Serialize)]
struct ProcessorInfo {
    name: String,
    kind: String,
    stage: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    publish_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct GatewayInfo {
    channel: String,
    gateway_type: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::file_not_found("Configuration", &args.config).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn stage_of(processor: &ProcessorConfig) -> &'static str {
    if processor.spec.is_second_stage() {
        "relay"
    } else {
        "source"
    }
}

fn build_config_info(blueprint: &ServiceBlueprint, args: &InfoArgs) -> ConfigInfo {
    let processors = blueprint
        .processors
        .iter()
        .map(|p| ProcessorInfo {
            name: p.name.clone(),
            kind: p.spec.kind_name().to_string(),
            stage: stage_of(p),
            publish_to: p.spec.publish_to().map(str::to_string),
            // ProcessorSpec serializes with its `kind` tag plus parameters
            params: if args.processors {
                serde_json::to_value(&p.spec).ok()
            } else {
                None
            },
        })
        .collect();

    let gateways = if args.gateways {
        blueprint
            .fanout
            .gateways
            .iter()
            .map(|g| GatewayInfo {
                channel: g.channel.to_string(),
                gateway_type: format!("{:?}", g.gateway_type),
                params: g.params.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        service: ServiceInfo {
            name: blueprint.service.name.clone(),
            relay_capacity: blueprint.service.relay_capacity,
            max_concurrency: blueprint.fanout.max_concurrency,
        },
        processors,
        gateways,
    }
}

fn print_config_info(blueprint: &ServiceBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Chat Fanout Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📍 Service");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Name: {}", blueprint.service.name);
    println!("   ├─ Relay Capacity: {}", blueprint.service.relay_capacity);
    println!(
        "   └─ Fan-out Concurrency: {}",
        blueprint.fanout.max_concurrency
    );

    for (title, stage) in [("📥 Source Processors", "source"), ("📤 Fan-out Processors", "relay")] {
        let processors: Vec<&ProcessorConfig> = blueprint
            .processors
            .iter()
            .filter(|p| stage_of(p) == stage)
            .collect();
        if processors.is_empty() {
            continue;
        }

        println!("\n{} ({})", title, processors.len());
        for (i, processor) in processors.iter().enumerate() {
            let is_last = i == processors.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            let child_prefix = if is_last { "   " } else { "│  " };

            println!(
                "   {} {} ({})",
                prefix,
                processor.name,
                processor.spec.kind_name()
            );
            if let Some(target) = processor.spec.publish_to() {
                println!("   {}  └─ publishes to {}", child_prefix, target);
            }
            let channels = processor.spec.fanout_channels();
            if !channels.is_empty() {
                let names: Vec<&str> = channels.iter().map(|c| c.as_str()).collect();
                println!("   {}  └─ channels: {}", child_prefix, names.join(", "));
            }
            if args.processors {
                if let Ok(params) = serde_json::to_string(&processor.spec) {
                    println!("   {}     {}", child_prefix, params);
                }
            }
        }
    }

    if !blueprint.fanout.gateways.is_empty() {
        println!("\n🔌 Gateways ({})", blueprint.fanout.gateways.len());
        for (i, gateway) in blueprint.fanout.gateways.iter().enumerate() {
            let is_last = i == blueprint.fanout.gateways.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            println!(
                "   {} {} ({:?})",
                prefix, gateway.channel, gateway.gateway_type
            );
            if args.gateways {
                let mut params: Vec<_> = gateway.params.iter().collect();
                params.sort();
                for (key, value) in params {
                    println!("         {} = {}", key, value);
                }
            }
        }
    }

    println!();
}
