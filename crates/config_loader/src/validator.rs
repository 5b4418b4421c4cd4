//! 配置校验模块
//!
//! 校验规则：
//! - 字段级规则 (`validator` derive: 名称非空, 并发数 >= 1)
//! - processor 名称唯一
//! - 每个通道至多一个网关
//! - fan-out 处理单元引用的通道必须配置了网关
//! - 处理单元的必填参数非空

use std::collections::HashSet;

use ::validator::Validate;
use contracts::{ContractError, ProcessorConfig, ProcessorSpec, ServiceBlueprint};

/// 校验 ServiceBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_processor_names(blueprint)?;
    validate_gateways(blueprint)?;
    validate_processor_params(blueprint)?;
    validate_fanout_channels(blueprint)?;
    Ok(())
}

/// 字段级规则
fn validate_fields(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("blueprint", e.to_string()))
}

/// 校验 processor 名称唯一性
fn validate_processor_names(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for processor in &blueprint.processors {
        if !seen.insert(processor.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("processors[name={}]", processor.name),
                "duplicate processor name",
            ));
        }
    }
    Ok(())
}

/// 校验网关：每个通道至多一个
fn validate_gateways(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, gateway) in blueprint.fanout.gateways.iter().enumerate() {
        if !seen.insert(gateway.channel) {
            return Err(ContractError::config_validation(
                format!("fanout.gateways[{idx}].channel"),
                format!("duplicate gateway for channel '{}'", gateway.channel),
            ));
        }
    }
    Ok(())
}

/// 校验处理单元必填参数
fn validate_processor_params(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    for processor in &blueprint.processors {
        for (param, value) in required_params(processor) {
            if value.trim().is_empty() {
                return Err(ContractError::config_validation(
                    format!("processors[{}].{param}", processor.name),
                    format!("{param} cannot be empty"),
                ));
            }
        }
    }
    Ok(())
}

fn required_params(processor: &ProcessorConfig) -> Vec<(&'static str, &str)> {
    match &processor.spec {
        ProcessorSpec::MembershipAdded {
            source_name,
            entity_type,
            publish_to,
            ..
        }
        | ProcessorSpec::MembershipRemoved {
            source_name,
            entity_type,
            publish_to,
            ..
        } => vec![
            ("source_name", source_name),
            ("entity_type", entity_type),
            ("publish_to", publish_to),
        ],
        ProcessorSpec::FieldChanged {
            source_name,
            entity_type,
            field,
            event_type,
            owner_attribute,
            publish_to,
        } => vec![
            ("source_name", source_name),
            ("entity_type", entity_type),
            ("field", field),
            ("event_type", event_type),
            ("owner_attribute", owner_attribute),
            ("publish_to", publish_to),
        ],
        ProcessorSpec::ObjectCreated {
            container_name,
            event_type,
            publish_to,
            ..
        } => vec![
            ("container_name", container_name),
            ("event_type", event_type),
            ("publish_to", publish_to),
        ],
        ProcessorSpec::TopicFanout {
            channel_identifier, ..
        } => vec![("channel_identifier", channel_identifier)],
    }
}

/// 校验 fan-out 通道：非空且都配置了网关
fn validate_fanout_channels(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    for processor in blueprint.relay_processors() {
        let channels = processor.spec.fanout_channels();
        if channels.is_empty() {
            return Err(ContractError::config_validation(
                format!("processors[{}].channels", processor.name),
                "fan-out processor must target at least one channel",
            ));
        }
        for channel in channels {
            if blueprint.gateway_for(*channel).is_none() {
                return Err(ContractError::config_validation(
                    format!("processors[{}].channels", processor.name),
                    format!("no gateway configured for channel '{channel}'"),
                ));
            }
        }
    }
    Ok(())
}
