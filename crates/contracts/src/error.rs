//! Layered error definitions
//!
//! Categorized by source: config / predicate / handler / lookup / channel

use thiserror::Error;

use crate::ChannelKind;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Dispatch Errors =====
    /// A processor predicate could not evaluate a record
    #[error("predicate '{processor}' failed: {message}")]
    Predicate { processor: String, message: String },

    /// A processor handler rejected a record
    #[error("handler '{processor}' failed: {message}")]
    Handler { processor: String, message: String },

    /// Record state could not be decoded into the typed entity view
    #[error("record decode error: {message}")]
    Decode { message: String },

    /// Entity mediator has no aggregate for the id
    #[error("entity not found: {entity_id}")]
    LookupMiss { entity_id: String },

    /// Republishing a derived event failed
    #[error("publish to '{channel_identifier}' failed: {message}")]
    Publish {
        channel_identifier: String,
        message: String,
    },

    // ===== Channel Errors =====
    /// Gateway could not mint an endpoint handle
    #[error("{channel} gateway mint error: {message}")]
    Mint { channel: ChannelKind, message: String },

    /// Gateway send error
    #[error("{channel} delivery to '{endpoint}' failed: {message}")]
    Delivery {
        channel: ChannelKind,
        endpoint: String,
        message: String,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create predicate error
    pub fn predicate(processor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Predicate {
            processor: processor.into(),
            message: message.into(),
        }
    }

    /// Create handler error
    pub fn handler(processor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler {
            processor: processor.into(),
            message: message.into(),
        }
    }

    /// Create decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create lookup miss error
    pub fn lookup_miss(entity_id: impl Into<String>) -> Self {
        Self::LookupMiss {
            entity_id: entity_id.into(),
        }
    }

    /// Create publish error
    pub fn publish(channel_identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            channel_identifier: channel_identifier.into(),
            message: message.into(),
        }
    }

    /// Create mint error
    pub fn mint(channel: ChannelKind, message: impl Into<String>) -> Self {
        Self::Mint {
            channel,
            message: message.into(),
        }
    }

    /// Create delivery error
    pub fn delivery(
        channel: ChannelKind,
        endpoint: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Delivery {
            channel,
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }
}
