//! Dispatcher error types

use thiserror::Error;

/// Dispatcher construction errors
///
/// Dispatching itself never fails; these only surface while wiring processors.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Processor creation error
    #[error("failed to create processor '{name}': {message}")]
    ProcessorCreation { name: String, message: String },

    /// Processor name registered twice
    #[error("processor '{0}' is already registered")]
    DuplicateProcessor(String),

    /// Fan-out service construction error
    #[error("fanout error: {0}")]
    Fanout(#[from] fanout::FanoutError),

    /// Contract error
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    /// Create a processor creation error
    pub fn processor_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProcessorCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
