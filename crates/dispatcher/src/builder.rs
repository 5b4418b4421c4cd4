//! DispatcherBuilder - wires configured processors into a Dispatcher

use std::sync::Arc;

use contracts::ProcessorConfig;
use ingestion::RecordNormalizer;
use tracing::{info, instrument};

use crate::dispatcher::Dispatcher;
use crate::error::DispatcherError;
use crate::processors::{create_processor, ProcessorContext};
use crate::report::ErrorSink;

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    name: String,
    configs: Vec<ProcessorConfig>,
    error_sink: Option<Arc<dyn ErrorSink>>,
    normalizer: Option<RecordNormalizer>,
}

impl DispatcherBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            configs: Vec::new(),
            error_sink: None,
            normalizer: None,
        }
    }

    pub fn processors<'a>(mut self, configs: impl IntoIterator<Item = &'a ProcessorConfig>) -> Self {
        self.configs.extend(configs.into_iter().cloned());
        self
    }

    pub fn error_sink(mut self, error_sink: Arc<dyn ErrorSink>) -> Self {
        self.error_sink = Some(error_sink);
        self
    }

    pub fn normalizer(mut self, normalizer: RecordNormalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Create every processor and register it
    #[instrument(
        name = "dispatcher_builder_build",
        skip_all,
        fields(dispatcher = %self.name, processor_count = self.configs.len())
    )]
    pub fn build(self, ctx: &ProcessorContext) -> Result<Dispatcher, DispatcherError> {
        let mut dispatcher = Dispatcher::new(self.name);
        if let Some(error_sink) = self.error_sink {
            dispatcher = dispatcher.with_error_sink(error_sink);
        }
        if let Some(normalizer) = self.normalizer {
            dispatcher = dispatcher.with_normalizer(normalizer);
        }

        for config in &self.configs {
            dispatcher.register(create_processor(config, ctx)?)?;
        }

        info!(processors = ?dispatcher.processor_names(), "dispatcher built");
        Ok(dispatcher)
    }
}
