//! Pipeline orchestrator - wires both dispatch stages around the relay.
//!
//! ```text
//! raw events ─▶ source Dispatcher ─▶ ChannelPublisher ─▶ EnvelopeRelay ─▶ relay Dispatcher ─▶ fan-out
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use contracts::{ContractError, DomainEvent, EventPublisher, ServiceBlueprint};
use dispatcher::{
    relay_channel, BatchSummary, ChannelPublisher, CollectingErrorSink, DispatcherBuilder,
    EnvelopeRelay, ErrorSink, LogErrorSink, ProcessorContext, StaticEntityMediator, TeeErrorSink,
};
use fanout::NotificationFanoutService;
use ingestion::{RawEvent, RecordNormalizer};
use listener_directory::ListenerDirectory;
use observability::{
    record_batch, record_domain_event, record_listener_count, BatchSample,
    PipelineMetricsAggregator,
};
use tracing::{info, warn};

use super::fixtures::{load_events, FixtureFile};
use super::PipelineStats;
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The service blueprint (CLI overrides already applied)
    pub blueprint: ServiceBlueprint,

    /// JSON array of raw events
    pub events_path: PathBuf,

    /// Mediator and listener fixtures (None = empty)
    pub fixtures_path: Option<PathBuf>,

    /// Raw events per source batch
    pub batch_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Read the events file and the optional fixtures file
    pub fn load_inputs(&self) -> Result<(Vec<RawEvent>, FixtureFile)> {
        let events = load_events(&self.config.events_path)?;
        let fixtures = match &self.config.fixtures_path {
            Some(path) => FixtureFile::load(path)?,
            None => FixtureFile::default(),
        };
        Ok((events, fixtures))
    }

    /// Run both stages to completion
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let (events, fixtures) = self.load_inputs()?;
        info!(
            events = events.len(),
            listeners = fixtures.listeners.len(),
            "Inputs loaded"
        );

        // Listener directory and fan-out service
        let directory = Arc::new(ListenerDirectory::new());
        let fanout = Arc::new(
            NotificationFanoutService::from_config(&blueprint.fanout, Arc::clone(&directory))
                .context("Failed to create notification gateways")?,
        );
        for listener in &fixtures.listeners {
            if let Err(e) = fanout
                .register_channel_endpoint(&listener.owner_id, listener.channel, &listener.token)
                .await
            {
                warn!(
                    owner_id = %listener.owner_id,
                    channel = %listener.channel,
                    error = %e,
                    "Listener registration failed, skipping"
                );
            }
        }
        record_listener_count(directory.len());

        let mediator = Arc::new(StaticEntityMediator::from_fixture(fixtures.mediator));
        let aggregator = Arc::new(Mutex::new(PipelineMetricsAggregator::new()));
        let collected = Arc::new(CollectingErrorSink::new());
        let sinks: Vec<Arc<dyn ErrorSink>> = vec![Arc::new(LogErrorSink), collected.clone()];
        let error_sink: Arc<dyn ErrorSink> = Arc::new(TeeErrorSink::new(sinks));

        // Relay stage: spawned first so publishers never block on a full queue
        let (publisher, rx) = relay_channel(blueprint.service.relay_capacity);
        let relay_dispatcher = DispatcherBuilder::new("relay")
            .processors(blueprint.relay_processors())
            .error_sink(Arc::clone(&error_sink))
            .build(&ProcessorContext::new().with_fanout(Arc::clone(&fanout)))
            .map_err(|e| CliError::pipeline_execution(e.to_string()))?;
        let relay_dispatcher = Arc::new(relay_dispatcher);
        let relay_handle = EnvelopeRelay::new(Arc::clone(&relay_dispatcher), rx).spawn();

        // Source stage
        let publisher = Arc::new(MeteredPublisher {
            inner: publisher,
            aggregator: Arc::clone(&aggregator),
        });
        let normalizer = RecordNormalizer::new();
        let source_dispatcher = DispatcherBuilder::new("source")
            .processors(blueprint.source_processors())
            .error_sink(Arc::clone(&error_sink))
            .normalizer(normalizer.clone())
            .build(
                &ProcessorContext::new()
                    .with_mediator(mediator)
                    .with_publisher(publisher.clone()),
            )
            .map_err(|e| CliError::pipeline_execution(e.to_string()))?;

        let mut source_summary = BatchSummary::default();
        for batch in events.chunks(self.config.batch_size) {
            let batch_start = Instant::now();
            let summary = source_dispatcher.dispatch_batch(batch).await;
            let sample = batch_sample("source", &summary, batch_start);
            record_batch(&sample);
            lock(&aggregator).update_batch(&sample);
            source_summary.merge(summary);
        }

        // Closing the last publisher handle ends the relay loop
        let events_published = publisher.inner.published_count();
        let source_metrics = source_dispatcher.metrics();
        drop(source_dispatcher);
        drop(publisher);

        let relay_start = Instant::now();
        let relay_summary = relay_handle
            .await
            .map_err(|e| CliError::pipeline_execution(format!("relay task failed: {e}")))?;
        let sample = batch_sample("relay", &relay_summary, relay_start);
        record_batch(&sample);
        lock(&aggregator).update_batch(&sample);

        let metrics = lock(&aggregator).clone();
        Ok(PipelineStats {
            records_in: events.len() as u64,
            events_published,
            listeners: directory.len(),
            source: source_summary,
            relay: relay_summary,
            source_metrics,
            relay_metrics: relay_dispatcher.metrics(),
            normalizer: normalizer.metrics().snapshot(),
            failure_reports: collected.reports(),
            metrics,
            duration: start_time.elapsed(),
        })
    }
}

/// Counts derived events before handing them to the relay
struct MeteredPublisher {
    inner: ChannelPublisher,
    aggregator: Arc<Mutex<PipelineMetricsAggregator>>,
}

#[async_trait]
impl EventPublisher for MeteredPublisher {
    async fn publish(
        &self,
        channel_identifier: &str,
        event: DomainEvent,
    ) -> std::result::Result<(), ContractError> {
        record_domain_event(channel_identifier, &event);
        lock(&self.aggregator).update_event(&event);
        self.inner.publish(channel_identifier, event).await
    }
}

fn lock(
    aggregator: &Mutex<PipelineMetricsAggregator>,
) -> std::sync::MutexGuard<'_, PipelineMetricsAggregator> {
    aggregator.lock().unwrap_or_else(PoisonError::into_inner)
}

fn batch_sample(stage: &str, summary: &BatchSummary, started: Instant) -> BatchSample {
    BatchSample {
        stage: stage.to_string(),
        records: summary.records as u64,
        invocations: summary.invocations as u64,
        failed_invocations: summary.failed_invocations as u64,
        failure_reports: summary.failure_reports as u64,
        latency_ms: started.elapsed().as_secs_f64() * 1000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CONFIG: &str = r#"
[service]
name = "chat-notify"
relay_capacity = 4

[[fanout.gateways]]
channel = "socket"
gateway_type = "log"

[[fanout.gateways]]
channel = "push"
gateway_type = "log"

[[processors]]
name = "team-member-added"
kind = "membership_added"
source_name = "chat-table"
grouping = "team"
publish_to = "team-events"

[[processors]]
name = "team-socket"
kind = "topic_fanout"
channel_identifier = "team-events"
channels = ["socket"]

[[processors]]
name = "team-push-added-user"
kind = "topic_fanout"
channel_identifier = "team-events"
channels = ["push"]
recipients = { mode = "payload_field", field = "addedUser" }
"#;

    const EVENTS: &str = r#"[
        {
            "source": "stream",
            "tableName": "chat-table",
            "eventName": "INSERT",
            "newImage": {
                "entityType": {"S": "Membership"},
                "groupKind": {"S": "team"},
                "groupId": {"S": "G1"},
                "userId": {"S": "U3"}
            }
        },
        {"source": "stream", "tableName": "chat-table"}
    ]"#;

    const FIXTURES: &str = r#"{
        "mediator": {
            "aggregates": [{"id": "G1", "kind": "team"}],
            "members": {"G1": ["U1", "U2", "U3"]}
        },
        "listeners": [
            {"owner_id": "U1", "channel": "socket", "token": "conn-1"},
            {"owner_id": "U2", "channel": "socket", "token": "conn-2"},
            {"owner_id": "U3", "channel": "socket", "token": "conn-3"},
            {"owner_id": "U3", "channel": "push", "token": "device-3"}
        ]
    }"#;

    #[tokio::test]
    async fn test_pipeline_runs_both_stages() {
        let dir = tempfile::tempdir().unwrap();
        let events_path = dir.path().join("events.json");
        let fixtures_path = dir.path().join("fixtures.json");
        fs::write(&events_path, EVENTS).unwrap();
        fs::write(&fixtures_path, FIXTURES).unwrap();

        let blueprint =
            config_loader::ConfigLoader::load_from_str(CONFIG, config_loader::ConfigFormat::Toml)
                .unwrap();
        let pipeline = Pipeline::new(PipelineConfig {
            blueprint,
            events_path,
            fixtures_path: Some(fixtures_path),
            batch_size: 1,
            metrics_port: None,
        });

        let stats = pipeline.run().await.unwrap();

        assert_eq!(stats.records_in, 2);
        assert_eq!(stats.listeners, 4);
        assert_eq!(stats.normalizer.malformed, 1);
        assert_eq!(stats.source.records, 2);
        assert_eq!(stats.source.invocations, 1);
        assert_eq!(stats.events_published, 1);
        // one envelope, both fan-out units matched
        assert_eq!(stats.relay.records, 1);
        assert_eq!(stats.relay.invocations, 2);
        assert!(stats.failure_reports.is_empty());

        let summary = stats.metrics.summary();
        assert_eq!(summary.events_by_type.get("MemberAdded"), Some(&1));
        assert_eq!(summary.stages["source"].batches, 2);
    }

    #[tokio::test]
    async fn test_pipeline_reports_missing_events_file() {
        let blueprint =
            config_loader::ConfigLoader::load_from_str(CONFIG, config_loader::ConfigFormat::Toml)
                .unwrap();
        let pipeline = Pipeline::new(PipelineConfig {
            blueprint,
            events_path: PathBuf::from("/nonexistent/events.json"),
            fixtures_path: None,
            batch_size: 10,
            metrics_port: None,
        });

        let err = pipeline.run().await.unwrap_err();
        assert!(err.to_string().contains("events file not found"), "got: {err}");
    }
}
