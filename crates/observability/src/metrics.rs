//! 管道指标收集模块
//!
//! 记录两阶段分发的批次指标，并在内存中聚合以便输出摘要。

use std::collections::BTreeMap;

use contracts::DomainEvent;
use metrics::{counter, gauge, histogram};

/// 一个批次的分发结果
///
/// # Example
///
/// ```ignore
/// use observability::metrics::{record_batch, BatchSample};
///
/// let summary = dispatcher.dispatch_batch(&raw).await;
/// record_batch(&BatchSample {
///     stage: "source".into(),
///     records: summary.records as u64,
///     ..Default::default()
/// });
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSample {
    /// 阶段名称 (dispatcher 名称)
    pub stage: String,
    pub records: u64,
    pub invocations: u64,
    pub failed_invocations: u64,
    pub failure_reports: u64,
    /// 批次耗时 (毫秒)
    pub latency_ms: f64,
}

/// 记录批次指标
pub fn record_batch(sample: &BatchSample) {
    let stage = sample.stage.clone();
    counter!("chat_fanout_batches_total", "stage" => stage.clone()).increment(1);
    counter!("chat_fanout_batch_records_total", "stage" => stage.clone()).increment(sample.records);
    histogram!("chat_fanout_batch_latency_ms", "stage" => stage.clone()).record(sample.latency_ms);
    gauge!("chat_fanout_last_batch_records", "stage" => stage.clone()).set(sample.records as f64);

    if sample.failed_invocations > 0 {
        counter!("chat_fanout_batch_failed_invocations_total", "stage" => stage)
            .increment(sample.failed_invocations);
    }
}

/// 记录派生出的领域事件
pub fn record_domain_event(channel_identifier: &str, event: &DomainEvent) {
    counter!(
        "chat_fanout_domain_events_total",
        "channel_identifier" => channel_identifier.to_string(),
        "event_type" => event.event_type.clone()
    )
    .increment(1);
    histogram!("chat_fanout_event_recipients").record(event.recipient_ids.len() as f64);
}

/// 记录注册表规模
pub fn record_listener_count(count: usize) {
    gauge!("chat_fanout_listeners").set(count as f64);
}

/// 每个阶段的累计值
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageTotals {
    pub batches: u64,
    pub records: u64,
    pub invocations: u64,
    pub failed_invocations: u64,
    pub failure_reports: u64,
}

/// 管道指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct PipelineMetricsAggregator {
    stages: BTreeMap<String, StageTotals>,
    latency_stats: RunningStats,
    recipient_stats: RunningStats,
    events_by_type: BTreeMap<String, u64>,
}

impl PipelineMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新批次统计
    pub fn update_batch(&mut self, sample: &BatchSample) {
        let totals = self.stages.entry(sample.stage.clone()).or_default();
        totals.batches += 1;
        totals.records += sample.records;
        totals.invocations += sample.invocations;
        totals.failed_invocations += sample.failed_invocations;
        totals.failure_reports += sample.failure_reports;
        self.latency_stats.push(sample.latency_ms);
    }

    /// 更新事件统计
    pub fn update_event(&mut self, event: &DomainEvent) {
        *self
            .events_by_type
            .entry(event.event_type.clone())
            .or_insert(0) += 1;
        self.recipient_stats.push(event.recipient_ids.len() as f64);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let invocations: u64 = self.stages.values().map(|s| s.invocations).sum();
        let failed: u64 = self.stages.values().map(|s| s.failed_invocations).sum();
        MetricsSummary {
            stages: self.stages.clone(),
            failure_rate: if invocations > 0 {
                failed as f64 / invocations as f64 * 100.0
            } else {
                0.0
            },
            batch_latency_ms: StatsSummary::from(&self.latency_stats),
            recipients_per_event: StatsSummary::from(&self.recipient_stats),
            events_by_type: self.events_by_type.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub stages: BTreeMap<String, StageTotals>,
    /// 失败调用占比 (%)
    pub failure_rate: f64,
    pub batch_latency_ms: StatsSummary,
    pub recipients_per_event: StatsSummary,
    pub events_by_type: BTreeMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Pipeline Metrics Summary ===")?;
        for (stage, totals) in &self.stages {
            writeln!(
                f,
                "[{stage}] batches={} records={} invocations={} failed={} reports={}",
                totals.batches,
                totals.records,
                totals.invocations,
                totals.failed_invocations,
                totals.failure_reports
            )?;
        }
        writeln!(f, "Handler failure rate: {:.2}%", self.failure_rate)?;
        writeln!(f, "Batch latency (ms): {}", self.batch_latency_ms)?;
        writeln!(f, "Recipients per event: {}", self.recipients_per_event)?;

        if !self.events_by_type.is_empty() {
            writeln!(f, "Derived events:")?;
            for (event_type, count) in &self.events_by_type {
                writeln!(f, "  {event_type}: {count}")?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            return write!(f, "N/A");
        }
        write!(
            f,
            "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
            self.min, self.max, self.mean, self.std_dev, self.count
        )
    }
}

/// 在线统计 (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}
