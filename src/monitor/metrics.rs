use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Layer;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStatus::Pending => "pending",
            PipelineStatus::Running => "running",
            PipelineStatus::Completed => "completed",
            PipelineStatus::Failed => "failed",
            PipelineStatus::Cancelled => "cancelled"
        };

        f.write_str(name)
    }
}

impl fmt::Display for LayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LayerStatus::Pending => "pending",
            LayerStatus::Running => "running",
            LayerStatus::Completed => "completed",
            LayerStatus::Failed => "failed",
            LayerStatus::Skipped => "skipped"
        };

        f.write_str(name)
    }
}

/// Metrics of one layer within one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerMetrics {
    pub layer_name: Layer,
    pub status: LayerStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub records_processed: u64,
    pub records_failed: u64,
    pub duration_seconds: f64,
    pub error_message: Option<String>
}

impl LayerMetrics {
    pub fn new(layer_name: Layer) -> Self {
        Self {
            layer_name,
            status: LayerStatus::Pending,
            start_time: None,
            end_time: None,
            records_processed: 0,
            records_failed: 0,
            duration_seconds: 0.0,
            error_message: None
        }
    }

    pub(super) fn calculate_duration(&mut self) {
        if let (Some(start_time), Some(end_time)) = (self.start_time, self.end_time) {
            self.duration_seconds = seconds_between(start_time, end_time);
        }
    }
}

/// Metrics of one pipeline run, persisted to the metrics log when the run ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineMetrics {
    pub pipeline_id: String,
    pub status: PipelineStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_duration_seconds: f64,
    pub layers: BTreeMap<Layer, LayerMetrics>,
    pub total_records_processed: u64,
    pub total_records_failed: u64,
    pub error_message: Option<String>,
    /// The effective configuration the run was started with.
    pub configuration: serde_json::Value
}

impl PipelineMetrics {
    pub fn new(pipeline_id: String, configuration: serde_json::Value) -> Self {
        Self {
            pipeline_id,
            status: PipelineStatus::Pending,
            start_time: None,
            end_time: None,
            total_duration_seconds: 0.0,
            layers: BTreeMap::new(),
            total_records_processed: 0,
            total_records_failed: 0,
            error_message: None,
            configuration
        }
    }

    #[cfg(test)]
    pub fn layer(&self, layer: Layer) -> Option<&LayerMetrics> {
        self.layers.get(&layer)
    }

    pub fn is_success(&self) -> bool {
        self.status == PipelineStatus::Completed
    }

    pub(super) fn calculate_totals(&mut self) {
        self.total_records_processed = self.layers.values().map(|layer| layer.records_processed).sum();
        self.total_records_failed = self.layers.values().map(|layer| layer.records_failed).sum();

        if let (Some(start_time), Some(end_time)) = (self.start_time, self.end_time) {
            self.total_duration_seconds = seconds_between(start_time, end_time);
        }
    }
}

/// Aggregate over the pipeline runs started within a recent period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalSummary {
    pub period_days: i64,
    pub total_executions: usize,
    pub successful_executions: usize,
    pub failed_executions: usize,
    /// Percentage of runs that completed.
    pub success_rate: f64,
    pub average_duration_seconds: f64,
    pub total_records_processed: u64
}

fn seconds_between(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> f64 {
    (end_time - start_time).num_microseconds()
        .map(|micros| micros as f64 / 1_000_000.0)
        .unwrap_or_default()
}
