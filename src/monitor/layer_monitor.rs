use std::collections::VecDeque;

use chrono::{Duration, Utc};
use tracing::{error, info, warn};

use crate::monitor::{HistoricalSummary, LayerMetrics, LayerStatus, MetricsLog, MonitorError, PipelineMetrics, PipelineStatus};
use crate::types::Layer;

/// Number of finished runs kept in memory.
pub const HISTORY_RETENTION: usize = 100;

/// Tracks the state of the active pipeline run and the history of finished ones.
///
/// A pipeline moves `Pending -> Running -> {Completed, Failed, Cancelled}` and each
/// layer within it `Pending -> Running -> {Completed, Failed, Skipped}`. Calls that
/// would break either state machine are rejected with a `MonitorError` and leave
/// the recorded metrics untouched.
pub struct Monitor {
    current: Option<PipelineMetrics>,
    history: VecDeque<PipelineMetrics>,
    metrics_log: Option<MetricsLog>
}

impl Monitor {
    /// Creates a monitor that persists finished runs to `metrics_log` when one is given.
    pub fn new(metrics_log: Option<MetricsLog>) -> Self {
        Self {
            current: None,
            history: VecDeque::new(),
            metrics_log
        }
    }

    /// Seeds the in-memory history from the metrics log.
    pub fn load_history(&mut self) -> Result<usize, MonitorError> {
        let Some(metrics_log) = &self.metrics_log else {
            return Ok(0);
        };

        let runs = metrics_log.load()?;
        let skip = runs.len().saturating_sub(HISTORY_RETENTION);

        self.history = runs.into_iter().skip(skip).collect();
        Ok(self.history.len())
    }

    pub fn start_pipeline(&mut self, pipeline_id: &str, configuration: serde_json::Value) -> Result<&PipelineMetrics, MonitorError> {
        if let Some(active) = &self.current {
            return Err(MonitorError::PipelineAlreadyActive(active.pipeline_id.clone()));
        }

        let mut metrics = PipelineMetrics::new(pipeline_id.to_string(), configuration);
        metrics.status = PipelineStatus::Running;
        metrics.start_time = Some(Utc::now());

        info!("Started monitoring pipeline [{pipeline_id}]");
        Ok(&*self.current.insert(metrics))
    }

    pub fn start_layer(&mut self, layer: Layer) -> Result<&LayerMetrics, MonitorError> {
        let pipeline = self.current.as_mut().ok_or(MonitorError::NoActivePipeline)?;
        let metrics = pipeline.layers.entry(layer).or_insert_with(|| LayerMetrics::new(layer));

        if metrics.status != LayerStatus::Pending {
            return Err(MonitorError::invalid_transition(layer, metrics.status, LayerStatus::Running));
        }

        metrics.status = LayerStatus::Running;
        metrics.start_time = Some(Utc::now());

        info!("Started layer [{layer}]");
        Ok(&*metrics)
    }

    /// Finishes a running layer, as failed when `error_message` is given and completed otherwise.
    pub fn complete_layer(&mut self, layer: Layer, records_processed: u64, records_failed: u64, error_message: Option<String>) -> Result<&LayerMetrics, MonitorError> {
        let target = if error_message.is_some() { LayerStatus::Failed } else { LayerStatus::Completed };
        let metrics = self.running_layer(layer, target)?;

        metrics.end_time = Some(Utc::now());
        metrics.records_processed = records_processed;
        metrics.records_failed = records_failed;
        metrics.calculate_duration();
        metrics.status = target;

        match error_message {
            Some(message) => {
                error!("Layer [{layer}] failed after {:.2}s: {message}", metrics.duration_seconds);
                metrics.error_message = Some(message);
            }
            None => {
                info!("Layer [{layer}] completed: {records_processed} records in {:.2}s", metrics.duration_seconds);
            }
        }

        Ok(&*metrics)
    }

    /// Finishes a running layer that was disabled by configuration.
    pub fn skip_layer(&mut self, layer: Layer) -> Result<&LayerMetrics, MonitorError> {
        let metrics = self.running_layer(layer, LayerStatus::Skipped)?;

        metrics.end_time = Some(Utc::now());
        metrics.calculate_duration();
        metrics.status = LayerStatus::Skipped;

        info!("Layer [{layer}] is disabled, skipped");
        Ok(&*metrics)
    }

    /// Finalizes the active run, persists it and moves it into the history.
    pub fn complete_pipeline(&mut self, success: bool, error_message: Option<String>) -> Result<PipelineMetrics, MonitorError> {
        let status = if success { PipelineStatus::Completed } else { PipelineStatus::Failed };
        self.finish_pipeline(status, error_message)
    }

    pub fn cancel_pipeline(&mut self, reason: &str) -> Result<PipelineMetrics, MonitorError> {
        self.finish_pipeline(PipelineStatus::Cancelled, Some(reason.to_string()))
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<&PipelineMetrics> {
        self.current.as_ref()
    }

    #[cfg(test)]
    pub fn history(&self) -> impl Iterator<Item = &PipelineMetrics> {
        self.history.iter()
    }

    pub fn latest(&self) -> Option<&PipelineMetrics> {
        self.history.back()
    }

    /// Summarizes the runs started in the last `days` days, or `None` when there were none.
    pub fn historical_summary(&self, days: i64) -> Option<HistoricalSummary> {
        let cutoff = Utc::now() - Duration::days(days);

        let recent: Vec<&PipelineMetrics> = self.history.iter()
            .filter(|run| run.start_time.is_some_and(|start_time| start_time >= cutoff))
            .collect();

        if recent.is_empty() {
            return None;
        }

        let total_executions = recent.len();
        let successful_executions = recent.iter().filter(|run| run.is_success()).count();
        let total_duration: f64 = recent.iter().map(|run| run.total_duration_seconds).sum();

        Some(HistoricalSummary {
            period_days: days,
            total_executions,
            successful_executions,
            failed_executions: total_executions - successful_executions,
            success_rate: successful_executions as f64 / total_executions as f64 * 100.0,
            average_duration_seconds: total_duration / total_executions as f64,
            total_records_processed: recent.iter().map(|run| run.total_records_processed).sum()
        })
    }

    fn running_layer(&mut self, layer: Layer, target: LayerStatus) -> Result<&mut LayerMetrics, MonitorError> {
        let pipeline = self.current.as_mut().ok_or(MonitorError::NoActivePipeline)?;
        let metrics = pipeline.layers.get_mut(&layer).ok_or(MonitorError::LayerNotStarted(layer))?;

        if metrics.status != LayerStatus::Running {
            return Err(MonitorError::invalid_transition(layer, metrics.status, target));
        }

        Ok(metrics)
    }

    fn finish_pipeline(&mut self, status: PipelineStatus, error_message: Option<String>) -> Result<PipelineMetrics, MonitorError> {
        let mut pipeline = self.current.take().ok_or(MonitorError::NoActivePipeline)?;

        pipeline.end_time = Some(Utc::now());
        pipeline.calculate_totals();
        pipeline.status = status;
        pipeline.error_message = error_message;

        match status {
            PipelineStatus::Completed => info!(
                "Pipeline [{}] completed: {} records in {:.2}s",
                pipeline.pipeline_id, pipeline.total_records_processed, pipeline.total_duration_seconds
            ),
            PipelineStatus::Cancelled => warn!(
                "Pipeline [{}] cancelled: {}",
                pipeline.pipeline_id, pipeline.error_message.as_deref().unwrap_or_default()
            ),
            _ => error!(
                "Pipeline [{}] failed: {}",
                pipeline.pipeline_id, pipeline.error_message.as_deref().unwrap_or("unknown error")
            )
        }

        if let Some(metrics_log) = &self.metrics_log {
            //NOTE: A run that did its work is not failed just because its metrics could not be written
            match metrics_log.append(&pipeline) {
                Ok(()) => info!("Metrics saved to {}", metrics_log.path().display()),
                Err(error) => error!("Failed to save metrics to {}: {error}", metrics_log.path().display())
            }
        }

        self.history.push_back(pipeline.clone());

        while self.history.len() > HISTORY_RETENTION {
            self.history.pop_front();
        }

        Ok(pipeline)
    }
}
