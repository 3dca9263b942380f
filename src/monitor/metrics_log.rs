use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::monitor::{MonitorError, PipelineMetrics};

/// Number of runs kept in the metrics file.
pub const METRICS_LOG_RETENTION: usize = 50;

/// Append-only JSON array of finished pipeline runs, capped to the most recent entries.
pub struct MetricsLog {
    path: PathBuf,
    retention: usize
}

impl MetricsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            retention: METRICS_LOG_RETENTION
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every recorded run. A missing file is an empty log.
    pub fn load(&self) -> Result<Vec<PipelineMetrics>, MonitorError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn append(&self, metrics: &PipelineMetrics) -> Result<(), MonitorError> {
        let mut runs = match self.load() {
            Ok(runs) => runs,
            Err(MonitorError::Json(error)) => {
                warn!("Metrics file {} is unreadable and will be replaced: {error}", self.path.display());
                Vec::new()
            }
            Err(error) => return Err(error)
        };

        runs.push(metrics.clone());

        let excess = runs.len().saturating_sub(self.retention);
        runs.drain(..excess);

        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.path, serde_json::to_string_pretty(&runs)?)?;
        Ok(())
    }
}
