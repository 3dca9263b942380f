use thiserror::Error;

use crate::monitor::LayerStatus;
use crate::types::Layer;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("No active pipeline to monitor")]
    NoActivePipeline,
    #[error("Pipeline [{0}] is still active")]
    PipelineAlreadyActive(String),
    #[error("Layer [{0}] was not started in the current pipeline")]
    LayerNotStarted(Layer),
    #[error("Layer [{layer}] cannot move from {from} to {to}")]
    InvalidTransition {
        layer: Layer,
        from: LayerStatus,
        to: LayerStatus
    },
    #[error("Metrics I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Metrics serialization error: {0}")]
    Json(#[from] serde_json::Error)
}

impl MonitorError {
    pub fn invalid_transition(layer: Layer, from: LayerStatus, to: LayerStatus) -> Self {
        Self::InvalidTransition { layer, from, to }
    }
}
