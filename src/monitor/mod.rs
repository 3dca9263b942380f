mod errors;
mod layer_monitor;
mod metrics;
mod metrics_log;

pub use errors::MonitorError;
pub use layer_monitor::Monitor;
pub use metrics::{HistoricalSummary, LayerMetrics, LayerStatus, PipelineMetrics, PipelineStatus};
pub use metrics_log::MetricsLog;
