use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{NaiveDateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{CriteriaCatalog, CustomerDirectory, DetailTable, RawTransaction};
use crate::monitor::{Monitor, MonitorError, PipelineMetrics};
use crate::pipeline::{RunMode, StageError};
use crate::settings::PipelineConfig;
use crate::storage::{IdempotentWriter, Store};
use crate::transform::{FraudTransform, GoldAggregator, TransactionMapper};
use crate::types::{Layer, UNRESOLVED_ACCOUNT_CODE};

const CANCELLATION_POLL: Duration = Duration::from_millis(100);

/// Bronze data extracted for one run.
#[derive(Debug)]
pub struct BronzeSnapshot {
    pub customers: CustomerDirectory,
    pub transactions: Vec<RawTransaction>
}

/// Result of one stage as seen by the run: the stage output, a skip, or a failure signal.
#[derive(Debug)]
pub enum StageOutcome<T> {
    Completed(T),
    Skipped,
    Failed(String)
}

struct StageReport<T> {
    output: T,
    records_processed: u64,
    records_failed: u64
}

/// Runs bronze, silver and gold in sequence against an injected store.
///
/// Every stage is bracketed by `Monitor` calls, retried on transient store
/// failures and stops the run on the first failure. Rows already written by
/// earlier stages stay in place; the idempotent writes make a re-run safe.
pub struct Orchestrator<S: Store> {
    store: Arc<S>,
    config: PipelineConfig,
    monitor: Monitor,
    cancelled: Arc<AtomicBool>
}

impl<S: Store> Orchestrator<S> {
    pub fn new(store: Arc<S>, config: PipelineConfig, monitor: Monitor) -> Self {
        Self {
            store,
            config,
            monitor,
            cancelled: Arc::new(AtomicBool::new(false))
        }
    }

    /// Flag that, once set, stops the run at the next stage boundary or retry pause.
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    #[cfg(test)]
    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// Hands the monitor, with the history of this orchestrator's runs, back to the caller.
    pub fn into_monitor(self) -> Monitor {
        self.monitor
    }

    /// Checks the store is reachable and every namespace and required table exists.
    pub fn validate_preconditions(&self) -> Result<(), StageError> {
        info!("Validating pipeline preconditions");

        self.store.ping()?;

        let mut problems = Vec::new();

        for layer in Layer::ALL {
            if !self.store.namespace_exists(layer)? {
                problems.push(format!("namespace [{layer}] does not exist"));
                continue;
            }

            if !self.config.is_layer_enabled(layer) {
                continue;
            }

            for table in self.config.layer(layer).required_tables() {
                if !self.store.table_exists(layer, table)? {
                    problems.push(format!("required table [{layer}.{table}] does not exist"));
                }
            }
        }

        if !problems.is_empty() {
            return Err(StageError::validation(problems.join("; ")));
        }

        info!("Preconditions validated");
        Ok(())
    }

    /// Executes one monitored pipeline run and returns its final metrics.
    ///
    /// Stage failures do not surface as `Err`; they end the run with a FAILED
    /// status in the returned metrics. `Err` means the monitor itself was misused,
    /// e.g. a run is already active.
    pub fn run(&mut self, mode: RunMode) -> Result<PipelineMetrics, MonitorError> {
        let pipeline_id = format!("pipeline_{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), &Uuid::new_v4().simple().to_string()[..8]);

        self.monitor.start_pipeline(&pipeline_id, self.config.snapshot())?;

        info!(
            "Running {} v{} [{pipeline_id}] in {mode} mode",
            self.config.pipeline.name, self.config.pipeline.version
        );

        let metrics = match self.validate_preconditions() {
            Ok(()) => self.run_stages(mode)?,
            Err(error) => {
                error!("{error}");
                self.monitor.complete_pipeline(false, Some(error.to_string()))?
            }
        };

        log_stage_summary(&metrics);
        Ok(metrics)
    }

    fn run_stages(&mut self, mode: RunMode) -> Result<PipelineMetrics, MonitorError> {
        let mut bronze = None;

        for &layer in mode.layers() {
            if self.is_cancelled() {
                return self.monitor.cancel_pipeline("Pipeline run was cancelled");
            }

            let failure = match layer {
                Layer::Bronze => match self.process_bronze_layer()? {
                    StageOutcome::Completed(snapshot) => {
                        bronze = Some(snapshot);
                        None
                    }
                    StageOutcome::Skipped => None,
                    StageOutcome::Failed(message) => Some(message)
                },
                Layer::Silver => match self.process_silver_layer(bronze.take())? {
                    StageOutcome::Failed(message) => Some(message),
                    _ => None
                },
                Layer::Gold => match self.process_gold_layer()? {
                    StageOutcome::Failed(message) => Some(message),
                    _ => None
                }
            };

            if let Some(message) = failure {
                if self.is_cancelled() {
                    return self.monitor.cancel_pipeline("Pipeline run was cancelled");
                }

                return self.monitor.complete_pipeline(false, Some(format!("{layer} layer failed: {message}")));
            }
        }

        self.monitor.complete_pipeline(true, None)
    }

    /// Extracts the customer directory and the raw transactions from bronze.
    pub fn process_bronze_layer(&mut self) -> Result<StageOutcome<BronzeSnapshot>, MonitorError> {
        self.run_stage(Layer::Bronze, |orchestrator| {
            let snapshot = orchestrator.extract_bronze()?;
            let records = snapshot.transactions.len() as u64;

            Ok(StageReport {
                output: snapshot,
                records_processed: records,
                records_failed: 0
            })
        })
    }

    /// Classifies, maps and idempotently writes silver transactions.
    ///
    /// Uses `bronze` when the bronze stage of the same run produced it and extracts bronze itself otherwise.
    pub fn process_silver_layer(&mut self, bronze: Option<BronzeSnapshot>) -> Result<StageOutcome<()>, MonitorError> {
        self.run_stage(Layer::Silver, |orchestrator| {
            let extracted;
            let snapshot = match &bronze {
                Some(snapshot) => snapshot,
                None => {
                    extracted = orchestrator.extract_bronze()?;
                    &extracted
                }
            };

            orchestrator.transform_to_silver(snapshot)
        })
    }

    /// Aggregates the silver table into the gold detail and summary tables.
    pub fn process_gold_layer(&mut self) -> Result<StageOutcome<()>, MonitorError> {
        self.run_stage(Layer::Gold, |orchestrator| orchestrator.aggregate_to_gold())
    }

    fn run_stage<T>(&mut self, layer: Layer, mut work: impl FnMut(&Self) -> Result<StageReport<T>, StageError>) -> Result<StageOutcome<T>, MonitorError> {
        self.monitor.start_layer(layer)?;

        if !self.config.is_layer_enabled(layer) {
            self.monitor.skip_layer(layer)?;
            return Ok(StageOutcome::Skipped);
        }

        let settings = self.config.layer(layer);
        info!("Processing {layer} layer (batch size {}, timeout {}s)", settings.batch_size, settings.timeout_seconds);

        match self.with_retry(layer, || work(self)) {
            Ok(report) => {
                self.monitor.complete_layer(layer, report.records_processed, report.records_failed, None)?;
                Ok(StageOutcome::Completed(report.output))
            }
            Err(error) => {
                let message = error.to_string();
                self.monitor.complete_layer(layer, 0, 0, Some(message.clone()))?;
                Ok(StageOutcome::Failed(message))
            }
        }
    }

    fn with_retry<T>(&self, layer: Layer, mut attempt: impl FnMut() -> Result<T, StageError>) -> Result<T, StageError> {
        let max_retries = self.config.pipeline.max_retries;
        let mut delay = Duration::from_secs(self.config.pipeline.retry_delay_seconds);
        let mut retries = 0;

        loop {
            if self.is_cancelled() {
                return Err(StageError::Cancelled);
            }

            match attempt() {
                Err(error) if error.is_transient() && retries < max_retries => {
                    retries += 1;
                    warn!("{layer} layer attempt {retries} of {} failed, retrying in {delay:?}: {error}", max_retries + 1);

                    self.pause(delay)?;
                    delay = delay.saturating_mul(2);
                }
                result => return result
            }
        }
    }

    fn pause(&self, delay: Duration) -> Result<(), StageError> {
        let deadline = Instant::now() + delay;

        loop {
            if self.is_cancelled() {
                return Err(StageError::Cancelled);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());

            if remaining.is_zero() {
                return Ok(());
            }

            thread::sleep(remaining.min(CANCELLATION_POLL));
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn extract_bronze(&self) -> Result<BronzeSnapshot, StageError> {
        let customers = CustomerDirectory::new(self.store.load_customers()?);
        let transactions = self.store.load_raw_transactions()?;

        info!("Extracted {} customers and {} raw transactions from bronze", customers.len(), transactions.len());

        Ok(BronzeSnapshot {
            customers,
            transactions
        })
    }

    fn transform_to_silver(&self, bronze: &BronzeSnapshot) -> Result<StageReport<()>, StageError> {
        let catalog = CriteriaCatalog::new(self.store.load_criteria()?);
        let settings = self.config.anomaly_detection();

        let classified = FraudTransform::new(&bronze.customers, &catalog, &settings)
            .classify(bronze.transactions.clone())?;

        let unresolved = classified.iter()
            .filter(|transaction| transaction.criteria_anomali == UNRESOLVED_ACCOUNT_CODE)
            .count();

        let rows = TransactionMapper::new(stamp()).map_all(classified);
        let inserted = IdempotentWriter::new(self.store.as_ref(), self.config.silver.batch_size).write_silver(rows)?;

        Ok(StageReport {
            output: (),
            records_processed: inserted.len() as u64,
            records_failed: unresolved as u64
        })
    }

    fn aggregate_to_gold(&self) -> Result<StageReport<()>, StageError> {
        let silver = self.store.load_silver()?;
        let batch = GoldAggregator::new(stamp()).aggregate(&silver);
        let writer = IdempotentWriter::new(self.store.as_ref(), self.config.gold.batch_size);

        let normal = writer.write_gold_details(DetailTable::Normal, batch.normal)?;
        let abnormal = writer.write_gold_details(DetailTable::Abnormal, batch.abnormal)?;
        let summaries = writer.write_gold_summaries(batch.summaries)?;

        info!(
            "Gold aggregated {} silver rows: {} normal, {} abnormal, {} summary rows inserted",
            silver.len(), normal.len(), abnormal.len(), summaries.len()
        );

        Ok(StageReport {
            output: (),
            records_processed: (normal.len() + abnormal.len() + summaries.len()) as u64,
            records_failed: 0
        })
    }
}

fn stamp() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn log_stage_summary(metrics: &PipelineMetrics) {
    for layer in metrics.layers.values() {
        info!(
            "  {}: {}, {} records, {:.2}s",
            layer.layer_name, layer.status, layer.records_processed, layer.duration_seconds
        );
    }

    info!(
        "Pipeline [{}] {}: {} records, {} failed, {:.2}s",
        metrics.pipeline_id, metrics.status, metrics.total_records_processed, metrics.total_records_failed, metrics.total_duration_seconds
    );
}
