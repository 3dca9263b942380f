//! Pipeline configuration.
//!
//! Every key has a default, so a missing configuration file yields a runnable
//! pipeline. Values are layered: defaults, then the optional file (JSON or TOML
//! by extension), then `ETL__<SECTION>__<KEY>` environment variables.


use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::types::Layer;

pub const DEFAULT_CONFIG_FILE: &str = "pipeline_config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub pipeline: RunConfig,
    pub bronze: LayerConfig,
    pub silver: LayerConfig,
    pub gold: LayerConfig,
    pub monitoring: MonitoringConfig,
    pub store: StoreConfig
}

/// Settings that apply to the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Extra attempts for a stage that failed on a transient store error.
    pub max_retries: u32,
    /// Delay before the first retry, doubled on every further attempt.
    pub retry_delay_seconds: u64,
    pub timeout_seconds: u64
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            name: "Bronze-Silver-Gold Data Pipeline".to_string(),
            version: "1.0.0".to_string(),
            description: "Complete data processing pipeline from bronze to gold layers".to_string(),
            max_retries: 3,
            retry_delay_seconds: 30,
            timeout_seconds: 3600
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    pub enabled: bool,
    /// Upper bound on rows per store append.
    pub batch_size: usize,
    pub timeout_seconds: u64,
    pub tables: HashMap<String, TableConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly_detection: Option<AnomalyDetectionConfig>
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_size: 1000,
            timeout_seconds: 300,
            tables: HashMap::new(),
            anomaly_detection: None
        }
    }
}

impl LayerConfig {
    fn with_tables(timeout_seconds: u64, tables: &[(&str, bool)]) -> Self {
        Self {
            timeout_seconds,
            tables: tables.iter()
                .map(|(name, required)| (name.to_string(), TableConfig { required: *required }))
                .collect(),
            ..Self::default()
        }
    }

    /// Tables that must exist before the layer can run, sorted for stable reporting.
    pub fn required_tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = self.tables.iter()
            .filter(|(_, table)| table.required)
            .map(|(name, _)| name.as_str())
            .collect();

        tables.sort_unstable();
        tables
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub required: bool
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyDetectionConfig {
    /// Turns the repeated-transfer rule on or off. Status derivation always runs.
    pub enabled: bool,
    /// Two transfers closer together than this are considered rapid.
    pub time_threshold_seconds: i64,
    /// Flagged transfers at or above this amount raise an alert log line. Classification ignores it.
    pub amount_threshold: i64,
    /// Destination bank whose beneficiary accounts are checked against the customer directory.
    pub home_bank: String,
    /// Abort the transform on an unknown account instead of failing the single transaction.
    pub strict_references: bool
}

impl Default for AnomalyDetectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            time_threshold_seconds: 3600,
            amount_threshold: 200_000,
            home_bank: "BNI".to_string(),
            strict_references: false
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: String,
    pub metrics_file: PathBuf
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_file: PathBuf::from("pipeline_metrics.json")
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root directory of the store; namespaces are its sub-directories.
    pub data_dir: PathBuf
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data")
        }
    }
}

impl Default for PipelineConfig {
    /// Every layer enabled, with the bronze inputs and the criteria table required.
    fn default() -> Self {
        let mut silver = LayerConfig::with_tables(600, &[("criteria", true), ("transactions", false)]);
        silver.anomaly_detection = Some(AnomalyDetectionConfig::default());

        Self {
            pipeline: RunConfig::default(),
            bronze: LayerConfig::with_tables(300, &[("data_nasabah_raw", true), ("transactions_raw", true)]),
            silver,
            gold: LayerConfig::with_tables(300, &[
                ("transactions_normal", false),
                ("transactions_abnormal", false),
                ("transactions_summary", false)
            ]),
            monitoring: MonitoringConfig::default(),
            store: StoreConfig::default()
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from an optional file and the process environment.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_environment(path, None)
    }

    /// Loads configuration, reading overrides from `environment` instead of the process when given.
    pub fn load_with_environment(path: &Path, environment: Option<HashMap<String, String>>) -> Result<Self> {
        let defaults = Config::try_from(&Self::default())
            .context("Failed to build default configuration")?;

        let config = Config::builder()
            .add_source(defaults)
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("ETL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(environment)
            )
            .build()
            .with_context(|| format!("Failed to build configuration from {}", path.display()))?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn layer(&self, layer: Layer) -> &LayerConfig {
        match layer {
            Layer::Bronze => &self.bronze,
            Layer::Silver => &self.silver,
            Layer::Gold => &self.gold
        }
    }

    pub fn is_layer_enabled(&self, layer: Layer) -> bool {
        self.layer(layer).enabled
    }

    pub fn anomaly_detection(&self) -> AnomalyDetectionConfig {
        self.silver.anomaly_detection.clone().unwrap_or_default()
    }

    /// The effective configuration as JSON, used for `--show-config` and the metrics snapshot.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
