use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::models::{AnomalyCriterion, AnomalyType, CustomerRecord, DetailTable, GoldDetail, GoldSummary, RawTransaction, SilverTransaction};
use crate::storage::{Store, StoreError, CRITERIA_TABLE, CUSTOMER_TABLE, RAW_TRANSACTION_TABLE, SILVER_TABLE, SUMMARY_TABLE};
use crate::types::Layer;

#[derive(Deserialize)]
struct CodeColumn {
    code_transaction: String
}

#[derive(Deserialize)]
struct IdColumn {
    id: Uuid
}

#[derive(Deserialize)]
struct SummaryKeyColumns {
    trx_date: NaiveDate,
    anomaly_type: AnomalyType
}

/// A directory-backed store.
///
/// The root directory plays the database, each namespace is a sub-directory
/// and each table is a headed CSV file, e.g. `bronze/transactions_raw.csv`.
/// Output tables are created on first append.
pub struct CsvStore {
    root: PathBuf
}

impl CsvStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn table_path(&self, namespace: Layer, table: &str) -> PathBuf {
        self.root.join(namespace.as_str()).join(format!("{table}.csv"))
    }

    /// Reads every row of a table. A missing table is an error unless `missing_ok` is set, in which case it reads as empty.
    fn read_table<T: DeserializeOwned>(&self, namespace: Layer, table: &str, missing_ok: bool) -> Result<Vec<T>, StoreError> {
        self.ping()?;

        let path = self.table_path(namespace, table);

        if !path.is_file() {
            if missing_ok {
                return Ok(Vec::new());
            }

            return Err(StoreError::table_missing(namespace, table));
        }

        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .from_reader(BufReader::new(File::open(&path)?));

        let mut rows = Vec::new();

        for row in reader.deserialize::<T>() {
            rows.push(row?);
        }

        debug!("Read {} rows from {namespace}.{table}", rows.len());
        Ok(rows)
    }

    fn append_table<T: Serialize>(&self, namespace: Layer, table: &str, rows: &[T]) -> Result<usize, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }

        if !self.namespace_exists(namespace)? {
            return Err(StoreError::NamespaceMissing(namespace));
        }

        let path = self.table_path(namespace, table);
        let is_new = path.metadata().map(|metadata| metadata.len() == 0).unwrap_or(true);

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(BufWriter::new(file));

        for row in rows {
            writer.serialize(row)?;
        }

        writer.flush()?;

        debug!("Appended {} rows to {namespace}.{table}", rows.len());
        Ok(rows.len())
    }
}

impl Store for CsvStore {
    fn ping(&self) -> Result<(), StoreError> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(StoreError::Unreachable(format!("data directory [{}] not found", self.root.display())))
        }
    }

    fn namespace_exists(&self, namespace: Layer) -> Result<bool, StoreError> {
        self.ping()?;
        Ok(self.root.join(namespace.as_str()).is_dir())
    }

    fn table_exists(&self, namespace: Layer, table: &str) -> Result<bool, StoreError> {
        self.ping()?;
        Ok(self.table_path(namespace, table).is_file())
    }

    fn load_customers(&self) -> Result<Vec<CustomerRecord>, StoreError> {
        self.read_table(Layer::Bronze, CUSTOMER_TABLE, false)
    }

    fn load_raw_transactions(&self) -> Result<Vec<RawTransaction>, StoreError> {
        let mut transactions: Vec<RawTransaction> = self.read_table(Layer::Bronze, RAW_TRANSACTION_TABLE, false)?;
        transactions.sort_by_key(|transaction| transaction.timestamp());
        Ok(transactions)
    }

    fn load_criteria(&self) -> Result<Vec<AnomalyCriterion>, StoreError> {
        self.read_table(Layer::Silver, CRITERIA_TABLE, false)
    }

    fn existing_transaction_codes(&self) -> Result<HashSet<String>, StoreError> {
        let rows: Vec<CodeColumn> = self.read_table(Layer::Silver, SILVER_TABLE, true)?;
        Ok(rows.into_iter().map(|row| row.code_transaction).collect())
    }

    fn append_silver(&self, rows: &[SilverTransaction]) -> Result<usize, StoreError> {
        self.append_table(Layer::Silver, SILVER_TABLE, rows)
    }

    fn load_silver(&self) -> Result<Vec<SilverTransaction>, StoreError> {
        self.read_table(Layer::Silver, SILVER_TABLE, true)
    }

    fn existing_detail_ids(&self, table: DetailTable) -> Result<HashSet<Uuid>, StoreError> {
        let rows: Vec<IdColumn> = self.read_table(Layer::Gold, table.table_name(), true)?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    fn append_gold_details(&self, table: DetailTable, rows: &[GoldDetail]) -> Result<usize, StoreError> {
        self.append_table(Layer::Gold, table.table_name(), rows)
    }

    fn existing_summary_keys(&self) -> Result<HashSet<(NaiveDate, AnomalyType)>, StoreError> {
        let rows: Vec<SummaryKeyColumns> = self.read_table(Layer::Gold, SUMMARY_TABLE, true)?;
        Ok(rows.into_iter().map(|row| (row.trx_date, row.anomaly_type)).collect())
    }

    fn append_gold_summaries(&self, rows: &[GoldSummary]) -> Result<usize, StoreError> {
        self.append_table(Layer::Gold, SUMMARY_TABLE, rows)
    }
}
