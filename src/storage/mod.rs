mod csv_store;
mod errors;
#[cfg(test)]
mod memory_store;
mod writer;

use std::collections::HashSet;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{AnomalyCriterion, AnomalyType, CustomerRecord, DetailTable, GoldDetail, GoldSummary, RawTransaction, SilverTransaction};
use crate::types::Layer;

pub use csv_store::CsvStore;
pub use errors::StoreError;
#[cfg(test)]
pub use memory_store::MemoryStore;
pub use writer::IdempotentWriter;

pub const CUSTOMER_TABLE: &str = "data_nasabah_raw";
pub const RAW_TRANSACTION_TABLE: &str = "transactions_raw";
pub const CRITERIA_TABLE: &str = "criteria";
pub const SILVER_TABLE: &str = "transactions";
pub const SUMMARY_TABLE: &str = "transactions_summary";

/// Handle to the bronze/silver/gold store.
///
/// Implementations are constructed once by the caller and handed to the
/// orchestrator, so every run (and every test) decides which store it talks to.
/// All calls block until the store answers.
pub trait Store: Send + Sync + 'static {
    /// Checks the store can be reached at all.
    fn ping(&self) -> Result<(), StoreError>;
    fn namespace_exists(&self, namespace: Layer) -> Result<bool, StoreError>;
    fn table_exists(&self, namespace: Layer, table: &str) -> Result<bool, StoreError>;

    fn load_customers(&self) -> Result<Vec<CustomerRecord>, StoreError>;
    /// Raw transactions ordered by date and time.
    fn load_raw_transactions(&self) -> Result<Vec<RawTransaction>, StoreError>;
    fn load_criteria(&self) -> Result<Vec<AnomalyCriterion>, StoreError>;

    fn existing_transaction_codes(&self) -> Result<HashSet<String>, StoreError>;
    fn append_silver(&self, rows: &[SilverTransaction]) -> Result<usize, StoreError>;
    fn load_silver(&self) -> Result<Vec<SilverTransaction>, StoreError>;

    fn existing_detail_ids(&self, table: DetailTable) -> Result<HashSet<Uuid>, StoreError>;
    fn append_gold_details(&self, table: DetailTable, rows: &[GoldDetail]) -> Result<usize, StoreError>;
    fn existing_summary_keys(&self) -> Result<HashSet<(NaiveDate, AnomalyType)>, StoreError>;
    fn append_gold_summaries(&self, rows: &[GoldSummary]) -> Result<usize, StoreError>;
}
