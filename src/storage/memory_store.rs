use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use chrono::NaiveDate;
use dashmap::{DashMap, DashSet};
use uuid::Uuid;

use crate::models::{AnomalyCriterion, AnomalyType, CustomerRecord, DetailTable, GoldDetail, GoldSummary, RawTransaction, SilverTransaction};
use crate::storage::writer::Keyed;
use crate::storage::{Store, StoreError, CRITERIA_TABLE, CUSTOMER_TABLE, RAW_TRANSACTION_TABLE, SILVER_TABLE, SUMMARY_TABLE};
use crate::types::Layer;

/// In-memory store used as a test fake.
///
/// Unlike `CsvStore` it enforces uniqueness of the silver `code_transaction`
/// and gold keys the way a relational unique constraint would, and it can be
/// told to fail so error paths can be exercised.
pub struct MemoryStore {
    namespaces: DashSet<Layer>,
    tables: DashSet<(Layer, String)>,
    customers: DashMap<String, CustomerRecord>,
    raw_transactions: DashMap<String, RawTransaction>,
    criteria: DashMap<String, AnomalyCriterion>,
    silver: DashMap<String, SilverTransaction>,
    details: DashMap<(DetailTable, Uuid), GoldDetail>,
    summaries: DashMap<(NaiveDate, AnomalyType), GoldSummary>,
    unreachable_for: AtomicU32,
    fail_key_lookups: AtomicBool,
    append_calls: AtomicUsize
}

impl MemoryStore {
    /// Creates a store with every namespace present and no tables.
    pub fn new() -> Self {
        let namespaces = DashSet::new();

        for layer in Layer::ALL {
            namespaces.insert(layer);
        }

        Self {
            namespaces,
            tables: DashSet::new(),
            customers: DashMap::new(),
            raw_transactions: DashMap::new(),
            criteria: DashMap::new(),
            silver: DashMap::new(),
            details: DashMap::new(),
            summaries: DashMap::new(),
            unreachable_for: AtomicU32::new(0),
            fail_key_lookups: AtomicBool::new(false),
            append_calls: AtomicUsize::new(0)
        }
    }

    /// Creates a store holding the bronze inputs and criteria catalog.
    pub fn seeded(customers: Vec<CustomerRecord>, transactions: Vec<RawTransaction>, criteria: Vec<AnomalyCriterion>) -> Self {
        let store = Self::new();

        for customer in customers {
            store.customers.insert(customer.account_number.clone(), customer);
        }

        for transaction in transactions {
            store.raw_transactions.insert(transaction.id.clone(), transaction);
        }

        for criterion in criteria {
            store.criteria.insert(criterion.code.clone(), criterion);
        }

        store.tables.insert((Layer::Bronze, CUSTOMER_TABLE.to_string()));
        store.tables.insert((Layer::Bronze, RAW_TRANSACTION_TABLE.to_string()));
        store.tables.insert((Layer::Silver, CRITERIA_TABLE.to_string()));
        store
    }

    pub fn drop_namespace(&self, namespace: Layer) {
        self.namespaces.remove(&namespace);
    }

    pub fn drop_table(&self, namespace: Layer, table: &str) {
        self.tables.remove(&(namespace, table.to_string()));
    }

    /// Makes the next `calls` store calls fail as unreachable.
    pub fn fail_next(&self, calls: u32) {
        self.unreachable_for.store(calls, Ordering::SeqCst);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable_for.store(if unreachable { u32::MAX } else { 0 }, Ordering::SeqCst);
    }

    pub fn set_key_lookups_failing(&self, failing: bool) {
        self.fail_key_lookups.store(failing, Ordering::SeqCst);
    }

    pub fn insert_silver(&self, row: SilverTransaction) {
        self.silver.insert(row.code_transaction.clone(), row);
    }

    pub fn silver_rows(&self) -> Vec<SilverTransaction> {
        self.silver.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn detail_count(&self, table: DetailTable) -> usize {
        self.details.iter().filter(|entry| entry.key().0 == table).count()
    }

    pub fn summary_rows(&self) -> Vec<GoldSummary> {
        self.summaries.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn append_calls(&self) -> usize {
        self.append_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StoreError> {
        let remaining = self.unreachable_for.load(Ordering::SeqCst);

        if remaining == 0 {
            return Ok(());
        }

        if remaining != u32::MAX {
            self.unreachable_for.store(remaining - 1, Ordering::SeqCst);
        }

        Err(StoreError::Unreachable("memory store offline".to_string()))
    }

    fn check_key_lookup(&self) -> Result<(), StoreError> {
        self.check()?;

        if self.fail_key_lookups.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable("key lookup timed out".to_string()));
        }

        Ok(())
    }

    fn require_table(&self, namespace: Layer, table: &str) -> Result<(), StoreError> {
        if self.tables.contains(&(namespace, table.to_string())) {
            Ok(())
        } else {
            Err(StoreError::table_missing(namespace, table))
        }
    }

    fn begin_append(&self, namespace: Layer, table: &str) -> Result<(), StoreError> {
        self.check()?;

        if !self.namespaces.contains(&namespace) {
            return Err(StoreError::NamespaceMissing(namespace));
        }

        self.append_calls.fetch_add(1, Ordering::SeqCst);
        self.tables.insert((namespace, table.to_string()));
        Ok(())
    }
}

impl Store for MemoryStore {
    fn ping(&self) -> Result<(), StoreError> {
        self.check()
    }

    fn namespace_exists(&self, namespace: Layer) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.namespaces.contains(&namespace))
    }

    fn table_exists(&self, namespace: Layer, table: &str) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.tables.contains(&(namespace, table.to_string())))
    }

    fn load_customers(&self) -> Result<Vec<CustomerRecord>, StoreError> {
        self.check()?;
        self.require_table(Layer::Bronze, CUSTOMER_TABLE)?;
        Ok(self.customers.iter().map(|entry| entry.value().clone()).collect())
    }

    fn load_raw_transactions(&self) -> Result<Vec<RawTransaction>, StoreError> {
        self.check()?;
        self.require_table(Layer::Bronze, RAW_TRANSACTION_TABLE)?;

        let mut transactions: Vec<RawTransaction> = self.raw_transactions.iter().map(|entry| entry.value().clone()).collect();
        transactions.sort_by(|left, right| left.timestamp().cmp(&right.timestamp()).then_with(|| left.id.cmp(&right.id)));
        Ok(transactions)
    }

    fn load_criteria(&self) -> Result<Vec<AnomalyCriterion>, StoreError> {
        self.check()?;
        self.require_table(Layer::Silver, CRITERIA_TABLE)?;
        Ok(self.criteria.iter().map(|entry| entry.value().clone()).collect())
    }

    fn existing_transaction_codes(&self) -> Result<HashSet<String>, StoreError> {
        self.check_key_lookup()?;
        Ok(self.silver.iter().map(|entry| entry.key().clone()).collect())
    }

    fn append_silver(&self, rows: &[SilverTransaction]) -> Result<usize, StoreError> {
        self.begin_append(Layer::Silver, SILVER_TABLE)?;

        for row in rows {
            if self.silver.contains_key(&row.code_transaction) {
                return Err(StoreError::duplicate_key(Layer::Silver, SILVER_TABLE, &row.code_transaction));
            }

            self.silver.insert(row.code_transaction.clone(), row.clone());
        }

        Ok(rows.len())
    }

    fn load_silver(&self) -> Result<Vec<SilverTransaction>, StoreError> {
        self.check()?;
        Ok(self.silver_rows())
    }

    fn existing_detail_ids(&self, table: DetailTable) -> Result<HashSet<Uuid>, StoreError> {
        self.check_key_lookup()?;
        Ok(self.details.iter().filter(|entry| entry.key().0 == table).map(|entry| entry.key().1).collect())
    }

    fn append_gold_details(&self, table: DetailTable, rows: &[GoldDetail]) -> Result<usize, StoreError> {
        self.begin_append(Layer::Gold, table.table_name())?;

        for row in rows {
            if self.details.contains_key(&(table, row.id)) {
                return Err(StoreError::duplicate_key(Layer::Gold, table.table_name(), row.id));
            }

            self.details.insert((table, row.id), row.clone());
        }

        Ok(rows.len())
    }

    fn existing_summary_keys(&self) -> Result<HashSet<(NaiveDate, AnomalyType)>, StoreError> {
        self.check_key_lookup()?;
        Ok(self.summaries.iter().map(|entry| *entry.key()).collect())
    }

    fn append_gold_summaries(&self, rows: &[GoldSummary]) -> Result<usize, StoreError> {
        self.begin_append(Layer::Gold, SUMMARY_TABLE)?;

        for row in rows {
            if self.summaries.contains_key(&row.key()) {
                return Err(StoreError::duplicate_key(Layer::Gold, SUMMARY_TABLE, format!("{:?}", row.key())));
            }

            self.summaries.insert(row.key(), row.clone());
        }

        Ok(rows.len())
    }
}
