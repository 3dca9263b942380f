use std::collections::HashSet;
use std::hash::Hash;

use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{AnomalyType, DetailTable, GoldDetail, GoldSummary, SilverTransaction};
use crate::storage::{Store, StoreError};

/// A row with a natural key that must not be persisted twice.
pub trait Keyed {
    type Key: Eq + Hash;

    fn key(&self) -> Self::Key;
}

impl Keyed for SilverTransaction {
    type Key = String;

    fn key(&self) -> String {
        self.code_transaction.clone()
    }
}

impl Keyed for GoldDetail {
    type Key = Uuid;

    fn key(&self) -> Uuid {
        self.id
    }
}

impl Keyed for GoldSummary {
    type Key = (NaiveDate, AnomalyType);

    fn key(&self) -> Self::Key {
        (self.trx_date, self.anomaly_type)
    }
}

/// Appends rows whose key is not already persisted.
///
/// The existing-key lookup and the append are separate store calls, so two
/// writers racing on the same new key can both insert; the store's own
/// uniqueness constraint, where it has one, is the final guard.
pub struct IdempotentWriter<'a, S: Store> {
    store: &'a S,
    batch_size: usize
}

impl<'a, S: Store> IdempotentWriter<'a, S> {
    pub fn new(store: &'a S, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1)
        }
    }

    /// Inserts the silver rows whose `code_transaction` is new and returns them.
    pub fn write_silver(&self, rows: Vec<SilverTransaction>) -> Result<Vec<SilverTransaction>, StoreError> {
        self.write(
            "silver.transactions",
            rows,
            self.store.existing_transaction_codes(),
            |chunk| self.store.append_silver(chunk)
        )
    }

    pub fn write_gold_details(&self, table: DetailTable, rows: Vec<GoldDetail>) -> Result<Vec<GoldDetail>, StoreError> {
        self.write(
            table.table_name(),
            rows,
            self.store.existing_detail_ids(table),
            |chunk| self.store.append_gold_details(table, chunk)
        )
    }

    pub fn write_gold_summaries(&self, rows: Vec<GoldSummary>) -> Result<Vec<GoldSummary>, StoreError> {
        self.write(
            "transactions_summary",
            rows,
            self.store.existing_summary_keys(),
            |chunk| self.store.append_gold_summaries(chunk)
        )
    }

    fn write<T, F>(&self, table: &str, candidates: Vec<T>, existing: Result<HashSet<T::Key>, StoreError>, append: F) -> Result<Vec<T>, StoreError>
    where
        T: Keyed,
        F: Fn(&[T]) -> Result<usize, StoreError>,
    {
        let mut seen = match existing {
            Ok(keys) => keys,
            Err(error) => {
                //NOTE: Fails open. A store unique constraint, where present, still rejects true duplicates
                warn!("Existing-key lookup for [{table}] failed, writing without the duplicate filter: {error}");
                HashSet::new()
            }
        };

        let total = candidates.len();
        let fresh: Vec<T> = candidates.into_iter()
            .filter(|row| seen.insert(row.key()))
            .collect();

        if fresh.is_empty() {
            info!("No new rows for [{table}], all {total} candidates already exist");
            return Ok(fresh);
        }

        let mut inserted = 0;

        for chunk in fresh.chunks(self.batch_size) {
            inserted += append(chunk)?;
        }

        info!("Inserted {inserted} rows into [{table}], skipped {} existing", total - fresh.len());
        Ok(fresh)
    }
}
