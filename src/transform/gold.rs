use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{AnomalyType, DetailTable, GoldDetail, GoldSummary, SilverTransaction, AUDIT_USER};
use crate::types::{Amount, DebitCredit, TransactionStatus};

/// Reporting rows derived from the silver table.
#[derive(Debug, Default)]
pub struct GoldBatch {
    pub normal: Vec<GoldDetail>,
    pub abnormal: Vec<GoldDetail>,
    pub summaries: Vec<GoldSummary>
}

#[derive(Default)]
struct DailyTotals {
    success_count: u64,
    failed_count: u64,
    total_amount: Amount,
    total_count: u64,
    currency: Option<String>
}

/// Splits silver rows into normal and abnormal detail rows and builds the daily summary.
pub struct GoldAggregator {
    stamped_at: NaiveDateTime
}

impl GoldAggregator {
    pub fn new(stamped_at: NaiveDateTime) -> Self {
        Self { stamped_at }
    }

    pub fn aggregate(&self, rows: &[SilverTransaction]) -> GoldBatch {
        let mut batch = GoldBatch::default();
        let mut daily: BTreeMap<(NaiveDate, AnomalyType), DailyTotals> = BTreeMap::new();

        for row in rows {
            let table = if row.is_anomalous() { DetailTable::Abnormal } else { DetailTable::Normal };
            let failed = row.status_trx == TransactionStatus::Failed;

            let detail = self.detail(row, failed);

            match table {
                DetailTable::Normal => batch.normal.push(detail),
                DetailTable::Abnormal => batch.abnormal.push(detail)
            }

            let totals = daily.entry((row.trx_date, table.anomaly_type())).or_default();
            totals.total_count += 1;
            totals.total_amount = totals.total_amount.saturating_add(row.amount);

            if failed {
                totals.failed_count += 1;
            } else {
                totals.success_count += 1;
            }

            //NOTE: Batches are single-currency in practice, the first row decides the summary currency
            totals.currency.get_or_insert_with(|| row.currency.clone());
        }

        batch.summaries = daily.into_iter()
            .map(|((trx_date, anomaly_type), totals)| GoldSummary {
                trx_date,
                anomaly_type,
                anomaly_level: anomaly_type.level(),
                success_count: totals.success_count,
                failed_count: totals.failed_count,
                total_amount: totals.total_amount,
                total_count: totals.total_count,
                currency: totals.currency.unwrap_or_default(),
                created_by: AUDIT_USER.to_string(),
                created_date: self.stamped_at
            })
            .collect();

        batch
    }

    fn detail(&self, row: &SilverTransaction, failed: bool) -> GoldDetail {
        let (total_debit, total_credit) = match row.trx_type {
            DebitCredit::Debit => (row.amount, Amount::ZERO),
            DebitCredit::Credit => (Amount::ZERO, row.amount)
        };

        GoldDetail {
            id: row.id,
            account_num: row.account_num.clone(),
            trx_date: row.trx_date,
            total_trx: 1,
            total_amount: row.amount,
            total_debit,
            total_credit,
            failed_trx: u32::from(failed),
            anomaly_trx: u32::from(row.is_anomalous()),
            created_by: AUDIT_USER.to_string(),
            created_date: self.stamped_at,
            updated_by: AUDIT_USER.to_string(),
            updated_date: self.stamped_at
        }
    }
}
