use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::models::{ClassifiedTransaction, SilverTransaction, AUDIT_USER};

/// Prefix of the idempotency key stored in `code_transaction`.
pub const CODE_PREFIX: &str = "TRX:";

/// Reshapes classified transactions into silver rows.
pub struct TransactionMapper {
    stamped_at: NaiveDateTime
}

impl TransactionMapper {
    /// Creates a mapper that stamps every row's audit columns with `stamped_at`.
    pub fn new(stamped_at: NaiveDateTime) -> Self {
        Self { stamped_at }
    }

    pub fn code_transaction(raw_id: &str) -> String {
        format!("{CODE_PREFIX}{raw_id}")
    }

    pub fn map(&self, transaction: ClassifiedTransaction) -> SilverTransaction {
        let ClassifiedTransaction { raw, status_trx, criteria_anomali, description_anomali } = transaction;

        SilverTransaction {
            id: Uuid::new_v4(),
            narrative: format!("{} to {}", raw.trx_type, raw.subheader),
            code_transaction: Self::code_transaction(&raw.id),
            account_num: raw.account_number,
            amount: raw.amount,
            currency: raw.currency,
            trx_type: raw.debit_credit,
            account_to: raw.detail_information,
            status_trx,
            trx_date: raw.trx_date,
            trx_time: raw.trx_time,
            criteria_anomali,
            description_anomali,
            created_by: AUDIT_USER.to_string(),
            created_date: self.stamped_at,
            updated_by: AUDIT_USER.to_string(),
            updated_date: self.stamped_at
        }
    }

    pub fn map_all(&self, transactions: Vec<ClassifiedTransaction>) -> Vec<SilverTransaction> {
        transactions.into_iter().map(|transaction| self.map(transaction)).collect()
    }
}
