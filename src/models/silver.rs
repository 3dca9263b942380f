use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{AccountNumber, Amount, DebitCredit, TransactionStatus, NORMAL_CODE};

/// Canonical row of the silver `transactions` table.
///
/// `code_transaction` is derived from the raw transaction id and must be unique
/// in the store; it is what makes re-running the pipeline safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilverTransaction {
    pub id: Uuid,
    pub account_num: AccountNumber,
    pub amount: Amount,
    pub currency: String,
    pub trx_type: DebitCredit,
    pub account_to: AccountNumber,
    pub narrative: String,
    pub status_trx: TransactionStatus,
    pub trx_date: NaiveDate,
    pub trx_time: NaiveTime,
    pub criteria_anomali: String,
    pub description_anomali: String,
    pub code_transaction: String,
    pub created_by: String,
    pub created_date: NaiveDateTime,
    pub updated_by: String,
    pub updated_date: NaiveDateTime
}

impl SilverTransaction {
    pub fn is_anomalous(&self) -> bool {
        self.criteria_anomali != NORMAL_CODE
    }
}
