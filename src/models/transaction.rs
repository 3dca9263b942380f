use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::types::{AccountNumber, Amount, DebitCredit, TransactionId, TransactionStatus, NORMAL_CODE};

/// Represents a single row of the bronze `transactions_raw` table.
///
/// Rows are immutable once ingested and there is one row per transfer attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransaction {
    /// Opaque unique identifier assigned by the source system.
    pub id: TransactionId,
    /// Free-form transaction type, e.g. `Transfer`.
    pub trx_type: String,
    /// The sending account.
    pub account_number: AccountNumber,
    pub amount: Amount,
    pub debit_credit: DebitCredit,
    /// Beneficiary composite in the form `BANK - BENEFICIARY NAME`.
    pub subheader: String,
    /// The beneficiary account number.
    pub detail_information: AccountNumber,
    pub trx_date: NaiveDate,
    pub trx_time: NaiveTime,
    pub currency: String
}

impl RawTransaction {
    pub fn timestamp(&self) -> NaiveDateTime {
        self.trx_date.and_time(self.trx_time)
    }

    /// The bank portion of the subheader, or the whole subheader when it has no separator.
    pub fn destination_bank(&self) -> &str {
        self.subheader.split(" - ").next().unwrap_or_default().trim()
    }
}

/// A raw transaction with the status and anomaly classification attached by the silver transform.
#[derive(Debug, Clone)]
pub struct ClassifiedTransaction {
    pub raw: RawTransaction,
    pub status_trx: TransactionStatus,
    pub criteria_anomali: String,
    pub description_anomali: String
}

impl ClassifiedTransaction {
    pub fn is_anomalous(&self) -> bool {
        self.criteria_anomali != NORMAL_CODE
    }
}
