use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{AccountNumber, Amount};

/// The two gold detail tables, split by anomaly classification.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum DetailTable {
    Normal,
    Abnormal
}

impl DetailTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            DetailTable::Normal => "transactions_normal",
            DetailTable::Abnormal => "transactions_abnormal"
        }
    }

    pub fn anomaly_type(&self) -> AnomalyType {
        match self {
            DetailTable::Normal => AnomalyType::Normal,
            DetailTable::Abnormal => AnomalyType::Abnormal
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum AnomalyType {
    Normal,
    Abnormal
}

impl AnomalyType {
    pub fn level(&self) -> AnomalyLevel {
        match self {
            AnomalyType::Normal => AnomalyLevel::Low,
            AnomalyType::Abnormal => AnomalyLevel::High
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum AnomalyLevel {
    Low,
    High
}

/// One row of `transactions_normal` or `transactions_abnormal`, keyed by the silver row id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldDetail {
    pub id: Uuid,
    pub account_num: AccountNumber,
    pub trx_date: NaiveDate,
    pub total_trx: u32,
    pub total_amount: Amount,
    pub total_debit: Amount,
    pub total_credit: Amount,
    pub failed_trx: u32,
    pub anomaly_trx: u32,
    pub created_by: String,
    pub created_date: NaiveDateTime,
    pub updated_by: String,
    pub updated_date: NaiveDateTime
}

/// One row of `transactions_summary`, keyed by (`trx_date`, `anomaly_type`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldSummary {
    pub trx_date: NaiveDate,
    pub anomaly_type: AnomalyType,
    pub anomaly_level: AnomalyLevel,
    pub success_count: u64,
    pub failed_count: u64,
    pub total_amount: Amount,
    pub total_count: u64,
    pub currency: String,
    pub created_by: String,
    pub created_date: NaiveDateTime
}
