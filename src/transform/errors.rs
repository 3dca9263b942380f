use thiserror::Error;

use crate::models::RawTransaction;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Reference data missing: account [{account_number}] of transaction [{transaction_id}] is not in the customer directory")]
    ReferenceDataMissing {
        transaction_id: String,
        account_number: String
    },
    #[error("Anomaly criterion [{code}] is missing from the criteria catalog")]
    CriterionNotFound {
        code: String
    }
}

impl TransformError {
    pub fn reference_data_missing(transaction: &RawTransaction, account_number: &str) -> Self {
        Self::ReferenceDataMissing {
            transaction_id: transaction.id.clone(),
            account_number: account_number.to_string()
        }
    }

    pub fn criterion_not_found(code: &str) -> Self {
        Self::CriterionNotFound { code: code.to_string() }
    }
}
