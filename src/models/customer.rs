use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{AccountNumber, CustomerStatus};

/// Represents a single row of the bronze customer table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub name: String,
    pub account_number: AccountNumber,
    pub status: CustomerStatus
}

/// Read-only lookup of customers by account number.
#[derive(Debug, Default)]
pub struct CustomerDirectory {
    customers: HashMap<AccountNumber, CustomerRecord>
}

impl CustomerDirectory {
    /// Builds the directory. When the source contains the same account twice the last row wins.
    pub fn new(records: impl IntoIterator<Item = CustomerRecord>) -> Self {
        let customers = records.into_iter()
            .map(|record| (record.account_number.clone(), record))
            .collect();

        Self { customers }
    }

    pub fn resolve(&self, account_number: &str) -> Option<&CustomerRecord> {
        self.customers.get(account_number)
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }
}
