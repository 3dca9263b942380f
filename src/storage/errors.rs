use thiserror::Error;

use crate::types::Layer;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unreachable: {0}")]
    Unreachable(String),
    #[error("Namespace [{0}] does not exist")]
    NamespaceMissing(Layer),
    #[error("Table [{namespace}.{table}] does not exist")]
    TableMissing {
        namespace: Layer,
        table: String
    },
    #[error("Duplicate key [{key}] rejected by [{namespace}.{table}]")]
    DuplicateKey {
        namespace: Layer,
        table: String,
        key: String
    },
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Store CSV error: {0}")]
    Csv(#[from] csv::Error)
}

impl StoreError {
    pub fn table_missing(namespace: Layer, table: &str) -> Self {
        Self::TableMissing { namespace, table: table.to_string() }
    }

    pub fn duplicate_key(namespace: Layer, table: &str, key: impl ToString) -> Self {
        Self::DuplicateKey { namespace, table: table.to_string(), key: key.to_string() }
    }

    /// Whether retrying the same call could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unreachable(_) | StoreError::Io(_) => true,
            StoreError::Csv(error) => error.is_io_error(),
            _ => false
        }
    }
}
