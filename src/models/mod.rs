mod criteria;
mod customer;
mod gold;
mod silver;
#[cfg(test)]
mod tests;
mod transaction;

pub use criteria::{AnomalyCriterion, CriteriaCatalog};
pub use customer::{CustomerDirectory, CustomerRecord};
pub use gold::{AnomalyType, DetailTable, GoldDetail, GoldSummary};
pub use silver::SilverTransaction;
pub use transaction::{ClassifiedTransaction, RawTransaction};

/// Author recorded in the audit columns of every row the pipeline writes.
pub const AUDIT_USER: &str = "SYSTEM";
