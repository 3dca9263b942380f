mod amount;
mod errors;

use std::fmt;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

pub use amount::Amount;

pub type AccountNumber = String;
pub type TransactionId = String;

/// Anomaly code for a transaction that matched no rule.
pub const NORMAL_CODE: &str = "0";
/// Anomaly code for rapid repeated transfers with an increasing amount.
pub const REPEATED_TRANSFER_CODE: &str = "1";
/// Anomaly code for a transaction that references an account missing from the customer directory.
pub const UNRESOLVED_ACCOUNT_CODE: &str = "99";

/// A stage of the pipeline, which doubles as the name of the store namespace it owns.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Bronze,
    Silver,
    Gold
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::Bronze, Layer::Silver, Layer::Gold];

    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Bronze => "bronze",
            Layer::Silver => "silver",
            Layer::Gold => "gold"
        }
    }
}

impl Display for Layer {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Account status as recorded in the customer directory.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CustomerStatus {
    Opened,
    Blocked,
    Closed,
    #[serde(other)]
    Unknown
}

impl CustomerStatus {
    /// Opened and blocked accounts can still send and receive transfers.
    pub fn is_servable(&self) -> bool {
        matches!(self, CustomerStatus::Opened | CustomerStatus::Blocked)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Success,
    Failed
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum DebitCredit {
    #[serde(rename = "D")]
    Debit,
    #[serde(rename = "C")]
    Credit
}
