use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Represents a single row of the silver `criteria` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyCriterion {
    /// Unique rule code, `0` meaning normal.
    pub code: String,
    pub description: String,
    /// Severity label, e.g. `Low` or `High`.
    pub level: String
}

/// Static lookup of anomaly codes to their descriptions.
#[derive(Debug, Default)]
pub struct CriteriaCatalog {
    criteria: HashMap<String, AnomalyCriterion>
}

impl CriteriaCatalog {
    pub fn new(criteria: impl IntoIterator<Item = AnomalyCriterion>) -> Self {
        let criteria = criteria.into_iter()
            .map(|criterion| (criterion.code.clone(), criterion))
            .collect();

        Self { criteria }
    }

    pub fn get(&self, code: &str) -> Option<&AnomalyCriterion> {
        self.criteria.get(code)
    }

    pub fn description(&self, code: &str) -> Option<&str> {
        self.get(code).map(|criterion| criterion.description.as_str())
    }
}
