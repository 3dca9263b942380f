use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, warn};

use crate::models::{ClassifiedTransaction, CriteriaCatalog, CustomerDirectory, RawTransaction};
use crate::settings::AnomalyDetectionConfig;
use crate::transform::TransformError;
use crate::types::{TransactionStatus, NORMAL_CODE, REPEATED_TRANSFER_CODE, UNRESOLVED_ACCOUNT_CODE};

const UNRESOLVED_ACCOUNT_DESCRIPTION: &str = "Unresolved account reference";

enum Resolution {
    Resolved(TransactionStatus),
    Unresolved
}

/// Classifies a batch of raw transactions with a status and an anomaly code.
///
/// The transform works on a whole bronze snapshot at once because the
/// repeated-transfer rule compares transactions against each other. Output
/// order matches input order and the result is deterministic for a given input.
pub struct FraudTransform<'a> {
    customers: &'a CustomerDirectory,
    catalog: &'a CriteriaCatalog,
    settings: &'a AnomalyDetectionConfig
}

impl<'a> FraudTransform<'a> {
    pub fn new(customers: &'a CustomerDirectory, catalog: &'a CriteriaCatalog, settings: &'a AnomalyDetectionConfig) -> Self {
        Self {
            customers,
            catalog,
            settings
        }
    }

    /// Produces one classified transaction per input transaction.
    ///
    /// # Errors
    /// Returns `TransformError` if:
    /// - The catalog lacks the normal code, or the repeated-transfer code while that rule is enabled.
    /// - An account cannot be resolved and `strict_references` is set.
    pub fn classify(&self, transactions: Vec<RawTransaction>) -> Result<Vec<ClassifiedTransaction>, TransformError> {
        let normal_description = self.describe(NORMAL_CODE)?;
        let unresolved_description = self.catalog.description(UNRESOLVED_ACCOUNT_CODE)
            .unwrap_or(UNRESOLVED_ACCOUNT_DESCRIPTION)
            .to_string();

        let mut classified = Vec::with_capacity(transactions.len());

        for raw in transactions {
            let entry = match self.derive_status(&raw)? {
                Resolution::Resolved(status_trx) => ClassifiedTransaction {
                    raw,
                    status_trx,
                    criteria_anomali: NORMAL_CODE.to_string(),
                    description_anomali: normal_description.clone()
                },
                Resolution::Unresolved => ClassifiedTransaction {
                    raw,
                    status_trx: TransactionStatus::Failed,
                    criteria_anomali: UNRESOLVED_ACCOUNT_CODE.to_string(),
                    description_anomali: unresolved_description.clone()
                }
            };

            classified.push(entry);
        }

        if self.settings.enabled {
            self.flag_repeated_transfers(&mut classified)?;
        }

        let flagged = classified.iter().filter(|transaction| transaction.is_anomalous()).count();
        let failed = classified.iter().filter(|transaction| transaction.status_trx == TransactionStatus::Failed).count();
        info!("Classified {} transactions: {flagged} anomalous, {failed} failed", classified.len());

        Ok(classified)
    }

    fn describe(&self, code: &str) -> Result<String, TransformError> {
        self.catalog.description(code)
            .map(str::to_string)
            .ok_or_else(|| TransformError::criterion_not_found(code))
    }

    fn derive_status(&self, transaction: &RawTransaction) -> Result<Resolution, TransformError> {
        let Some(sender) = self.customers.resolve(&transaction.account_number) else {
            return self.unresolved(transaction, &transaction.account_number);
        };

        let sender_servable = sender.status.is_servable();

        //NOTE: Only beneficiaries at the home bank are in our customer directory, other banks are trusted to reject on their side
        if transaction.destination_bank().eq_ignore_ascii_case(&self.settings.home_bank) {
            let Some(beneficiary) = self.customers.resolve(&transaction.detail_information) else {
                return self.unresolved(transaction, &transaction.detail_information);
            };

            return Ok(Resolution::Resolved(status_from(sender_servable && beneficiary.status.is_servable())));
        }

        Ok(Resolution::Resolved(status_from(sender_servable)))
    }

    fn unresolved(&self, transaction: &RawTransaction, account_number: &str) -> Result<Resolution, TransformError> {
        if self.settings.strict_references {
            return Err(TransformError::reference_data_missing(transaction, account_number));
        }

        warn!("Transaction [{}] references unknown account [{account_number}], marking it failed", transaction.id);
        Ok(Resolution::Unresolved)
    }

    /// Flags adjacent transfers between the same pair of accounts that happen
    /// inside the time threshold with a strictly increasing amount.
    fn flag_repeated_transfers(&self, classified: &mut [ClassifiedTransaction]) -> Result<(), TransformError> {
        let description = self.describe(REPEATED_TRANSFER_CODE)?;
        let mut groups: HashMap<(&str, &str), Vec<usize>> = HashMap::new();

        for (index, transaction) in classified.iter().enumerate() {
            groups.entry((&transaction.raw.account_number, &transaction.raw.detail_information))
                .or_default()
                .push(index);
        }

        let mut flagged = BTreeSet::new();

        for indices in groups.values_mut() {
            indices.sort_by_key(|index| classified[*index].raw.timestamp());

            for pair in indices.windows(2) {
                let earlier = &classified[pair[0]].raw;
                let later = &classified[pair[1]].raw;
                let elapsed = (later.timestamp() - earlier.timestamp()).num_seconds();

                if elapsed < self.settings.time_threshold_seconds && later.amount > earlier.amount {
                    debug!("Transactions [{}] and [{}] repeat within {elapsed}s with increasing amount", earlier.id, later.id);
                    flagged.extend(pair.iter().copied());
                }
            }
        }

        for index in flagged {
            let transaction = &mut classified[index];

            //NOTE: A transaction already failed for an unknown account keeps that code
            if transaction.criteria_anomali == UNRESOLVED_ACCOUNT_CODE {
                continue;
            }

            transaction.criteria_anomali = REPEATED_TRANSFER_CODE.to_string();
            transaction.description_anomali = description.clone();

            if transaction.raw.amount.value() >= self.settings.amount_threshold {
                warn!(
                    "ALERT: anomalous transfer [{}] of {} {} from [{}] to [{}]",
                    transaction.raw.id,
                    transaction.raw.amount,
                    transaction.raw.currency,
                    transaction.raw.account_number,
                    transaction.raw.detail_information
                );
            }
        }

        Ok(())
    }
}

fn status_from(servable: bool) -> TransactionStatus {
    if servable { TransactionStatus::Success } else { TransactionStatus::Failed }
}
