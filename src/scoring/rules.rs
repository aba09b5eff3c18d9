//! Deterministic rule layer

use crate::config::{ColumnAliases, ScoringConfig};
use crate::error::{PipelineError, Result};
use crate::types::transaction::{FieldValue, TransactionRecord};

pub const HIGH_VALUE_RULE: &str = "high_value_amount";

/// Points and names of the rules that fired
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleOutcome {
    pub contribution: f64,
    pub triggered: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RuleLayer {
    amount_aliases: Vec<String>,
    high_value_threshold: f64,
    high_value_penalty: f64,
}

impl RuleLayer {
    /// Rule layer over the configured threshold and amount aliases
    pub fn new(scoring: &ScoringConfig, columns: &ColumnAliases) -> Self {
        Self {
            amount_aliases: columns.amount.clone(),
            high_value_threshold: scoring.high_value_threshold,
            high_value_penalty: scoring.high_value_penalty,
        }
    }

    /// The transaction amount under any known alias.
    ///
    /// Absent, null, non-numeric and negative amounts are all rejected.
    pub fn amount(&self, record: &TransactionRecord) -> Result<f64> {
        let value = self
            .amount_aliases
            .iter()
            .find_map(|alias| record.get(alias))
            .ok_or_else(|| {
                PipelineError::invalid_input(
                    "amount",
                    format!("none of {:?} present", self.amount_aliases),
                )
            })?;

        match value {
            FieldValue::Missing => Err(PipelineError::invalid_input("amount", "value is null")),
            FieldValue::Bool(_) => Err(PipelineError::invalid_input("amount", "boolean is not an amount")),
            other => match other.as_f64() {
                Some(amount) if amount >= 0.0 => Ok(amount),
                Some(amount) => Err(PipelineError::invalid_input(
                    "amount",
                    format!("negative amount {}", amount),
                )),
                None => Err(PipelineError::invalid_input(
                    "amount",
                    format!("'{}' is not a number", other),
                )),
            },
        }
    }

    /// Apply the high-value rule to a validated amount
    pub fn evaluate(&self, amount: f64) -> RuleOutcome {
        let mut outcome = RuleOutcome::default();
        if amount > self.high_value_threshold {
            outcome.contribution += self.high_value_penalty;
            outcome.triggered.push(HIGH_VALUE_RULE.to_string());
        }
        outcome
    }
}
