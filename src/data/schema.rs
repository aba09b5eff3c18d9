//! Canonicalization of source-specific column names.
//!
//! Sources disagree on column names (`isFraud` vs `is_fraud`, `amount` vs
//! `amount_ngn`, `type` vs `transaction_type`). Everything downstream of the
//! adapter sees only the canonical names from [`canonical`].

use crate::config::ColumnAliases;
use crate::error::{PipelineError, Result};
use crate::types::dataset::{canonical, Dataset};
use crate::types::transaction::{FieldValue, TransactionRecord};
use tracing::{debug, warn};

/// One canonical column and the source names that may carry it
#[derive(Debug, Clone)]
struct CanonicalColumn {
    name: &'static str,
    aliases: Vec<String>,
    required: bool,
}

/// Which source column feeds each canonical column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMapping {
    /// `(canonical name, source name)` in canonical order
    pub pairs: Vec<(&'static str, String)>,
}

impl ColumnMapping {
    /// Canonical names in output order
    pub fn canonical_columns(&self) -> Vec<String> {
        self.pairs.iter().map(|(c, _)| c.to_string()).collect()
    }
}

/// Maps known column-name variants onto the canonical schema
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    columns: Vec<CanonicalColumn>,
}

impl Canonicalizer {
    /// Canonical columns with their configured aliases
    pub fn new(aliases: &ColumnAliases) -> Self {
        let column = |name, aliases: &Vec<String>, required| CanonicalColumn {
            name,
            aliases: aliases.clone(),
            required,
        };
        Self {
            columns: vec![
                column(canonical::AMOUNT, &aliases.amount, true),
                column(canonical::TRANSACTION_TYPE, &aliases.transaction_type, true),
                column(canonical::IS_FRAUD, &aliases.fraud_flag, true),
                column(canonical::MERCHANT_CATEGORY, &aliases.merchant_category, false),
                column(canonical::LOCATION, &aliases.location, false),
            ],
        }
    }

    /// Pick the source column for every canonical column.
    ///
    /// Fails on the first required canonical column with no alias present.
    pub fn resolve(&self, available: &[String]) -> Result<ColumnMapping> {
        let mut pairs = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            match column.aliases.iter().find(|a| available.contains(a)) {
                Some(source) => pairs.push((column.name, source.clone())),
                None if column.required => {
                    return Err(PipelineError::schema_mismatch(
                        column.name,
                        format!(
                            "required column missing; tried aliases {:?}, available columns {:?}",
                            column.aliases, available
                        ),
                    ));
                }
                None => {}
            }
        }
        Ok(ColumnMapping { pairs })
    }

    /// Canonicalize a batch of raw records sharing one source schema.
    pub fn canonicalize_batch(&self, records: &[TransactionRecord]) -> Result<Dataset> {
        if records.is_empty() {
            return Err(PipelineError::EmptyDataset {
                stage: "canonicalize",
            });
        }

        let mut available: Vec<String> = Vec::new();
        for record in records {
            for column in record.columns() {
                if !available.iter().any(|c| c == column) {
                    available.push(column.to_string());
                }
            }
        }

        let mapping = self.resolve(&available)?;
        let dropped: Vec<&String> = available
            .iter()
            .filter(|c| !mapping.pairs.iter().any(|(_, source)| source == *c))
            .collect();
        debug!(
            mapping = ?mapping.pairs,
            dropped = ?dropped,
            "Resolved canonical schema"
        );

        let mut dataset = Dataset::new(mapping.canonical_columns());
        let mut unusable_flags = 0usize;
        for record in records {
            let row = mapping
                .pairs
                .iter()
                .map(|(name, source)| {
                    let raw = record.get(source).cloned().unwrap_or(FieldValue::Missing);
                    let present = !raw.is_missing();
                    let value = normalize(name, raw);
                    if *name == canonical::IS_FRAUD && present && value.is_missing() {
                        unusable_flags += 1;
                    }
                    value
                })
                .collect();
            dataset.push_row(row)?;
        }
        if unusable_flags > 0 {
            warn!(
                column = canonical::IS_FRAUD,
                unusable_flags,
                "Fraud flag values not interpretable as 0/1, treating as missing"
            );
        }
        Ok(dataset)
    }

    /// Canonicalize a single scoring record.
    ///
    /// Nothing is required here: aliases present are renamed, the rest of the
    /// record is dropped. Callers decide which missing fields are fatal.
    pub fn canonicalize_record(&self, record: &TransactionRecord) -> TransactionRecord {
        let mut out = TransactionRecord::new();
        for column in &self.columns {
            if let Some(value) = column.aliases.iter().find_map(|a| record.get(a)) {
                out.insert(column.name, normalize(column.name, value.clone()));
            }
        }
        out
    }
}

/// Coerce a raw value into the canonical column's type
fn normalize(column: &str, value: FieldValue) -> FieldValue {
    match column {
        canonical::AMOUNT => match value.as_f64() {
            Some(v) if v >= 0.0 => FieldValue::Number(v),
            _ => FieldValue::Missing,
        },
        canonical::IS_FRAUD => match value.as_flag() {
            Some(v) if v >= 0.5 => FieldValue::Number(1.0),
            Some(_) => FieldValue::Number(0.0),
            None => FieldValue::Missing,
        },
        _ => value
            .as_category()
            .map(FieldValue::Text)
            .unwrap_or(FieldValue::Missing),
    }
}
