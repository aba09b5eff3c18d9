//! Tabular batch of transaction records sharing one column set

use crate::error::{PipelineError, Result};
use crate::types::transaction::{FieldValue, TransactionRecord};
use serde::Serialize;
use std::collections::BTreeMap;

/// Canonical column names used after the adapter reconciles source variants
pub mod canonical {
    pub const AMOUNT: &str = "amount";
    pub const TRANSACTION_TYPE: &str = "transaction_type";
    pub const IS_FRAUD: &str = "is_fraud";
    pub const MERCHANT_CATEGORY: &str = "merchant_category";
    pub const LOCATION: &str = "location";
}

/// Ordered rows over a fixed, ordered column set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<FieldValue>>,
}

impl Dataset {
    /// Empty dataset over the given columns
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build from row-major values; every row must match the column count.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<FieldValue>>) -> Result<Self> {
        let mut dataset = Self::new(columns);
        for row in rows {
            dataset.push_row(row)?;
        }
        Ok(dataset)
    }

    /// Append one row; its width must match the column count
    pub fn push_row(&mut self, row: Vec<FieldValue>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(PipelineError::schema_mismatch(
                "<row>",
                format!(
                    "row has {} values but dataset has {} columns",
                    row.len(),
                    self.columns.len()
                ),
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Row-major values
    pub fn rows(&self) -> &[Vec<FieldValue>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Values of one column, top to bottom
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &FieldValue> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Row `i` as a standalone record
    pub fn record(&self, i: usize) -> Option<TransactionRecord> {
        self.rows.get(i).map(|row| {
            self.columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect()
        })
    }

    /// Every row as a record, top to bottom
    pub fn records(&self) -> impl Iterator<Item = TransactionRecord> + '_ {
        (0..self.rows.len()).filter_map(move |i| self.record(i))
    }

    /// Replace every value of a column
    pub fn set_column(&mut self, name: &str, values: Vec<FieldValue>) -> Result<()> {
        let idx = self.column_index(name).ok_or_else(|| {
            PipelineError::schema_mismatch(name, "column not present in dataset")
        })?;
        if values.len() != self.rows.len() {
            return Err(PipelineError::schema_mismatch(
                name,
                format!("{} values for {} rows", values.len(), self.rows.len()),
            ));
        }
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
        Ok(())
    }

    /// Copy without the named columns (unknown names are ignored)
    pub fn without_columns(&self, names: &[String]) -> Dataset {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&i| !names.contains(&self.columns[i]))
            .collect();
        Dataset {
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    /// Copy keeping only rows with no missing value
    pub fn without_incomplete_rows(&self) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| row.iter().all(|v| !v.is_missing()))
                .cloned()
                .collect(),
        }
    }

    /// Copy keeping the given rows, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    /// Exploratory KPIs over the canonical columns
    pub fn summary(&self) -> DatasetSummary {
        let fraud_flags: Vec<bool> = self
            .column(canonical::IS_FRAUD)
            .map(|values| values.map(|v| v.as_flag().is_some_and(|f| f >= 0.5)).collect())
            .unwrap_or_default();
        let fraud_count = fraud_flags.iter().filter(|&&f| f).count();

        let total_volume = self
            .column(canonical::AMOUNT)
            .map(|values| values.filter_map(FieldValue::as_f64).sum::<f64>())
            .unwrap_or(0.0);

        let mut by_transaction_type = BTreeMap::new();
        if let Some(values) = self.column(canonical::TRANSACTION_TYPE) {
            for category in values.filter_map(FieldValue::as_category) {
                *by_transaction_type.entry(category).or_insert(0) += 1;
            }
        }

        let fraud_by_merchant_category = self.column(canonical::MERCHANT_CATEGORY).map(|values| {
            let mut counts = BTreeMap::new();
            for (category, is_fraud) in values.zip(fraud_flags.iter()) {
                if let Some(category) = category.as_category() {
                    let entry = counts.entry(category).or_insert(0);
                    if *is_fraud {
                        *entry += 1;
                    }
                }
            }
            counts
        });

        let total_transactions = self.len();
        DatasetSummary {
            total_transactions,
            fraud_count,
            fraud_rate_pct: if total_transactions > 0 {
                fraud_count as f64 / total_transactions as f64 * 100.0
            } else {
                0.0
            },
            total_volume,
            by_transaction_type,
            fraud_by_merchant_category,
        }
    }
}

/// Headline figures for dashboards and operator logs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub total_transactions: usize,
    pub fraud_count: usize,
    pub fraud_rate_pct: f64,
    pub total_volume: f64,
    pub by_transaction_type: BTreeMap<String, usize>,
    /// Only present when the source carries merchant categories
    pub fraud_by_merchant_category: Option<BTreeMap<String, usize>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_rows(
            vec![
                "amount".to_string(),
                "transaction_type".to_string(),
                "is_fraud".to_string(),
            ],
            vec![
                vec![100.0.into(), "PAYMENT".into(), 0.0.into()],
                vec![250.0.into(), "TRANSFER".into(), 1.0.into()],
                vec![FieldValue::Missing, "TRANSFER".into(), 0.0.into()],
                vec![50.0.into(), "PAYMENT".into(), false.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut ds = Dataset::new(vec!["a".to_string()]);
        assert!(ds.push_row(vec![1.0.into(), 2.0.into()]).is_err());
        assert!(ds.push_row(vec![1.0.into()]).is_ok());
    }

    #[test]
    fn test_without_incomplete_rows() {
        let ds = sample().without_incomplete_rows();
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn test_record_view() {
        let record = sample().record(1).unwrap();
        assert_eq!(record.get("transaction_type"), Some(&FieldValue::from("TRANSFER")));
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn test_summary() {
        let summary = sample().summary();
        assert_eq!(summary.total_transactions, 4);
        assert_eq!(summary.fraud_count, 1);
        assert!((summary.fraud_rate_pct - 25.0).abs() < 1e-9);
        assert!((summary.total_volume - 400.0).abs() < 1e-9);
        assert_eq!(summary.by_transaction_type.get("TRANSFER"), Some(&2));
        assert!(summary.fraud_by_merchant_category.is_none());
    }

    #[test]
    fn test_without_columns() {
        let ds = sample().without_columns(&["transaction_type".to_string(), "nope".to_string()]);
        assert_eq!(ds.columns(), &["amount".to_string(), "is_fraud".to_string()]);
        assert_eq!(ds.rows()[0].len(), 2);
    }
}
