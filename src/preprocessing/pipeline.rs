//! Fit / transform preprocessing.
//!
//! `Preprocessor::fit` learns encoders and the scaler from a batch;
//! `FittedPreprocessor::transform` reapplies them to one row without
//! re-deriving anything. Training and serving must go through the same
//! `FittedPreprocessor`, so the feature layout is recorded at fit time and
//! enforced at transform time.

use crate::config::PreprocessingConfig;
use crate::error::{PipelineError, Result};
use crate::preprocessing::encoder::CategoryEncoder;
use crate::preprocessing::scaler::StandardScaler;
use crate::types::dataset::Dataset;
use crate::types::transaction::{FieldValue, TransactionRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// How one feature column is turned into a number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureKind {
    /// Label-encoded category
    Categorical { encoder: CategoryEncoder },
    /// Standard-scaled number (booleans count as 0/1)
    Numeric { scaler_slot: usize },
}

/// A feature column recorded at fit time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    pub kind: FeatureKind,
}

/// Feature matrix produced by `fit` or `transform_dataset`
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedDataset {
    pub feature_names: Vec<String>,
    pub features: Vec<Vec<f64>>,
    pub target: Vec<f64>,
}

impl TransformedDataset {
    /// Number of transformed rows
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Unfitted preprocessing policy
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    leakage_columns: Vec<String>,
}

impl Preprocessor {
    /// Unfitted preprocessor with the configured leakage columns
    pub fn new(config: &PreprocessingConfig) -> Self {
        Self {
            leakage_columns: config.leakage_columns.clone(),
        }
    }

    /// Fit encoders and the scaler on `dataset`, returning the transformed batch
    /// and the reusable state.
    ///
    /// Rows with any missing value are dropped (no imputation). The target is
    /// carried through untouched and excluded from the features.
    pub fn fit(
        &self,
        dataset: &Dataset,
        target_column: &str,
    ) -> Result<(TransformedDataset, FittedPreprocessor)> {
        if !dataset.has_column(target_column) {
            return Err(PipelineError::TargetColumnNotFound {
                requested: target_column.to_string(),
                available: dataset.columns().to_vec(),
            });
        }

        let dropped: Vec<String> = self
            .leakage_columns
            .iter()
            .filter(|c| dataset.has_column(c) && c.as_str() != target_column)
            .cloned()
            .collect();
        let clean = dataset.without_columns(&dropped).without_incomplete_rows();
        debug!(
            dropped_columns = ?dropped,
            dropped_rows = dataset.len() - clean.len(),
            "Cleaned dataset before fit"
        );
        if clean.is_empty() {
            return Err(PipelineError::EmptyDataset { stage: "fit" });
        }

        let feature_names: Vec<String> = clean
            .columns()
            .iter()
            .filter(|c| c.as_str() != target_column)
            .cloned()
            .collect();
        if feature_names.is_empty() {
            return Err(PipelineError::schema_mismatch(
                "<features>",
                "no feature columns left after removing target and leakage columns",
            ));
        }

        let mut numeric_columns = Vec::new();
        let mut features = Vec::with_capacity(feature_names.len());
        for name in &feature_names {
            let values: Vec<&FieldValue> = clean.column(name).into_iter().flatten().collect();
            let is_numeric = values
                .iter()
                .all(|v| matches!(v, FieldValue::Number(_) | FieldValue::Bool(_)));

            let kind = if is_numeric {
                let slot = numeric_columns.len();
                let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
                numeric_columns.push((name.clone(), numbers));
                FeatureKind::Numeric { scaler_slot: slot }
            } else {
                let encoder = CategoryEncoder::fit(values.iter().filter_map(|v| v.as_category()));
                FeatureKind::Categorical { encoder }
            };
            features.push(FeatureColumn {
                name: name.clone(),
                kind,
            });
        }

        let fitted = FittedPreprocessor {
            target_column: target_column.to_string(),
            dropped_columns: dropped,
            features,
            scaler: StandardScaler::fit(numeric_columns),
        };
        let transformed = fitted.transform_dataset(&clean)?;

        info!(
            rows = transformed.len(),
            features = ?fitted.feature_names(),
            categorical = fitted.categorical_count(),
            "Preprocessor fitted"
        );
        Ok((transformed, fitted))
    }
}

/// Encoders and scaler learned by `fit`, reusable on unseen rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    target_column: String,
    dropped_columns: Vec<String>,
    features: Vec<FeatureColumn>,
    scaler: StandardScaler,
}

impl FittedPreprocessor {
    /// Column the pair was fitted against
    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Leakage columns removed at fit time
    pub fn dropped_columns(&self) -> &[String] {
        &self.dropped_columns
    }

    /// Fitted feature columns in vector order
    pub fn features(&self) -> &[FeatureColumn] {
        &self.features
    }

    /// Feature names in vector order
    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    /// Length of every transformed vector
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    fn categorical_count(&self) -> usize {
        self.features
            .iter()
            .filter(|f| matches!(f.kind, FeatureKind::Categorical { .. }))
            .count()
    }

    /// Turn one row into a feature vector in fit-time column order.
    ///
    /// Unseen categories map to the encoder's unknown code. A missing fitted
    /// column, or a value that cannot take the fitted type, is a
    /// `SchemaMismatch`. Columns the state was not fit on are ignored.
    pub fn transform(&self, row: &TransactionRecord) -> Result<Vec<f64>> {
        self.features
            .iter()
            .map(|feature| {
                let value = row
                    .get(&feature.name)
                    .filter(|v| !v.is_missing())
                    .ok_or_else(|| {
                        PipelineError::schema_mismatch(
                            &feature.name,
                            "column was present at fit time but is missing from the row",
                        )
                    })?;
                self.encode_value(feature, value)
            })
            .collect()
    }

    fn encode_value(&self, feature: &FeatureColumn, value: &FieldValue) -> Result<f64> {
        match &feature.kind {
            FeatureKind::Categorical { encoder } => {
                let category = value.as_category().ok_or_else(|| {
                    PipelineError::schema_mismatch(&feature.name, "no categorical value")
                })?;
                Ok(encoder.encode(&category))
            }
            FeatureKind::Numeric { scaler_slot } => {
                let number = value.as_f64().ok_or_else(|| {
                    PipelineError::schema_mismatch(
                        &feature.name,
                        format!("expected a number, got '{}'", value),
                    )
                })?;
                self.scaler.apply(*scaler_slot, number).ok_or_else(|| {
                    PipelineError::schema_mismatch(&feature.name, "scaler slot out of range")
                })
            }
        }
    }

    /// Transform every row of a dataset that carries the target column.
    pub fn transform_dataset(&self, dataset: &Dataset) -> Result<TransformedDataset> {
        let target_idx = dataset.column_index(&self.target_column).ok_or_else(|| {
            PipelineError::TargetColumnNotFound {
                requested: self.target_column.clone(),
                available: dataset.columns().to_vec(),
            }
        })?;

        let mut features = Vec::with_capacity(dataset.len());
        let mut target = Vec::with_capacity(dataset.len());
        for (i, record) in dataset.records().enumerate() {
            features.push(self.transform(&record)?);
            let label = dataset.rows()[i][target_idx].as_f64().ok_or_else(|| {
                PipelineError::schema_mismatch(
                    &self.target_column,
                    format!("non-numeric target value in row {}", i),
                )
            })?;
            target.push(label);
        }

        Ok(TransformedDataset {
            feature_names: self.features.iter().map(|f| f.name.clone()).collect(),
            features,
            target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::encoder::UNKNOWN_CODE;

    fn columns() -> Vec<String> {
        ["amount", "transaction_type", "is_fraud", "fraud_type", "is_night"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn dataset() -> Dataset {
        Dataset::from_rows(
            columns(),
            vec![
                vec![100.0.into(), "PAYMENT".into(), 0.0.into(), "none".into(), false.into()],
                vec![300.0.into(), "TRANSFER".into(), 1.0.into(), "sim_swap".into(), true.into()],
                vec![200.0.into(), "PAYMENT".into(), 0.0.into(), "none".into(), false.into()],
                vec![FieldValue::Missing, "CASH_OUT".into(), 0.0.into(), "none".into(), true.into()],
            ],
        )
        .unwrap()
    }

    fn fit() -> (TransformedDataset, FittedPreprocessor) {
        Preprocessor::new(&PreprocessingConfig::default())
            .fit(&dataset(), "is_fraud")
            .unwrap()
    }

    #[test]
    fn test_fit_drops_leakage_and_incomplete_rows() {
        let (transformed, fitted) = fit();
        assert_eq!(transformed.len(), 3);
        assert_eq!(fitted.dropped_columns(), &["fraud_type"]);
        assert_eq!(fitted.feature_names(), vec!["amount", "transaction_type", "is_night"]);
        assert_eq!(transformed.target, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_fit_scales_numeric_and_encodes_categorical() {
        let (transformed, fitted) = fit();
        // amount: mean 200, population std ~81.65
        let first = &transformed.features[0];
        assert!(first[0] < 0.0);
        assert!((transformed.features[2][0]).abs() < 1e-12);
        // CASH_OUT was only in the dropped row, so the fitted classes are PAYMENT, TRANSFER
        assert_eq!(first[1], 0.0);
        assert_eq!(transformed.features[1][1], 1.0);
        assert!(matches!(
            fitted.features()[2].kind,
            FeatureKind::Numeric { scaler_slot: 1 }
        ));
    }

    #[test]
    fn test_transform_matches_fit_output() {
        let (transformed, fitted) = fit();
        let row = dataset().record(1).unwrap();
        let vector = fitted.transform(&row).unwrap();
        assert_eq!(vector.len(), fitted.feature_count());
        assert_eq!(vector, transformed.features[1]);
    }

    #[test]
    fn test_transform_unseen_category() {
        let (_, fitted) = fit();
        let row = TransactionRecord::new()
            .with("amount", 50.0)
            .with("transaction_type", "CASH_OUT")
            .with("is_night", true);
        let vector = fitted.transform(&row).unwrap();
        assert_eq!(vector[1], UNKNOWN_CODE);
    }

    #[test]
    fn test_transform_missing_column_is_schema_mismatch() {
        let (_, fitted) = fit();
        let row = TransactionRecord::new()
            .with("amount", 50.0)
            .with("transaction_type", "PAYMENT");
        let err = fitted.transform(&row).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { ref column, .. } if column == "is_night"));
    }

    #[test]
    fn test_transform_rejects_non_numeric() {
        let (_, fitted) = fit();
        let row = TransactionRecord::new()
            .with("amount", "lots")
            .with("transaction_type", "PAYMENT")
            .with("is_night", false);
        assert!(fitted.transform(&row).is_err());
    }

    #[test]
    fn test_transform_ignores_extra_columns() {
        let (_, fitted) = fit();
        let row = TransactionRecord::new()
            .with("unrelated", "x")
            .with("amount", 50.0)
            .with("transaction_type", "PAYMENT")
            .with("is_night", false);
        assert_eq!(fitted.transform(&row).unwrap().len(), 3);
    }

    #[test]
    fn test_fit_unknown_target() {
        let err = Preprocessor::default().fit(&dataset(), "label").unwrap_err();
        match err {
            PipelineError::TargetColumnNotFound { requested, available } => {
                assert_eq!(requested, "label");
                assert!(available.contains(&"amount".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fitted_state_serde() {
        let (_, fitted) = fit();
        let json = serde_json::to_string(&fitted).unwrap();
        let restored: FittedPreprocessor = serde_json::from_str(&json).unwrap();
        assert_eq!(fitted, restored);
    }
}
