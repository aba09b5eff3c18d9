//! Training pipeline: target resolution, split, fit, evaluate, persist.

use crate::config::{AppConfig, PreprocessingConfig, TrainingConfig};
use crate::error::{PipelineError, Result};
use crate::metrics::ClassificationReport;
use crate::models::artifact::{ArtifactPair, ArtifactStore, Manifest};
use crate::models::gbdt::GradientBoostedClassifier;
use crate::preprocessing::{stratified_split, FittedPreprocessor, Preprocessor};
use crate::types::dataset::Dataset;
use crate::types::transaction::FieldValue;
use std::time::Instant;
use tracing::{info, warn};

/// Everything a training run produces
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: GradientBoostedClassifier,
    pub preprocessor: FittedPreprocessor,
    pub report: ClassificationReport,
    pub target_column: String,
    pub train_rows: usize,
    pub test_rows: usize,
}

pub struct TrainingPipeline {
    training: TrainingConfig,
    preprocessing: PreprocessingConfig,
    store: ArtifactStore,
}

impl TrainingPipeline {
    /// Pipeline over the configured hyper-parameters and artifact store
    pub fn new(config: &AppConfig) -> Self {
        Self {
            training: config.training.clone(),
            preprocessing: config.preprocessing.clone(),
            store: ArtifactStore::from_config(&config.artifacts),
        }
    }

    /// Store that `persist` commits to
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Target column to train on.
    ///
    /// An explicit override (argument, then `training.target_column`) must
    /// exist as named. Without one, the first present configured alias wins.
    pub fn resolve_target(&self, dataset: &Dataset, requested: Option<&str>) -> Result<String> {
        let not_found = |requested: String| PipelineError::TargetColumnNotFound {
            requested,
            available: dataset.columns().to_vec(),
        };

        if let Some(requested) = requested.or(self.training.target_column.as_deref()) {
            return if dataset.has_column(requested) {
                Ok(requested.to_string())
            } else {
                Err(not_found(requested.to_string()))
            };
        }
        self.training
            .target_aliases
            .iter()
            .find(|c| dataset.has_column(c))
            .cloned()
            .ok_or_else(|| not_found(self.training.target_aliases.join("|")))
    }

    /// Fit on a stratified training split and evaluate on the rest.
    pub fn train(
        &self,
        dataset: &Dataset,
        target: Option<&str>,
        test_fraction: f64,
    ) -> Result<TrainingOutcome> {
        let started = Instant::now();
        let target_column = self.resolve_target(dataset, target)?;
        let coerced = coerce_target(dataset, &target_column)?;
        let complete = self.complete_rows(&coerced);
        if complete.is_empty() {
            return Err(PipelineError::EmptyDataset { stage: "train" });
        }
        info!(
            target = %target_column,
            rows = complete.len(),
            dropped = dataset.len() - complete.len(),
            "Training data prepared"
        );

        let (train_set, test_set) =
            stratified_split(&complete, &target_column, test_fraction, self.training.split_seed)?;
        let (transformed, preprocessor) =
            Preprocessor::new(&self.preprocessing).fit(&train_set, &target_column)?;

        let params = self.training.gbdt_params();
        info!(
            rows = transformed.len(),
            features = transformed.feature_names.len(),
            n_trees = params.n_trees,
            max_depth = params.max_depth,
            learning_rate = params.learning_rate,
            "Fitting gradient-boosted classifier"
        );
        let model =
            GradientBoostedClassifier::fit(&transformed.features, &transformed.target, params)?;

        let held_out = preprocessor.transform_dataset(&test_set)?;
        if held_out.is_empty() {
            warn!("Held-out split is empty, metrics are undefined");
        }
        let predicted = held_out
            .features
            .iter()
            .map(|row| model.predict(row))
            .collect::<Result<Vec<_>>>()?;
        let report = ClassificationReport::from_predictions(&held_out.target, &predicted);

        info!(
            accuracy = report.accuracy,
            fraud_precision = report.fraud().map_or(0.0, |m| m.precision),
            fraud_recall = report.fraud().map_or(0.0, |m| m.recall),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Training complete"
        );

        Ok(TrainingOutcome {
            model,
            preprocessor,
            report,
            target_column,
            train_rows: train_set.len(),
            test_rows: test_set.len(),
        })
    }

    /// Commit the trained pair as the current artifacts
    pub fn persist(&self, outcome: &TrainingOutcome) -> Result<Manifest> {
        let pair = ArtifactPair::new(outcome.model.clone(), outcome.preprocessor.clone())?;
        self.store.save(&pair)
    }

    /// Rows complete in every column that will reach the preprocessor
    fn complete_rows(&self, dataset: &Dataset) -> Dataset {
        let checked: Vec<usize> = dataset
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| !self.preprocessing.leakage_columns.contains(c))
            .map(|(i, _)| i)
            .collect();
        let keep: Vec<usize> = dataset
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| checked.iter().all(|&i| !row[i].is_missing()))
            .map(|(i, _)| i)
            .collect();
        dataset.select_rows(&keep)
    }
}

/// Map the target column onto `{0, 1}`.
///
/// Booleans and `true/false/yes/no` text map directly. Other numbers are
/// thresholded at 0.5 after a warning; unparsable text becomes missing.
pub fn coerce_target(dataset: &Dataset, target_column: &str) -> Result<Dataset> {
    let values: Vec<Option<f64>> = dataset
        .column(target_column)
        .ok_or_else(|| PipelineError::TargetColumnNotFound {
            requested: target_column.to_string(),
            available: dataset.columns().to_vec(),
        })?
        .map(FieldValue::as_flag)
        .collect();

    let non_binary = values
        .iter()
        .flatten()
        .filter(|v| **v != 0.0 && **v != 1.0)
        .count();
    if non_binary > 0 {
        warn!(
            column = %target_column,
            non_binary,
            "Target is not binary, treating values >= 0.5 as fraud"
        );
    }
    let unparsable = values.iter().filter(|v| v.is_none()).count();
    if unparsable > 0 {
        warn!(column = %target_column, unparsable, "Dropping rows with unusable target");
    }

    let coerced = values
        .into_iter()
        .map(|v| match v {
            Some(v) if v >= 0.5 => FieldValue::Number(1.0),
            Some(_) => FieldValue::Number(0.0),
            None => FieldValue::Missing,
        })
        .collect();
    let mut out = dataset.clone();
    out.set_column(target_column, coerced)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnAliases;
    use crate::data::{Canonicalizer, SyntheticGenerator};
    use tempfile::TempDir;

    fn pipeline(dir: &std::path::Path) -> TrainingPipeline {
        let mut config = AppConfig::default();
        config.artifacts.dir = dir.to_path_buf();
        config.training.n_trees = 20;
        TrainingPipeline::new(&config)
    }

    fn synthetic(rows: usize) -> Dataset {
        let raw = SyntheticGenerator::new(0.05, Some(7))
            .unwrap()
            .generate_batch(rows);
        Canonicalizer::new(&ColumnAliases::default())
            .canonicalize_batch(&raw)
            .unwrap()
    }

    fn labelled(labels: Vec<FieldValue>) -> Dataset {
        let rows = labels
            .into_iter()
            .enumerate()
            .map(|(i, label)| vec![FieldValue::Number(i as f64), label])
            .collect();
        Dataset::from_rows(vec!["amount".into(), "Class".into()], rows).unwrap()
    }

    #[test]
    fn test_resolve_target_aliases() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(dir.path());
        let ds = labelled(vec![0.0.into()]);
        assert_eq!(p.resolve_target(&ds, None).unwrap(), "Class");
        assert_eq!(p.resolve_target(&ds, Some("amount")).unwrap(), "amount");
    }

    #[test]
    fn test_misspelled_override_is_not_found() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(dir.path());
        let ds = labelled(vec![0.0.into()]);
        match p.resolve_target(&ds, Some("fraud_lable")).unwrap_err() {
            PipelineError::TargetColumnNotFound { requested, available } => {
                assert_eq!(requested, "fraud_lable");
                assert_eq!(available, vec!["amount", "Class"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_configured_target_column_must_exist() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.artifacts.dir = dir.path().to_path_buf();
        config.training.target_column = Some("label".to_string());
        let p = TrainingPipeline::new(&config);
        let ds = labelled(vec![0.0.into()]);
        assert!(matches!(
            p.resolve_target(&ds, None),
            Err(PipelineError::TargetColumnNotFound { .. })
        ));
        assert_eq!(p.resolve_target(&ds, Some("Class")).unwrap(), "Class");
    }

    #[test]
    fn test_resolve_target_not_found() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(dir.path());
        let ds = Dataset::from_rows(vec!["amount".into()], vec![vec![1.0.into()]]).unwrap();
        match p.resolve_target(&ds, None).unwrap_err() {
            PipelineError::TargetColumnNotFound { available, .. } => {
                assert_eq!(available, vec!["amount"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_coerce_target() {
        let ds = labelled(vec![
            true.into(),
            "no".into(),
            "1".into(),
            0.7.into(),
            "maybe".into(),
        ]);
        let coerced = coerce_target(&ds, "Class").unwrap();
        let values: Vec<&FieldValue> = coerced.column("Class").unwrap().collect();
        assert_eq!(values[0], &FieldValue::Number(1.0));
        assert_eq!(values[1], &FieldValue::Number(0.0));
        assert_eq!(values[2], &FieldValue::Number(1.0));
        assert_eq!(values[3], &FieldValue::Number(1.0));
        assert!(values[4].is_missing());
    }

    #[test]
    fn test_train_on_synthetic() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(dir.path());
        let outcome = p.train(&synthetic(1000), None, 0.2).unwrap();

        assert_eq!(outcome.target_column, "is_fraud");
        assert_eq!(outcome.train_rows + outcome.test_rows, 1000);
        assert_eq!(outcome.report.support(), outcome.test_rows);
        assert!(outcome.report.fraud().is_some());
        assert_eq!(outcome.model.n_features(), outcome.preprocessor.feature_count());
        assert_eq!(
            outcome.preprocessor.feature_names(),
            vec!["amount", "transaction_type"]
        );
    }

    #[test]
    fn test_train_and_persist() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(dir.path());
        let outcome = p.train(&synthetic(300), None, 0.2).unwrap();
        let manifest = p.persist(&outcome).unwrap();

        let loaded = p.store().load().unwrap();
        assert_eq!(loaded.artifact_id, manifest.artifact_id);
        assert_eq!(loaded.preprocessor, outcome.preprocessor);
    }

    #[test]
    fn test_train_empty_dataset() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(dir.path());
        let ds = labelled(vec![FieldValue::Missing, "maybe".into()]);
        assert!(matches!(
            p.train(&ds, None, 0.2),
            Err(PipelineError::EmptyDataset { .. })
        ));
    }
}
