//! Stratified train/test partitioning

use crate::error::{PipelineError, Result};
use crate::types::dataset::Dataset;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Split `dataset` into `(train, test)` keeping each target class's share.
///
/// Every class with at least two rows lands on both sides. The same seed
/// always yields the same partition.
pub fn stratified_split(
    dataset: &Dataset,
    target_column: &str,
    test_fraction: f64,
    seed: u64,
) -> Result<(Dataset, Dataset)> {
    let target_idx =
        dataset
            .column_index(target_column)
            .ok_or_else(|| PipelineError::TargetColumnNotFound {
                requested: target_column.to_string(),
                available: dataset.columns().to_vec(),
            })?;

    let mut by_class: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, row) in dataset.rows().iter().enumerate() {
        by_class
            .entry(row[target_idx].to_string())
            .or_default()
            .push(i);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(dataset.len());
    let mut test = Vec::new();
    for indices in by_class.values_mut() {
        indices.shuffle(&mut rng);
        let n = indices.len();
        let n_test = if n < 2 {
            0
        } else {
            ((n as f64 * test_fraction).round() as usize).clamp(1, n - 1)
        };
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok((dataset.select_rows(&train), dataset.select_rows(&test)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::transaction::FieldValue;

    fn imbalanced(n: usize, positives: usize) -> Dataset {
        let rows = (0..n)
            .map(|i| {
                let label = if i < positives { 1.0 } else { 0.0 };
                vec![FieldValue::Number(i as f64), FieldValue::Number(label)]
            })
            .collect();
        Dataset::from_rows(vec!["x".to_string(), "y".to_string()], rows).unwrap()
    }

    fn positives(ds: &Dataset) -> usize {
        ds.column("y")
            .unwrap()
            .filter(|v| **v == FieldValue::Number(1.0))
            .count()
    }

    #[test]
    fn test_split_sizes_and_strata() {
        let ds = imbalanced(1000, 50);
        let (train, test) = stratified_split(&ds, "y", 0.2, 42).unwrap();
        assert_eq!(train.len() + test.len(), 1000);
        assert_eq!(test.len(), 200);
        assert_eq!(positives(&test), 10);
        assert_eq!(positives(&train), 40);
    }

    #[test]
    fn test_rare_class_on_both_sides() {
        let ds = imbalanced(100, 2);
        let (train, test) = stratified_split(&ds, "y", 0.2, 1).unwrap();
        assert_eq!(positives(&train), 1);
        assert_eq!(positives(&test), 1);
    }

    #[test]
    fn test_split_is_deterministic() {
        let ds = imbalanced(300, 30);
        let a = stratified_split(&ds, "y", 0.25, 9).unwrap();
        let b = stratified_split(&ds, "y", 0.25, 9).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_target() {
        let ds = imbalanced(10, 1);
        assert!(stratified_split(&ds, "label", 0.2, 42).is_err());
    }
}
