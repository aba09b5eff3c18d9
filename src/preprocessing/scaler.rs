//! Standard scaler over the numeric feature columns

use serde::{Deserialize, Serialize};

/// Mean and scale of one numeric column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnScale {
    pub mean: f64,
    /// Population standard deviation; 1.0 for constant columns
    pub scale: f64,
}

impl ColumnScale {
    /// Population mean and standard deviation of `values`
    pub fn fit(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                mean: 0.0,
                scale: 1.0,
            };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        Self {
            mean,
            scale: if std > f64::EPSILON { std } else { 1.0 },
        }
    }

    /// Standardize one value
    pub fn apply(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }
}

/// One `ColumnScale` per numeric column, in feature order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    columns: Vec<String>,
    params: Vec<ColumnScale>,
}

impl StandardScaler {
    /// Fit from `(column, values)` pairs
    pub fn fit(columns: Vec<(String, Vec<f64>)>) -> Self {
        let (columns, params) = columns
            .into_iter()
            .map(|(name, values)| (name, ColumnScale::fit(&values)))
            .unzip();
        Self { columns, params }
    }

    /// Scale `value` with the parameters of slot `index`
    pub fn apply(&self, index: usize, value: f64) -> Option<f64> {
        self.params.get(index).map(|p| p.apply(value))
    }

    /// Slot of a fitted column
    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Number of scaled columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_scale() {
        let scale = ColumnScale::fit(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((scale.mean - 5.0).abs() < 1e-12);
        assert!((scale.scale - 2.0).abs() < 1e-12);
        assert!((scale.apply(9.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column() {
        let scale = ColumnScale::fit(&[3.0, 3.0, 3.0]);
        assert_eq!(scale.scale, 1.0);
        assert_eq!(scale.apply(3.0), 0.0);
    }

    #[test]
    fn test_scaler_slots() {
        let scaler = StandardScaler::fit(vec![
            ("amount".to_string(), vec![0.0, 10.0]),
            ("step".to_string(), vec![1.0, 1.0]),
        ]);
        assert_eq!(scaler.len(), 2);
        assert_eq!(scaler.index_of("step"), Some(1));
        assert_eq!(scaler.apply(0, 10.0), Some(1.0));
        assert_eq!(scaler.apply(5, 10.0), None);
    }
}
