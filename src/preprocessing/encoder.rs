//! Category encoder with an explicit code for unseen values

use serde::{Deserialize, Serialize};

/// Code emitted for categories never seen during fit
pub const UNKNOWN_CODE: f64 = -1.0;

/// Maps observed categories to `0..n` in sorted order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    classes: Vec<String>,
    unknown_code: f64,
}

impl CategoryEncoder {
    /// Learn the sorted, de-duplicated category set
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut classes: Vec<String> = values.into_iter().map(Into::into).collect();
        classes.sort();
        classes.dedup();
        Self {
            classes,
            unknown_code: UNKNOWN_CODE,
        }
    }

    /// Code for `category`, or the unknown code
    pub fn encode(&self, category: &str) -> f64 {
        match self.classes.binary_search_by(|c| c.as_str().cmp(category)) {
            Ok(idx) => idx as f64,
            Err(_) => self.unknown_code,
        }
    }

    /// Observed categories, index = code
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Code emitted for unseen categories
    pub fn unknown_code(&self) -> f64 {
        self.unknown_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_codes() {
        let encoder = CategoryEncoder::fit(["TRANSFER", "PAYMENT", "CASH_OUT", "PAYMENT"]);
        assert_eq!(encoder.classes(), &["CASH_OUT", "PAYMENT", "TRANSFER"]);
        assert_eq!(encoder.encode("CASH_OUT"), 0.0);
        assert_eq!(encoder.encode("TRANSFER"), 2.0);
    }

    #[test]
    fn test_unseen_category() {
        let encoder = CategoryEncoder::fit(["A", "B"]);
        assert_eq!(encoder.encode("Z"), UNKNOWN_CODE);
        assert_eq!(encoder.encode("A"), 0.0);
        assert_eq!(encoder.unknown_code(), UNKNOWN_CODE);
    }
}
