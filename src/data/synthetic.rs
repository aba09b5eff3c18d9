//! Synthetic transaction generator.
//!
//! Emits rows in the mobile-money variant schema (`type`, `amount`,
//! `isFraud`, balances) so generated data exercises the same
//! canonicalization path as external rows.

use crate::error::{PipelineError, Result};
use crate::types::transaction::TransactionRecord;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TRANSACTION_TYPES: [&str; 5] = ["PAYMENT", "TRANSFER", "CASH_OUT", "DEBIT", "CASH_IN"];

/// Independent per-column sampler with a configurable positive rate
pub struct SyntheticGenerator {
    rng: StdRng,
    fraud_rate: f64,
    transaction_counter: u64,
}

impl SyntheticGenerator {
    /// Seeded generators are repeatable; unseeded ones draw from entropy.
    ///
    /// `fraud_rate` is a probability and must lie within `[0, 1]`.
    pub fn new(fraud_rate: f64, seed: Option<u64>) -> Result<Self> {
        if !(0.0..=1.0).contains(&fraud_rate) {
            return Err(PipelineError::invalid_parameter(
                "fraud_rate",
                format!("must be a probability within [0, 1], got {}", fraud_rate),
            ));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            rng,
            fraud_rate,
            transaction_counter: 0,
        })
    }

    /// Generate one raw row
    pub fn generate(&mut self) -> TransactionRecord {
        let i = self.transaction_counter;
        self.transaction_counter += 1;

        let transaction_type = self.random_choice(&TRANSACTION_TYPES);
        let is_fraud = if self.rng.gen_bool(self.fraud_rate) { 1.0 } else { 0.0 };

        TransactionRecord::new()
            .with("step", self.rng.gen_range(1..100) as f64)
            .with("type", transaction_type)
            .with("amount", self.rng.gen_range(10.0..100_000.0))
            .with("nameOrig", format!("C{}", i))
            .with("oldbalanceOrg", self.rng.gen_range(0.0..100_000.0))
            .with("newbalanceOrig", self.rng.gen_range(0.0..100_000.0))
            .with("nameDest", format!("M{}", i))
            .with("oldbalanceDest", self.rng.gen_range(0.0..100_000.0))
            .with("newbalanceDest", self.rng.gen_range(0.0..100_000.0))
            .with("isFraud", is_fraud)
            .with("isFlaggedFraud", 0.0)
    }

    /// Generate `rows` raw rows
    pub fn generate_batch(&mut self, rows: usize) -> Vec<TransactionRecord> {
        (0..rows).map(|_| self.generate()).collect()
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::transaction::FieldValue;

    #[test]
    fn test_seeded_generation_is_repeatable() {
        let a = SyntheticGenerator::new(0.05, Some(7))
            .unwrap()
            .generate_batch(20);
        let b = SyntheticGenerator::new(0.05, Some(7))
            .unwrap()
            .generate_batch(20);
        assert_eq!(a, b);
    }

    #[test]
    fn test_column_ranges() {
        let rows = SyntheticGenerator::new(0.5, Some(1))
            .unwrap()
            .generate_batch(200);
        for row in &rows {
            let amount = row.get("amount").and_then(FieldValue::as_f64).unwrap();
            assert!((10.0..100_000.0).contains(&amount));
            let flag = row.get("isFraud").and_then(FieldValue::as_f64).unwrap();
            assert!(flag == 0.0 || flag == 1.0);
            let kind = row.get("type").and_then(FieldValue::as_category).unwrap();
            assert!(TRANSACTION_TYPES.contains(&kind.as_str()));
        }
    }

    #[test]
    fn test_fraud_rate_is_respected() {
        let rows = SyntheticGenerator::new(0.05, Some(42))
            .unwrap()
            .generate_batch(4000);
        let positives = rows
            .iter()
            .filter(|r| r.get("isFraud") == Some(&FieldValue::Number(1.0)))
            .count();
        let rate = positives as f64 / rows.len() as f64;
        assert!(rate > 0.03 && rate < 0.07, "rate was {rate}");
    }

    #[test]
    fn test_invalid_rates_rejected() {
        for rate in [f64::NAN, 5.0, -0.1, f64::INFINITY] {
            let err = SyntheticGenerator::new(rate, Some(1)).err().unwrap();
            assert_eq!(err.code(), "INVALID_PARAMETER");
        }
    }

    #[test]
    fn test_extreme_rates() {
        let none = SyntheticGenerator::new(0.0, Some(3))
            .unwrap()
            .generate_batch(50);
        assert!(none
            .iter()
            .all(|r| r.get("isFraud") == Some(&FieldValue::Number(0.0))));
        let all = SyntheticGenerator::new(1.0, Some(3))
            .unwrap()
            .generate_batch(50);
        assert!(all
            .iter()
            .all(|r| r.get("isFraud") == Some(&FieldValue::Number(1.0))));
    }
}
