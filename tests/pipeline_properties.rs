//! Property tests over the fit/transform contract and the score bounds

use finsafe::config::{AppConfig, ColumnAliases, PreprocessingConfig};
use finsafe::data::{Canonicalizer, SyntheticGenerator};
use finsafe::models::{ArtifactPair, GbdtParams, GradientBoostedClassifier};
use finsafe::preprocessing::{stratified_split, Preprocessor, UNKNOWN_CODE};
use finsafe::types::{Dataset, RiskLevel, TransactionRecord};
use finsafe::{PipelineError, ScoringEngine};
use proptest::prelude::*;
use std::sync::OnceLock;

fn synthetic(rows: usize, seed: u64) -> Dataset {
    let raw = SyntheticGenerator::new(0.1, Some(seed))
        .unwrap()
        .generate_batch(rows);
    Canonicalizer::new(&ColumnAliases::default())
        .canonicalize_batch(&raw)
        .unwrap()
}

fn shared_pair() -> &'static ArtifactPair {
    static PAIR: OnceLock<ArtifactPair> = OnceLock::new();
    PAIR.get_or_init(|| {
        let (transformed, preprocessor) = Preprocessor::new(&PreprocessingConfig::default())
            .fit(&synthetic(400, 11), "is_fraud")
            .unwrap();
        let params = GbdtParams {
            n_trees: 15,
            ..GbdtParams::default()
        };
        let model =
            GradientBoostedClassifier::fit(&transformed.features, &transformed.target, params)
                .unwrap();
        ArtifactPair::new(model, preprocessor).unwrap()
    })
}

fn transaction_type() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("PAYMENT".to_string()),
        Just("TRANSFER".to_string()),
        Just("CASH_OUT".to_string()),
        "[A-Z_]{3,10}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_transform_length_matches_fit(
        amount in 0.0f64..1_000_000.0,
        kind in transaction_type(),
    ) {
        let pair = shared_pair();
        let row = TransactionRecord::new()
            .with("amount", amount)
            .with("transaction_type", kind.as_str());
        let vector = pair.preprocessor.transform(&row).unwrap();
        prop_assert_eq!(vector.len(), pair.preprocessor.feature_count());
        prop_assert!(vector.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn prop_unseen_categories_use_unknown_code(kind in "[a-z]{4,12}") {
        let pair = shared_pair();
        let row = TransactionRecord::new()
            .with("amount", 100.0)
            .with("transaction_type", kind.as_str());
        let vector = pair.preprocessor.transform(&row).unwrap();
        prop_assert_eq!(vector[1], UNKNOWN_CODE);
    }

    #[test]
    fn prop_score_is_bounded(
        amount in 0.0f64..10_000_000.0,
        kind in transaction_type(),
    ) {
        let engine = ScoringEngine::with_pair(&AppConfig::default(), shared_pair().clone());
        let row = TransactionRecord::new()
            .with("amount", amount)
            .with("type", kind.as_str());
        let score = engine.score(&row).unwrap();
        prop_assert!((0.0..=100.0).contains(&score.score));
        if amount > 100_000.0 {
            prop_assert!(score.score >= 50.0);
            prop_assert!(score.risk_level != RiskLevel::Low);
        }
    }

    #[test]
    fn prop_scoring_is_deterministic(amount in 0.0f64..500_000.0) {
        let engine = ScoringEngine::with_pair(&AppConfig::default(), shared_pair().clone());
        let row = TransactionRecord::new()
            .with("amount", amount)
            .with("transaction_type", "TRANSFER");
        let a = engine.score(&row).unwrap();
        let b = engine.score(&row).unwrap();
        prop_assert_eq!(a.score, b.score);
    }

    #[test]
    fn prop_negative_amount_rejected(amount in -1_000_000.0f64..-0.01) {
        let engine = ScoringEngine::unloaded(&AppConfig::default());
        let row = TransactionRecord::new().with("amount", amount);
        let rejected = matches!(
            engine.score(&row),
            Err(PipelineError::InvalidTransactionInput { .. })
        );
        prop_assert!(rejected);
    }

    #[test]
    fn prop_split_partitions_rows(rows in 20usize..300, fraction in 0.1f64..0.5, seed in any::<u64>()) {
        let dataset = synthetic(rows, seed);
        let (train, test) = stratified_split(&dataset, "is_fraud", fraction, seed).unwrap();
        prop_assert_eq!(train.len() + test.len(), dataset.len());
    }
}
