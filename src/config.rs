//! Configuration management for the risk pipeline

use crate::models::gbdt::GbdtParams;
use crate::types::risk::RiskLevelThresholds;
use anyhow::{ensure, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/finsafe.toml";

/// Which data source the training entry point reads from
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Locally generated rows
    #[default]
    Synthetic,
    /// Remote paged rows API
    External,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub columns: ColumnAliases,
    pub preprocessing: PreprocessingConfig,
    pub training: TrainingConfig,
    pub artifacts: ArtifactConfig,
    pub scoring: ScoringConfig,
    pub logging: LoggingConfig,
}

/// Data loading configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Hard cap on rows materialized by any load
    pub max_rows: usize,
    /// Rows requested when the operator gives no limit
    pub default_limit: usize,
    /// Source used by the training entry point
    pub source: SourceKind,
    /// Positive rate of the synthetic generator
    pub fraud_rate: f64,
    /// Seed for the synthetic generator (entropy when unset)
    pub seed: Option<u64>,
    /// Retry with synthetic rows when the external source is down
    pub fallback_to_synthetic: bool,
    pub hub: HubConfig,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            max_rows: 50_000,
            default_limit: 10_000,
            source: SourceKind::Synthetic,
            fraud_rate: 0.05,
            seed: None,
            fallback_to_synthetic: false,
            hub: HubConfig::default(),
        }
    }
}

/// Remote rows API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Base URL of the rows server
    pub base_url: String,
    /// Dataset identifier
    pub dataset: String,
    /// Dataset config name
    pub config: String,
    /// Dataset split
    pub split: String,
    /// Rows per request (the server caps this at 100)
    pub page_size: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            base_url: "https://datasets-server.huggingface.co".to_string(),
            dataset: "electricsheepafrica/Nigerian-Financial-Transactions-and-Fraud-Detection-Dataset"
                .to_string(),
            config: "default".to_string(),
            split: "train".to_string(),
            page_size: 100,
            timeout_secs: 30,
        }
    }
}

/// Known column-name variants for each canonical column, in lookup order
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnAliases {
    pub amount: Vec<String>,
    pub transaction_type: Vec<String>,
    pub fraud_flag: Vec<String>,
    pub merchant_category: Vec<String>,
    pub location: Vec<String>,
}

impl Default for ColumnAliases {
    fn default() -> Self {
        Self {
            amount: vec!["amount".to_string(), "amount_ngn".to_string()],
            transaction_type: vec!["transaction_type".to_string(), "type".to_string()],
            fraud_flag: vec!["is_fraud".to_string(), "isFraud".to_string()],
            merchant_category: vec!["merchant_category".to_string()],
            location: vec!["location".to_string()],
        }
    }
}

/// Preprocessing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Columns that leak the label and are dropped before fitting
    pub leakage_columns: Vec<String>,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            leakage_columns: vec!["fraud_type".to_string()],
        }
    }
}

/// Training configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Operator override, tried before the aliases
    pub target_column: Option<String>,
    /// Target names tried in order
    pub target_aliases: Vec<String>,
    /// Held-out fraction
    pub test_fraction: f64,
    /// Seed for the stratified split
    pub split_seed: u64,
    /// Number of boosting rounds
    pub n_trees: usize,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Shrinkage applied to each tree
    pub learning_rate: f64,
    /// L2 regularization on leaf weights
    pub lambda: f64,
    /// Minimum hessian sum per child
    pub min_child_weight: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            target_column: None,
            target_aliases: vec![
                "isFraud".to_string(),
                "is_fraud".to_string(),
                "Class".to_string(),
                "fraud_status".to_string(),
            ],
            test_fraction: 0.2,
            split_seed: 42,
            n_trees: 100,
            max_depth: 5,
            learning_rate: 0.1,
            lambda: 1.0,
            min_child_weight: 1.0,
        }
    }
}

impl TrainingConfig {
    /// Booster hyper-parameters
    pub fn gbdt_params(&self) -> GbdtParams {
        GbdtParams {
            n_trees: self.n_trees,
            max_depth: self.max_depth,
            learning_rate: self.learning_rate,
            lambda: self.lambda,
            min_child_weight: self.min_child_weight,
        }
    }
}

/// Artifact persistence configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Directory holding the manifest and both blobs
    pub dir: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts"),
        }
    }
}

/// Scoring configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Amounts strictly above this trigger the high-value rule
    pub high_value_threshold: f64,
    /// Points added by the high-value rule
    pub high_value_penalty: f64,
    /// Points per unit of model fraud probability
    pub model_weight: f64,
    /// Risk level banding on the 0-100 scale
    pub risk_levels: RiskLevelThresholds,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            high_value_threshold: 100_000.0,
            high_value_penalty: 50.0,
            model_weight: 50.0,
            risk_levels: RiskLevelThresholds::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file plus `FINSAFE__*` overrides
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path plus `FINSAFE__*` overrides.
    ///
    /// The file is optional; every field has a default.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("FINSAFE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no component can work with
    pub fn validate(&self) -> Result<()> {
        ensure!(self.data.max_rows > 0, "data.max_rows must be positive");
        ensure!(
            (0.0..=1.0).contains(&self.data.fraud_rate),
            "data.fraud_rate must be within [0, 1], got {}",
            self.data.fraud_rate
        );
        ensure!(
            (1..=100).contains(&self.data.hub.page_size),
            "data.hub.page_size must be within 1..=100, got {}",
            self.data.hub.page_size
        );
        ensure!(
            self.training.test_fraction > 0.0 && self.training.test_fraction < 1.0,
            "training.test_fraction must be within (0, 1), got {}",
            self.training.test_fraction
        );
        ensure!(self.training.n_trees > 0, "training.n_trees must be positive");
        ensure!(self.training.max_depth > 0, "training.max_depth must be positive");
        ensure!(
            self.training.learning_rate > 0.0,
            "training.learning_rate must be positive"
        );
        ensure!(
            self.scoring.high_value_penalty >= 0.0 && self.scoring.model_weight >= 0.0,
            "scoring weights must be non-negative"
        );
        Ok(())
    }
}
