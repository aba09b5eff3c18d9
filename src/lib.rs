//! FinSafe transaction risk pipeline.
//!
//! Loads transaction batches (synthetic or from a remote rows API), fits a
//! reusable preprocessing pipeline and a gradient-boosted classifier,
//! persists both as one versioned artifact pair, and scores single
//! transactions into a bounded 0-100 risk score.

pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod preprocessing;
pub mod scoring;
pub mod training;
pub mod types;

pub use config::AppConfig;
pub use data::{DataLoader, DataSource};
pub use error::{PipelineError, Result};
pub use metrics::{ClassificationReport, ScoringMetrics};
pub use models::{ArtifactPair, ArtifactStore, GradientBoostedClassifier};
pub use preprocessing::{FittedPreprocessor, Preprocessor};
pub use scoring::{EngineStatus, ScoringEngine};
pub use training::{TrainingOutcome, TrainingPipeline};
pub use types::{Dataset, FieldValue, RiskScore, TransactionRecord};
