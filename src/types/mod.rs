//! Type definitions for the risk pipeline

pub mod dataset;
pub mod risk;
pub mod transaction;

pub use dataset::{canonical, Dataset, DatasetSummary};
pub use risk::{RiskLevel, RiskLevelThresholds, RiskScore, ScoringMode};
pub use transaction::{FieldValue, TransactionRecord};
