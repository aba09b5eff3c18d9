//! Error types for the risk pipeline.
//!
//! Every failure a caller can act on has its own variant and a stable code
//! for log filtering. Binaries wrap these in `anyhow` with context.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors produced by loading, preprocessing, training and scoring.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// External data source could not be reached or returned garbage.
    #[error("data source '{source_name}' unavailable: {reason}")]
    DataSourceUnavailable { source_name: String, reason: String },

    /// A required column is absent or holds a value of the wrong shape.
    #[error("schema mismatch on column '{column}': {detail}")]
    SchemaMismatch { column: String, detail: String },

    /// None of the target aliases exist in the dataset.
    #[error("target column '{requested}' not found; available columns: {available:?}")]
    TargetColumnNotFound {
        requested: String,
        available: Vec<String>,
    },

    /// Persisted artifact pair is missing, corrupt or incompatible.
    #[error("artifact load failed for {path}: {reason}")]
    ArtifactLoadFailure { path: PathBuf, reason: String },

    /// Persisting the artifact pair failed.
    #[error("artifact write failed for {path}: {source}")]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Scoring input lacks a usable required field.
    #[error("invalid transaction input, field '{field}': {reason}")]
    InvalidTransactionInput { field: String, reason: String },

    /// A caller-supplied parameter is outside its valid range.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Nothing left to work with after filtering.
    #[error("empty dataset at stage '{stage}'")]
    EmptyDataset { stage: &'static str },
}

impl PipelineError {
    /// Build a schema mismatch error.
    #[must_use]
    pub fn schema_mismatch(column: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            column: column.into(),
            detail: detail.into(),
        }
    }

    /// Build an artifact load failure.
    #[must_use]
    pub fn artifact_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ArtifactLoadFailure {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Build a data source failure.
    #[must_use]
    pub fn source_unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataSourceUnavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Build an invalid input error.
    #[must_use]
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTransactionInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Build an invalid parameter error.
    #[must_use]
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Stable code for logs and tool output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DataSourceUnavailable { .. } => "DATA_SOURCE_UNAVAILABLE",
            Self::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            Self::TargetColumnNotFound { .. } => "TARGET_COLUMN_NOT_FOUND",
            Self::ArtifactLoadFailure { .. } => "ARTIFACT_LOAD_FAILURE",
            Self::ArtifactWrite { .. } => "ARTIFACT_WRITE_FAILURE",
            Self::InvalidTransactionInput { .. } => "INVALID_TRANSACTION_INPUT",
            Self::InvalidParameter { .. } => "INVALID_PARAMETER",
            Self::EmptyDataset { .. } => "EMPTY_DATASET",
        }
    }

    /// Whether retrying (or falling back to another source) can help.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DataSourceUnavailable { .. } | Self::ArtifactLoadFailure { .. }
        )
    }
}
