//! Classifier and artifact persistence

pub mod artifact;
pub mod gbdt;

pub use artifact::{ArtifactPair, ArtifactStore, Manifest, FORMAT_VERSION};
pub use gbdt::{GbdtParams, GradientBoostedClassifier};
