//! Preprocessing: fit-time encoders/scaler and serving-time transform

pub mod encoder;
pub mod pipeline;
pub mod scaler;
pub mod split;

pub use encoder::{CategoryEncoder, UNKNOWN_CODE};
pub use pipeline::{FeatureColumn, FeatureKind, FittedPreprocessor, Preprocessor, TransformedDataset};
pub use scaler::{ColumnScale, StandardScaler};
pub use split::stratified_split;
