//! Serving-time risk scoring

pub mod engine;
pub mod rules;

pub use engine::{EngineStatus, ScoringEngine};
pub use rules::{RuleLayer, RuleOutcome};
