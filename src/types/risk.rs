//! Risk score data structures

use serde::{Deserialize, Serialize};

/// Upper bound of the risk scale
pub const MAX_SCORE: f64 = 100.0;

/// Risk level classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Determine risk level from a 0-100 score and thresholds
    pub fn from_score(score: f64, thresholds: &RiskLevelThresholds) -> Self {
        if score > thresholds.high {
            RiskLevel::High
        } else if score > thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Configurable risk level thresholds (strictly-above semantics)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLevelThresholds {
    pub medium: f64,
    pub high: f64,
}

impl Default for RiskLevelThresholds {
    fn default() -> Self {
        Self {
            medium: 40.0,
            high: 70.0,
        }
    }
}

/// Which layers produced a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Rule layer plus model probability
    RuleAndModel,
    /// Rule layer only: artifacts unavailable
    RuleOnly,
}

/// Bounded risk score for one transaction, with its breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScore {
    /// Final score, always within `[0, 100]`
    pub score: f64,

    /// Points contributed by deterministic rules
    pub rule_contribution: f64,

    /// Points contributed by the model, when it ran
    pub model_contribution: Option<f64>,

    /// Raw model fraud probability, when it ran
    pub fraud_probability: Option<f64>,

    pub mode: ScoringMode,

    pub risk_level: RiskLevel,

    /// Rules that fired
    pub triggered_rules: Vec<String>,
}

impl RiskScore {
    /// Combine layer contributions, clamping to the valid range
    pub fn new(
        rule_contribution: f64,
        fraud_probability: Option<f64>,
        model_weight: f64,
        thresholds: &RiskLevelThresholds,
    ) -> Self {
        let model_contribution = fraud_probability.map(|p| p.clamp(0.0, 1.0) * model_weight);
        let raw = rule_contribution + model_contribution.unwrap_or(0.0);
        let score = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, MAX_SCORE) };

        Self {
            score,
            rule_contribution,
            model_contribution,
            fraud_probability,
            mode: if fraud_probability.is_some() {
                ScoringMode::RuleAndModel
            } else {
                ScoringMode::RuleOnly
            },
            risk_level: RiskLevel::from_score(score, thresholds),
            triggered_rules: Vec::new(),
        }
    }

    /// Record the rules that fired
    pub fn with_triggered_rules(mut self, rules: Vec<String>) -> Self {
        self.triggered_rules = rules;
        self
    }
}
