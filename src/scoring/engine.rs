//! Risk scoring engine.
//!
//! Blends the rule layer with the persisted model's fraud probability. The
//! loaded artifact pair sits behind an `RwLock<Arc<_>>`: requests clone the
//! `Arc` and score against that snapshot, `reload` swaps in a new one.

use crate::config::AppConfig;
use crate::data::Canonicalizer;
use crate::error::Result;
use crate::models::artifact::{ArtifactPair, ArtifactStore};
use crate::scoring::rules::RuleLayer;
use crate::types::risk::{RiskLevelThresholds, RiskScore};
use crate::types::transaction::TransactionRecord;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Lifecycle of the engine's artifact pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    /// No load attempted yet
    Unloaded,
    /// Pair loaded, no request scored against it yet
    Loaded,
    /// Pair loaded and in use
    Serving,
    /// Load failed; scoring is rule-only
    Degraded { cause: String },
}

impl EngineStatus {
    /// Whether scores include the model layer
    pub fn has_model(&self) -> bool {
        matches!(self, EngineStatus::Loaded | EngineStatus::Serving)
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineStatus::Unloaded => write!(f, "unloaded"),
            EngineStatus::Loaded => write!(f, "loaded"),
            EngineStatus::Serving => write!(f, "serving"),
            EngineStatus::Degraded { cause } => write!(f, "degraded ({})", cause),
        }
    }
}

enum Slot {
    Unloaded,
    Ready {
        pair: ArtifactPair,
        /// Set on the first model-backed score against this pair
        serving: AtomicBool,
    },
    Degraded(String),
}

impl Slot {
    fn ready(pair: ArtifactPair) -> Self {
        Slot::Ready {
            pair,
            serving: AtomicBool::new(false),
        }
    }
}

/// Rule layer plus the hot-swappable model layer
pub struct ScoringEngine {
    store: ArtifactStore,
    canonicalizer: Canonicalizer,
    rules: RuleLayer,
    model_weight: f64,
    thresholds: RiskLevelThresholds,
    slot: RwLock<Arc<Slot>>,
}

impl ScoringEngine {
    /// Build and try to load the persisted pair. Never fails: a bad or
    /// missing pair leaves the engine degraded.
    pub fn new(config: &AppConfig) -> Self {
        let engine = Self::unloaded(config);
        engine.load();
        engine
    }

    /// Build without touching the artifact store
    pub fn unloaded(config: &AppConfig) -> Self {
        Self {
            store: ArtifactStore::from_config(&config.artifacts),
            canonicalizer: Canonicalizer::new(&config.columns),
            rules: RuleLayer::new(&config.scoring, &config.columns),
            model_weight: config.scoring.model_weight,
            thresholds: config.scoring.risk_levels.clone(),
            slot: RwLock::new(Arc::new(Slot::Unloaded)),
        }
    }

    /// Serve an in-memory pair
    pub fn with_pair(config: &AppConfig, pair: ArtifactPair) -> Self {
        let engine = Self::unloaded(config);
        engine.install(Slot::ready(pair));
        engine
    }

    /// Load the current pair from the store
    pub fn load(&self) -> EngineStatus {
        let slot = match self.store.load() {
            Ok(pair) => {
                info!(
                    artifact_id = %pair.artifact_id,
                    created_at = %pair.created_at,
                    features = ?pair.preprocessor.feature_names(),
                    "Scoring artifacts loaded"
                );
                Slot::ready(pair)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    code = e.code(),
                    dir = %self.store.dir().display(),
                    "Artifacts unavailable, scoring is rule-only"
                );
                Slot::Degraded(e.to_string())
            }
        };
        self.install(slot);
        self.status()
    }

    /// Load a fresh pair and swap it in. Requests already holding the old
    /// snapshot finish against it.
    pub fn reload(&self) -> EngineStatus {
        info!(previous = %self.status(), "Reloading scoring artifacts");
        self.load()
    }

    /// Current lifecycle state
    pub fn status(&self) -> EngineStatus {
        match &*self.snapshot() {
            Slot::Unloaded => EngineStatus::Unloaded,
            Slot::Ready { serving, .. } if serving.load(Ordering::Acquire) => EngineStatus::Serving,
            Slot::Ready { .. } => EngineStatus::Loaded,
            Slot::Degraded(cause) => EngineStatus::Degraded {
                cause: cause.clone(),
            },
        }
    }

    /// Score one transaction into `[0, 100]`
    pub fn score(&self, record: &TransactionRecord) -> Result<RiskScore> {
        let amount = self.rules.amount(record)?;
        let rules = self.rules.evaluate(amount);

        let snapshot = self.snapshot();
        let fraud_probability = match &*snapshot {
            Slot::Ready { pair, serving } => {
                let p = self.model_probability(pair, record)?;
                serving.store(true, Ordering::Release);
                Some(p)
            }
            Slot::Unloaded | Slot::Degraded(_) => None,
        };

        let score = RiskScore::new(
            rules.contribution,
            fraud_probability,
            self.model_weight,
            &self.thresholds,
        )
        .with_triggered_rules(rules.triggered);
        debug!(
            amount,
            score = score.score,
            mode = ?score.mode,
            level = %score.risk_level,
            "Transaction scored"
        );
        Ok(score)
    }

    fn model_probability(&self, pair: &ArtifactPair, record: &TransactionRecord) -> Result<f64> {
        let canonical = self.canonicalizer.canonicalize_record(record);
        let features = pair.preprocessor.transform(&canonical)?;
        pair.model.predict_proba(&features)
    }

    fn snapshot(&self) -> Arc<Slot> {
        match self.slot.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    fn install(&self, slot: Slot) {
        let slot = Arc::new(slot);
        match self.slot.write() {
            Ok(mut guard) => *guard = slot,
            Err(poisoned) => *poisoned.into_inner() = slot,
        }
    }
}
