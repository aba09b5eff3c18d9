//! Evaluation and scoring statistics.
//!
//! `ClassificationReport` is the held-out evaluation produced by training.
//! `ScoringMetrics` tracks what the scoring engine did over a run.

use crate::types::risk::{RiskScore, ScoringMode, MAX_SCORE};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Binary confusion counts, positive class = fraud
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionMatrix {
    /// Count outcomes with label 1 as positive
    pub fn from_labels(actual: &[f64], predicted: &[f64]) -> Self {
        let mut m = Self::default();
        for (&y, &p) in actual.iter().zip(predicted) {
            match (y >= 0.5, p >= 0.5) {
                (true, true) => m.true_positive += 1,
                (false, true) => m.false_positive += 1,
                (false, false) => m.true_negative += 1,
                (true, false) => m.false_negative += 1,
            }
        }
        m
    }

    /// Number of predictions counted
    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }
}

/// Precision / recall / F1 for one class
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

impl ClassMetrics {
    /// Undefined ratios (zero denominators) report 0.0
    fn new(label: &str, tp: usize, fp: usize, fn_: usize) -> Self {
        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            label: label.to_string(),
            precision,
            recall,
            f1,
            support: tp + fn_,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AveragedMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Held-out evaluation of a binary classifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    /// Legitimate ("0") first, then fraud ("1")
    pub classes: Vec<ClassMetrics>,
    pub macro_avg: AveragedMetrics,
    pub weighted_avg: AveragedMetrics,
    pub confusion: ConfusionMatrix,
}

impl ClassificationReport {
    /// Report over held-out labels and predictions
    pub fn from_predictions(actual: &[f64], predicted: &[f64]) -> Self {
        let confusion = ConfusionMatrix::from_labels(actual, predicted);
        let c = &confusion;
        let classes = vec![
            ClassMetrics::new("0", c.true_negative, c.false_negative, c.false_positive),
            ClassMetrics::new("1", c.true_positive, c.false_positive, c.false_negative),
        ];

        let total = c.total();
        let accuracy = if total == 0 {
            0.0
        } else {
            (c.true_positive + c.true_negative) as f64 / total as f64
        };

        let n = classes.len() as f64;
        let macro_avg = AveragedMetrics {
            precision: classes.iter().map(|m| m.precision).sum::<f64>() / n,
            recall: classes.iter().map(|m| m.recall).sum::<f64>() / n,
            f1: classes.iter().map(|m| m.f1).sum::<f64>() / n,
        };
        let weight = |f: fn(&ClassMetrics) -> f64| {
            if total == 0 {
                0.0
            } else {
                classes.iter().map(|m| f(m) * m.support as f64).sum::<f64>() / total as f64
            }
        };
        let weighted_avg = AveragedMetrics {
            precision: weight(|m| m.precision),
            recall: weight(|m| m.recall),
            f1: weight(|m| m.f1),
        };

        Self {
            accuracy,
            classes,
            macro_avg,
            weighted_avg,
            confusion,
        }
    }

    /// Metrics of one class label
    pub fn class(&self, label: &str) -> Option<&ClassMetrics> {
        self.classes.iter().find(|m| m.label == label)
    }

    /// Metrics for the fraud class
    pub fn fraud(&self) -> Option<&ClassMetrics> {
        self.class("1")
    }

    /// Number of evaluated rows
    pub fn support(&self) -> usize {
        self.confusion.total()
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>14} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        for m in &self.classes {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.label, m.precision, m.recall, m.f1, m.support
            )?;
        }
        let total = self.support();
        writeln!(f, "{:>14} {:>9} {:>9} {:>9.2} {:>9}", "accuracy", "", "", self.accuracy, total)?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1, total
            )?;
        }
        Ok(())
    }
}

/// Counters for a scoring run
pub struct ScoringMetrics {
    pub scored: AtomicU64,
    pub failed: AtomicU64,
    /// Scores produced without the model layer
    pub rule_only: AtomicU64,
    by_level: RwLock<BTreeMap<String, u64>>,
    failures_by_code: RwLock<BTreeMap<&'static str, u64>>,
    processing_times: RwLock<Vec<u64>>,
    score_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl ScoringMetrics {
    /// Empty collector; the throughput clock starts now
    pub fn new() -> Self {
        Self {
            scored: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            rule_only: AtomicU64::new(0),
            by_level: RwLock::new(BTreeMap::new()),
            failures_by_code: RwLock::new(BTreeMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Count one successful score and its latency
    pub fn record_score(&self, score: &RiskScore, elapsed: Duration) {
        self.scored.fetch_add(1, Ordering::Relaxed);
        if score.mode == ScoringMode::RuleOnly {
            self.rule_only.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(elapsed.as_micros() as u64);
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
        if let Ok(mut levels) = self.by_level.write() {
            *levels.entry(score.risk_level.to_string()).or_insert(0) += 1;
        }
        let bucket = ((score.score / MAX_SCORE) * 10.0).clamp(0.0, 9.0) as usize;
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Count one rejected transaction by error code
    pub fn record_failure(&self, code: &'static str) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut failures) = self.failures_by_code.write() {
            *failures.entry(code).or_insert(0) += 1;
        }
    }

    /// Latency and volume snapshot
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let Ok(times) = self.processing_times.read() else {
            return ProcessingStats::default();
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted = times.clone();
        sorted.sort_unstable();
        let count = sorted.len();
        let percentile = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sorted.iter().sum::<u64>() / count as u64,
            p50_us: percentile(0.5),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Scored transactions per second since creation
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Scores per risk level
    pub fn get_by_level(&self) -> BTreeMap<String, u64> {
        self.by_level.read().map(|m| m.clone()).unwrap_or_default()
    }

    /// Failures per error code
    pub fn get_failures(&self) -> BTreeMap<&'static str, u64> {
        self.failures_by_code
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Score histogram in ten-point buckets
    pub fn get_score_distribution(&self) -> [u64; 10] {
        self.score_buckets.read().map(|b| *b).unwrap_or_default()
    }

    /// Log the summary box
    pub fn print_summary(&self) {
        let scored = self.scored.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let rule_only = self.rule_only.load(Ordering::Relaxed);
        let processing = self.get_processing_stats();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║                FINSAFE SCORING - RUN SUMMARY                 ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Scored: {:>8}  │  Failed: {:>6}  │  Rule-only: {:>6}     ║",
            scored, failed, rule_only
        );
        info!(
            "║ Throughput: {:>8.1} tx/s  │  mean={:>5}μs p95={:>5}μs        ║",
            self.get_throughput(),
            processing.mean_us,
            processing.p95_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ By Risk Level:                                               ║");
        for (level, count) in self.get_by_level() {
            let pct = if scored > 0 {
                count as f64 / scored as f64 * 100.0
            } else {
                0.0
            };
            info!("║   {:10}: {:>6} ({:>5.1}%)", level, count, pct);
        }
        let failures = self.get_failures();
        if !failures.is_empty() {
            info!("║ Failures:                                                    ║");
            for (code, count) in failures {
                info!("║   {:26}: {:>6}", code, count);
            }
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Score Distribution:                                          ║");
        let dist = self.get_score_distribution();
        let total: u64 = dist.iter().sum();
        for (i, &count) in dist.iter().enumerate() {
            let pct = if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            let bar = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:>3}-{:<3}: {:>6} ({:>5.1}%) {}",
                i * 10,
                (i + 1) * 10,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for ScoringMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::risk::RiskLevelThresholds;

    #[test]
    fn test_report_counts() {
        let actual = [1.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        let predicted = [1.0, 0.0, 0.0, 1.0, 0.0, 1.0];
        let report = ClassificationReport::from_predictions(&actual, &predicted);

        assert_eq!(report.support(), 6);
        assert!((report.accuracy - 4.0 / 6.0).abs() < 1e-12);
        let fraud = report.fraud().unwrap();
        assert_eq!(fraud.support, 3);
        assert!((fraud.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((fraud.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((report.weighted_avg.recall - report.accuracy).abs() < 1e-12);
    }

    #[test]
    fn test_report_without_positives() {
        let report = ClassificationReport::from_predictions(&[0.0, 0.0], &[0.0, 0.0]);
        let fraud = report.fraud().unwrap();
        assert_eq!(fraud.support, 0);
        assert_eq!(fraud.precision, 0.0);
        assert_eq!(fraud.recall, 0.0);
        assert_eq!(fraud.f1, 0.0);
        assert_eq!(report.accuracy, 1.0);
        assert!(report.to_string().contains("weighted avg"));
    }

    #[test]
    fn test_scoring_metrics_recording() {
        let metrics = ScoringMetrics::new();
        let thresholds = RiskLevelThresholds::default();
        let high = RiskScore::new(50.0, Some(0.9), 50.0, &thresholds);
        let low = RiskScore::new(0.0, None, 50.0, &thresholds);

        metrics.record_score(&high, Duration::from_micros(120));
        metrics.record_score(&low, Duration::from_micros(80));
        metrics.record_failure("INVALID_TRANSACTION_INPUT");

        assert_eq!(metrics.scored.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.failed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.rule_only.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.get_score_distribution()[9], 1);
        assert_eq!(metrics.get_score_distribution()[0], 1);
        assert_eq!(metrics.get_processing_stats().count, 2);
    }
}
