//! Batch Transaction Scorer
//!
//! Reads one JSON transaction per line from stdin, scores each against the
//! persisted artifact pair and prints one JSON result per line to stdout.
//! An optional single argument names the config file.

use anyhow::{Context, Result};
use finsafe::{
    config::AppConfig, logging::init_tracing, metrics::ScoringMetrics, ScoringEngine,
    TransactionRecord,
};
use serde_json::json;
use std::io::{self, BufRead, Write};
use std::time::Instant;
use tracing::{info, warn};

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load_from_path(&path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => AppConfig::load()?,
    };
    init_tracing(&config.logging)?;

    let engine = ScoringEngine::new(&config);
    info!(status = %engine.status(), "Scoring engine ready");

    let metrics = ScoringMetrics::new();
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for (line_no, line) in stdin.lock().lines().enumerate() {
        let line = line.context("Failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        let started = Instant::now();
        let result = TransactionRecord::from_json_str(&line).and_then(|record| engine.score(&record));
        let output = match result {
            Ok(score) => {
                metrics.record_score(&score, started.elapsed());
                json!({ "line": line_no + 1, "ok": true, "risk": score })
            }
            Err(e) => {
                warn!(line = line_no + 1, error = %e, "Transaction not scored");
                metrics.record_failure(e.code());
                json!({
                    "line": line_no + 1,
                    "ok": false,
                    "error": { "code": e.code(), "message": e.to_string() },
                })
            }
        };
        writeln!(out, "{}", output).context("Failed to write result")?;
    }
    out.flush()?;

    metrics.print_summary();
    Ok(())
}
