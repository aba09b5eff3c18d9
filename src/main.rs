//! FinSafe trainer - Main Entry Point
//!
//! Loads a bounded transaction batch, trains the preprocessing pipeline and
//! classifier, and commits the artifact pair for the scoring engine.
//! Settings come from `config/finsafe.toml` (or the path given as the only
//! argument) plus `FINSAFE__*` environment overrides.

use anyhow::{Context, Result};
use finsafe::{
    config::AppConfig,
    data::{DataLoader, DataSource},
    logging::init_tracing,
    training::TrainingPipeline,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load_from_path(&path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => AppConfig::load()?,
    };
    init_tracing(&config.logging)?;

    info!("Starting FinSafe training run");
    info!(
        source = ?config.data.source,
        rows = config.data.default_limit,
        cap = config.data.max_rows,
        artifacts = %config.artifacts.dir.display(),
        "Configuration loaded"
    );

    let loader = DataLoader::from_config(&config).context("Failed to build data loader")?;
    let source = DataSource::from_config(&config.data);
    let limit = config.data.default_limit;

    let dataset = match loader.load(limit, &source).await {
        Ok(dataset) => dataset,
        Err(e)
            if e.is_recoverable()
                && config.data.fallback_to_synthetic
                && source == DataSource::External =>
        {
            warn!(error = %e, code = e.code(), "External source failed, falling back to synthetic data");
            loader
                .load(limit, &DataSource::synthetic_from_config(&config.data))
                .await
                .context("Failed to generate synthetic dataset")?
        }
        Err(e) => return Err(anyhow::Error::new(e).context("Failed to load dataset")),
    };

    let summary = dataset.summary();
    info!(
        transactions = summary.total_transactions,
        fraud = summary.fraud_count,
        fraud_rate_pct = format!("{:.2}", summary.fraud_rate_pct),
        volume = format!("{:.2}", summary.total_volume),
        "Dataset summary"
    );
    for (kind, count) in &summary.by_transaction_type {
        info!(transaction_type = %kind, count, "Transactions by type");
    }

    let pipeline = TrainingPipeline::new(&config);
    let outcome = pipeline
        .train(
            &dataset,
            config.training.target_column.as_deref(),
            config.training.test_fraction,
        )
        .context("Training failed")?;

    let manifest = pipeline
        .persist(&outcome)
        .context("Failed to persist artifacts")?;

    info!(
        artifact_id = %manifest.artifact_id,
        target = %outcome.target_column,
        train_rows = outcome.train_rows,
        test_rows = outcome.test_rows,
        "Artifacts committed"
    );
    info!("Held-out evaluation:");
    for line in outcome.report.to_string().lines() {
        info!("{}", line);
    }

    Ok(())
}
