//! Bounded dataset loading from synthetic or external sources

use crate::config::{AppConfig, DataConfig, SourceKind};
use crate::data::hub::{HubRowsClient, RowSource};
use crate::data::schema::Canonicalizer;
use crate::data::synthetic::SyntheticGenerator;
use crate::error::{PipelineError, Result};
use crate::types::dataset::Dataset;
use crate::types::transaction::TransactionRecord;
use tracing::{info, warn};

/// Where a load reads its rows from
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Synthetic { fraud_rate: f64, seed: Option<u64> },
    External,
}

impl DataSource {
    /// Source selected by configuration
    pub fn from_config(config: &DataConfig) -> Self {
        match config.source {
            SourceKind::Synthetic => Self::synthetic_from_config(config),
            SourceKind::External => DataSource::External,
        }
    }

    /// Synthetic source with the configured rate and seed
    pub fn synthetic_from_config(config: &DataConfig) -> Self {
        DataSource::Synthetic {
            fraud_rate: config.fraud_rate,
            seed: config.seed,
        }
    }
}

/// Produces canonical, row-capped datasets
pub struct DataLoader<S = HubRowsClient> {
    canonicalizer: Canonicalizer,
    max_rows: usize,
    page_size: usize,
    external: S,
}

impl DataLoader<HubRowsClient> {
    /// Loader wired to the configured remote rows API
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let external = HubRowsClient::new(config.data.hub.clone())?;
        Ok(Self::with_source(config, external))
    }
}

impl<S: RowSource> DataLoader<S> {
    /// Loader with a custom external row source
    pub fn with_source(config: &AppConfig, external: S) -> Self {
        Self {
            canonicalizer: Canonicalizer::new(&config.columns),
            max_rows: config.data.max_rows,
            page_size: config.data.hub.page_size.max(1),
            external,
        }
    }

    /// Load at most `limit` rows (further capped by `max_rows`) and canonicalize them.
    pub async fn load(&self, limit: usize, source: &DataSource) -> Result<Dataset> {
        let limit = if limit > self.max_rows {
            warn!(
                requested = limit,
                cap = self.max_rows,
                "Row limit above configured cap, clamping"
            );
            self.max_rows
        } else {
            limit
        };
        if limit == 0 {
            return Err(PipelineError::EmptyDataset { stage: "load" });
        }

        let raw = match source {
            DataSource::Synthetic { fraud_rate, seed } => {
                info!(rows = limit, fraud_rate, "Generating synthetic transactions");
                SyntheticGenerator::new(*fraud_rate, *seed)?.generate_batch(limit)
            }
            DataSource::External => self.fetch_external(limit).await?,
        };

        let dataset = self.canonicalizer.canonicalize_batch(&raw)?;
        info!(
            rows = dataset.len(),
            columns = ?dataset.columns(),
            "Dataset loaded"
        );
        Ok(dataset)
    }

    async fn fetch_external(&self, limit: usize) -> Result<Vec<TransactionRecord>> {
        info!(
            source = %self.external.name(),
            rows = limit,
            "Streaming rows from external source"
        );

        let mut rows: Vec<TransactionRecord> = Vec::with_capacity(limit.min(self.max_rows));
        let mut offset = 0;
        while rows.len() < limit {
            let length = (limit - rows.len()).min(self.page_size);
            let page = self.external.fetch_page(offset, length).await?;
            let fetched = page.rows.len();
            if fetched == 0 {
                break;
            }
            rows.extend(page.rows);
            offset += fetched;

            let exhausted = fetched < length || page.total.is_some_and(|total| offset >= total);
            if exhausted {
                break;
            }
        }
        rows.truncate(limit);

        if rows.is_empty() {
            return Err(PipelineError::source_unavailable(
                self.external.name(),
                "source returned no rows",
            ));
        }
        Ok(rows)
    }
}
