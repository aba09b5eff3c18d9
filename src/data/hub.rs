//! Paged client for a remote rows API.
//!
//! Talks to a Hugging Face datasets-server style `/rows` endpoint, which
//! serves a slice of a split per request. Only the requested rows are ever
//! transferred; the full corpus is never downloaded.

use crate::config::HubConfig;
use crate::error::{PipelineError, Result};
use crate::types::transaction::{FieldValue, TransactionRecord};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// One page of rows from a remote source
#[derive(Debug, Clone, Default)]
pub struct RowPage {
    pub rows: Vec<TransactionRecord>,
    /// Total rows in the remote split, when the source reports it
    pub total: Option<usize>,
}

/// A source that serves rows by offset
pub trait RowSource: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Fetch up to `length` rows starting at `offset`
    fn fetch_page(
        &self,
        offset: usize,
        length: usize,
    ) -> impl Future<Output = Result<RowPage>> + Send;
}

#[derive(Debug, Deserialize)]
struct RowsResponse {
    rows: Vec<RowEntry>,
    #[serde(default)]
    num_rows_total: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RowEntry {
    row: serde_json::Map<String, serde_json::Value>,
}

/// HTTP client for the rows endpoint
pub struct HubRowsClient {
    http: reqwest::Client,
    config: HubConfig,
}

impl HubRowsClient {
    /// Client with the configured endpoint and per-request timeout
    pub fn new(config: HubConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::source_unavailable(&config.dataset, e.to_string()))?;
        Ok(Self { http, config })
    }

    fn rows_url(&self) -> String {
        format!("{}/rows", self.config.base_url.trim_end_matches('/'))
    }

    fn unavailable(&self, reason: impl Into<String>) -> PipelineError {
        PipelineError::source_unavailable(&self.config.dataset, reason)
    }
}

impl RowSource for HubRowsClient {
    fn name(&self) -> &str {
        &self.config.dataset
    }

    async fn fetch_page(&self, offset: usize, length: usize) -> Result<RowPage> {
        let length = length.min(self.config.page_size);
        debug!(dataset = %self.config.dataset, offset, length, "Fetching rows page");

        let response = self
            .http
            .get(self.rows_url())
            .query(&[
                ("dataset", self.config.dataset.as_str()),
                ("config", self.config.config.as_str()),
                ("split", self.config.split.as_str()),
            ])
            .query(&[("offset", offset), ("length", length)])
            .send()
            .await
            .map_err(|e| self.unavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.unavailable(format!("HTTP {}", status)));
        }

        let body: RowsResponse = response
            .json()
            .await
            .map_err(|e| self.unavailable(format!("invalid rows payload: {}", e)))?;

        let rows = body
            .rows
            .into_iter()
            .map(|entry| {
                entry
                    .row
                    .iter()
                    .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
                    .collect()
            })
            .collect();

        Ok(RowPage {
            rows,
            total: body.num_rows_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_payload_decoding() {
        let payload = r#"{
            "features": [],
            "rows": [
                {"row_idx": 0, "row": {"amount_ngn": 1200.5, "is_fraud": false, "transaction_type": "POS"}, "truncated_cells": []},
                {"row_idx": 1, "row": {"amount_ngn": 99.0, "is_fraud": true, "transaction_type": "USSD"}, "truncated_cells": []}
            ],
            "num_rows_total": 5000000
        }"#;
        let body: RowsResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(body.rows.len(), 2);
        assert_eq!(body.num_rows_total, Some(5_000_000));
        assert_eq!(body.rows[1].row.get("is_fraud"), Some(&serde_json::Value::Bool(true)));
    }

    #[test]
    fn test_rows_url() {
        let client = HubRowsClient::new(HubConfig {
            base_url: "https://example.org/".to_string(),
            ..HubConfig::default()
        })
        .unwrap();
        assert_eq!(client.rows_url(), "https://example.org/rows");
    }
}
