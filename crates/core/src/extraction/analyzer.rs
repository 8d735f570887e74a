//! Remote analyzer extraction strategy.
//!
//! Posts the raw document to an external analyzer service and expects
//! the structured-field contract back as JSON. The service owns the
//! parsing smarts; this side owns transport, auth, and timeouts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{ExtractionError, InvoiceExtractor, SourceDocument};
use crate::ticket::InvoiceFields;

/// Strategy that delegates extraction to an analyzer endpoint.
pub struct AnalyzerExtractor {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl AnalyzerExtractor {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ExtractionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::Analyzer(format!("client construction: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    fn request_url(&self, filename: &str) -> String {
        format!("{}?filename={}", self.endpoint, urlencoding::encode(filename))
    }
}

#[async_trait]
impl InvoiceExtractor for AnalyzerExtractor {
    fn name(&self) -> &'static str {
        "analyzer"
    }

    async fn extract(&self, source: &SourceDocument) -> Result<InvoiceFields, ExtractionError> {
        let url = self.request_url(&source.filename);
        debug!(filename = %source.filename, size = source.bytes.len(), "sending document to analyzer");

        let mut request = self
            .client
            .post(&url)
            .header("content-type", "application/pdf")
            .body(source.bytes.clone());
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ExtractionError::Analyzer("timed out".to_string())
            } else {
                ExtractionError::Analyzer(format!("transport error: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Analyzer(format!(
                "unexpected status {status}: {body}"
            )));
        }

        response
            .json::<InvoiceFields>()
            .await
            .map_err(|e| ExtractionError::Analyzer(format!("invalid response body: {e}")))
    }
}
