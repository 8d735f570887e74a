//! HTTP client for a remote stage processor.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::ProcessorError;

/// One remote endpoint: POST `{ "ticketId": … }`, stage payload back.
pub(crate) struct RemoteStage {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl RemoteStage {
    pub(crate) fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProcessorError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProcessorError::Transport(format!("client construction: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    pub(crate) fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        ticket_id: &str,
    ) -> Result<T, ProcessorError> {
        debug!(ticket_id, endpoint = %self.endpoint, "calling remote processor");

        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "ticketId": ticket_id }));
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProcessorError::Timeout
            } else {
                ProcessorError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProcessorError::Status {
                code: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProcessorError::InvalidResponse(e.to_string()))
    }
}
