//! Types for the processor module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ticket::{
    NextAction, PaymentSubmission, StandardizedCodes, Ticket, ValidationResults,
};

/// Errors from a remote stage processor call.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("processor request timed out")]
    Timeout,
    #[error("processor transport error: {0}")]
    Transport(String),
    #[error("processor returned status {code}")]
    Status { code: u16 },
    #[error("processor response could not be parsed: {0}")]
    InvalidResponse(String),
    #[error("processor unavailable: {0}")]
    Unavailable(String),
}

/// What to do when the remote processor cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Synthesize the stage result locally, marked `simulated: true`.
    #[default]
    Simulate,
    /// Surface the failure; the orchestrator records the stage as errored.
    FailFast,
}

impl FallbackPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackPolicy::Simulate => "simulate",
            FallbackPolicy::FailFast => "fail_fast",
        }
    }
}

/// Enrichment stage payload, minus the status/timing envelope the
/// orchestrator owns. Also the remote processor's response schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentOutcome {
    pub agent_name: String,
    pub agent_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standardized_codes: Option<StandardizedCodes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub next_action: NextAction,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub simulated: bool,
}

/// Invoice stage payload; same envelope split as [`EnrichmentOutcome`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceOutcome {
    pub agent_name: String,
    pub agent_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validations: Option<ValidationResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_submission: Option<PaymentSubmission>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub simulated: bool,
}

/// Executes the two externally-owned stages for a ticket.
///
/// One object serves both stages so the orchestrator carries a single
/// handle; implementations decide per stage whether the work happens
/// remotely or locally.
#[async_trait]
pub trait StageProcessor: Send + Sync {
    /// Stage 2: standardize codes and decide the routing action.
    async fn enrich(&self, ticket: &Ticket) -> Result<EnrichmentOutcome, ProcessorError>;

    /// Stage 3: validate the invoice and submit payment.
    async fn process_invoice(&self, ticket: &Ticket) -> Result<InvoiceOutcome, ProcessorError>;
}
