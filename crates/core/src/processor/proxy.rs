//! Proxy in front of the remote stage processors.
//!
//! Each stage has an optional endpoint. Configured and reachable, the
//! remote result is used as-is. Unconfigured, the local simulation runs
//! directly. Configured but failing, the fallback policy decides:
//! simulate (default) or fail fast. There is no automatic retry.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::mappings::CodeMappings;
use super::remote::RemoteStage;
use super::simulate::SimulationProcessor;
use super::types::{
    EnrichmentOutcome, FallbackPolicy, InvoiceOutcome, ProcessorError, StageProcessor,
};
use crate::config::ProcessorsConfig;
use crate::metrics;
use crate::ticket::Ticket;

const AI_STAGE: &str = "ai_processing";
const INVOICE_STAGE: &str = "invoice_processing";

pub struct ProxyProcessor {
    ai: Option<RemoteStage>,
    invoice: Option<RemoteStage>,
    simulation: SimulationProcessor,
    policy: FallbackPolicy,
}

impl ProxyProcessor {
    pub fn new(
        config: &ProcessorsConfig,
        mappings: CodeMappings,
    ) -> Result<Self, ProcessorError> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let ai = config
            .ai_endpoint
            .as_ref()
            .map(|endpoint| RemoteStage::new(endpoint, config.ai_api_key.clone(), timeout))
            .transpose()?;
        let invoice = config
            .invoice_endpoint
            .as_ref()
            .map(|endpoint| RemoteStage::new(endpoint, config.invoice_api_key.clone(), timeout))
            .transpose()?;

        if ai.is_none() {
            info!("no ai processor endpoint configured, enrichment runs in local simulation");
        }
        if invoice.is_none() {
            info!("no invoice processor endpoint configured, payment runs in local simulation");
        }

        Ok(Self {
            ai,
            invoice,
            simulation: SimulationProcessor::new(mappings),
            policy: config.fallback,
        })
    }

    /// Simulation-only proxy, no remote endpoints.
    pub fn local(mappings: CodeMappings) -> Self {
        Self {
            ai: None,
            invoice: None,
            simulation: SimulationProcessor::new(mappings),
            policy: FallbackPolicy::Simulate,
        }
    }
}

#[async_trait]
impl StageProcessor for ProxyProcessor {
    async fn enrich(&self, ticket: &Ticket) -> Result<EnrichmentOutcome, ProcessorError> {
        let Some(remote) = &self.ai else {
            metrics::PROCESSOR_CALLS
                .with_label_values(&[AI_STAGE, "simulated"])
                .inc();
            return Ok(self.simulation.enrich_outcome(ticket));
        };

        match remote.call::<EnrichmentOutcome>(&ticket.ticket_id).await {
            Ok(outcome) => {
                metrics::PROCESSOR_CALLS
                    .with_label_values(&[AI_STAGE, "remote_ok"])
                    .inc();
                Ok(outcome)
            }
            Err(e) => {
                metrics::PROCESSOR_CALLS
                    .with_label_values(&[AI_STAGE, "remote_error"])
                    .inc();
                self.handle_failure(AI_STAGE, remote, e, || {
                    self.simulation.enrich_outcome(ticket)
                })
            }
        }
    }

    async fn process_invoice(&self, ticket: &Ticket) -> Result<InvoiceOutcome, ProcessorError> {
        let Some(remote) = &self.invoice else {
            metrics::PROCESSOR_CALLS
                .with_label_values(&[INVOICE_STAGE, "simulated"])
                .inc();
            return Ok(self.simulation.invoice_outcome(ticket));
        };

        match remote.call::<InvoiceOutcome>(&ticket.ticket_id).await {
            Ok(outcome) => {
                metrics::PROCESSOR_CALLS
                    .with_label_values(&[INVOICE_STAGE, "remote_ok"])
                    .inc();
                Ok(outcome)
            }
            Err(e) => {
                metrics::PROCESSOR_CALLS
                    .with_label_values(&[INVOICE_STAGE, "remote_error"])
                    .inc();
                self.handle_failure(INVOICE_STAGE, remote, e, || {
                    self.simulation.invoice_outcome(ticket)
                })
            }
        }
    }
}

impl ProxyProcessor {
    fn handle_failure<T>(
        &self,
        stage: &'static str,
        remote: &RemoteStage,
        error: ProcessorError,
        simulate: impl FnOnce() -> T,
    ) -> Result<T, ProcessorError> {
        match self.policy {
            FallbackPolicy::Simulate => {
                warn!(
                    stage,
                    endpoint = remote.endpoint(),
                    error = %error,
                    "remote processor failed, falling back to local simulation"
                );
                metrics::PROCESSOR_FALLBACKS.with_label_values(&[stage]).inc();
                Ok(simulate())
            }
            FallbackPolicy::FailFast => {
                warn!(
                    stage,
                    endpoint = remote.endpoint(),
                    error = %error,
                    "remote processor failed, fail-fast policy active"
                );
                Err(ProcessorError::Unavailable(error.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::{InvoiceFields, RawTicket};

    fn approved_ticket() -> Ticket {
        let mut ticket = Ticket::new("DCK-2026-00000042", RawTicket::new("Invoice ABC"));
        ticket.extraction.invoice = Some(InvoiceFields {
            invoice_number: Some("INV-2026-78432".to_string()),
            vendor_name: Some("ABC Industrial Supplies".to_string()),
            due_date: Some("2099-12-31".to_string()),
            total_amount: 13_531.25,
            ..Default::default()
        });
        ticket
    }

    #[tokio::test]
    async fn test_unconfigured_proxy_simulates_both_stages() {
        let proxy = ProxyProcessor::local(CodeMappings::builtin());
        let ticket = approved_ticket();

        let enrichment = proxy.enrich(&ticket).await.unwrap();
        assert!(enrichment.simulated);

        let invoice = proxy.process_invoice(&ticket).await.unwrap();
        assert!(invoice.simulated);
        assert!(invoice.payment_submission.is_some());
    }

    #[tokio::test]
    async fn test_fail_fast_without_endpoint_still_simulates() {
        // Fail-fast governs remote failures only; with no endpoint the
        // simulation is the configured behavior, not a fallback.
        let config = ProcessorsConfig {
            fallback: FallbackPolicy::FailFast,
            ..Default::default()
        };
        let proxy = ProxyProcessor::new(&config, CodeMappings::builtin()).unwrap();

        let outcome = proxy.enrich(&approved_ticket()).await.unwrap();
        assert!(outcome.simulated);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_with_simulate_policy_falls_back() {
        let config = ProcessorsConfig {
            ai_endpoint: Some("http://127.0.0.1:1/ai".to_string()),
            timeout_secs: 1,
            fallback: FallbackPolicy::Simulate,
            ..Default::default()
        };
        let proxy = ProxyProcessor::new(&config, CodeMappings::builtin()).unwrap();

        let outcome = proxy.enrich(&approved_ticket()).await.unwrap();
        assert!(outcome.simulated);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_with_fail_fast_policy_errors() {
        let config = ProcessorsConfig {
            ai_endpoint: Some("http://127.0.0.1:1/ai".to_string()),
            timeout_secs: 1,
            fallback: FallbackPolicy::FailFast,
            ..Default::default()
        };
        let proxy = ProxyProcessor::new(&config, CodeMappings::builtin()).unwrap();

        let err = proxy.enrich(&approved_ticket()).await.unwrap_err();
        assert!(matches!(err, ProcessorError::Unavailable(_)));
    }
}
