//! Mock stage processor for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::processor::{
    EnrichmentOutcome, InvoiceOutcome, ProcessorError, StageProcessor,
};
use crate::ticket::{
    NextAction, PaymentSubmission, StandardizedCodes, Ticket, ValidationResults,
};

/// Mock implementation of the StageProcessor trait.
///
/// Provides controllable behavior for testing:
/// - Track which tickets each stage was called with
/// - Script the outcome either stage returns
/// - Inject a one-shot error per stage
///
/// # Example
///
/// ```rust,ignore
/// use docket_core::testing::MockStageProcessor;
///
/// let processor = MockStageProcessor::new();
///
/// // Route the next enrichment away from invoicing
/// processor.set_next_action(NextAction::ManualReview).await;
///
/// let outcome = processor.enrich(&ticket).await?;
///
/// // Check what was processed
/// assert_eq!(processor.enriched_ticket_ids().await, vec![ticket.ticket_id]);
/// ```
#[derive(Debug)]
pub struct MockStageProcessor {
    /// Ticket ids `enrich` was called with, in order.
    enrich_calls: Arc<RwLock<Vec<String>>>,
    /// Ticket ids `process_invoice` was called with, in order.
    invoice_calls: Arc<RwLock<Vec<String>>>,
    /// Outcome returned by `enrich`.
    enrichment: Arc<RwLock<EnrichmentOutcome>>,
    /// Outcome returned by `process_invoice`.
    invoice: Arc<RwLock<InvoiceOutcome>>,
    /// If set, the next `enrich` call fails with this error.
    next_enrich_error: Arc<RwLock<Option<ProcessorError>>>,
    /// If set, the next `process_invoice` call fails with this error.
    next_invoice_error: Arc<RwLock<Option<ProcessorError>>>,
}

impl Default for MockStageProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStageProcessor {
    /// Create a mock whose stages both succeed with clean outcomes.
    pub fn new() -> Self {
        Self {
            enrich_calls: Arc::new(RwLock::new(Vec::new())),
            invoice_calls: Arc::new(RwLock::new(Vec::new())),
            enrichment: Arc::new(RwLock::new(Self::default_enrichment())),
            invoice: Arc::new(RwLock::new(Self::default_invoice())),
            next_enrich_error: Arc::new(RwLock::new(None)),
            next_invoice_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Clean enrichment: coded, summarized, routed to invoicing.
    pub fn default_enrichment() -> EnrichmentOutcome {
        EnrichmentOutcome {
            agent_name: "mock-enrichment-agent".to_string(),
            agent_version: "1.0.0".to_string(),
            standardized_codes: Some(StandardizedCodes {
                vendor_code: "VND-MOCK-001".to_string(),
                product_codes: vec!["STD-MOCK-100".to_string()],
                department_code: "DEPT-MOCK-000".to_string(),
                cost_center: "CC-9999".to_string(),
            }),
            summary: Some("Mock enrichment summary.".to_string()),
            next_action: NextAction::InvoiceProcessing,
            flags: Vec::new(),
            confidence: Some(0.99),
            simulated: false,
        }
    }

    /// Clean invoice run: all validations pass, payment submitted.
    pub fn default_invoice() -> InvoiceOutcome {
        InvoiceOutcome {
            agent_name: "mock-payment-agent".to_string(),
            agent_version: "1.0.0".to_string(),
            validations: Some(ValidationResults {
                invoice_number_valid: true,
                amount_correct: true,
                due_date_valid: true,
                vendor_approved: true,
                budget_available: true,
            }),
            payment_submission: Some(PaymentSubmission {
                submitted: true,
                payment_id: Some("PAY-20260101-00042".to_string()),
                submitted_at: Some(chrono::Utc::now()),
                expected_payment_date: Some("2026-01-04".to_string()),
                payment_method: Some("ACH Transfer".to_string()),
                status: "submitted".to_string(),
            }),
            errors: Vec::new(),
            simulated: false,
        }
    }

    /// Ticket ids `enrich` has seen.
    pub async fn enriched_ticket_ids(&self) -> Vec<String> {
        self.enrich_calls.read().await.clone()
    }

    /// Ticket ids `process_invoice` has seen.
    pub async fn invoiced_ticket_ids(&self) -> Vec<String> {
        self.invoice_calls.read().await.clone()
    }

    /// Replace the scripted enrichment outcome.
    pub async fn set_enrichment(&self, outcome: EnrichmentOutcome) {
        *self.enrichment.write().await = outcome;
    }

    /// Replace the scripted invoice outcome.
    pub async fn set_invoice(&self, outcome: InvoiceOutcome) {
        *self.invoice.write().await = outcome;
    }

    /// Route the next enrichments to the given action.
    pub async fn set_next_action(&self, action: NextAction) {
        self.enrichment.write().await.next_action = action;
    }

    /// Configure the next `enrich` call to fail.
    pub async fn set_next_enrich_error(&self, error: ProcessorError) {
        *self.next_enrich_error.write().await = Some(error);
    }

    /// Configure the next `process_invoice` call to fail.
    pub async fn set_next_invoice_error(&self, error: ProcessorError) {
        *self.next_invoice_error.write().await = Some(error);
    }
}

#[async_trait]
impl StageProcessor for MockStageProcessor {
    async fn enrich(&self, ticket: &Ticket) -> Result<EnrichmentOutcome, ProcessorError> {
        self.enrich_calls
            .write()
            .await
            .push(ticket.ticket_id.clone());
        if let Some(err) = self.next_enrich_error.write().await.take() {
            return Err(err);
        }
        Ok(self.enrichment.read().await.clone())
    }

    async fn process_invoice(&self, ticket: &Ticket) -> Result<InvoiceOutcome, ProcessorError> {
        self.invoice_calls
            .write()
            .await
            .push(ticket.ticket_id.clone());
        if let Some(err) = self.next_invoice_error.write().await.take() {
            return Err(err);
        }
        Ok(self.invoice.read().await.clone())
    }
}
