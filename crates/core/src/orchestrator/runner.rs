//! Stage orchestrator implementation.
//!
//! Drives tickets through the pipeline on demand:
//! - Submission persists the document and, when configured, spawns
//!   extraction in the background.
//! - `trigger_stage` runs one stage synchronously under a soft lease:
//!   the atomic conditional status transition in the store. A lost race
//!   is an error with zero mutation; stage outcomes, success or failure,
//!   are deep-merged into the document.
//! - Stages 2 and 3 never chain automatically; each run is an explicit
//!   call.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::extraction::{ExtractionEngine, ExtractionError};
use crate::metrics;
use crate::processor::StageProcessor;
use crate::ticket::{
    AiProcessingRecord, ExtractionRecord, FsAttachmentStore, InvoiceProcessingRecord, NextAction,
    StageStatus, Ticket, TicketError, TicketStatus, TicketStore,
};

use super::types::{NewTicket, OrchestratorError, Stage};

/// The stage orchestrator. Cheap to clone; all state lives behind
/// shared handles.
#[derive(Clone)]
pub struct StageOrchestrator {
    store: Arc<dyn TicketStore>,
    attachments: FsAttachmentStore,
    engine: Arc<ExtractionEngine>,
    processor: Arc<dyn StageProcessor>,
    auto_extract: bool,
}

impl StageOrchestrator {
    pub fn new(
        store: Arc<dyn TicketStore>,
        attachments: FsAttachmentStore,
        engine: ExtractionEngine,
        processor: Arc<dyn StageProcessor>,
        auto_extract: bool,
    ) -> Self {
        Self {
            store,
            attachments,
            engine: Arc::new(engine),
            processor,
            auto_extract,
        }
    }

    /// Open a new ticket at `ingested`.
    ///
    /// The attachment (if any) is written to the attachment store before
    /// the document is created, so a storage failure leaves no document
    /// behind. With `auto_extract` and an attachment present, extraction
    /// is spawned in the background; its result lands in the document
    /// like any other stage run.
    pub async fn submit(&self, new: NewTicket) -> Result<Ticket, OrchestratorError> {
        if new.raw.title.trim().is_empty() {
            return Err(OrchestratorError::Validation(
                "title must not be empty".to_string(),
            ));
        }

        let ticket_id = generate_ticket_id();
        let mut ticket = Ticket::new(&ticket_id, new.raw);

        if let Some(attachment) = new.attachment {
            let info = self
                .attachments
                .save(
                    &ticket_id,
                    &attachment.filename,
                    &attachment.content_type,
                    &attachment.bytes,
                )
                .await?;
            ticket.attachments.push(info);
        }

        let created = self.store.create(&ticket)?;
        metrics::TICKETS_SUBMITTED.inc();
        info!(ticket_id, title = %created.raw.title, "ticket submitted");

        if self.auto_extract && !created.attachments.is_empty() {
            let this = self.clone();
            let id = created.ticket_id.clone();
            tokio::spawn(async move {
                if let Err(e) = this.trigger_stage(&id, Stage::Extraction).await {
                    warn!(ticket_id = %id, error = %e, "background extraction failed to run");
                }
            });
        }

        Ok(created)
    }

    /// Run one stage for a ticket, synchronously.
    ///
    /// Returns the updated document. A stage whose work failed is still
    /// an `Ok`: the failure is recorded in the stage record and the
    /// ticket moves to `error`. `Err` means the stage never ran at all
    /// (unknown ticket, lost lease race, routing precondition).
    pub async fn trigger_stage(
        &self,
        ticket_id: &str,
        stage: Stage,
    ) -> Result<Ticket, OrchestratorError> {
        let ticket = self.store.get(ticket_id)?;

        if stage == Stage::InvoiceProcessing {
            self.check_invoice_eligibility(&ticket)?;
        }

        // The soft lease: only one caller wins this transition, and a
        // loser has mutated nothing.
        self.store
            .transition_status(ticket_id, stage.input_status(), stage.running_status())?;
        info!(ticket_id, stage = stage.as_str(), "stage started");

        let started = Instant::now();
        let outcome = match stage {
            Stage::Extraction => self.run_extraction(&ticket).await,
            Stage::AiProcessing => self.run_enrichment(&ticket).await,
            Stage::InvoiceProcessing => self.run_invoice(&ticket).await,
        };

        let elapsed = started.elapsed();
        metrics::STAGE_DURATION_SECONDS
            .with_label_values(&[stage.as_str()])
            .observe(elapsed.as_secs_f64());

        match outcome {
            StageOutcome::Completed(overlay) => {
                self.store.put_partial(ticket_id, overlay)?;
                self.store
                    .transition_status(ticket_id, stage.running_status(), stage.completed_status())?;
                metrics::STAGE_EXECUTIONS
                    .with_label_values(&[stage.as_str(), "completed"])
                    .inc();
                info!(
                    ticket_id,
                    stage = stage.as_str(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "stage completed"
                );
            }
            StageOutcome::Failed(overlay, message) => {
                self.store.put_partial(ticket_id, overlay)?;
                self.store
                    .transition_status(ticket_id, stage.running_status(), TicketStatus::Error)?;
                metrics::STAGE_EXECUTIONS
                    .with_label_values(&[stage.as_str(), "error"])
                    .inc();
                warn!(
                    ticket_id,
                    stage = stage.as_str(),
                    error = %message,
                    "stage failed"
                );
            }
        }

        Ok(self.store.get(ticket_id)?)
    }

    /// Reset the failed stage of an errored ticket back to pending.
    ///
    /// The innermost errored record decides which stage failed, scanning
    /// invoice, then ai, then extraction. The reset clears the stage
    /// payload with explicit nulls and moves the ticket back to that
    /// stage's input status. Attachments are kept, so extraction can
    /// rerun on the original upload.
    pub async fn reprocess(&self, ticket_id: &str) -> Result<Ticket, OrchestratorError> {
        let ticket = self.store.get(ticket_id)?;
        if ticket.status != TicketStatus::Error {
            return Err(TicketError::invalid_status(
                ticket_id,
                ticket.status,
                TicketStatus::Error,
            )
            .into());
        }

        let stage = failed_stage(&ticket).ok_or_else(|| {
            OrchestratorError::Precondition(
                "ticket is in error but no stage record is marked errored".to_string(),
            )
        })?;

        self.store.put_partial(ticket_id, reset_overlay(stage))?;
        self.store
            .transition_status(ticket_id, TicketStatus::Error, stage.input_status())?;
        info!(
            ticket_id,
            stage = stage.as_str(),
            "failed stage reset for reprocessing"
        );

        Ok(self.store.get(ticket_id)?)
    }

    /// Remove a ticket and its stored attachment files.
    pub async fn delete(&self, ticket_id: &str) -> Result<Ticket, OrchestratorError> {
        let ticket = self.store.delete(ticket_id)?;
        self.attachments.delete_all(ticket_id).await?;
        metrics::TICKETS_DELETED.inc();
        info!(ticket_id, "ticket deleted");
        Ok(ticket)
    }

    /// Stage 3 runs only for tickets enrichment routed to it.
    fn check_invoice_eligibility(&self, ticket: &Ticket) -> Result<(), OrchestratorError> {
        if ticket.invoice_processing.status == StageStatus::Skipped {
            return Err(OrchestratorError::Precondition(format!(
                "invoice processing was skipped for ticket {}",
                ticket.ticket_id
            )));
        }
        match ticket.ai_processing.next_action {
            Some(NextAction::InvoiceProcessing) => Ok(()),
            Some(other) => Err(OrchestratorError::Precondition(format!(
                "ticket {} was routed to '{}', not invoice processing",
                ticket.ticket_id, other
            ))),
            None => Err(OrchestratorError::Precondition(format!(
                "ticket {} has no enrichment routing decision yet",
                ticket.ticket_id
            ))),
        }
    }

    async fn run_extraction(&self, ticket: &Ticket) -> StageOutcome {
        let Some(attachment) = ticket.first_attachment() else {
            let message = ExtractionError::NoAttachment.to_string();
            let record = extraction_error_record(&message);
            return StageOutcome::Failed(json!({ "extraction": record }), message);
        };

        let record = match self.attachments.load(attachment).await {
            Ok(bytes) => {
                self.engine
                    .run(ticket.raw.extraction_method, &attachment.filename, &bytes)
                    .await
            }
            Err(e) => extraction_error_record(&format!("attachment unreadable: {e}")),
        };

        let overlay = json!({ "extraction": record });
        if record.status == StageStatus::Completed {
            StageOutcome::Completed(overlay)
        } else {
            let message = record
                .error_message
                .unwrap_or_else(|| "extraction failed".to_string());
            StageOutcome::Failed(overlay, message)
        }
    }

    async fn run_enrichment(&self, ticket: &Ticket) -> StageOutcome {
        let started = Instant::now();
        match self.processor.enrich(ticket).await {
            Ok(outcome) => {
                let routed_on = outcome.next_action == NextAction::InvoiceProcessing;
                let record = AiProcessingRecord {
                    status: StageStatus::Completed,
                    completed_at: Some(Utc::now()),
                    processing_time_ms: Some(started.elapsed().as_millis() as u64),
                    agent_name: Some(outcome.agent_name),
                    agent_version: Some(outcome.agent_version),
                    standardized_codes: outcome.standardized_codes,
                    summary: outcome.summary,
                    next_action: Some(outcome.next_action),
                    flags: outcome.flags,
                    confidence: outcome.confidence,
                    simulated: outcome.simulated,
                    error_message: None,
                };

                // Record stage 3's fate alongside the routing decision:
                // skipped unless enrichment sent the ticket there.
                let invoice_marker = if routed_on { "pending" } else { "skipped" };
                StageOutcome::Completed(json!({
                    "aiProcessing": record,
                    "invoiceProcessing": { "status": invoice_marker },
                }))
            }
            Err(e) => stage_failure("aiProcessing", started, e.to_string()),
        }
    }

    async fn run_invoice(&self, ticket: &Ticket) -> StageOutcome {
        let started = Instant::now();
        match self.processor.process_invoice(ticket).await {
            Ok(outcome) => {
                let record = InvoiceProcessingRecord {
                    status: StageStatus::Completed,
                    completed_at: Some(Utc::now()),
                    processing_time_ms: Some(started.elapsed().as_millis() as u64),
                    agent_name: Some(outcome.agent_name),
                    agent_version: Some(outcome.agent_version),
                    validations: outcome.validations,
                    payment_submission: outcome.payment_submission,
                    errors: outcome.errors,
                    simulated: outcome.simulated,
                    error_message: None,
                };
                StageOutcome::Completed(json!({ "invoiceProcessing": record }))
            }
            Err(e) => stage_failure("invoiceProcessing", started, e.to_string()),
        }
    }
}

enum StageOutcome {
    /// Overlay to merge before advancing the status.
    Completed(Value),
    /// Overlay to merge before moving to `error`, plus the message.
    Failed(Value, String),
}

fn stage_failure(record_key: &str, started: Instant, message: String) -> StageOutcome {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    let record = json!({
        "status": "error",
        "completedAt": Utc::now(),
        "processingTimeMs": elapsed_ms,
        "errorMessage": message,
    });

    let mut overlay = serde_json::Map::new();
    overlay.insert(record_key.to_string(), record);
    StageOutcome::Failed(Value::Object(overlay), message)
}

fn extraction_error_record(message: &str) -> ExtractionRecord {
    ExtractionRecord {
        status: StageStatus::Error,
        completed_at: Some(Utc::now()),
        error_message: Some(message.to_string()),
        ..Default::default()
    }
}

/// Innermost errored stage record wins.
fn failed_stage(ticket: &Ticket) -> Option<Stage> {
    if ticket.invoice_processing.status == StageStatus::Error {
        Some(Stage::InvoiceProcessing)
    } else if ticket.ai_processing.status == StageStatus::Error {
        Some(Stage::AiProcessing)
    } else if ticket.extraction.status == StageStatus::Error {
        Some(Stage::Extraction)
    } else {
        None
    }
}

/// Explicit nulls so the deep merge clears the old payload instead of
/// preserving it.
fn reset_overlay(stage: Stage) -> Value {
    match stage {
        Stage::Extraction => json!({
            "extraction": {
                "status": "pending",
                "completedAt": null,
                "processingTimeMs": null,
                "extractionMethod": null,
                "basicMetadata": null,
                "invoice": null,
                "errorMessage": null,
            }
        }),
        Stage::AiProcessing => json!({
            "aiProcessing": {
                "status": "pending",
                "completedAt": null,
                "processingTimeMs": null,
                "agentName": null,
                "agentVersion": null,
                "standardizedCodes": null,
                "summary": null,
                "nextAction": null,
                "flags": [],
                "confidence": null,
                "simulated": false,
                "errorMessage": null,
            }
        }),
        Stage::InvoiceProcessing => json!({
            "invoiceProcessing": {
                "status": "pending",
                "completedAt": null,
                "processingTimeMs": null,
                "agentName": null,
                "agentVersion": null,
                "validations": null,
                "paymentSubmission": null,
                "errors": [],
                "simulated": false,
                "errorMessage": null,
            }
        }),
    }
}

fn generate_ticket_id() -> String {
    let year = Utc::now().format("%Y");
    let digits = uuid::Uuid::new_v4().as_u128() % 100_000_000;
    format!("DCK-{year}-{digits:08}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::{InvoiceProcessingRecord, RawTicket};

    #[test]
    fn test_generated_ids_have_the_ticket_shape() {
        let id = generate_ticket_id();
        let parts: Vec<&str> = id.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "DCK");
        assert_eq!(parts[1].len(), 4);
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));

        assert_ne!(generate_ticket_id(), generate_ticket_id());
    }

    #[test]
    fn test_failed_stage_prefers_the_innermost_record() {
        let mut ticket = Ticket::new("DCK-2026-00000001", RawTicket::new("t"));
        assert_eq!(failed_stage(&ticket), None);

        ticket.extraction.status = StageStatus::Error;
        assert_eq!(failed_stage(&ticket), Some(Stage::Extraction));

        ticket.ai_processing.status = StageStatus::Error;
        assert_eq!(failed_stage(&ticket), Some(Stage::AiProcessing));

        ticket.invoice_processing.status = StageStatus::Error;
        assert_eq!(failed_stage(&ticket), Some(Stage::InvoiceProcessing));
    }

    #[test]
    fn test_reset_overlay_clears_every_payload_field() {
        // Applying the ai reset over a fully populated record must leave
        // a plain pending record.
        let populated = AiProcessingRecord {
            status: StageStatus::Error,
            completed_at: Some(Utc::now()),
            processing_time_ms: Some(120),
            agent_name: Some("agent".to_string()),
            agent_version: Some("1.0".to_string()),
            standardized_codes: None,
            summary: Some("failed".to_string()),
            next_action: Some(NextAction::ManualReview),
            flags: vec!["AMOUNT_DISCREPANCY".to_string()],
            confidence: Some(0.85),
            simulated: true,
            error_message: Some("boom".to_string()),
        };

        let mut doc = serde_json::to_value(&populated).unwrap();
        let overlay = reset_overlay(Stage::AiProcessing);
        crate::ticket::deep_merge(&mut doc, overlay["aiProcessing"].clone());

        let reset: AiProcessingRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(reset, AiProcessingRecord::default());
    }

    #[test]
    fn test_reset_overlay_clears_invoice_payload() {
        let populated = InvoiceProcessingRecord {
            status: StageStatus::Error,
            error_message: Some("processor unavailable".to_string()),
            errors: vec!["vendor requires approval before payment".to_string()],
            simulated: true,
            ..Default::default()
        };

        let mut doc = serde_json::to_value(&populated).unwrap();
        let overlay = reset_overlay(Stage::InvoiceProcessing);
        crate::ticket::deep_merge(&mut doc, overlay["invoiceProcessing"].clone());

        let reset: InvoiceProcessingRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(reset, InvoiceProcessingRecord::default());
    }
}
