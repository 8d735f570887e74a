//! Types for the stage orchestrator.

use thiserror::Error;

use crate::ticket::{AttachmentError, RawTicket, TicketError, TicketStatus};

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Submission payload rejected before anything was persisted.
    #[error("invalid ticket: {0}")]
    Validation(String),

    /// A stage trigger the ticket's current routing does not allow.
    #[error("stage precondition failed: {0}")]
    Precondition(String),

    /// Ticket store error; includes not-found and lost status races.
    #[error("ticket store error: {0}")]
    Store(#[from] TicketError),

    /// Attachment store error.
    #[error("attachment store error: {0}")]
    Attachment(#[from] AttachmentError),
}

/// The three pipeline stages an operator can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extraction,
    AiProcessing,
    InvoiceProcessing,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extraction => "extraction",
            Stage::AiProcessing => "ai_processing",
            Stage::InvoiceProcessing => "invoice_processing",
        }
    }

    /// Status a ticket must hold for this stage to start.
    pub fn input_status(&self) -> TicketStatus {
        match self {
            Stage::Extraction => TicketStatus::Ingested,
            Stage::AiProcessing => TicketStatus::Extracted,
            Stage::InvoiceProcessing => TicketStatus::AiProcessed,
        }
    }

    /// Status held while the stage runs; the soft lease.
    pub fn running_status(&self) -> TicketStatus {
        match self {
            Stage::Extraction => TicketStatus::Extracting,
            Stage::AiProcessing => TicketStatus::AiProcessing,
            Stage::InvoiceProcessing => TicketStatus::InvoiceProcessing,
        }
    }

    /// Status after a successful run.
    pub fn completed_status(&self) -> TicketStatus {
        match self {
            Stage::Extraction => TicketStatus::Extracted,
            Stage::AiProcessing => TicketStatus::AiProcessed,
            Stage::InvoiceProcessing => TicketStatus::InvoiceProcessed,
        }
    }
}

/// A new attachment uploaded with a submission.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Everything needed to open a ticket.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub raw: RawTicket,
    pub attachment: Option<NewAttachment>,
}

impl NewTicket {
    pub fn new(raw: RawTicket) -> Self {
        Self {
            raw,
            attachment: None,
        }
    }

    pub fn with_attachment(
        mut self,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.attachment = Some(NewAttachment {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        });
        self
    }
}
