//! Core ticket document types.
//!
//! A ticket is a single JSON document that accumulates the output of each
//! pipeline stage. Stage payloads use camelCase keys on the wire so the
//! stored document, the HTTP API, and the external stage processors all
//! speak one schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Status Types
// ============================================================================

/// Pipeline status of a ticket document.
///
/// Status flow:
/// ```text
/// ingested -> extracting -> extracted -> ai_processing -> ai_processed
///                                                             |
///                                         (next action permits v
///                                          invoice processing) invoice_processing
///                                                             |
///                                                             v
///                                                      invoice_processed
/// ```
///
/// Any in-flight status can fall to `error`. Reprocessing returns an
/// errored ticket to the failed stage's input status; there are no other
/// backward transitions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Submitted, nothing processed yet.
    Ingested,
    /// Extraction stage in flight.
    Extracting,
    /// Extraction committed.
    Extracted,
    /// Enrichment stage in flight.
    AiProcessing,
    /// Enrichment committed.
    AiProcessed,
    /// Invoice stage in flight.
    InvoiceProcessing,
    /// Invoice stage committed (terminal).
    InvoiceProcessed,
    /// A stage failed; the failing record carries the message.
    Error,
}

impl TicketStatus {
    /// All statuses, in pipeline order. Used for zero-filled aggregation.
    pub const ALL: [TicketStatus; 8] = [
        TicketStatus::Ingested,
        TicketStatus::Extracting,
        TicketStatus::Extracted,
        TicketStatus::AiProcessing,
        TicketStatus::AiProcessed,
        TicketStatus::InvoiceProcessing,
        TicketStatus::InvoiceProcessed,
        TicketStatus::Error,
    ];

    /// Returns the status as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Ingested => "ingested",
            TicketStatus::Extracting => "extracting",
            TicketStatus::Extracted => "extracted",
            TicketStatus::AiProcessing => "ai_processing",
            TicketStatus::AiProcessed => "ai_processed",
            TicketStatus::InvoiceProcessing => "invoice_processing",
            TicketStatus::InvoiceProcessed => "invoice_processed",
            TicketStatus::Error => "error",
        }
    }

    /// Parse a wire string back into a status.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == value)
    }

    /// Returns true while a stage holds the ticket (the soft lease).
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            TicketStatus::Extracting
                | TicketStatus::AiProcessing
                | TicketStatus::InvoiceProcessing
        )
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of an individual stage record inside the document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Not attempted yet.
    #[default]
    Pending,
    /// Stage ran and committed its payload.
    Completed,
    /// Stage will never run for this ticket (enrichment routed elsewhere).
    Skipped,
    /// Stage attempted and failed; `error_message` holds the cause.
    Error,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Completed => "completed",
            StageStatus::Skipped => "skipped",
            StageStatus::Error => "error",
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Submitter-assigned priority. Informational; does not affect ordering
/// of stage execution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    #[default]
    Normal,
    High,
    Urgent,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Normal => "normal",
            TicketPriority::High => "high",
            TicketPriority::Urgent => "urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "normal" => Some(TicketPriority::Normal),
            "high" => Some(TicketPriority::High),
            "urgent" => Some(TicketPriority::Urgent),
            _ => None,
        }
    }
}

/// Extraction strategy requested at submission time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Analyzer when an endpoint is configured, pattern rules otherwise.
    #[default]
    Auto,
    /// Deterministic text rules only.
    Pattern,
    /// Remote document analyzer only.
    Analyzer,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Auto => "auto",
            ExtractionMethod::Pattern => "pattern",
            ExtractionMethod::Analyzer => "analyzer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(ExtractionMethod::Auto),
            "pattern" => Some(ExtractionMethod::Pattern),
            "analyzer" => Some(ExtractionMethod::Analyzer),
            _ => None,
        }
    }
}

// ============================================================================
// Submission Types
// ============================================================================

/// Fields captured verbatim at submission. Immutable once the document
/// exists; stage merges never touch this object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawTicket {
    /// Human-readable title. The only mandatory submission field.
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default)]
    pub priority: TicketPriority,

    /// Submitter email or account id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitter: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitter_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitter_department: Option<String>,

    /// Which extraction strategy to use for this ticket.
    #[serde(default)]
    pub extraction_method: ExtractionMethod,
}

impl RawTicket {
    /// Create a submission with just a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            tags: Vec::new(),
            priority: TicketPriority::Normal,
            submitter: None,
            submitter_name: None,
            submitter_department: None,
            extraction_method: ExtractionMethod::Auto,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_priority(mut self, priority: TicketPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_submitter(
        mut self,
        submitter: impl Into<String>,
        name: impl Into<String>,
        department: impl Into<String>,
    ) -> Self {
        self.submitter = Some(submitter.into());
        self.submitter_name = Some(name.into());
        self.submitter_department = Some(department.into());
        self
    }

    pub fn with_extraction_method(mut self, method: ExtractionMethod) -> Self {
        self.extraction_method = method;
        self
    }
}

/// Descriptor of a stored attachment. The bytes live in the attachment
/// store under `content_ref`; the document only carries this record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInfo {
    pub filename: String,
    /// Path relative to the attachment root, `<ticket_id>/<filename>`.
    pub content_ref: String,
    pub content_type: String,
    pub size_bytes: u64,
    /// Hex SHA-256 of the stored bytes.
    pub sha256: String,
}

// ============================================================================
// Extraction Types
// ============================================================================

/// Per-field confidence scores reported by an extraction strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceScores {
    #[serde(default)]
    pub invoice_number: f64,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub vendor_name: f64,
    #[serde(default)]
    pub overall: f64,
}

/// A single invoice line item. Zero amounts mean "not extracted"; the
/// engine recomputes them from quantity and unit price when possible.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_code: Option<String>,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default)]
    pub amount: f64,
}

/// Structured fields produced by an extraction strategy. Both strategies
/// emit exactly this contract; `ExtractionRecord::extraction_method` says
/// which one produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_address: Option<String>,
    /// ISO date string as printed on the invoice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub po_number: Option<String>,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub tax_amount: f64,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_terms: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_scores: Option<ConfidenceScores>,
    /// Set when the document declares hazardous contents.
    #[serde(default)]
    pub hazardous_flag: bool,
    #[serde(default)]
    pub hazmat_surcharge: f64,
}

impl InvoiceFields {
    /// Sum of line item amounts, for cross-checking against the subtotal.
    pub fn line_item_sum(&self) -> f64 {
        self.line_items.iter().map(|item| item.amount).sum()
    }

    /// True when any hazard signal is present on the invoice.
    pub fn is_hazardous(&self) -> bool {
        if self.hazardous_flag || self.hazmat_surcharge > 0.0 {
            return true;
        }
        self.line_items.iter().any(|item| {
            let desc = item.description.to_lowercase();
            desc.contains("hazmat") || desc.contains("hazardous")
        })
    }
}

/// Strategy-independent facts about the source document. Recorded even
/// when the structured strategy fails.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BasicMetadata {
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub file_size_bytes: u64,
    #[serde(default)]
    pub file_size_display: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_creation_date: Option<String>,
    /// First 2,000 characters of extracted text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text_preview: Option<String>,
}

/// Extraction stage record. Written once by a successful (or failed)
/// extraction run; reset to pending only by reprocessing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRecord {
    #[serde(default)]
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    /// Name of the strategy that produced `invoice`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_metadata: Option<BasicMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice: Option<InvoiceFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

// ============================================================================
// Enrichment (AI Processing) Types
// ============================================================================

/// Routing decision produced by the enrichment stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    /// Clean invoice; eligible for the invoice stage.
    InvoiceProcessing,
    /// Discrepancy or hazard; a human must look.
    ManualReview,
    /// Vendor not in the approved registry.
    VendorApproval,
    /// Total exceeds the auto-approval budget.
    BudgetApproval,
}

impl NextAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NextAction::InvoiceProcessing => "invoice_processing",
            NextAction::ManualReview => "manual_review",
            NextAction::VendorApproval => "vendor_approval",
            NextAction::BudgetApproval => "budget_approval",
        }
    }
}

impl fmt::Display for NextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical codes assigned by the enrichment stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StandardizedCodes {
    pub vendor_code: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub product_codes: Vec<String>,
    pub department_code: String,
    pub cost_center: String,
}

/// Enrichment stage record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AiProcessingRecord {
    #[serde(default)]
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standardized_codes: Option<StandardizedCodes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<NextAction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// True when the payload came from the local simulation, not the
    /// remote processor.
    #[serde(default)]
    pub simulated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

// ============================================================================
// Invoice Processing Types
// ============================================================================

/// Outcome of the five invoice validations. Absent until the invoice
/// stage runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResults {
    pub invoice_number_valid: bool,
    pub amount_correct: bool,
    pub due_date_valid: bool,
    pub vendor_approved: bool,
    pub budget_available: bool,
}

impl ValidationResults {
    pub fn all_passed(&self) -> bool {
        self.invoice_number_valid
            && self.amount_correct
            && self.due_date_valid
            && self.vendor_approved
            && self.budget_available
    }
}

/// Payment submission outcome recorded by the invoice stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSubmission {
    #[serde(default)]
    pub submitted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    /// `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_payment_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    /// `submitted` or `not_submitted`.
    #[serde(default)]
    pub status: String,
}

/// Invoice stage record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceProcessingRecord {
    #[serde(default)]
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validations: Option<ValidationResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_submission: Option<PaymentSubmission>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default)]
    pub simulated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

// ============================================================================
// Ticket Document
// ============================================================================

/// The full ticket document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Same value as `ticket_id`; kept as a distinct field so the document
    /// round-trips through systems that expect an `id` key.
    pub id: String,

    /// Business key, `DCK-<year>-<8 digits>`.
    pub ticket_id: String,

    pub status: TicketStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub raw: RawTicket,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentInfo>,

    #[serde(default)]
    pub extraction: ExtractionRecord,

    #[serde(default)]
    pub ai_processing: AiProcessingRecord,

    #[serde(default)]
    pub invoice_processing: InvoiceProcessingRecord,
}

impl Ticket {
    /// Create a fresh document at `ingested` with all stage records pending.
    pub fn new(ticket_id: impl Into<String>, raw: RawTicket) -> Self {
        let ticket_id = ticket_id.into();
        let now = Utc::now();
        Self {
            id: ticket_id.clone(),
            ticket_id,
            status: TicketStatus::Ingested,
            created_at: now,
            updated_at: now,
            raw,
            attachments: Vec::new(),
            extraction: ExtractionRecord::default(),
            ai_processing: AiProcessingRecord::default(),
            invoice_processing: InvoiceProcessingRecord::default(),
        }
    }

    /// Terminal tickets accept no further stage triggers: either the
    /// invoice stage completed, or enrichment routed the ticket away from
    /// it and the invoice record is marked skipped.
    pub fn is_terminal(&self) -> bool {
        match self.status {
            TicketStatus::InvoiceProcessed => true,
            TicketStatus::AiProcessed => {
                self.invoice_processing.status == StageStatus::Skipped
            }
            _ => false,
        }
    }

    pub fn first_attachment(&self) -> Option<&AttachmentInfo> {
        self.attachments.first()
    }

    /// Flat projection used by listing and aggregation.
    pub fn summary(&self) -> TicketSummary {
        TicketSummary {
            ticket_id: self.ticket_id.clone(),
            title: self.raw.title.clone(),
            status: self.status,
            priority: self.raw.priority,
            submitter_name: self.raw.submitter_name.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            extraction_status: self.extraction.status,
            ai_processing_status: self.ai_processing.status,
            invoice_processing_status: self.invoice_processing.status,
            extraction_time_ms: self.extraction.processing_time_ms,
            ai_processing_time_ms: self.ai_processing.processing_time_ms,
            invoice_processing_time_ms: self.invoice_processing.processing_time_ms,
            next_action: self.ai_processing.next_action,
            payment_submitted: self
                .invoice_processing
                .payment_submission
                .as_ref()
                .map(|p| p.submitted)
                .unwrap_or(false),
        }
    }
}

/// Flat ticket projection for listings and dashboard aggregation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TicketSummary {
    pub ticket_id: String,
    pub title: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitter_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub extraction_status: StageStatus,
    pub ai_processing_status: StageStatus,
    pub invoice_processing_status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_processing_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_processing_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<NextAction>,
    #[serde(default)]
    pub payment_submitted: bool,
}
