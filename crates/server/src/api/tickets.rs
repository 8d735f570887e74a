//! Ticket API handlers.
//!
//! Intake, listing, per-stage views, stage triggers, reprocess, and
//! deletion. Handlers validate the HTTP surface and delegate pipeline
//! semantics to the orchestrator.

use axum::{
    extract::{multipart::Field, Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use docket_core::{
    AttachmentInfo, ExtractionMethod, NewTicket, OrchestratorError, RawTicket, Stage, Ticket,
    TicketError, TicketFilter, TicketPriority, TicketStatus, TicketSummary,
};

use crate::state::AppState;

/// Largest accepted attachment. Checked against the decoded part so the
/// rejection happens before any document or file is created.
pub(crate) const MAX_ATTACHMENT_BYTES: usize = 50 * 1024 * 1024;

/// Default page size for ticket listings
const DEFAULT_PAGE_SIZE: i64 = 20;

/// Maximum page size for ticket listings
const MAX_PAGE_SIZE: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response for ticket creation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketResponse {
    pub ticket_id: String,
    pub status: TicketStatus,
    pub message: String,
    pub attachment: Option<AttachmentInfo>,
    pub extraction_queued: bool,
}

/// Query parameters for listing tickets
#[derive(Debug, Deserialize)]
pub struct ListTicketsParams {
    /// 1-based page number
    pub page: Option<i64>,
    /// Page size, capped at 100
    pub page_size: Option<i64>,
    /// Filter by pipeline status
    pub status: Option<String>,
}

/// Response for listing tickets
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketListResponse {
    pub tickets: Vec<TicketSummary>,
    pub total_count: i64,
    pub page: i64,
    pub page_size: i64,
}

/// Response for reprocessing a ticket
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReprocessResponse {
    pub ticket_id: String,
    pub status: TicketStatus,
    pub message: String,
    pub extraction_queued: bool,
}

/// Response for deleting a ticket
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTicketResponse {
    pub ticket_id: String,
    pub message: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map orchestrator errors onto the HTTP surface: validation is the
/// caller's fault, precondition and status races are conflicts, and
/// storage failures are internal.
fn error_response(e: OrchestratorError) -> ApiError {
    let status = match &e {
        OrchestratorError::Validation(_) => StatusCode::BAD_REQUEST,
        OrchestratorError::Precondition(_) => StatusCode::CONFLICT,
        OrchestratorError::Store(TicketError::NotFound(_)) => StatusCode::NOT_FOUND,
        OrchestratorError::Store(TicketError::InvalidStatus { .. })
        | OrchestratorError::Store(TicketError::MergeConflict { .. }) => StatusCode::CONFLICT,
        OrchestratorError::Store(TicketError::Database(_)) | OrchestratorError::Attachment(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse { error: e.to_string() }))
}

fn store_error_response(e: TicketError) -> ApiError {
    error_response(OrchestratorError::Store(e))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/tickets
///
/// Submit a new ticket from a multipart form with an optional PDF
/// attachment. With auto extraction enabled and a file present, the
/// extraction stage runs in the background after the response.
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<CreateTicketResponse>), ApiError> {
    let mut title = String::new();
    let mut description = String::new();
    let mut tags: Vec<String> = Vec::new();
    let mut priority = TicketPriority::Normal;
    let mut submitter: Option<String> = None;
    let mut submitter_name: Option<String> = None;
    let mut submitter_department: Option<String> = None;
    let mut extraction_method = ExtractionMethod::Auto;
    let mut attachment: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart request: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "title" => title = read_text(field).await?,
            "description" => description = read_text(field).await?,
            "tags" => {
                // Comma-separated list
                tags = read_text(field)
                    .await?
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "priority" => {
                let text = read_text(field).await?;
                if !text.is_empty() {
                    priority = TicketPriority::parse(&text)
                        .ok_or_else(|| bad_request(format!("unknown priority '{text}'")))?;
                }
            }
            "submitter" => submitter = non_empty(read_text(field).await?),
            "submitter_name" => submitter_name = non_empty(read_text(field).await?),
            "submitter_department" => {
                submitter_department = non_empty(read_text(field).await?)
            }
            "extraction_method" => {
                let text = read_text(field).await?;
                if !text.is_empty() {
                    extraction_method = ExtractionMethod::parse(&text).ok_or_else(|| {
                        bad_request(format!("unknown extraction method '{text}'"))
                    })?;
                }
            }
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                if filename.is_empty() {
                    // Empty file input on the form
                    continue;
                }
                let content_type = field
                    .content_type()
                    .unwrap_or("application/pdf")
                    .to_string();
                if content_type != "application/pdf"
                    && content_type != "application/octet-stream"
                {
                    return Err(bad_request(format!(
                        "invalid file type '{content_type}', only PDF files are accepted"
                    )));
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("failed to read file: {e}")))?;
                if bytes.len() > MAX_ATTACHMENT_BYTES {
                    return Err(bad_request(format!(
                        "file too large ({} bytes), maximum is 50 MB",
                        bytes.len()
                    )));
                }
                attachment = Some((filename, content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let mut raw = RawTicket::new(title)
        .with_description(description)
        .with_tags(tags)
        .with_priority(priority)
        .with_extraction_method(extraction_method);
    raw.submitter = submitter;
    raw.submitter_name = submitter_name;
    raw.submitter_department = submitter_department;

    let mut new = NewTicket::new(raw);
    if let Some((filename, content_type, bytes)) = attachment {
        new = new.with_attachment(filename, content_type, bytes);
    }

    let extraction_queued =
        state.config().orchestrator.auto_extract && new.attachment.is_some();

    let ticket = state
        .orchestrator()
        .submit(new)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateTicketResponse {
            ticket_id: ticket.ticket_id.clone(),
            status: ticket.status,
            message: format!("Ticket {} created successfully.", ticket.ticket_id),
            attachment: ticket.first_attachment().cloned(),
            extraction_queued,
        }),
    ))
}

/// GET /api/v1/tickets
///
/// Paginated ticket summaries, optionally filtered by pipeline status.
pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTicketsParams>,
) -> Result<Json<TicketListResponse>, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let mut filter = TicketFilter::new()
        .with_limit(page_size)
        .with_offset((page - 1).saturating_mul(page_size));

    if let Some(ref status) = params.status {
        let parsed = TicketStatus::parse(status)
            .ok_or_else(|| bad_request(format!("unknown status '{status}'")))?;
        filter = filter.with_status(parsed);
    }

    let tickets = state.store().list(&filter).map_err(store_error_response)?;
    // Count ignores pagination, so the same filter works for the total
    let total_count = state.store().count(&filter).map_err(store_error_response)?;

    Ok(Json(TicketListResponse {
        tickets,
        total_count,
        page,
        page_size,
    }))
}

/// GET /api/v1/tickets/{id}
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    let ticket = state.store().get(&id).map_err(store_error_response)?;
    Ok(Json(ticket))
}

/// GET /api/v1/tickets/{id}/extraction
///
/// Stage 1 view: submission fields, attachments, and the extraction
/// record.
pub async fn get_extraction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let ticket = state.store().get(&id).map_err(store_error_response)?;
    Ok(Json(json!({
        "ticketId": ticket.ticket_id,
        "status": ticket.status,
        "raw": ticket.raw,
        "attachments": ticket.attachments,
        "extraction": ticket.extraction,
    })))
}

/// GET /api/v1/tickets/{id}/ai-processing
pub async fn get_ai_processing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let ticket = state.store().get(&id).map_err(store_error_response)?;
    Ok(Json(json!({
        "ticketId": ticket.ticket_id,
        "status": ticket.status,
        "aiProcessing": ticket.ai_processing,
    })))
}

/// GET /api/v1/tickets/{id}/invoice-processing
pub async fn get_invoice_processing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let ticket = state.store().get(&id).map_err(store_error_response)?;
    Ok(Json(json!({
        "ticketId": ticket.ticket_id,
        "status": ticket.status,
        "invoiceProcessing": ticket.invoice_processing,
    })))
}

/// POST /api/v1/tickets/{id}/process-ai
///
/// Run the AI processing stage synchronously and return the updated
/// document. A stage whose work failed still returns 200 with the
/// ticket at `error`; an `Err` means the stage never started.
pub async fn process_ai(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    let ticket = state
        .orchestrator()
        .trigger_stage(&id, Stage::AiProcessing)
        .await
        .map_err(error_response)?;
    Ok(Json(ticket))
}

/// POST /api/v1/tickets/{id}/process-invoice
///
/// Run the invoice processing stage synchronously. Rejected with 409
/// when the enrichment routing decision is missing or sent the ticket
/// elsewhere.
pub async fn process_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    let ticket = state
        .orchestrator()
        .trigger_stage(&id, Stage::InvoiceProcessing)
        .await
        .map_err(error_response)?;
    Ok(Json(ticket))
}

/// POST /api/v1/tickets/{id}/reprocess
///
/// Reset an errored ticket to the input status of its failed stage.
/// A ticket reset to `ingested` with an attachment gets extraction
/// re-run in the background; later stages wait for explicit triggers.
pub async fn reprocess_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ReprocessResponse>, ApiError> {
    let ticket = state
        .orchestrator()
        .reprocess(&id)
        .await
        .map_err(error_response)?;

    let extraction_queued =
        ticket.status == TicketStatus::Ingested && !ticket.attachments.is_empty();
    if extraction_queued {
        let orchestrator = state.orchestrator().clone();
        let ticket_id = ticket.ticket_id.clone();
        tokio::spawn(async move {
            if let Err(e) = orchestrator.trigger_stage(&ticket_id, Stage::Extraction).await {
                warn!(ticket_id = %ticket_id, error = %e, "background re-extraction failed to run");
            }
        });
    }

    Ok(Json(ReprocessResponse {
        ticket_id: ticket.ticket_id.clone(),
        status: ticket.status,
        message: format!("Ticket {} reset to '{}'.", ticket.ticket_id, ticket.status),
        extraction_queued,
    }))
}

/// DELETE /api/v1/tickets/{id}
///
/// Remove the document and its stored attachment files.
pub async fn delete_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteTicketResponse>, ApiError> {
    let ticket = state
        .orchestrator()
        .delete(&id)
        .await
        .map_err(error_response)?;
    Ok(Json(DeleteTicketResponse {
        ticket_id: ticket.ticket_id.clone(),
        message: format!("Ticket {} deleted.", ticket.ticket_id),
    }))
}

// ============================================================================
// Helpers
// ============================================================================

async fn read_text(field: Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| bad_request(format!("invalid multipart field: {e}")))
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
