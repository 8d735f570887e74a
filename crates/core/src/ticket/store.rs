//! Ticket storage trait and error types.

use serde_json::Value;
use thiserror::Error;

use crate::ticket::{Ticket, TicketStatus, TicketSummary};

/// Error type for ticket storage operations.
#[derive(Debug, Error)]
pub enum TicketError {
    /// No document with this ticket id.
    #[error("ticket not found: {0}")]
    NotFound(String),

    /// The ticket is not in the status an operation requires. Doubles as
    /// the losing side of a conditional status transition.
    #[error("ticket {ticket_id} is '{current}', operation requires '{expected}'")]
    InvalidStatus {
        ticket_id: String,
        current: String,
        expected: String,
    },

    /// The partial update cannot be applied to the stored document.
    #[error("cannot merge into ticket {ticket_id}: {reason}")]
    MergeConflict { ticket_id: String, reason: String },

    /// Underlying storage failure.
    #[error("database error: {0}")]
    Database(String),
}

impl TicketError {
    pub(crate) fn invalid_status(
        ticket_id: &str,
        current: TicketStatus,
        expected: TicketStatus,
    ) -> Self {
        TicketError::InvalidStatus {
            ticket_id: ticket_id.to_string(),
            current: current.as_str().to_string(),
            expected: expected.as_str().to_string(),
        }
    }
}

/// Filter for listing tickets.
#[derive(Debug, Clone)]
pub struct TicketFilter {
    /// Filter by pipeline status.
    pub status: Option<TicketStatus>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl Default for TicketFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl TicketFilter {
    pub fn new() -> Self {
        Self {
            status: None,
            limit: 100,
            offset: 0,
        }
    }

    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Storage backend for ticket documents.
///
/// Implementations persist the whole document as JSON and expose the
/// merge and conditional-transition primitives the orchestrator builds
/// its guarantees on. All methods are synchronous and expected to be
/// fast; document reads and writes hold the connection only briefly.
pub trait TicketStore: Send + Sync {
    /// Persist a new document. Fails with [`TicketError::Database`] when
    /// the ticket id already exists.
    fn create(&self, ticket: &Ticket) -> Result<Ticket, TicketError>;

    /// Fetch a document by ticket id.
    fn get(&self, ticket_id: &str) -> Result<Ticket, TicketError>;

    /// Deep-merge a partial update into the stored document and return
    /// the merged result. Refreshes `updatedAt`. Keys absent from
    /// `partial` are left untouched; explicit nulls clear fields.
    fn put_partial(&self, ticket_id: &str, partial: Value) -> Result<Ticket, TicketError>;

    /// Atomically move a ticket from `from` to `to`. Returns
    /// [`TicketError::InvalidStatus`] when the ticket is no longer in
    /// `from` (somebody else won the race) without mutating anything.
    fn transition_status(
        &self,
        ticket_id: &str,
        from: TicketStatus,
        to: TicketStatus,
    ) -> Result<(), TicketError>;

    /// List summaries matching the filter, newest first.
    fn list(&self, filter: &TicketFilter) -> Result<Vec<TicketSummary>, TicketError>;

    /// Count tickets matching the filter.
    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError>;

    /// Summaries of every ticket in one status, bounded by `limit`.
    fn scan_by_status(
        &self,
        status: TicketStatus,
        limit: i64,
    ) -> Result<Vec<TicketSummary>, TicketError>;

    /// Summaries of every stored ticket. Aggregation input.
    fn scan_all(&self) -> Result<Vec<TicketSummary>, TicketError>;

    /// Remove a document. Returns the deleted ticket.
    fn delete(&self, ticket_id: &str) -> Result<Ticket, TicketError>;
}
