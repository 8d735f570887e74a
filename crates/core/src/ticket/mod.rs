//! Ticket documents, storage, and attachment persistence.

mod attachments;
mod merge;
mod sqlite_store;
mod store;
mod types;

pub use attachments::{AttachmentError, FsAttachmentStore};
pub use merge::deep_merge;
pub use sqlite_store::SqliteTicketStore;
pub use store::{TicketError, TicketFilter, TicketStore};
pub use types::{
    AiProcessingRecord, AttachmentInfo, BasicMetadata, ConfidenceScores, ExtractionMethod,
    ExtractionRecord, InvoiceFields, InvoiceProcessingRecord, LineItem, NextAction,
    PaymentSubmission, RawTicket, StageStatus, StandardizedCodes, Ticket, TicketPriority,
    TicketStatus, TicketSummary, ValidationResults,
};
