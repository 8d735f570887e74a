//! Stage processors for the two externally-owned pipeline stages.
//!
//! This module provides the `ProxyProcessor` which fronts:
//! - AI processing: code standardization and routing (stage 2)
//! - Invoice processing: validation and payment submission (stage 3)
//!
//! Each stage may be served by a remote HTTP processor or by the local
//! deterministic simulation; the proxy decides per call based on
//! configuration and the fallback policy.
//!
//! # Example
//!
//! ```ignore
//! use docket_core::processor::{CodeMappings, ProxyProcessor, StageProcessor};
//!
//! // No endpoints configured: both stages simulate locally.
//! let processor = ProxyProcessor::local(CodeMappings::builtin());
//!
//! let enrichment = processor.enrich(&ticket).await?;
//! println!("routed to {}", enrichment.next_action);
//!
//! let invoice = processor.process_invoice(&ticket).await?;
//! if let Some(payment) = invoice.payment_submission {
//!     println!("payment {} submitted", payment.payment_id.unwrap());
//! }
//! ```

mod mappings;
mod proxy;
mod remote;
mod simulate;
mod types;

pub use mappings::{
    CodeMappings, DepartmentMapping, MappingsError, PriceRange, ProductMapping, VendorMapping,
};
pub use proxy::ProxyProcessor;
pub use simulate::{SimulationProcessor, BUDGET_APPROVAL_THRESHOLD, MAX_PAYABLE_TOTAL};
pub use types::{
    EnrichmentOutcome, FallbackPolicy, InvoiceOutcome, ProcessorError, StageProcessor,
};
