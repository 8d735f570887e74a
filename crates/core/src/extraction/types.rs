//! Extraction strategy contract and error types.

use async_trait::async_trait;
use thiserror::Error;

use crate::ticket::InvoiceFields;

/// Error type for extraction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Ticket has no attachment to read.
    #[error("ticket has no attachment to extract from")]
    NoAttachment,

    /// The bytes do not parse as a document.
    #[error("unreadable document: {0}")]
    Unreadable(String),

    /// A strategy ran but could not produce fields.
    #[error("extraction strategy failed: {0}")]
    Strategy(String),

    /// The remote analyzer call failed.
    #[error("analyzer request failed: {0}")]
    Analyzer(String),
}

/// Source document handed to a strategy. `text` comes from the basic
/// pass; strategies that work on raw bytes ignore it.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub text: String,
}

impl SourceDocument {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>, text: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
            text: text.into(),
        }
    }
}

/// A structured-field extraction strategy.
///
/// Every strategy emits the same [`InvoiceFields`] contract; callers can
/// swap strategies without touching downstream stages.
#[async_trait]
pub trait InvoiceExtractor: Send + Sync {
    /// Strategy name recorded on the extraction record.
    fn name(&self) -> &'static str;

    async fn extract(&self, source: &SourceDocument) -> Result<InvoiceFields, ExtractionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ExtractionError::NoAttachment.to_string(),
            "ticket has no attachment to extract from"
        );
        assert_eq!(
            ExtractionError::Unreadable("bad xref".to_string()).to_string(),
            "unreadable document: bad xref"
        );
        assert_eq!(
            ExtractionError::Analyzer("connect refused".to_string()).to_string(),
            "analyzer request failed: connect refused"
        );
    }
}
