//! Extraction engine: basic pass plus a structured-field strategy.
//!
//! The engine never returns an error to its caller. Whatever happens,
//! it produces an [`ExtractionRecord`] describing the outcome, and the
//! orchestrator merges that record into the ticket document. An
//! unreadable file or a failed strategy is a completed run with
//! `status = error`, not a crashed one.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, warn};

use super::{basic, AnalyzerExtractor, ExtractionError, InvoiceExtractor, PatternExtractor};
use crate::config::ExtractionConfig;
use crate::metrics;
use crate::ticket::{ExtractionMethod, ExtractionRecord, InvoiceFields, StageStatus};

pub struct ExtractionEngine {
    pattern: PatternExtractor,
    analyzer: Option<AnalyzerExtractor>,
}

impl ExtractionEngine {
    pub fn new(config: &ExtractionConfig) -> Result<Self, ExtractionError> {
        let analyzer = match &config.analyzer_endpoint {
            Some(endpoint) => Some(AnalyzerExtractor::new(
                endpoint,
                config.analyzer_api_key.clone(),
                Duration::from_secs(config.timeout_secs),
            )?),
            None => None,
        };

        Ok(Self {
            pattern: PatternExtractor::new(),
            analyzer,
        })
    }

    /// Run extraction over a document and report the outcome as a
    /// stage record.
    pub async fn run(
        &self,
        method: ExtractionMethod,
        filename: &str,
        bytes: &[u8],
    ) -> ExtractionRecord {
        let started = Instant::now();

        let facts = match basic::inspect(bytes) {
            Ok(facts) => facts,
            Err(e) => {
                warn!(filename, error = %e, "document unreadable, extraction aborted");
                metrics::EXTRACTION_RUNS
                    .with_label_values(&["none", "unreadable"])
                    .inc();
                return failure_record(
                    started,
                    Some(basic::size_only_metadata(bytes)),
                    None,
                    e.to_string(),
                );
            }
        };

        let strategy = match self.strategy_for(method) {
            Ok(strategy) => strategy,
            Err(e) => {
                metrics::EXTRACTION_RUNS
                    .with_label_values(&[method.as_str(), "unavailable"])
                    .inc();
                return failure_record(started, Some(facts.metadata), None, e.to_string());
            }
        };

        let source = super::SourceDocument::new(filename, bytes.to_vec(), facts.text);
        debug!(filename, strategy = strategy.name(), "running extraction strategy");

        match strategy.extract(&source).await {
            Ok(mut invoice) => {
                correct_line_items(&mut invoice);
                metrics::EXTRACTION_RUNS
                    .with_label_values(&[strategy.name(), "ok"])
                    .inc();
                ExtractionRecord {
                    status: StageStatus::Completed,
                    completed_at: Some(Utc::now()),
                    processing_time_ms: Some(started.elapsed().as_millis() as u64),
                    extraction_method: Some(strategy.name().to_string()),
                    basic_metadata: Some(facts.metadata),
                    invoice: Some(invoice),
                    error_message: None,
                }
            }
            Err(e) => {
                warn!(filename, strategy = strategy.name(), error = %e, "extraction strategy failed");
                metrics::EXTRACTION_RUNS
                    .with_label_values(&[strategy.name(), "error"])
                    .inc();
                failure_record(
                    started,
                    Some(facts.metadata),
                    Some(strategy.name().to_string()),
                    e.to_string(),
                )
            }
        }
    }

    fn strategy_for(
        &self,
        method: ExtractionMethod,
    ) -> Result<&dyn InvoiceExtractor, ExtractionError> {
        match method {
            ExtractionMethod::Pattern => Ok(&self.pattern),
            ExtractionMethod::Analyzer => self
                .analyzer
                .as_ref()
                .map(|a| a as &dyn InvoiceExtractor)
                .ok_or_else(|| {
                    ExtractionError::Strategy(
                        "analyzer strategy requested but no analyzer endpoint is configured"
                            .to_string(),
                    )
                }),
            ExtractionMethod::Auto => Ok(self
                .analyzer
                .as_ref()
                .map(|a| a as &dyn InvoiceExtractor)
                .unwrap_or(&self.pattern)),
        }
    }
}

fn failure_record(
    started: Instant,
    basic_metadata: Option<crate::ticket::BasicMetadata>,
    extraction_method: Option<String>,
    error_message: String,
) -> ExtractionRecord {
    ExtractionRecord {
        status: StageStatus::Error,
        completed_at: Some(Utc::now()),
        processing_time_ms: Some(started.elapsed().as_millis() as u64),
        extraction_method,
        basic_metadata,
        invoice: None,
        error_message: Some(error_message),
    }
}

/// Rows that carried a quantity and unit price but no extended amount
/// get amount = quantity * unit price, rounded to cents.
fn correct_line_items(invoice: &mut InvoiceFields) {
    for item in &mut invoice.line_items {
        if item.amount == 0.0 && item.quantity > 0.0 && item.unit_price > 0.0 {
            item.amount = (item.quantity * item.unit_price * 100.0).round() / 100.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use crate::ticket::LineItem;

    fn pattern_only_engine() -> ExtractionEngine {
        ExtractionEngine::new(&ExtractionConfig::default()).unwrap()
    }

    fn item(quantity: f64, unit_price: f64, amount: f64) -> LineItem {
        LineItem {
            description: "part".to_string(),
            product_code: None,
            quantity,
            unit_price,
            amount,
        }
    }

    #[test]
    fn test_correct_line_items_fills_missing_amounts() {
        let mut invoice = InvoiceFields {
            line_items: vec![item(50.0, 150.0, 0.0), item(3.0, 9.99, 0.0)],
            ..Default::default()
        };
        correct_line_items(&mut invoice);

        assert_eq!(invoice.line_items[0].amount, 7_500.0);
        assert_eq!(invoice.line_items[1].amount, 29.97);
    }

    #[test]
    fn test_correct_line_items_keeps_existing_amounts() {
        // A stated amount wins even when it disagrees with qty * price.
        let mut invoice = InvoiceFields {
            line_items: vec![item(2.0, 10.0, 25.0), item(0.0, 10.0, 0.0)],
            ..Default::default()
        };
        correct_line_items(&mut invoice);

        assert_eq!(invoice.line_items[0].amount, 25.0);
        assert_eq!(invoice.line_items[1].amount, 0.0);
    }

    #[tokio::test]
    async fn test_run_completes_with_metadata_and_invoice() {
        let engine = pattern_only_engine();
        let pdf = fixtures::invoice_abc_pdf();

        let record = engine
            .run(ExtractionMethod::Auto, "invoice.pdf", &pdf)
            .await;

        assert_eq!(record.status, StageStatus::Completed);
        assert_eq!(record.extraction_method.as_deref(), Some("pattern"));
        assert!(record.completed_at.is_some());
        assert!(record.processing_time_ms.is_some());

        let metadata = record.basic_metadata.unwrap();
        assert_eq!(metadata.page_count, 1);
        assert_eq!(metadata.file_size_bytes, pdf.len() as u64);

        let invoice = record.invoice.unwrap();
        assert_eq!(invoice.invoice_number.as_deref(), Some("INV-2026-78432"));
        assert_eq!(invoice.total_amount, 13_531.25);
        assert_eq!(invoice.line_item_sum(), 12_500.0);
    }

    #[tokio::test]
    async fn test_run_on_unreadable_bytes_reports_error_with_size() {
        let engine = pattern_only_engine();
        let record = engine
            .run(ExtractionMethod::Auto, "garbage.pdf", b"not a pdf at all")
            .await;

        assert_eq!(record.status, StageStatus::Error);
        assert!(record.invoice.is_none());
        assert!(record.error_message.is_some());
        // Size facts survive even when the parse does not.
        assert_eq!(record.basic_metadata.unwrap().file_size_bytes, 16);
    }

    #[tokio::test]
    async fn test_run_analyzer_without_endpoint_reports_error() {
        let engine = pattern_only_engine();
        let pdf = fixtures::pdf_from_lines(&["INVOICE", "TOTAL DUE: $10.00"]);

        let record = engine
            .run(ExtractionMethod::Analyzer, "invoice.pdf", &pdf)
            .await;

        assert_eq!(record.status, StageStatus::Error);
        assert!(record
            .error_message
            .as_deref()
            .unwrap()
            .contains("no analyzer endpoint"));
        // The basic pass still ran.
        assert_eq!(record.basic_metadata.unwrap().page_count, 1);
    }

    #[tokio::test]
    async fn test_run_strategy_failure_keeps_basic_metadata() {
        let engine = pattern_only_engine();
        let pdf = fixtures::pdf_from_lines(&["meeting notes", "nothing invoice shaped"]);

        let record = engine.run(ExtractionMethod::Pattern, "notes.pdf", &pdf).await;

        assert_eq!(record.status, StageStatus::Error);
        assert_eq!(record.extraction_method.as_deref(), Some("pattern"));
        assert!(record.basic_metadata.is_some());
        assert!(record.invoice.is_none());
    }
}
