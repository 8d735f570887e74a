//! Stateless dashboard aggregation.
//!
//! Metrics are recomputed from stored ticket summaries on every call;
//! nothing here caches or watches the store.

use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::ticket::{NextAction, StageStatus, TicketError, TicketStatus, TicketStore, TicketSummary};

/// Aggregated pipeline health snapshot.
///
/// Stage averages are `None` (JSON `null`) when no ticket has completed
/// that stage yet, so consumers can tell "no data" from "instant".
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_tickets: u64,
    /// Counts for all eight statuses, zero-filled.
    pub tickets_by_status: BTreeMap<String, u64>,
    pub avg_extraction_time_ms: Option<f64>,
    pub avg_ai_processing_time_ms: Option<f64>,
    pub avg_invoice_processing_time_ms: Option<f64>,
    /// Sum of the stage averages that have samples.
    pub avg_total_pipeline_ms: Option<f64>,
    /// Tickets that reached a terminal success, over all tickets.
    pub success_rate: f64,
    pub tickets_processed_today: u64,
    pub payment_submitted_count: u64,
    pub manual_review_count: u64,
    pub error_count: u64,
}

/// Compute dashboard metrics from every ticket in the store.
pub fn compute_metrics(store: &dyn TicketStore) -> Result<DashboardMetrics, TicketError> {
    let summaries = store.scan_all()?;
    Ok(aggregate(&summaries))
}

fn aggregate(summaries: &[TicketSummary]) -> DashboardMetrics {
    let mut tickets_by_status: BTreeMap<String, u64> = TicketStatus::ALL
        .iter()
        .map(|status| (status.as_str().to_string(), 0))
        .collect();

    let today = Utc::now().date_naive();
    let mut succeeded = 0u64;
    let mut tickets_processed_today = 0u64;
    let mut payment_submitted_count = 0u64;
    let mut manual_review_count = 0u64;

    let mut extraction = StageSamples::default();
    let mut ai_processing = StageSamples::default();
    let mut invoice_processing = StageSamples::default();

    for summary in summaries {
        *tickets_by_status
            .entry(summary.status.as_str().to_string())
            .or_insert(0) += 1;

        extraction.record(summary.extraction_status, summary.extraction_time_ms);
        ai_processing.record(summary.ai_processing_status, summary.ai_processing_time_ms);
        invoice_processing.record(
            summary.invoice_processing_status,
            summary.invoice_processing_time_ms,
        );

        if is_success(summary) {
            succeeded += 1;
        }
        if summary.created_at.date_naive() == today {
            tickets_processed_today += 1;
        }
        if summary.payment_submitted {
            payment_submitted_count += 1;
        }
        if summary.next_action == Some(NextAction::ManualReview) {
            manual_review_count += 1;
        }
    }

    let total_tickets = summaries.len() as u64;
    let success_rate = if total_tickets == 0 {
        0.0
    } else {
        succeeded as f64 / total_tickets as f64
    };

    let avg_extraction_time_ms = extraction.average();
    let avg_ai_processing_time_ms = ai_processing.average();
    let avg_invoice_processing_time_ms = invoice_processing.average();
    let stage_averages = [
        avg_extraction_time_ms,
        avg_ai_processing_time_ms,
        avg_invoice_processing_time_ms,
    ];
    let avg_total_pipeline_ms = if stage_averages.iter().all(Option::is_none) {
        None
    } else {
        Some(stage_averages.iter().flatten().sum())
    };

    let error_count = tickets_by_status
        .get(TicketStatus::Error.as_str())
        .copied()
        .unwrap_or(0);

    DashboardMetrics {
        total_tickets,
        tickets_by_status,
        avg_extraction_time_ms,
        avg_ai_processing_time_ms,
        avg_invoice_processing_time_ms,
        avg_total_pipeline_ms,
        success_rate,
        tickets_processed_today,
        payment_submitted_count,
        manual_review_count,
        error_count,
    }
}

/// Terminal success: invoice processed, or enrichment routed the ticket
/// away from invoicing and it parked at `ai_processed`.
fn is_success(summary: &TicketSummary) -> bool {
    match summary.status {
        TicketStatus::InvoiceProcessed => true,
        TicketStatus::AiProcessed => summary.invoice_processing_status == StageStatus::Skipped,
        _ => false,
    }
}

/// Running average input for one stage.
#[derive(Debug, Default)]
struct StageSamples {
    total_ms: u64,
    count: u32,
}

impl StageSamples {
    /// Completed stages with a non-zero duration count as samples.
    fn record(&mut self, status: StageStatus, time_ms: Option<u64>) {
        if status != StageStatus::Completed {
            return;
        }
        if let Some(ms) = time_ms.filter(|ms| *ms > 0) {
            self.total_ms += ms;
            self.count += 1;
        }
    }

    fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total_ms as f64 / f64::from(self.count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::{RawTicket, SqliteTicketStore, Ticket, TicketPriority};

    fn summary(id: &str, status: TicketStatus) -> TicketSummary {
        TicketSummary {
            ticket_id: id.to_string(),
            title: format!("ticket {id}"),
            status,
            priority: TicketPriority::Normal,
            submitter_name: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            extraction_status: StageStatus::Pending,
            ai_processing_status: StageStatus::Pending,
            invoice_processing_status: StageStatus::Pending,
            extraction_time_ms: None,
            ai_processing_time_ms: None,
            invoice_processing_time_ms: None,
            next_action: None,
            payment_submitted: false,
        }
    }

    #[test]
    fn test_empty_store_yields_zeroes_and_nulls() {
        let metrics = aggregate(&[]);

        assert_eq!(metrics.total_tickets, 0);
        assert_eq!(metrics.tickets_by_status.len(), 8);
        assert!(metrics.tickets_by_status.values().all(|count| *count == 0));
        assert_eq!(metrics.avg_extraction_time_ms, None);
        assert_eq!(metrics.avg_total_pipeline_ms, None);
        assert_eq!(metrics.success_rate, 0.0);
        assert_eq!(metrics.error_count, 0);
    }

    #[test]
    fn test_null_averages_serialize_as_json_null() {
        let json = serde_json::to_value(aggregate(&[])).unwrap();
        assert!(json["avgExtractionTimeMs"].is_null());
        assert!(json["avgTotalPipelineMs"].is_null());
        assert_eq!(json["successRate"], 0.0);
        assert_eq!(json["ticketsByStatus"]["ingested"], 0);
    }

    #[test]
    fn test_stage_averages_ignore_incomplete_and_zero_samples() {
        let mut fast = summary("DCK-2026-00000001", TicketStatus::Extracted);
        fast.extraction_status = StageStatus::Completed;
        fast.extraction_time_ms = Some(100);

        let mut slow = summary("DCK-2026-00000002", TicketStatus::Extracted);
        slow.extraction_status = StageStatus::Completed;
        slow.extraction_time_ms = Some(300);

        // Completed but clocked at zero: not a sample.
        let mut instant = summary("DCK-2026-00000003", TicketStatus::Extracted);
        instant.extraction_status = StageStatus::Completed;
        instant.extraction_time_ms = Some(0);

        // Errored stage carries a duration that must not count.
        let mut failed = summary("DCK-2026-00000004", TicketStatus::Error);
        failed.extraction_status = StageStatus::Error;
        failed.extraction_time_ms = Some(9_000);

        let metrics = aggregate(&[fast, slow, instant, failed]);
        assert_eq!(metrics.avg_extraction_time_ms, Some(200.0));
        assert_eq!(metrics.avg_ai_processing_time_ms, None);
        assert_eq!(metrics.avg_total_pipeline_ms, Some(200.0));
        assert_eq!(metrics.error_count, 1);
    }

    #[test]
    fn test_pipeline_average_sums_available_stages() {
        let mut done = summary("DCK-2026-00000005", TicketStatus::InvoiceProcessed);
        done.extraction_status = StageStatus::Completed;
        done.extraction_time_ms = Some(120);
        done.ai_processing_status = StageStatus::Completed;
        done.ai_processing_time_ms = Some(80);
        done.invoice_processing_status = StageStatus::Completed;
        done.invoice_processing_time_ms = Some(50);

        let metrics = aggregate(&[done]);
        assert_eq!(metrics.avg_total_pipeline_ms, Some(250.0));
    }

    #[test]
    fn test_success_rate_counts_skipped_invoice_as_terminal() {
        let mut paid = summary("DCK-2026-00000006", TicketStatus::InvoiceProcessed);
        paid.payment_submitted = true;

        let mut routed_away = summary("DCK-2026-00000007", TicketStatus::AiProcessed);
        routed_away.invoice_processing_status = StageStatus::Skipped;

        // ai_processed with invoicing still pending is not terminal.
        let awaiting_invoice = summary("DCK-2026-00000008", TicketStatus::AiProcessed);
        let errored = summary("DCK-2026-00000009", TicketStatus::Error);

        let metrics = aggregate(&[paid, routed_away, awaiting_invoice, errored]);
        assert_eq!(metrics.success_rate, 0.5);
        assert_eq!(metrics.payment_submitted_count, 1);
        assert_eq!(metrics.tickets_by_status["ai_processed"], 2);
    }

    #[test]
    fn test_manual_review_counted_from_next_action() {
        let mut flagged = summary("DCK-2026-00000010", TicketStatus::AiProcessed);
        flagged.next_action = Some(NextAction::ManualReview);
        flagged.invoice_processing_status = StageStatus::Skipped;

        let metrics = aggregate(&[flagged]);
        assert_eq!(metrics.manual_review_count, 1);
        assert_eq!(metrics.success_rate, 1.0);
    }

    #[test]
    fn test_compute_metrics_reads_through_the_store() {
        let store = SqliteTicketStore::in_memory().unwrap();
        store
            .create(&Ticket::new("DCK-2026-00000011", RawTicket::new("a")))
            .unwrap();
        store
            .create(&Ticket::new("DCK-2026-00000012", RawTicket::new("b")))
            .unwrap();

        let metrics = compute_metrics(&store).unwrap();
        assert_eq!(metrics.total_tickets, 2);
        assert_eq!(metrics.tickets_by_status["ingested"], 2);
        assert_eq!(metrics.tickets_processed_today, 2);
        assert_eq!(metrics.success_rate, 0.0);
    }
}
