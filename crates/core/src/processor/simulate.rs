//! Local simulation of the two remote stages.
//!
//! Deterministic: the outcome is a pure function of the ticket document,
//! the code-mappings table, and the calendar date. Every payload it
//! produces carries `simulated: true` so operators can tell fallback
//! results from remote ones.

use chrono::{Duration, NaiveDate, Utc};

use super::mappings::CodeMappings;
use super::types::{EnrichmentOutcome, InvoiceOutcome};
use crate::ticket::{
    InvoiceFields, NextAction, PaymentSubmission, StandardizedCodes, Ticket, ValidationResults,
};

/// Totals at or above this route to budget approval and block
/// auto-payment.
pub const BUDGET_APPROVAL_THRESHOLD: f64 = 100_000.0;
/// Totals at or above this are rejected outright by validation.
pub const MAX_PAYABLE_TOTAL: f64 = 500_000.0;

const ENRICHMENT_AGENT: &str = "docket-enrichment-sim";
const PAYMENT_AGENT: &str = "docket-payment-sim";

/// Produces stage outcomes without any remote call.
#[derive(Debug, Clone)]
pub struct SimulationProcessor {
    mappings: CodeMappings,
}

impl SimulationProcessor {
    pub fn new(mappings: CodeMappings) -> Self {
        Self { mappings }
    }

    /// Stage 2: assign standardized codes and route the ticket.
    ///
    /// The ladder is ordered; the first matching rung decides:
    /// unapproved vendor, amount discrepancy, hazardous material,
    /// budget threshold, past due, clean.
    pub fn enrich_outcome(&self, ticket: &Ticket) -> EnrichmentOutcome {
        let invoice = ticket.extraction.invoice.clone().unwrap_or_default();
        let vendor = self
            .mappings
            .vendor(invoice.vendor_name.as_deref().unwrap_or(""));

        let mut flags: Vec<String> = Vec::new();
        let (next_action, confidence) = if !vendor.approved {
            flags.push("UNAPPROVED_VENDOR".to_string());
            (NextAction::VendorApproval, 0.78)
        } else if self.amount_discrepancy(&invoice) {
            flags.push("AMOUNT_DISCREPANCY".to_string());
            flags.push("MANUAL_REVIEW_REQUIRED".to_string());
            (NextAction::ManualReview, 0.85)
        } else if invoice.is_hazardous() {
            flags.push("HAZARDOUS".to_string());
            flags.push("EHS_REVIEW_REQUIRED".to_string());
            (NextAction::ManualReview, 0.95)
        } else if invoice.total_amount >= BUDGET_APPROVAL_THRESHOLD {
            flags.push("BUDGET_APPROVAL_REQUIRED".to_string());
            (NextAction::BudgetApproval, 0.95)
        } else if is_past_due(&invoice) {
            flags.push("PAST_DUE".to_string());
            flags.push("EXPEDITED_PAYMENT".to_string());
            (NextAction::InvoiceProcessing, 0.95)
        } else {
            (NextAction::InvoiceProcessing, 0.95)
        };

        let codes = self.standardize(&invoice, &vendor.vendor_code);
        let summary = build_summary(&invoice, &flags, next_action);

        EnrichmentOutcome {
            agent_name: ENRICHMENT_AGENT.to_string(),
            agent_version: env!("CARGO_PKG_VERSION").to_string(),
            standardized_codes: Some(codes),
            summary: Some(summary),
            next_action,
            flags,
            confidence: Some(confidence),
            simulated: true,
        }
    }

    /// Stage 3: run the five validations; submit payment only when all
    /// pass.
    pub fn invoice_outcome(&self, ticket: &Ticket) -> InvoiceOutcome {
        let invoice = ticket.extraction.invoice.clone().unwrap_or_default();
        let vendor = self
            .mappings
            .vendor(invoice.vendor_name.as_deref().unwrap_or(""));

        let (validations, errors) = validate(&invoice, vendor.approved);
        let payment_submission = validations
            .all_passed()
            .then(|| build_payment(&ticket.ticket_id, &invoice));

        InvoiceOutcome {
            agent_name: PAYMENT_AGENT.to_string(),
            agent_version: env!("CARGO_PKG_VERSION").to_string(),
            validations: Some(validations),
            payment_submission,
            errors,
            simulated: true,
        }
    }

    fn standardize(&self, invoice: &InvoiceFields, vendor_code: &str) -> StandardizedCodes {
        let mut product_codes = Vec::new();
        let mut category: Option<String> = None;

        for item in &invoice.line_items {
            let Some(code) = item.product_code.as_deref() else {
                continue;
            };
            let product = self.mappings.product(code);
            if category.is_none() {
                category = Some(product.category.clone());
            }
            if !product_codes.contains(&product.standard_code) {
                product_codes.push(product.standard_code);
            }
        }

        let department = self.mappings.department_for(category.as_deref().unwrap_or(""));

        StandardizedCodes {
            vendor_code: vendor_code.to_string(),
            product_codes,
            department_code: department.department_code,
            cost_center: department.cost_center,
        }
    }

    /// Line sums that disagree with the stated subtotal by more than a
    /// cent (both present), or a unit price outside the product's
    /// expected range.
    fn amount_discrepancy(&self, invoice: &InvoiceFields) -> bool {
        let line_sum = invoice.line_item_sum();
        if line_sum > 0.0 && invoice.subtotal > 0.0 && (line_sum - invoice.subtotal).abs() > 0.01 {
            return true;
        }

        invoice.line_items.iter().any(|item| {
            item.product_code
                .as_deref()
                .and_then(|code| self.mappings.product(code).expected_price_range)
                .is_some_and(|range| item.unit_price < range.min || item.unit_price > range.max)
        })
    }
}

fn parse_date(date: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date?, "%Y-%m-%d").ok()
}

fn is_past_due(invoice: &InvoiceFields) -> bool {
    parse_date(invoice.due_date.as_deref())
        .is_some_and(|due| due < Utc::now().date_naive())
}

fn invoice_number_valid(number: Option<&str>) -> bool {
    match number {
        Some(n) if !n.is_empty() => {
            n.starts_with("INV-") || n.starts_with("DC-") || n.starts_with("FRT-") || n.len() > 5
        }
        _ => false,
    }
}

fn validate(invoice: &InvoiceFields, vendor_approved: bool) -> (ValidationResults, Vec<String>) {
    let validations = ValidationResults {
        invoice_number_valid: invoice_number_valid(invoice.invoice_number.as_deref()),
        amount_correct: invoice.total_amount > 0.0 && invoice.total_amount < MAX_PAYABLE_TOTAL,
        due_date_valid: parse_date(invoice.due_date.as_deref()).is_some(),
        vendor_approved,
        budget_available: invoice.total_amount < BUDGET_APPROVAL_THRESHOLD,
    };

    let mut errors = Vec::new();
    if !validations.invoice_number_valid {
        errors.push("invoice number missing or malformed".to_string());
    }
    if !validations.amount_correct {
        errors.push("total amount outside payable range".to_string());
    }
    if !validations.due_date_valid {
        errors.push("due date missing or unparseable".to_string());
    }
    if !validations.vendor_approved {
        errors.push("vendor requires approval before payment".to_string());
    }
    if !validations.budget_available {
        errors.push("total exceeds auto-payment budget".to_string());
    }

    (validations, errors)
}

/// Payment id is derived from the ticket id, so resubmitting the same
/// ticket on the same day produces the same id.
fn build_payment(ticket_id: &str, invoice: &InvoiceFields) -> PaymentSubmission {
    let now = Utc::now();
    let digest = md5::compute(ticket_id.as_bytes());
    let digits = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) % 100_000;

    let days = if is_past_due(invoice) { 1 } else { 3 };
    let expected = (now + Duration::days(days)).format("%Y-%m-%d").to_string();

    PaymentSubmission {
        submitted: true,
        payment_id: Some(format!("PAY-{}-{:05}", now.format("%Y%m%d"), digits)),
        submitted_at: Some(now),
        expected_payment_date: Some(expected),
        payment_method: Some("ACH Transfer".to_string()),
        status: "submitted".to_string(),
    }
}

fn build_summary(invoice: &InvoiceFields, flags: &[String], next_action: NextAction) -> String {
    let number = invoice.invoice_number.as_deref().unwrap_or("(unnumbered)");
    let vendor = invoice.vendor_name.as_deref().unwrap_or("unknown vendor");
    let mut summary = format!(
        "Invoice {number} from {vendor} for ${}.",
        format_amount(invoice.total_amount)
    );

    if !invoice.line_items.is_empty() {
        let names: Vec<&str> = invoice
            .line_items
            .iter()
            .take(3)
            .map(|item| item.description.as_str())
            .collect();
        summary.push_str(&format!(" Items: {}", names.join(", ")));
        let extra = invoice.line_items.len().saturating_sub(3);
        if extra > 0 {
            summary.push_str(&format!(" (+{extra} more)"));
        }
        summary.push('.');
    }

    if !flags.is_empty() {
        summary.push_str(&format!(" Flags: {}.", flags.join(", ")));
    }
    summary.push_str(&format!(" Routed to {next_action}."));
    summary
}

fn format_amount(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let units = (cents / 100).abs();
    let frac = (cents % 100).abs();

    let digits = units.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if cents < 0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac:02}")
}
