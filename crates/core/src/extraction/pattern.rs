//! Deterministic text-rule extraction strategy.
//!
//! Works entirely on the text recovered by the basic pass: labeled
//! scalar fields, dollar amounts next to their captions, and columnar
//! line-item rows keyed by product-code shape. Side-by-side header
//! columns come out of the text pass as a block of labels followed by
//! a block of values, so each labeled rule has a label-block fallback.
//! No network, no model; the same text always yields the same fields.

use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::{ExtractionError, InvoiceExtractor, SourceDocument};
use crate::ticket::{ConfidenceScores, InvoiceFields, LineItem};

static INVOICE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)invoice\s*(?:number|no\.?|#)\s*:?\s*([A-Z]{2,5}-[0-9]{4}-[0-9]{2,8})")
        .unwrap()
});
static INVOICE_NUMBER_BARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b((?:INV|DC|FRT)-[0-9]{4}-[0-9]{2,8})\b").unwrap());
static PO_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(PO-[0-9]{4}-[0-9]{2,6})\b").unwrap());
static INVOICE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)invoice\s+date\s*:?\s*([0-9]{4}-[0-9]{2}-[0-9]{2})").unwrap()
});
static DUE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)due\s+date\s*:?\s*([0-9]{4}-[0-9]{2}-[0-9]{2})").unwrap());
static SUBTOTAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)sub\s*total\s*:?\s*\$?\s*([0-9][0-9,]*\.?[0-9]{0,2})").unwrap()
});
static TAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)tax(?:\s+amount)?(?:\s*\([^)]*\))?\s*:?\s*\$?\s*([0-9][0-9,]*\.?[0-9]{0,2})")
        .unwrap()
});
static TOTAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)total\s+(?:due|amount)\s*:?\s*\$?\s*([0-9][0-9,]*\.?[0-9]{0,2})").unwrap()
});
static TOTAL_BARE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\btotal\s*:?\s*\$?\s*([0-9][0-9,]*\.?[0-9]{0,2})").unwrap()
});
static HAZMAT_SURCHARGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)hazmat\s+surcharge\s*:?\s*\$?\s*([0-9][0-9,]*\.?[0-9]{0,2})").unwrap()
});
static PAYMENT_TERMS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bnet[ -]?([0-9]{1,3})\b").unwrap());
static CURRENCY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(USD|EUR|GBP|CHF|CAD)\b").unwrap());
static VENDOR_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:vendor|from)\s*:\s*([^\n]+)").unwrap());
static DOLLAR_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\s*([0-9][0-9,]*\.?[0-9]{0,2})").unwrap());

/// Header labels rendered as a column block, values following in order.
const HEADER_LABELS: [&str; 4] = ["INVOICE NUMBER", "INVOICE DATE", "DUE DATE", "PO NUMBER"];

// Columnar rows: product code, description, quantity, unit price, and
// optionally the extended amount, separated by runs of whitespace.
static LINE_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([A-Z]{2,5}(?:-[A-Z0-9]+)+)\s{2,}(.+?)\s{2,}([0-9]+(?:\.[0-9]+)?)\s+\$?([0-9][0-9,]*\.[0-9]{2})\s+\$?([0-9][0-9,]*\.[0-9]{2})\s*$",
    )
    .unwrap()
});
static LINE_ITEM_NO_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([A-Z]{2,5}(?:-[A-Z0-9]+)+)\s{2,}(.+?)\s{2,}([0-9]+(?:\.[0-9]+)?)\s+\$?([0-9][0-9,]*\.[0-9]{2})\s*$",
    )
    .unwrap()
});

/// Strategy that extracts fields from text with fixed rules.
#[derive(Debug, Clone, Default)]
pub struct PatternExtractor;

impl PatternExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_from_text(&self, text: &str) -> Result<InvoiceFields, ExtractionError> {
        let lines: Vec<&str> = text.lines().collect();
        let header = columnar_values(&lines, &HEADER_LABELS);

        let invoice_number = capture(&INVOICE_NUMBER, text)
            .or_else(|| capture(&INVOICE_NUMBER_BARE, text))
            .or_else(|| header[0].clone());
        let invoice_date = capture(&INVOICE_DATE, text)
            .or_else(|| header[1].as_deref().map(normalize_date));
        let due_date =
            capture(&DUE_DATE, text).or_else(|| header[2].as_deref().map(normalize_date));
        let po_number = capture(&PO_NUMBER, text).or_else(|| header[3].clone());

        let vendor_name = capture(&VENDOR_LABEL, text)
            .map(|v| v.trim().to_string())
            .or_else(|| vendor_before_invoice(text));
        let vendor_address = vendor_name
            .as_deref()
            .and_then(|vendor| address_after(text, vendor))
            .or_else(|| address_after_header(&lines));

        let subtotal = labeled_amount(&SUBTOTAL, text, &lines, "SUBTOTAL");
        let tax_amount = labeled_amount(&TAX, text, &lines, "TAX");
        let total_amount = {
            let labeled = amount(&TOTAL, text);
            if labeled > 0.0 {
                labeled
            } else {
                labeled_amount(&TOTAL_BARE, text, &lines, "TOTAL DUE")
            }
        };
        let hazmat_surcharge = labeled_amount(&HAZMAT_SURCHARGE, text, &lines, "HAZMAT SURCHARGE");

        let line_items = extract_line_items(text);

        let lower = text.to_lowercase();
        let hazardous_flag = lower.contains("hazardous") || lower.contains("hazmat");

        let payment_terms = capture(&PAYMENT_TERMS, text).map(|days| format!("NET-{days}"));
        let currency = capture(&CURRENCY, text)
            .or_else(|| (total_amount > 0.0 && text.contains('$')).then(|| "USD".to_string()));

        if invoice_number.is_none()
            && vendor_name.is_none()
            && total_amount == 0.0
            && line_items.is_empty()
        {
            return Err(ExtractionError::Strategy(
                "no recognizable invoice fields in document text".to_string(),
            ));
        }

        let mut scores = ConfidenceScores::default();
        if invoice_number.is_some() {
            scores.invoice_number = 0.93;
        }
        if total_amount > 0.0 {
            scores.total_amount = 0.96;
        }
        if vendor_name.is_some() {
            scores.vendor_name = 0.91;
        }
        scores.overall = overall_confidence(&scores);

        Ok(InvoiceFields {
            invoice_number,
            vendor_name,
            vendor_address,
            invoice_date,
            due_date,
            po_number,
            subtotal,
            tax_amount,
            total_amount,
            currency,
            payment_terms,
            line_items,
            confidence_scores: Some(scores),
            hazardous_flag,
            hazmat_surcharge,
        })
    }
}

#[async_trait]
impl InvoiceExtractor for PatternExtractor {
    fn name(&self) -> &'static str {
        "pattern"
    }

    async fn extract(&self, source: &SourceDocument) -> Result<InvoiceFields, ExtractionError> {
        self.extract_from_text(&source.text)
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn amount(re: &Regex, text: &str) -> f64 {
    capture(re, text)
        .and_then(|raw| raw.replace(',', "").parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Labeled amount with a line-scan fallback for renders that separate
/// the label from its `$` value (dot leaders, value on the next line).
fn labeled_amount(re: &Regex, text: &str, lines: &[&str], label: &str) -> f64 {
    let labeled = amount(re, text);
    if labeled > 0.0 {
        labeled
    } else {
        amount_near(lines, label)
    }
}

/// Find the `$` amount on the label's own line, else on the line after.
fn amount_near(lines: &[&str], label: &str) -> f64 {
    let needle = label.to_lowercase();
    for (i, line) in lines.iter().enumerate() {
        if !line.to_lowercase().contains(&needle) {
            continue;
        }
        for candidate in [Some(*line), lines.get(i + 1).copied()]
            .into_iter()
            .flatten()
        {
            if let Some(c) = DOLLAR_AMOUNT.captures(candidate) {
                if let Ok(value) = c[1].replace(',', "").parse::<f64>() {
                    return value;
                }
            }
        }
    }
    0.0
}

/// Map a column-block header onto its values.
///
/// Side-by-side columns render as the labels grouped on consecutive
/// lines, then the values grouped in the same order:
///
/// ```text
/// INVOICE NUMBER
/// INVOICE DATE
/// INV-2026-78432
/// 2026-01-22
/// ```
///
/// The values start right after the last label found; each label maps
/// to the value at its offset within the block. Labels absent from the
/// text stay `None`.
fn columnar_values(lines: &[&str], labels: &[&str]) -> Vec<Option<String>> {
    let mut found: Vec<(usize, usize)> = Vec::new();
    for (line_idx, line) in lines.iter().enumerate() {
        let stripped = line.trim();
        for (label_idx, label) in labels.iter().enumerate() {
            if stripped.eq_ignore_ascii_case(label)
                && !found.iter().any(|&(l, _)| l == label_idx)
            {
                found.push((label_idx, line_idx));
                break;
            }
        }
    }

    let mut values = vec![None; labels.len()];
    let Some(last_label_line) = found.iter().map(|&(_, i)| i).max() else {
        return values;
    };

    found.sort_by_key(|&(_, line_idx)| line_idx);
    for (offset, &(label_idx, _)) in found.iter().enumerate() {
        if let Some(line) = lines.get(last_label_line + 1 + offset) {
            let value = line.trim();
            if !value.is_empty() {
                values[label_idx] = Some(value.to_string());
            }
        }
    }
    values
}

/// Column-block dates arrive as rendered ("January 22, 2026"); bring
/// them to ISO form. Unparseable strings pass through untouched.
fn normalize_date(raw: &str) -> String {
    for fmt in ["%B %d, %Y", "%B %d %Y", "%m/%d/%Y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    raw.to_string()
}

/// Mean of the non-zero per-field scores, rounded to four decimals.
fn overall_confidence(scores: &ConfidenceScores) -> f64 {
    let present: Vec<f64> = [
        scores.invoice_number,
        scores.total_amount,
        scores.vendor_name,
    ]
    .into_iter()
    .filter(|s| *s > 0.0)
    .collect();

    if present.is_empty() {
        return 0.0;
    }
    let mean = present.iter().sum::<f64>() / present.len() as f64;
    (mean * 10_000.0).round() / 10_000.0
}

/// Invoices usually open with the vendor letterhead; take the first
/// non-empty line, as long as it sits before the first `INVOICE` token.
fn vendor_before_invoice(text: &str) -> Option<String> {
    let idx = text.find("INVOICE")?;
    let candidate = text[..idx]
        .split('\n')
        .map(str::trim)
        .find(|line| !line.is_empty())?;

    (candidate.len() <= 80).then(|| candidate.to_string())
}

/// The line right after the vendor line is its street address when it
/// carries a house number.
fn address_after(text: &str, vendor: &str) -> Option<String> {
    let mut lines = text.lines();
    for line in lines.by_ref() {
        if line.trim() == vendor {
            break;
        }
    }
    let next = lines.map(str::trim).find(|line| !line.is_empty())?;
    (next.chars().any(|c| c.is_ascii_digit()) && next.len() <= 120)
        .then(|| next.to_string())
}

/// Column-block renders put the address right after the `INVOICE`
/// header instead of under the letterhead line.
fn address_after_header(lines: &[&str]) -> Option<String> {
    let header = lines.iter().position(|line| line.trim() == "INVOICE")?;
    let next = lines[header + 1..]
        .iter()
        .map(|line| line.trim())
        .find(|line| !line.is_empty())?;
    (next.chars().any(|c| c.is_ascii_digit()) && next.len() <= 120)
        .then(|| next.to_string())
}

fn extract_line_items(text: &str) -> Vec<LineItem> {
    let mut items = Vec::new();
    for line in text.lines() {
        let line = line.trim_end();
        if let Some(c) = LINE_ITEM.captures(line) {
            items.push(LineItem {
                product_code: Some(c[1].to_string()),
                description: c[2].trim().to_string(),
                quantity: c[3].parse().unwrap_or(0.0),
                unit_price: c[4].replace(',', "").parse().unwrap_or(0.0),
                amount: c[5].replace(',', "").parse().unwrap_or(0.0),
            });
        } else if let Some(c) = LINE_ITEM_NO_AMOUNT.captures(line) {
            items.push(LineItem {
                product_code: Some(c[1].to_string()),
                description: c[2].trim().to_string(),
                quantity: c[3].parse().unwrap_or(0.0),
                unit_price: c[4].replace(',', "").parse().unwrap_or(0.0),
                amount: 0.0,
            });
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVOICE_ABC_TEXT: &str = "\
ABC Industrial Supplies
123 Industrial Way, Houston, TX 77001

INVOICE

INVOICE NUMBER: INV-2026-78432
INVOICE DATE: 2026-01-22
DUE DATE: 2026-02-21
PO NUMBER: PO-2026-1150

VLV-4200-IND  Industrial Grade Valve Assembly (Model V-4200)  50  $150.00  $7,500.00
SK-HP-4200  High Pressure Seal Kit  40  $125.00  $5,000.00

SUBTOTAL: $12,500.00
TAX (8.25%): $1,031.25
TOTAL DUE: $13,531.25

PAYMENT TERMS: NET-30
";

    // Same invoice in the column-block render: header labels grouped,
    // then the values in the same order, amounts on their own lines.
    const INVOICE_ABC_COLUMNAR_TEXT: &str = "\
ABC Industrial Supplies
INVOICE
123 Industrial Way, Houston, TX 77001
INVOICE NUMBER
INVOICE DATE
DUE DATE
PO NUMBER
INV-2026-78432
January 22, 2026
February 21, 2026
PO-2026-1150
Subtotal:
$12,500.00
Tax (8.25%):
$1,031.25
TOTAL DUE:
$13,531.25
Payment Terms: NET-30
";

    fn extract(text: &str) -> InvoiceFields {
        PatternExtractor::new().extract_from_text(text).unwrap()
    }

    #[test]
    fn test_columnar_header_block_yields_labeled_fields() {
        let fields = extract(INVOICE_ABC_COLUMNAR_TEXT);

        assert_eq!(fields.invoice_number.as_deref(), Some("INV-2026-78432"));
        assert_eq!(fields.invoice_date.as_deref(), Some("2026-01-22"));
        assert_eq!(fields.due_date.as_deref(), Some("2026-02-21"));
        assert_eq!(fields.po_number.as_deref(), Some("PO-2026-1150"));
        assert_eq!(fields.vendor_name.as_deref(), Some("ABC Industrial Supplies"));
        assert_eq!(
            fields.vendor_address.as_deref(),
            Some("123 Industrial Way, Houston, TX 77001")
        );
        assert_eq!(fields.subtotal, 12_500.0);
        assert_eq!(fields.tax_amount, 1_031.25);
        assert_eq!(fields.total_amount, 13_531.25);
        assert_eq!(fields.payment_terms.as_deref(), Some("NET-30"));
    }

    #[test]
    fn test_columnar_block_with_missing_label_leaves_field_empty() {
        let text = "\
INVOICE
INVOICE NUMBER
DUE DATE
INV-2026-11111
2026-03-01
TOTAL DUE: $42.00
";
        let fields = extract(text);
        assert_eq!(fields.invoice_number.as_deref(), Some("INV-2026-11111"));
        assert_eq!(fields.due_date.as_deref(), Some("2026-03-01"));
        assert!(fields.invoice_date.is_none());
        assert!(fields.po_number.is_none());
    }

    #[test]
    fn test_amount_found_past_dot_leaders() {
        let fields = extract("INVOICE\nTOTAL DUE ......... $99.00\n");
        assert_eq!(fields.total_amount, 99.0);
    }

    #[test]
    fn test_amount_on_line_after_wordy_label() {
        let fields = extract("INVOICE\nSubtotal (before adjustments)\n$100.00\nTOTAL DUE: $108.25\n");
        assert_eq!(fields.subtotal, 100.0);
        assert_eq!(fields.total_amount, 108.25);
    }

    #[test]
    fn test_extracts_all_scalar_fields() {
        let fields = extract(INVOICE_ABC_TEXT);

        assert_eq!(fields.invoice_number.as_deref(), Some("INV-2026-78432"));
        assert_eq!(fields.vendor_name.as_deref(), Some("ABC Industrial Supplies"));
        assert_eq!(
            fields.vendor_address.as_deref(),
            Some("123 Industrial Way, Houston, TX 77001")
        );
        assert_eq!(fields.invoice_date.as_deref(), Some("2026-01-22"));
        assert_eq!(fields.due_date.as_deref(), Some("2026-02-21"));
        assert_eq!(fields.po_number.as_deref(), Some("PO-2026-1150"));
        assert_eq!(fields.subtotal, 12_500.0);
        assert_eq!(fields.tax_amount, 1_031.25);
        assert_eq!(fields.total_amount, 13_531.25);
        assert_eq!(fields.payment_terms.as_deref(), Some("NET-30"));
        assert_eq!(fields.currency.as_deref(), Some("USD"));
        assert!(!fields.hazardous_flag);
    }

    #[test]
    fn test_extracts_line_items_with_amounts() {
        let fields = extract(INVOICE_ABC_TEXT);

        assert_eq!(fields.line_items.len(), 2);
        let valve = &fields.line_items[0];
        assert_eq!(valve.product_code.as_deref(), Some("VLV-4200-IND"));
        assert_eq!(
            valve.description,
            "Industrial Grade Valve Assembly (Model V-4200)"
        );
        assert_eq!(valve.quantity, 50.0);
        assert_eq!(valve.unit_price, 150.0);
        assert_eq!(valve.amount, 7_500.0);

        let seals = &fields.line_items[1];
        assert_eq!(seals.product_code.as_deref(), Some("SK-HP-4200"));
        assert_eq!(seals.amount, 5_000.0);
        assert_eq!(fields.line_item_sum(), 12_500.0);
    }

    #[test]
    fn test_line_item_row_without_amount_stays_zero() {
        let text = "INVOICE\nVLV-4200-IND  Valve Assembly  50  $150.00\nTOTAL DUE: $7,500.00\n";
        let fields = extract(text);

        assert_eq!(fields.line_items.len(), 1);
        assert_eq!(fields.line_items[0].quantity, 50.0);
        assert_eq!(fields.line_items[0].unit_price, 150.0);
        // Amount recovery is the engine's correction step, not the
        // strategy's.
        assert_eq!(fields.line_items[0].amount, 0.0);
    }

    #[test]
    fn test_confidence_scores_reflect_found_fields() {
        let fields = extract(INVOICE_ABC_TEXT);
        let scores = fields.confidence_scores.unwrap();

        assert_eq!(scores.invoice_number, 0.93);
        assert_eq!(scores.total_amount, 0.96);
        assert_eq!(scores.vendor_name, 0.91);
        assert_eq!(scores.overall, 0.9333);
    }

    #[test]
    fn test_partial_document_scores_only_found_fields() {
        let fields = extract("INVOICE\nTOTAL DUE: $99.00\n");
        let scores = fields.confidence_scores.unwrap();

        assert_eq!(scores.invoice_number, 0.0);
        assert_eq!(scores.total_amount, 0.96);
        assert_eq!(scores.overall, 0.96);
    }

    #[test]
    fn test_vendor_label_form() {
        let fields = extract("VENDOR: Acme Corp\nTOTAL DUE: $10.00\n");
        assert_eq!(fields.vendor_name.as_deref(), Some("Acme Corp"));
    }

    #[test]
    fn test_bare_invoice_number_without_label() {
        let fields = extract("Reference DC-2026-00417\nTOTAL DUE: $10.00\n");
        assert_eq!(fields.invoice_number.as_deref(), Some("DC-2026-00417"));
    }

    #[test]
    fn test_hazmat_markers() {
        let text = "\
Gulf Coast Chemical
INVOICE NUMBER: INV-2026-00900
HAZARDOUS MATERIALS - HANDLE WITH CARE
HAZMAT SURCHARGE: $75.00
TOTAL DUE: $1,575.00
";
        let fields = extract(text);
        assert!(fields.hazardous_flag);
        assert_eq!(fields.hazmat_surcharge, 75.0);
        assert!(fields.is_hazardous());
    }

    #[test]
    fn test_payment_terms_variants() {
        assert_eq!(
            extract("INVOICE\nTOTAL DUE: $1.00\nTerms: Net 15\n")
                .payment_terms
                .as_deref(),
            Some("NET-15")
        );
        assert_eq!(
            extract("INVOICE\nTOTAL DUE: $1.00\nNET-45\n")
                .payment_terms
                .as_deref(),
            Some("NET-45")
        );
    }

    #[test]
    fn test_unrecognizable_text_is_a_strategy_error() {
        let err = PatternExtractor::new()
            .extract_from_text("quarterly newsletter, nothing to see")
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Strategy(_)));
    }

    #[test]
    fn test_subtotal_not_mistaken_for_total() {
        let fields = extract("INVOICE\nSUBTOTAL: $100.00\nTOTAL DUE: $108.25\n");
        assert_eq!(fields.subtotal, 100.0);
        assert_eq!(fields.total_amount, 108.25);
    }

    #[tokio::test]
    async fn test_extractor_trait_surface() {
        let extractor = PatternExtractor::new();
        assert_eq!(extractor.name(), "pattern");

        let source = SourceDocument::new("invoice.pdf", Vec::new(), INVOICE_ABC_TEXT);
        let fields = extractor.extract(&source).await.unwrap();
        assert_eq!(fields.total_amount, 13_531.25);
    }
}
