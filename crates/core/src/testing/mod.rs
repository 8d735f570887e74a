//! Testing utilities and mock implementations for E2E tests.
//!
//! This module provides a mock stage processor and document fixtures,
//! allowing full pipeline tests without real agent infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use docket_core::testing::{fixtures, MockStageProcessor};
//!
//! let processor = MockStageProcessor::new();
//! processor.set_next_action(NextAction::ManualReview).await;
//!
//! let pdf = fixtures::invoice_abc_pdf();
//!
//! // Use in an orchestrator...
//! ```

mod mock_processor;

pub use mock_processor::MockStageProcessor;

/// Test fixtures and helper functions.
pub mod fixtures {
    use lopdf::{dictionary, Document, Object, Stream};

    /// Build a one-page PDF whose extracted text reproduces `lines`.
    ///
    /// Every line gets its own text block, so `lopdf::Document::extract_text`
    /// returns one output line per input line. The Info dictionary carries a
    /// fixed creation date, `2026-01-22T09:30:15`.
    pub fn pdf_from_lines(lines: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.new_object_id();
        let resources_id = doc.new_object_id();
        let content_id = doc.new_object_id();
        let page_id = doc.new_object_id();

        doc.objects.insert(
            font_id,
            Object::Dictionary(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Courier",
            }),
        );

        doc.objects.insert(
            resources_id,
            Object::Dictionary(dictionary! {
                "Font" => dictionary! {
                    "F1" => font_id,
                },
            }),
        );

        let mut content = String::new();
        let mut y = 700i32;
        for line in lines {
            content.push_str(&format!(
                "BT /F1 12 Tf 50 {y} Td ({}) Tj ET\n",
                escape_literal(line)
            ));
            y -= 20;
        }
        let content_stream = Stream::new(dictionary! {}, content.into_bytes());
        doc.objects
            .insert(content_id, Object::Stream(content_stream));

        doc.objects.insert(
            page_id,
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => resources_id,
                "Contents" => content_id,
            }),
        );

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let info_id = doc.add_object(dictionary! {
            "Producer" => Object::string_literal("docket test fixtures"),
            "CreationDate" => Object::string_literal("D:20260122093015+00'00'"),
        });
        doc.trailer.set("Info", info_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("fixture PDF serializes");
        bytes
    }

    /// Lines of the "Invoice ABC" sample used across extraction and
    /// lifecycle tests: approved vendor, two columnar line items that
    /// sum exactly to the subtotal, NET-30 terms.
    pub fn invoice_abc_lines() -> Vec<&'static str> {
        vec![
            "ABC Industrial Supplies",
            "123 Industrial Way, Houston, TX 77001",
            "",
            "INVOICE",
            "",
            "INVOICE NUMBER: INV-2026-78432",
            "INVOICE DATE: 2026-01-22",
            "DUE DATE: 2026-02-21",
            "PO NUMBER: PO-2026-1150",
            "",
            "VLV-4200-IND  Industrial Grade Valve Assembly (Model V-4200)  50  $150.00  $7,500.00",
            "SK-HP-4200  High Pressure Seal Kit  40  $125.00  $5,000.00",
            "",
            "SUBTOTAL: $12,500.00",
            "TAX (8.25%): $1,031.25",
            "TOTAL DUE: $13,531.25",
            "",
            "PAYMENT TERMS: NET-30",
        ]
    }

    /// One-page PDF of the "Invoice ABC" sample.
    pub fn invoice_abc_pdf() -> Vec<u8> {
        pdf_from_lines(&invoice_abc_lines())
    }

    /// The same invoice in the column-block render some generators
    /// produce: header labels grouped on consecutive lines, then the
    /// values in the same order, amounts on the line after their
    /// caption.
    pub fn invoice_abc_columnar_lines() -> Vec<&'static str> {
        vec![
            "ABC Industrial Supplies",
            "INVOICE",
            "123 Industrial Way, Houston, TX 77001",
            "INVOICE NUMBER",
            "INVOICE DATE",
            "DUE DATE",
            "PO NUMBER",
            "INV-2026-78432",
            "January 22, 2026",
            "February 21, 2026",
            "PO-2026-1150",
            "VLV-4200-IND  Industrial Grade Valve Assembly (Model V-4200)  50  $150.00  $7,500.00",
            "SK-HP-4200  High Pressure Seal Kit  40  $125.00  $5,000.00",
            "Subtotal:",
            "$12,500.00",
            "Tax (8.25%):",
            "$1,031.25",
            "TOTAL DUE:",
            "$13,531.25",
            "Payment Terms: NET-30",
        ]
    }

    /// One-page PDF of the column-block "Invoice ABC" render.
    pub fn invoice_abc_columnar_pdf() -> Vec<u8> {
        pdf_from_lines(&invoice_abc_columnar_lines())
    }

    /// Escape `\`, `(`, and `)` for a PDF literal string.
    fn escape_literal(line: &str) -> String {
        let mut escaped = String::with_capacity(line.len());
        for c in line.chars() {
            match c {
                '\\' => escaped.push_str(r"\\"),
                '(' => escaped.push_str(r"\("),
                ')' => escaped.push_str(r"\)"),
                _ => escaped.push(c),
            }
        }
        escaped
    }
}
