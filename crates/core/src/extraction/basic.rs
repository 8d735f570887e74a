//! Strategy-independent PDF inspection.
//!
//! Produces the [`BasicMetadata`] block and the raw text every strategy
//! builds on. Runs before any strategy so the ticket keeps size and page
//! facts even when structured extraction fails.

use lopdf::{Document, Object};

use super::ExtractionError;
use crate::ticket::BasicMetadata;

/// Characters of extracted text kept on the document as a preview.
const PREVIEW_CHARS: usize = 2_000;

/// Metadata plus full extracted text for the strategy pass.
#[derive(Debug, Clone)]
pub struct DocumentFacts {
    pub metadata: BasicMetadata,
    pub text: String,
}

/// Parse the PDF and collect page count, creation date, and text.
///
/// Unparseable bytes yield [`ExtractionError::Unreadable`]; the caller
/// records size-only metadata in that case.
pub fn inspect(bytes: &[u8]) -> Result<DocumentFacts, ExtractionError> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| ExtractionError::Unreadable(e.to_string()))?;

    let page_count = doc.get_pages().len() as u32;

    let mut text = String::new();
    for (page_num, _) in doc.get_pages() {
        if let Ok(page_text) = doc.extract_text(&[page_num]) {
            text.push_str(&page_text);
            text.push('\n');
        }
    }

    let preview: String = text.chars().take(PREVIEW_CHARS).collect();

    let metadata = BasicMetadata {
        page_count,
        file_size_bytes: bytes.len() as u64,
        file_size_display: size_display(bytes.len() as u64),
        pdf_creation_date: creation_date(&doc),
        raw_text_preview: if preview.trim().is_empty() {
            None
        } else {
            Some(preview)
        },
    };

    Ok(DocumentFacts { metadata, text })
}

/// Size-only metadata for documents lopdf cannot parse.
pub fn size_only_metadata(bytes: &[u8]) -> BasicMetadata {
    BasicMetadata {
        page_count: 0,
        file_size_bytes: bytes.len() as u64,
        file_size_display: size_display(bytes.len() as u64),
        pdf_creation_date: None,
        raw_text_preview: None,
    }
}

/// Human-readable size: bytes below 1 KiB, one decimal of KB below
/// 1 MiB, two decimals of MB above.
pub fn size_display(size_bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;

    if size_bytes < 1024 {
        format!("{size_bytes} B")
    } else if (size_bytes as f64) < MIB {
        format!("{:.1} KB", size_bytes as f64 / KIB)
    } else {
        format!("{:.2} MB", size_bytes as f64 / MIB)
    }
}

/// Read `CreationDate` from the document Info dictionary, normalized to
/// an ISO timestamp.
fn creation_date(doc: &Document) -> Option<String> {
    let info_ref = doc.trailer.get(b"Info").ok()?;
    let info = match info_ref.as_reference() {
        Ok(ref_id) => doc.get_object(ref_id).ok()?,
        Err(_) => info_ref,
    };

    let Object::Dictionary(info_dict) = info else {
        return None;
    };

    let raw = match info_dict.get(b"CreationDate").ok()? {
        Object::String(bytes, _) => String::from_utf8_lossy(bytes).into_owned(),
        _ => return None,
    };

    parse_pdf_date(&raw)
}

/// PDF dates look like `D:20260122093015+00'00'`; keep the first 14
/// digits, or 8 for date-only values.
fn parse_pdf_date(raw: &str) -> Option<String> {
    let digits: String = raw
        .trim_start_matches("D:")
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if digits.len() >= 14 {
        let parsed =
            chrono::NaiveDateTime::parse_from_str(&digits[..14], "%Y%m%d%H%M%S").ok()?;
        Some(parsed.format("%Y-%m-%dT%H:%M:%S").to_string())
    } else if digits.len() >= 8 {
        let parsed = chrono::NaiveDate::parse_from_str(&digits[..8], "%Y%m%d").ok()?;
        Some(parsed.format("%Y-%m-%d").to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_size_display_thresholds() {
        assert_eq!(size_display(0), "0 B");
        assert_eq!(size_display(512), "512 B");
        assert_eq!(size_display(1024), "1.0 KB");
        assert_eq!(size_display(45_000), "43.9 KB");
        assert_eq!(size_display(2_621_440), "2.50 MB");
    }

    #[test]
    fn test_parse_pdf_date_full_timestamp() {
        assert_eq!(
            parse_pdf_date("D:20260122093015+00'00'").as_deref(),
            Some("2026-01-22T09:30:15")
        );
    }

    #[test]
    fn test_parse_pdf_date_date_only() {
        assert_eq!(parse_pdf_date("D:20260122").as_deref(), Some("2026-01-22"));
    }

    #[test]
    fn test_parse_pdf_date_garbage() {
        assert_eq!(parse_pdf_date("yesterday"), None);
        assert_eq!(parse_pdf_date("D:42"), None);
    }

    #[test]
    fn test_inspect_reads_pages_text_and_creation_date() {
        let bytes = fixtures::pdf_from_lines(&["INVOICE", "SUBTOTAL: $100.00"]);
        let facts = inspect(&bytes).unwrap();

        assert_eq!(facts.metadata.page_count, 1);
        assert_eq!(facts.metadata.file_size_bytes, bytes.len() as u64);
        assert!(facts.text.contains("SUBTOTAL"));
        let preview = facts.metadata.raw_text_preview.unwrap();
        assert!(preview.contains("INVOICE"));
        // The fixture stamps a creation date into the Info dictionary.
        assert_eq!(
            facts.metadata.pdf_creation_date.as_deref(),
            Some("2026-01-22T09:30:15")
        );
    }

    #[test]
    fn test_inspect_rejects_garbage_bytes() {
        let err = inspect(b"not a pdf at all").unwrap_err();
        assert!(matches!(err, ExtractionError::Unreadable(_)));
    }

    #[test]
    fn test_size_only_metadata_keeps_byte_facts() {
        let metadata = size_only_metadata(b"not a pdf at all");
        assert_eq!(metadata.file_size_bytes, 16);
        assert_eq!(metadata.page_count, 0);
        assert!(metadata.raw_text_preview.is_none());
    }
}
