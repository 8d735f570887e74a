//! Document extraction: a basic metadata pass over every upload plus
//! pluggable strategies that recover structured invoice fields.

mod analyzer;
pub mod basic;
mod engine;
mod pattern;
mod types;

pub use analyzer::AnalyzerExtractor;
pub use basic::DocumentFacts;
pub use engine::ExtractionEngine;
pub use pattern::PatternExtractor;
pub use types::{ExtractionError, InvoiceExtractor, SourceDocument};
