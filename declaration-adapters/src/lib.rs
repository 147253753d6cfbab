//! Input adapters (markup / already-keyed record / OCR text), the section
//! extractor, and the semantic chunker that together turn raw declaration
//! sources into [`declaration_model::CanonicalRecord`]s and
//! [`declaration_model::Chunk`]s.

pub mod chunker;
pub mod dates;
pub mod markup_adapter;
pub mod ocr_adapter;
pub mod record_adapter;
pub mod sections;

pub use chunker::{chunk, ChunkMode, ChunkerConfig};
pub use markup_adapter::adapt_markup;
pub use ocr_adapter::adapt_ocr;
pub use record_adapter::adapt_record;
pub use sections::{sections as extract_sections, Section};

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("input is empty")]
    Empty,
    #[error("no declaration root element found")]
    MissingRoot,
    #[error("markup parse error: {0}")]
    Parse(String),
}
