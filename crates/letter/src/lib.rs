//! Letter - registered letter (存證信函) layout and page merge
//!
//! This crate provides:
//! - The form grid model and its validation
//! - Party block (sender / receiver / cc) placement
//! - Character-grid body layout with line and page breaks
//! - Rendering placements into a text overlay PDF
//! - Template page selection and page-for-page merging
//! - The request/config types and the pipeline driver
//!
//! # Example
//!
//! ```ignore
//! use letter::{LetterConfig, LetterGenerator, LetterRequest};
//!
//! let config = LetterConfig::from_file("config/tw-lal.json")?;
//! let generator = LetterGenerator::new(config)?;
//! let request = LetterRequest::from_json(request_json)?;
//! let letter = generator.generate(&request.into_letter()?)?;
//! std::fs::write("letter.pdf", &letter.bytes)?;
//! ```

pub mod compose;
mod config;
mod generator;
mod grid;
pub mod layout;
pub mod party;
mod renderer;
mod request;

pub use compose::{merge, select_pages};
pub use config::LetterConfig;
pub use generator::{GeneratedLetter, LetterGenerator};
pub use grid::{GridConfig, SlotGeometry};
pub use layout::{layout_body, BodyLayout, PageCursor, Placement};
pub use party::{fill_party_block, fill_party_blocks, Parties, Party, PartyList, Role};
pub use renderer::{LetterFont, PartyBlockRepeat, TextPageRenderer};
pub use request::{Letter, LetterRequest};

use thiserror::Error;

/// Errors that can occur while producing a letter
#[derive(Debug, Error)]
pub enum LetterError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Template PDF has no pages")]
    TemplateExhausted,

    #[error("Page count mismatch: text overlay has {text} pages, template subset has {template}")]
    PageCountMismatch { text: usize, template: usize },

    #[error("Letter text is empty")]
    EmptyText,

    #[error("PDF error: {0}")]
    Pdf(#[from] pdf_core::PdfError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for letter operations
pub type Result<T> = std::result::Result<T, LetterError>;
