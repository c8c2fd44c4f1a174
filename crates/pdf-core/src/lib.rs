//! PDF Core - Low-level PDF primitives
//!
//! This crate provides functionality for:
//! - Creating, opening and saving PDF documents
//! - Embedding TrueType fonts and referencing the standard 14 fonts
//! - Drawing strings at absolute page coordinates
//! - Copying pages between documents
//! - Compositing one page on top of another
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{FontData, PageSize, PdfDocument};
//!
//! let mut doc = PdfDocument::new();
//! doc.add_font("kai", FontData::from_file("kai", "fonts/kai.ttf")?)?;
//! doc.set_font("kai", 20.0)?;
//! let page = doc.add_blank_page(PageSize::A4)?;
//! doc.draw_string(page, 100.0, 700.0, "存證信函")?;
//! doc.save("output.pdf")?;
//! ```

mod document;
mod font;
mod pages;
mod text;

pub use document::{PageSize, PdfDocument};
pub use font::{FontData, StandardFont};
pub use text::{encode_literal, format_number, generate_text_operators, TextRenderContext};

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to open PDF: {0}")]
    OpenError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("Font already exists: {0}")]
    FontAlreadyExists(String),

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Invalid page number: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("PDF parsing error: {0}")]
    ParseError(String),

    #[error("Document is finalized; no further drawing is allowed")]
    DocumentFinalized,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_page_message() {
        let err = PdfError::InvalidPage(3, 2);
        assert_eq!(
            err.to_string(),
            "Invalid page number: 3 (document has 2 pages)"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.pdf");
        let err: PdfError = io.into();
        assert!(matches!(err, PdfError::IoError(_)));
    }
}
