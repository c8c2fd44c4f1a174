//! Letter generation pipeline

use crate::compose::{merge, select_pages};
use crate::config::LetterConfig;
use crate::grid::GridConfig;
use crate::layout::layout_body;
use crate::party::fill_party_blocks;
use crate::renderer::{LetterFont, PartyBlockRepeat, TextPageRenderer};
use crate::request::{Letter, LetterRequest};
use crate::{LetterError, Result};
use pdf_core::PdfDocument;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// A finished letter
#[derive(Debug, Clone)]
pub struct GeneratedLetter {
    /// Complete PDF file contents
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Produces letters from requests
///
/// Holds only read-only data, so one generator can serve many concurrent
/// runs. Each run opens its own copy of the template and tracks its own
/// font usage.
#[derive(Debug, Clone)]
pub struct LetterGenerator {
    grid: GridConfig,
    party_repeat: PartyBlockRepeat,
    template: Arc<[u8]>,
    font: LetterFont,
}

impl LetterGenerator {
    /// Load the template and font named by a configuration
    pub fn new(config: LetterConfig) -> Result<Self> {
        let template = std::fs::read(&config.template).map_err(|e| {
            LetterError::Configuration(format!(
                "Failed to read template {}: {}",
                config.template.display(),
                e
            ))
        })?;

        let font = match &config.font {
            Some(path) => LetterFont::from_file(path)?,
            None => {
                log::warn!("No font configured; using Helvetica, which cannot draw CJK text");
                LetterFont::default()
            }
        };

        let generator = Self::from_parts(config.grid, template, font)?;
        Ok(generator.with_party_repeat(config.party_block_repeat))
    }

    /// Build a generator from an in-memory template and font
    ///
    /// Validates the grid and checks that the template parses and has at
    /// least one page.
    pub fn from_parts(grid: GridConfig, template: Vec<u8>, font: LetterFont) -> Result<Self> {
        grid.validate()?;

        let pages = PdfDocument::open_from_bytes(&template)?.page_count();
        if pages == 0 {
            return Err(LetterError::TemplateExhausted);
        }
        log::debug!("Template has {} pages; page 1 is used", pages);

        Ok(Self {
            grid,
            party_repeat: PartyBlockRepeat::default(),
            template: template.into(),
            font,
        })
    }

    pub fn with_party_repeat(mut self, party_repeat: PartyBlockRepeat) -> Self {
        self.party_repeat = party_repeat;
        self
    }

    /// Run the whole pipeline for one letter
    pub fn generate(&self, letter: &Letter) -> Result<GeneratedLetter> {
        let started = Instant::now();

        let party = fill_party_blocks(&letter.parties, &self.grid);
        let body = layout_body(&letter.text, &self.grid);
        let page_count = body.page_count();
        log::info!(
            "Laid out {} characters on {} pages ({:?})",
            body.placement_count(),
            page_count,
            started.elapsed()
        );

        let overlay = TextPageRenderer::new(&self.grid, &self.font)
            .with_party_repeat(self.party_repeat)
            .render(&party, &body)?;
        log::info!("Rendered text overlay ({:?})", started.elapsed());

        let template = PdfDocument::open_from_bytes(&self.template)?;
        let subset = select_pages(&template, page_count)?;
        drop(template);

        let mut merged = merge(overlay, subset)?;
        let bytes = merged.to_bytes()?;
        log::info!(
            "Generated {} page letter, {} bytes ({:?})",
            page_count,
            bytes.len(),
            started.elapsed()
        );

        Ok(GeneratedLetter { bytes, page_count })
    }

    /// Normalize a request and generate it
    pub fn generate_request(&self, request: LetterRequest) -> Result<GeneratedLetter> {
        self.generate(&request.into_letter()?)
    }

    /// Generate a letter and write it to `path`
    ///
    /// The bytes go to a temporary sibling file that is renamed over `path`
    /// once complete, so a failed run never leaves a partial PDF behind.
    pub fn generate_to_file<P: AsRef<Path>>(
        &self,
        letter: &Letter,
        path: P,
    ) -> Result<GeneratedLetter> {
        let generated = self.generate(letter)?;
        write_atomically(path.as_ref(), &generated.bytes)?;
        Ok(generated)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp = temp_path(path);
    if let Err(e) = std::fs::write(&temp, bytes).and_then(|_| std::fs::rename(&temp, path)) {
        let _ = std::fs::remove_file(&temp);
        return Err(e.into());
    }
    log::info!("Wrote {}", path.display());
    Ok(())
}
