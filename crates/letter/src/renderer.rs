//! Text overlay rendering

use crate::grid::GridConfig;
use crate::layout::{BodyLayout, Placement};
use crate::Result;
use pdf_core::{FontData, PdfDocument, StandardFont};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Resource name the letter font is registered under
const FONT_NAME: &str = "letter";

/// Which overlay pages carry the party blocks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PartyBlockRepeat {
    /// Draw the party blocks on every page
    #[default]
    EveryPage,
    /// Draw the party blocks on the first page only
    FirstPageOnly,
}

impl PartyBlockRepeat {
    fn applies_to(self, page_index: usize) -> bool {
        match self {
            PartyBlockRepeat::EveryPage => true,
            PartyBlockRepeat::FirstPageOnly => page_index == 0,
        }
    }
}

/// The single font used for all letter text
#[derive(Debug, Clone)]
pub enum LetterFont {
    /// Embedded TrueType font (needed for CJK text)
    TrueType(FontData),
    /// Standard 14 font; Latin-1 text only
    Standard(StandardFont),
}

impl LetterFont {
    /// Load a TrueType font from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(LetterFont::TrueType(FontData::from_file(FONT_NAME, path)?))
    }

    /// Register a fresh copy of the font with a document
    ///
    /// Each document tracks its own set of used glyphs, so a font shared by
    /// concurrent runs is never mutated.
    fn register(&self, doc: &mut PdfDocument) -> Result<()> {
        match self {
            LetterFont::TrueType(font) => doc.add_font(FONT_NAME, font.fresh())?,
            LetterFont::Standard(font) => doc.add_standard_font(FONT_NAME, font.clone())?,
        }
        Ok(())
    }
}

impl Default for LetterFont {
    fn default() -> Self {
        LetterFont::Standard(StandardFont::helvetica())
    }
}

/// Draws placements into a new text overlay document
pub struct TextPageRenderer<'a> {
    grid: &'a GridConfig,
    font: &'a LetterFont,
    party_repeat: PartyBlockRepeat,
}

impl<'a> TextPageRenderer<'a> {
    pub fn new(grid: &'a GridConfig, font: &'a LetterFont) -> Self {
        Self {
            grid,
            font,
            party_repeat: PartyBlockRepeat::default(),
        }
    }

    pub fn with_party_repeat(mut self, party_repeat: PartyBlockRepeat) -> Self {
        self.party_repeat = party_repeat;
        self
    }

    /// Render one overlay page per body page
    ///
    /// Party placements are drawn first, then the page's body placements.
    /// The returned document is finalized and has exactly
    /// `body.page_count()` pages.
    pub fn render(&self, party: &[Placement], body: &BodyLayout) -> Result<PdfDocument> {
        let mut doc = PdfDocument::new();
        self.font.register(&mut doc)?;
        doc.set_font(FONT_NAME, self.grid.party_font_size)?;

        for (index, body_page) in body.pages().iter().enumerate() {
            let page = doc.add_blank_page(self.grid.page_size())?;

            if self.party_repeat.applies_to(index) {
                draw_all(&mut doc, page, party)?;
            }
            draw_all(&mut doc, page, body_page)?;

            log::debug!(
                "Rendered overlay page {} ({} body characters)",
                page,
                body_page.len()
            );
        }

        doc.finalize()?;
        Ok(doc)
    }
}

fn draw_all(doc: &mut PdfDocument, page: usize, placements: &[Placement]) -> Result<()> {
    for placement in placements {
        doc.set_font_size(placement.font_size)?;
        doc.draw_string(page, placement.x, placement.y, &placement.text)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::layout_body;
    use pretty_assertions::assert_eq;

    fn overlay_content(doc: &PdfDocument, page: u32) -> String {
        let inner = doc.inner();
        let page_id = inner.get_pages()[&page];
        String::from_utf8(inner.get_page_content(page_id).unwrap()).unwrap()
    }

    fn small_grid() -> GridConfig {
        GridConfig {
            max_chars_per_line: 4,
            max_lines_per_page: 1,
            ..GridConfig::default()
        }
    }

    #[test]
    fn test_page_count_follows_body() {
        let grid = small_grid();
        let font = LetterFont::default();
        let body = layout_body("ABCDEFGHI", &grid);

        let doc = TextPageRenderer::new(&grid, &font)
            .render(&[], &body)
            .unwrap();

        assert_eq!(doc.page_count(), 3);
        assert!(doc.is_finalized());
        assert!(overlay_content(&doc, 3).contains("(I) Tj"));
    }

    #[test]
    fn test_party_then_body_with_sizes() {
        let grid = GridConfig::default();
        let font = LetterFont::default();
        let party = vec![Placement::new("Sender", 140.0, 780.0, 10.0)];
        let body = layout_body("A", &grid);

        let doc = TextPageRenderer::new(&grid, &font)
            .render(&party, &body)
            .unwrap();
        let content = overlay_content(&doc, 1);

        let party_at = content.find("(Sender) Tj").unwrap();
        let body_at = content.find("(A) Tj").unwrap();
        assert!(party_at < body_at);
        assert!(content.contains("/F1 10 Tf\n140 780 Td"));
        assert!(content.contains("/F1 20 Tf\n62 556 Td"));
    }

    #[test]
    fn test_party_blocks_repeat_on_every_page() {
        let grid = small_grid();
        let font = LetterFont::default();
        let party = vec![Placement::new("S", 140.0, 780.0, 10.0)];
        let body = layout_body("ABCDE", &grid);

        let doc = TextPageRenderer::new(&grid, &font)
            .render(&party, &body)
            .unwrap();

        assert_eq!(doc.page_count(), 2);
        assert!(overlay_content(&doc, 1).contains("(S) Tj"));
        assert!(overlay_content(&doc, 2).contains("(S) Tj"));
    }

    #[test]
    fn test_party_blocks_first_page_only() {
        let grid = small_grid();
        let font = LetterFont::default();
        let party = vec![Placement::new("S", 140.0, 780.0, 10.0)];
        let body = layout_body("ABCDE", &grid);

        let doc = TextPageRenderer::new(&grid, &font)
            .with_party_repeat(PartyBlockRepeat::FirstPageOnly)
            .render(&party, &body)
            .unwrap();

        assert!(overlay_content(&doc, 1).contains("(S) Tj"));
        assert!(!overlay_content(&doc, 2).contains("(S) Tj"));
    }

    #[test]
    fn test_empty_strings_leave_no_marks() {
        let grid = GridConfig::default();
        let font = LetterFont::default();
        let party = vec![Placement::new("", 140.0, 780.0, 10.0)];
        let body = layout_body("\n", &grid);

        let doc = TextPageRenderer::new(&grid, &font)
            .render(&party, &body)
            .unwrap();

        assert_eq!(doc.page_count(), 1);
        assert!(!overlay_content(&doc, 1).contains("Tj"));
    }

    #[test]
    fn test_repeat_policy_json() {
        let repeat: PartyBlockRepeat = serde_json::from_str("\"firstPageOnly\"").unwrap();
        assert_eq!(repeat, PartyBlockRepeat::FirstPageOnly);
        assert_eq!(
            serde_json::to_string(&PartyBlockRepeat::EveryPage).unwrap(),
            "\"everyPage\""
        );
    }
}
