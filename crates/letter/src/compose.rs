//! Template page selection and page merging

use crate::{LetterError, Result};
use pdf_core::PdfDocument;

/// Build a document holding the template's first page `count` times
///
/// The template is a single blank letterhead page reused as the
/// background of every content page.
pub fn select_pages(template: &PdfDocument, count: usize) -> Result<PdfDocument> {
    if template.page_count() == 0 {
        return Err(LetterError::TemplateExhausted);
    }

    let mut subset = PdfDocument::new();
    subset.append_page_from(template, 1, count)?;

    log::debug!("Selected {} template pages", subset.page_count());
    Ok(subset)
}

/// Overlay each text page onto the template page with the same index
///
/// Both documents must have the same number of pages. The template subset
/// becomes the final document: page `i` keeps template page `i` as its
/// background with text page `i` composited on top.
pub fn merge(
    mut text_overlay: PdfDocument,
    mut template_subset: PdfDocument,
) -> Result<PdfDocument> {
    let text_pages = text_overlay.page_count();
    let template_pages = template_subset.page_count();

    if text_pages != template_pages {
        log::error!(
            "Refusing to merge {} text pages onto {} template pages",
            text_pages,
            template_pages
        );
        return Err(LetterError::PageCountMismatch {
            text: text_pages,
            template: template_pages,
        });
    }

    text_overlay.finalize()?;
    template_subset.overlay_pages(&text_overlay, (1..=text_pages).map(|page| (page, page)))?;

    Ok(template_subset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_core::{PageSize, StandardFont};
    use pretty_assertions::assert_eq;

    fn page_content(doc: &PdfDocument, page: u32) -> String {
        let inner = doc.inner();
        let page_id = inner.get_pages()[&page];
        String::from_utf8(inner.get_page_content(page_id).unwrap()).unwrap()
    }

    fn template(pages: usize) -> PdfDocument {
        let mut doc = PdfDocument::new();
        doc.add_standard_font("helv", StandardFont::helvetica())
            .unwrap();
        doc.set_font("helv", 8.0).unwrap();
        for index in 0..pages {
            let page = doc.add_blank_page(PageSize::A4).unwrap();
            doc.draw_string(page, 10.0, 10.0, &format!("form {}", index + 1))
                .unwrap();
        }
        doc.finalize().unwrap();
        doc
    }

    fn overlay(texts: &[&str]) -> PdfDocument {
        let mut doc = PdfDocument::new();
        doc.add_standard_font("helv", StandardFont::helvetica())
            .unwrap();
        doc.set_font("helv", 20.0).unwrap();
        for text in texts {
            let page = doc.add_blank_page(PageSize::A4).unwrap();
            doc.draw_string(page, 62.0, 556.0, text).unwrap();
        }
        doc
    }

    #[test]
    fn test_select_pages_replicates_first_page() {
        let subset = select_pages(&template(2), 3).unwrap();

        assert_eq!(subset.page_count(), 3);
        for page in 1..=3 {
            let content = page_content(&subset, page);
            assert!(content.contains("(form 1) Tj"));
            assert!(!content.contains("(form 2) Tj"));
        }
    }

    #[test]
    fn test_select_pages_empty_template() {
        let empty = PdfDocument::new();
        assert!(matches!(
            select_pages(&empty, 1),
            Err(LetterError::TemplateExhausted)
        ));
    }

    #[test]
    fn test_merge_zips_pages() {
        let subset = select_pages(&template(1), 2).unwrap();
        let merged = merge(overlay(&["one", "two"]), subset).unwrap();

        assert_eq!(merged.page_count(), 2);
        let first = page_content(&merged, 1);
        assert!(first.contains("(form 1) Tj"));
        assert!(first.contains(" Do"));
    }

    #[test]
    fn test_merge_rejects_mismatch() {
        let subset = select_pages(&template(1), 1).unwrap();
        let result = merge(overlay(&["one", "two"]), subset);

        assert!(matches!(
            result,
            Err(LetterError::PageCountMismatch {
                text: 2,
                template: 1
            })
        ));
    }
}
