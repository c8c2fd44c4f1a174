//! Page copying and compositing between documents

use crate::document::{media_box, PdfDocument};
use crate::{PdfError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeMap;

/// Page attributes that may be inherited from ancestor Pages nodes
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Depth limit when walking the Parent chain
const MAX_TREE_DEPTH: usize = 32;

/// Look up a page attribute, following the Parent chain
pub(crate) fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

/// Owned copy of a dictionary, dereferencing it first if needed
pub(crate) fn resolve_dict(doc: &Document, obj: &Object) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(dict) => Some(dict.clone()),
        Object::Reference(id) => doc
            .get_object(*id)
            .ok()
            .and_then(|o| o.as_dict().ok())
            .cloned(),
        _ => None,
    }
}

fn stream_bytes(stream: &Stream) -> Vec<u8> {
    stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone())
}

/// Decoded content of a page, with all content streams concatenated
pub(crate) fn page_content_bytes(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let page_dict = doc
        .get_object(page_id)?
        .as_dict()
        .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?;

    let content = match page_dict.get(b"Contents") {
        Ok(Object::Stream(stream)) => stream_bytes(stream),
        Ok(Object::Reference(ref_id)) => match doc.get_object(*ref_id) {
            Ok(Object::Stream(stream)) => stream_bytes(stream),
            _ => Vec::new(),
        },
        Ok(Object::Array(arr)) => {
            let mut combined = Vec::new();
            for obj in arr {
                let data = match obj {
                    Object::Reference(ref_id) => match doc.get_object(*ref_id) {
                        Ok(Object::Stream(stream)) => stream_bytes(stream),
                        _ => continue,
                    },
                    Object::Stream(stream) => stream_bytes(stream),
                    _ => continue,
                };
                combined.extend_from_slice(&data);
                combined.push(b'\n');
            }
            combined
        }
        _ => Vec::new(),
    };

    Ok(content)
}

/// Deep-copies objects from one document into another
///
/// Each source object is copied at most once per importer, so pages
/// imported through the same importer share their
/// resources. References to page tree nodes are dropped (replaced by null)
/// so a copied page never drags its source's page tree along.
struct ObjectImporter<'a> {
    source: &'a Document,
    map: BTreeMap<ObjectId, ObjectId>,
}

impl<'a> ObjectImporter<'a> {
    fn new(source: &'a Document) -> Self {
        Self {
            source,
            map: BTreeMap::new(),
        }
    }

    fn import(&mut self, target: &mut Document, obj: &Object) -> Object {
        match obj {
            Object::Reference(id) => self.import_reference(target, *id),
            Object::Array(items) => {
                Object::Array(items.iter().map(|item| self.import(target, item)).collect())
            }
            Object::Dictionary(dict) => Object::Dictionary(self.import_dict(target, dict)),
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.import_dict(target, &stream.dict);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    fn import_dict(&mut self, target: &mut Document, dict: &Dictionary) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            if key.as_slice() == b"Parent" {
                continue;
            }
            copy.set(key.clone(), self.import(target, value));
        }
        copy
    }

    fn import_reference(&mut self, target: &mut Document, id: ObjectId) -> Object {
        if let Some(mapped) = self.map.get(&id) {
            return Object::Reference(*mapped);
        }

        let Ok(object) = self.source.get_object(id) else {
            return Object::Null;
        };
        if is_page_tree_node(object) {
            return Object::Null;
        }

        let new_id = target.new_object_id();
        self.map.insert(id, new_id);
        let copy = self.import(target, object);
        target.objects.insert(new_id, copy);
        Object::Reference(new_id)
    }
}

fn is_page_tree_node(object: &Object) -> bool {
    let Object::Dictionary(dict) = object else {
        return false;
    };
    dict.get(b"Type")
        .and_then(Object::as_name)
        .map(|name| name == b"Page" || name == b"Pages")
        .unwrap_or(false)
}

impl PdfDocument {
    /// Append copies of another document's page to the end of this one
    ///
    /// The page is deep-copied with its inherited attributes resolved, so
    /// each copy renders exactly like the source page. All copies share one
    /// copy of the source page's resources.
    ///
    /// # Arguments
    /// * `source` - Document to copy from
    /// * `page` - Source page number (1-indexed)
    /// * `copies` - Number of copies to append
    ///
    /// # Returns
    /// The new page numbers (1-indexed), in order
    pub fn append_page_from(
        &mut self,
        source: &PdfDocument,
        page: usize,
        copies: usize,
    ) -> Result<Vec<usize>> {
        if self.is_finalized() {
            return Err(PdfError::DocumentFinalized);
        }

        let source_page_id = source.page_id(page)?;
        let source_doc = &source.inner;
        let page_dict = source_doc
            .get_object(source_page_id)?
            .as_dict()
            .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?
            .clone();

        let mut importer = ObjectImporter::new(source_doc);
        let mut added = Vec::with_capacity(copies);

        for _ in 0..copies {
            let mut new_dict = importer.import_dict(&mut self.inner, &page_dict);
            for key in INHERITABLE {
                if new_dict.get(key).is_err() {
                    if let Some(value) = inherited_attribute(source_doc, source_page_id, key) {
                        let value = importer.import(&mut self.inner, &value);
                        new_dict.set(key.to_vec(), value);
                    }
                }
            }
            new_dict.set("Type", Object::Name(b"Page".to_vec()));

            let new_page_id = self.inner.add_object(new_dict);
            added.push(self.attach_page(new_page_id)?);
        }

        Ok(added)
    }

    /// Composite one page of another document on top of a page of this one
    ///
    /// See [`PdfDocument::overlay_pages`].
    pub fn overlay_page(
        &mut self,
        page: usize,
        overlay: &PdfDocument,
        overlay_page: usize,
    ) -> Result<()> {
        self.overlay_pages(overlay, [(page, overlay_page)])
    }

    /// Composite pages of another document on top of pages of this one
    ///
    /// For every `(page, overlay_page)` pair the overlay page is wrapped
    /// into a Form XObject and painted after this page's own content, which
    /// is isolated in a `q ... Q` pair so its graphics state cannot leak
    /// into the overlay. The overlay is painted in this page's user space
    /// with the identity matrix, so coordinates carry over unchanged.
    ///
    /// The overlay document must be finalized; resources shared between
    /// its pages are copied once.
    pub fn overlay_pages<I>(&mut self, overlay: &PdfDocument, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        if self.is_finalized() {
            return Err(PdfError::DocumentFinalized);
        }
        if !overlay.is_finalized() {
            return Err(PdfError::ParseError(
                "Overlay document must be finalized before compositing".to_string(),
            ));
        }

        let overlay_doc = &overlay.inner;
        let mut importer = ObjectImporter::new(overlay_doc);

        for (page, overlay_page) in pairs {
            let base_page_id = self.page_id(page)?;
            let overlay_page_id = overlay.page_id(overlay_page)?;

            let form_id = self.import_page_as_form(&mut importer, overlay_page_id)?;
            self.paint_form_over_page(base_page_id, form_id)?;
        }

        Ok(())
    }

    /// Copy a page of the importer's source document into a Form XObject
    fn import_page_as_form(
        &mut self,
        importer: &mut ObjectImporter<'_>,
        overlay_page_id: ObjectId,
    ) -> Result<ObjectId> {
        let overlay_doc = importer.source;
        let content = page_content_bytes(overlay_doc, overlay_page_id)?;
        let bbox = media_box(overlay_doc, overlay_page_id)?;

        let resources = inherited_attribute(overlay_doc, overlay_page_id, b"Resources")
            .map(|resources| importer.import(&mut self.inner, &resources))
            .unwrap_or_else(|| Object::Dictionary(Dictionary::new()));

        let mut form = Dictionary::new();
        form.set("Type", Object::Name(b"XObject".to_vec()));
        form.set("Subtype", Object::Name(b"Form".to_vec()));
        form.set("FormType", Object::Integer(1));
        form.set(
            "BBox",
            Object::Array(bbox.iter().map(|v| Object::Real(*v as f32)).collect()),
        );
        form.set("Resources", resources);

        Ok(self.inner.add_object(Stream::new(form, content)))
    }

    /// Register a Form XObject on a page and paint it after the page content
    fn paint_form_over_page(&mut self, page_id: ObjectId, form_id: ObjectId) -> Result<()> {
        let mut resources = inherited_attribute(&self.inner, page_id, b"Resources")
            .and_then(|resources| resolve_dict(&self.inner, &resources))
            .unwrap_or_else(Dictionary::new);
        let mut xobjects = resources
            .get(b"XObject")
            .ok()
            .and_then(|xobjects| resolve_dict(&self.inner, xobjects))
            .unwrap_or_else(Dictionary::new);

        let mut name = format!("Ovl{}", self.next_xobject_resource);
        while xobjects.get(name.as_bytes()).is_ok() {
            self.next_xobject_resource += 1;
            name = format!("Ovl{}", self.next_xobject_resource);
        }
        self.next_xobject_resource += 1;

        xobjects.set(name.as_bytes().to_vec(), Object::Reference(form_id));
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut contents = self.content_references(page_id)?;
        let open_id = self
            .inner
            .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let close_id = self.inner.add_object(Stream::new(
            Dictionary::new(),
            format!("\nQ\nq\n/{name} Do\nQ\n").into_bytes(),
        ));
        contents.insert(0, Object::Reference(open_id));
        contents.push(Object::Reference(close_id));

        let page_dict = self.inner.get_object_mut(page_id)?.as_dict_mut()?;
        page_dict.set("Resources", Object::Dictionary(resources));
        page_dict.set("Contents", Object::Array(contents));

        Ok(())
    }

    /// A page's content streams as a list of references
    ///
    /// Direct stream objects are moved into indirect objects first.
    fn content_references(&mut self, page_id: ObjectId) -> Result<Vec<Object>> {
        let contents = self
            .inner
            .get_object(page_id)?
            .as_dict()
            .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?
            .get(b"Contents")
            .ok()
            .cloned();

        let items = match contents {
            None => Vec::new(),
            Some(Object::Array(items)) => items,
            Some(other) => vec![other],
        };

        let mut references = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Object::Reference(_) => references.push(item),
                Object::Stream(stream) => {
                    references.push(Object::Reference(self.inner.add_object(stream)));
                }
                _ => {}
            }
        }
        Ok(references)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PageSize, StandardFont};

    fn source_with_inherited_box() -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            b"0 0 m 10 10 l S".to_vec(),
        ));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
        ]));
        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(vec![Object::Reference(page_id)])),
                ("Count", Object::Integer(1)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(300),
                        Object::Integer(400),
                    ]),
                ),
                ("Resources", Object::Dictionary(Dictionary::new())),
            ])),
        );
        let catalog_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    #[test]
    fn test_inherited_attribute_walks_parent() {
        let doc = source_with_inherited_box();
        let page_id = *doc.get_pages().get(&1).unwrap();
        assert!(inherited_attribute(&doc, page_id, b"MediaBox").is_some());
        assert!(inherited_attribute(&doc, page_id, b"Rotate").is_none());
    }

    #[test]
    fn test_append_page_resolves_inherited_media_box() {
        let mut bytes = Vec::new();
        source_with_inherited_box().save_to(&mut bytes).unwrap();
        let source = PdfDocument::open_from_bytes(&bytes).unwrap();

        let mut target = PdfDocument::new();
        let added = target.append_page_from(&source, 1, 3).unwrap();

        assert_eq!(added, vec![1, 2, 3]);
        assert_eq!(target.page_size(3).unwrap(), PageSize::new(300.0, 400.0));

        let page_id = target.page_id(2).unwrap();
        let content = page_content_bytes(&target.inner, page_id).unwrap();
        assert_eq!(content, b"0 0 m 10 10 l S".to_vec());
    }

    #[test]
    fn test_append_page_shares_content_between_copies() {
        let mut bytes = Vec::new();
        source_with_inherited_box().save_to(&mut bytes).unwrap();
        let source = PdfDocument::open_from_bytes(&bytes).unwrap();

        let mut target = PdfDocument::new();
        target.append_page_from(&source, 1, 2).unwrap();

        let contents = |page: usize| {
            let id = target.page_id(page).unwrap();
            target
                .inner
                .get_object(id)
                .unwrap()
                .as_dict()
                .unwrap()
                .get(b"Contents")
                .unwrap()
                .clone()
        };
        assert_eq!(contents(1).as_reference().unwrap(), contents(2).as_reference().unwrap());
    }

    #[test]
    fn test_append_page_rejects_missing_page() {
        let source = PdfDocument::new();
        let mut target = PdfDocument::new();
        assert!(matches!(
            target.append_page_from(&source, 1, 1),
            Err(PdfError::InvalidPage(1, 0))
        ));
    }

    #[test]
    fn test_overlay_requires_finalized_overlay() {
        let mut base = PdfDocument::new();
        base.add_blank_page(PageSize::A4).unwrap();
        let mut overlay = PdfDocument::new();
        overlay.add_blank_page(PageSize::A4).unwrap();

        assert!(base.overlay_page(1, &overlay, 1).is_err());

        overlay.finalize().unwrap();
        base.overlay_page(1, &overlay, 1).unwrap();
    }

    #[test]
    fn test_overlay_paints_form_after_base_content() {
        let mut base = PdfDocument::new();
        base.add_blank_page(PageSize::A4).unwrap();

        let mut overlay = PdfDocument::new();
        overlay.add_blank_page(PageSize::A4).unwrap();
        overlay
            .add_standard_font("helv", StandardFont::helvetica())
            .unwrap();
        overlay.set_font("helv", 20.0).unwrap();
        overlay.draw_string(1, 50.0, 700.0, "A").unwrap();
        overlay.finalize().unwrap();

        base.overlay_page(1, &overlay, 1).unwrap();

        let page_id = base.page_id(1).unwrap();
        let content = String::from_utf8(page_content_bytes(&base.inner, page_id).unwrap()).unwrap();
        assert!(content.starts_with("q\n"));
        assert!(content.contains("/Ovl1 Do"));

        let page_dict = base.inner.get_object(page_id).unwrap().as_dict().unwrap();
        let resources = page_dict.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let form_id = xobjects.get(b"Ovl1").unwrap().as_reference().unwrap();
        let form = base.inner.get_object(form_id).unwrap().as_stream().unwrap();
        let form_content = String::from_utf8(form.content.clone()).unwrap();
        assert!(form_content.contains("50 700 Td"));
        assert!(form_content.contains("(A) Tj"));
        assert!(form.dict.get(b"Resources").unwrap().as_dict().is_ok());
    }
}
