//! PDF Document wrapper

use crate::font::FontData;
use crate::pages::{inherited_attribute, page_content_bytes, resolve_dict};
use crate::text::{encode_literal, generate_text_operators, TextRenderContext};
use crate::{PdfError, Result, StandardFont};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeMap;
use std::path::Path;

/// Page dimensions in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    /// ISO A4 (210 x 297 mm)
    pub const A4: PageSize = PageSize {
        width: 595.28,
        height: 841.89,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A font registered with a document
#[derive(Debug, Clone)]
pub(crate) enum FontResource {
    /// Embedded TrueType font (Type0 / Identity-H)
    TrueType(FontData),
    /// One of the standard 14 fonts (Type1 / WinAnsi)
    Standard(StandardFont),
}

/// A buffered text operation for deferred encoding
///
/// Text is buffered while drawing and encoded at finalize time, once the
/// set of fonts used on each page is known.
#[derive(Debug, Clone)]
struct BufferedTextOp {
    /// The text to render
    text: String,
    /// Registered font name
    font_name: String,
    /// Font resource name (e.g., "F1")
    font_resource_name: String,
    /// Page number (1-indexed)
    page: usize,
    /// X coordinate (PDF user space)
    x: f64,
    /// Y coordinate (PDF user space, from bottom)
    y: f64,
    /// Font size in points
    font_size: f32,
}

/// PDF Document wrapper providing high-level operations
pub struct PdfDocument {
    /// The underlying lopdf document
    pub(crate) inner: Document,
    /// Registered fonts
    fonts: BTreeMap<String, FontResource>,
    /// Current font name
    current_font: Option<String>,
    /// Current font size
    current_font_size: f32,
    /// Embedded fonts (font name -> PDF object ID)
    embedded_fonts: BTreeMap<String, ObjectId>,
    /// Page font resources (page number -> font name -> resource name)
    page_font_resources: BTreeMap<usize, BTreeMap<String, String>>,
    /// Next font resource number
    next_font_resource: u32,
    /// Next XObject resource number (page overlays)
    pub(crate) next_xobject_resource: u32,
    /// Buffered content operators per page (page number -> operators)
    page_content_buffer: BTreeMap<usize, Vec<u8>>,
    /// Buffered text operations
    buffered_text_ops: Vec<BufferedTextOp>,
    /// Set once buffered content has been written into the page tree
    finalized: bool,
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfDocument {
    fn from_inner(inner: Document) -> Self {
        Self {
            inner,
            fonts: BTreeMap::new(),
            current_font: None,
            current_font_size: 12.0,
            embedded_fonts: BTreeMap::new(),
            page_font_resources: BTreeMap::new(),
            next_font_resource: 1,
            next_xobject_resource: 1,
            page_content_buffer: BTreeMap::new(),
            buffered_text_ops: Vec::new(),
            finalized: false,
        }
    }

    /// Create an empty document (catalog and an empty page tree)
    pub fn new() -> Self {
        let mut inner = Document::with_version("1.5");

        let pages_id = inner.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(Vec::new())),
            ("Count", Object::Integer(0)),
        ]));
        let catalog_id = inner.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        inner.trailer.set("Root", Object::Reference(catalog_id));

        Self::from_inner(inner)
    }

    /// Open a PDF document from a file path
    ///
    /// # Example
    /// ```ignore
    /// let doc = PdfDocument::open("letter-form.pdf")?;
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let inner = Document::load(path).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Ok(Self::from_inner(inner))
    }

    /// Open a PDF document from bytes
    pub fn open_from_bytes(data: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(data).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Ok(Self::from_inner(inner))
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Whether buffered content has already been written out
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Object ID of a page (1-indexed)
    pub(crate) fn page_id(&self, page: usize) -> Result<ObjectId> {
        let pages = self.inner.get_pages();
        pages
            .get(&(page as u32))
            .copied()
            .ok_or(PdfError::InvalidPage(page, pages.len()))
    }

    /// Add a TrueType font to the document
    ///
    /// # Arguments
    /// * `name` - Font identifier (used in set_font)
    /// * `font` - Parsed font data
    pub fn add_font(&mut self, name: &str, font: FontData) -> Result<()> {
        self.register_font(name, FontResource::TrueType(font))
    }

    /// Add one of the standard 14 fonts to the document
    pub fn add_standard_font(&mut self, name: &str, font: StandardFont) -> Result<()> {
        self.register_font(name, FontResource::Standard(font))
    }

    fn register_font(&mut self, name: &str, font: FontResource) -> Result<()> {
        if self.fonts.contains_key(name) {
            return Err(PdfError::FontAlreadyExists(name.to_string()));
        }
        self.fonts.insert(name.to_string(), font);
        Ok(())
    }

    /// Set the current font and size
    ///
    /// # Example
    /// ```ignore
    /// doc.set_font("kai", 10.0)?;
    /// ```
    pub fn set_font(&mut self, name: &str, size: f32) -> Result<()> {
        if !self.fonts.contains_key(name) {
            return Err(PdfError::FontNotFound(name.to_string()));
        }

        self.current_font = Some(name.to_string());
        self.current_font_size = size;

        Ok(())
    }

    /// Set only the font size (keeps current font)
    pub fn set_font_size(&mut self, size: f32) -> Result<()> {
        if self.current_font.is_none() {
            return Err(PdfError::FontNotFound("No font set".to_string()));
        }

        self.current_font_size = size;
        Ok(())
    }

    /// Draw a string with its baseline origin at `(x, y)`
    ///
    /// Coordinates are PDF user space: points from the bottom-left corner
    /// of the page. Empty strings produce no marks.
    ///
    /// # Arguments
    /// * `page` - Page number (1-indexed)
    /// * `x` - X coordinate in points
    /// * `y` - Y coordinate in points (from bottom)
    /// * `text` - Text to draw
    pub fn draw_string(&mut self, page: usize, x: f64, y: f64, text: &str) -> Result<()> {
        if self.finalized {
            return Err(PdfError::DocumentFinalized);
        }

        let page_count = self.page_count();
        if page == 0 || page > page_count {
            return Err(PdfError::InvalidPage(page, page_count));
        }

        if text.is_empty() {
            return Ok(());
        }

        let font_name = self
            .current_font
            .clone()
            .ok_or_else(|| PdfError::FontNotFound("No font set".to_string()))?;

        match self.fonts.get_mut(&font_name) {
            Some(FontResource::TrueType(font)) => {
                let missing = font.missing_chars(text);
                if !missing.is_empty() {
                    log::warn!(
                        "Font '{}' has no glyph for {:?}; drawing .notdef",
                        font_name,
                        missing
                    );
                }
                font.add_chars(text);
            }
            Some(FontResource::Standard(_)) => {}
            None => return Err(PdfError::FontNotFound(font_name)),
        }

        let font_resource_name = self.get_or_create_font_ref(&font_name, page);

        self.buffered_text_ops.push(BufferedTextOp {
            text: text.to_string(),
            font_name,
            font_resource_name,
            page,
            x,
            y,
            font_size: self.current_font_size,
        });

        Ok(())
    }

    /// Get or create a font reference for a specific page
    ///
    /// Returns the resource name (e.g., "F1", "F2") for use in content streams
    fn get_or_create_font_ref(&mut self, font_name: &str, page: usize) -> String {
        let page_resources = self.page_font_resources.entry(page).or_default();

        if let Some(resource_name) = page_resources.get(font_name) {
            return resource_name.clone();
        }

        let resource_name = format!("F{}", self.next_font_resource);
        self.next_font_resource += 1;

        page_resources.insert(font_name.to_string(), resource_name.clone());

        resource_name
    }

    /// Write all buffered drawing into the page tree
    ///
    /// Encodes buffered text, appends it to each page's content stream and
    /// embeds the fonts that were used. Called by `save`/`to_bytes` and
    /// before a document's pages are composited into another document.
    /// Calling it again is a no-op.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }

        self.encode_buffered_text()?;
        self.flush_content_buffers()?;
        self.embed_fonts()?;

        self.finalized = true;
        Ok(())
    }

    /// Save the document to a file
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.finalize()?;

        self.inner
            .save(path)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        Ok(())
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.finalize()?;

        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;

        Ok(buffer)
    }

    /// Encode buffered text operations and add them to the content buffers
    fn encode_buffered_text(&mut self) -> Result<()> {
        let text_ops: Vec<BufferedTextOp> = std::mem::take(&mut self.buffered_text_ops);

        for op in text_ops {
            let encoded = match self.fonts.get(&op.font_name) {
                Some(FontResource::TrueType(font)) => font.encode_text_hex(&op.text),
                Some(FontResource::Standard(_)) => encode_literal(&op.text),
                None => return Err(PdfError::FontNotFound(op.font_name)),
            };

            let ctx = TextRenderContext {
                font_name: op.font_resource_name,
                font_size: op.font_size,
            };

            let operators = generate_text_operators(&encoded, op.x, op.y, &ctx);
            self.buffer_content(op.page, &operators);
        }

        Ok(())
    }

    /// Embed every font that is referenced from at least one page
    fn embed_fonts(&mut self) -> Result<()> {
        let mut used: Vec<String> = self
            .page_font_resources
            .values()
            .flat_map(|fonts| fonts.keys().cloned())
            .collect();
        used.sort();
        used.dedup();

        for font_name in used {
            if !self.embedded_fonts.contains_key(&font_name) {
                let id = self.embed_font_object(&font_name)?;
                self.embedded_fonts.insert(font_name, id);
            }
        }

        self.finalize_page_font_resources()
    }

    /// Embed a single font object into the PDF
    fn embed_font_object(&mut self, font_name: &str) -> Result<ObjectId> {
        let font = self
            .fonts
            .get(font_name)
            .ok_or_else(|| PdfError::FontNotFound(font_name.to_string()))?;

        let font_data = match font {
            FontResource::Standard(standard) => {
                let dict = standard.to_pdf_object();
                return Ok(self.inner.add_object(dict));
            }
            FontResource::TrueType(font_data) => font_data,
        };

        log::debug!(
            "Embedding font '{}' ({} distinct characters)",
            font_name,
            font_data.used_chars.len()
        );

        let font_objects = font_data.to_pdf_objects()?;

        let font_file_id = self.inner.add_object(font_objects.font_file_stream);

        let mut font_descriptor = font_objects.font_descriptor;
        font_descriptor.set("FontFile2", Object::Reference(font_file_id));
        let font_descriptor_id = self.inner.add_object(font_descriptor);

        let mut cid_font = font_objects.cid_font;
        cid_font.set("FontDescriptor", Object::Reference(font_descriptor_id));
        let cid_font_id = self.inner.add_object(cid_font);

        let mut type0_font = font_objects.type0_font;
        type0_font.set(
            "DescendantFonts",
            Object::Array(vec![Object::Reference(cid_font_id)]),
        );

        let tounicode_id = self.inner.add_object(font_objects.tounicode_stream);
        type0_font.set("ToUnicode", Object::Reference(tounicode_id));

        Ok(self.inner.add_object(type0_font))
    }

    /// Add font references to every page's Resources after embedding
    fn finalize_page_font_resources(&mut self) -> Result<()> {
        let page_resources: Vec<(usize, Vec<(String, String)>)> = self
            .page_font_resources
            .iter()
            .map(|(&page, fonts)| {
                let font_list = fonts
                    .iter()
                    .map(|(font_name, resource_name)| (font_name.clone(), resource_name.clone()))
                    .collect();
                (page, font_list)
            })
            .collect();

        for (page, fonts) in page_resources {
            if !fonts.is_empty() {
                self.add_fonts_to_page_resources(page, &fonts)?;
            }
        }

        Ok(())
    }

    /// Add multiple fonts to a page's Resources dictionary in a single operation
    fn add_fonts_to_page_resources(
        &mut self,
        page: usize,
        fonts: &[(String, String)],
    ) -> Result<()> {
        let page_id = self.page_id(page)?;

        let mut resources_dict = inherited_attribute(&self.inner, page_id, b"Resources")
            .and_then(|resources| resolve_dict(&self.inner, &resources))
            .unwrap_or_else(Dictionary::new);

        let mut font_dict = resources_dict
            .get(b"Font")
            .ok()
            .and_then(|font| resolve_dict(&self.inner, font))
            .unwrap_or_else(Dictionary::new);

        for (font_name, resource_name) in fonts {
            let font_ref = self
                .embedded_fonts
                .get(font_name)
                .ok_or_else(|| PdfError::FontNotFound(font_name.to_string()))?;
            font_dict.set(resource_name.as_bytes().to_vec(), Object::Reference(*font_ref));
        }

        resources_dict.set("Font", Object::Dictionary(font_dict));

        self.inner
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Resources", Object::Dictionary(resources_dict));

        Ok(())
    }

    /// Get a reference to the underlying lopdf document
    pub fn inner(&self) -> &Document {
        &self.inner
    }

    /// Get page size in points
    ///
    /// Reads the MediaBox (or CropBox), following the parent chain for
    /// inherited values. Falls back to A4 when neither is present.
    pub fn page_size(&self, page: usize) -> Result<PageSize> {
        let [llx, lly, urx, ury] = self.page_box(self.page_id(page)?)?;
        Ok(PageSize::new(urx - llx, ury - lly))
    }

    /// MediaBox of a page as `[llx, lly, urx, ury]`
    pub(crate) fn page_box(&self, page_id: ObjectId) -> Result<[f64; 4]> {
        media_box(&self.inner, page_id)
    }

    /// Buffer content operators for a page (written at finalize time)
    fn buffer_content(&mut self, page: usize, content: &[u8]) {
        self.page_content_buffer
            .entry(page)
            .or_default()
            .extend_from_slice(content);
    }

    /// Flush all buffered content to page streams
    ///
    /// Reads each page's existing content, appends the buffered operators
    /// and writes a single new stream object per page.
    fn flush_content_buffers(&mut self) -> Result<()> {
        let buffers = std::mem::take(&mut self.page_content_buffer);

        for (page, content) in buffers {
            if !content.is_empty() {
                self.append_to_content_stream(page, &content)?;
            }
        }

        Ok(())
    }

    /// Append content to a page's content stream
    fn append_to_content_stream(&mut self, page: usize, content: &[u8]) -> Result<()> {
        let page_id = self.page_id(page)?;

        let mut new_content = page_content_bytes(&self.inner, page_id)?;
        if !new_content.is_empty() && !new_content.ends_with(b"\n") {
            new_content.push(b'\n');
        }
        new_content.extend_from_slice(content);

        let stream_id = self
            .inner
            .add_object(Stream::new(Dictionary::new(), new_content));

        self.inner
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Contents", Object::Reference(stream_id));

        Ok(())
    }

    /// Add a blank page to the end of the document
    ///
    /// # Returns
    /// New page number (1-indexed)
    ///
    /// # Example
    /// ```ignore
    /// let mut doc = PdfDocument::new();
    /// let page = doc.add_blank_page(PageSize::A4)?;
    /// assert_eq!(page, 1);
    /// ```
    pub fn add_blank_page(&mut self, size: PageSize) -> Result<usize> {
        if self.finalized {
            return Err(PdfError::DocumentFinalized);
        }

        let contents_id = self
            .inner
            .add_object(Stream::new(Dictionary::new(), Vec::new()));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(size.width as f32),
                Object::Real(size.height as f32),
            ]),
        );
        page_dict.set("Resources", Object::Dictionary(Dictionary::new()));
        page_dict.set("Contents", Object::Reference(contents_id));

        let new_page_id = self.inner.add_object(page_dict);
        self.attach_page(new_page_id)
    }

    /// Object ID of the root Pages node
    fn pages_root_id(&self) -> Result<ObjectId> {
        let catalog_id = self
            .inner
            .trailer
            .get(b"Root")
            .map_err(|_| PdfError::ParseError("Document trailer missing Root entry".to_string()))?
            .as_reference()
            .map_err(|_| PdfError::ParseError("Root is not a reference".to_string()))?;
        let catalog_dict = self
            .inner
            .get_object(catalog_id)?
            .as_dict()
            .map_err(|_| PdfError::ParseError("Catalog is not a dictionary".to_string()))?;
        catalog_dict
            .get(b"Pages")
            .map_err(|_| PdfError::ParseError("Catalog missing Pages entry".to_string()))?
            .as_reference()
            .map_err(|_| PdfError::ParseError("Pages is not a reference".to_string()))
    }

    /// Append an existing page object to the end of the page tree
    ///
    /// # Returns
    /// New page number (1-indexed)
    pub(crate) fn attach_page(&mut self, page_id: ObjectId) -> Result<usize> {
        let pages_id = self.pages_root_id()?;

        self.inner
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Parent", Object::Reference(pages_id));

        let pages_dict = self
            .inner
            .get_object_mut(pages_id)?
            .as_dict_mut()
            .map_err(|_| PdfError::ParseError("Pages object is not a dictionary".to_string()))?;

        let mut kids_array = pages_dict
            .get(b"Kids")
            .and_then(Object::as_array)
            .map_err(|_| PdfError::ParseError("Pages object missing Kids array".to_string()))?
            .clone();
        kids_array.push(Object::Reference(page_id));

        let current_count = pages_dict
            .get(b"Count")
            .and_then(Object::as_i64)
            .map_err(|_| PdfError::ParseError("Pages object missing Count".to_string()))?;

        pages_dict.set("Kids", Object::Array(kids_array));
        pages_dict.set("Count", Object::Integer(current_count + 1));

        Ok(self.page_count())
    }
}

/// MediaBox (or CropBox) of a page, following the parent chain
pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> Result<[f64; 4]> {
    let found = inherited_attribute(doc, page_id, b"MediaBox")
        .or_else(|| inherited_attribute(doc, page_id, b"CropBox"));

    let array = match found {
        Some(Object::Array(arr)) => arr,
        Some(Object::Reference(ref_id)) => doc
            .get_object(ref_id)?
            .as_array()
            .map_err(|_| PdfError::ParseError("MediaBox reference is not an array".to_string()))?
            .clone(),
        Some(_) => return Err(PdfError::ParseError("MediaBox is not an array".to_string())),
        None => {
            return Ok([0.0, 0.0, PageSize::A4.width, PageSize::A4.height]);
        }
    };

    if array.len() < 4 {
        return Err(PdfError::ParseError("Invalid MediaBox format".to_string()));
    }

    let mut values = [0.0f64; 4];
    for (slot, obj) in values.iter_mut().zip(array.iter()) {
        *slot = number(obj)
            .ok_or_else(|| PdfError::ParseError("Invalid MediaBox value".to_string()))?;
    }
    Ok(values)
}

/// Numeric value of an Integer or Real object
pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}
