//! Font handling for PDF documents

use crate::{PdfError, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Object, Stream};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Font data structure for embedded TrueType fonts
///
/// The font program is shared behind an `Arc`, so a `FontData` loaded once
/// at startup can be cloned cheaply into every document that uses it. Each
/// clone tracks its own set of used characters.
#[derive(Debug, Clone)]
pub struct FontData {
    /// Font name/identifier
    pub name: String,
    /// Raw TTF data
    ttf_data: Arc<[u8]>,
    /// Characters used (for the widths array and ToUnicode CMap)
    pub used_chars: BTreeSet<char>,
}

/// PDF objects generated for font embedding
pub struct FontObjects {
    /// Type0 font dictionary
    pub type0_font: Dictionary,
    /// CIDFont Type2 dictionary
    pub cid_font: Dictionary,
    /// Font descriptor dictionary
    pub font_descriptor: Dictionary,
    /// Font file stream (compressed TTF data)
    pub font_file_stream: Stream,
    /// ToUnicode CMap stream
    pub tounicode_stream: Stream,
}

impl FontData {
    /// Create font data from TTF bytes
    ///
    /// # Arguments
    /// * `name` - Font identifier
    /// * `ttf_data` - TrueType font file bytes
    pub fn from_ttf(name: &str, ttf_data: &[u8]) -> Result<Self> {
        ttf_parser::Face::parse(ttf_data, 0)
            .map_err(|e| PdfError::FontParseError(format!("{e:?}")))?;

        Ok(Self {
            name: name.to_string(),
            ttf_data: Arc::from(ttf_data),
            used_chars: BTreeSet::new(),
        })
    }

    /// Read and parse a TrueType font file
    pub fn from_file<P: AsRef<Path>>(name: &str, path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_ttf(name, &data)
    }

    /// A copy of this font with an empty used-character set
    pub fn fresh(&self) -> Self {
        Self {
            name: self.name.clone(),
            ttf_data: Arc::clone(&self.ttf_data),
            used_chars: BTreeSet::new(),
        }
    }

    fn face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.ttf_data, 0).ok()
    }

    /// Add characters to the used set
    pub fn add_chars(&mut self, text: &str) {
        for c in text.chars() {
            self.used_chars.insert(c);
        }
    }

    /// Characters of `text` the font cannot render, in order of appearance
    pub fn missing_chars(&self, text: &str) -> Vec<char> {
        let face = self.face();
        let mut missing: Vec<char> = Vec::new();
        for c in text.chars() {
            if glyph_id(face.as_ref(), c) == 0 && !missing.contains(&c) {
                missing.push(c);
            }
        }
        missing
    }

    /// Get font units per em
    pub fn units_per_em(&self) -> u16 {
        self.face()
            .map(|face| face.units_per_em())
            .unwrap_or(1000)
    }

    /// Get font ascender
    pub fn ascender(&self) -> i16 {
        self.face().map(|face| face.ascender()).unwrap_or(800)
    }

    /// Get font descender
    pub fn descender(&self) -> i16 {
        self.face().map(|face| face.descender()).unwrap_or(-200)
    }

    /// Encode text as hex string for PDF Tj operator
    pub fn encode_text_hex(&self, text: &str) -> String {
        let face = self.face();
        let mut result = String::new();
        for c in text.chars() {
            result.push_str(&format!("{:04X}", glyph_id(face.as_ref(), c)));
        }
        format!("<{result}>")
    }

    /// Scale a value in font units to PDF glyph space (1/1000 em)
    fn to_glyph_space(&self, value: i32) -> i32 {
        let units_per_em = self.units_per_em() as i32;
        if units_per_em == 1000 {
            value
        } else {
            value * 1000 / units_per_em
        }
    }

    /// Generate all PDF objects needed to embed this font
    pub fn to_pdf_objects(&self) -> Result<FontObjects> {
        let font_name = Object::Name(self.name.clone().into_bytes());

        let tounicode_content = self.generate_tounicode_cmap();
        let tounicode_stream = Stream::new(
            Dictionary::from_iter(vec![("Type", Object::Name(b"CMap".to_vec()))]),
            tounicode_content.into_bytes(),
        );

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&self.ttf_data)?;
        let compressed = encoder.finish()?;
        let font_file_stream = Stream::new(
            Dictionary::from_iter(vec![
                ("Length1", Object::Integer(self.ttf_data.len() as i64)),
                ("Filter", Object::Name(b"FlateDecode".to_vec())),
            ]),
            compressed,
        );

        let ascender = self.to_glyph_space(self.ascender() as i32);
        let descender = self.to_glyph_space(self.descender() as i32);

        let font_bbox = vec![
            Object::Integer(0),
            Object::Integer(descender as i64),
            Object::Integer(1000),
            Object::Integer(ascender as i64),
        ];

        let font_descriptor = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"FontDescriptor".to_vec())),
            ("FontName", font_name.clone()),
            ("Flags", Object::Integer(4)), // Symbolic font
            ("FontBBox", Object::Array(font_bbox)),
            ("ItalicAngle", Object::Integer(0)),
            ("Ascent", Object::Integer(ascender as i64)),
            ("Descent", Object::Integer(descender as i64)),
            ("CapHeight", Object::Integer(ascender as i64)),
            ("StemV", Object::Integer(80)),
        ]);

        let cid_system_info = Dictionary::from_iter(vec![
            ("Registry", Object::string_literal("Adobe")),
            ("Ordering", Object::string_literal("Identity")),
            ("Supplement", Object::Integer(0)),
        ]);

        let cid_font = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"CIDFontType2".to_vec())),
            ("BaseFont", font_name.clone()),
            ("CIDSystemInfo", Object::Dictionary(cid_system_info)),
            ("CIDToGIDMap", Object::Name(b"Identity".to_vec())),
            ("W", Object::Array(self.generate_widths_array())),
            ("DW", Object::Integer(1000)),
        ]);

        // DescendantFonts, FontDescriptor, FontFile2 and ToUnicode are
        // references and are set when the objects are added to a document
        let type0_font = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type0".to_vec())),
            ("BaseFont", font_name),
            ("Encoding", Object::Name(b"Identity-H".to_vec())),
        ]);

        Ok(FontObjects {
            type0_font,
            cid_font,
            font_descriptor,
            font_file_stream,
            tounicode_stream,
        })
    }

    /// Generate /W array for glyph widths
    fn generate_widths_array(&self) -> Vec<Object> {
        let mut widths = Vec::new();
        let face = match self.face() {
            Some(f) => f,
            None => return widths,
        };

        let mut gids: Vec<u16> = self
            .used_chars
            .iter()
            .filter_map(|&c| face.glyph_index(c).map(|id| id.0))
            .collect();
        gids.sort();
        gids.dedup();

        // Individual mapping format: [gid1 [width1] gid2 [width2] ...]
        for gid in gids {
            let advance = face
                .glyph_hor_advance(ttf_parser::GlyphId(gid))
                .map(|a| self.to_glyph_space(a as i32))
                .unwrap_or(1000);
            widths.push(Object::Integer(gid as i64));
            widths.push(Object::Array(vec![Object::Integer(advance as i64)]));
        }

        widths
    }

    /// Generate ToUnicode CMap stream content
    fn generate_tounicode_cmap(&self) -> String {
        let mut cmap = String::new();

        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        cmap.push_str("/CMapName /Adobe-Identity-UCS def\n");
        cmap.push_str("/CMapType 2 def\n");

        cmap.push_str("1 begincodespacerange\n");
        cmap.push_str("<0000> <FFFF>\n");
        cmap.push_str("endcodespacerange\n");

        let face = self.face();
        let char_list: Vec<char> = self.used_chars.iter().copied().collect();

        // bfchar sections are limited to 100 entries
        for chunk in char_list.chunks(100) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for &c in chunk {
                let gid = glyph_id(face.as_ref(), c);
                cmap.push_str(&format!("<{gid:04X}> <{}>\n", utf16_hex(c)));
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\n");
        cmap.push_str("end\n");

        cmap
    }
}

/// Glyph id for a character; 0 (.notdef) when unmapped or unparsed
fn glyph_id(face: Option<&ttf_parser::Face<'_>>, c: char) -> u16 {
    face.and_then(|f| f.glyph_index(c)).map(|id| id.0).unwrap_or(0)
}

/// UTF-16BE hex digits for a character (surrogate pairs for astral planes)
fn utf16_hex(c: char) -> String {
    let mut buf = [0u16; 2];
    c.encode_utf16(&mut buf)
        .iter()
        .map(|unit| format!("{unit:04X}"))
        .collect()
}

/// One of the 14 standard Type1 fonts every PDF reader provides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardFont {
    base_font: String,
}

impl StandardFont {
    /// Base font names of the standard 14 fonts
    pub const NAMES: [&'static str; 14] = [
        "Helvetica",
        "Helvetica-Bold",
        "Helvetica-Oblique",
        "Helvetica-BoldOblique",
        "Times-Roman",
        "Times-Bold",
        "Times-Italic",
        "Times-BoldItalic",
        "Courier",
        "Courier-Bold",
        "Courier-Oblique",
        "Courier-BoldOblique",
        "Symbol",
        "ZapfDingbats",
    ];

    /// Look up a standard font by its base font name
    pub fn new(base_font: &str) -> Result<Self> {
        if !Self::NAMES.contains(&base_font) {
            return Err(PdfError::FontNotFound(format!(
                "{base_font} is not a standard Type1 font"
            )));
        }
        Ok(Self {
            base_font: base_font.to_string(),
        })
    }

    /// Helvetica
    pub fn helvetica() -> Self {
        Self {
            base_font: "Helvetica".to_string(),
        }
    }

    pub fn base_font(&self) -> &str {
        &self.base_font
    }

    /// Font dictionary for this font
    pub fn to_pdf_object(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"Font".to_vec()));
        dict.set("Subtype", Object::Name(b"Type1".to_vec()));
        dict.set("BaseFont", Object::Name(self.base_font.clone().into_bytes()));
        // Symbol and ZapfDingbats carry their own built-in encodings
        if self.base_font != "Symbol" && self.base_font != "ZapfDingbats" {
            dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        }
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Font whose program cannot be parsed; every metric falls back to defaults
    fn unparsed_font() -> FontData {
        FontData {
            name: "test".to_string(),
            ttf_data: Arc::from(vec![0u8; 100]),
            used_chars: BTreeSet::new(),
        }
    }

    fn test_font() -> FontData {
        FontData::from_file("mono", "../../fonts/DejaVuSansMono.ttf")
            .expect("Failed to read test font file")
    }

    /// Four-digit hex groups of an `encode_text_hex` result
    fn hex_glyph_ids(encoded: &str) -> Vec<u16> {
        let digits = encoded.trim_start_matches('<').trim_end_matches('>');
        digits
            .as_bytes()
            .chunks(4)
            .map(|chunk| u16::from_str_radix(std::str::from_utf8(chunk).unwrap(), 16).unwrap())
            .collect()
    }

    #[test]
    fn test_from_ttf_rejects_garbage() {
        let result = FontData::from_ttf("bad", &[0u8; 16]);
        assert!(matches!(result, Err(PdfError::FontParseError(_))));
    }

    #[test]
    fn test_add_chars() {
        let mut font = unparsed_font();
        font.add_chars("存證信函存");
        assert_eq!(font.used_chars.len(), 4);
        assert!(font.used_chars.contains(&'存'));
        assert!(font.used_chars.contains(&'函'));
    }

    #[test]
    fn test_fresh_clears_used_chars() {
        let mut font = unparsed_font();
        font.add_chars("abc");
        let fresh = font.fresh();
        assert!(fresh.used_chars.is_empty());
        assert_eq!(fresh.name, "test");
    }

    #[test]
    fn test_metric_defaults_without_face() {
        let font = unparsed_font();
        assert_eq!(font.units_per_em(), 1000);
        assert_eq!(font.ascender(), 800);
        assert_eq!(font.descender(), -200);
        assert_eq!(glyph_id(font.face().as_ref(), 'A'), 0);
    }

    #[test]
    fn test_missing_chars_deduplicates() {
        let font = unparsed_font();
        assert_eq!(font.missing_chars("abca"), vec!['a', 'b', 'c']);
        assert!(font.missing_chars("").is_empty());
    }

    #[test]
    fn test_encode_text_hex_no_face() {
        let font = unparsed_font();
        assert_eq!(font.encode_text_hex(""), "<>");
        assert_eq!(font.encode_text_hex("AB"), "<00000000>");
    }

    #[test]
    fn test_encode_text_hex_uses_glyph_ids() {
        let font = test_font();
        let gids = hex_glyph_ids(&font.encode_text_hex("AB"));

        assert_eq!(gids.len(), 2);
        assert!(gids.iter().all(|&gid| gid != 0));
        assert_ne!(gids[0], gids[1]);
        assert_eq!(hex_glyph_ids(&font.encode_text_hex("A"))[0], gids[0]);
    }

    #[test]
    fn test_missing_chars_with_face() {
        let font = test_font();
        assert!(font.missing_chars("Hello").is_empty());
        assert_eq!(font.missing_chars("A存證A"), vec!['存', '證']);
    }

    #[test]
    fn test_widths_array_with_face() {
        let mut font = test_font();
        font.add_chars("ABA");

        let widths = font.generate_widths_array();
        assert_eq!(widths.len(), 4);

        let gids = hex_glyph_ids(&font.encode_text_hex("AB"));
        let mut advances = Vec::new();
        for pair in widths.chunks(2) {
            let gid = pair[0].as_i64().unwrap();
            assert!(gids.contains(&(gid as u16)));
            let width = pair[1].as_array().unwrap();
            assert_eq!(width.len(), 1);
            advances.push(width[0].as_i64().unwrap());
        }

        // Monospaced: every glyph has the same advance, a bit over half an em
        assert!(advances[0] > 500 && advances[0] < 700);
        assert_eq!(advances[0], advances[1]);
    }

    #[test]
    fn test_tounicode_cmap_with_face() {
        let mut font = test_font();
        font.add_chars("A");

        let gid = hex_glyph_ids(&font.encode_text_hex("A"))[0];
        let cmap = font.generate_tounicode_cmap();
        assert!(cmap.contains(&format!("<{gid:04X}> <0041>")));
        assert!(!cmap.contains("<0000> <0041>"));
    }

    #[test]
    fn test_font_metrics_scaled_from_face() {
        let font = test_font();
        assert_eq!(font.units_per_em(), 2048);
        assert!(font.ascender() > 0);
        assert!(font.descender() < 0);

        let objects = font.to_pdf_objects().unwrap();
        let ascent = objects
            .font_descriptor
            .get(b"Ascent")
            .unwrap()
            .as_i64()
            .unwrap();
        assert!(ascent > 0 && ascent < 1000);
    }

    #[test]
    fn test_to_pdf_objects() {
        let mut font = unparsed_font();
        font.add_chars("Hello");

        let objects = font
            .to_pdf_objects()
            .expect("Failed to generate PDF objects");

        assert!(objects.type0_font.get(b"Encoding").is_ok());
        assert!(objects.cid_font.get(b"W").is_ok());
        assert!(objects.font_descriptor.get(b"FontBBox").is_ok());
        assert!(!objects.font_file_stream.content.is_empty());
        assert_eq!(
            objects
                .font_file_stream
                .dict
                .get(b"Length1")
                .unwrap()
                .as_i64()
                .unwrap(),
            100
        );
        assert!(!objects.tounicode_stream.content.is_empty());
    }

    #[test]
    fn test_generate_tounicode_cmap() {
        let mut font = unparsed_font();
        font.add_chars("A王");

        let cmap = font.generate_tounicode_cmap();

        assert!(cmap.contains("begincmap"));
        assert!(cmap.contains("2 beginbfchar"));
        assert!(cmap.contains("<0000> <0041>"));
        assert!(cmap.contains("<0000> <738B>"));
        assert!(cmap.contains("endcmap"));
    }

    #[test]
    fn test_generate_tounicode_cmap_empty() {
        let font = unparsed_font();
        let cmap = font.generate_tounicode_cmap();
        assert!(!cmap.contains("beginbfchar"));
        assert!(cmap.contains("endcmap"));
    }

    #[test]
    fn test_utf16_hex_astral() {
        assert_eq!(utf16_hex('A'), "0041");
        assert_eq!(utf16_hex('𠀋'), "D840DC0B");
    }

    #[test]
    fn test_standard_font_lookup() {
        assert!(StandardFont::new("Courier").is_ok());
        assert!(matches!(
            StandardFont::new("Comic Sans"),
            Err(PdfError::FontNotFound(_))
        ));
    }

    #[test]
    fn test_standard_font_dictionary() {
        let dict = StandardFont::helvetica().to_pdf_object();
        assert_eq!(
            dict.get(b"BaseFont").unwrap().as_name().unwrap(),
            b"Helvetica"
        );
        assert!(dict.get(b"Encoding").is_ok());

        let symbol = StandardFont::new("Symbol").unwrap().to_pdf_object();
        assert!(symbol.get(b"Encoding").is_err());
    }
}
