//! Body text layout on the character grid

use crate::grid::GridConfig;

/// One draw instruction
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub text: String,
    /// X in points from the left edge
    pub x: f64,
    /// Baseline in points from the bottom edge
    pub y: f64,
    pub font_size: f32,
}

impl Placement {
    pub fn new(text: impl Into<String>, x: f64, y: f64, font_size: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            font_size,
        }
    }
}

/// Layout position within the current page
///
/// `line` and `char_in_line` are 1-based: a cursor at the origin is on
/// line 1 and about to place character 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageCursor {
    pub x: f64,
    pub y: f64,
    pub line: usize,
    pub char_in_line: usize,
}

impl PageCursor {
    /// Cursor at the content origin
    pub fn at_origin(grid: &GridConfig) -> Self {
        Self {
            x: grid.content_x_begin,
            y: grid.content_y_begin,
            line: 1,
            char_in_line: 1,
        }
    }

    /// Move to the start of the next line
    pub fn new_line(&mut self, grid: &GridConfig) {
        self.x = grid.content_x_begin;
        self.y -= grid.line_advance();
        self.line += 1;
        self.char_in_line = 1;
    }

    /// Move past a placed character
    pub fn advance(&mut self, grid: &GridConfig) {
        self.x += grid.char_advance();
        self.char_in_line += 1;
    }

    /// Whether the next character would overflow the line
    pub fn line_full(&self, grid: &GridConfig) -> bool {
        self.char_in_line > grid.max_chars_per_line
    }

    /// Whether the cursor has moved past the last line of the page
    pub fn page_full(&self, grid: &GridConfig) -> bool {
        self.line > grid.max_lines_per_page
    }
}

/// Body placements split into pages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodyLayout {
    pages: Vec<Vec<Placement>>,
}

impl BodyLayout {
    /// Number of pages; at least one for any layout produced by
    /// [`layout_body`]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[Vec<Placement>] {
        &self.pages
    }

    /// Placements of one page (0-indexed)
    pub fn page(&self, index: usize) -> Option<&[Placement]> {
        self.pages.get(index).map(Vec::as_slice)
    }

    /// Total number of placed characters
    pub fn placement_count(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }
}

/// Lay out body text one character per grid cell
///
/// A newline, or a character that would overflow the line, starts a new
/// line; a newline itself is never drawn. The line break is applied before
/// checking for page overflow, so a character that fills the last line and
/// overflows it lands first on a new page. The final page is always
/// closed, even if nothing was placed on it.
pub fn layout_body(text: &str, grid: &GridConfig) -> BodyLayout {
    let mut pages = Vec::new();
    let mut current = Vec::new();
    let mut cursor = PageCursor::at_origin(grid);

    for c in text.chars() {
        let is_newline = c == '\n';
        if is_newline || cursor.line_full(grid) {
            cursor.new_line(grid);
            if is_newline {
                continue;
            }
        }

        if cursor.page_full(grid) {
            log::debug!("Page {} closed with {} characters", pages.len() + 1, current.len());
            pages.push(std::mem::take(&mut current));
            cursor = PageCursor::at_origin(grid);
        }

        current.push(Placement::new(c, cursor.x, cursor.y, grid.body_font_size));
        cursor.advance(grid);
    }

    log::debug!("Page {} closed with {} characters", pages.len() + 1, current.len());
    pages.push(current);

    BodyLayout { pages }
}
