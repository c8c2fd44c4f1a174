//! Form grid model

use crate::party::Role;
use crate::{LetterError, Result};
use pdf_core::PageSize;
use serde::{Deserialize, Serialize};

/// Name and address slot positions for one party role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SlotGeometry {
    /// X of the first name slot
    pub name_x_begin: f64,
    /// Horizontal distance between consecutive names
    pub name_x_interval: f64,
    /// Baseline of the name row
    pub name_y_begin: f64,
    /// X of the address slot
    pub addr_x_begin: f64,
    /// Baseline of the address slot
    pub addr_y_begin: f64,
}

impl SlotGeometry {
    pub const fn new(
        name_x_begin: f64,
        name_x_interval: f64,
        name_y_begin: f64,
        addr_x_begin: f64,
        addr_y_begin: f64,
    ) -> Self {
        Self {
            name_x_begin,
            name_x_interval,
            name_y_begin,
            addr_x_begin,
            addr_y_begin,
        }
    }
}

/// Coordinate geometry of the printed letter form
///
/// All coordinates are PDF points with the origin at the bottom-left corner
/// of the page. Every field has a default matching the post office form, so
/// a configuration file only needs to name the values it changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GridConfig {
    /// Page width in points
    pub page_width: f64,
    /// Page height in points
    pub page_height: f64,

    /// X of the first character on a line
    pub content_x_begin: f64,
    /// Baseline of the first line on a page
    pub content_y_begin: f64,
    /// Horizontal character pitch
    pub content_x_interval: f64,
    /// Correction subtracted from the horizontal pitch
    pub content_x_fix: f64,
    /// Vertical line pitch
    pub content_y_interval: f64,
    /// Correction added to the vertical pitch
    pub content_y_fix: f64,

    /// Characters per line before wrapping
    pub max_chars_per_line: usize,
    /// Lines per page before a page break
    pub max_lines_per_page: usize,

    /// Font size for party names and addresses
    pub party_font_size: f32,
    /// Font size for body characters
    pub body_font_size: f32,

    pub sender: SlotGeometry,
    pub receiver: SlotGeometry,
    pub cc: SlotGeometry,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            page_width: PageSize::A4.width,
            page_height: PageSize::A4.height,
            content_x_begin: 62.0,
            content_y_begin: 556.0,
            content_x_interval: 24.4,
            content_x_fix: 0.4,
            content_y_interval: 24.5,
            content_y_fix: 0.5,
            max_chars_per_line: 20,
            max_lines_per_page: 10,
            party_font_size: 10.0,
            body_font_size: 20.0,
            sender: SlotGeometry::new(140.0, 110.0, 780.0, 140.0, 762.0),
            receiver: SlotGeometry::new(140.0, 110.0, 735.0, 140.0, 717.0),
            cc: SlotGeometry::new(140.0, 110.0, 690.0, 140.0, 672.0),
        }
    }
}

impl GridConfig {
    /// Slot geometry for a party role
    pub fn slot(&self, role: Role) -> &SlotGeometry {
        match role {
            Role::Sender => &self.sender,
            Role::Receiver => &self.receiver,
            Role::Cc => &self.cc,
        }
    }

    pub fn page_size(&self) -> PageSize {
        PageSize::new(self.page_width, self.page_height)
    }

    /// Horizontal advance after each body character
    pub fn char_advance(&self) -> f64 {
        self.content_x_interval - self.content_x_fix
    }

    /// Vertical drop for each new line
    pub fn line_advance(&self) -> f64 {
        self.content_y_interval + self.content_y_fix
    }

    /// Number of body characters a full page holds
    pub fn chars_per_page(&self) -> usize {
        self.max_chars_per_line * self.max_lines_per_page
    }

    /// Check every constraint on the geometry
    ///
    /// Returns [`LetterError::Configuration`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<()> {
        positive("pageWidth", self.page_width)?;
        positive("pageHeight", self.page_height)?;
        positive("contentXInterval", self.content_x_interval)?;
        positive("contentYInterval", self.content_y_interval)?;
        finite("contentXFix", self.content_x_fix)?;
        finite("contentYFix", self.content_y_fix)?;
        positive("contentXInterval - contentXFix", self.char_advance())?;
        positive("contentYInterval + contentYFix", self.line_advance())?;
        positive("partyFontSize", self.party_font_size as f64)?;
        positive("bodyFontSize", self.body_font_size as f64)?;

        if self.max_chars_per_line == 0 {
            return Err(config_error("maxCharsPerLine must be positive"));
        }
        if self.max_lines_per_page == 0 {
            return Err(config_error("maxLinesPerPage must be positive"));
        }

        self.within_page("content origin", self.content_x_begin, self.content_y_begin)?;
        let (last_x, last_y) = self.last_cell();
        self.within_page("last body cell", last_x, last_y)?;

        for role in Role::ALL {
            let slot = self.slot(role);
            let field = role.config_key();
            positive(&format!("{field}.nameXInterval"), slot.name_x_interval)?;
            self.within_page(
                &format!("{field} name slot"),
                slot.name_x_begin,
                slot.name_y_begin,
            )?;
            self.within_page(
                &format!("{field} address slot"),
                slot.addr_x_begin,
                slot.addr_y_begin,
            )?;
        }

        Ok(())
    }

    /// Position of the last character of the last line on a full page
    fn last_cell(&self) -> (f64, f64) {
        let x = self.content_x_begin + (self.max_chars_per_line - 1) as f64 * self.char_advance();
        let y = self.content_y_begin - (self.max_lines_per_page - 1) as f64 * self.line_advance();
        (x, y)
    }

    fn within_page(&self, what: &str, x: f64, y: f64) -> Result<()> {
        let inside = x.is_finite()
            && y.is_finite()
            && (0.0..=self.page_width).contains(&x)
            && (0.0..=self.page_height).contains(&y);
        if inside {
            Ok(())
        } else {
            Err(config_error(&format!(
                "{what} ({x}, {y}) lies outside the {}x{} page",
                self.page_width, self.page_height
            )))
        }
    }
}

fn config_error(message: &str) -> LetterError {
    LetterError::Configuration(message.to_string())
}

fn positive(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(config_error(&format!("{field} must be positive, got {value}")))
    }
}

fn finite(field: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(config_error(&format!("{field} must be a finite number")))
    }
}
