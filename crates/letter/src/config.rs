//! Letter configuration file

use crate::grid::GridConfig;
use crate::renderer::PartyBlockRepeat;
use crate::{LetterError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything needed to produce letters, loaded once at startup
///
/// ```json
/// {
///   "template": "resources/lal-form.pdf",
///   "font": "resources/kaiu.ttf",
///   "partyBlockRepeat": "everyPage",
///   "grid": { "maxCharsPerLine": 20, "maxLinesPerPage": 10 }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LetterConfig {
    /// Form geometry
    pub grid: GridConfig,
    /// Blank letter form PDF; its first page is the background of every page
    pub template: PathBuf,
    /// TrueType font for all letter text; Helvetica when absent
    pub font: Option<PathBuf>,
    pub party_block_repeat: PartyBlockRepeat,
}

impl Default for LetterConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            template: PathBuf::from("resources/lal-form.pdf"),
            font: None,
            party_block_repeat: PartyBlockRepeat::default(),
        }
    }
}

impl LetterConfig {
    /// Parse and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LetterConfig = serde_json::from_str(json)
            .map_err(|e| LetterError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file
    ///
    /// Relative template and font paths are resolved against the directory
    /// holding the file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            LetterError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_json(&json)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }

        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Check the grid and the file paths
    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        if self.template.as_os_str().is_empty() {
            return Err(LetterError::Configuration(
                "template path is empty".to_string(),
            ));
        }
        if matches!(&self.font, Some(font) if font.as_os_str().is_empty()) {
            return Err(LetterError::Configuration("font path is empty".to_string()));
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        if self.template.is_relative() {
            self.template = base.join(&self.template);
        }
        if let Some(font) = self.font.as_mut() {
            if font.is_relative() {
                *font = base.join(&*font);
            }
        }
    }
}
