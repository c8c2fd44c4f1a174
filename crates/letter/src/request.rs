//! Letter requests

use crate::party::{Parties, Party, PartyList};
use crate::{LetterError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A letter as submitted: party lists and body text
///
/// ```json
/// {
///   "from": [{ "name": "王小明", "address": "台北市..." }],
///   "to": [{ "name": "李小華", "address": "新北市..." }],
///   "copy": [],
///   "text": "..."
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterRequest {
    #[serde(default)]
    pub from: Vec<Party>,
    #[serde(default)]
    pub to: Vec<Party>,
    #[serde(default)]
    pub copy: Vec<Party>,
    #[serde(default)]
    pub text: String,
}

impl LetterRequest {
    /// Parse a request from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON request file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Normalize into a [`Letter`]
    ///
    /// Empty party lists become a single blank entry and Windows line
    /// endings become `\n`. Fails with [`LetterError::EmptyText`] when the
    /// body is empty.
    pub fn into_letter(self) -> Result<Letter> {
        let text = normalize_line_endings(&self.text);
        if text.is_empty() {
            return Err(LetterError::EmptyText);
        }

        Ok(Letter {
            parties: Parties {
                sender: PartyList::new(self.from),
                receiver: PartyList::new(self.to),
                cc: PartyList::new(self.copy),
            },
            text,
        })
    }
}

/// A normalized letter, ready for layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Letter {
    pub parties: Parties,
    pub text: String,
}

fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
