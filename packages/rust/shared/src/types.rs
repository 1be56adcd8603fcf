//! Core domain types for daily seed records.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeedError};

// ---------------------------------------------------------------------------
// ParagraphKind
// ---------------------------------------------------------------------------

/// Type tag of a paragraph block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParagraphKind {
    /// Plain rendered text.
    #[default]
    PlainText,
    /// A hyperlink.
    Hyperlink,
}

impl ParagraphKind {
    /// Integer code stored in the `paragraphs.kind` column.
    pub fn code(self) -> i64 {
        match self {
            Self::PlainText => 1,
            Self::Hyperlink => 2,
        }
    }

    /// Decode a stored `paragraphs.kind` value.
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            1 => Ok(Self::PlainText),
            2 => Ok(Self::Hyperlink),
            other => Err(SeedError::storage(format!("unknown paragraph kind {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// ParagraphBlock
// ---------------------------------------------------------------------------

/// One text block of a seed page, in original page order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphBlock {
    /// Zero-based ordinal position among the non-blank blocks of the page.
    pub position: u32,
    /// Block type.
    #[serde(rename = "type")]
    pub kind: ParagraphKind,
    /// Rendered text content.
    pub content: String,
}

impl ParagraphBlock {
    /// A plain-text block at `position`.
    pub fn plain(position: u32, content: impl Into<String>) -> Self {
        Self {
            position,
            kind: ParagraphKind::PlainText,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// SeedRecord
// ---------------------------------------------------------------------------

/// A daily devotional record, uniquely keyed by `(day, month, year)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedRecord {
    /// Generated row identifier; `None` until persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub thought: String,
    pub content: String,
    pub prayer: String,
    pub assignment: String,
    pub daily_reading: String,
    pub quote: String,
    pub resource: String,
    pub scripture: String,
    pub remember_this: String,
    /// Display date exactly as printed on the page, weekday included.
    pub date: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// Every extracted block, in original page order.
    pub paragraphs: Vec<ParagraphBlock>,
}

impl SeedRecord {
    /// An empty record carrying only its title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// The `(day, month, year)` key of this record.
    pub fn key(&self) -> (u32, u32, i32) {
        (self.day, self.month, self.year)
    }

    /// Check the record is fit to persist: it needs a title and a display date.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(SeedError::validation("title is required"));
        }
        if self.date.trim().is_empty() {
            return Err(SeedError::validation(format!(
                "date is required (title: {:?})",
                self.title
            )));
        }
        Ok(())
    }
}
