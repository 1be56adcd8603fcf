//! Positional mapping of text blocks onto seed fields.
//!
//! Seed pages carry no labels a parser could key on, so fields are assigned
//! purely by block position. The whole contract is the [`FIELD_MAP`] table:
//! if the site inserts, drops, or reorders a block, later fields shift
//! silently and no error is raised.

use chrono::Datelike;
use seedbank_shared::{DateNormalizer, ParagraphBlock, SeedRecord};
use tracing::{error, warn};

/// A seed field fed from a single positional block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedField {
    /// Display date, also decomposed into day/month/year.
    Date,
    Scripture,
    Thought,
    RememberThis,
    Assignment,
    Prayer,
    Resource,
    DailyReading,
}

/// Zero-based block position → field. Positions not listed map to nothing.
pub const FIELD_MAP: [(usize, SeedField); 8] = [
    (1, SeedField::Date),
    (2, SeedField::Scripture),
    (3, SeedField::Thought),
    (10, SeedField::RememberThis),
    (11, SeedField::Assignment),
    (12, SeedField::Prayer),
    (13, SeedField::Resource),
    (14, SeedField::DailyReading),
];

/// The field assigned to a block position, if any.
pub fn field_at(position: usize) -> Option<SeedField> {
    FIELD_MAP
        .iter()
        .find(|(p, _)| *p == position)
        .map(|(_, field)| *field)
}

impl SeedField {
    /// Write `text` into this field of `seed`.
    ///
    /// A date that fails to normalize is logged and left empty; it never
    /// aborts the extraction of the remaining blocks.
    pub fn apply(self, seed: &mut SeedRecord, text: &str, normalizer: &DateNormalizer) {
        match self {
            Self::Date => {
                // The first token is the weekday name.
                let date_part = text.split_whitespace().skip(1).collect::<Vec<_>>().join(" ");
                match normalizer.normalize(&date_part) {
                    Ok(date) => {
                        seed.date = text.to_string();
                        seed.day = date.day();
                        seed.month = date.month();
                        seed.year = date.year();
                    }
                    Err(e) if e.is_date_error() => {
                        warn!(error = %e, text, "could not normalize seed date")
                    }
                    Err(e) => error!(error = %e, text, "date normalization failed unexpectedly"),
                }
            }
            Self::Scripture => seed.scripture = text.to_string(),
            Self::Thought => seed.thought = text.to_string(),
            Self::RememberThis => seed.remember_this = text.to_string(),
            Self::Assignment => seed.assignment = text.to_string(),
            Self::Prayer => seed.prayer = text.to_string(),
            Self::Resource => seed.resource = text.to_string(),
            Self::DailyReading => seed.daily_reading = text.to_string(),
        }
    }
}

/// Build a record from ordered text blocks.
///
/// Mapped blocks fill their field; every block, mapped or not, is kept as a
/// plain-text paragraph at its original position.
pub fn build_record(title: &str, blocks: &[String], normalizer: &DateNormalizer) -> SeedRecord {
    let mut seed = SeedRecord::titled(title);

    for (position, text) in blocks.iter().enumerate() {
        if let Some(field) = field_at(position) {
            field.apply(&mut seed, text, normalizer);
        }
        seed.paragraphs
            .push(ParagraphBlock::plain(position as u32, text.as_str()));
    }

    seed
}
