//! Output Surface
//!
//! The presenters never draw directly. They write text and style flags into
//! named fields; the terminal renderer reads the fields back. A write to a
//! field the surface does not have is dropped and reported as `false`.

use std::collections::{BTreeSet, HashMap};

use crate::model::LineId;

pub const TOTAL_QUANTITY: &str = "total-quantity";
pub const TOTAL_DELTA: &str = "total-delta";
pub const TOTAL_SCRAP: &str = "total-scrap";
pub const AVERAGE_SCRAP_RATE: &str = "average-scrap-rate";
pub const LAST_REFRESH: &str = "last-refresh";

/// Style flag set on delta fields that are ahead of plan.
pub const POSITIVE: &str = "positive";

/// Per-line field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineField {
    Program,
    PartNumber,
    PartDescription,
    Quantity,
    Delta,
    Scrap,
    ScrapRate,
}

impl LineField {
    pub const ALL: [LineField; 7] = [
        LineField::Program,
        LineField::PartNumber,
        LineField::PartDescription,
        LineField::Quantity,
        LineField::Delta,
        LineField::Scrap,
        LineField::ScrapRate,
    ];

    fn stem(self) -> &'static str {
        match self {
            LineField::Program => "program",
            LineField::PartNumber => "part-number",
            LineField::PartDescription => "part-description",
            LineField::Quantity => "quantity",
            LineField::Delta => "delta",
            LineField::Scrap => "scrap",
            LineField::ScrapRate => "scrap-rate",
        }
    }

    /// Identifier of this field for `line`, e.g. `scrap-rate-2`.
    pub fn id(self, line: LineId) -> String {
        format!("{}-{}", self.stem(), line.number())
    }
}

/// Every field identifier the dashboard expects to exist.
pub fn required_fields() -> Vec<String> {
    let mut ids: Vec<String> = LineId::ALL
        .iter()
        .flat_map(|line| LineField::ALL.iter().map(move |field| field.id(*line)))
        .collect();
    ids.extend(
        [TOTAL_QUANTITY, TOTAL_DELTA, TOTAL_SCRAP, AVERAGE_SCRAP_RATE, LAST_REFRESH]
            .iter()
            .map(|id| id.to_string()),
    );
    ids
}

pub trait Surface {
    /// Replace the text of field `id`. Returns `false` when the field is missing.
    fn set_text(&mut self, id: &str, text: &str) -> bool;

    /// Turn style flag `flag` on or off for field `id`.
    fn set_flag(&mut self, id: &str, flag: &str, on: bool) -> bool;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Field {
    pub text: String,
    pub flags: BTreeSet<String>,
}

/// In-memory surface keyed by field identifier.
#[derive(Debug, Clone, Default)]
pub struct FieldBoard {
    fields: HashMap<String, Field>,
}

impl FieldBoard {
    pub fn with_fields<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: ids.into_iter().map(|id| (id.into(), Field::default())).collect(),
        }
    }

    /// Board carrying every field in [`required_fields`].
    pub fn dashboard() -> Self {
        Self::with_fields(required_fields())
    }

    pub fn text(&self, id: &str) -> Option<&str> {
        self.fields.get(id).map(|f| f.text.as_str())
    }

    /// Text of `id`, or an empty string when the field is missing.
    pub fn text_or_blank(&self, id: &str) -> &str {
        self.text(id).unwrap_or("")
    }

    pub fn has_flag(&self, id: &str, flag: &str) -> bool {
        self.fields.get(id).is_some_and(|f| f.flags.contains(flag))
    }

    pub fn remove(&mut self, id: &str) -> Option<Field> {
        self.fields.remove(id)
    }
}

impl Surface for FieldBoard {
    fn set_text(&mut self, id: &str, text: &str) -> bool {
        match self.fields.get_mut(id) {
            Some(field) => {
                if field.text != text {
                    field.text.clear();
                    field.text.push_str(text);
                }
                true
            }
            None => false,
        }
    }

    fn set_flag(&mut self, id: &str, flag: &str, on: bool) -> bool {
        match self.fields.get_mut(id) {
            Some(field) => {
                if on {
                    field.flags.insert(flag.to_string());
                } else {
                    field.flags.remove(flag);
                }
                true
            }
            None => false,
        }
    }
}
