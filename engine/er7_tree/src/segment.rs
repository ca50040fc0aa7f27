use er7_grammar::SegmentNode;
use er7_lexer::{is_header_segment, Delimiters, EscapeMode, InternedString, LexError, RawSegment};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::field::Field;

/// A segment instance. `fields[0]` is field 1.
///
/// Equality compares name and fields only; source coordinates are
/// bookkeeping for diagnostics.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    pub name: InternedString,
    pub fields: Vec<Field>,
    /// Index in the token stream the segment was read from.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub position: Option<usize>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub line: Option<usize>,
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.fields == other.fields
    }
}

impl Eq for Segment {}

impl Segment {
    pub fn new(name: impl Into<InternedString>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            position: None,
            line: None,
        }
    }

    /// A new segment; header segments get their delimiter fields from `d`.
    pub fn with_delimiters(name: impl Into<InternedString>, d: &Delimiters) -> Self {
        let mut segment = Segment::new(name);
        if segment.is_header() {
            segment.fields = vec![
                Field::opaque(d.field.to_string()),
                Field::opaque(d.encoding_characters()),
            ];
        }
        segment
    }

    /// Build a segment from tokenizer output. Fields covered by `layout` are
    /// split and unescaped; the rest stay opaque.
    pub fn from_raw(
        raw: &RawSegment<'_>,
        layout: Option<&SegmentNode>,
        d: &Delimiters,
        mode: EscapeMode,
    ) -> Result<Self, LexError> {
        let header = raw.is_header();
        let covered = layout.map_or(0, |l| l.fields.len());
        let mut fields = Vec::with_capacity(raw.fields.len());
        for (index, text) in raw.fields.iter().enumerate() {
            let opaque = index >= covered || (header && index < 2);
            let field = if opaque {
                Field::opaque(*text)
            } else {
                Field::parse(text, d, mode).map_err(|e| e.at_line(raw.line))?
            };
            fields.push(field);
        }
        let mut segment = Segment {
            name: InternedString::from(raw.name),
            fields,
            position: Some(raw.position),
            line: Some(raw.line),
        };
        segment.normalize();
        Ok(segment)
    }

    pub fn is_header(&self) -> bool {
        is_header_segment(self.name.as_str())
    }

    /// Field by its 1-based number.
    pub fn field(&self, number: usize) -> Option<&Field> {
        number.checked_sub(1).and_then(|i| self.fields.get(i))
    }

    /// Field by its 1-based number, padding with empty fields as needed.
    pub fn field_mut(&mut self, number: usize) -> &mut Field {
        let index = number.saturating_sub(1);
        if self.fields.len() <= index {
            self.fields.resize_with(index + 1, Field::empty);
        }
        &mut self.fields[index]
    }

    pub fn set_field(&mut self, number: usize, field: Field) {
        *self.field_mut(number) = field;
        self.normalize();
    }

    /// Drop trailing empty fields. Header delimiter fields are always kept.
    pub fn normalize(&mut self) {
        let keep = if self.is_header() { 2 } else { 0 };
        while self.fields.len() > keep && self.fields.last().is_some_and(Field::is_empty) {
            self.fields.pop();
        }
    }

    /// Wire text without the terminator. Header delimiter fields are
    /// regenerated from `d`.
    pub fn encode(&self, d: &Delimiters) -> String {
        let mut out = String::from(self.name.as_str());
        let mut fields = self.fields.as_slice();
        if self.is_header() {
            out.push(d.field);
            out.push_str(&d.encoding_characters());
            fields = fields.get(2..).unwrap_or_default();
        }
        let last = fields.iter().rposition(|f| !f.is_empty()).map_or(0, |i| i + 1);
        for field in &fields[..last] {
            out.push(d.field);
            out.push_str(&field.encode(d));
        }
        out
    }
}
