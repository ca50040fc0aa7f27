use std::borrow::Cow;

use er7_lexer::{escape, parse_field_components, Delimiters, EscapeMode, LexError};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// `[repetition][component][subcomponent]` leaf values, unescaped.
pub type Repetitions = Vec<Vec<Vec<String>>>;

/// One field of a segment.
///
/// Values are kept in normalized form: trailing empty subcomponents,
/// components and repetitions are dropped, so an empty component is an
/// empty vector and an empty field has no repetitions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Field {
    /// Raw wire text, never split or unescaped. Used for the delimiter fields
    /// of header segments and for fields the segment layout does not cover.
    Opaque(String),
    Value(Repetitions),
}

impl Default for Field {
    fn default() -> Self {
        Field::Value(Vec::new())
    }
}

impl Field {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A field holding one literal value.
    pub fn text(value: impl Into<String>) -> Self {
        let mut field = Field::Value(vec![vec![vec![value.into()]]]);
        field.normalize();
        field
    }

    pub fn opaque(raw: impl Into<String>) -> Self {
        Field::Opaque(raw.into())
    }

    /// Split `raw` on the profile's separators and unescape every leaf.
    pub fn parse(raw: &str, d: &Delimiters, mode: EscapeMode) -> Result<Self, LexError> {
        let mut field = Field::Value(parse_field_components(raw, d, mode)?);
        field.normalize();
        Ok(field)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Field::Opaque(raw) => raw.is_empty(),
            Field::Value(reps) => reps.is_empty(),
        }
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, Field::Opaque(_))
    }

    /// Number of repetitions. An opaque field counts as one when non-empty.
    pub fn repetition_count(&self) -> usize {
        match self {
            Field::Opaque(raw) => usize::from(!raw.is_empty()),
            Field::Value(reps) => reps.len(),
        }
    }

    /// Structured view; opaque text is split tolerantly on the fly.
    pub fn structured(&self, d: &Delimiters) -> Cow<'_, Field> {
        match self {
            Field::Value(_) => Cow::Borrowed(self),
            Field::Opaque(raw) => Cow::Owned(
                Field::parse(raw, d, EscapeMode::Tolerant).unwrap_or_else(|_| Field::text(raw.clone())),
            ),
        }
    }

    /// Leaf value at 1-based indices, if present.
    pub fn leaf(&self, repetition: usize, component: usize, subcomponent: usize) -> Option<&str> {
        let Field::Value(reps) = self else {
            return None;
        };
        reps.get(repetition.checked_sub(1)?)?
            .get(component.checked_sub(1)?)?
            .get(subcomponent.checked_sub(1)?)
            .map(String::as_str)
    }

    /// Write a leaf value at 1-based indices, growing the field as needed.
    /// Opaque text is structured first.
    pub fn set_leaf(&mut self, d: &Delimiters, repetition: usize, component: usize, subcomponent: usize, value: &str) {
        if let Field::Opaque(_) = self {
            let structured = self.structured(d).into_owned();
            *self = structured;
        }
        let Field::Value(reps) = self else {
            return;
        };
        let (r, c, s) = (
            repetition.saturating_sub(1),
            component.saturating_sub(1),
            subcomponent.saturating_sub(1),
        );
        if reps.len() <= r {
            reps.resize_with(r + 1, Vec::new);
        }
        let comps = &mut reps[r];
        if comps.len() <= c {
            comps.resize_with(c + 1, Vec::new);
        }
        let subs = &mut comps[c];
        if subs.len() <= s {
            subs.resize_with(s + 1, String::new);
        }
        subs[s] = value.to_string();
        self.normalize();
    }

    pub fn normalize(&mut self) {
        let Field::Value(reps) = self else {
            return;
        };
        for comps in reps.iter_mut() {
            for subs in comps.iter_mut() {
                while subs.last().is_some_and(String::is_empty) {
                    subs.pop();
                }
            }
            while comps.last().is_some_and(Vec::is_empty) {
                comps.pop();
            }
        }
        while reps.last().is_some_and(Vec::is_empty) {
            reps.pop();
        }
    }

    /// Wire text for this field, escaping every leaf.
    pub fn encode(&self, d: &Delimiters) -> Cow<'_, str> {
        match self {
            Field::Opaque(raw) => Cow::Borrowed(raw.as_str()),
            Field::Value(reps) => Cow::Owned(encode_repetitions(reps, d)),
        }
    }
}

fn encode_repetitions(reps: &[Vec<Vec<String>>], d: &Delimiters) -> String {
    let mut out = String::new();
    for (ri, comps) in reps.iter().enumerate() {
        if ri > 0 {
            out.push(d.repetition);
        }
        out.push_str(&encode_components(comps, d));
    }
    out
}

pub(crate) fn encode_components(comps: &[Vec<String>], d: &Delimiters) -> String {
    let mut out = String::new();
    for (ci, subs) in comps.iter().enumerate() {
        if ci > 0 {
            out.push(d.component);
        }
        for (si, leaf) in subs.iter().enumerate() {
            if si > 0 {
                out.push(d.subcomponent);
            }
            out.push_str(&escape(leaf, d));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(raw: &str) -> Field {
        Field::parse(raw, &Delimiters::default(), EscapeMode::Tolerant).unwrap()
    }

    #[test]
    fn trailing_empties_are_trimmed() {
        assert_eq!(parse("a^b^^"), parse("a^b"));
        assert_eq!(parse("a~~"), parse("a"));
        assert_eq!(parse("a&&^"), parse("a"));
        assert!(parse("^^~&").is_empty());
        // Inner empties stay.
        assert_eq!(
            parse("a^^c"),
            Field::Value(vec![vec![vec!["a".into()], vec![], vec!["c".into()]]])
        );
    }

    #[test]
    fn encode_escapes_leaves() {
        let d = Delimiters::default();
        let field = Field::text("x|y");
        assert_eq!(field.encode(&d), "x\\F\\y");
        assert_eq!(parse("x\\F\\y"), field);
        assert_eq!(parse("1^2&3~4").encode(&d), "1^2&3~4");
    }

    #[test]
    fn set_leaf_grows_and_normalizes() {
        let d = Delimiters::default();
        let mut field = Field::empty();
        field.set_leaf(&d, 2, 3, 1, "z");
        assert_eq!(field.encode(&d), "~^^z");
        assert_eq!(field.leaf(2, 3, 1), Some("z"));
        field.set_leaf(&d, 2, 3, 1, "");
        assert!(field.is_empty());
    }

    #[test]
    fn opaque_fields_are_read_through_a_structured_view() {
        let d = Delimiters::default();
        let field = Field::opaque("A^B\\S\\C");
        assert_eq!(field.encode(&d), "A^B\\S\\C");
        assert_eq!(field.structured(&d).leaf(1, 2, 1), Some("B^C"));
        assert_eq!(field.repetition_count(), 1);
    }
}
