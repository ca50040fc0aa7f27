//! Element trees for HL7 v2 messages.
//!
//! A [`Message`] owns a root [`Group`] occurrence whose children are
//! segments, nested group occurrences and, after a tolerant parse, segments
//! the grammar had no place for. Every matched child records the grammar
//! slot it fills, so the tree can be validated and encoded without
//! re-matching.

pub mod edit;
pub mod element;
pub mod error;
pub mod field;
pub mod message;
pub mod path;
pub mod segment;
pub mod visit;

pub use element::{Element, Group};
pub use error::{EditError, PathError};
pub use field::{Field, Repetitions};
pub use message::Message;
pub use path::{FieldRef, Path, PathStep};
pub use segment::Segment;
pub use visit::{SegmentCollector, ShapeCounter, Visitable, Visitor};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use std::error::Error;

/// A result type for JSON conversions.
#[cfg(feature = "serde")]
pub type Result<T> = std::result::Result<T, Box<dyn Error + Send + Sync>>;

/// Serializes a tree node to a JSON string.
#[cfg(feature = "serde")]
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Deserializes a tree node from a JSON string.
#[cfg(feature = "serde")]
pub fn from_json<T: for<'de> Deserialize<'de>>(json: &str) -> Result<T> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;
    use er7_grammar::NodeId;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_serialization() -> Result<()> {
        let mut line = Segment::new("LINE");
        line.set_field(1, Field::text("x|y"));
        line.set_field(3, Field::opaque("raw^text"));
        let mut item = Group::new("ITEM", NodeId(1), 1);
        item.children.push(Element::Segment {
            slot: 0,
            segment: line,
        });
        item.children.push(Element::Unparsed {
            segment: Segment::new("ZZZ"),
        });

        let json = to_json(&item)?;
        assert!(json.contains(r#""kind": "segment""#));
        assert!(json.contains(r#""opaque": "raw^text""#));
        let back: Group = from_json(&json)?;
        assert_eq!(item, back);
        Ok(())
    }
}
