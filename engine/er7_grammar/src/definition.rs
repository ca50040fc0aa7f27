//! Serializable grammar tables.
//!
//! ```json
//! {
//!   "segments": [{ "name": "PID", "fields": [{ "name": "PID-3", "cardinality": "1..*" }] }],
//!   "groups": [{
//!     "name": "ADT_A01",
//!     "combinator": "sequence",
//!     "children": [
//!       { "name": "MSH", "kind": "segment" },
//!       { "name": "PID", "kind": "segment" },
//!       { "name": "INSURANCE", "kind": "group", "cardinality": "0..*" }
//!     ]
//!   }],
//!   "aliases": { "ADT_A04": "ADT_A01" }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cardinality::Cardinality;
use crate::node::{ChildKind, Combinator, FieldSpec};

/// A reference from a group to a segment or group, with the slot's bound.
/// Cardinality defaults to exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildDef {
    pub name: String,
    pub kind: ChildKind,
    #[serde(default)]
    pub cardinality: Cardinality,
}

impl ChildDef {
    pub fn segment(name: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            name: name.into(),
            kind: ChildKind::Segment,
            cardinality,
        }
    }

    pub fn group(name: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            name: name.into(),
            kind: ChildKind::Group,
            cardinality,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentDef {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDef {
    pub name: String,
    pub combinator: Combinator,
    pub children: Vec<ChildDef>,
}

/// One version's grammar table as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub segments: Vec<SegmentDef>,
    #[serde(default)]
    pub groups: Vec<GroupDef>,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}
