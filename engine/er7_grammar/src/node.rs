//! Grammar node arena types.
//!
//! Nodes are addressed by [`NodeId`]; group slots hold the id of the node they
//! reference, so matching never looks a name up at run time. The same node may
//! be referenced from several parents.

use std::collections::BTreeSet;
use std::fmt;

use er7_lexer::InternedString;
use serde::{Deserialize, Serialize};

use crate::cardinality::Cardinality;

/// Index of a node in its grammar's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a group combines its slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    /// Slots appear in declared order.
    Sequence,
    /// Exactly one slot is realized per occurrence.
    Choice,
}

/// What a slot refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildKind {
    Segment,
    Group,
}

impl ChildKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChildKind::Segment => "segment",
            ChildKind::Group => "group",
        }
    }
}

/// One field of a segment layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    /// `min` counts required values; `max` bounds repetitions.
    #[serde(default = "optional")]
    pub cardinality: Cardinality,
}

fn optional() -> Cardinality {
    Cardinality::OPTIONAL
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            name: name.into(),
            cardinality,
        }
    }
}

/// Leaf node: a segment and its field layout. Fields past the end of the
/// layout are valid and kept opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentNode {
    pub name: InternedString,
    pub fields: Vec<FieldSpec>,
}

impl SegmentNode {
    /// Layout of field `number` (1-based).
    pub fn field(&self, number: usize) -> Option<&FieldSpec> {
        number.checked_sub(1).and_then(|i| self.fields.get(i))
    }
}

/// A named child position inside a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub name: InternedString,
    pub kind: ChildKind,
    pub cardinality: Cardinality,
    pub node: NodeId,
}

/// Inner node: an ordered list of slots plus lookahead sets computed at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupNode {
    pub name: InternedString,
    pub slots: Vec<Slot>,
    pub(crate) first: BTreeSet<InternedString>,
    pub(crate) nullable: bool,
    pub(crate) reachable: BTreeSet<InternedString>,
}

impl GroupNode {
    /// Segment names that can begin one occurrence of this group.
    pub fn first(&self) -> &BTreeSet<InternedString> {
        &self.first
    }

    /// Whether an occurrence can be complete without consuming any segment.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Every segment name that may appear anywhere beneath this group.
    pub fn reachable(&self) -> &BTreeSet<InternedString> {
        &self.reachable
    }

    pub fn can_start_with(&self, segment: &str) -> bool {
        self.first.contains(segment)
    }

    pub fn slot(&self, name: &str) -> Option<(usize, &Slot)> {
        self.slots.iter().enumerate().find(|(_, s)| s.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarNode {
    Segment(SegmentNode),
    Sequence(GroupNode),
    Choice(GroupNode),
}

impl GrammarNode {
    pub fn name(&self) -> &InternedString {
        match self {
            GrammarNode::Segment(s) => &s.name,
            GrammarNode::Sequence(g) | GrammarNode::Choice(g) => &g.name,
        }
    }

    pub fn kind(&self) -> ChildKind {
        match self {
            GrammarNode::Segment(_) => ChildKind::Segment,
            _ => ChildKind::Group,
        }
    }

    pub fn combinator(&self) -> Option<Combinator> {
        match self {
            GrammarNode::Segment(_) => None,
            GrammarNode::Sequence(_) => Some(Combinator::Sequence),
            GrammarNode::Choice(_) => Some(Combinator::Choice),
        }
    }

    pub fn as_group(&self) -> Option<&GroupNode> {
        match self {
            GrammarNode::Segment(_) => None,
            GrammarNode::Sequence(g) | GrammarNode::Choice(g) => Some(g),
        }
    }

    pub fn as_segment(&self) -> Option<&SegmentNode> {
        match self {
            GrammarNode::Segment(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this node can begin with `segment`.
    pub fn can_start_with(&self, segment: &str) -> bool {
        match self {
            GrammarNode::Segment(s) => s.name == segment,
            GrammarNode::Sequence(g) | GrammarNode::Choice(g) => g.can_start_with(segment),
        }
    }

    pub fn is_nullable(&self) -> bool {
        self.as_group().is_some_and(GroupNode::is_nullable)
    }
}
