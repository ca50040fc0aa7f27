use er7_grammar::NodeId;
use er7_lexer::InternedString;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::segment::Segment;

/// A child of a group occurrence. Matched children record the index of the
/// grammar slot they fill.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Element {
    Segment { slot: usize, segment: Segment },
    Group { slot: usize, group: Group },
    /// A segment the grammar has no place for, kept where it appeared.
    Unparsed { segment: Segment },
}

impl Element {
    pub fn name(&self) -> &str {
        match self {
            Element::Segment { segment, .. } | Element::Unparsed { segment } => segment.name.as_str(),
            Element::Group { group, .. } => group.name.as_str(),
        }
    }

    pub fn slot(&self) -> Option<usize> {
        match self {
            Element::Segment { slot, .. } | Element::Group { slot, .. } => Some(*slot),
            Element::Unparsed { .. } => None,
        }
    }

    pub fn as_segment(&self) -> Option<&Segment> {
        match self {
            Element::Segment { segment, .. } => Some(segment),
            _ => None,
        }
    }

    pub fn as_segment_mut(&mut self) -> Option<&mut Segment> {
        match self {
            Element::Segment { segment, .. } => Some(segment),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Element::Group { group, .. } => Some(group),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match self {
            Element::Group { group, .. } => Some(group),
            _ => None,
        }
    }

    pub fn is_unparsed(&self) -> bool {
        matches!(self, Element::Unparsed { .. })
    }
}

/// One occurrence of a group node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Group {
    pub name: InternedString,
    pub node: NodeId,
    /// 1-based index within the parent slot.
    pub occurrence: usize,
    pub children: Vec<Element>,
}

impl Group {
    pub fn new(name: impl Into<InternedString>, node: NodeId, occurrence: usize) -> Self {
        Self {
            name: name.into(),
            node,
            occurrence,
            children: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// The `occurrence`-th (1-based) matched child named `name`.
    pub fn child(&self, name: &str, occurrence: usize) -> Option<&Element> {
        self.children
            .iter()
            .filter(|c| !c.is_unparsed() && c.name() == name)
            .nth(occurrence.checked_sub(1)?)
    }

    pub fn child_mut(&mut self, name: &str, occurrence: usize) -> Option<&mut Element> {
        self.children
            .iter_mut()
            .filter(|c| !c.is_unparsed() && c.name() == name)
            .nth(occurrence.checked_sub(1)?)
    }

    /// Direct child index of the `occurrence`-th child named `name`.
    pub(crate) fn child_index(&self, name: &str, occurrence: usize) -> Option<usize> {
        self.children
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_unparsed() && c.name() == name)
            .nth(occurrence.checked_sub(1)?)
            .map(|(i, _)| i)
    }

    pub fn segment(&self, name: &str) -> Option<&Segment> {
        self.child(name, 1).and_then(Element::as_segment)
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.child(name, 1).and_then(Element::as_group)
    }

    /// All matched children of slot `slot`, in order.
    pub fn slot_children(&self, slot: usize) -> impl Iterator<Item = &Element> {
        self.children.iter().filter(move |c| c.slot() == Some(slot))
    }

    pub fn slot_count(&self, slot: usize) -> usize {
        self.slot_children(slot).count()
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.children.iter().filter_map(Element::as_group)
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.children.iter().filter_map(Element::as_segment)
    }

    /// Renumber the group occurrences of `slot` as 1, 2, 3.
    pub(crate) fn renumber(&mut self, slot: usize) {
        let mut next = 1;
        for child in &mut self.children {
            if let Element::Group { slot: s, group } = child {
                if *s == slot {
                    group.occurrence = next;
                    next += 1;
                }
            }
        }
    }
}
