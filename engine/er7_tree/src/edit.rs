//! Structural edits that keep every slot within its cardinality.

use std::sync::Arc;

use er7_grammar::{ChildKind, GrammarNode, Slot};
use log::debug;

use crate::element::{Element, Group};
use crate::error::EditError;
use crate::message::{render_steps, Message};
use crate::path::Path;
use crate::segment::Segment;

impl Message {
    /// Append a new, empty segment occurrence to the slot `name` of the group
    /// at `parent` (the empty path is the root). The segment is placed after
    /// every sibling that precedes its slot in grammar order.
    pub fn add_segment(&mut self, parent: &str, name: &str) -> Result<&mut Segment, EditError> {
        let segment = Segment::with_delimiters(name, self.delimiters());
        let element = self.insert(parent, name, ChildKind::Segment, |slot, _| Element::Segment {
            slot,
            segment,
        })?;
        element.as_segment_mut().ok_or_else(|| EditError::NotFound(name.to_string()))
    }

    /// Append a new, empty occurrence of the group slot `name`.
    pub fn add_group(&mut self, parent: &str, name: &str) -> Result<&mut Group, EditError> {
        let element = self.insert(parent, name, ChildKind::Group, |slot, def| Element::Group {
            slot,
            group: Group::new(def.name.clone(), def.node, 1),
        })?;
        element.as_group_mut().ok_or_else(|| EditError::NotFound(name.to_string()))
    }

    /// Remove the `occurrence`-th (1-based) child named `name` from the group
    /// at `parent`, returning it.
    pub fn remove(&mut self, parent: &str, name: &str, occurrence: usize) -> Result<Element, EditError> {
        let path: Path = parent.parse()?;
        let grammar = Arc::clone(self.grammar());
        let group = self.group_at_mut(&path)?;
        let index = group
            .child_index(name, occurrence)
            .ok_or_else(|| EditError::NotFound(format!("{path}/{name}[{occurrence}]")))?;

        if let Some(slot_index) = group.children[index].slot() {
            if let Some(slot) = grammar.group(group.node).and_then(|g| g.slots.get(slot_index)) {
                let remaining = group.slot_count(slot_index) - 1;
                if remaining < slot.cardinality.min as usize {
                    return Err(EditError::Cardinality {
                        parent: group.name.to_string(),
                        slot: slot.name.to_string(),
                        cardinality: slot.cardinality,
                        count: remaining,
                    });
                }
            }
        }

        let removed = group.children.remove(index);
        if let Some(slot_index) = removed.slot() {
            group.renumber(slot_index);
        }
        debug!("removed {name}[{occurrence}] from {}", group.name);
        Ok(removed)
    }

    fn insert<F>(&mut self, parent: &str, name: &str, kind: ChildKind, make: F) -> Result<&mut Element, EditError>
    where
        F: FnOnce(usize, &Slot) -> Element,
    {
        let path: Path = parent.parse()?;
        if path.field.is_some() {
            return Err(EditError::NotAGroup(parent.to_string()));
        }
        let grammar = Arc::clone(self.grammar());
        let group = self.group_at_mut(&path)?;
        let node = grammar
            .get(group.node)
            .ok_or_else(|| EditError::NotFound(format!("{} in grammar {}", group.node, grammar.version())))?;
        let Some(def) = node.as_group() else {
            return Err(EditError::NotAGroup(render_steps(&path.steps)));
        };

        let mut candidates: Vec<usize> = def
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.name == name && s.kind == kind)
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            return Err(EditError::UnknownSlot {
                parent: def.name.to_string(),
                name: name.to_string(),
                kind: kind.as_str(),
            });
        }

        if let GrammarNode::Choice(_) = node {
            if let Some(existing) = group.children.iter().find_map(Element::slot) {
                if !candidates.contains(&existing) {
                    return Err(EditError::ChoiceConflict {
                        choice: def.name.to_string(),
                        existing: def.slots[existing].name.to_string(),
                        requested: name.to_string(),
                    });
                }
                candidates = vec![existing];
            }
        }

        let chosen = candidates
            .iter()
            .copied()
            .find(|&i| def.slots[i].cardinality.allows_another(group.slot_count(i)));
        let Some(slot_index) = chosen else {
            let i = candidates[0];
            return Err(EditError::Cardinality {
                parent: def.name.to_string(),
                slot: def.slots[i].name.to_string(),
                cardinality: def.slots[i].cardinality,
                count: group.slot_count(i) + 1,
            });
        };

        let at = group
            .children
            .iter()
            .rposition(|c| c.slot().is_some_and(|s| s <= slot_index))
            .map_or(0, |i| i + 1);
        group.children.insert(at, make(slot_index, &def.slots[slot_index]));
        group.renumber(slot_index);
        debug!("added {name} to {} at child {at}", def.name);
        Ok(&mut group.children[at])
    }
}
