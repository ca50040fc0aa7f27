//! Post-order cardinality and shape validation of an element tree.
//!
//! Tolerant parses run this over the best-effort tree; it is also the way to
//! check a tree that was built or edited by hand. Strict parses check the
//! same bounds inline and never need it.

use std::collections::BTreeSet;

use er7_grammar::{ChildKind, Grammar, GrammarNode, SegmentNode};
use er7_tree::{Element, Group, Message, Segment, Visitable, Visitor};

use crate::error::{CardinalityError, ParseError};

/// Every violation in `message`, in tree order.
pub fn validate(message: &Message) -> Vec<ParseError> {
    let mut validator = Validator {
        grammar: message.grammar(),
        paths: Vec::new(),
        violations: Vec::new(),
    };
    match message.root().accept(&mut validator) {
        Ok(()) => validator.violations,
        Err(never) => match never {},
    }
}

/// Path of a group occurrence below `parent`; the root is its bare name.
pub(crate) fn group_path(parent: Option<&str>, name: &str, occurrence: usize) -> String {
    match parent {
        None => name.to_string(),
        Some(parent) => format!("{parent}/{name}[{occurrence}]"),
    }
}

pub(crate) fn slot_path(group: &str, slot: &str) -> String {
    format!("{group}/{slot}")
}

fn field_path(group: &str, segment: &str, occurrence: usize, field: usize) -> String {
    if occurrence > 1 {
        format!("{group}/{segment}[{occurrence}]-{field}")
    } else {
        format!("{group}/{segment}-{field}")
    }
}

/// Repetition counts of `segment` against its field layout. Header
/// delimiter fields are never checked.
pub(crate) fn check_fields(
    segment: &Segment,
    layout: &SegmentNode,
    group: &str,
    occurrence: usize,
) -> Vec<CardinalityError> {
    let skip = if segment.is_header() { 2 } else { 0 };
    layout
        .fields
        .iter()
        .enumerate()
        .skip(skip)
        .filter_map(|(index, spec)| {
            let number = index + 1;
            let actual = segment.field(number).map_or(0, |f| f.repetition_count());
            (!spec.cardinality.admits(actual)).then(|| CardinalityError {
                path: field_path(group, segment.name.as_str(), occurrence, number),
                cardinality: spec.cardinality,
                actual,
                found: None,
            })
        })
        .collect()
}

struct Validator<'t> {
    grammar: &'t Grammar,
    paths: Vec<String>,
    violations: Vec<ParseError>,
}

impl Validator<'_> {
    fn shape(&mut self, path: &str, detail: String) {
        self.violations.push(ParseError::Shape {
            path: path.to_string(),
            detail,
        });
    }

    fn check_group(&mut self, group: &Group, path: &str) {
        let grammar = self.grammar;
        let Some(node) = grammar.get(group.node) else {
            self.shape(path, format!("node {} is not part of grammar {}", group.node, grammar.version()));
            return;
        };
        let Some(def) = node.as_group() else {
            self.shape(path, format!("node {} is a segment, not a group", group.node));
            return;
        };
        if def.name != group.name.as_str() {
            self.shape(path, format!("occurrence is named `{}` but its node is `{}`", group.name, def.name));
        }

        let mut previous = 0;
        let mut seen: Vec<(&str, usize)> = Vec::new();
        for child in &group.children {
            let Some(index) = child.slot() else {
                continue;
            };
            let Some(slot) = def.slots.get(index) else {
                self.shape(path, format!("`{}` fills slot {index}, which `{}` does not have", child.name(), def.name));
                continue;
            };
            if index < previous {
                self.shape(path, format!("`{}` appears after a later slot", child.name()));
            }
            previous = previous.max(index);

            match child {
                Element::Segment { segment, .. } => {
                    if slot.kind != ChildKind::Segment || slot.name != segment.name {
                        self.shape(path, format!("segment `{}` does not fit slot `{}`", segment.name, slot.name));
                        continue;
                    }
                    let occurrence = match seen.iter_mut().find(|(n, _)| *n == segment.name.as_str()) {
                        Some((_, count)) => {
                            *count += 1;
                            *count
                        }
                        None => {
                            seen.push((segment.name.as_str(), 1));
                            1
                        }
                    };
                    if let Some(layout) = grammar.segment(slot.node) {
                        let issues = check_fields(segment, layout, path, occurrence);
                        self.violations.extend(issues.into_iter().map(ParseError::from));
                    }
                }
                Element::Group { group: inner, .. } => {
                    if slot.kind != ChildKind::Group || slot.name != inner.name || slot.node != inner.node {
                        self.shape(path, format!("group `{}` does not fit slot `{}`", inner.name, slot.name));
                    }
                }
                Element::Unparsed { .. } => {}
            }
        }

        match node {
            GrammarNode::Choice(_) => {
                let realized: BTreeSet<usize> = group.children.iter().filter_map(Element::slot).collect();
                match realized.len() {
                    0 if !def.is_nullable() => self.violations.push(ParseError::ChoiceExhausted {
                        choice: path.to_string(),
                        found: None,
                        position: None,
                    }),
                    0 => {}
                    1 => {
                        for &index in &realized {
                            if let Some(slot) = def.slots.get(index) {
                                self.check_count(path, slot.name.as_str(), slot.cardinality, group.slot_count(index));
                            }
                        }
                    }
                    _ => {
                        let names: Vec<&str> = realized
                            .iter()
                            .filter_map(|&i| def.slots.get(i))
                            .map(|s| s.name.as_str())
                            .collect();
                        self.shape(path, format!("choice realizes more than one alternative: {}", names.join(", ")));
                    }
                }
            }
            _ => {
                for (index, slot) in def.slots.iter().enumerate() {
                    self.check_count(path, slot.name.as_str(), slot.cardinality, group.slot_count(index));
                }
            }
        }
    }

    fn check_count(&mut self, path: &str, slot: &str, cardinality: er7_grammar::Cardinality, actual: usize) {
        if !cardinality.admits(actual) {
            self.violations.push(ParseError::Cardinality(CardinalityError {
                path: slot_path(path, slot),
                cardinality,
                actual,
                found: None,
            }));
        }
    }
}

impl<'t> Visitor<'t> for Validator<'t> {
    type Error = std::convert::Infallible;

    fn enter_group(&mut self, group: &'t Group) -> Result<(), Self::Error> {
        let path = group_path(
            self.paths.last().map(String::as_str),
            group.name.as_str(),
            group.occurrence,
        );
        self.check_group(group, &path);
        self.paths.push(path);
        Ok(())
    }

    fn exit_group(&mut self, _group: &'t Group) -> Result<(), Self::Error> {
        self.paths.pop();
        Ok(())
    }
}
