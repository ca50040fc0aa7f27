use std::collections::BTreeSet;

use er7_grammar::{Cardinality, Grammar, GrammarNode};
use er7_lexer::Delimiters;
use er7_tree::{Element, Group, Message, Segment, Visitable, Visitor};
use log::debug;

use crate::error::{CardinalityError, EncodeError};
use crate::options::EncodeOptions;
use crate::validator::{group_path, slot_path};

/// Encode with the default options.
pub fn encode(message: &Message) -> Result<String, EncodeError> {
    encode_with(message, &EncodeOptions::default())
}

/// Write `message` as ER7 text using the delimiters it carries.
///
/// Each group is checked against its grammar node before its segments are
/// written: children must be in slot order and every slot count within its
/// cardinality. Absent optional content is simply omitted.
pub fn encode_with(message: &Message, options: &EncodeOptions) -> Result<String, EncodeError> {
    let mut encoder = Encoder {
        grammar: message.grammar(),
        delimiters: message.delimiters(),
        options,
        paths: Vec::new(),
        out: String::new(),
        written: 0,
    };
    message.root().accept(&mut encoder)?;
    debug!("encoded {} segments of {}", encoder.written, message.name());
    Ok(encoder.out)
}

struct Encoder<'t> {
    grammar: &'t Grammar,
    delimiters: &'t Delimiters,
    options: &'t EncodeOptions,
    paths: Vec<String>,
    out: String,
    written: usize,
}

impl Encoder<'_> {
    fn write(&mut self, segment: &Segment) {
        self.out.push_str(&segment.encode(self.delimiters));
        self.out.push(self.options.terminator);
        self.written += 1;
    }

    fn check(&self, group: &Group, path: &str) -> Result<(), EncodeError> {
        let unknown = || EncodeError::UnknownNode {
            path: path.to_string(),
            node: group.node,
        };
        let node = self.grammar.get(group.node).ok_or_else(unknown)?;
        let def = node.as_group().ok_or_else(unknown)?;
        if def.name != group.name.as_str() {
            return Err(unknown());
        }

        let mut previous = 0;
        for child in &group.children {
            let Some(index) = child.slot() else {
                continue;
            };
            let slot = def.slots.get(index).ok_or_else(unknown)?;
            let fits = match child {
                Element::Group { group: inner, .. } => slot.node == inner.node,
                _ => slot.name == child.name(),
            };
            if !fits {
                return Err(EncodeError::UnknownNode {
                    path: slot_path(path, child.name()),
                    node: slot.node,
                });
            }
            if index < previous {
                return Err(EncodeError::OutOfOrder {
                    path: path.to_string(),
                    name: child.name().to_string(),
                    slot: index,
                    previous,
                });
            }
            previous = index;
        }

        let bound = |slot: &er7_grammar::Slot, actual: usize| {
            if slot.cardinality.admits(actual) {
                Ok(())
            } else {
                Err(EncodeError::from(CardinalityError {
                    path: slot_path(path, slot.name.as_str()),
                    cardinality: slot.cardinality,
                    actual,
                    found: None,
                }))
            }
        };
        match node {
            GrammarNode::Choice(_) => {
                let realized: BTreeSet<usize> = group.children.iter().filter_map(Element::slot).collect();
                if realized.len() > 1 || (realized.is_empty() && !def.is_nullable()) {
                    return Err(CardinalityError {
                        path: path.to_string(),
                        cardinality: Cardinality::ONE,
                        actual: realized.len(),
                        found: None,
                    }
                    .into());
                }
                for &index in &realized {
                    if let Some(slot) = def.slots.get(index) {
                        bound(slot, group.slot_count(index))?;
                    }
                }
            }
            _ => {
                for (index, slot) in def.slots.iter().enumerate() {
                    bound(slot, group.slot_count(index))?;
                }
            }
        }
        Ok(())
    }
}

impl<'t> Visitor<'t> for Encoder<'t> {
    type Error = EncodeError;

    fn enter_group(&mut self, group: &'t Group) -> Result<(), Self::Error> {
        let path = group_path(
            self.paths.last().map(String::as_str),
            group.name.as_str(),
            group.occurrence,
        );
        self.check(group, &path)?;
        self.paths.push(path);
        Ok(())
    }

    fn exit_group(&mut self, _group: &'t Group) -> Result<(), Self::Error> {
        self.paths.pop();
        Ok(())
    }

    fn visit_segment(&mut self, segment: &'t Segment, _occurrence: usize) -> Result<(), Self::Error> {
        self.write(segment);
        Ok(())
    }

    fn visit_unparsed(&mut self, segment: &'t Segment) -> Result<(), Self::Error> {
        if self.options.include_unparsed {
            self.write(segment);
        }
        Ok(())
    }
}
