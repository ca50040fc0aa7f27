//! Structural matching of a flat segment stream onto a grammar.
//!
//! One cursor walks the tokenized segments. Sequences match their slots in
//! declared order, greedily taking as many occurrences as the slot maximum
//! and the lookahead sets allow. Consumed segments are never given back,
//! except at choice boundaries: each viable alternative is tried from a
//! checkpoint and abandoned alternatives restore the cursor.

use std::sync::Arc;

use er7_grammar::{Grammar, GrammarNode, GroupNode, NodeId, SegmentNode, Slot, UnknownStructureError};
use er7_lexer::{Delimiters, EscapeMode, RawSegment};
use er7_tree::{Element, Group, Message, Segment};
use log::{trace, warn};

use crate::error::{CardinalityError, ParseError};
use crate::options::ParseOptions;
use crate::validator::{check_fields, group_path, slot_path, validate};

/// Work done by one parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MatchStats {
    /// Matched segments in the final tree.
    pub segments: usize,
    /// Occurrences attempted across all slots.
    pub occurrence_attempts: usize,
    /// Choice alternatives attempted.
    pub choice_attempts: usize,
    /// Abandoned alternatives whose cursor was restored.
    pub backtracks: usize,
}

/// A matched message together with what the match recorded along the way.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub message: Message,
    /// Empty after a strict parse. After a tolerant parse: unexpected
    /// segments, then everything the validator found.
    pub violations: Vec<ParseError>,
    pub stats: MatchStats,
}

impl Parsed {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Match `segments` onto the group `structure` of `grammar`.
pub fn match_segments(
    grammar: Arc<Grammar>,
    structure: NodeId,
    segments: &[RawSegment<'_>],
    delimiters: Delimiters,
    options: &ParseOptions,
) -> Result<Parsed, ParseError> {
    let Some(root) = grammar.group(structure) else {
        return Err(UnknownStructureError {
            version: grammar.version().to_string(),
            name: structure.to_string(),
        }
        .into());
    };

    let mut matcher = Matcher {
        grammar: grammar.as_ref(),
        root,
        segments,
        delimiters,
        options,
        cursor: 0,
        violations: Vec::new(),
        deficits: 0,
        stats: MatchStats::default(),
    };

    let path = group_path(None, root.name.as_str(), 1);
    let mut tree = Group::new(root.name.clone(), structure, 1);
    tree.children = matcher.match_group(structure, &path)?;
    matcher.absorb_unknown(&mut tree.children)?;

    if let Some(head) = matcher.head() {
        return Err(ParseError::UnexpectedSegment {
            segment: head.name.to_string(),
            position: head.position,
            line: head.line,
        });
    }

    let Matcher {
        mut violations,
        mut stats,
        ..
    } = matcher;
    let message = Message::from_parts(Arc::clone(&grammar), delimiters, tree);
    if !options.is_strict() {
        violations.extend(validate(&message));
    }
    stats.segments = message.segments().len();
    Ok(Parsed {
        message,
        violations,
        stats,
    })
}

/// Cursor state restored when a choice alternative is abandoned.
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    cursor: usize,
    violations: usize,
    deficits: usize,
}

/// An alternative kept in reserve: it consumed input but left violations.
struct Fallback {
    cursor: usize,
    violations: Vec<ParseError>,
    deficits: usize,
    children: Vec<Element>,
}

struct Matcher<'g, 's, 'a> {
    grammar: &'g Grammar,
    root: &'g GroupNode,
    segments: &'s [RawSegment<'a>],
    delimiters: Delimiters,
    options: &'g ParseOptions,
    cursor: usize,
    /// Violations recorded by a tolerant match.
    violations: Vec<ParseError>,
    /// Shortfalls a tolerant match stepped over; used to rank alternatives.
    deficits: usize,
    stats: MatchStats,
}

impl<'g, 's, 'a> Matcher<'g, 's, 'a> {
    fn head(&self) -> Option<&'s RawSegment<'a>> {
        self.segments.get(self.cursor)
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            cursor: self.cursor,
            violations: self.violations.len(),
            deficits: self.deficits,
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.cursor = checkpoint.cursor;
        self.violations.truncate(checkpoint.violations);
        self.deficits = checkpoint.deficits;
    }

    /// In tolerant mode, take segments nothing in the message structure can
    /// hold and keep them in place as unparsed.
    fn absorb_unknown(&mut self, children: &mut Vec<Element>) -> Result<(), ParseError> {
        if self.options.is_strict() {
            return Ok(());
        }
        while let Some(head) = self.head() {
            if self.root.reachable().contains(head.name) {
                break;
            }
            warn!("line {}: segment `{}` is not part of {}; kept as unparsed", head.line, head.name, self.root.name);
            self.violations.push(ParseError::UnexpectedSegment {
                segment: head.name.to_string(),
                position: head.position,
                line: head.line,
            });
            let segment = Segment::from_raw(head, None, &self.delimiters, EscapeMode::Tolerant)?;
            children.push(Element::Unparsed { segment });
            self.cursor += 1;
        }
        Ok(())
    }

    /// Children of one occurrence of the group `id`.
    fn match_group(&mut self, id: NodeId, path: &str) -> Result<Vec<Element>, ParseError> {
        let grammar = self.grammar;
        match grammar.node(id) {
            GrammarNode::Sequence(group) => {
                let mut children = Vec::new();
                for (index, slot) in group.slots.iter().enumerate() {
                    self.match_slot(index, slot, path, &mut children)?;
                }
                Ok(children)
            }
            GrammarNode::Choice(group) => self.match_choice(group, path),
            GrammarNode::Segment(segment) => Err(UnknownStructureError {
                version: grammar.version().to_string(),
                name: segment.name.to_string(),
            }
            .into()),
        }
    }

    /// Greedily match occurrences of one slot, then check its minimum.
    fn match_slot(
        &mut self,
        index: usize,
        slot: &'g Slot,
        path: &str,
        children: &mut Vec<Element>,
    ) -> Result<(), ParseError> {
        let grammar = self.grammar;
        let node = grammar.node(slot.node);
        let mut count = 0;
        loop {
            self.absorb_unknown(children)?;
            if !slot.cardinality.allows_another(count) {
                trace!("{path}: slot {} is full at {count}", slot.name);
                break;
            }
            let Some(head) = self.head() else {
                break;
            };
            if !node.can_start_with(head.name) {
                trace!("{path}: `{}` cannot begin {}", head.name, slot.name);
                break;
            }
            self.stats.occurrence_attempts += 1;
            trace!("{path}: attempting {} occurrence {}", slot.name, count + 1);

            match node {
                GrammarNode::Segment(layout) => {
                    let segment = self.consume(head, layout, path, count + 1)?;
                    children.push(Element::Segment { slot: index, segment });
                }
                GrammarNode::Sequence(group) | GrammarNode::Choice(group) => {
                    let start = self.cursor;
                    let inner_path = group_path(Some(path), group.name.as_str(), count + 1);
                    let inner = self.match_group(slot.node, &inner_path)?;
                    if self.cursor == start {
                        break;
                    }
                    let mut occurrence = Group::new(group.name.clone(), slot.node, count + 1);
                    occurrence.children = inner;
                    children.push(Element::Group { slot: index, group: occurrence });
                }
            }
            count += 1;
        }

        let min = slot.cardinality.min as usize;
        if count >= min {
            return Ok(());
        }
        if let Some(group) = node.as_group().filter(|g| g.is_nullable()) {
            // Required but empty-able: fill with occurrences that consume nothing.
            for occurrence in count + 1..=min {
                let inner_path = group_path(Some(path), group.name.as_str(), occurrence);
                let mut filled = Group::new(group.name.clone(), slot.node, occurrence);
                filled.children = self.match_group(slot.node, &inner_path)?;
                children.push(Element::Group { slot: index, group: filled });
            }
            return Ok(());
        }
        self.shortfall(node, slot, path, count)
    }

    fn shortfall(&mut self, node: &GrammarNode, slot: &Slot, path: &str, count: usize) -> Result<(), ParseError> {
        let head = self.head();
        if !self.options.is_strict() {
            trace!("{path}: {} below its minimum ({count}), continuing", slot.name);
            self.deficits += 1;
            return Ok(());
        }
        let slot_path = slot_path(path, slot.name.as_str());
        let found = head.map(|h| h.name.to_string());
        Err(match node {
            GrammarNode::Choice(_) if count == 0 => ParseError::ChoiceExhausted {
                choice: slot_path,
                found,
                position: head.map(|h| h.position),
            },
            _ => CardinalityError {
                path: slot_path,
                cardinality: slot.cardinality,
                actual: count,
                found,
            }
            .into(),
        })
    }

    fn consume(
        &mut self,
        raw: &RawSegment<'_>,
        layout: &SegmentNode,
        path: &str,
        occurrence: usize,
    ) -> Result<Segment, ParseError> {
        let segment = Segment::from_raw(raw, Some(layout), &self.delimiters, self.options.escape_mode())?;
        self.cursor += 1;
        let issues = check_fields(&segment, layout, path, occurrence);
        if let Some(first) = issues.first() {
            if self.options.is_strict() {
                return Err(first.clone().into());
            }
            self.deficits += issues.len();
        }
        Ok(segment)
    }

    /// Children of one choice occurrence: the single alternative taken.
    fn match_choice(&mut self, group: &'g GroupNode, path: &str) -> Result<Vec<Element>, ParseError> {
        let grammar = self.grammar;
        let head = self.head();
        let candidates: Vec<(usize, &'g Slot)> = group
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| {
                slot.cardinality.allows_another(0)
                    && head.is_some_and(|h| grammar.node(slot.node).can_start_with(h.name))
            })
            .collect();

        if candidates.is_empty() {
            if group.is_nullable() {
                return Ok(Vec::new());
            }
            return self.exhausted(path).map(|()| Vec::new());
        }

        let checkpoint = self.checkpoint();
        let mut fallback: Option<Fallback> = None;
        let mut first_error = None;
        for &(index, slot) in &candidates {
            self.stats.choice_attempts += 1;
            trace!("{path}: trying alternative {}", slot.name);
            let mut children = Vec::new();
            match self.match_slot(index, slot, path, &mut children) {
                Ok(()) if self.cursor > checkpoint.cursor => {
                    if self.deficits == checkpoint.deficits {
                        return Ok(children);
                    }
                    if fallback.is_none() {
                        fallback = Some(Fallback {
                            cursor: self.cursor,
                            violations: self.violations[checkpoint.violations..].to_vec(),
                            deficits: self.deficits,
                            children,
                        });
                    }
                }
                Ok(()) => {}
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
            trace!("{path}: abandoning alternative {}", slot.name);
            self.restore(checkpoint);
            self.stats.backtracks += 1;
        }

        if let Some(kept) = fallback {
            self.cursor = kept.cursor;
            self.violations.extend(kept.violations);
            self.deficits = kept.deficits;
            return Ok(kept.children);
        }
        match first_error {
            Some(err) if candidates.len() == 1 => Err(err),
            _ => self.exhausted(path).map(|()| Vec::new()),
        }
    }

    fn exhausted(&mut self, path: &str) -> Result<(), ParseError> {
        if !self.options.is_strict() {
            self.deficits += 1;
            return Ok(());
        }
        let head = self.head();
        Err(ParseError::ChoiceExhausted {
            choice: path.to_string(),
            found: head.map(|h| h.name.to_string()),
            position: head.map(|h| h.position),
        })
    }
}
