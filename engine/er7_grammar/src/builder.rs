use std::collections::{BTreeSet, HashMap};

use er7_lexer::InternedString;
use log::debug;

use crate::cardinality::MaxOccurs;
use crate::definition::{ChildDef, GrammarDef, GroupDef, SegmentDef};
use crate::error::GrammarError;
use crate::grammar::Grammar;
use crate::node::{ChildKind, Combinator, FieldSpec, GrammarNode, GroupNode, NodeId, SegmentNode, Slot};

/// Collects segment and group definitions and resolves them into a [`Grammar`].
///
/// Segments referenced by a group but never declared get an empty field
/// layout, so all their fields stay opaque. Group references must resolve.
#[derive(Debug, Clone)]
pub struct GrammarBuilder {
    version: String,
    segments: Vec<SegmentDef>,
    groups: Vec<GroupDef>,
    aliases: Vec<(String, String)>,
}

impl GrammarBuilder {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            segments: Vec::new(),
            groups: Vec::new(),
            aliases: Vec::new(),
        }
    }

    pub fn from_definition(version: impl Into<String>, def: GrammarDef) -> Self {
        Self {
            version: version.into(),
            segments: def.segments,
            groups: def.groups,
            aliases: def.aliases.into_iter().collect(),
        }
    }

    pub fn segment(mut self, name: impl Into<String>, fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        self.segments.push(SegmentDef {
            name: name.into(),
            fields: fields.into_iter().collect(),
        });
        self
    }

    pub fn sequence(self, name: impl Into<String>, children: impl IntoIterator<Item = ChildDef>) -> Self {
        self.group(GroupDef {
            name: name.into(),
            combinator: Combinator::Sequence,
            children: children.into_iter().collect(),
        })
    }

    pub fn choice(self, name: impl Into<String>, children: impl IntoIterator<Item = ChildDef>) -> Self {
        self.group(GroupDef {
            name: name.into(),
            combinator: Combinator::Choice,
            children: children.into_iter().collect(),
        })
    }

    pub fn group(mut self, def: GroupDef) -> Self {
        self.groups.push(def);
        self
    }

    /// Make `alias` resolve to the structure `target`.
    pub fn alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases.push((alias.into(), target.into()));
        self
    }

    pub fn build(self) -> Result<Grammar, GrammarError> {
        let mut ids: HashMap<String, (NodeId, ChildKind)> = HashMap::new();
        let mut next = 0u32;
        let mut assign = |ids: &mut HashMap<String, (NodeId, ChildKind)>, name: &str, kind| {
            if ids.contains_key(name) {
                return Err(GrammarError::Duplicate(name.to_string()));
            }
            let id = NodeId(next);
            next += 1;
            ids.insert(name.to_string(), (id, kind));
            Ok(id)
        };

        let mut nodes: Vec<GrammarNode> = Vec::with_capacity(self.segments.len() + self.groups.len());
        for def in self.segments {
            assign(&mut ids, &def.name, ChildKind::Segment)?;
            nodes.push(GrammarNode::Segment(SegmentNode {
                name: InternedString::from(def.name),
                fields: def.fields,
            }));
        }
        for def in &self.groups {
            assign(&mut ids, &def.name, ChildKind::Group)?;
        }

        let mut groups = Vec::with_capacity(self.groups.len());
        let mut implicit = Vec::new();
        for def in &self.groups {
            if def.children.is_empty() {
                return Err(GrammarError::EmptyGroup(def.name.clone()));
            }
            let mut slots = Vec::with_capacity(def.children.len());
            for child in &def.children {
                if !child.cardinality.is_valid() {
                    return Err(GrammarError::InvalidCardinality {
                        node: def.name.clone(),
                        slot: child.name.clone(),
                        cardinality: child.cardinality,
                    });
                }
                let node = match (ids.get(&child.name).copied(), child.kind) {
                    (Some((id, kind)), expected) if kind == expected => id,
                    (Some((_, found)), expected) => {
                        return Err(GrammarError::KindMismatch {
                            parent: def.name.clone(),
                            name: child.name.clone(),
                            expected: expected.as_str(),
                            found: found.as_str(),
                        })
                    }
                    (None, ChildKind::Segment) => {
                        let id = assign(&mut ids, &child.name, ChildKind::Segment)?;
                        implicit.push(child.name.clone());
                        id
                    }
                    (None, ChildKind::Group) => {
                        return Err(GrammarError::Dangling {
                            parent: def.name.clone(),
                            name: child.name.clone(),
                        })
                    }
                };
                slots.push(Slot {
                    name: InternedString::from(child.name.as_str()),
                    kind: child.kind,
                    cardinality: child.cardinality,
                    node,
                });
            }
            let group = GroupNode {
                name: InternedString::from(def.name.as_str()),
                slots,
                first: BTreeSet::new(),
                nullable: false,
                reachable: BTreeSet::new(),
            };
            groups.push(match def.combinator {
                Combinator::Sequence => GrammarNode::Sequence(group),
                Combinator::Choice => GrammarNode::Choice(group),
            });
        }
        nodes.extend(groups);
        nodes.extend(implicit.into_iter().map(|name| {
            GrammarNode::Segment(SegmentNode {
                name: InternedString::from(name),
                fields: Vec::new(),
            })
        }));

        let order = topological_order(&nodes)?;
        for id in order {
            let (first, nullable, reachable) = match &nodes[id.index()] {
                GrammarNode::Segment(_) => continue,
                GrammarNode::Sequence(g) => lookahead(&nodes, g, Combinator::Sequence),
                GrammarNode::Choice(g) => lookahead(&nodes, g, Combinator::Choice),
            };
            if let GrammarNode::Sequence(g) | GrammarNode::Choice(g) = &mut nodes[id.index()] {
                g.first = first;
                g.nullable = nullable;
                g.reachable = reachable;
            }
        }

        let mut names = HashMap::with_capacity(ids.len());
        for (name, (id, _)) in &ids {
            names.insert(InternedString::from(name.as_str()), *id);
        }
        let mut aliases = HashMap::with_capacity(self.aliases.len());
        for (alias, target) in self.aliases {
            if ids.contains_key(&alias) {
                return Err(GrammarError::Duplicate(alias));
            }
            let Some(&(id, _)) = ids.get(&target) else {
                return Err(GrammarError::DanglingAlias { alias, target });
            };
            aliases.insert(InternedString::from(alias), id);
        }

        debug!(
            "built grammar {} with {} nodes and {} aliases",
            self.version,
            nodes.len(),
            aliases.len()
        );
        Ok(Grammar::from_parts(self.version, nodes, names, aliases))
    }
}

/// Group ids ordered children first. Fails on the first cycle found.
fn topological_order(nodes: &[GrammarNode]) -> Result<Vec<NodeId>, GrammarError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    fn visit(
        nodes: &[GrammarNode],
        id: NodeId,
        marks: &mut [Mark],
        path: &mut Vec<NodeId>,
        order: &mut Vec<NodeId>,
    ) -> Result<(), GrammarError> {
        match marks[id.index()] {
            Mark::Done => return Ok(()),
            Mark::Active => {
                let start = path.iter().position(|p| *p == id).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..]
                    .iter()
                    .map(|p| nodes[p.index()].name().to_string())
                    .collect();
                cycle.push(nodes[id.index()].name().to_string());
                return Err(GrammarError::Cycle(cycle));
            }
            Mark::New => {}
        }
        let Some(group) = nodes[id.index()].as_group() else {
            marks[id.index()] = Mark::Done;
            return Ok(());
        };
        marks[id.index()] = Mark::Active;
        path.push(id);
        for slot in &group.slots {
            visit(nodes, slot.node, marks, path, order)?;
        }
        path.pop();
        marks[id.index()] = Mark::Done;
        order.push(id);
        Ok(())
    }

    let mut marks = vec![Mark::New; nodes.len()];
    let mut order = Vec::new();
    let mut path = Vec::new();
    for index in 0..nodes.len() {
        visit(nodes, NodeId(index as u32), &mut marks, &mut path, &mut order)?;
    }
    Ok(order)
}

/// FIRST set, nullability and reachable names of `group`, whose children
/// have already been computed.
fn lookahead(
    nodes: &[GrammarNode],
    group: &GroupNode,
    combinator: Combinator,
) -> (BTreeSet<InternedString>, bool, BTreeSet<InternedString>) {
    let mut first = BTreeSet::new();
    let mut reachable = BTreeSet::new();
    let mut nullable = combinator == Combinator::Sequence;
    let mut open = true;

    for slot in &group.slots {
        let child = &nodes[slot.node.index()];
        let child_first = match child {
            GrammarNode::Segment(s) => BTreeSet::from([s.name.clone()]),
            GrammarNode::Sequence(g) | GrammarNode::Choice(g) => g.first.clone(),
        };
        match child {
            GrammarNode::Segment(s) => {
                reachable.insert(s.name.clone());
            }
            GrammarNode::Sequence(g) | GrammarNode::Choice(g) => {
                reachable.extend(g.reachable.iter().cloned());
            }
        }

        let forbidden = slot.cardinality.max == MaxOccurs::Bounded(0);
        let slot_nullable = slot.cardinality.is_optional() || child.is_nullable();
        match combinator {
            Combinator::Sequence => {
                if open && !forbidden {
                    first.extend(child_first);
                }
                if !slot_nullable {
                    open = false;
                    nullable = false;
                }
            }
            Combinator::Choice => {
                if !forbidden {
                    first.extend(child_first);
                }
                nullable |= slot_nullable;
            }
        }
    }
    (first, nullable, reachable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cardinality::Cardinality;
    use pretty_assertions::assert_eq;

    fn names(set: &BTreeSet<InternedString>) -> Vec<&str> {
        set.iter().map(InternedString::as_str).collect()
    }

    #[test]
    fn first_sets_follow_nullable_prefix() {
        let grammar = GrammarBuilder::new("t")
            .sequence(
                "MSG",
                [
                    ChildDef::segment("A", Cardinality::OPTIONAL),
                    ChildDef::group("G", Cardinality::ANY),
                    ChildDef::segment("C", Cardinality::ONE),
                    ChildDef::segment("D", Cardinality::ONE),
                ],
            )
            .choice(
                "G",
                [
                    ChildDef::segment("X", Cardinality::ONE),
                    ChildDef::segment("Y", Cardinality::ONE),
                ],
            )
            .build()
            .unwrap();
        let msg = grammar.group(grammar.lookup("MSG").unwrap()).unwrap();
        assert_eq!(names(msg.first()), vec!["A", "C", "X", "Y"]);
        assert!(!msg.is_nullable());
        assert_eq!(names(msg.reachable()), vec!["A", "C", "D", "X", "Y"]);

        let g = grammar.group(grammar.lookup("G").unwrap()).unwrap();
        assert!(!g.is_nullable());
    }

    #[test]
    fn choice_with_optional_alternative_is_nullable() {
        let grammar = GrammarBuilder::new("t")
            .choice(
                "C",
                [
                    ChildDef::segment("A", Cardinality::ONE),
                    ChildDef::segment("B", Cardinality::OPTIONAL),
                ],
            )
            .build()
            .unwrap();
        assert!(grammar.group(grammar.lookup("C").unwrap()).unwrap().is_nullable());
    }

    #[test]
    fn rejects_cycles() {
        let err = GrammarBuilder::new("t")
            .sequence("A", [ChildDef::group("B", Cardinality::OPTIONAL)])
            .sequence("B", [ChildDef::group("A", Cardinality::OPTIONAL)])
            .build()
            .unwrap_err();
        match err {
            GrammarError::Cycle(path) => assert_eq!(path, vec!["A", "B", "A"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn rejects_self_reference() {
        let err = GrammarBuilder::new("t")
            .sequence("A", [ChildDef::group("A", Cardinality::ANY)])
            .build()
            .unwrap_err();
        assert!(matches!(err, GrammarError::Cycle(_)));
    }

    #[test]
    fn rejects_dangling_group_and_kind_mismatch() {
        let dangling = GrammarBuilder::new("t")
            .sequence("A", [ChildDef::group("MISSING", Cardinality::ONE)])
            .build()
            .unwrap_err();
        assert!(matches!(dangling, GrammarError::Dangling { .. }));

        let mismatch = GrammarBuilder::new("t")
            .segment("PID", [])
            .sequence("A", [ChildDef::group("PID", Cardinality::ONE)])
            .build()
            .unwrap_err();
        assert!(matches!(
            mismatch,
            GrammarError::KindMismatch {
                expected: "group",
                found: "segment",
                ..
            }
        ));
    }

    #[test]
    fn rejects_duplicates_empty_groups_and_bad_bounds() {
        let dup = GrammarBuilder::new("t")
            .sequence("A", [ChildDef::segment("X", Cardinality::ONE)])
            .sequence("A", [ChildDef::segment("Y", Cardinality::ONE)])
            .build()
            .unwrap_err();
        assert!(matches!(dup, GrammarError::Duplicate(name) if name == "A"));

        let empty = GrammarBuilder::new("t").sequence("A", []).build().unwrap_err();
        assert!(matches!(empty, GrammarError::EmptyGroup(_)));

        let inverted = Cardinality {
            min: 3,
            max: MaxOccurs::Bounded(1),
        };
        let bad = GrammarBuilder::new("t")
            .sequence("A", [ChildDef::segment("X", inverted)])
            .build()
            .unwrap_err();
        assert!(matches!(bad, GrammarError::InvalidCardinality { .. }));
    }

    #[test]
    fn shared_groups_are_one_node() {
        let grammar = GrammarBuilder::new("t")
            .sequence(
                "MSG",
                [
                    ChildDef::group("NOTE", Cardinality::ANY),
                    ChildDef::segment("X", Cardinality::ONE),
                    ChildDef::group("NOTE", Cardinality::ANY),
                ],
            )
            .sequence("NOTE", [ChildDef::segment("NTE", Cardinality::ONE)])
            .build()
            .unwrap();
        let msg = grammar.group(grammar.lookup("MSG").unwrap()).unwrap();
        assert_eq!(msg.slots[0].node, msg.slots[2].node);
    }
}
