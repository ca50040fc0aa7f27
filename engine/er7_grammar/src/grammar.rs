use std::collections::HashMap;

use er7_lexer::InternedString;

use crate::builder::GrammarBuilder;
use crate::definition::GrammarDef;
use crate::error::GrammarError;
use crate::node::{GrammarNode, GroupNode, NodeId, SegmentNode};

/// One HL7 version's resolved grammar. Immutable once built.
#[derive(Debug, Clone)]
pub struct Grammar {
    version: String,
    nodes: Vec<GrammarNode>,
    names: HashMap<InternedString, NodeId>,
    aliases: HashMap<InternedString, NodeId>,
}

impl Grammar {
    pub(crate) fn from_parts(
        version: String,
        nodes: Vec<GrammarNode>,
        names: HashMap<InternedString, NodeId>,
        aliases: HashMap<InternedString, NodeId>,
    ) -> Self {
        Self {
            version,
            nodes,
            names,
            aliases,
        }
    }

    pub fn builder(version: impl Into<String>) -> GrammarBuilder {
        GrammarBuilder::new(version)
    }

    pub fn from_definition(version: impl Into<String>, def: GrammarDef) -> Result<Self, GrammarError> {
        GrammarBuilder::from_definition(version, def).build()
    }

    pub fn from_json(version: impl Into<String>, json: &str) -> Result<Self, GrammarError> {
        let def: GrammarDef = serde_json::from_str(json)?;
        Self::from_definition(version, def)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The node behind `id`. Ids come from this grammar; a foreign id panics.
    pub fn node(&self, id: NodeId) -> &GrammarNode {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&GrammarNode> {
        self.nodes.get(id.index())
    }

    pub fn group(&self, id: NodeId) -> Option<&GroupNode> {
        self.get(id).and_then(GrammarNode::as_group)
    }

    pub fn segment(&self, id: NodeId) -> Option<&SegmentNode> {
        self.get(id).and_then(GrammarNode::as_segment)
    }

    /// Node defined under exactly `name`.
    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Node defined under `name`, or the target of alias `name`.
    pub fn resolve(&self, name: &str) -> Option<NodeId> {
        self.lookup(name).or_else(|| self.aliases.get(name).copied())
    }

    /// Whether any segment node carries this name.
    pub fn knows_segment(&self, name: &str) -> bool {
        self.lookup(name)
            .is_some_and(|id| self.segment(id).is_some())
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &GrammarNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cardinality::Cardinality;
    use crate::definition::ChildDef;

    #[test]
    fn aliases_resolve_but_do_not_shadow() {
        let grammar = Grammar::builder("2.5")
            .sequence("ADT_A01", [ChildDef::segment("MSH", Cardinality::ONE)])
            .alias("ADT_A04", "ADT_A01")
            .build()
            .unwrap();
        let target = grammar.lookup("ADT_A01").unwrap();
        assert_eq!(grammar.resolve("ADT_A04"), Some(target));
        assert_eq!(grammar.lookup("ADT_A04"), None);
        assert!(grammar.knows_segment("MSH"));
        assert!(!grammar.knows_segment("ADT_A01"));
    }

    #[test]
    fn dangling_alias_is_rejected() {
        let err = Grammar::builder("2.5")
            .sequence("A", [ChildDef::segment("MSH", Cardinality::ONE)])
            .alias("B", "NOPE")
            .build()
            .unwrap_err();
        assert!(matches!(err, GrammarError::DanglingAlias { .. }));
    }
}
