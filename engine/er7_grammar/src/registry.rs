use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::error::{GrammarError, UnknownStructureError};
use crate::grammar::Grammar;
use crate::node::{GrammarNode, NodeId};

/// A resolved structure: the grammar it belongs to and its root node.
#[derive(Debug, Clone)]
pub struct StructureRef {
    pub grammar: Arc<Grammar>,
    pub node: NodeId,
}

impl StructureRef {
    pub fn node(&self) -> &GrammarNode {
        self.grammar.node(self.node)
    }
}

/// Grammars keyed by version. Populated at startup, read concurrently after.
#[derive(Debug, Clone, Default)]
pub struct GrammarRegistry {
    versions: HashMap<String, Arc<Grammar>>,
}

impl GrammarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a grammar under its own version, replacing any previous one.
    pub fn insert(&mut self, grammar: Grammar) -> Arc<Grammar> {
        let grammar = Arc::new(grammar);
        debug!("registering grammar for version {}", grammar.version());
        self.versions
            .insert(grammar.version().to_string(), Arc::clone(&grammar));
        grammar
    }

    pub fn with(mut self, grammar: Grammar) -> Self {
        self.insert(grammar);
        self
    }

    pub fn load_json(&mut self, version: &str, json: &str) -> Result<Arc<Grammar>, GrammarError> {
        let grammar = Grammar::from_json(version, json)?;
        Ok(self.insert(grammar))
    }

    pub fn get(&self, version: &str) -> Option<&Arc<Grammar>> {
        self.versions.get(version)
    }

    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }

    /// Look up `name` (or an alias of it) in the grammar for `version`.
    pub fn resolve(&self, version: &str, name: &str) -> Result<StructureRef, UnknownStructureError> {
        let unknown = || UnknownStructureError {
            version: version.to_string(),
            name: name.to_string(),
        };
        let grammar = self.versions.get(version).ok_or_else(unknown)?;
        let node = grammar.resolve(name).ok_or_else(unknown)?;
        Ok(StructureRef {
            grammar: Arc::clone(grammar),
            node,
        })
    }
}
