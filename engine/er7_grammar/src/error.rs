use thiserror::Error;

use crate::cardinality::Cardinality;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardinalityParseError {
    #[error("invalid cardinality {0:?}, expected `min..max` or `min..*`")]
    Syntax(String),
    #[error("cardinality {0} has its minimum above its maximum")]
    MinAboveMax(String),
}

/// Grammar lookup miss: the version or the structure name is not registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no structure `{name}` registered for version `{version}`")]
pub struct UnknownStructureError {
    pub version: String,
    pub name: String,
}

/// Why a grammar definition was rejected at load time.
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("`{0}` is defined more than once")]
    Duplicate(String),

    #[error("`{parent}` references undefined group `{name}`")]
    Dangling { parent: String, name: String },

    #[error("`{parent}` references `{name}` as a {expected}, but it is defined as a {found}")]
    KindMismatch {
        parent: String,
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("group references form a cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("group `{0}` has no children")]
    EmptyGroup(String),

    #[error("slot `{slot}` of `{node}` has invalid cardinality {cardinality}")]
    InvalidCardinality {
        node: String,
        slot: String,
        cardinality: Cardinality,
    },

    #[error("alias `{alias}` points at undefined structure `{target}`")]
    DanglingAlias { alias: String, target: String },

    #[error("invalid grammar JSON: {0}")]
    Json(#[from] serde_json::Error),
}
