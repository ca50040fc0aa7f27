use er7_grammar::Cardinality;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("invalid path {path:?} near {rest:?}")]
    Syntax { path: String, rest: String },
    #[error("path {0:?} uses index 0; occurrences and field numbers start at 1")]
    ZeroIndex(String),
    #[error("path {0:?} does not address a field")]
    MissingField(String),
}

/// Why a structural edit or field write was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("nothing at {0}")]
    NotFound(String),

    #[error("{0} is not a group")]
    NotAGroup(String),

    #[error("`{parent}` has no {kind} slot named `{name}`")]
    UnknownSlot {
        parent: String,
        name: String,
        kind: &'static str,
    },

    #[error("slot `{slot}` of `{parent}` allows {cardinality} occurrences, edit would leave {count}")]
    Cardinality {
        parent: String,
        slot: String,
        cardinality: Cardinality,
        count: usize,
    },

    #[error("choice `{choice}` already holds `{existing}`, cannot add `{requested}`")]
    ChoiceConflict {
        choice: String,
        existing: String,
        requested: String,
    },

    #[error("{0} holds a delimiter and is regenerated on encode")]
    ReadOnlyField(String),
}
