use er7_grammar::{Cardinality, NodeId, UnknownStructureError};
use er7_lexer::LexError;
use thiserror::Error;

/// A slot or field whose occurrence count is outside its grammar bound.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: expected {cardinality} occurrences, found {actual}{}", found_suffix(.found))]
pub struct CardinalityError {
    /// e.g. `ORU_R01/PATIENT_RESULT[1]/ORDER_OBSERVATION` or `.../OBX-5`
    pub path: String,
    pub cardinality: Cardinality,
    pub actual: usize,
    /// The segment at the cursor when the slot was left, if any.
    pub found: Option<String>,
}

fn found_suffix(found: &Option<String>) -> String {
    match found {
        Some(name) => format!(" (next segment is `{name}`)"),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    UnknownStructure(#[from] UnknownStructureError),

    #[error(transparent)]
    Cardinality(#[from] CardinalityError),

    #[error("line {line}: segment `{segment}` cannot be placed in the message structure")]
    UnexpectedSegment {
        segment: String,
        /// Index in the token stream.
        position: usize,
        line: usize,
    },

    #[error("{choice}: no alternative matches{}", found_suffix(.found))]
    ChoiceExhausted {
        choice: String,
        found: Option<String>,
        position: Option<usize>,
    },

    /// The tree does not agree with its grammar node by node (wrong kind,
    /// name, slot or order). Only found in trees built or edited by hand.
    #[error("{path}: {detail}")]
    Shape { path: String, detail: String },

    #[error("message header carries no message type or structure")]
    MissingMessageType,
}

impl ParseError {
    /// Token stream index of the offending segment, when known.
    pub fn position(&self) -> Option<usize> {
        match self {
            ParseError::UnexpectedSegment { position, .. } => Some(*position),
            ParseError::ChoiceExhausted { position, .. } => *position,
            _ => None,
        }
    }

    /// 1-based source line of the offending segment, when known.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::UnexpectedSegment { line, .. } => Some(*line),
            ParseError::Lex(LexError::MalformedSegment { line, .. }) => Some(*line),
            ParseError::Lex(LexError::InvalidEscape { line, .. }) if *line > 0 => Some(*line),
            _ => None,
        }
    }

    /// Conditions that abort parsing in tolerant mode too.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ParseError::Lex(_) | ParseError::UnknownStructure(_) | ParseError::MissingMessageType
        )
    }
}

/// Why a tree could not be written out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Cardinality(#[from] CardinalityError),

    #[error("{path}: `{name}` fills slot {slot} after slot {previous}; children must follow grammar order")]
    OutOfOrder {
        path: String,
        name: String,
        slot: usize,
        previous: usize,
    },

    #[error("{path}: node {node} does not belong to the message grammar or does not match the tree")]
    UnknownNode { path: String, node: NodeId },
}
