//! Errors produced before any grammar is consulted.

use thiserror::Error;

/// Why a delimiter profile could not be established from a header segment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedHeaderError {
    /// The header line ends before the field separator.
    #[error("header segment `{segment}` has no field separator")]
    MissingFieldSeparator {
        /// Header segment name (`MSH`, `BHS` or `FHS`).
        segment: String,
    },
    /// Fewer than the four mandatory encoding characters were present.
    #[error("expected at least 4 encoding characters, found {found:?}")]
    TooFewEncodingCharacters {
        /// The encoding-characters field as read.
        found: String,
    },
    /// More than component, repetition, escape, sub-component and truncation.
    #[error("expected at most 5 encoding characters, found {found:?}")]
    TooManyEncodingCharacters {
        /// The encoding-characters field as read.
        found: String,
    },
    /// Two control characters are the same character.
    #[error("control character {0:?} is used for more than one delimiter")]
    Collision(char),
    /// A control character can never act as a delimiter.
    #[error("{0:?} cannot be used as a delimiter")]
    Unusable(char),
}

/// Tokenizer-level defects. These abort parsing in every mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("malformed header: {0}")]
    MalformedHeader(#[from] MalformedHeaderError),

    #[error("message is empty")]
    EmptyMessage,

    #[error("line {line}: malformed segment {text:?}")]
    MalformedSegment {
        /// 1-based source line.
        line: usize,
        /// The offending line, truncated for display.
        text: String,
    },

    /// Only raised by strict unescaping.
    #[error("line {line}: unrecognized escape sequence {sequence:?}")]
    InvalidEscape {
        /// The sequence including its escape characters.
        sequence: String,
        /// 1-based source line, 0 when unknown.
        line: usize,
    },

    #[error("message of {size} bytes exceeds the {limit} byte limit")]
    InputTooLarge { size: usize, limit: usize },
}

impl LexError {
    /// Attach a source line to an escape error raised without one.
    pub fn at_line(self, line: usize) -> Self {
        match self {
            LexError::InvalidEscape { sequence, line: 0 } => {
                LexError::InvalidEscape { sequence, line }
            }
            other => other,
        }
    }
}
