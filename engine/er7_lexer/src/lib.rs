//! ER7 lexical layer
//!
//! This crate turns raw HL7 v2 pipe-delimited text into an ordered list of
//! raw segments. It resolves the delimiter profile from the message header,
//! converts between literal values and escaped wire text, and splits fields
//! into repetitions, components and sub-components on request. It never
//! consults a message grammar.

pub mod components;
pub mod delimiters;
pub mod error;
pub mod escape;
pub mod header;
pub mod string_interner;
pub mod tokenizer;

// Re-export the main types for convenience
pub use components::parse_field_components;
pub use delimiters::{is_header_segment, Delimiters, HEADER_SEGMENTS};
pub use error::{LexError, MalformedHeaderError};
pub use escape::{escape, unescape, EscapeMode};
pub use header::MessageHeader;
pub use string_interner::InternedString;
pub use tokenizer::{tokenize, LineEndings, RawSegment, TokenizedMessage, Tokenizer, TokenizerConfig};
