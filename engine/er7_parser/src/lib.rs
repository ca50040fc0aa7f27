//! Grammar-driven parsing and encoding of HL7 v2 ER7 messages.
//!
//! [`Parser`] tokenizes raw text, resolves the message structure from the
//! header through a [`GrammarRegistry`], and matches the segment stream onto
//! it. In [`Mode::Strict`] the first violation is returned as an error; in
//! [`Mode::Tolerant`] a best-effort tree comes back with every violation
//! listed. [`encode`] writes a tree back out.
//!
//! ```
//! use er7_grammar::{Cardinality, ChildDef, Grammar, GrammarRegistry};
//! use er7_parser::{encode, Parser};
//!
//! let registry = GrammarRegistry::new().with(
//!     Grammar::builder("2.5")
//!         .sequence(
//!             "MSG",
//!             [
//!                 ChildDef::segment("HDR", Cardinality::ONE),
//!                 ChildDef::group("ITEM", Cardinality::ANY),
//!             ],
//!         )
//!         .sequence("ITEM", [ChildDef::segment("LINE", Cardinality::ONE)])
//!         .build()
//!         .unwrap(),
//! );
//! let parsed = Parser::new(&registry)
//!     .parse_as("HDR|a\rLINE|1\rLINE|2\r", "2.5", "MSG")
//!     .unwrap();
//! assert_eq!(parsed.message.root().groups().count(), 2);
//! assert_eq!(encode(&parsed.message).unwrap(), "HDR|a\rLINE|1\rLINE|2\r");
//! ```

pub mod diagnostics;
pub mod encoder;
pub mod error;
pub mod matcher;
pub mod options;
pub mod validator;

pub use diagnostics::{Diagnostic, Severity};
pub use encoder::{encode, encode_with};
pub use error::{CardinalityError, EncodeError, ParseError};
pub use matcher::{match_segments, MatchStats, Parsed};
pub use options::{EncodeOptions, Mode, ParseOptions};
pub use validator::validate;

use er7_grammar::{GrammarRegistry, StructureRef, UnknownStructureError};
use er7_lexer::{MessageHeader, TokenizedMessage, Tokenizer};
use log::debug;

/// Parses raw messages against the grammars of one registry.
#[derive(Debug, Clone, Copy)]
pub struct Parser<'r> {
    registry: &'r GrammarRegistry,
    options: ParseOptions,
}

impl<'r> Parser<'r> {
    pub fn new(registry: &'r GrammarRegistry) -> Self {
        Self::with_options(registry, ParseOptions::default())
    }

    pub fn with_options(registry: &'r GrammarRegistry, options: ParseOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parse `raw` as the structure its MSH-9 names.
    pub fn parse(&self, raw: &str, version: &str) -> Result<Parsed, ParseError> {
        let tokens = self.tokenize(raw)?;
        let header = MessageHeader::read(&tokens).ok_or(ParseError::MissingMessageType)?;
        let structure = self.resolve(version, &header)?;
        self.run(tokens, structure)
    }

    /// Parse `raw` as `structure`, whatever its header says.
    pub fn parse_as(&self, raw: &str, version: &str, structure: &str) -> Result<Parsed, ParseError> {
        let tokens = self.tokenize(raw)?;
        let structure = self.registry.resolve(version, structure)?;
        self.run(tokens, structure)
    }

    fn tokenize<'a>(&self, raw: &'a str) -> Result<TokenizedMessage<'a>, ParseError> {
        debug!("parsing {} bytes ({:?})", raw.len(), self.options.mode);
        Ok(Tokenizer::with_config(self.options.tokenizer_config()).tokenize(raw)?)
    }

    /// First header candidate that names a group: MSH-9.3, then
    /// `type_event`, then `type`.
    fn resolve(&self, version: &str, header: &MessageHeader) -> Result<StructureRef, ParseError> {
        let candidates = header.structure_candidates();
        let Some(first) = candidates.first() else {
            return Err(ParseError::MissingMessageType);
        };
        for name in &candidates {
            match self.registry.resolve(version, name) {
                Ok(found) if found.node().as_group().is_some() => {
                    debug!("message structure {name} for version {version}");
                    return Ok(found);
                }
                _ => continue,
            }
        }
        Err(UnknownStructureError {
            version: version.to_string(),
            name: first.clone(),
        }
        .into())
    }

    fn run(&self, tokens: TokenizedMessage<'_>, structure: StructureRef) -> Result<Parsed, ParseError> {
        let StructureRef { grammar, node } = structure;
        let parsed = match_segments(grammar, node, &tokens.segments, tokens.delimiters, &self.options)?;
        debug!(
            "matched {} of {} segments into {} with {} violations",
            parsed.stats.segments,
            tokens.segments.len(),
            parsed.message.name(),
            parsed.violations.len()
        );
        Ok(parsed)
    }
}
