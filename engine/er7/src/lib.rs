//! HL7 v2 ER7 messages in and out.
//!
//! Install the grammars once at startup with [`install_registry`]; after
//! that [`parse`], [`parse_with`], [`encode`] and [`analyze`] can be called
//! from any thread. The registry is never written again, so parsing takes no
//! locks.
//!
//! ```
//! use er7_grammar::{Cardinality, ChildDef, Grammar, GrammarRegistry};
//!
//! let grammar = Grammar::builder("2.5")
//!     .sequence(
//!         "ADT_A01",
//!         [
//!             ChildDef::segment("MSH", Cardinality::ONE),
//!             ChildDef::segment("PID", Cardinality::ONE),
//!         ],
//!     )
//!     .build()
//!     .unwrap();
//! er7::install_registry(GrammarRegistry::new().with(grammar)).unwrap();
//!
//! let raw = "MSH|^~\\&|APP|FAC|||||ADT^A01^ADT_A01|1|P|2.5\rPID|1||42\r";
//! let message = er7::parse(raw, "2.5").unwrap();
//! assert_eq!(message.get("PID-3").unwrap().as_deref(), Some("42"));
//! assert_eq!(er7::encode(&message).unwrap(), raw);
//! ```

mod report;

use std::sync::OnceLock;

pub use er7_grammar::{Grammar, GrammarRegistry};
pub use er7_parser::{
    CardinalityError, Diagnostic, EncodeError, EncodeOptions, Mode, ParseError, ParseOptions, Parsed, Severity,
};
pub use er7_tree::Message;
pub use report::AnalysisReport;

use er7_lexer::{MessageHeader, Tokenizer, TokenizerConfig};
use er7_parser::Parser;
use log::{debug, warn};
use thiserror::Error;

static REGISTRY: OnceLock<GrammarRegistry> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("a grammar registry is already installed")]
    AlreadyInstalled,
}

/// Make `registry` the process-wide grammar source. Succeeds once.
pub fn install_registry(registry: GrammarRegistry) -> Result<(), RegistryError> {
    let versions: Vec<String> = registry.versions().map(str::to_string).collect();
    REGISTRY.set(registry).map_err(|_| RegistryError::AlreadyInstalled)?;
    debug!("installed grammar registry for versions {versions:?}");
    Ok(())
}

/// The installed registry. Before [`install_registry`] this installs an
/// empty one, after which every parse fails with an unknown structure.
pub fn registry() -> &'static GrammarRegistry {
    REGISTRY.get_or_init(|| {
        warn!("no grammar registry installed; using an empty one");
        GrammarRegistry::new()
    })
}

/// Strict parse of `raw` as the structure its header names.
pub fn parse(raw: &str, version: &str) -> Result<Message, ParseError> {
    parse_with(raw, version, ParseOptions::strict()).map(|parsed| parsed.message)
}

pub fn parse_with(raw: &str, version: &str, options: ParseOptions) -> Result<Parsed, ParseError> {
    Parser::with_options(registry(), options).parse(raw, version)
}

/// Encode with the delimiters captured on the message.
pub fn encode(message: &Message) -> Result<String, EncodeError> {
    er7_parser::encode(message)
}

pub fn encode_with(message: &Message, options: &EncodeOptions) -> Result<String, EncodeError> {
    er7_parser::encode_with(message, options)
}

/// Version the header declares in MSH-12, if any.
pub fn detect_version(raw: &str) -> Option<String> {
    let config = TokenizerConfig {
        line_endings: er7_lexer::LineEndings::Lenient,
        ..TokenizerConfig::default()
    };
    let tokens = Tokenizer::with_config(config).tokenize(raw).ok()?;
    MessageHeader::read(&tokens)?.version
}

/// Tolerant parse summarised as diagnostics and segment counts. Never fails:
/// errors that abort even a tolerant parse become an error diagnostic.
pub fn analyze(raw: &str, version: &str) -> AnalysisReport {
    match parse_with(raw, version, ParseOptions::tolerant()) {
        Ok(parsed) => AnalysisReport::from_parsed(version, raw, &parsed),
        Err(err) => AnalysisReport::from_error(version, raw, &err),
    }
}
