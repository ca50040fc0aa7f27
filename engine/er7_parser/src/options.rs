use er7_lexer::{EscapeMode, LineEndings, TokenizerConfig};

/// Whether the first structural violation aborts parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Abort on the first structural, cardinality or escape violation.
    #[default]
    Strict,
    /// Record violations and keep going; unknown segments are kept as unparsed.
    Tolerant,
}

/// Configuration for parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub mode: Mode,
    pub line_endings: LineEndings,
    /// Messages larger than this are rejected before tokenizing.
    pub max_message_bytes: Option<usize>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Strict,
            line_endings: LineEndings::CarriageReturn,
            max_message_bytes: Some(1 << 20),
        }
    }
}

impl ParseOptions {
    pub fn strict() -> Self {
        Self::default()
    }

    /// Tolerant matching with lenient line endings.
    pub fn tolerant() -> Self {
        Self {
            mode: Mode::Tolerant,
            line_endings: LineEndings::Lenient,
            ..Self::default()
        }
    }

    pub fn is_strict(&self) -> bool {
        self.mode == Mode::Strict
    }

    pub fn escape_mode(&self) -> EscapeMode {
        match self.mode {
            Mode::Strict => EscapeMode::Strict,
            Mode::Tolerant => EscapeMode::Tolerant,
        }
    }

    pub fn tokenizer_config(&self) -> TokenizerConfig {
        TokenizerConfig {
            line_endings: self.line_endings,
            max_message_bytes: self.max_message_bytes,
            ..TokenizerConfig::default()
        }
    }
}

/// Configuration for encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Written after every segment, including the last.
    pub terminator: char,
    /// Whether segments kept aside by a tolerant parse are written back.
    pub include_unparsed: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            terminator: '\r',
            include_unparsed: true,
        }
    }
}
