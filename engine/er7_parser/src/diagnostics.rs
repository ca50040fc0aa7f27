use er7_lexer::LexError;

use crate::error::ParseError;

/// Severity levels for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        })
    }
}

/// A human-readable account of one parse problem
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Index of the offending segment in the token stream.
    pub position: Option<usize>,
    /// 1-based source line.
    pub line: Option<usize>,
    pub help: Option<String>,
    /// The offending segment line, when the source was supplied.
    pub snippet: Option<String>,
}

impl Diagnostic {
    /// Diagnostic for an error that aborted parsing
    pub fn error(err: &ParseError) -> Self {
        Self::from_parse_error(err, Severity::Error)
    }

    /// Diagnostic for a violation a tolerant parse stepped over
    pub fn warning(err: &ParseError) -> Self {
        Self::from_parse_error(err, Severity::Warning)
    }

    pub fn from_parse_error(err: &ParseError, severity: Severity) -> Self {
        Self {
            severity,
            message: err.to_string(),
            position: err.position(),
            line: err.line(),
            help: default_help(err),
            snippet: None,
        }
    }

    /// Quote the offending line of `raw`, if the diagnostic has one.
    pub fn with_source(mut self, raw: &str) -> Self {
        if let Some(line) = self.line {
            self.snippet = raw
                .replace("\r\n", "\r")
                .split(['\r', '\n'])
                .nth(line.saturating_sub(1))
                .map(|l| l.chars().take(60).collect());
        }
        self
    }

    /// One-line rendering: `warning: line 3: ... | ZZZ|1 (help: ...)`. Located
    /// errors already name their line in the message.
    pub fn render(&self) -> String {
        let mut out = format!("{}: {}", self.severity, self.message);
        if let Some(snippet) = &self.snippet {
            out.push_str(" | ");
            out.push_str(snippet);
        }
        if let Some(help) = &self.help {
            out.push_str(" (help: ");
            out.push_str(help);
            out.push(')');
        }
        out
    }
}

fn default_help(err: &ParseError) -> Option<String> {
    let help = match err {
        ParseError::Lex(LexError::MalformedHeader(_)) => {
            "The header must start with the segment name, a field separator and at least four encoding characters, e.g. 'MSH|^~\\&'"
        }
        ParseError::Lex(LexError::EmptyMessage) => "The payload contained no segments",
        ParseError::Lex(LexError::MalformedSegment { .. }) => {
            "Segment lines must start with an alphanumeric name followed by the field separator"
        }
        ParseError::Lex(LexError::InvalidEscape { .. }) => {
            "Escape the escape character as \\E\\, or parse in tolerant mode to pass the sequence through"
        }
        ParseError::Lex(LexError::InputTooLarge { .. }) => "Raise max_message_bytes if the message is legitimate",
        ParseError::UnknownStructure(_) => "Check the version in MSH-12 and the message structure in MSH-9",
        ParseError::MissingMessageType => "MSH-9 should carry the message type and trigger event, e.g. 'ADT^A01'",
        ParseError::UnexpectedSegment { .. } => {
            "The segment is either not part of this message structure or appears out of order"
        }
        ParseError::Cardinality(c) if c.actual < c.cardinality.min as usize => {
            "A required segment or group is missing at this point"
        }
        ParseError::Cardinality(_) => "The segment, group or field repeats more often than allowed",
        ParseError::ChoiceExhausted { .. } => "None of the allowed alternatives starts with the segment found here",
        ParseError::Shape { .. } => return None,
    };
    Some(help.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_with_snippet_and_help() {
        let err = ParseError::UnexpectedSegment {
            segment: "ZZZ".into(),
            position: 1,
            line: 2,
        };
        let diag = Diagnostic::warning(&err).with_source("HDR|a\rZZZ|1\r");
        assert_eq!(diag.snippet.as_deref(), Some("ZZZ|1"));
        assert_eq!(diag.position, Some(1));
        let rendered = diag.render();
        assert!(rendered
            .starts_with("warning: line 2: segment `ZZZ` cannot be placed in the message structure | ZZZ|1 (help:"));
        assert_eq!(rendered.matches("line 2").count(), 1);
    }

    #[test]
    fn escape_errors_name_their_line_once() {
        let err = ParseError::Lex(LexError::InvalidEscape {
            sequence: "\\Q\\".into(),
            line: 4,
        });
        let diag = Diagnostic::error(&err);
        assert_eq!(diag.line, Some(4));
        assert_eq!(
            diag.render(),
            "error: line 4: unrecognized escape sequence \"\\\\Q\\\\\" (help: Escape the escape character as \\E\\, or parse in tolerant mode to pass the sequence through)"
        );
    }

    #[test]
    fn errors_without_location() {
        let diag = Diagnostic::error(&ParseError::MissingMessageType);
        assert_eq!(diag.line, None);
        assert_eq!(diag.snippet, None);
        assert!(diag.render().starts_with("error: message header carries no message type"));
    }
}
