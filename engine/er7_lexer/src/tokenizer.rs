use log::{debug, trace};

use crate::delimiters::{is_header_segment, Delimiters};
use crate::error::LexError;

/// Which characters end a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEndings {
    /// Only the configured terminator (carriage return by convention).
    #[default]
    CarriageReturn,
    /// Also accept `\n` and `\r\n`, as produced by files edited on other systems.
    Lenient,
}

/// Configuration for the tokenizer
#[derive(Debug, Clone, Copy)]
pub struct TokenizerConfig {
    /// Segment terminator
    pub terminator: char,
    /// Whether newline variants also terminate segments
    pub line_endings: LineEndings,
    /// Reject inputs larger than this many bytes
    pub max_message_bytes: Option<usize>,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            terminator: '\r',
            line_endings: LineEndings::CarriageReturn,
            max_message_bytes: None,
        }
    }
}

/// One segment line split on the field separator.
///
/// Fields are kept as raw wire text; component splitting and unescaping
/// happen only once the matcher knows the segment's field layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSegment<'a> {
    pub name: &'a str,
    /// `fields[0]` is field 1. For header segments field 1 is the field
    /// separator and field 2 the encoding characters.
    pub fields: Vec<&'a str>,
    /// Index in the token stream.
    pub position: usize,
    /// 1-based source line.
    pub line: usize,
    /// The whole line, for diagnostics.
    pub text: &'a str,
}

impl<'a> RawSegment<'a> {
    /// Field by its 1-based number.
    pub fn field(&self, number: usize) -> Option<&'a str> {
        number
            .checked_sub(1)
            .and_then(|i| self.fields.get(i))
            .copied()
    }

    pub fn is_header(&self) -> bool {
        is_header_segment(self.name)
    }
}

/// A message split into segments, with the delimiters used to split it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedMessage<'a> {
    pub delimiters: Delimiters,
    pub segments: Vec<RawSegment<'a>>,
}

/// Splits raw ER7 text into [`RawSegment`]s. Does not consult any grammar.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    config: TokenizerConfig,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TokenizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    pub fn tokenize<'a>(&self, raw: &'a str) -> Result<TokenizedMessage<'a>, LexError> {
        if let Some(limit) = self.config.max_message_bytes {
            if raw.len() > limit {
                return Err(LexError::InputTooLarge {
                    size: raw.len(),
                    limit,
                });
            }
        }

        let lines: Vec<(usize, &str)> = self
            .split_lines(raw)
            .into_iter()
            .filter(|(_, text)| !text.trim().is_empty())
            .collect();
        let Some(&(_, first)) = lines.first() else {
            return Err(LexError::EmptyMessage);
        };

        let delimiters = Delimiters::from_header_line(first)?.unwrap_or_default();
        trace!("delimiters for message: {delimiters:?}");

        let mut segments = Vec::with_capacity(lines.len());
        for (position, (line, text)) in lines.into_iter().enumerate() {
            segments.push(split_segment(text, line, position, &delimiters)?);
        }
        debug!("tokenized {} segments", segments.len());

        Ok(TokenizedMessage {
            delimiters,
            segments,
        })
    }

    fn is_break(&self, c: char) -> bool {
        c == self.config.terminator
            || (self.config.line_endings == LineEndings::Lenient && (c == '\r' || c == '\n'))
    }

    fn split_lines<'a>(&self, raw: &'a str) -> Vec<(usize, &'a str)> {
        let lenient = self.config.line_endings == LineEndings::Lenient;
        let mut out = Vec::new();
        let mut line = 1;
        let mut start = 0;
        let mut prev_cr = false;
        for (i, c) in raw.char_indices() {
            if self.is_break(c) {
                // `\r\n` counts as one break.
                let crlf = lenient && prev_cr && c == '\n' && start == i;
                if !crlf {
                    out.push((line, &raw[start..i]));
                    line += 1;
                }
                start = i + c.len_utf8();
                prev_cr = c == '\r';
            } else {
                prev_cr = false;
            }
        }
        if start < raw.len() {
            out.push((line, &raw[start..]));
        }
        out
    }
}

fn malformed(text: &str, line: usize) -> LexError {
    LexError::MalformedSegment {
        line,
        text: text.chars().take(40).collect(),
    }
}

fn split_segment<'a>(
    text: &'a str,
    line: usize,
    position: usize,
    d: &Delimiters,
) -> Result<RawSegment<'a>, LexError> {
    let mut pieces = text.split(d.field);
    let name = pieces.next().unwrap_or_default().trim_end();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(malformed(text, line));
    }

    let fields: Vec<&str> = if is_header_segment(name) && text.len() > name.len() {
        // Field 1 of a header is the separator itself.
        let sep_end = name.len() + d.field.len_utf8();
        let mut fields = vec![&text[name.len()..sep_end]];
        fields.extend(text[sep_end..].split(d.field));
        fields
    } else {
        pieces.collect()
    };

    Ok(RawSegment {
        name,
        fields,
        position,
        line,
        text,
    })
}

/// Convenience wrapper using the default configuration.
pub fn tokenize(raw: &str) -> Result<TokenizedMessage<'_>, LexError> {
    Tokenizer::new().tokenize(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_segments_and_fields() {
        let msg = tokenize("HDR|a\rLINE|1\rLINE|2\r").expect("tokenizes");
        let names: Vec<&str> = msg.segments.iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["HDR", "LINE", "LINE"]);
        assert_eq!(msg.segments[2].fields, vec!["2"]);
        assert_eq!(msg.segments[2].position, 2);
        assert_eq!(msg.segments[2].line, 3);
        assert_eq!(msg.delimiters, Delimiters::default());
    }

    #[test]
    fn header_fields_keep_numbering() {
        let msg = tokenize("MSH|^~\\&|APP|FAC|||||ADT^A01\r").expect("tokenizes");
        let msh = &msg.segments[0];
        assert!(msh.is_header());
        assert_eq!(msh.field(1), Some("|"));
        assert_eq!(msh.field(2), Some("^~\\&"));
        assert_eq!(msh.field(3), Some("APP"));
        assert_eq!(msh.field(9), Some("ADT^A01"));
        assert_eq!(msh.field(10), None);
    }

    #[test]
    fn custom_field_separator_applies_to_rest_of_message() {
        let msg = tokenize("MSH#^~\\&#APP\rPID#1#x|y\r").expect("tokenizes");
        assert_eq!(msg.delimiters.field, '#');
        assert_eq!(msg.segments[1].fields, vec!["1", "x|y"]);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(tokenize(""), Err(LexError::EmptyMessage));
        assert_eq!(tokenize("\r\r"), Err(LexError::EmptyMessage));
    }

    #[test]
    fn nameless_segment_is_rejected() {
        let err = tokenize("HDR|a\r|b\r").unwrap_err();
        assert_eq!(
            err,
            LexError::MalformedSegment {
                line: 2,
                text: "|b".to_string()
            }
        );
    }

    #[test]
    fn unknown_names_are_not_a_tokenizer_concern() {
        let msg = tokenize("ZZZ|1\rUNKNOWN|z").expect("tokenizes");
        assert_eq!(msg.segments.len(), 2);
    }

    #[test]
    fn lenient_line_endings() {
        let tokenizer = Tokenizer::with_config(TokenizerConfig {
            line_endings: LineEndings::Lenient,
            ..TokenizerConfig::default()
        });
        let msg = tokenizer.tokenize("A|1\r\nB|2\nC|3\r").expect("tokenizes");
        let lines: Vec<(usize, &str)> = msg.segments.iter().map(|s| (s.line, s.name)).collect();
        assert_eq!(lines, vec![(1, "A"), (2, "B"), (3, "C")]);
    }

    #[test]
    fn input_size_limit() {
        let tokenizer = Tokenizer::with_config(TokenizerConfig {
            max_message_bytes: Some(4),
            ..TokenizerConfig::default()
        });
        assert_eq!(
            tokenizer.tokenize("HDR|abc"),
            Err(LexError::InputTooLarge { size: 7, limit: 4 })
        );
    }
}
