//! Conversion between literal values and their escaped wire text.
//!
//! Recognized sequences are `\F\`, `\S\`, `\T\`, `\R\`, `\E\` (field,
//! component, sub-component, repetition and escape characters), `\P\` when the
//! profile carries a truncation character, and `\Xhh..\` for literal bytes.
//! Any other well-formed sequence such as `\H\` or `\.br\` is a pass-through
//! sequence: tolerant unescaping keeps it verbatim as literal text.
//!
//! Escaping writes every literal escape character as `\E\` and every CR or
//! LF as `\X0D\` / `\X0A\`, so escaped text never holds a segment terminator
//! and `unescape(escape(s)) == s` holds for every string in both modes.

use std::borrow::Cow;

use log::debug;
use nom::{
    bytes::complete::{take_till1, take_while_m_n},
    character::complete::char,
    combinator::{all_consuming, map_res},
    multi::many1,
    sequence::{delimited, preceded},
    IResult,
};

use crate::delimiters::Delimiters;
use crate::error::LexError;

/// How unrecognized or unterminated escape sequences are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscapeMode {
    /// Report them as [`LexError::InvalidEscape`].
    Strict,
    /// Keep them verbatim.
    #[default]
    Tolerant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Sequence {
    Literal(char),
    Hex(Vec<u8>),
    PassThrough,
}

/// Matches `<esc>content<esc>` with non-empty content, yielding the content.
fn escape_sequence(esc: char) -> impl Fn(&str) -> IResult<&str, &str> {
    move |input| delimited(char(esc), take_till1(|c: char| c == esc), char(esc))(input)
}

fn hex_pairs(input: &str) -> IResult<&str, Vec<u8>> {
    preceded(
        char('X'),
        many1(map_res(
            take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit()),
            |pair: &str| u8::from_str_radix(pair, 16),
        )),
    )(input)
}

fn classify(content: &str, d: &Delimiters) -> Sequence {
    match (content, d.truncation) {
        ("F", _) => Sequence::Literal(d.field),
        ("S", _) => Sequence::Literal(d.component),
        ("T", _) => Sequence::Literal(d.subcomponent),
        ("R", _) => Sequence::Literal(d.repetition),
        ("E", _) => Sequence::Literal(d.escape),
        ("P", Some(truncation)) => Sequence::Literal(truncation),
        _ => match all_consuming(hex_pairs)(content) {
            Ok((_, bytes)) => Sequence::Hex(bytes),
            Err(_) => Sequence::PassThrough,
        },
    }
}

fn decode_hex_bytes(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        // Not UTF-8: one char per byte.
        Err(err) => err.into_bytes().into_iter().map(char::from).collect(),
    }
}

fn push_sequence(out: &mut String, esc: char, code: char) {
    out.push(esc);
    out.push(code);
    out.push(esc);
}

/// Replace escape sequences in one leaf value with the characters they stand for.
///
/// `text` must already be split on every separator; only the escape character
/// is interpreted here.
pub fn unescape<'a>(
    text: &'a str,
    d: &Delimiters,
    mode: EscapeMode,
) -> Result<Cow<'a, str>, LexError> {
    if !text.contains(d.escape) {
        return Ok(Cow::Borrowed(text));
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find(d.escape) {
        out.push_str(&rest[..idx]);
        let at = &rest[idx..];
        match escape_sequence(d.escape)(at) {
            Ok((after, content)) => {
                let whole = &at[..at.len() - after.len()];
                match classify(content, d) {
                    Sequence::Literal(c) => out.push(c),
                    Sequence::Hex(bytes) => out.push_str(&decode_hex_bytes(bytes)),
                    Sequence::PassThrough => {
                        if mode == EscapeMode::Strict {
                            return Err(LexError::InvalidEscape {
                                sequence: whole.to_string(),
                                line: 0,
                            });
                        }
                        debug!("passing through escape sequence {whole:?}");
                        out.push_str(whole);
                    }
                }
                rest = after;
            }
            Err(_) => {
                if mode == EscapeMode::Strict {
                    return Err(LexError::InvalidEscape {
                        sequence: at.chars().take(16).collect(),
                        line: 0,
                    });
                }
                out.push(d.escape);
                rest = &at[d.escape.len_utf8()..];
            }
        }
    }
    out.push_str(rest);
    Ok(Cow::Owned(out))
}

/// Replace every literal delimiter and line break in `value` with its escape
/// sequence. Runs of CR and LF become a single hex sequence.
pub fn escape<'a>(value: &'a str, d: &Delimiters) -> Cow<'a, str> {
    if !value.chars().any(|c| d.is_delimiter(c) || is_line_break(c)) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 8);
    let mut breaks = String::new();
    for c in value.chars() {
        if is_line_break(c) {
            breaks.push_str(if c == '\r' { "0D" } else { "0A" });
            continue;
        }
        flush_breaks(&mut out, &mut breaks, d.escape);
        if c == d.escape {
            push_sequence(&mut out, d.escape, 'E');
        } else if c == d.field {
            push_sequence(&mut out, d.escape, 'F');
        } else if c == d.component {
            push_sequence(&mut out, d.escape, 'S');
        } else if c == d.subcomponent {
            push_sequence(&mut out, d.escape, 'T');
        } else if c == d.repetition {
            push_sequence(&mut out, d.escape, 'R');
        } else if Some(c) == d.truncation {
            push_sequence(&mut out, d.escape, 'P');
        } else {
            out.push(c);
        }
    }
    flush_breaks(&mut out, &mut breaks, d.escape);
    Cow::Owned(out)
}

fn is_line_break(c: char) -> bool {
    c == '\r' || c == '\n'
}

fn flush_breaks(out: &mut String, hex: &mut String, esc: char) {
    if hex.is_empty() {
        return;
    }
    out.push(esc);
    out.push('X');
    out.push_str(hex);
    out.push(esc);
    hex.clear();
}
