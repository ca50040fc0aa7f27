//! The five control characters in effect for one message.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till},
    character::complete::anychar,
    error::Error as NomError,
    IResult,
};

use crate::error::MalformedHeaderError;

/// Segments whose first two fields carry the delimiter declaration.
pub const HEADER_SEGMENTS: [&str; 3] = ["MSH", "BHS", "FHS"];

/// Returns true for `MSH`, `BHS` and `FHS`.
pub fn is_header_segment(name: &str) -> bool {
    HEADER_SEGMENTS.contains(&name)
}

/// Resolved delimiter profile of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Delimiters {
    pub field: char,
    pub component: char,
    pub repetition: char,
    pub escape: char,
    pub subcomponent: char,
    /// Truncation character introduced in HL7 2.7; carried but not interpreted.
    pub truncation: Option<char>,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            field: '|',
            component: '^',
            repetition: '~',
            escape: '\\',
            subcomponent: '&',
            truncation: None,
        }
    }
}

fn header_name(input: &str) -> IResult<&str, &str> {
    alt((tag("MSH"), tag("BHS"), tag("FHS")))(input)
}

impl Delimiters {
    /// Build a profile from a header's field separator and its encoding-characters field.
    ///
    /// The encoding characters are read in the order component, repetition,
    /// escape, sub-component and an optional truncation character.
    pub fn from_header(field: char, encoding: &str) -> Result<Self, MalformedHeaderError> {
        let chars: Vec<char> = encoding.chars().collect();
        if chars.len() < 4 {
            return Err(MalformedHeaderError::TooFewEncodingCharacters {
                found: encoding.to_string(),
            });
        }
        if chars.len() > 5 {
            return Err(MalformedHeaderError::TooManyEncodingCharacters {
                found: encoding.to_string(),
            });
        }
        let profile = Self {
            field,
            component: chars[0],
            repetition: chars[1],
            escape: chars[2],
            subcomponent: chars[3],
            truncation: chars.get(4).copied(),
        };
        profile.validate()
    }

    /// Read the profile declared by a header line such as `MSH|^~\&|...`.
    ///
    /// Returns `Ok(None)` when the line is not a header segment, in which case
    /// the caller keeps the default profile.
    pub fn from_header_line(line: &str) -> Result<Option<Self>, MalformedHeaderError> {
        let Ok((rest, name)) = header_name(line) else {
            return Ok(None);
        };
        let Ok((rest, field)) = anychar::<_, NomError<&str>>(rest) else {
            return Err(MalformedHeaderError::MissingFieldSeparator {
                segment: name.to_string(),
            });
        };
        if field.is_ascii_alphanumeric() {
            // `MSH1`, `FHSX`: a longer segment name, not a header.
            return Ok(None);
        }
        if matches!(field, '\r' | '\n') {
            return Err(MalformedHeaderError::MissingFieldSeparator {
                segment: name.to_string(),
            });
        }
        let encoding = take_till::<_, _, NomError<&str>>(|c| c == field || c == '\r' || c == '\n')(
            rest,
        )
        .map_or("", |(_, enc)| enc);
        Self::from_header(field, encoding).map(Some)
    }

    /// The encoding-characters field exactly as a header carries it.
    pub fn encoding_characters(&self) -> String {
        let mut out = String::with_capacity(5);
        out.push(self.component);
        out.push(self.repetition);
        out.push(self.escape);
        out.push(self.subcomponent);
        if let Some(t) = self.truncation {
            out.push(t);
        }
        out
    }

    /// True when `c` has a control meaning in this profile.
    pub fn is_delimiter(&self, c: char) -> bool {
        c == self.field
            || c == self.component
            || c == self.repetition
            || c == self.escape
            || c == self.subcomponent
            || Some(c) == self.truncation
    }

    fn all(&self) -> Vec<char> {
        let mut v = vec![
            self.field,
            self.component,
            self.repetition,
            self.escape,
            self.subcomponent,
        ];
        v.extend(self.truncation);
        v
    }

    /// Reject collisions and characters that cannot delimit anything.
    pub fn validate(self) -> Result<Self, MalformedHeaderError> {
        let all = self.all();
        for (i, c) in all.iter().enumerate() {
            if c.is_alphanumeric() || c.is_whitespace() {
                return Err(MalformedHeaderError::Unusable(*c));
            }
            if all[..i].contains(c) {
                return Err(MalformedHeaderError::Collision(*c));
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_profile_is_standard() {
        let d = Delimiters::default();
        assert_eq!(d.encoding_characters(), "^~\\&");
        assert_eq!(d.field, '|');
        assert!(d.validate().is_ok());
    }

    #[test]
    fn header_line_overrides_defaults() {
        let d = Delimiters::from_header_line("MSH#*@!$#APP#FAC")
            .expect("valid header")
            .expect("is a header");
        assert_eq!(d.field, '#');
        assert_eq!(d.component, '*');
        assert_eq!(d.repetition, '@');
        assert_eq!(d.escape, '!');
        assert_eq!(d.subcomponent, '$');
        assert_eq!(d.truncation, None);
    }

    #[test]
    fn truncation_character_is_carried() {
        let d = Delimiters::from_header('|', "^~\\&#").expect("five characters");
        assert_eq!(d.truncation, Some('#'));
        assert_eq!(d.encoding_characters(), "^~\\&#");
    }

    #[test]
    fn non_header_lines_keep_defaults() {
        assert_eq!(Delimiters::from_header_line("PID|1||123"), Ok(None));
        assert_eq!(Delimiters::from_header_line("MSH1|x"), Ok(None));
    }

    #[test]
    fn too_few_encoding_characters() {
        let err = Delimiters::from_header_line("MSH|^~\\|APP").unwrap_err();
        assert_eq!(
            err,
            MalformedHeaderError::TooFewEncodingCharacters {
                found: "^~\\".to_string()
            }
        );
    }

    #[test]
    fn colliding_characters() {
        let err = Delimiters::from_header('|', "^^\\&").unwrap_err();
        assert_eq!(err, MalformedHeaderError::Collision('^'));
        let err = Delimiters::from_header('|', "^~|&").unwrap_err();
        assert_eq!(err, MalformedHeaderError::Collision('|'));
    }

    #[test]
    fn bare_header_name_has_no_separator() {
        let err = Delimiters::from_header_line("MSH").unwrap_err();
        assert!(matches!(
            err,
            MalformedHeaderError::MissingFieldSeparator { .. }
        ));
    }
}
