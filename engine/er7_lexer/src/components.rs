use crate::delimiters::Delimiters;
use crate::error::LexError;
use crate::escape::{unescape, EscapeMode};

/// Parse one field into repetitions/components/subcomponents using the
/// profile's separators, unescaping every leaf value.
///
/// Returns a 3-level nested vector: `[repetition][component][subcomponent]`.
pub fn parse_field_components(
    field: &str,
    d: &Delimiters,
    mode: EscapeMode,
) -> Result<Vec<Vec<Vec<String>>>, LexError> {
    field
        .split(d.repetition)
        .map(|rep| {
            rep.split(d.component)
                .map(|comp| {
                    comp.split(d.subcomponent)
                        .map(|s| unescape(s, d, mode).map(|v| v.into_owned()))
                        .collect::<Result<Vec<String>, LexError>>()
                })
                .collect::<Result<Vec<Vec<String>>, LexError>>()
        })
        .collect::<Result<Vec<Vec<Vec<String>>>, LexError>>()
}

/// First component of a raw field, unescaped. Used for header codes.
pub fn first_component(field: &str, d: &Delimiters) -> Option<String> {
    let raw = field
        .split(d.repetition)
        .next()?
        .split(d.component)
        .next()?
        .split(d.subcomponent)
        .next()?;
    let value = unescape(raw, d, EscapeMode::Tolerant).ok()?;
    (!value.is_empty()).then(|| value.into_owned())
}
