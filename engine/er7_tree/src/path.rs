//! Addresses into an element tree.
//!
//! A path is a list of `NAME[n]` steps separated by `/`, with occurrences
//! counted from 1 (`[1]` may be omitted). The last step may address a field of
//! a segment as `-field(rep)-component-subcomponent`:
//!
//! ```text
//! PATIENT_RESULT[2]/ORDER_OBSERVATION/OBX[3]-5(2)-1-2
//! ```

use std::fmt;
use std::str::FromStr;

use nom::{
    bytes::complete::take_while1,
    character::complete::{char, digit1},
    combinator::{all_consuming, map, map_res, opt},
    multi::separated_list0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::error::PathError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub name: String,
    pub occurrence: usize,
}

/// A field, repetition, component and subcomponent, all 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRef {
    pub field: usize,
    pub repetition: Option<usize>,
    pub component: Option<usize>,
    pub subcomponent: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    pub steps: Vec<PathStep>,
    pub field: Option<FieldRef>,
}

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }
}

fn number(input: &str) -> IResult<&str, usize> {
    map_res(digit1, str::parse::<usize>)(input)
}

fn name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn step(input: &str) -> IResult<&str, PathStep> {
    map(
        pair(name, opt(delimited(char('['), number, char(']')))),
        |(name, occurrence)| PathStep {
            name: name.to_string(),
            occurrence: occurrence.unwrap_or(1),
        },
    )(input)
}

fn field_ref(input: &str) -> IResult<&str, FieldRef> {
    map(
        tuple((
            preceded(char('-'), number),
            opt(delimited(char('('), number, char(')'))),
            opt(preceded(char('-'), number)),
            opt(preceded(char('-'), number)),
        )),
        |(field, repetition, component, subcomponent)| FieldRef {
            field,
            repetition,
            component,
            subcomponent,
        },
    )(input)
}

fn path(input: &str) -> IResult<&str, Path> {
    map(
        pair(separated_list0(char('/'), step), opt(field_ref)),
        |(steps, field)| Path { steps, field },
    )(input)
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('/');
        let (_, parsed) = all_consuming(path)(trimmed).map_err(|e| {
            let rest = match e {
                nom::Err::Error(e) | nom::Err::Failure(e) => e.input.to_string(),
                nom::Err::Incomplete(_) => String::new(),
            };
            PathError::Syntax {
                path: s.to_string(),
                rest,
            }
        })?;

        let zero_step = parsed.steps.iter().any(|st| st.occurrence == 0);
        let zero_field = parsed.field.is_some_and(|f| {
            f.field == 0 || f.repetition == Some(0) || f.component == Some(0) || f.subcomponent == Some(0)
        });
        if zero_step || zero_field {
            return Err(PathError::ZeroIndex(s.to_string()));
        }
        if parsed.field.is_some() && parsed.steps.is_empty() {
            return Err(PathError::Syntax {
                path: s.to_string(),
                rest: trimmed.to_string(),
            });
        }
        Ok(parsed)
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.occurrence == 1 {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}[{}]", self.name, self.occurrence)
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-{}", self.field)?;
        if let Some(r) = self.repetition {
            write!(f, "({r})")?;
        }
        if let Some(c) = self.component {
            write!(f, "-{c}")?;
        }
        if let Some(s) = self.subcomponent {
            write!(f, "-{s}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{step}")?;
        }
        if let Some(field) = &self.field {
            write!(f, "{field}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_steps_and_field_reference() {
        let path: Path = "ITEM[2]/LINE-1(3)-2-1".parse().unwrap();
        assert_eq!(
            path.steps,
            vec![
                PathStep {
                    name: "ITEM".into(),
                    occurrence: 2
                },
                PathStep {
                    name: "LINE".into(),
                    occurrence: 1
                },
            ]
        );
        assert_eq!(
            path.field,
            Some(FieldRef {
                field: 1,
                repetition: Some(3),
                component: Some(2),
                subcomponent: Some(1)
            })
        );
        assert_eq!(path.to_string(), "ITEM[2]/LINE-1(3)-2-1");
    }

    #[test]
    fn empty_and_slash_are_root() {
        assert!("".parse::<Path>().unwrap().is_root());
        assert!("/".parse::<Path>().unwrap().is_root());
    }

    #[test]
    fn rejects_zero_indices_and_garbage() {
        assert!(matches!("ITEM[0]".parse::<Path>(), Err(PathError::ZeroIndex(_))));
        assert!(matches!("PID-0".parse::<Path>(), Err(PathError::ZeroIndex(_))));
        assert!(matches!("PID-3(".parse::<Path>(), Err(PathError::Syntax { .. })));
        assert!(matches!("A//B".parse::<Path>(), Err(PathError::Syntax { .. })));
        assert!(matches!("-3".parse::<Path>(), Err(PathError::Syntax { .. })));
    }
}
