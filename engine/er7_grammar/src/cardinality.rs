use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CardinalityParseError;

/// Upper occurrence bound of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

impl MaxOccurs {
    /// Whether `count` occurrences stay within this bound.
    pub fn admits(self, count: usize) -> bool {
        match self {
            MaxOccurs::Bounded(max) => count <= max as usize,
            MaxOccurs::Unbounded => true,
        }
    }
}

impl fmt::Display for MaxOccurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxOccurs::Bounded(n) => write!(f, "{n}"),
            MaxOccurs::Unbounded => write!(f, "*"),
        }
    }
}

/// A `(min, max)` occurrence bound, written `min..max` with `*` for unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cardinality {
    pub min: u32,
    pub max: MaxOccurs,
}

impl Cardinality {
    /// Exactly one occurrence.
    pub const ONE: Cardinality = Cardinality {
        min: 1,
        max: MaxOccurs::Bounded(1),
    };
    /// Zero or one occurrence.
    pub const OPTIONAL: Cardinality = Cardinality {
        min: 0,
        max: MaxOccurs::Bounded(1),
    };
    /// Any number of occurrences.
    pub const ANY: Cardinality = Cardinality {
        min: 0,
        max: MaxOccurs::Unbounded,
    };
    /// One or more occurrences.
    pub const AT_LEAST_ONE: Cardinality = Cardinality {
        min: 1,
        max: MaxOccurs::Unbounded,
    };

    /// A bounded range; fails when `min > max`.
    pub fn range(min: u32, max: u32) -> Result<Self, CardinalityParseError> {
        Cardinality {
            min,
            max: MaxOccurs::Bounded(max),
        }
        .checked()
    }

    pub fn at_least(min: u32) -> Self {
        Cardinality {
            min,
            max: MaxOccurs::Unbounded,
        }
    }

    pub fn is_valid(&self) -> bool {
        match self.max {
            MaxOccurs::Bounded(max) => self.min <= max,
            MaxOccurs::Unbounded => true,
        }
    }

    fn checked(self) -> Result<Self, CardinalityParseError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(CardinalityParseError::MinAboveMax(self.to_string()))
        }
    }

    pub fn is_optional(&self) -> bool {
        self.min == 0
    }

    pub fn is_repeatable(&self) -> bool {
        !matches!(self.max, MaxOccurs::Bounded(0 | 1))
    }

    /// Whether one more occurrence may be attempted after `count`.
    pub fn allows_another(&self, count: usize) -> bool {
        self.max.admits(count + 1)
    }

    pub fn admits(&self, count: usize) -> bool {
        count >= self.min as usize && self.max.admits(count)
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Cardinality::ONE
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.min, self.max)
    }
}

impl FromStr for Cardinality {
    type Err = CardinalityParseError;

    /// Accepts `min..max`, `min..*` and a bare `n` meaning exactly `n`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CardinalityParseError::Syntax(s.to_string());
        let number = |t: &str| t.trim().parse::<u32>().map_err(|_| invalid());

        let cardinality = match s.split_once("..") {
            Some((min, "*")) => Cardinality::at_least(number(min)?),
            Some((min, max)) => Cardinality {
                min: number(min)?,
                max: MaxOccurs::Bounded(number(max)?),
            },
            None => {
                let n = number(s)?;
                Cardinality {
                    min: n,
                    max: MaxOccurs::Bounded(n),
                }
            }
        };
        cardinality.checked()
    }
}

impl TryFrom<String> for Cardinality {
    type Error = CardinalityParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Cardinality> for String {
    fn from(c: Cardinality) -> Self {
        c.to_string()
    }
}
