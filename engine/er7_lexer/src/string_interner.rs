use std::borrow::Borrow;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use lazy_static::lazy_static;

lazy_static! {
    static ref INTERNER: Mutex<HashMap<Arc<str>, Arc<str>>> = Mutex::new(HashMap::new());
}

/// A reference-counted, interned string. Segment and group names repeat
/// across every message, so each distinct name is allocated once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InternedString(Arc<str>);

impl InternedString {
    /// Create a new interned string
    pub fn new(s: &str) -> Self {
        let mut map = INTERNER.lock().unwrap_or_else(PoisonError::into_inner);
        match map.get(s) {
            Some(existing) => InternedString(Arc::clone(existing)),
            None => {
                let arc: Arc<str> = Arc::from(s);
                map.insert(Arc::clone(&arc), Arc::clone(&arc));
                InternedString(arc)
            }
        }
    }

    /// Get the string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InternedString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for InternedString {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl Borrow<str> for InternedString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for InternedString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for InternedString {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for InternedString {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl std::fmt::Display for InternedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for InternedString {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for InternedString {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        Ok(InternedString::new(&s))
    }
}
