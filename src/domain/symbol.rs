use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A validated ticker symbol, e.g. `"AAPL"`.
///
/// The set of tradeable symbols is a runtime configuration value, not a
/// closed enum — `Symbol` only validates *shape* (non-empty, uppercase
/// ASCII alphanumeric). Membership in the configured universe is the
/// [`crate::engine::MatchingEngine`]'s concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Box<str>);

impl Symbol {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("symbol must not be empty".to_string());
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
            return Err(format!("invalid symbol `{s}`"));
        }
        Ok(Symbol(s.to_ascii_uppercase().into_boxed_str()))
    }
}

impl Serialize for Symbol {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Symbol::from_str(&s).map_err(serde::de::Error::custom)
    }
}
