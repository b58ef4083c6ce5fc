//! Canonical asset identifiers.
//!
//! Symbols are compared case-insensitively everywhere in the system.
//! Rather than scattering case-folding through callbacks, the folding
//! happens exactly once, at construction: a `Symbol` is always trimmed
//! and lower-case, so plain equality is the case-insensitive comparison.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical identifier for a tradable asset.
///
/// Always non-empty, trimmed, and lower-case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Canonicalize a raw string into a symbol.
    ///
    /// Returns `InvalidSymbol` if the input is empty after trimming.
    pub fn parse(raw: &str) -> Result<Self> {
        let canonical = raw.trim().to_lowercase();
        if canonical.is_empty() {
            return Err(CoreError::InvalidSymbol(raw.to_string()));
        }
        Ok(Self(canonical))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = CoreError;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_canonicalized() {
        let symbol = Symbol::parse("  Cardano ").unwrap();
        assert_eq!(symbol.as_str(), "cardano");
    }

    #[test]
    fn test_symbol_case_insensitive_equality() {
        assert_eq!(
            Symbol::parse("CARDANO").unwrap(),
            Symbol::parse("cardano").unwrap()
        );
    }

    #[test]
    fn test_empty_symbol_rejected() {
        assert!(matches!(
            Symbol::parse("   "),
            Err(CoreError::InvalidSymbol(_))
        ));
    }

    #[test]
    fn test_symbol_deserialization_canonicalizes() {
        let symbol: Symbol = serde_json::from_str("\"Bitcoin\"").unwrap();
        assert_eq!(symbol.as_str(), "bitcoin");
        assert!(serde_json::from_str::<Symbol>("\"\"").is_err());
    }
}
