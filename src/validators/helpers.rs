//! Attribute value helpers
//!
//! Decoders for the attribute patterns that recur across schema kinds:
//! booleans, `form`, derivation-control sets (`block`, `final`,
//! `blockDefault`, `finalDefault`), non-negative integers and decimals.
//! Decoders return the offending detail as a `String` so callers can put
//! it into a diagnostic.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;

/// Tokens admitted by `final` on complexType and `block` on complexType
pub const EXTENSION_RESTRICTION: &[&str] = &["extension", "restriction"];

/// Tokens admitted by `block` on element and `blockDefault`
pub const BLOCK_TOKENS: &[&str] = &["extension", "restriction", "substitution"];

/// Tokens admitted by `finalDefault`
pub const FINAL_DEFAULT_TOKENS: &[&str] = &["extension", "restriction", "list", "union"];

/// Tokens admitted by `final` on simpleType
pub const SIMPLE_FINAL_TOKENS: &[&str] = &["list", "union", "restriction"];

lazy_static::lazy_static! {
    /// XSD boolean value mapping
    pub static ref XSD_BOOLEAN_MAP: HashMap<&'static str, bool> = {
        let mut m = HashMap::new();
        m.insert("false", false);
        m.insert("0", false);
        m.insert("true", true);
        m.insert("1", true);
        m
    };
}

/// Decode an `xs:boolean` attribute value
pub fn parse_boolean(value: &str) -> Option<bool> {
    XSD_BOOLEAN_MAP.get(value.trim()).copied()
}

/// Decode an `xs:nonNegativeInteger`
pub fn parse_non_negative_integer(value: &str) -> Option<u64> {
    let value = value.trim();
    let digits = value.strip_prefix('+').unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u64>().ok()
}

/// Decode an `xs:decimal`
pub fn parse_decimal(value: &str) -> Option<Decimal> {
    let value = value.trim();
    if value.is_empty() || value.contains(['e', 'E']) {
        return None;
    }
    value.parse::<Decimal>().ok()
}

/// Collapse whitespace the way `whiteSpace="collapse"` does
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Element / attribute form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Form {
    /// Unqualified (default)
    #[default]
    Unqualified,
    /// Qualified
    Qualified,
}

impl Form {
    /// Parse from string value
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "qualified" => Some(Self::Qualified),
            "unqualified" => Some(Self::Unqualified),
            _ => None,
        }
    }

    /// Check if qualified
    pub fn is_qualified(&self) -> bool {
        matches!(self, Self::Qualified)
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Qualified => write!(f, "qualified"),
            Self::Unqualified => write!(f, "unqualified"),
        }
    }
}

/// Derivation-control flags (`block`, `final` and their schema defaults)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DerivationSet {
    /// Extension derivation
    pub extension: bool,
    /// Restriction derivation
    pub restriction: bool,
    /// Substitution (block only)
    pub substitution: bool,
    /// List derivation (simple types)
    pub list: bool,
    /// Union derivation (simple types)
    pub union: bool,
}

impl DerivationSet {
    /// Every flag admitted by `allowed`
    pub fn all_of(allowed: &[&str]) -> Self {
        let mut result = Self::default();
        for token in allowed {
            result.set(token);
        }
        result
    }

    /// Parse a `#all` or whitespace-separated token list
    ///
    /// Every token must be one of `allowed`; `#all` sets exactly those.
    pub fn parse(value: &str, allowed: &[&str]) -> Result<Self, String> {
        let value = value.trim();
        if value == "#all" {
            return Ok(Self::all_of(allowed));
        }

        let mut result = Self::default();
        for token in value.split_whitespace() {
            if !allowed.contains(&token) {
                return Err(format!(
                    "wrong value '{}': expected '#all' or a list of {}",
                    token,
                    allowed.join(", ")
                ));
            }
            result.set(token);
        }
        Ok(result)
    }

    fn set(&mut self, token: &str) {
        match token {
            "extension" => self.extension = true,
            "restriction" => self.restriction = true,
            "substitution" => self.substitution = true,
            "list" => self.list = true,
            "union" => self.union = true,
            _ => {}
        }
    }

    /// Check if any flag is set
    pub fn is_empty(&self) -> bool {
        !self.extension && !self.restriction && !self.substitution && !self.list && !self.union
    }
}

impl fmt::Display for DerivationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<&str> = [
            (self.extension, "extension"),
            (self.restriction, "restriction"),
            (self.substitution, "substitution"),
            (self.list, "list"),
            (self.union, "union"),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, name)| *name)
        .collect();
        f.write_str(&tokens.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_boolean() {
        assert_eq!(parse_boolean("true"), Some(true));
        assert_eq!(parse_boolean(" 0 "), Some(false));
        assert_eq!(parse_boolean("yes"), None);
    }

    #[test]
    fn test_parse_non_negative_integer() {
        assert_eq!(parse_non_negative_integer("10"), Some(10));
        assert_eq!(parse_non_negative_integer("+3"), Some(3));
        assert_eq!(parse_non_negative_integer("-1"), None);
        assert_eq!(parse_non_negative_integer("1.5"), None);
        assert_eq!(parse_non_negative_integer(""), None);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("1.50"), "1.5".parse::<Decimal>().ok());
        assert!(parse_decimal("-7").is_some());
        assert!(parse_decimal("1e3").is_none());
        assert!(parse_decimal("abc").is_none());
    }

    #[test]
    fn test_form() {
        assert_eq!(Form::from_str("qualified"), Some(Form::Qualified));
        assert!(Form::from_str("both").is_none());
        assert!(!Form::default().is_qualified());
    }

    #[test]
    fn test_derivation_set() {
        let all = DerivationSet::parse("#all", BLOCK_TOKENS).unwrap();
        assert!(all.extension && all.restriction && all.substitution);
        assert!(!all.list);

        let some = DerivationSet::parse("extension  restriction", EXTENSION_RESTRICTION).unwrap();
        assert_eq!(some.to_string(), "extension restriction");

        assert!(DerivationSet::parse("list", EXTENSION_RESTRICTION).is_err());
        assert!(DerivationSet::parse("", BLOCK_TOKENS).unwrap().is_empty());
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n b\tc "), "a b c");
    }
}
