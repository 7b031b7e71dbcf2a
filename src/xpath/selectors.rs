//! XPath subset of identity constraints (`xs:selector`, `xs:field`)
//!
//! ```text
//! Selector ::= Path ( '|' Path )*
//! Path     ::= ('.//')? Step ( '/' Step )*
//! Step     ::= '.' | NameTest
//! NameTest ::= QName | '*' | NCName ':' '*'
//! ```
//!
//! A field path may end with an attribute step (`@NameTest`). Steps may
//! spell the axis out as `child::` or `attribute::`.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#coss-identity-constraint

use super::XPathParseError;
use crate::names::{is_valid_ncname, is_valid_qname};
use std::fmt;

/// Which attribute the expression came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// `selector/@xpath`: element steps only
    Selector,
    /// `field/@xpath`: may end with an attribute step
    Field,
}

/// Kind of path step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStepKind {
    /// Child axis (default)
    Child,
    /// Attribute axis (@)
    Attribute,
    /// Leading `.//`
    DescendantOrSelf,
    /// Self axis (.)
    Self_,
}

/// A single step in an identity-constraint path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    /// The kind of step
    pub kind: PathStepKind,
    /// Local name, or `*`; empty for `.` and `.//`
    pub name: String,
    /// Optional namespace prefix
    pub prefix: Option<String>,
}

impl PathStep {
    fn axis_only(kind: PathStepKind) -> Self {
        Self {
            kind,
            name: String::new(),
            prefix: None,
        }
    }

    /// Parse one step
    pub fn parse(step: &str) -> Result<Self, XPathParseError> {
        let step = step.trim();
        if step.is_empty() {
            return Err(XPathParseError::UnexpectedEnd);
        }
        if step == "." || step == "self::node()" {
            return Ok(Self::axis_only(PathStepKind::Self_));
        }

        let (kind, rest) = if let Some(rest) = step.strip_prefix('@') {
            (PathStepKind::Attribute, rest)
        } else if let Some(rest) = step.strip_prefix("attribute::") {
            (PathStepKind::Attribute, rest)
        } else if let Some(rest) = step.strip_prefix("child::") {
            (PathStepKind::Child, rest)
        } else if let Some((axis, _)) = step.split_once("::") {
            return Err(XPathParseError::UnknownAxis(axis.trim().to_string()));
        } else {
            (PathStepKind::Child, step)
        };

        let rest = rest.trim();
        let (prefix, name) = match rest.split_once(':') {
            Some((prefix, "*")) if is_valid_ncname(prefix) => (Some(prefix), "*"),
            Some((prefix, local)) if is_valid_qname(rest) => (Some(prefix), local),
            None if rest == "*" || is_valid_ncname(rest) => (None, rest),
            _ => return Err(XPathParseError::InvalidStep(step.to_string())),
        };
        Ok(Self {
            kind,
            name: name.to_string(),
            prefix: prefix.map(str::to_string),
        })
    }

    /// Create a child step
    pub fn child(name: impl Into<String>) -> Self {
        Self {
            kind: PathStepKind::Child,
            name: name.into(),
            prefix: None,
        }
    }

    /// Create an attribute step
    pub fn attribute(name: impl Into<String>) -> Self {
        Self {
            kind: PathStepKind::Attribute,
            name: name.into(),
            prefix: None,
        }
    }

    /// Set the prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Get the qualified name (prefix:local)
    pub fn qname(&self) -> String {
        if let Some(prefix) = &self.prefix {
            format!("{}:{}", prefix, self.name)
        } else {
            self.name.clone()
        }
    }

    /// Check if this step matches any name (*)
    pub fn is_wildcard(&self) -> bool {
        self.name == "*"
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PathStepKind::Self_ => f.write_str("."),
            PathStepKind::DescendantOrSelf => f.write_str(".//"),
            PathStepKind::Attribute => write!(f, "@{}", self.qname()),
            PathStepKind::Child => f.write_str(&self.qname()),
        }
    }
}

/// Split an expression on `|`
pub fn split_alternatives(xpath: &str) -> Vec<&str> {
    xpath.split('|').map(str::trim).collect()
}

/// Split one alternative into steps
///
/// A leading `.//` becomes its own step; `//` anywhere else and a leading
/// `/` are outside the subset.
fn split_path(path: &str) -> Result<Vec<&str>, XPathParseError> {
    let path = path.trim();
    if path.is_empty() {
        return Err(XPathParseError::UnexpectedEnd);
    }
    let mut steps = Vec::new();
    let rest = if let Some(rest) = path.strip_prefix(".//") {
        steps.push(".//");
        rest
    } else if path.starts_with('/') {
        return Err(XPathParseError::InvalidSyntax(
            "absolute paths are not allowed".to_string(),
        ));
    } else {
        path
    };
    if rest.contains("//") {
        return Err(XPathParseError::InvalidSyntax(
            "'//' is allowed only at the start as './/'".to_string(),
        ));
    }
    for step in rest.split('/') {
        if step.trim().is_empty() {
            return Err(XPathParseError::UnexpectedEnd);
        }
        steps.push(step);
    }
    Ok(steps)
}

/// Parsed `xpath` of a `selector` or `field`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPath {
    xpath: String,
    kind: PathKind,
    alternatives: Vec<Vec<PathStep>>,
}

impl IdentityPath {
    /// Parse and check an expression
    pub fn parse(xpath: &str, kind: PathKind) -> Result<Self, XPathParseError> {
        if xpath.trim().is_empty() {
            return Err(XPathParseError::Empty);
        }
        let mut alternatives = Vec::new();
        for alternative in split_alternatives(xpath) {
            let raw = split_path(alternative)?;
            let last = raw.len() - 1;
            let mut steps = Vec::with_capacity(raw.len());
            for (index, text) in raw.into_iter().enumerate() {
                if text == ".//" {
                    steps.push(PathStep::axis_only(PathStepKind::DescendantOrSelf));
                    continue;
                }
                let step = PathStep::parse(text)?;
                if step.kind == PathStepKind::Attribute && (kind == PathKind::Selector || index != last) {
                    return Err(XPathParseError::InvalidSyntax(format!(
                        "attribute step '{}' is allowed only at the end of a field",
                        text.trim()
                    )));
                }
                steps.push(step);
            }
            alternatives.push(steps);
        }
        Ok(Self {
            xpath: xpath.trim().to_string(),
            kind,
            alternatives,
        })
    }

    /// Expression as written (trimmed)
    pub fn xpath(&self) -> &str {
        &self.xpath
    }

    /// Attribute the expression came from
    pub fn kind(&self) -> PathKind {
        self.kind
    }

    /// Steps of each `|` alternative
    pub fn alternatives(&self) -> &[Vec<PathStep>] {
        &self.alternatives
    }

    /// Check whether some alternative selects an attribute
    pub fn selects_attribute(&self) -> bool {
        self.alternatives
            .iter()
            .any(|steps| steps.last().is_some_and(|s| s.kind == PathStepKind::Attribute))
    }

    /// Namespace prefixes used by name tests, without duplicates
    pub fn prefixes(&self) -> Vec<&str> {
        let mut prefixes: Vec<&str> = Vec::new();
        for step in self.alternatives.iter().flatten() {
            if let Some(prefix) = step.prefix.as_deref() {
                if !prefixes.contains(&prefix) {
                    prefixes.push(prefix);
                }
            }
        }
        prefixes
    }
}

impl fmt::Display for IdentityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.xpath)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn selector(xpath: &str) -> Result<IdentityPath, XPathParseError> {
        IdentityPath::parse(xpath, PathKind::Selector)
    }

    fn field(xpath: &str) -> Result<IdentityPath, XPathParseError> {
        IdentityPath::parse(xpath, PathKind::Field)
    }

    #[test]
    fn test_path_step_parse() {
        let step = PathStep::parse("ns:element").unwrap();
        assert_eq!(step.kind, PathStepKind::Child);
        assert_eq!(step.name, "element");
        assert_eq!(step.prefix.as_deref(), Some("ns"));

        let step = PathStep::parse("attribute::id").unwrap();
        assert_eq!(step, PathStep::attribute("id"));
        assert!(PathStep::parse("ns:*").unwrap().is_wildcard());
        assert_eq!(PathStep::parse(".").unwrap().kind, PathStepKind::Self_);
    }

    #[test]
    fn test_path_step_rejects() {
        assert_eq!(
            PathStep::parse("parent::a"),
            Err(XPathParseError::UnknownAxis("parent".to_string()))
        );
        assert_eq!(
            PathStep::parse("a[1]"),
            Err(XPathParseError::InvalidStep("a[1]".to_string()))
        );
        assert!(PathStep::parse("..").is_err());
        assert!(PathStep::parse("1a").is_err());
    }

    #[test]
    fn test_selector_alternatives() {
        let path = selector(".//tns:item | ./entry/*").unwrap();
        assert_eq!(path.alternatives().len(), 2);
        let first: Vec<String> = path.alternatives()[0].iter().map(|s| s.to_string()).collect();
        assert_eq!(first, vec![".//", "tns:item"]);
        let second: Vec<String> = path.alternatives()[1].iter().map(|s| s.to_string()).collect();
        assert_eq!(second, vec![".", "entry", "*"]);
        assert_eq!(path.prefixes(), vec!["tns"]);
        assert!(!path.selects_attribute());
    }

    #[test]
    fn test_field_attribute_step() {
        let path = field("@id").unwrap();
        assert!(path.selects_attribute());
        assert!(field("./name/@xml:lang").is_ok());
        assert!(selector("@id").is_err());
        assert!(field("@id/name").is_err());
    }

    #[test]
    fn test_rejected_expressions() {
        assert_eq!(selector("  "), Err(XPathParseError::Empty));
        assert!(selector("/root/item").is_err());
        assert!(selector("a//b").is_err());
        assert_eq!(selector("a/"), Err(XPathParseError::UnexpectedEnd));
        assert_eq!(selector("a|"), Err(XPathParseError::UnexpectedEnd));
        assert!(selector("descendant::a").is_err());
    }
}
