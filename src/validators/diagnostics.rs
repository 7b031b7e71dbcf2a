//! Validation diagnostics
//!
//! Problems found in schema documents are collected, never thrown. A
//! `fatal` diagnostic also marks its component as skipped.

use super::base::ComponentId;
use serde::Serialize;
use std::fmt;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, the schema is still usable
    Warning,
    /// Structural problem; traversal continues
    Error,
    /// The component (and what depends on it) cannot be used
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        })
    }
}

/// One reported problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Severity
    pub severity: Severity,
    /// Message
    pub message: String,
    /// Offending component
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<ComponentId>,
    /// Name of the schema document holding the component
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Line of the component in its document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Diagnostic {
    /// Diagnostic not tied to a component
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            component: None,
            schema: None,
            line: None,
        }
    }

    /// Attach the offending component
    pub fn with_component(mut self, component: ComponentId) -> Self {
        self.component = Some(component);
        self
    }

    /// Attach the source position
    pub fn with_location(mut self, schema: Option<String>, line: Option<usize>) -> Self {
        self.schema = schema;
        self.line = line;
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        match (&self.schema, self.line) {
            (Some(schema), Some(line)) => write!(f, " ({}:{})", schema, line),
            (Some(schema), None) => write!(f, " ({})", schema),
            (None, Some(line)) => write!(f, " (line {})", line),
            (None, None) => Ok(()),
        }
    }
}

/// Ordered list of diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    /// Iterate in report order
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    /// All diagnostics
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }

    /// Number of diagnostics
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check whether nothing was reported
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of diagnostics of a severity
    pub fn count(&self, severity: Severity) -> usize {
        self.items.iter().filter(|d| d.severity == severity).count()
    }

    /// Diagnostics of a severity
    pub fn of_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.severity == severity)
    }

    /// Diagnostics reported on `component`
    pub fn for_component(&self, component: ComponentId) -> impl Iterator<Item = &Diagnostic> {
        self.items
            .iter()
            .filter(move |d| d.component == Some(component))
    }

    /// Check whether any error or fatal was reported
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity >= Severity::Error)
    }

    /// Drop every diagnostic
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let d = Diagnostic::new(Severity::Error, "duplicate type 'Foo'")
            .with_location(Some("main.xsd".to_string()), Some(12));
        assert_eq!(d.to_string(), "error: duplicate type 'Foo' (main.xsd:12)");
        assert_eq!(
            Diagnostic::new(Severity::Warning, "w").to_string(),
            "warning: w"
        );
    }

    #[test]
    fn test_counts_and_filters() {
        let mut list = Diagnostics::new();
        let id = ComponentId::from_index(3);
        list.push(Diagnostic::new(Severity::Warning, "a"));
        assert!(!list.has_errors());
        list.push(Diagnostic::new(Severity::Fatal, "b").with_component(id));
        assert!(list.has_errors());
        assert_eq!(list.count(Severity::Fatal), 1);
        assert_eq!(list.for_component(id).count(), 1);
        assert_eq!(list.of_severity(Severity::Warning).next().map(|d| d.message.as_str()), Some("a"));
    }

    #[test]
    fn test_serialize() {
        let d = Diagnostic::new(Severity::Fatal, "undefined type 'x'")
            .with_component(ComponentId::from_index(7));
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["severity"], "fatal");
        assert_eq!(json["component"], 7);
        assert!(json.get("line").is_none());
    }
}
