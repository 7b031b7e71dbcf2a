//! XML namespace handling
//!
//! Qualified names, namespace declarations as they appear on schema
//! elements, and the well-known namespace URIs.

use serde::Serialize;
use std::fmt;

/// XSD 1.0 namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML namespace, bound to the `xml` prefix without declaration
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XML Namespace URI
pub type NamespaceUri = String;

/// Qualified name (QName) - combination of namespace and local name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QName {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<NamespaceUri>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: Option<impl Into<String>>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(|s| s.into()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// Namespace as a borrowed string
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Check whether this name lives in the XSD namespace
    pub fn is_xsd(&self) -> bool {
        self.namespace.as_deref() == Some(XSD_NAMESPACE)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

/// One `xmlns` / `xmlns:prefix` declaration carried by a schema element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDeclaration {
    /// Declared prefix; `None` for the default namespace
    pub prefix: Option<String>,
    /// Namespace URI (empty undeclares the default namespace)
    pub uri: NamespaceUri,
}

impl NamespaceDeclaration {
    /// Declaration binding `prefix` to `uri`
    pub fn prefixed(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            uri: uri.into(),
        }
    }

    /// Default namespace declaration
    pub fn default_namespace(uri: impl Into<String>) -> Self {
        Self {
            prefix: None,
            uri: uri.into(),
        }
    }

    /// Check whether this declaration binds `prefix`
    pub fn binds(&self, prefix: Option<&str>) -> bool {
        self.prefix.as_deref() == prefix
    }
}

/// Look up `prefix` in a list of declarations, latest binding first
pub fn lookup_prefix<'a>(
    declarations: &'a [NamespaceDeclaration],
    prefix: Option<&str>,
) -> Option<&'a str> {
    declarations
        .iter()
        .rev()
        .find(|d| d.binds(prefix))
        .map(|d| d.uri.as_str())
}
