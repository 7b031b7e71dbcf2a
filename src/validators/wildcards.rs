//! `any` and `anyAttribute` wildcards
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#Wildcards

use super::base::{ComponentData, ComponentId};
use super::kinds::SchemaKind;
use super::particles::Occurs;
use super::validation::ValidationContext;
use std::collections::BTreeSet;
use std::fmt;

const ANY_ATTRIBUTES: &[&str] = &["id", "namespace", "processContents", "minOccurs", "maxOccurs"];
const ANY_ATTRIBUTE_ATTRIBUTES: &[&str] = &["id", "namespace", "processContents"];

/// Process contents mode for wildcards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessContents {
    /// Validate strictly - element/attribute must be declared
    #[default]
    Strict,
    /// Validate if declaration found, otherwise accept
    Lax,
    /// Skip validation entirely
    Skip,
}

impl ProcessContents {
    /// Parse from string value
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "strict" => Some(Self::Strict),
            "lax" => Some(Self::Lax),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }

    /// Check if this is a valid restriction of another process contents
    pub fn is_restriction_of(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a == b => true,
            (Self::Strict, _) => true,
            (Self::Lax, Self::Skip) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ProcessContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lax => write!(f, "lax"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Namespace constraint for wildcards
///
/// The empty string stands for "no namespace" (`##local`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamespaceConstraint {
    /// Any namespace is allowed (##any)
    #[default]
    Any,
    /// Any namespace except the target namespace and no namespace (##other)
    Other {
        /// The target namespace to exclude
        target_namespace: Option<String>,
    },
    /// Specific set of allowed namespaces
    Enumeration(BTreeSet<String>),
}

impl NamespaceConstraint {
    /// Decode a `namespace` attribute
    pub fn from_namespace_attr(value: &str, target_namespace: Option<&str>) -> Result<Self, String> {
        match value.trim() {
            "##any" => Ok(Self::Any),
            "##other" => Ok(Self::Other {
                target_namespace: target_namespace.map(String::from),
            }),
            value => {
                let mut namespaces = BTreeSet::new();
                for ns in value.split_whitespace() {
                    match ns {
                        "##local" => {
                            namespaces.insert(String::new());
                        }
                        "##targetNamespace" => {
                            namespaces.insert(target_namespace.unwrap_or_default().to_string());
                        }
                        "##any" | "##other" => {
                            return Err(format!("'{}' cannot be combined with other values", ns));
                        }
                        s if s.starts_with("##") => {
                            return Err(format!("wrong value '{}'", s));
                        }
                        uri => {
                            namespaces.insert(uri.to_string());
                        }
                    }
                }
                Ok(Self::Enumeration(namespaces))
            }
        }
    }

    /// Check if a namespace is allowed by this constraint
    pub fn is_allowed(&self, namespace: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Other { target_namespace } => {
                !namespace.is_empty() && Some(namespace) != target_namespace.as_deref()
            }
            Self::Enumeration(set) => set.contains(namespace),
        }
    }

    /// Check if this constraint is a valid restriction of another
    pub fn is_restriction_of(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a == b => true,
            (_, Self::Any) => true,
            (Self::Any, _) => false,
            (Self::Enumeration(set), Self::Other { .. }) => set.iter().all(|ns| other.is_allowed(ns)),
            (Self::Other { .. }, Self::Enumeration(_)) => false,
            (Self::Enumeration(a), Self::Enumeration(b)) => a.is_subset(b),
            (Self::Other { .. }, Self::Other { .. }) => false,
        }
    }
}

impl fmt::Display for NamespaceConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("##any"),
            Self::Other { .. } => f.write_str("##other"),
            Self::Enumeration(set) => {
                let items: Vec<&str> = set
                    .iter()
                    .map(|ns| if ns.is_empty() { "##local" } else { ns.as_str() })
                    .collect();
                f.write_str(&items.join(" "))
            }
        }
    }
}

/// Decoded state of an `any` / `anyAttribute`
#[derive(Debug, Clone, Default)]
pub struct WildcardData {
    /// `namespace`
    pub namespace: NamespaceConstraint,
    /// `processContents`
    pub process_contents: ProcessContents,
    /// Occurrence bounds (`any` only)
    pub occurs: Occurs,
}

impl WildcardData {
    /// Check whether an element or attribute in `namespace` matches
    pub fn is_namespace_allowed(&self, namespace: &str) -> bool {
        self.namespace.is_allowed(namespace)
    }
}

pub(crate) fn prevalidate(ctx: &mut ValidationContext, id: ComponentId) {
    let is_any = ctx.tree().kind(id) == SchemaKind::Any;
    let legal = if is_any { ANY_ATTRIBUTES } else { ANY_ATTRIBUTE_ATTRIBUTES };
    ctx.check_attributes(id, legal);

    let mut data = WildcardData::default();
    if is_any {
        data.occurs = ctx.decode_occurs(id);
    }
    if let Some(value) = ctx.attribute(id, "namespace") {
        let target = ctx.effective_namespace(id);
        match NamespaceConstraint::from_namespace_attr(&value, target.as_deref()) {
            Ok(namespace) => data.namespace = namespace,
            Err(message) => ctx.error(id, format!("attribute 'namespace': {}", message)),
        }
    }
    if let Some(value) = ctx.attribute(id, "processContents") {
        match ProcessContents::from_str(&value) {
            Some(process_contents) => data.process_contents = process_contents,
            None => ctx.error(
                id,
                format!(
                    "attribute 'processContents': wrong value '{}', expected 'strict', 'lax' or 'skip'",
                    value
                ),
            ),
        }
    }
    ctx.tree_mut().node_mut(id).data = ComponentData::Wildcard(data);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::MemoryResolver;
    use crate::validators::segments::Segment;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_process_contents_restriction() {
        assert_eq!(ProcessContents::from_str("lax"), Some(ProcessContents::Lax));
        assert_eq!(ProcessContents::from_str("never"), None);
        assert!(ProcessContents::Strict.is_restriction_of(&ProcessContents::Skip));
        assert!(ProcessContents::Lax.is_restriction_of(&ProcessContents::Skip));
        assert!(!ProcessContents::Skip.is_restriction_of(&ProcessContents::Lax));
    }

    #[test]
    fn test_namespace_constraint_values() {
        let other = NamespaceConstraint::from_namespace_attr("##other", Some("urn:t")).unwrap();
        assert!(other.is_allowed("urn:x"));
        assert!(!other.is_allowed("urn:t"));
        assert!(!other.is_allowed(""));

        let list =
            NamespaceConstraint::from_namespace_attr("##targetNamespace ##local urn:x", Some("urn:t"))
                .unwrap();
        assert!(list.is_allowed("urn:t") && list.is_allowed("") && list.is_allowed("urn:x"));
        assert_eq!(list.to_string(), "##local urn:t urn:x");

        assert!(NamespaceConstraint::from_namespace_attr("##all", None).is_err());
        assert!(NamespaceConstraint::from_namespace_attr("##any urn:x", None).is_err());
    }

    #[test]
    fn test_namespace_constraint_restriction() {
        let any = NamespaceConstraint::Any;
        let other = NamespaceConstraint::from_namespace_attr("##other", Some("urn:t")).unwrap();
        let x = NamespaceConstraint::from_namespace_attr("urn:x", Some("urn:t")).unwrap();
        let local = NamespaceConstraint::from_namespace_attr("##local", Some("urn:t")).unwrap();
        assert!(other.is_restriction_of(&any));
        assert!(x.is_restriction_of(&other));
        assert!(!local.is_restriction_of(&other));
        assert!(!any.is_restriction_of(&x));
    }

    #[test]
    fn test_wildcard_attributes() {
        let mut ctx = ValidationContext::new(MemoryResolver::new());
        let root = ctx
            .add_schema_str(
                "w.xsd",
                r###"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:w">
                     <xs:complexType name="Open">
                       <xs:sequence>
                         <xs:any namespace="##targetNamespace" processContents="lax" maxOccurs="unbounded"/>
                         <xs:any processContents="eager"/>
                       </xs:sequence>
                       <xs:anyAttribute namespace="##other" minOccurs="0"/>
                     </xs:complexType>
                   </xs:schema>"###,
            )
            .unwrap();
        let messages: Vec<String> = ctx.validate().iter().map(|d| d.message.clone()).collect();
        assert_eq!(
            messages,
            vec![
                "attribute 'processContents': wrong value 'eager', expected 'strict', 'lax' or 'skip'"
                    .to_string(),
                "undefined attribute 'minOccurs' in <anyAttribute>".to_string(),
            ]
        );

        let open = ctx.tree().children(root)[0].id;
        let sequence = ctx.tree().segment_ids(open, Segment::Content)[0];
        let first = ctx.tree().children(sequence)[0].id;
        let data = ctx.tree().node(first).wildcard_data().unwrap();
        assert_eq!(data.process_contents, ProcessContents::Lax);
        assert!(data.occurs.max.is_none());
        assert!(data.is_namespace_allowed("urn:w"));

        let any_attribute = ctx.tree().segment_ids(open, Segment::AnyAttribute)[0];
        let data = ctx.tree().node(any_attribute).wildcard_data().unwrap();
        assert!(!data.is_namespace_allowed("urn:w"));
    }
}
