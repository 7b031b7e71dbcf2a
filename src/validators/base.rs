//! Schema component base
//!
//! Every XSD construct is a [`SchemaNode`] in the arena of a
//! [`SchemaTree`](super::SchemaTree), addressed by a [`ComponentId`]. A node
//! keeps what the document said (attributes, namespace declarations,
//! foreign attributes, appinfo/documentation text) and what validation
//! derived from it ([`ComponentData`], [`ComponentState`]).

use super::attributes::{AttributeData, AttributeGroupData};
use super::builtins::BuiltinType;
use super::complex_types::{ComplexTypeData, ContentData, DerivationData};
use super::elements::ElementData;
use super::facets::FacetData;
use super::groups::{CompositorData, GroupData};
use super::identities::{IdentityData, PathData};
use super::imports::SchemaLocationData;
use super::kinds::SchemaKind;
use super::notations::NotationData;
use super::schemas::SchemaData;
use super::segments::{Layout, SegmentedList, Tagged};
use super::simple_types::{ListData, SimpleTypeData, UnionData};
use super::wildcards::WildcardData;
use crate::namespaces::{NamespaceDeclaration, QName};
use indexmap::IndexMap;
use serde::Serialize;
use std::any::Any;
use std::fmt;

/// Handle of a component in a schema tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ComponentId(u32);

impl ComponentId {
    /// Handle for arena slot `index`
    pub fn from_index(index: usize) -> Self {
        ComponentId(index as u32)
    }

    /// Arena slot of this component
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Child entry of a component: the child handle plus its kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildRef {
    /// Child component
    pub id: ComponentId,
    /// Kind of the child
    pub kind: SchemaKind,
}

impl Tagged for ChildRef {
    fn kind(&self) -> SchemaKind {
        self.kind
    }
}

/// Validation lifecycle of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComponentState {
    /// Built from a document or by the API, not checked yet
    #[default]
    Created,
    /// Node-local checks done
    Prevalidated,
    /// Cross-references resolved
    Validated,
    /// A fatal problem was found here; dependents must not rely on it
    Skipped,
}

/// Attribute outside the schema vocabulary, kept in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraAttribute {
    /// Local name
    pub name: String,
    /// Namespace URI, if any
    pub namespace: Option<String>,
    /// Prefix as written
    pub prefix: Option<String>,
    /// Value
    pub value: String,
}

impl ExtraAttribute {
    /// Qualified name of the attribute
    pub fn qname(&self) -> QName {
        QName::new(self.namespace.clone(), self.name.clone())
    }
}

/// Resolved type: a built-in or a type definition in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRef {
    /// Built-in XSD type
    Builtin(&'static BuiltinType),
    /// `simpleType` or `complexType` component
    Defined(ComponentId),
}

impl TypeRef {
    /// Component id, for defined types
    pub fn component(self) -> Option<ComponentId> {
        match self {
            TypeRef::Defined(id) => Some(id),
            TypeRef::Builtin(_) => None,
        }
    }

    /// Built-in definition, for built-in types
    pub fn builtin(self) -> Option<&'static BuiltinType> {
        match self {
            TypeRef::Builtin(builtin) => Some(builtin),
            TypeRef::Defined(_) => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Builtin(builtin) => write!(f, "{}", builtin),
            TypeRef::Defined(id) => write!(f, "{}", id),
        }
    }
}

/// Decoded and resolved state, one variant per family of kinds
#[derive(Debug, Default)]
pub enum ComponentData {
    /// `schema`
    Schema(Box<SchemaData>),
    /// `import` / `include` / `redefine`
    SchemaLocation(SchemaLocationData),
    /// `element`
    Element(Box<ElementData>),
    /// `attribute`
    Attribute(Box<AttributeData>),
    /// `attributeGroup`
    AttributeGroup(AttributeGroupData),
    /// `complexType`
    ComplexType(ComplexTypeData),
    /// `simpleContent` / `complexContent`
    Content(ContentData),
    /// `extension` / `restriction`
    Derivation(DerivationData),
    /// `simpleType`
    SimpleType(SimpleTypeData),
    /// `list`
    List(ListData),
    /// `union`
    Union(UnionData),
    /// `all` / `choice` / `sequence`
    Compositor(CompositorData),
    /// `group`
    Group(GroupData),
    /// `any` / `anyAttribute`
    Wildcard(WildcardData),
    /// Constraining facets
    Facet(FacetData),
    /// `key` / `keyref` / `unique`
    Identity(IdentityData),
    /// `selector` / `field`
    Path(PathData),
    /// `notation`
    Notation(NotationData),
    /// Nothing decoded (annotations, or not prevalidated yet)
    #[default]
    None,
}

macro_rules! data_accessors {
    ($($getter:ident, $getter_mut:ident => $variant:ident($ty:ty);)*) => {
        impl SchemaNode {
            $(
                #[doc = concat!("Decoded `", stringify!($variant), "` data, if this node carries it")]
                pub fn $getter(&self) -> Option<&$ty> {
                    match &self.data {
                        ComponentData::$variant(data) => Some(data),
                        _ => None,
                    }
                }

                #[doc = concat!("Mutable `", stringify!($variant), "` data")]
                pub fn $getter_mut(&mut self) -> Option<&mut $ty> {
                    match &mut self.data {
                        ComponentData::$variant(data) => Some(data),
                        _ => None,
                    }
                }
            )*
        }
    };
}

data_accessors! {
    schema_data, schema_data_mut => Schema(SchemaData);
    location_data, location_data_mut => SchemaLocation(SchemaLocationData);
    element_data, element_data_mut => Element(ElementData);
    attribute_data, attribute_data_mut => Attribute(AttributeData);
    attribute_group_data, attribute_group_data_mut => AttributeGroup(AttributeGroupData);
    complex_type_data, complex_type_data_mut => ComplexType(ComplexTypeData);
    content_data, content_data_mut => Content(ContentData);
    derivation_data, derivation_data_mut => Derivation(DerivationData);
    simple_type_data, simple_type_data_mut => SimpleType(SimpleTypeData);
    list_data, list_data_mut => List(ListData);
    union_data, union_data_mut => Union(UnionData);
    compositor_data, compositor_data_mut => Compositor(CompositorData);
    group_data, group_data_mut => Group(GroupData);
    wildcard_data, wildcard_data_mut => Wildcard(WildcardData);
    facet_data, facet_data_mut => Facet(FacetData);
    identity_data, identity_data_mut => Identity(IdentityData);
    path_data, path_data_mut => Path(PathData);
    notation_data, notation_data_mut => Notation(NotationData);
}

/// A schema component
pub struct SchemaNode {
    /// Element kind
    pub kind: SchemaKind,
    /// Enclosing component; never owns it
    pub parent: Option<ComponentId>,
    /// Children in document order, partitioned by role
    pub children: SegmentedList<ChildRef>,
    /// Unqualified attributes, in document order
    pub attributes: IndexMap<String, String>,
    /// Namespace-qualified attributes, in document order
    pub extra_attributes: Vec<ExtraAttribute>,
    /// Namespace declarations made on this element
    pub namespace_declarations: Vec<NamespaceDeclaration>,
    /// Character content of `appinfo` / `documentation`
    pub text: Option<String>,
    /// Application payload
    pub extension: Option<Box<dyn Any + Send + Sync>>,
    /// Line in the source document
    pub line: Option<usize>,
    /// Lifecycle state
    pub state: ComponentState,
    /// Decoded and resolved data
    pub data: ComponentData,
}

impl SchemaNode {
    /// Create a detached node with the given child layout
    pub fn new(kind: SchemaKind, layout: Layout) -> Self {
        Self {
            kind,
            parent: None,
            children: SegmentedList::new(layout),
            attributes: IndexMap::new(),
            extra_attributes: Vec::new(),
            namespace_declarations: Vec::new(),
            text: None,
            extension: None,
            line: None,
            state: ComponentState::Created,
            data: ComponentData::None,
        }
    }

    /// Unqualified attribute value
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Check whether an unqualified attribute is present
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Set an unqualified attribute
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Remove an unqualified attribute
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        self.attributes.shift_remove(name)
    }

    /// Value of a namespace-qualified attribute
    pub fn extra_attribute(&self, namespace: &str, name: &str) -> Option<&str> {
        self.extra_attributes
            .iter()
            .find(|a| a.name == name && a.namespace.as_deref() == Some(namespace))
            .map(|a| a.value.as_str())
    }

    /// Attributes not in `legal`, in document order
    pub fn undefined_attributes<'a>(&'a self, legal: &[&str]) -> Vec<&'a str> {
        self.attributes
            .keys()
            .map(String::as_str)
            .filter(|name| !legal.contains(name))
            .collect()
    }

    /// Typed view of the application payload
    pub fn extension<T: Any>(&self) -> Option<&T> {
        self.extension.as_ref().and_then(|ext| ext.downcast_ref::<T>())
    }

    /// Mutable typed view of the application payload
    pub fn extension_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.extension.as_mut().and_then(|ext| ext.downcast_mut::<T>())
    }

    /// Replace the application payload, returning the old one
    pub fn set_extension<T: Any + Send + Sync>(
        &mut self,
        value: T,
    ) -> Option<Box<dyn Any + Send + Sync>> {
        self.extension.replace(Box::new(value))
    }

    /// Check whether a fatal problem was recorded here
    pub fn is_skipped(&self) -> bool {
        self.state == ComponentState::Skipped
    }

    /// `name` attribute
    pub fn name(&self) -> Option<&str> {
        self.attribute("name")
    }
}

impl fmt::Debug for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaNode")
            .field("kind", &self.kind)
            .field("parent", &self.parent)
            .field("children", &self.children.as_slice())
            .field("attributes", &self.attributes)
            .field("extra_attributes", &self.extra_attributes)
            .field("namespace_declarations", &self.namespace_declarations)
            .field("text", &self.text)
            .field("extension", &self.extension.as_ref().map(|_| "<opaque>"))
            .field("line", &self.line)
            .field("state", &self.state)
            .field("data", &self.data)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::tree::layout;

    fn node(kind: SchemaKind) -> SchemaNode {
        SchemaNode::new(kind, layout(kind, None))
    }

    #[test]
    fn test_attributes() {
        let mut element = node(SchemaKind::Element);
        element.set_attribute("name", "bar");
        element.set_attribute("type", "xs:string");
        element.set_attribute("colour", "red");
        assert_eq!(element.name(), Some("bar"));
        assert_eq!(
            element.undefined_attributes(&["name", "type"]),
            vec!["colour"]
        );
        assert_eq!(element.remove_attribute("colour").as_deref(), Some("red"));
        assert!(!element.has_attribute("colour"));
    }

    #[test]
    fn test_extension_slot() {
        #[derive(Debug, PartialEq)]
        struct Binding(&'static str);

        let mut element = node(SchemaKind::ComplexType);
        assert!(element.extension::<Binding>().is_none());
        element.set_extension(Binding("FooType"));
        assert_eq!(element.extension::<Binding>(), Some(&Binding("FooType")));
        assert!(element.extension::<String>().is_none());
        if let Some(binding) = element.extension_mut::<Binding>() {
            binding.0 = "Renamed";
        }
        assert_eq!(element.extension::<Binding>().map(|b| b.0), Some("Renamed"));
    }

    #[test]
    fn test_foreign_attributes() {
        let mut facet = node(SchemaKind::Pattern);
        facet.extra_attributes.push(ExtraAttribute {
            name: "hint".to_string(),
            namespace: Some("urn:ext".to_string()),
            prefix: Some("x".to_string()),
            value: "digits".to_string(),
        });
        assert_eq!(facet.extra_attribute("urn:ext", "hint"), Some("digits"));
        assert_eq!(facet.extra_attributes[0].qname().to_string(), "{urn:ext}hint");
        assert!(facet.extra_attribute("urn:other", "hint").is_none());
    }

    #[test]
    fn test_state_and_debug() {
        let mut element = node(SchemaKind::Element);
        assert_eq!(element.state, ComponentState::Created);
        element.state = ComponentState::Skipped;
        assert!(element.is_skipped());
        element.set_extension(3u8);
        assert!(format!("{:?}", element).contains("<opaque>"));
    }
}
