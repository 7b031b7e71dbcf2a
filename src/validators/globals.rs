//! Global definition registers
//!
//! A [`NameRegister`] maps qualified names to the components that define
//! them, one map per definition category. Each schema document owns one
//! for duplicate detection; the validation context keeps one per
//! namespace for lookups across documents.

use super::base::ComponentId;
use super::kinds::SchemaKind;
use crate::namespaces::QName;
use indexmap::IndexMap;
use std::fmt;

/// Symbol space of a global definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionCategory {
    /// `simpleType` and `complexType`
    Type,
    /// Global `element`
    Element,
    /// Global `attribute`
    Attribute,
    /// Named `group`
    Group,
    /// Named `attributeGroup`
    AttributeGroup,
    /// `notation`
    Notation,
    /// `key`, `keyref` and `unique`
    IdentityConstraint,
}

impl DefinitionCategory {
    /// All categories
    pub const ALL: [DefinitionCategory; 7] = [
        DefinitionCategory::Type,
        DefinitionCategory::Element,
        DefinitionCategory::Attribute,
        DefinitionCategory::Group,
        DefinitionCategory::AttributeGroup,
        DefinitionCategory::Notation,
        DefinitionCategory::IdentityConstraint,
    ];

    /// Category of definitions of `kind`, if it defines a named component
    pub fn for_kind(kind: SchemaKind) -> Option<Self> {
        match kind {
            SchemaKind::SimpleType | SchemaKind::ComplexType => Some(Self::Type),
            SchemaKind::Element => Some(Self::Element),
            SchemaKind::Attribute => Some(Self::Attribute),
            SchemaKind::Group => Some(Self::Group),
            SchemaKind::AttributeGroup => Some(Self::AttributeGroup),
            SchemaKind::Notation => Some(Self::Notation),
            SchemaKind::Key | SchemaKind::Keyref | SchemaKind::Unique => {
                Some(Self::IdentityConstraint)
            }
            _ => None,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for DefinitionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Type => "type",
            Self::Element => "element",
            Self::Attribute => "attribute",
            Self::Group => "group",
            Self::AttributeGroup => "attribute group",
            Self::Notation => "notation",
            Self::IdentityConstraint => "identity constraint",
        })
    }
}

/// Qualified name to component maps, one per category
#[derive(Debug, Clone, Default)]
pub struct NameRegister {
    maps: [IndexMap<QName, ComponentId>; 7],
}

impl NameRegister {
    /// Create an empty register
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` under `name`
    ///
    /// Returns the component already registered under that name when it
    /// is a different one; the register is then left unchanged.
    pub fn register(
        &mut self,
        category: DefinitionCategory,
        name: QName,
        id: ComponentId,
    ) -> Result<(), ComponentId> {
        let map = &mut self.maps[category.slot()];
        match map.get(&name) {
            Some(&existing) if existing != id => Err(existing),
            Some(_) => Ok(()),
            None => {
                map.insert(name, id);
                Ok(())
            }
        }
    }

    /// Component registered under `name`
    pub fn lookup(&self, category: DefinitionCategory, name: &QName) -> Option<ComponentId> {
        self.maps[category.slot()].get(name).copied()
    }

    /// Registered names of a category, in registration order
    pub fn iter(
        &self,
        category: DefinitionCategory,
    ) -> impl Iterator<Item = (&QName, ComponentId)> + '_ {
        self.maps[category.slot()].iter().map(|(k, v)| (k, *v))
    }

    /// Number of registered definitions of a category
    pub fn count(&self, category: DefinitionCategory) -> usize {
        self.maps[category.slot()].len()
    }

    /// Total number of registered definitions
    pub fn len(&self) -> usize {
        self.maps.iter().map(IndexMap::len).sum()
    }

    /// Check whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every registration
    pub fn clear(&mut self) {
        for map in &mut self.maps {
            map.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut register = NameRegister::new();
        let foo = QName::namespaced("urn:a", "Foo");
        let a = ComponentId::from_index(1);
        let b = ComponentId::from_index(2);

        assert!(register.register(DefinitionCategory::Type, foo.clone(), a).is_ok());
        // Same component again is fine, another one is a duplicate.
        assert!(register.register(DefinitionCategory::Type, foo.clone(), a).is_ok());
        assert_eq!(register.register(DefinitionCategory::Type, foo.clone(), b), Err(a));
        // Separate symbol spaces.
        assert!(register.register(DefinitionCategory::Element, foo.clone(), b).is_ok());

        assert_eq!(register.lookup(DefinitionCategory::Type, &foo), Some(a));
        assert_eq!(register.lookup(DefinitionCategory::Element, &foo), Some(b));
        assert_eq!(register.lookup(DefinitionCategory::Group, &foo), None);
        assert_eq!(register.len(), 2);

        register.clear();
        assert!(register.is_empty());
    }

    #[test]
    fn test_category_for_kind() {
        assert_eq!(
            DefinitionCategory::for_kind(SchemaKind::ComplexType),
            Some(DefinitionCategory::Type)
        );
        assert_eq!(
            DefinitionCategory::for_kind(SchemaKind::Keyref),
            Some(DefinitionCategory::IdentityConstraint)
        );
        assert_eq!(DefinitionCategory::for_kind(SchemaKind::Sequence), None);
        assert_eq!(DefinitionCategory::AttributeGroup.to_string(), "attribute group");
    }
}
