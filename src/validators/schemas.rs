//! `schema` root components
//!
//! Decodes the document-wide defaults of a schema document and keeps the
//! register its global definitions are checked against for duplicates.

use super::base::{ComponentData, ComponentId};
use super::globals::NameRegister;
use super::helpers::{DerivationSet, Form, BLOCK_TOKENS, FINAL_DEFAULT_TOKENS};
use super::validation::ValidationContext;

const SCHEMA_ATTRIBUTES: &[&str] = &[
    "id",
    "targetNamespace",
    "version",
    "elementFormDefault",
    "attributeFormDefault",
    "blockDefault",
    "finalDefault",
];

/// Where a schema document came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSource {
    /// Canonical id given by the resolver
    pub id: String,
    /// Name used in diagnostics
    pub name: String,
}

impl SchemaSource {
    /// Create a source description
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Decoded state of a `schema` component
#[derive(Debug, Clone)]
pub struct SchemaData {
    /// Document origin
    pub source: SchemaSource,
    /// `targetNamespace`
    pub target_namespace: Option<String>,
    /// Namespace assigned by a chameleon include in the current run
    pub included_namespace: Option<String>,
    /// Namespace of the global definitions of this document
    pub effective_namespace: Option<String>,
    /// `elementFormDefault`
    pub element_form_default: Form,
    /// `attributeFormDefault`
    pub attribute_form_default: Form,
    /// `blockDefault`
    pub block_default: DerivationSet,
    /// `finalDefault`
    pub final_default: DerivationSet,
    /// `version`
    pub version: Option<String>,
    /// Global definitions of this document
    pub register: NameRegister,
}

impl SchemaData {
    /// Undecoded data for a freshly loaded document
    pub fn new(source: SchemaSource) -> Self {
        Self {
            source,
            target_namespace: None,
            included_namespace: None,
            effective_namespace: None,
            element_form_default: Form::Unqualified,
            attribute_form_default: Form::Unqualified,
            block_default: DerivationSet::default(),
            final_default: DerivationSet::default(),
            version: None,
            register: NameRegister::new(),
        }
    }

    /// Forget everything but the origin
    pub fn reset(&mut self) {
        *self = Self::new(self.source.clone());
    }

    /// Check whether this document took its namespace from an includer
    pub fn is_chameleon(&self) -> bool {
        self.target_namespace.is_none() && self.included_namespace.is_some()
    }

    /// Form of a local element with the given explicit `form`
    pub fn element_form(&self, explicit: Option<Form>) -> Form {
        explicit.unwrap_or(self.element_form_default)
    }

    /// Form of a local attribute with the given explicit `form`
    pub fn attribute_form(&self, explicit: Option<Form>) -> Form {
        explicit.unwrap_or(self.attribute_form_default)
    }
}

pub(crate) fn prevalidate(ctx: &mut ValidationContext, id: ComponentId) {
    ctx.check_attributes(id, SCHEMA_ATTRIBUTES);

    let target_namespace = match ctx.attribute(id, "targetNamespace") {
        Some(ns) if ns.trim().is_empty() => {
            ctx.error(id, "the attribute 'targetNamespace' cannot be an empty string");
            None
        }
        Some(ns) => Some(ns.trim().to_string()),
        None => None,
    };
    let element_form_default = ctx.decode_form(id, "elementFormDefault").unwrap_or_default();
    let attribute_form_default = ctx.decode_form(id, "attributeFormDefault").unwrap_or_default();
    let block_default = ctx
        .decode_derivation_set(id, "blockDefault", BLOCK_TOKENS)
        .unwrap_or_default();
    let final_default = ctx
        .decode_derivation_set(id, "finalDefault", FINAL_DEFAULT_TOKENS)
        .unwrap_or_default();
    let version = ctx.attribute(id, "version");

    let node = ctx.tree_mut().node_mut(id);
    if node.schema_data().is_none() {
        node.data = ComponentData::Schema(Box::new(SchemaData::new(SchemaSource::new(
            id.to_string(),
            id.to_string(),
        ))));
    }
    if let Some(data) = node.schema_data_mut() {
        data.effective_namespace = target_namespace.clone().or_else(|| data.included_namespace.clone());
        data.target_namespace = target_namespace;
        data.element_form_default = element_form_default;
        data.attribute_form_default = attribute_form_default;
        data.block_default = block_default;
        data.final_default = final_default;
        data.version = version;
        data.register.clear();
    }
}
