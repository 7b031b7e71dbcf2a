//! `element` declarations
//!
//! A global element (a direct child of `schema`) declares a name; a local
//! one either declares a name or refers to a global element with `ref`.
//! Types are resolved in the order `ref`, then `type`, then an inline
//! definition; an element without any of them takes the type of its
//! substitution group head, or `xs:anyType`.

use super::base::{ComponentData, ComponentId, TypeRef};
use super::builtins::any_type;
use super::globals::DefinitionCategory;
use super::helpers::{DerivationSet, Form, BLOCK_TOKENS, EXTENSION_RESTRICTION};
use super::kinds::SchemaKind;
use super::particles::Occurs;
use super::segments::Segment;
use super::tree::SchemaTree;
use super::validation::ValidationContext;
use crate::namespaces::QName;
use std::collections::HashSet;

const ELEMENT_ATTRIBUTES: &[&str] = &[
    "id",
    "name",
    "ref",
    "type",
    "substitutionGroup",
    "minOccurs",
    "maxOccurs",
    "default",
    "fixed",
    "nillable",
    "abstract",
    "final",
    "block",
    "form",
];

/// Decoded and resolved state of an `element`
#[derive(Debug, Clone, Default)]
pub struct ElementData {
    /// Qualified name of a declaring element
    pub qname: Option<QName>,
    /// `ref`
    pub reference_name: Option<QName>,
    /// `type`
    pub type_name: Option<QName>,
    /// `substitutionGroup`
    pub substitution_group: Option<QName>,
    /// Occurrence bounds (local elements)
    pub occurs: Occurs,
    /// Explicit `form`
    pub form: Option<Form>,
    /// `nillable`
    pub nillable: bool,
    /// `abstract`
    pub abstract_: bool,
    /// `block`, or the schema `blockDefault`
    pub block: DerivationSet,
    /// `final`, or the schema `finalDefault`
    pub final_: DerivationSet,
    /// `default`
    pub default: Option<String>,
    /// `fixed`
    pub fixed: Option<String>,
    /// Referenced global element
    pub reference: Option<ComponentId>,
    /// Resolved type
    pub type_ref: Option<TypeRef>,
    /// Resolved substitution group head
    pub substitution_head: Option<ComponentId>,
}

impl ElementData {
    /// Check whether this is a reference to a global element
    pub fn is_reference(&self) -> bool {
        self.reference_name.is_some()
    }

    /// Referenced global element, once resolved
    pub fn reference(&self) -> Option<ComponentId> {
        self.reference
    }
}

/// Resolved type of element `id`
pub fn element_type(tree: &SchemaTree, id: ComponentId) -> Option<TypeRef> {
    tree.node(id).element_data().and_then(|data| data.type_ref)
}

pub(crate) fn prevalidate(ctx: &mut ValidationContext, id: ComponentId) {
    ctx.check_attributes(id, ELEMENT_ATTRIBUTES);
    let global = ctx.tree().is_global(id);
    let node = ctx.tree().node(id);
    let has_name = node.has_attribute("name");
    let has_ref = node.has_attribute("ref");
    let parent_kind = node.parent.map(|parent| ctx.tree().kind(parent));

    let mut data = ElementData::default();
    if global {
        if !has_name {
            ctx.require_attribute(id, "name");
        }
        ctx.forbid_attributes(
            id,
            &["ref", "form", "minOccurs", "maxOccurs"],
            "in a global element declaration",
        );
    } else {
        match (has_name, has_ref) {
            (true, true) => ctx.error(id, "'name' and 'ref' attributes are mutually exclusive"),
            (false, false) => ctx.error(id, "a local element requires a 'name' or a 'ref' attribute"),
            _ => {}
        }
        ctx.forbid_attributes(
            id,
            &["abstract", "final", "substitutionGroup"],
            "in a local element declaration",
        );
        data.occurs = ctx.decode_occurs(id);
    }

    data.reference_name = ctx.decode_qname(id, "ref");
    let inline_types = ctx.tree().segment(id, Segment::TypeDefinition).len();
    if has_ref && !global {
        ctx.forbid_attributes(
            id,
            &["type", "form", "nillable", "block", "default", "fixed"],
            "together with 'ref'",
        );
        if inline_types > 0 {
            ctx.error(id, "an element reference cannot have an inline type definition");
        }
        if !ctx.tree().segment(id, Segment::Identities).is_empty() {
            ctx.error(id, "an element reference cannot have identity constraints");
        }
    }

    let name = ctx.decode_name(id);
    data.type_name = ctx.decode_qname(id, "type");
    data.substitution_group = ctx.decode_qname(id, "substitutionGroup");
    data.default = ctx.attribute(id, "default");
    data.fixed = ctx.attribute(id, "fixed");
    if data.default.is_some() && data.fixed.is_some() {
        ctx.error(id, "'default' and 'fixed' attributes are mutually exclusive");
    }
    data.nillable = ctx.decode_boolean(id, "nillable").unwrap_or(false);
    data.abstract_ = ctx.decode_boolean(id, "abstract").unwrap_or(false);
    data.form = ctx.decode_form(id, "form");

    let (block_default, final_default, form_default) = ctx
        .schema_data(id)
        .map(|schema| {
            (
                schema.block_default,
                schema.final_default,
                schema.element_form(data.form),
            )
        })
        .unwrap_or_default();
    data.block = ctx
        .decode_derivation_set(id, "block", BLOCK_TOKENS)
        .unwrap_or(DerivationSet {
            list: false,
            union: false,
            ..block_default
        });
    data.final_ = ctx
        .decode_derivation_set(id, "final", EXTENSION_RESTRICTION)
        .unwrap_or(DerivationSet {
            extension: final_default.extension,
            restriction: final_default.restriction,
            ..DerivationSet::default()
        });

    if inline_types > 1 {
        ctx.error(id, "an element can have at most one inline type definition");
    }
    if data.type_name.is_some() && inline_types > 0 {
        ctx.error(
            id,
            "'type' attribute and inline type definition are mutually exclusive",
        );
    }

    if parent_kind == Some(SchemaKind::All) && data.occurs.max.map_or(true, |max| max > 1) {
        ctx.error(
            id,
            format!(
                "maxOccurs of an element in <all> must be 0 or 1, found {}",
                data.occurs
            ),
        );
    }

    if let Some(name) = name {
        let namespace = if global || form_default.is_qualified() {
            ctx.effective_namespace(id)
        } else {
            None
        };
        let qname = QName::new(namespace, name);
        if global {
            ctx.register_global(id, DefinitionCategory::Element, qname.clone());
        }
        data.qname = Some(qname);
    }

    ctx.tree_mut().node_mut(id).data = ComponentData::Element(Box::new(data));
}

pub(crate) fn validate(ctx: &mut ValidationContext, id: ComponentId) {
    let Some(data) = ctx.tree().node(id).element_data() else {
        return;
    };
    let reference_name = data.reference_name.clone();
    let type_name = data.type_name.clone();
    let substitution_group = data.substitution_group.clone();

    if let Some(name) = reference_name {
        match ctx.find_element(&name) {
            Some(target) => {
                let type_ref = declared_type(ctx, target, &mut HashSet::new());
                if let Some(data) = ctx.tree_mut().node_mut(id).element_data_mut() {
                    data.reference = Some(target);
                    data.type_ref = type_ref;
                }
            }
            None => ctx.fatal(id, format!("undefined element reference '{}'", name)),
        }
        return;
    }

    let mut head_type = None;
    if let Some(head_name) = substitution_group {
        let Some(head) = ctx.find_element(&head_name) else {
            ctx.fatal(id, format!("undefined substitution group head '{}'", head_name));
            return;
        };
        if substitution_cycle(ctx, id) {
            ctx.error(
                id,
                format!("circular substitution group through '{}'", head_name),
            );
        } else {
            head_type = declared_type(ctx, head, &mut HashSet::from([id]));
        }
        if let Some(data) = ctx.tree_mut().node_mut(id).element_data_mut() {
            data.substitution_head = Some(head);
        }
    }

    let type_ref = if let Some(type_name) = type_name {
        match ctx.resolve_type(id, &type_name) {
            Some(type_ref) => type_ref,
            None => {
                ctx.fatal(id, format!("undefined type '{}'", type_name));
                return;
            }
        }
    } else if let Some(inline) = ctx.tree().segment_ids(id, Segment::TypeDefinition).first() {
        TypeRef::Defined(*inline)
    } else {
        head_type.unwrap_or(TypeRef::Builtin(any_type()))
    };
    if let Some(data) = ctx.tree_mut().node_mut(id).element_data_mut() {
        data.type_ref = Some(type_ref);
    }
}

/// Type of a global element, computed from its declaration
///
/// The element may not be validated yet, so this works from the decoded
/// names rather than from `type_ref`.
fn declared_type(
    ctx: &ValidationContext,
    id: ComponentId,
    visited: &mut HashSet<ComponentId>,
) -> Option<TypeRef> {
    if !visited.insert(id) {
        return None;
    }
    let data = ctx.tree().node(id).element_data()?;
    if let Some(type_ref) = data.type_ref {
        return Some(type_ref);
    }
    if let Some(name) = &data.reference_name {
        let target = ctx.find_element(name)?;
        return declared_type(ctx, target, visited);
    }
    if let Some(name) = &data.type_name {
        return ctx.resolve_type(id, name);
    }
    if let Some(inline) = ctx.tree().segment(id, Segment::TypeDefinition).first() {
        return Some(TypeRef::Defined(inline.id));
    }
    if let Some(head) = &data.substitution_group {
        let head = ctx.find_element(head)?;
        return declared_type(ctx, head, visited);
    }
    Some(TypeRef::Builtin(any_type()))
}

fn substitution_cycle(ctx: &ValidationContext, start: ComponentId) -> bool {
    let mut seen = HashSet::from([start]);
    let mut current = start;
    loop {
        let Some(head) = ctx
            .tree()
            .node(current)
            .element_data()
            .and_then(|data| data.substitution_group.as_ref())
            .and_then(|name| ctx.find_element(name))
        else {
            return false;
        };
        if head == start {
            return true;
        }
        if !seen.insert(head) {
            return false;
        }
        current = head;
    }
}
