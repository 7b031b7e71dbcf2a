//! `complexType` definitions and their derivations
//!
//! A complex type has either a content child (`simpleContent` or
//! `complexContent`, holding one `extension` or `restriction`) or an
//! optional model group followed by attribute declarations. The
//! derivation resolves its `base` in the validate pass and records the
//! base on the owning type.

use super::attributes::check_duplicate_attributes;
use super::base::{ComponentData, ComponentId, TypeRef};
use super::builtins::{any_type, XSD_ANY_TYPE};
use super::facets;
use super::globals::DefinitionCategory;
use super::helpers::{parse_boolean, DerivationSet, EXTENSION_RESTRICTION};
use super::kinds::{KindMask, SchemaKind};
use super::segments::Segment;
use super::simple_types;
use super::validation::ValidationContext;
use crate::namespaces::QName;
use std::collections::HashSet;
use std::fmt;

use SchemaKind as K;

const COMPLEX_TYPE_ATTRIBUTES: &[&str] = &["id", "name", "mixed", "abstract", "block", "final"];
const SIMPLE_CONTENT_ATTRIBUTES: &[&str] = &["id"];
const COMPLEX_CONTENT_ATTRIBUTES: &[&str] = &["id", "mixed"];
const DERIVATION_ATTRIBUTES: &[&str] = &["id", "base"];

const CONTENT_KINDS: KindMask = KindMask::of(&[K::SimpleContent, K::ComplexContent]);
const DERIVATION_KINDS: KindMask = KindMask::of(&[K::Extension, K::Restriction]);
const MODEL_GROUP_KINDS: KindMask = KindMask::of(&[K::Group, K::All, K::Choice, K::Sequence]);

/// Content type of a complex type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    /// No character or element content
    #[default]
    Empty,
    /// Character content of a simple type
    Simple,
    /// Element content only
    ElementOnly,
    /// Elements interleaved with character data
    Mixed,
}

/// `extension` or `restriction`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationMethod {
    /// Adds to the base type
    Extension,
    /// Constrains the base type
    Restriction,
}

impl DerivationMethod {
    fn for_kind(kind: SchemaKind) -> Self {
        match kind {
            K::Extension => DerivationMethod::Extension,
            _ => DerivationMethod::Restriction,
        }
    }

    fn is_final_in(self, set: &DerivationSet) -> bool {
        match self {
            DerivationMethod::Extension => set.extension,
            DerivationMethod::Restriction => set.restriction,
        }
    }
}

impl fmt::Display for DerivationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DerivationMethod::Extension => "extension",
            DerivationMethod::Restriction => "restriction",
        })
    }
}

/// Where an `extension` / `restriction` sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationContext {
    /// Inside `simpleType`
    SimpleType,
    /// Inside `simpleContent`
    SimpleContent,
    /// Inside `complexContent`
    ComplexContent,
}

impl DerivationContext {
    /// Context of a derivation whose parent has kind `parent`
    pub fn for_parent(parent: Option<SchemaKind>) -> Self {
        match parent {
            Some(K::SimpleContent) => DerivationContext::SimpleContent,
            Some(K::ComplexContent) => DerivationContext::ComplexContent,
            _ => DerivationContext::SimpleType,
        }
    }
}

/// Decoded and resolved state of a `complexType`
#[derive(Debug, Clone, Default)]
pub struct ComplexTypeData {
    /// Qualified name of a global definition
    pub qname: Option<QName>,
    /// `mixed`
    pub mixed: bool,
    /// `abstract`
    pub abstract_: bool,
    /// `block`, or the schema `blockDefault`
    pub block: DerivationSet,
    /// `final`, or the schema `finalDefault`
    pub final_: DerivationSet,
    /// Content type, from the structure of the definition
    pub content_type: ContentType,
    /// Base type, `xs:anyType` when the definition has no content child
    pub base_type: Option<TypeRef>,
    /// How the type derives from its base
    pub derivation: Option<DerivationMethod>,
}

/// Decoded state of `simpleContent` / `complexContent`
#[derive(Debug, Clone, Default)]
pub struct ContentData {
    /// `mixed` of a `complexContent`
    pub mixed: Option<bool>,
}

/// Decoded and resolved state of an `extension` / `restriction`
#[derive(Debug, Clone)]
pub struct DerivationData {
    /// Derivation method
    pub method: DerivationMethod,
    /// Derivation context
    pub context: DerivationContext,
    /// `base`
    pub base_name: Option<QName>,
    /// Resolved base type
    pub base_type: Option<TypeRef>,
}

impl DerivationData {
    /// Undecoded derivation of kind `kind` under a parent of kind `parent`
    pub fn new(kind: SchemaKind, parent: Option<SchemaKind>) -> Self {
        Self {
            method: DerivationMethod::for_kind(kind),
            context: DerivationContext::for_parent(parent),
            base_name: None,
            base_type: None,
        }
    }
}

pub(crate) fn prevalidate(ctx: &mut ValidationContext, id: ComponentId) {
    ctx.check_attributes(id, COMPLEX_TYPE_ATTRIBUTES);
    let mut data = ComplexTypeData::default();

    if ctx.tree().is_global(id) {
        if ctx.require_attribute(id, "name").is_some() {
            if let Some(name) = ctx.decode_name(id) {
                let qname = QName::new(ctx.effective_namespace(id), name);
                ctx.register_global(id, DefinitionCategory::Type, qname.clone());
                data.qname = Some(qname);
            }
        }
    } else {
        ctx.forbid_attributes(
            id,
            &["name", "abstract", "final", "block"],
            "in an anonymous type definition",
        );
    }

    data.mixed = ctx.decode_boolean(id, "mixed").unwrap_or(false);
    data.abstract_ = ctx.decode_boolean(id, "abstract").unwrap_or(false);
    let (block_default, final_default) = ctx
        .schema_data(id)
        .map(|schema| (schema.block_default, schema.final_default))
        .unwrap_or_default();
    data.block = ctx
        .decode_derivation_set(id, "block", EXTENSION_RESTRICTION)
        .unwrap_or(DerivationSet {
            extension: block_default.extension,
            restriction: block_default.restriction,
            ..DerivationSet::default()
        });
    data.final_ = ctx
        .decode_derivation_set(id, "final", EXTENSION_RESTRICTION)
        .unwrap_or(DerivationSet {
            extension: final_default.extension,
            restriction: final_default.restriction,
            ..DerivationSet::default()
        });

    let tree = ctx.tree();
    let content: Vec<SchemaKind> = tree
        .segment(id, Segment::Content)
        .iter()
        .map(|c| c.kind)
        .collect();
    let has_attributes = !tree.segment(id, Segment::Attributes).is_empty();
    let any_attributes = tree.segment(id, Segment::AnyAttribute).len();
    let content_children = content.iter().filter(|k| CONTENT_KINDS.contains(**k)).count();
    let model_groups = content.len() - content_children;

    if content_children > 1 {
        ctx.error(id, "a complex type can have at most one content child");
    }
    if let Some(kind) = content.iter().find(|k| CONTENT_KINDS.contains(**k)) {
        if model_groups > 0 || has_attributes || any_attributes > 0 {
            ctx.error(
                id,
                format!("a complex type with <{}> cannot have model groups or attributes", kind),
            );
        }
    } else if model_groups > 1 {
        ctx.error(id, "a complex type can have at most one model group");
    }
    if any_attributes > 1 {
        ctx.error(id, "a complex type can have at most one <anyAttribute>");
    }

    data.content_type = content_type(ctx, id, data.mixed);
    ctx.tree_mut().node_mut(id).data = ComponentData::ComplexType(data);
}

fn content_type(ctx: &ValidationContext, id: ComponentId, mixed: bool) -> ContentType {
    let tree = ctx.tree();
    let (has_model_group, mixed) = match tree.first_child(id, CONTENT_KINDS) {
        Some(content) if tree.kind(content) == K::SimpleContent => return ContentType::Simple,
        Some(content) => {
            let mixed = tree
                .node(content)
                .attribute("mixed")
                .and_then(parse_boolean)
                .unwrap_or(mixed);
            let model_group = tree
                .first_child(content, DERIVATION_KINDS)
                .and_then(|derivation| tree.first_child(derivation, MODEL_GROUP_KINDS));
            (model_group.is_some(), mixed)
        }
        None => (tree.first_child(id, MODEL_GROUP_KINDS).is_some(), mixed),
    };
    match (mixed, has_model_group) {
        (true, _) => ContentType::Mixed,
        (false, true) => ContentType::ElementOnly,
        (false, false) => ContentType::Empty,
    }
}

pub(crate) fn validate(ctx: &mut ValidationContext, id: ComponentId) {
    if ctx.tree().first_child(id, CONTENT_KINDS).is_none() {
        if let Some(data) = ctx.tree_mut().node_mut(id).complex_type_data_mut() {
            data.base_type = Some(TypeRef::Builtin(any_type()));
            data.derivation = Some(DerivationMethod::Restriction);
        }
    }
    check_duplicate_attributes(ctx, id);
}

pub(crate) fn prevalidate_content(ctx: &mut ValidationContext, id: ComponentId) {
    let kind = ctx.tree().kind(id);
    let legal = match kind {
        K::SimpleContent => SIMPLE_CONTENT_ATTRIBUTES,
        _ => COMPLEX_CONTENT_ATTRIBUTES,
    };
    ctx.check_attributes(id, legal);
    match ctx.tree().segment(id, Segment::Derivation).len() {
        0 => ctx.error(id, format!("<{}> requires an <extension> or <restriction> child", kind)),
        1 => {}
        _ => ctx.error(id, format!("<{}> can have only one derivation child", kind)),
    }
    let mixed = ctx.decode_boolean(id, "mixed");
    ctx.tree_mut().node_mut(id).data = ComponentData::Content(ContentData { mixed });
}

pub(crate) fn prevalidate_derivation(ctx: &mut ValidationContext, id: ComponentId) {
    ctx.check_attributes(id, DERIVATION_ATTRIBUTES);
    let kind = ctx.tree().kind(id);
    let parent = ctx.tree().parent(id).map(|p| ctx.tree().kind(p));
    let mut data = DerivationData::new(kind, parent);

    if ctx.require_attribute(id, "base").is_some() {
        data.base_name = ctx.decode_qname(id, "base");
    }
    if ctx.tree().segment(id, Segment::Content).len() > 1 {
        ctx.error(id, format!("<{}> can have at most one model group", kind));
    }
    if ctx.tree().segment(id, Segment::AnyAttribute).len() > 1 {
        ctx.error(id, format!("<{}> can have at most one <anyAttribute>", kind));
    }
    ctx.tree_mut().node_mut(id).data = ComponentData::Derivation(data);
}

pub(crate) fn validate_derivation(ctx: &mut ValidationContext, id: ComponentId) {
    let Some(data) = ctx.tree().node(id).derivation_data() else {
        return;
    };
    let (method, context) = (data.method, data.context);
    let Some(base_name) = data.base_name.clone() else {
        return;
    };
    let Some(base) = ctx.resolve_type(id, &base_name) else {
        ctx.fatal(id, format!("undefined base type '{}'", base_name));
        return;
    };
    let owner = ctx
        .tree()
        .parent(id)
        .and_then(|content| ctx.tree().parent(content))
        .filter(|&owner| ctx.tree().kind(owner) == K::ComplexType);

    let label = type_label(base, &base_name);
    match context {
        DerivationContext::ComplexContent => {
            let complex = match base {
                TypeRef::Builtin(builtin) => builtin.name == XSD_ANY_TYPE,
                TypeRef::Defined(target) => ctx.tree().kind(target) == K::ComplexType,
            };
            if !complex {
                ctx.error(
                    id,
                    format!("base type '{}' of a complexContent derivation must be a complex type", label),
                );
            }
        }
        _ => check_simple_content_base(ctx, id, method, base, &label),
    }

    if let (Some(owner), TypeRef::Defined(target)) = (owner, base) {
        if let Some(base_data) = ctx.tree().node(target).complex_type_data() {
            if method.is_final_in(&base_data.final_) {
                ctx.error(
                    id,
                    format!("type '{}' does not allow derivation by {}", base_name, method),
                );
            }
        }
        if is_circular(ctx, owner) {
            let name = ctx.tree().node(owner).name().unwrap_or_default().to_string();
            ctx.error(id, format!("circular definition of type '{}'", name));
        }
    }

    if context == DerivationContext::SimpleContent && method == DerivationMethod::Restriction {
        let admitted = simple_types::admitted_facets(ctx, base);
        facets::validate_facet_set(ctx, id, admitted);
    }
    check_duplicate_attributes(ctx, id);

    if let Some(data) = ctx.tree_mut().node_mut(id).derivation_data_mut() {
        data.base_type = Some(base);
    }
    if let Some(owner) = owner {
        if let Some(data) = ctx.tree_mut().node_mut(owner).complex_type_data_mut() {
            data.base_type = Some(base);
            data.derivation = Some(method);
        }
    }
}

fn check_simple_content_base(
    ctx: &mut ValidationContext,
    id: ComponentId,
    method: DerivationMethod,
    base: TypeRef,
    label: &str,
) {
    let base_content = match base {
        TypeRef::Builtin(builtin) if builtin.is_simple() => None,
        TypeRef::Builtin(_) => Some(ContentType::Mixed),
        TypeRef::Defined(target) => ctx
            .tree()
            .node(target)
            .complex_type_data()
            .map(|data| data.content_type),
    };
    match (method, base_content) {
        (DerivationMethod::Restriction, None) => ctx.error(
            id,
            format!(
                "a simpleContent restriction requires a complex base type, '{}' is simple",
                label
            ),
        ),
        (_, Some(content)) if content != ContentType::Simple => ctx.error(
            id,
            format!("base type '{}' of a simpleContent derivation does not have simple content", label),
        ),
        _ => {}
    }
}

/// Name of a type for messages: built-ins keep their `xs:` prefix
pub(crate) fn type_label(type_ref: TypeRef, name: &QName) -> String {
    match type_ref {
        TypeRef::Builtin(builtin) => builtin.to_string(),
        TypeRef::Defined(_) => name.to_string(),
    }
}

/// Derivation child of a type definition
fn derivation_of(ctx: &ValidationContext, type_id: ComponentId) -> Option<ComponentId> {
    let tree = ctx.tree();
    match tree.kind(type_id) {
        K::ComplexType => {
            let content = tree.first_child(type_id, CONTENT_KINDS)?;
            tree.first_child(content, DERIVATION_KINDS)
        }
        K::SimpleType => tree.first_child(type_id, K::Restriction.into()),
        _ => None,
    }
}

/// Defined base of a type definition, resolved from its `base` attribute
pub(crate) fn declared_base(ctx: &ValidationContext, type_id: ComponentId) -> Option<ComponentId> {
    let derivation = derivation_of(ctx, type_id)?;
    let name = ctx.tree().node(derivation).derivation_data()?.base_name.as_ref()?;
    ctx.resolve_type(derivation, name)?.component()
}

/// Check whether the base chain of `type_id` leads back to it
pub(crate) fn is_circular(ctx: &ValidationContext, type_id: ComponentId) -> bool {
    let mut seen = HashSet::new();
    let mut current = type_id;
    while let Some(base) = declared_base(ctx, current) {
        if base == type_id {
            return true;
        }
        if !seen.insert(base) {
            return false;
        }
        current = base;
    }
    false
}
