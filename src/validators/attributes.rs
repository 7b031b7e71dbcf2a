//! `attribute` declarations and `attributeGroup` definitions

use super::base::{ComponentData, ComponentId, TypeRef};
use super::builtins::any_simple_type;
use super::globals::DefinitionCategory;
use super::helpers::Form;
use super::kinds::SchemaKind;
use super::segments::Segment;
use super::validation::ValidationContext;
use crate::namespaces::QName;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;

const ATTRIBUTE_ATTRIBUTES: &[&str] = &["id", "name", "ref", "type", "use", "default", "fixed", "form"];
const ATTRIBUTE_GROUP_ATTRIBUTES: &[&str] = &["id", "name", "ref"];

/// `use` of an attribute declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeUse {
    /// May appear
    #[default]
    Optional,
    /// Must appear
    Required,
    /// Must not appear
    Prohibited,
}

impl AttributeUse {
    /// Parse a `use` value
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "optional" => Some(AttributeUse::Optional),
            "required" => Some(AttributeUse::Required),
            "prohibited" => Some(AttributeUse::Prohibited),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttributeUse::Optional => "optional",
            AttributeUse::Required => "required",
            AttributeUse::Prohibited => "prohibited",
        })
    }
}

/// Decoded and resolved state of an `attribute`
#[derive(Debug, Clone, Default)]
pub struct AttributeData {
    /// Qualified name of a declaring attribute
    pub qname: Option<QName>,
    /// `ref`
    pub reference_name: Option<QName>,
    /// `type`
    pub type_name: Option<QName>,
    /// `use`
    pub use_: AttributeUse,
    /// Explicit `form`
    pub form: Option<Form>,
    /// `default`
    pub default: Option<String>,
    /// `fixed`
    pub fixed: Option<String>,
    /// Referenced global attribute
    pub reference: Option<ComponentId>,
    /// Resolved type
    pub type_ref: Option<TypeRef>,
}

impl AttributeData {
    /// Name the attribute is known by: its own, or the referenced one
    pub fn effective_name(&self) -> Option<&QName> {
        self.qname.as_ref().or(self.reference_name.as_ref())
    }
}

/// Decoded and resolved state of an `attributeGroup`
#[derive(Debug, Clone, Default)]
pub struct AttributeGroupData {
    /// Qualified name of a definition
    pub qname: Option<QName>,
    /// `ref`
    pub reference_name: Option<QName>,
    /// Referenced definition
    pub reference: Option<ComponentId>,
}

pub(crate) fn prevalidate(ctx: &mut ValidationContext, id: ComponentId) {
    ctx.check_attributes(id, ATTRIBUTE_ATTRIBUTES);
    let global = ctx.tree().is_global(id);
    let node = ctx.tree().node(id);
    let has_name = node.has_attribute("name");
    let has_ref = node.has_attribute("ref");
    let has_inline = !ctx.tree().segment(id, Segment::TypeDefinition).is_empty();

    let mut data = AttributeData::default();
    if global {
        if !has_name {
            ctx.require_attribute(id, "name");
        }
        ctx.forbid_attributes(id, &["ref", "form", "use"], "in a global attribute declaration");
    } else {
        match (has_name, has_ref) {
            (true, true) => ctx.error(id, "'name' and 'ref' attributes are mutually exclusive"),
            (false, false) => ctx.error(id, "a local attribute requires a 'name' or a 'ref' attribute"),
            _ => {}
        }
    }
    data.reference_name = ctx.decode_qname(id, "ref");
    if has_ref && !global {
        ctx.forbid_attributes(id, &["type", "form"], "together with 'ref'");
        if has_inline {
            ctx.error(id, "an attribute reference cannot have an inline type definition");
        }
    }

    let name = ctx.decode_name(id);
    if name.as_deref() == Some("xmlns") {
        ctx.error(id, "an attribute cannot be named 'xmlns'");
    }
    data.type_name = ctx.decode_qname(id, "type");
    if data.type_name.is_some() && has_inline {
        ctx.error(
            id,
            "'type' attribute and inline type definition are mutually exclusive",
        );
    }
    if let Some(value) = ctx.attribute(id, "use") {
        match AttributeUse::from_str(&value) {
            Some(use_) => data.use_ = use_,
            None => ctx.error(
                id,
                format!(
                    "attribute 'use': wrong value '{}', expected 'optional', 'required' or 'prohibited'",
                    value
                ),
            ),
        }
    }
    data.default = ctx.attribute(id, "default");
    data.fixed = ctx.attribute(id, "fixed");
    if data.default.is_some() && data.fixed.is_some() {
        ctx.error(id, "'default' and 'fixed' attributes are mutually exclusive");
    }
    if data.default.is_some() && data.use_ != AttributeUse::Optional {
        ctx.error(
            id,
            format!("attribute 'default' requires use='optional', found '{}'", data.use_),
        );
    }
    data.form = ctx.decode_form(id, "form");

    if let Some(name) = name {
        let qualified = global
            || ctx
                .schema_data(id)
                .is_some_and(|schema| schema.attribute_form(data.form).is_qualified());
        let namespace = if qualified {
            ctx.effective_namespace(id)
        } else {
            None
        };
        let qname = QName::new(namespace, name);
        if global {
            ctx.register_global(id, DefinitionCategory::Attribute, qname.clone());
        }
        data.qname = Some(qname);
    }

    ctx.tree_mut().node_mut(id).data = ComponentData::Attribute(Box::new(data));
}

pub(crate) fn validate(ctx: &mut ValidationContext, id: ComponentId) {
    let Some(data) = ctx.tree().node(id).attribute_data() else {
        return;
    };
    let reference_name = data.reference_name.clone();
    let type_name = data.type_name.clone();

    if let Some(name) = reference_name {
        let Some(target) = ctx.find_attribute(&name) else {
            ctx.fatal(id, format!("undefined attribute reference '{}'", name));
            return;
        };
        let type_ref = declared_type(ctx, target);
        if let Some(data) = ctx.tree_mut().node_mut(id).attribute_data_mut() {
            data.reference = Some(target);
            data.type_ref = type_ref;
        }
        return;
    }

    let type_ref = if let Some(type_name) = type_name {
        let Some(type_ref) = ctx.resolve_type(id, &type_name) else {
            ctx.fatal(id, format!("undefined type '{}'", type_name));
            return;
        };
        let simple = match type_ref {
            TypeRef::Builtin(builtin) => builtin.is_simple(),
            TypeRef::Defined(target) => ctx.tree().kind(target) == SchemaKind::SimpleType,
        };
        if !simple {
            ctx.error(
                id,
                format!("type '{}' of an attribute must be a simple type", type_name),
            );
        }
        type_ref
    } else if let Some(inline) = ctx.tree().segment_ids(id, Segment::TypeDefinition).first() {
        TypeRef::Defined(*inline)
    } else {
        TypeRef::Builtin(any_simple_type())
    };
    if let Some(data) = ctx.tree_mut().node_mut(id).attribute_data_mut() {
        data.type_ref = Some(type_ref);
    }
}

/// Type of a global attribute, from its declaration
fn declared_type(ctx: &ValidationContext, id: ComponentId) -> Option<TypeRef> {
    let data = ctx.tree().node(id).attribute_data()?;
    if data.type_ref.is_some() {
        return data.type_ref;
    }
    if let Some(name) = &data.type_name {
        return ctx.resolve_type(id, name);
    }
    match ctx.tree().segment(id, Segment::TypeDefinition).first() {
        Some(inline) => Some(TypeRef::Defined(inline.id)),
        None => Some(TypeRef::Builtin(any_simple_type())),
    }
}

pub(crate) fn prevalidate_group(ctx: &mut ValidationContext, id: ComponentId) {
    ctx.check_attributes(id, ATTRIBUTE_GROUP_ATTRIBUTES);
    let mut data = AttributeGroupData::default();
    if ctx.tree().is_global(id) {
        ctx.forbid_attributes(id, &["ref"], "in an attribute group definition");
        if ctx.require_attribute(id, "name").is_some() {
            if let Some(name) = ctx.decode_name(id) {
                let qname = QName::new(ctx.effective_namespace(id), name);
                ctx.register_global(id, DefinitionCategory::AttributeGroup, qname.clone());
                data.qname = Some(qname);
            }
        }
    } else {
        ctx.forbid_attributes(id, &["name"], "in an attribute group reference");
        if ctx.require_attribute(id, "ref").is_some() {
            data.reference_name = ctx.decode_qname(id, "ref");
        }
        let tree = ctx.tree();
        if !tree.segment(id, Segment::Attributes).is_empty()
            || !tree.segment(id, Segment::AnyAttribute).is_empty()
        {
            ctx.error(id, "an attribute group reference can only contain an annotation");
        }
    }
    ctx.tree_mut().node_mut(id).data = ComponentData::AttributeGroup(data);
}

pub(crate) fn validate_group(ctx: &mut ValidationContext, id: ComponentId) {
    let Some(data) = ctx.tree().node(id).attribute_group_data() else {
        return;
    };
    if let Some(qname) = data.qname.clone() {
        if reaches(ctx, id, id, &mut HashSet::new()) {
            ctx.error(id, format!("circular definition of attribute group '{}'", qname));
            return;
        }
        check_duplicate_attributes(ctx, id);
        return;
    }
    let Some(name) = data.reference_name.clone() else {
        return;
    };
    match ctx.resolve_reference(id, DefinitionCategory::AttributeGroup, &name) {
        Some(target) => {
            if let Some(data) = ctx.tree_mut().node_mut(id).attribute_group_data_mut() {
                data.reference = Some(target);
            }
        }
        None => ctx.fatal(id, format!("undefined attribute group '{}'", name)),
    }
}

/// Definition an `attributeGroup` reference points to
fn referenced_group(ctx: &ValidationContext, reference: ComponentId) -> Option<ComponentId> {
    let data = ctx.tree().node(reference).attribute_group_data()?;
    data.reference.or_else(|| {
        data.reference_name.as_ref().and_then(|name| {
            ctx.resolve_reference(reference, DefinitionCategory::AttributeGroup, name)
        })
    })
}

fn group_references(ctx: &ValidationContext, owner: ComponentId) -> Vec<ComponentId> {
    ctx.tree()
        .segment(owner, Segment::Attributes)
        .iter()
        .filter(|child| child.kind == SchemaKind::AttributeGroup)
        .map(|child| child.id)
        .collect()
}

/// Check whether `target` is reachable from the references of `from`
fn reaches(
    ctx: &ValidationContext,
    from: ComponentId,
    target: ComponentId,
    visited: &mut HashSet<ComponentId>,
) -> bool {
    for reference in group_references(ctx, from) {
        let Some(group) = referenced_group(ctx, reference) else {
            continue;
        };
        if group == target {
            return true;
        }
        if visited.insert(group) && reaches(ctx, group, target, visited) {
            return true;
        }
    }
    false
}

/// Attribute declarations of `owner`, with referenced groups flattened
///
/// Declarations come in document order; a group already expanded on the
/// way is not expanded again.
pub fn flatten_attributes(ctx: &ValidationContext, owner: ComponentId) -> Vec<ComponentId> {
    let mut out = Vec::new();
    collect(ctx, owner, &mut HashSet::from([owner]), &mut out);
    out
}

fn collect(
    ctx: &ValidationContext,
    owner: ComponentId,
    visited: &mut HashSet<ComponentId>,
    out: &mut Vec<ComponentId>,
) {
    for child in ctx.tree().segment(owner, Segment::Attributes) {
        match child.kind {
            SchemaKind::Attribute => out.push(child.id),
            _ => {
                if let Some(group) = referenced_group(ctx, child.id) {
                    if visited.insert(group) {
                        collect(ctx, group, visited, out);
                    }
                }
            }
        }
    }
}

/// Report attributes of `owner` declared twice under the same name
pub(crate) fn check_duplicate_attributes(ctx: &mut ValidationContext, owner: ComponentId) {
    let mut seen: IndexMap<QName, ComponentId> = IndexMap::new();
    let mut duplicates = Vec::new();
    for attribute in flatten_attributes(ctx, owner) {
        let Some(name) = ctx
            .tree()
            .node(attribute)
            .attribute_data()
            .and_then(|data| data.effective_name().cloned())
        else {
            continue;
        };
        if seen.contains_key(&name) {
            duplicates.push(name);
        } else {
            seen.insert(name, attribute);
        }
    }
    for name in duplicates {
        ctx.error(owner, format!("duplicate attribute '{}'", name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::MemoryResolver;
    use crate::validators::Severity;
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> (ValidationContext, ComponentId) {
        let mut ctx = ValidationContext::new(MemoryResolver::new());
        let root = ctx.add_schema_str("a.xsd", source).unwrap();
        ctx.validate();
        (ctx, root)
    }

    fn messages(ctx: &ValidationContext) -> Vec<&str> {
        ctx.diagnostics().iter().map(|d| d.message.as_str()).collect()
    }

    #[test]
    fn test_attribute_use_values() {
        assert_eq!(AttributeUse::from_str(" required"), Some(AttributeUse::Required));
        assert_eq!(AttributeUse::from_str("sometimes"), None);
        assert_eq!(AttributeUse::default().to_string(), "optional");
    }

    #[test]
    fn test_attribute_declaration_rules() {
        let (ctx, _) = run(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:attribute name="g" use="required"/>
                 <xs:attribute name="xmlns"/>
                 <xs:complexType name="C">
                   <xs:attribute name="a" default="1" use="required"/>
                   <xs:attribute name="b" default="1" fixed="1"/>
                   <xs:attribute ref="g" type="xs:string"/>
                   <xs:attribute name="c" type="C"/>
                 </xs:complexType>
               </xs:schema>"#,
        );
        assert_eq!(
            messages(&ctx),
            vec![
                "attribute 'use' is not allowed in a global attribute declaration",
                "an attribute cannot be named 'xmlns'",
                "attribute 'default' requires use='optional', found 'required'",
                "'default' and 'fixed' attributes are mutually exclusive",
                "attribute 'type' is not allowed together with 'ref'",
                "type 'C' of an attribute must be a simple type",
            ]
        );
    }

    #[test]
    fn test_attribute_types() {
        let (ctx, root) = run(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:t"
                 xmlns:t="urn:t">
                 <xs:attribute name="lang" type="xs:language"/>
                 <xs:attribute name="plain"/>
                 <xs:attributeGroup name="G">
                   <xs:attribute ref="t:lang"/>
                   <xs:attribute name="size">
                     <xs:simpleType><xs:restriction base="xs:int"/></xs:simpleType>
                   </xs:attribute>
                 </xs:attributeGroup>
               </xs:schema>"#,
        );
        assert!(ctx.diagnostics().is_empty(), "{:?}", ctx.diagnostics());
        let ids: Vec<ComponentId> = ctx.tree().children(root).iter().map(|c| c.id).collect();
        let data = |id| ctx.tree().node(id).attribute_data().unwrap();
        assert!(matches!(data(ids[0]).type_ref, Some(TypeRef::Builtin(b)) if b.name == "language"));
        assert!(matches!(data(ids[1]).type_ref, Some(TypeRef::Builtin(b)) if b.name == "anySimpleType"));

        let members = ctx.tree().segment_ids(ids[2], Segment::Attributes);
        assert_eq!(data(members[0]).reference, Some(ids[0]));
        assert!(matches!(data(members[0]).type_ref, Some(TypeRef::Builtin(b)) if b.name == "language"));
        assert_eq!(data(members[1]).qname.as_ref().unwrap().to_string(), "size");
        assert!(matches!(data(members[1]).type_ref, Some(TypeRef::Defined(_))));
    }

    #[test]
    fn test_attribute_group_references() {
        let (ctx, root) = run(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:attributeGroup name="A">
                   <xs:attribute name="x"/>
                   <xs:attributeGroup ref="B"/>
                 </xs:attributeGroup>
                 <xs:attributeGroup name="B">
                   <xs:attributeGroup ref="A"/>
                 </xs:attributeGroup>
                 <xs:attributeGroup name="C">
                   <xs:attributeGroup ref="Missing"/>
                 </xs:attributeGroup>
               </xs:schema>"#,
        );
        assert_eq!(
            messages(&ctx),
            vec![
                "circular definition of attribute group 'A'",
                "circular definition of attribute group 'B'",
                "undefined attribute group 'Missing'",
            ]
        );
        assert_eq!(ctx.diagnostics().count(Severity::Fatal), 1);
        let a = ctx.tree().children(root)[0].id;
        assert_eq!(flatten_attributes(&ctx, a).len(), 1);
    }

    #[test]
    fn test_duplicate_attributes_through_groups() {
        let (ctx, _) = run(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:attributeGroup name="A">
                   <xs:attribute name="x"/>
                 </xs:attributeGroup>
                 <xs:attributeGroup name="B">
                   <xs:attribute name="x" type="xs:int"/>
                   <xs:attributeGroup ref="A"/>
                 </xs:attributeGroup>
               </xs:schema>"#,
        );
        assert_eq!(messages(&ctx), vec!["duplicate attribute 'x'"]);
    }
}
