//! `simpleType` definitions: atomic restrictions, lists and unions

use super::base::{ComponentData, ComponentId, TypeRef};
use super::builtins::BuiltinType;
use super::complex_types::{is_circular, type_label, DerivationData};
use super::facets;
use super::globals::DefinitionCategory;
use super::helpers::{DerivationSet, SIMPLE_FINAL_TOKENS};
use super::kinds::{KindMask, SchemaKind};
use super::segments::Segment;
use super::validation::ValidationContext;
use crate::namespaces::QName;
use std::collections::HashSet;

use SchemaKind as K;

const SIMPLE_TYPE_ATTRIBUTES: &[&str] = &["id", "name", "final"];
const RESTRICTION_ATTRIBUTES: &[&str] = &["id", "base"];
const LIST_ATTRIBUTES: &[&str] = &["id", "itemType"];
const UNION_ATTRIBUTES: &[&str] = &["id", "memberTypes"];

/// Facets a list type admits
pub const LIST_FACETS: KindMask = KindMask::of(&[
    K::Length,
    K::MinLength,
    K::MaxLength,
    K::Pattern,
    K::Enumeration,
    K::WhiteSpace,
]);

/// Facets a union type admits
pub const UNION_FACETS: KindMask = KindMask::of(&[K::Pattern, K::Enumeration]);

/// Variety of a simple type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variety {
    /// Restriction of an atomic type
    Atomic,
    /// Whitespace-separated list of items
    List,
    /// Union of member types
    Union,
}

/// Decoded and resolved state of a `simpleType`
#[derive(Debug, Clone, Default)]
pub struct SimpleTypeData {
    /// Qualified name of a global definition
    pub qname: Option<QName>,
    /// `final`, or the schema `finalDefault`
    pub final_: DerivationSet,
    /// Variety, from the derivation child
    pub variety: Option<Variety>,
    /// Base type of a restriction
    pub base_type: Option<TypeRef>,
}

/// Decoded and resolved state of a `list`
#[derive(Debug, Clone, Default)]
pub struct ListData {
    /// `itemType`
    pub item_type_name: Option<QName>,
    /// Resolved item type
    pub item_type: Option<TypeRef>,
}

/// Decoded and resolved state of a `union`
#[derive(Debug, Clone, Default)]
pub struct UnionData {
    /// `memberTypes`
    pub member_type_names: Vec<QName>,
    /// Resolved member types, named ones first, then the inline ones
    pub member_types: Vec<TypeRef>,
}

pub(crate) fn prevalidate(ctx: &mut ValidationContext, id: ComponentId) {
    ctx.check_attributes(id, SIMPLE_TYPE_ATTRIBUTES);
    let mut data = SimpleTypeData::default();

    if ctx.tree().is_global(id) {
        if ctx.require_attribute(id, "name").is_some() {
            if let Some(name) = ctx.decode_name(id) {
                let qname = QName::new(ctx.effective_namespace(id), name);
                ctx.register_global(id, DefinitionCategory::Type, qname.clone());
                data.qname = Some(qname);
            }
        }
    } else {
        ctx.forbid_attributes(id, &["name", "final"], "in an anonymous type definition");
    }

    let final_default = ctx
        .schema_data(id)
        .map(|schema| schema.final_default)
        .unwrap_or_default();
    data.final_ = ctx
        .decode_derivation_set(id, "final", SIMPLE_FINAL_TOKENS)
        .unwrap_or(DerivationSet {
            extension: false,
            ..final_default
        });

    let derivations = ctx.tree().segment(id, Segment::Derivation);
    data.variety = derivations.first().map(|child| match child.kind {
        K::List => Variety::List,
        K::Union => Variety::Union,
        _ => Variety::Atomic,
    });
    match derivations.len() {
        0 => ctx.error(id, "<simpleType> requires a <restriction>, <list> or <union> child"),
        1 => {}
        _ => ctx.error(
            id,
            "<simpleType> can have only one <restriction>, <list> or <union> child",
        ),
    }
    ctx.tree_mut().node_mut(id).data = ComponentData::SimpleType(data);
}

pub(crate) fn prevalidate_restriction(ctx: &mut ValidationContext, id: ComponentId) {
    ctx.check_attributes(id, RESTRICTION_ATTRIBUTES);
    let kind = ctx.tree().kind(id);
    let parent = ctx.tree().parent(id).map(|p| ctx.tree().kind(p));
    let mut data = DerivationData::new(kind, parent);

    let has_inline = !ctx.tree().segment(id, Segment::TypeDefinition).is_empty();
    data.base_name = ctx.decode_qname(id, "base");
    match (ctx.tree().node(id).has_attribute("base"), has_inline) {
        (true, true) => ctx.error(
            id,
            "'base' attribute and inline simpleType are mutually exclusive",
        ),
        (false, false) => ctx.error(
            id,
            "a simple type restriction requires a 'base' attribute or an inline simpleType",
        ),
        _ => {}
    }
    ctx.tree_mut().node_mut(id).data = ComponentData::Derivation(data);
}

pub(crate) fn validate_restriction(ctx: &mut ValidationContext, id: ComponentId) {
    let Some(data) = ctx.tree().node(id).derivation_data() else {
        return;
    };
    let base = match data.base_name.clone() {
        Some(name) => {
            let Some(base) = ctx.resolve_type(id, &name) else {
                ctx.fatal(id, format!("undefined base type '{}'", name));
                return;
            };
            if !is_simple(ctx, base) {
                ctx.error(
                    id,
                    format!(
                        "base type '{}' of a simple type restriction must be a simple type",
                        type_label(base, &name)
                    ),
                );
            } else if let Some(final_) = final_of(ctx, base) {
                if final_.restriction {
                    ctx.error(id, format!("type '{}' does not allow derivation by restriction", name));
                }
            }
            base
        }
        None => match ctx.tree().segment(id, Segment::TypeDefinition).first() {
            Some(inline) => TypeRef::Defined(inline.id),
            None => return,
        },
    };

    let owner = ctx
        .tree()
        .parent(id)
        .filter(|&owner| ctx.tree().kind(owner) == K::SimpleType);
    if let Some(owner) = owner {
        if is_circular(ctx, owner) {
            let name = ctx.tree().node(owner).name().unwrap_or_default().to_string();
            ctx.error(id, format!("circular definition of type '{}'", name));
        }
    }

    let admitted = admitted_facets(ctx, base);
    facets::validate_facet_set(ctx, id, admitted);

    if let Some(data) = ctx.tree_mut().node_mut(id).derivation_data_mut() {
        data.base_type = Some(base);
    }
    if let Some(owner) = owner {
        if let Some(data) = ctx.tree_mut().node_mut(owner).simple_type_data_mut() {
            data.base_type = Some(base);
        }
    }
}

pub(crate) fn prevalidate_list(ctx: &mut ValidationContext, id: ComponentId) {
    ctx.check_attributes(id, LIST_ATTRIBUTES);
    let inline = ctx.tree().segment(id, Segment::TypeDefinition).len();
    let has_item_type = ctx.tree().node(id).has_attribute("itemType");
    let item_type_name = ctx.decode_qname(id, "itemType");
    match (has_item_type, inline) {
        (true, 0) | (false, 1) => {}
        (true, _) => ctx.error(
            id,
            "'itemType' attribute and inline simpleType are mutually exclusive",
        ),
        (false, 0) => ctx.error(id, "a list requires an 'itemType' attribute or an inline simpleType"),
        (false, _) => ctx.error(id, "a list can have only one inline simpleType"),
    }
    ctx.tree_mut().node_mut(id).data = ComponentData::List(ListData {
        item_type_name,
        item_type: None,
    });
}

pub(crate) fn validate_list(ctx: &mut ValidationContext, id: ComponentId) {
    let Some(data) = ctx.tree().node(id).list_data() else {
        return;
    };
    let item_type = match data.item_type_name.clone() {
        Some(name) => {
            let Some(item_type) = ctx.resolve_type(id, &name) else {
                ctx.fatal(id, format!("undefined item type '{}'", name));
                return;
            };
            let label = type_label(item_type, &name);
            if !is_simple(ctx, item_type) {
                ctx.error(id, format!("item type '{}' of a list must be a simple type", label));
            } else if variety_of(ctx, item_type) == Some(Variety::List) {
                ctx.error(id, format!("item type '{}' of a list cannot be a list", label));
            }
            item_type
        }
        None => match ctx.tree().segment(id, Segment::TypeDefinition).first() {
            Some(inline) => TypeRef::Defined(inline.id),
            None => return,
        },
    };
    if let Some(data) = ctx.tree_mut().node_mut(id).list_data_mut() {
        data.item_type = Some(item_type);
    }
}

pub(crate) fn prevalidate_union(ctx: &mut ValidationContext, id: ComponentId) {
    ctx.check_attributes(id, UNION_ATTRIBUTES);
    let mut member_type_names = Vec::new();
    let value = ctx.attribute(id, "memberTypes");
    for token in value.as_deref().unwrap_or_default().split_whitespace() {
        match ctx.resolve_qname(id, token) {
            Ok(qname) => member_type_names.push(qname),
            Err(message) => ctx.error(id, format!("attribute 'memberTypes': {}", message)),
        }
    }
    let has_inline = !ctx.tree().segment(id, Segment::TypeDefinition).is_empty();
    if value.as_deref().map_or(true, |v| v.trim().is_empty()) && !has_inline {
        ctx.error(
            id,
            "a union requires a 'memberTypes' attribute or inline member types",
        );
    }
    ctx.tree_mut().node_mut(id).data = ComponentData::Union(UnionData {
        member_type_names,
        member_types: Vec::new(),
    });
}

pub(crate) fn validate_union(ctx: &mut ValidationContext, id: ComponentId) {
    let Some(data) = ctx.tree().node(id).union_data() else {
        return;
    };
    let names = data.member_type_names.clone();
    let mut member_types = Vec::with_capacity(names.len());
    for name in names {
        let Some(member) = ctx.resolve_type(id, &name) else {
            ctx.fatal(id, format!("undefined member type '{}'", name));
            return;
        };
        if !is_simple(ctx, member) {
            ctx.error(
                id,
                format!(
                    "member type '{}' of a union must be a simple type",
                    type_label(member, &name)
                ),
            );
        }
        member_types.push(member);
    }
    member_types.extend(
        ctx.tree()
            .segment(id, Segment::TypeDefinition)
            .iter()
            .map(|inline| TypeRef::Defined(inline.id)),
    );
    if let Some(data) = ctx.tree_mut().node_mut(id).union_data_mut() {
        data.member_types = member_types;
    }
}

fn is_simple(ctx: &ValidationContext, type_ref: TypeRef) -> bool {
    match type_ref {
        TypeRef::Builtin(builtin) => builtin.is_simple(),
        TypeRef::Defined(id) => ctx.tree().kind(id) == K::SimpleType,
    }
}

fn variety_of(ctx: &ValidationContext, type_ref: TypeRef) -> Option<Variety> {
    match type_ref {
        TypeRef::Builtin(_) => Some(Variety::Atomic),
        TypeRef::Defined(id) => ctx.tree().node(id).simple_type_data()?.variety,
    }
}

fn final_of(ctx: &ValidationContext, type_ref: TypeRef) -> Option<DerivationSet> {
    let id = type_ref.component()?;
    ctx.tree().node(id).simple_type_data().map(|data| data.final_)
}

/// Base of a restriction, from its `base` attribute or inline type
fn restriction_base(ctx: &ValidationContext, restriction: ComponentId) -> Option<TypeRef> {
    if let Some(base) = ctx
        .tree()
        .node(restriction)
        .derivation_data()
        .and_then(|data| data.base_type)
    {
        return Some(base);
    }
    match ctx.tree().node(restriction).attribute("base") {
        Some(value) => {
            let name = ctx.resolve_qname(restriction, value).ok()?;
            ctx.resolve_type(restriction, &name)
        }
        None => ctx
            .tree()
            .segment(restriction, Segment::TypeDefinition)
            .first()
            .map(|inline| TypeRef::Defined(inline.id)),
    }
}

/// Built-in type a simple type (or simple content) eventually restricts
///
/// `None` for lists, unions, and chains that do not resolve.
pub fn primitive_type(ctx: &ValidationContext, type_ref: TypeRef) -> Option<&'static BuiltinType> {
    let mut seen = HashSet::new();
    let mut current = type_ref;
    loop {
        let id = match current {
            TypeRef::Builtin(builtin) => return Some(builtin),
            TypeRef::Defined(id) => id,
        };
        if !seen.insert(id) {
            return None;
        }
        let tree = ctx.tree();
        let restriction = match tree.kind(id) {
            K::SimpleType => tree.first_child(id, KindMask::of(&[K::Restriction, K::List, K::Union]))?,
            K::ComplexType => {
                let content = tree.first_child(id, K::SimpleContent.into())?;
                tree.first_child(content, KindMask::of(&[K::Extension, K::Restriction]))?
            }
            _ => return None,
        };
        if !matches!(tree.kind(restriction), K::Restriction | K::Extension) {
            return None;
        }
        current = restriction_base(ctx, restriction)?;
    }
}

/// Facet kinds a restriction of `base` may use
///
/// `None` when the base does not resolve to a known simple type; the
/// caller then only checks the facets against each other.
pub fn admitted_facets(ctx: &ValidationContext, base: TypeRef) -> Option<KindMask> {
    let mut seen = HashSet::new();
    let mut current = base;
    loop {
        let id = match current {
            TypeRef::Builtin(builtin) if builtin.is_simple() => return Some(builtin.admitted_facets()),
            TypeRef::Builtin(_) => return None,
            TypeRef::Defined(id) => id,
        };
        if !seen.insert(id) {
            return None;
        }
        let tree = ctx.tree();
        let derivation = match tree.kind(id) {
            K::SimpleType => {
                let child = tree.first_child(id, KindMask::of(&[K::Restriction, K::List, K::Union]))?;
                match tree.kind(child) {
                    K::List => return Some(LIST_FACETS),
                    K::Union => return Some(UNION_FACETS),
                    _ => child,
                }
            }
            K::ComplexType => {
                let content = tree.first_child(id, K::SimpleContent.into())?;
                tree.first_child(content, KindMask::of(&[K::Extension, K::Restriction]))?
            }
            _ => return None,
        };
        current = restriction_base(ctx, derivation)?;
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
        let root = ctx.add_schema_str("st.xsd", source).unwrap();
        ctx.validate();
        (ctx, root)
    }

    fn messages(ctx: &ValidationContext) -> Vec<&str> {
        ctx.diagnostics().iter().map(|d| d.message.as_str()).collect()
    }

    #[test]
    fn test_varieties() {
        let (ctx, root) = run(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:simpleType name="Code">
                   <xs:restriction base="xs:token"><xs:maxLength value="8"/></xs:restriction>
                 </xs:simpleType>
                 <xs:simpleType name="Codes"><xs:list itemType="Code"/></xs:simpleType>
                 <xs:simpleType name="CodeOrInt">
                   <xs:union memberTypes="Code xs:int">
                     <xs:simpleType><xs:restriction base="xs:date"/></xs:simpleType>
                   </xs:union>
                 </xs:simpleType>
               </xs:schema>"#,
        );
        assert!(ctx.diagnostics().is_empty(), "{:?}", ctx.diagnostics());
        let ids: Vec<ComponentId> = ctx.tree().children(root).iter().map(|c| c.id).collect();
        let variety = |id| ctx.tree().node(id).simple_type_data().unwrap().variety;
        assert_eq!(variety(ids[0]), Some(Variety::Atomic));
        assert_eq!(variety(ids[1]), Some(Variety::List));
        assert_eq!(variety(ids[2]), Some(Variety::Union));

        let code = TypeRef::Defined(ids[0]);
        assert_eq!(primitive_type(&ctx, code).map(|b| b.name), Some("token"));
        assert_eq!(admitted_facets(&ctx, TypeRef::Defined(ids[1])), Some(LIST_FACETS));

        let list = ctx.tree().children(ids[1])[0].id;
        assert_eq!(ctx.tree().node(list).list_data().unwrap().item_type, Some(code));
        let union = ctx.tree().children(ids[2])[0].id;
        assert_eq!(ctx.tree().node(union).union_data().unwrap().member_types.len(), 3);
    }

    #[test]
    fn test_structure_rules() {
        let (ctx, _) = run(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:simpleType name="None"/>
                 <xs:simpleType name="Both">
                   <xs:restriction base="xs:string">
                     <xs:simpleType><xs:restriction base="xs:string"/></xs:simpleType>
                   </xs:restriction>
                 </xs:simpleType>
                 <xs:simpleType name="L"><xs:list/></xs:simpleType>
                 <xs:simpleType name="U"><xs:union/></xs:simpleType>
               </xs:schema>"#,
        );
        assert_eq!(
            messages(&ctx),
            vec![
                "<simpleType> requires a <restriction>, <list> or <union> child",
                "'base' attribute and inline simpleType are mutually exclusive",
                "a list requires an 'itemType' attribute or an inline simpleType",
                "a union requires a 'memberTypes' attribute or inline member types",
            ]
        );
    }

    #[test]
    fn test_reference_rules() {
        let (ctx, _) = run(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:complexType name="C"/>
                 <xs:simpleType name="Sealed" final="restriction">
                   <xs:restriction base="xs:int"/>
                 </xs:simpleType>
                 <xs:simpleType name="A"><xs:restriction base="C"/></xs:simpleType>
                 <xs:simpleType name="B"><xs:restriction base="Sealed"/></xs:simpleType>
                 <xs:simpleType name="L1"><xs:list itemType="xs:int"/></xs:simpleType>
                 <xs:simpleType name="L2"><xs:list itemType="L1"/></xs:simpleType>
                 <xs:simpleType name="U"><xs:union memberTypes="xs:int Missing"/></xs:simpleType>
               </xs:schema>"#,
        );
        assert_eq!(
            messages(&ctx),
            vec![
                "base type 'C' of a simple type restriction must be a simple type",
                "type 'Sealed' does not allow derivation by restriction",
                "item type 'L1' of a list cannot be a list",
                "undefined member type 'Missing'",
            ]
        );
        assert_eq!(ctx.diagnostics().count(Severity::Fatal), 1);
    }

    #[test]
    fn test_circular_restriction() {
        let (ctx, _) = run(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:simpleType name="A"><xs:restriction base="B"/></xs:simpleType>
                 <xs:simpleType name="B"><xs:restriction base="A"/></xs:simpleType>
               </xs:schema>"#,
        );
        assert_eq!(
            messages(&ctx),
            vec![
                "circular definition of type 'A'",
                "circular definition of type 'B'",
            ]
        );
    }
}
