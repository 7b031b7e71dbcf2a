//! Model groups: the `all` / `choice` / `sequence` compositors and `group`

use super::base::{ComponentData, ComponentId};
use super::globals::DefinitionCategory;
use super::kinds::SchemaKind;
use super::particles::Occurs;
use super::segments::Segment;
use super::validation::ValidationContext;
use crate::namespaces::QName;
use std::collections::HashSet;

use SchemaKind as K;

const COMPOSITOR_ATTRIBUTES: &[&str] = &["id", "minOccurs", "maxOccurs"];
const GROUP_ATTRIBUTES: &[&str] = &["id", "name", "ref", "minOccurs", "maxOccurs"];

/// Decoded state of `all` / `choice` / `sequence`
#[derive(Debug, Clone, Default)]
pub struct CompositorData {
    /// Occurrence bounds
    pub occurs: Occurs,
}

/// Decoded and resolved state of a `group`
#[derive(Debug, Clone, Default)]
pub struct GroupData {
    /// Qualified name of a definition
    pub qname: Option<QName>,
    /// `ref`
    pub reference_name: Option<QName>,
    /// Occurrence bounds of a reference
    pub occurs: Occurs,
    /// Referenced definition
    pub reference: Option<ComponentId>,
}

impl GroupData {
    /// Check whether this is a reference to a group definition
    pub fn is_reference(&self) -> bool {
        self.reference_name.is_some()
    }
}

pub(crate) fn prevalidate_compositor(ctx: &mut ValidationContext, id: ComponentId) {
    ctx.check_attributes(id, COMPOSITOR_ATTRIBUTES);
    let kind = ctx.tree().kind(id);
    let in_definition = ctx
        .tree()
        .parent(id)
        .is_some_and(|parent| ctx.tree().kind(parent) == K::Group && ctx.tree().is_global(parent));

    let occurs = if in_definition {
        ctx.forbid_attributes(
            id,
            &["minOccurs", "maxOccurs"],
            "in the model group of a group definition",
        );
        Occurs::once()
    } else {
        ctx.decode_occurs(id)
    };
    if kind == K::All && (occurs.max != Some(1) || occurs.min > 1) {
        ctx.error(
            id,
            format!("<all> must have minOccurs 0 or 1 and maxOccurs 1, found {}", occurs),
        );
    }
    ctx.tree_mut().node_mut(id).data = ComponentData::Compositor(CompositorData { occurs });
}

pub(crate) fn prevalidate(ctx: &mut ValidationContext, id: ComponentId) {
    ctx.check_attributes(id, GROUP_ATTRIBUTES);
    let mut data = GroupData::default();
    let model_groups = ctx.tree().segment(id, Segment::Content).len();

    if ctx.tree().is_global(id) {
        ctx.forbid_attributes(id, &["ref", "minOccurs", "maxOccurs"], "in a group definition");
        match model_groups {
            0 => ctx.error(id, "a group definition requires an <all>, <choice> or <sequence> child"),
            1 => {}
            _ => ctx.error(id, "a group definition can have only one model group"),
        }
        if ctx.require_attribute(id, "name").is_some() {
            if let Some(name) = ctx.decode_name(id) {
                let qname = QName::new(ctx.effective_namespace(id), name);
                ctx.register_global(id, DefinitionCategory::Group, qname.clone());
                data.qname = Some(qname);
            }
        }
    } else {
        ctx.forbid_attributes(id, &["name"], "in a group reference");
        if ctx.require_attribute(id, "ref").is_some() {
            data.reference_name = ctx.decode_qname(id, "ref");
        }
        if model_groups > 0 {
            ctx.error(id, "a group reference can only contain an annotation");
        }
        data.occurs = ctx.decode_occurs(id);
    }
    ctx.tree_mut().node_mut(id).data = ComponentData::Group(data);
}

pub(crate) fn validate(ctx: &mut ValidationContext, id: ComponentId) {
    let Some(data) = ctx.tree().node(id).group_data() else {
        return;
    };
    if let Some(qname) = data.qname.clone() {
        if reaches(ctx, id, id, &mut HashSet::new()) {
            ctx.error(id, format!("circular definition of group '{}'", qname));
        }
        return;
    }
    let Some(name) = data.reference_name.clone() else {
        return;
    };
    match ctx.resolve_reference(id, DefinitionCategory::Group, &name) {
        Some(target) => {
            if let Some(data) = ctx.tree_mut().node_mut(id).group_data_mut() {
                data.reference = Some(target);
            }
        }
        None => ctx.fatal(id, format!("undefined group '{}'", name)),
    }
}

/// Definition a group reference points to
fn referenced_group(ctx: &ValidationContext, reference: ComponentId) -> Option<ComponentId> {
    let data = ctx.tree().node(reference).group_data()?;
    data.reference.or_else(|| {
        data.reference_name
            .as_ref()
            .and_then(|name| ctx.resolve_reference(reference, DefinitionCategory::Group, name))
    })
}

/// Check whether `target` is reachable through the group references
/// inside the definition `from`
fn reaches(
    ctx: &ValidationContext,
    from: ComponentId,
    target: ComponentId,
    visited: &mut HashSet<ComponentId>,
) -> bool {
    let references = ctx
        .tree()
        .descendants(from)
        .into_iter()
        .filter(|&d| d != from && ctx.tree().kind(d) == K::Group);
    for reference in references {
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

/// Occurrence bounds of a particle: element, wildcard, compositor or group
pub fn particle_occurs(ctx: &ValidationContext, id: ComponentId) -> Option<Occurs> {
    let node = ctx.tree().node(id);
    match node.kind {
        K::Element => node.element_data().map(|data| data.occurs),
        K::Any => node.wildcard_data().map(|data| data.occurs),
        K::Group => node.group_data().map(|data| data.occurs),
        kind if kind.is_compositor() => node.compositor_data().map(|data| data.occurs),
        _ => None,
    }
}
