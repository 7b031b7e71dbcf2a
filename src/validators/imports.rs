//! `import`, `include` and `redefine`
//!
//! These components pull other schema documents into the validation. The
//! referenced document is resolved in the prevalidate pass and queued for
//! the same run; a document referenced twice is loaded once.

use super::base::{ComponentData, ComponentId};
use super::globals::DefinitionCategory;
use super::kinds::SchemaKind;
use super::segments::Segment;
use super::validation::ValidationContext;
use crate::namespaces::QName;

const IMPORT_ATTRIBUTES: &[&str] = &["id", "namespace", "schemaLocation"];
const INCLUDE_ATTRIBUTES: &[&str] = &["id", "schemaLocation"];

/// Decoded state of an `import`, `include` or `redefine`
#[derive(Debug, Clone, Default)]
pub struct SchemaLocationData {
    /// `namespace` (imports only)
    pub namespace: Option<String>,
    /// `schemaLocation`
    pub schema_location: Option<String>,
    /// Root of the referenced document, once resolved
    pub target: Option<ComponentId>,
}

pub(crate) fn prevalidate(ctx: &mut ValidationContext, id: ComponentId) {
    match ctx.tree().kind(id) {
        SchemaKind::Import => prevalidate_import(ctx, id),
        _ => prevalidate_include(ctx, id),
    }
}

fn prevalidate_import(ctx: &mut ValidationContext, id: ComponentId) {
    ctx.check_attributes(id, IMPORT_ATTRIBUTES);
    let namespace = ctx
        .attribute(id, "namespace")
        .map(|ns| ns.trim().to_string());
    let schema_location = ctx.attribute(id, "schemaLocation");
    let own_namespace = ctx.effective_namespace(id);

    let mut data = SchemaLocationData {
        namespace: namespace.clone(),
        schema_location: schema_location.clone(),
        target: None,
    };

    match (&namespace, &own_namespace) {
        (Some(ns), Some(own)) if ns == own => {
            ctx.error(
                id,
                format!("namespace '{}' is the target namespace of the importing schema", ns),
            );
        }
        (None, None) => {
            ctx.error(
                id,
                "an import without 'namespace' requires the importing schema to have a targetNamespace",
            );
        }
        _ => {}
    }

    if let Some(location) = schema_location {
        match ctx.load_referenced(id, &location, namespace.as_deref()) {
            Ok(root) => {
                let declared = declared_namespace(ctx, root);
                if declared != namespace {
                    ctx.error(
                        id,
                        format!(
                            "imported schema '{}' has targetNamespace {}, expected {}",
                            location,
                            describe(declared.as_deref()),
                            describe(namespace.as_deref())
                        ),
                    );
                }
                data.target = Some(root);
                ctx.enqueue(root);
            }
            Err(err) => {
                ctx.tree_mut().node_mut(id).data = ComponentData::SchemaLocation(data);
                ctx.fatal(id, format!("cannot load schema '{}': {}", location, err));
                return;
            }
        }
    } else if let Some(root) = ctx.schema_with_namespace(namespace.as_deref()) {
        data.target = Some(root);
        ctx.enqueue(root);
    } else {
        match ctx.load_namespace(namespace.as_deref()) {
            Ok(Some(root)) => {
                data.target = Some(root);
                ctx.enqueue(root);
            }
            Ok(None) => {}
            Err(err) => {
                ctx.tree_mut().node_mut(id).data = ComponentData::SchemaLocation(data);
                ctx.fatal(
                    id,
                    format!(
                        "cannot load a schema for namespace {}: {}",
                        describe(namespace.as_deref()),
                        err
                    ),
                );
                return;
            }
        }
    }

    ctx.tree_mut().node_mut(id).data = ComponentData::SchemaLocation(data);
}

fn prevalidate_include(ctx: &mut ValidationContext, id: ComponentId) {
    ctx.check_attributes(id, INCLUDE_ATTRIBUTES);
    let kind = ctx.tree().kind(id);
    let Some(location) = ctx.require_attribute(id, "schemaLocation") else {
        return;
    };
    let mut data = SchemaLocationData {
        namespace: None,
        schema_location: Some(location.clone()),
        target: None,
    };
    let own_namespace = ctx.effective_namespace(id);

    let root = match ctx.load_referenced(id, &location, own_namespace.as_deref()) {
        Ok(root) => root,
        Err(err) => {
            ctx.tree_mut().node_mut(id).data = ComponentData::SchemaLocation(data);
            ctx.fatal(id, format!("cannot load schema '{}': {}", location, err));
            return;
        }
    };
    data.target = Some(root);
    ctx.tree_mut().node_mut(id).data = ComponentData::SchemaLocation(data);

    match declared_namespace(ctx, root) {
        Some(declared) if Some(&declared) != own_namespace.as_ref() => {
            ctx.fatal(
                id,
                format!(
                    "{}d schema '{}' has targetNamespace '{}', expected {}",
                    kind,
                    location,
                    declared,
                    describe(own_namespace.as_deref())
                ),
            );
            return;
        }
        Some(_) => {}
        None => {
            if let Some(namespace) = own_namespace {
                assign_chameleon_namespace(ctx, id, root, namespace);
            }
        }
    }
    ctx.enqueue(root);
}

/// Give a document without targetNamespace the namespace of its includer
///
/// The first assignment of a run wins; later includes into a different
/// namespace only get a warning.
fn assign_chameleon_namespace(
    ctx: &mut ValidationContext,
    id: ComponentId,
    root: ComponentId,
    namespace: String,
) {
    let processed = ctx.is_processed(root);
    let current = ctx
        .tree()
        .node(root)
        .schema_data()
        .map(|data| {
            if processed {
                data.effective_namespace.clone()
            } else {
                data.included_namespace.clone()
            }
        })
        .unwrap_or_default();

    match current {
        Some(existing) if existing == namespace => {}
        Some(existing) => {
            let name = ctx.schema_name(root);
            ctx.warning(
                id,
                format!(
                    "schema '{}' is already included into namespace '{}'; not including it into '{}'",
                    name, existing, namespace
                ),
            );
        }
        None if processed => {
            let name = ctx.schema_name(root);
            ctx.warning(
                id,
                format!(
                    "schema '{}' was already processed without a namespace; not including it into '{}'",
                    name, namespace
                ),
            );
        }
        None => {
            if let Some(data) = ctx.tree_mut().node_mut(root).schema_data_mut() {
                data.included_namespace = Some(namespace);
            }
        }
    }
}

/// Raw `targetNamespace` of a loaded document
fn declared_namespace(ctx: &ValidationContext, root: ComponentId) -> Option<String> {
    ctx.tree()
        .node(root)
        .attribute("targetNamespace")
        .map(str::trim)
        .filter(|ns| !ns.is_empty())
        .map(str::to_string)
}

fn describe(namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) => format!("'{}'", ns),
        None => "no namespace".to_string(),
    }
}

pub(crate) fn validate(ctx: &mut ValidationContext, id: ComponentId) {
    match ctx.tree().kind(id) {
        SchemaKind::Import => validate_import(ctx, id),
        SchemaKind::Redefine => validate_redefine(ctx, id),
        _ => {}
    }
}

/// Retry an import without location against everything loaded by now
fn validate_import(ctx: &mut ValidationContext, id: ComponentId) {
    let Some(data) = ctx.tree().node(id).location_data() else {
        return;
    };
    if data.target.is_some() || data.schema_location.is_some() {
        return;
    }
    let namespace = data.namespace.clone();
    match ctx.schema_with_namespace(namespace.as_deref()) {
        Some(root) => {
            if let Some(data) = ctx.tree_mut().node_mut(id).location_data_mut() {
                data.target = Some(root);
            }
        }
        None => ctx.warning(
            id,
            format!("no schema found for imported namespace {}", describe(namespace.as_deref())),
        ),
    }
}

/// Every redefinition must replace a definition of the redefined document
fn validate_redefine(ctx: &mut ValidationContext, id: ComponentId) {
    let definitions = ctx.tree().segment_ids(id, Segment::Definitions);
    for definition in definitions {
        let kind = ctx.tree().kind(definition);
        let Some(category) = DefinitionCategory::for_kind(kind) else {
            continue;
        };
        if ctx.tree().node(definition).is_skipped() {
            continue;
        }
        let Some(name) = ctx.tree().node(definition).name().map(|n| n.trim().to_string()) else {
            continue;
        };
        let qname = QName::new(ctx.effective_namespace(definition), name);
        if ctx.resolve_reference(definition, category, &qname).is_none() {
            ctx.error(
                definition,
                format!(
                    "redefinition of {} '{}' does not match a definition of the redefined schema",
                    category, qname
                ),
            );
        }
    }
}
