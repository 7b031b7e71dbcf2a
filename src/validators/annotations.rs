//! `annotation`, `appinfo` and `documentation`
//!
//! Annotations carry no semantics; only their attributes are checked. The
//! character content of `appinfo` and `documentation` is kept on the node.

use super::base::ComponentId;
use super::kinds::{KindMask, SchemaKind};
use super::segments::Segment;
use super::tree::SchemaTree;
use super::validation::ValidationContext;

const ANNOTATION_ATTRIBUTES: &[&str] = &["id"];
const APPINFO_ATTRIBUTES: &[&str] = &["source"];

pub(crate) fn prevalidate(ctx: &mut ValidationContext, id: ComponentId) {
    let legal = match ctx.tree().kind(id) {
        SchemaKind::Annotation => ANNOTATION_ATTRIBUTES,
        _ => APPINFO_ATTRIBUTES,
    };
    ctx.check_attributes(id, legal);
}

/// Text of the `documentation` items annotating `id`
pub fn documentation(tree: &SchemaTree, id: ComponentId) -> Vec<&str> {
    annotation_items(tree, id, SchemaKind::Documentation)
}

/// Text of the `appinfo` items annotating `id`
pub fn appinfo(tree: &SchemaTree, id: ComponentId) -> Vec<&str> {
    annotation_items(tree, id, SchemaKind::Appinfo)
}

fn annotation_items(tree: &SchemaTree, id: ComponentId, kind: SchemaKind) -> Vec<&str> {
    let annotations = if tree.kind(id) == SchemaKind::Annotation {
        vec![id]
    } else if tree.node(id).children.has_segment(Segment::Annotation) {
        tree.segment_ids(id, Segment::Annotation)
    } else {
        tree.children_of_kind(id, SchemaKind::Annotation.into())
    };
    annotations
        .into_iter()
        .flat_map(|annotation| tree.children_of_kind(annotation, KindMask::from(kind)))
        .filter_map(|item| tree.node(item).text.as_deref())
        .collect()
}
