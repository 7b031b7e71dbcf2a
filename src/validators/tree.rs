//! Component arena
//!
//! All components of every schema document loaded into one validation
//! context live in a single [`SchemaTree`]. Parent links are plain handles
//! and never keep anything alive; nodes are never freed, a detached node
//! simply has no parent.

use super::base::{ChildRef, ComponentId, SchemaNode};
use super::kinds::{KindMask, SchemaKind};
use super::segments::{Layout, Segment, SegmentView};
use crate::error::{Error, Result};
use crate::namespaces::{lookup_prefix, XML_NAMESPACE};

use SchemaKind as K;

const fn mask(kinds: &[SchemaKind]) -> KindMask {
    KindMask::of(kinds)
}

const ANNOTATION: (Segment, KindMask) = (Segment::Annotation, mask(&[K::Annotation]));
const ATTRIBUTES: (Segment, KindMask) = (Segment::Attributes, mask(&[K::Attribute, K::AttributeGroup]));
const ANY_ATTRIBUTE: (Segment, KindMask) = (Segment::AnyAttribute, mask(&[K::AnyAttribute]));
const SIMPLE_TYPE_DEFINITION: (Segment, KindMask) = (Segment::TypeDefinition, mask(&[K::SimpleType]));
const FACETS: (Segment, KindMask) = (Segment::Facets, KindMask::FACETS);
const MODEL_GROUPS: KindMask = mask(&[K::Group, K::All, K::Choice, K::Sequence]);

// Annotations before the first definition belong to `References`.
const SCHEMA_LAYOUT: Layout = &[
    (
        Segment::References,
        mask(&[K::Annotation, K::Import, K::Include, K::Redefine]),
    ),
    (
        Segment::Definitions,
        mask(&[
            K::Element,
            K::Attribute,
            K::ComplexType,
            K::SimpleType,
            K::Group,
            K::AttributeGroup,
            K::Notation,
            K::Annotation,
        ]),
    ),
];
const ANNOTATION_LAYOUT: Layout = &[(Segment::Items, mask(&[K::Appinfo, K::Documentation]))];
const ANNOTATED_LAYOUT: Layout = &[ANNOTATION];
const REDEFINE_LAYOUT: Layout = &[(
    Segment::Definitions,
    mask(&[K::Annotation, K::SimpleType, K::ComplexType, K::Group, K::AttributeGroup]),
)];
const ELEMENT_LAYOUT: Layout = &[
    ANNOTATION,
    (Segment::TypeDefinition, KindMask::TYPE_DEFINITIONS),
    (Segment::Identities, KindMask::IDENTITY_CONSTRAINTS),
];
const ATTRIBUTE_LAYOUT: Layout = &[ANNOTATION, SIMPLE_TYPE_DEFINITION];
const COMPLEX_TYPE_LAYOUT: Layout = &[
    ANNOTATION,
    (
        Segment::Content,
        mask(&[
            K::SimpleContent,
            K::ComplexContent,
            K::Group,
            K::All,
            K::Choice,
            K::Sequence,
        ]),
    ),
    ATTRIBUTES,
    ANY_ATTRIBUTE,
];
const CONTENT_LAYOUT: Layout = &[ANNOTATION, (Segment::Derivation, mask(&[K::Extension, K::Restriction]))];
const COMPLEX_DERIVATION_LAYOUT: Layout = &[
    ANNOTATION,
    (Segment::Content, MODEL_GROUPS),
    ATTRIBUTES,
    ANY_ATTRIBUTE,
];
const SIMPLE_EXTENSION_LAYOUT: Layout = &[ANNOTATION, ATTRIBUTES, ANY_ATTRIBUTE];
const SIMPLE_CONTENT_RESTRICTION_LAYOUT: Layout = &[
    ANNOTATION,
    SIMPLE_TYPE_DEFINITION,
    FACETS,
    ATTRIBUTES,
    ANY_ATTRIBUTE,
];
const SIMPLE_RESTRICTION_LAYOUT: Layout = &[ANNOTATION, SIMPLE_TYPE_DEFINITION, FACETS];
const SIMPLE_TYPE_LAYOUT: Layout = &[
    ANNOTATION,
    (Segment::Derivation, mask(&[K::Restriction, K::List, K::Union])),
];
const LIST_LAYOUT: Layout = &[ANNOTATION, SIMPLE_TYPE_DEFINITION];
const ALL_LAYOUT: Layout = &[ANNOTATION, (Segment::Particles, mask(&[K::Element]))];
const PARTICLE_LAYOUT: Layout = &[
    ANNOTATION,
    (
        Segment::Particles,
        mask(&[K::Element, K::Group, K::Choice, K::Sequence, K::Any]),
    ),
];
const GROUP_LAYOUT: Layout = &[ANNOTATION, (Segment::Content, KindMask::COMPOSITORS)];
const ATTRIBUTE_GROUP_LAYOUT: Layout = &[ANNOTATION, ATTRIBUTES, ANY_ATTRIBUTE];
const IDENTITY_LAYOUT: Layout = &[
    ANNOTATION,
    (Segment::Selector, mask(&[K::Selector])),
    (Segment::Fields, mask(&[K::Field])),
];
const LEAF_LAYOUT: Layout = &[];

/// Child layout of `kind`
///
/// `extension` and `restriction` take their layout from the kind of their
/// parent (`context`); without one, `extension` is laid out for
/// `complexContent` and `restriction` for `simpleType`.
pub fn layout(kind: SchemaKind, context: Option<SchemaKind>) -> Layout {
    match kind {
        K::Schema => SCHEMA_LAYOUT,
        K::Annotation => ANNOTATION_LAYOUT,
        K::Appinfo | K::Documentation => LEAF_LAYOUT,
        K::Redefine => REDEFINE_LAYOUT,
        K::Element => ELEMENT_LAYOUT,
        K::Attribute => ATTRIBUTE_LAYOUT,
        K::ComplexType => COMPLEX_TYPE_LAYOUT,
        K::SimpleContent | K::ComplexContent => CONTENT_LAYOUT,
        K::Extension => match context {
            Some(K::SimpleContent) => SIMPLE_EXTENSION_LAYOUT,
            _ => COMPLEX_DERIVATION_LAYOUT,
        },
        K::Restriction => match context {
            Some(K::SimpleContent) => SIMPLE_CONTENT_RESTRICTION_LAYOUT,
            Some(K::ComplexContent) => COMPLEX_DERIVATION_LAYOUT,
            _ => SIMPLE_RESTRICTION_LAYOUT,
        },
        K::SimpleType => SIMPLE_TYPE_LAYOUT,
        K::List | K::Union => LIST_LAYOUT,
        K::All => ALL_LAYOUT,
        K::Choice | K::Sequence => PARTICLE_LAYOUT,
        K::Group => GROUP_LAYOUT,
        K::AttributeGroup => ATTRIBUTE_GROUP_LAYOUT,
        K::Key | K::Keyref | K::Unique => IDENTITY_LAYOUT,
        _ => ANNOTATED_LAYOUT,
    }
}

/// Arena of schema components
#[derive(Debug, Default)]
pub struct SchemaTree {
    nodes: Vec<SchemaNode>,
}

impl SchemaTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of components ever created
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check whether the tree holds no component
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Create a detached component
    pub fn create(&mut self, kind: SchemaKind) -> ComponentId {
        self.push(SchemaNode::new(kind, layout(kind, None)))
    }

    /// Create a component and append it to `parent` in document order
    ///
    /// Fails with [`Error::InvalidArgument`] when `kind` may not follow the
    /// children `parent` already has.
    pub fn create_child(&mut self, parent: ComponentId, kind: SchemaKind) -> Result<ComponentId> {
        let parent_kind = self.node(parent).kind;
        let child = self.push(SchemaNode::new(kind, layout(kind, Some(parent_kind))));
        match self.nodes[parent.index()].children.append(ChildRef { id: child, kind }) {
            Some(_) => {
                self.nodes[child.index()].parent = Some(parent);
                Ok(child)
            }
            None => {
                self.nodes.pop();
                Err(Error::InvalidArgument(format!(
                    "<{}> is not allowed here in <{}>",
                    kind, parent_kind
                )))
            }
        }
    }

    fn push(&mut self, node: SchemaNode) -> ComponentId {
        let id = ComponentId::from_index(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Drop every component created after the first `len`
    ///
    /// Only for discarding a document that failed to build: nothing older
    /// may point at the dropped components.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }

    /// Component `id`
    ///
    /// # Panics
    ///
    /// Panics when `id` was not issued by this tree.
    pub fn node(&self, id: ComponentId) -> &SchemaNode {
        &self.nodes[id.index()]
    }

    /// Mutable component `id`
    ///
    /// # Panics
    ///
    /// Panics when `id` was not issued by this tree.
    pub fn node_mut(&mut self, id: ComponentId) -> &mut SchemaNode {
        &mut self.nodes[id.index()]
    }

    /// Component `id`, if it exists
    pub fn get(&self, id: ComponentId) -> Option<&SchemaNode> {
        self.nodes.get(id.index())
    }

    /// Kind of component `id`
    pub fn kind(&self, id: ComponentId) -> SchemaKind {
        self.node(id).kind
    }

    /// Parent of component `id`
    pub fn parent(&self, id: ComponentId) -> Option<ComponentId> {
        self.node(id).parent
    }

    /// All children of `id` in document order
    pub fn children(&self, id: ComponentId) -> &[ChildRef] {
        self.node(id).children.as_slice()
    }

    /// Children of `id` in `segment`
    pub fn segment(&self, id: ComponentId, segment: Segment) -> &[ChildRef] {
        self.node(id).children.segment(segment)
    }

    /// Ids of the children of `id` in `segment`
    pub fn segment_ids(&self, id: ComponentId, segment: Segment) -> Vec<ComponentId> {
        self.segment(id, segment).iter().map(|c| c.id).collect()
    }

    /// Read view of a segment of `id`
    pub fn view(&self, id: ComponentId, segment: Segment) -> Option<SegmentView<'_, ChildRef>> {
        self.node(id).children.view(segment)
    }

    /// First child of `id` with a kind in `kinds`
    pub fn first_child(&self, id: ComponentId, kinds: KindMask) -> Option<ComponentId> {
        self.children(id)
            .iter()
            .find(|c| kinds.contains(c.kind))
            .map(|c| c.id)
    }

    /// Children of `id` with a kind in `kinds`
    pub fn children_of_kind(&self, id: ComponentId, kinds: KindMask) -> Vec<ComponentId> {
        self.children(id)
            .iter()
            .filter(|c| kinds.contains(c.kind))
            .map(|c| c.id)
            .collect()
    }

    /// Insert the detached component `child` at `index` of `segment` of `parent`
    pub fn insert_child(
        &mut self,
        parent: ComponentId,
        segment: Segment,
        index: usize,
        child: ComponentId,
    ) -> Result<()> {
        self.check_attachable(parent, child)?;
        self.relayout(parent, child);
        let kind = self.kind(child);
        self.nodes[parent.index()]
            .children
            .insert(segment, index, ChildRef { id: child, kind })?;
        self.nodes[child.index()].parent = Some(parent);
        Ok(())
    }

    /// Append the detached component `child` to `segment` of `parent`
    pub fn push_child(&mut self, parent: ComponentId, segment: Segment, child: ComponentId) -> Result<()> {
        let len = self.segment(parent, segment).len();
        self.insert_child(parent, segment, len, child)
    }

    /// Detach and return child `index` of `segment` of `parent`
    pub fn remove_child(&mut self, parent: ComponentId, segment: Segment, index: usize) -> Result<ComponentId> {
        let removed = self.nodes[parent.index()].children.remove(segment, index)?;
        self.nodes[removed.id.index()].parent = None;
        Ok(removed.id)
    }

    /// Detach and return children `from..to` of `segment` of `parent`
    pub fn remove_children(
        &mut self,
        parent: ComponentId,
        segment: Segment,
        from: usize,
        to: usize,
    ) -> Result<Vec<ComponentId>> {
        let removed = self.nodes[parent.index()]
            .children
            .remove_range(segment, from, to)?;
        for child in &removed {
            self.nodes[child.id.index()].parent = None;
        }
        Ok(removed.into_iter().map(|c| c.id).collect())
    }

    /// Replace child `index` of `segment` of `parent` with the detached
    /// component `child`; returns the detached old child
    pub fn replace_child(
        &mut self,
        parent: ComponentId,
        segment: Segment,
        index: usize,
        child: ComponentId,
    ) -> Result<ComponentId> {
        self.check_attachable(parent, child)?;
        self.relayout(parent, child);
        let kind = self.kind(child);
        let old = self.nodes[parent.index()]
            .children
            .set(segment, index, ChildRef { id: child, kind })?;
        self.nodes[old.id.index()].parent = None;
        self.nodes[child.index()].parent = Some(parent);
        Ok(old.id)
    }

    fn check_attachable(&self, parent: ComponentId, child: ComponentId) -> Result<()> {
        if self.get(child).is_none() || self.get(parent).is_none() {
            return Err(Error::InvalidArgument(format!(
                "component {} or {} does not belong to this tree",
                parent, child
            )));
        }
        if self.node(child).parent.is_some() {
            return Err(Error::InvalidArgument(format!(
                "component {} is already attached",
                child
            )));
        }
        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return Err(Error::InvalidArgument(format!(
                "component {} cannot contain itself",
                child
            )));
        }
        Ok(())
    }

    /// Give an empty `extension` / `restriction` the layout of its new parent
    fn relayout(&mut self, parent: ComponentId, child: ComponentId) {
        let parent_kind = self.kind(parent);
        let node = &mut self.nodes[child.index()];
        if matches!(node.kind, K::Extension | K::Restriction) && node.children.is_empty() {
            node.children = super::segments::SegmentedList::new(layout(node.kind, Some(parent_kind)));
        }
    }

    /// Ancestors of `id`, nearest first
    pub fn ancestors(&self, id: ComponentId) -> impl Iterator<Item = ComponentId> + '_ {
        std::iter::successors(self.parent(id), move |&current| self.parent(current))
    }

    /// Root `schema` of the document holding `id`
    pub fn schema_of(&self, id: ComponentId) -> Option<ComponentId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&a| self.kind(a) == K::Schema)
    }

    /// Check whether `id` is a global declaration or definition
    ///
    /// Direct children of `schema` are global, and so are the
    /// redefinitions inside `redefine`.
    pub fn is_global(&self, id: ComponentId) -> bool {
        match self.parent(id) {
            Some(parent) => matches!(self.kind(parent), K::Schema | K::Redefine),
            None => false,
        }
    }

    /// Nearest ancestor of `id` with a kind in `kinds`
    pub fn nearest_ancestor(&self, id: ComponentId, kinds: KindMask) -> Option<ComponentId> {
        self.ancestors(id).find(|&a| kinds.contains(self.kind(a)))
    }

    /// `id` and its descendants in document order (pre-order)
    pub fn descendants(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().map(|c| c.id));
        }
        out
    }

    /// Namespace bound to `prefix` in scope at `id`
    ///
    /// `None` as prefix asks for the default namespace. The `xml` prefix
    /// is always bound.
    pub fn resolve_prefix(&self, id: ComponentId, prefix: Option<&str>) -> Option<&str> {
        for current in std::iter::once(id).chain(self.ancestors(id)) {
            if let Some(uri) = lookup_prefix(&self.node(current).namespace_declarations, prefix) {
                return Some(uri);
            }
        }
        if prefix == Some("xml") {
            Some(XML_NAMESPACE)
        } else {
            None
        }
    }

    /// Iterate every component with its id
    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, &SchemaNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (ComponentId::from_index(i), node))
    }
}
