//! Filtered segment views over one child list
//!
//! The children of a schema component are stored once, in document order.
//! XSD content models never interleave children of different roles (the
//! annotation comes first, attributes follow the content model, the
//! `anyAttribute` comes last), so the list splits into contiguous runs, one
//! per role. A [`SegmentedList`] keeps the backing list together with a
//! fixed chain of `(Segment, KindMask)` pairs; each segment is a view on
//! the run of items that follows the previous segment and matches its mask.
//!
//! Two neighbouring segments may accept the same kind (a `schema` takes
//! annotations both among its imports and among its definitions). Where
//! they meet, such an item belongs to the earlier segment: an annotation
//! inserted at index 0 of `Definitions` becomes the last item of
//! `References`, and concatenating the segments still gives the backing
//! list.
//!
//! Segment boundaries are cached and stamped with the backing list's
//! generation. Any mutation bumps the generation, and a stale segment
//! resynchronizes on the next read by first resynchronizing the segment
//! before it and then scanning forward while items match.

use super::kinds::{KindMask, SchemaKind};
use crate::error::{Error, Result};
use std::cell::Cell;
use std::fmt;

/// Role of a run of children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Leading `annotation`
    Annotation,
    /// `import` / `include` / `redefine` (and annotations) at the top of a schema
    References,
    /// Global definitions
    Definitions,
    /// Inline `simpleType` / `complexType`
    TypeDefinition,
    /// `key` / `keyref` / `unique`
    Identities,
    /// Content model or content-type child
    Content,
    /// `attribute` / `attributeGroup`
    Attributes,
    /// Trailing `anyAttribute`
    AnyAttribute,
    /// `extension` / `restriction` / `list` / `union`
    Derivation,
    /// Constraining facets
    Facets,
    /// Particles of a compositor
    Particles,
    /// `appinfo` / `documentation`
    Items,
    /// `selector` of an identity constraint
    Selector,
    /// `field`s of an identity constraint
    Fields,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Ordered `(segment, accepted kinds)` chain of one component kind
pub type Layout = &'static [(Segment, KindMask)];

/// Items that carry a schema kind
pub trait Tagged {
    /// Kind used for segment membership
    fn kind(&self) -> SchemaKind;
}

impl Tagged for SchemaKind {
    fn kind(&self) -> SchemaKind {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bounds {
    start: usize,
    len: usize,
    stamp: Option<u64>,
}

#[derive(Debug, Clone)]
struct SegmentState {
    segment: Segment,
    mask: KindMask,
    bounds: Cell<Bounds>,
    modifications: u64,
}

/// One backing list partitioned into chained segments
#[derive(Debug, Clone)]
pub struct SegmentedList<T> {
    items: Vec<T>,
    generation: u64,
    segments: Vec<SegmentState>,
}

impl<T: Tagged> SegmentedList<T> {
    /// Create an empty list with the given chain
    pub fn new(layout: Layout) -> Self {
        Self {
            items: Vec::new(),
            generation: 0,
            segments: layout
                .iter()
                .map(|&(segment, mask)| SegmentState {
                    segment,
                    mask,
                    bounds: Cell::new(Bounds {
                        start: 0,
                        len: 0,
                        stamp: None,
                    }),
                    modifications: 0,
                })
                .collect(),
        }
    }

    /// Segments in chain order
    pub fn segments(&self) -> impl Iterator<Item = (Segment, KindMask)> + '_ {
        self.segments.iter().map(|s| (s.segment, s.mask))
    }

    /// Check whether the chain has `segment`
    pub fn has_segment(&self, segment: Segment) -> bool {
        self.position(segment).is_some()
    }

    /// Union of every segment mask
    pub fn accepted(&self) -> KindMask {
        self.segments
            .iter()
            .fold(KindMask::EMPTY, |acc, s| acc.union(s.mask))
    }

    /// Whole backing list in document order
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Iterate the whole backing list
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Number of items in the backing list
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check whether the backing list is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Generation of the backing list; bumped by every mutation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of mutations made through `segment`
    pub fn modifications(&self, segment: Segment) -> u64 {
        self.position(segment)
            .map(|i| self.segments[i].modifications)
            .unwrap_or(0)
    }

    /// Read view of `segment`
    pub fn view(&self, segment: Segment) -> Option<SegmentView<'_, T>> {
        self.position(segment).map(|index| SegmentView { list: self, index })
    }

    /// Items of `segment` (empty when the chain has no such segment)
    pub fn segment(&self, segment: Segment) -> &[T] {
        match self.position(segment) {
            Some(index) => {
                let bounds = self.sync(index);
                &self.items[bounds.start..bounds.start + bounds.len]
            }
            None => &[],
        }
    }

    /// Segment holding the backing item at `position`
    pub fn segment_of(&self, position: usize) -> Option<Segment> {
        (0..self.segments.len()).find_map(|i| {
            let bounds = self.sync(i);
            (position >= bounds.start && position < bounds.start + bounds.len)
                .then(|| self.segments[i].segment)
        })
    }

    /// Insert `item` at index `index` of `segment`
    pub fn insert(&mut self, segment: Segment, index: usize, item: T) -> Result<()> {
        let seg = self.require(segment)?;
        self.check_kind(seg, &item)?;
        let bounds = self.sync(seg);
        if index > bounds.len {
            return Err(Error::IndexOutOfBounds {
                index,
                len: bounds.len,
            });
        }
        let owner = if index == 0 {
            self.boundary_owner(seg, item.kind())
        } else {
            seg
        };
        self.items.insert(bounds.start + index, item);
        self.touch(owner);
        Ok(())
    }

    /// Append `item` to `segment`
    pub fn push(&mut self, segment: Segment, item: T) -> Result<()> {
        let len = self.segment(segment).len();
        self.insert(segment, len, item)
    }

    /// Remove and return item `index` of `segment`
    pub fn remove(&mut self, segment: Segment, index: usize) -> Result<T> {
        let seg = self.require(segment)?;
        let bounds = self.sync(seg);
        if index >= bounds.len {
            return Err(Error::IndexOutOfBounds {
                index,
                len: bounds.len,
            });
        }
        let item = self.items.remove(bounds.start + index);
        self.touch(seg);
        Ok(item)
    }

    /// Remove items `from..to` of `segment`
    pub fn remove_range(&mut self, segment: Segment, from: usize, to: usize) -> Result<Vec<T>> {
        let seg = self.require(segment)?;
        let bounds = self.sync(seg);
        if to > bounds.len {
            return Err(Error::IndexOutOfBounds {
                index: to,
                len: bounds.len,
            });
        }
        if from > to {
            return Err(Error::InvalidArgument(format!(
                "range start {} is past range end {}",
                from, to
            )));
        }
        let removed: Vec<T> = self
            .items
            .drain(bounds.start + from..bounds.start + to)
            .collect();
        if !removed.is_empty() {
            self.touch(seg);
        }
        Ok(removed)
    }

    /// Replace item `index` of `segment`, returning the old item
    pub fn set(&mut self, segment: Segment, index: usize, item: T) -> Result<T> {
        let seg = self.require(segment)?;
        self.check_kind(seg, &item)?;
        let bounds = self.sync(seg);
        if index >= bounds.len {
            return Err(Error::IndexOutOfBounds {
                index,
                len: bounds.len,
            });
        }
        let old = std::mem::replace(&mut self.items[bounds.start + index], item);
        self.touch(seg);
        Ok(old)
    }

    /// Append `item` in document order
    ///
    /// The item goes to the earliest segment, not before the segment of
    /// the current last item, whose mask accepts it. Returns the segment
    /// used, or `None` when no such segment exists (the item is then not
    /// added).
    pub fn append(&mut self, item: T) -> Option<Segment> {
        let current = if self.items.is_empty() {
            0
        } else {
            let last = self.items.len() - 1;
            (0..self.segments.len())
                .find(|&i| {
                    let bounds = self.sync(i);
                    last >= bounds.start && last < bounds.start + bounds.len
                })
                .unwrap_or(self.segments.len())
        };
        let kind = item.kind();
        let seg = (current..self.segments.len()).find(|&i| self.segments[i].mask.contains(kind))?;
        self.items.push(item);
        self.touch(seg);
        Some(self.segments[seg].segment)
    }

    /// Remove every item
    pub fn clear(&mut self) {
        if !self.items.is_empty() {
            self.items.clear();
            self.generation += 1;
        }
    }

    fn position(&self, segment: Segment) -> Option<usize> {
        self.segments.iter().position(|s| s.segment == segment)
    }

    fn require(&self, segment: Segment) -> Result<usize> {
        self.position(segment).ok_or_else(|| {
            Error::InvalidArgument(format!("component has no {} segment", segment))
        })
    }

    fn check_kind(&self, seg: usize, item: &T) -> Result<()> {
        let state = &self.segments[seg];
        if state.mask.contains(item.kind()) {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!(
                "{} not allowed in {} segment (accepts {})",
                item.kind(),
                state.segment,
                state.mask
            )))
        }
    }

    /// Segment that owns a `kind` item placed at the start of segment `seg`
    ///
    /// Walking back over the segments that end at that position, the
    /// earliest one whose mask accepts the kind takes the item on resync.
    fn boundary_owner(&self, seg: usize, kind: SchemaKind) -> usize {
        let mut owner = seg;
        for i in (0..seg).rev() {
            if self.segments[i].mask.contains(kind) {
                owner = i;
            }
            if self.sync(i).len > 0 {
                break;
            }
        }
        owner
    }

    fn touch(&mut self, seg: usize) {
        self.generation += 1;
        self.segments[seg].modifications += 1;
    }

    /// Bring the cached bounds of segment `index` up to date
    fn sync(&self, index: usize) -> Bounds {
        let state = &self.segments[index];
        let cached = state.bounds.get();
        if cached.stamp == Some(self.generation) {
            return cached;
        }
        let start = if index == 0 {
            0
        } else {
            let prior = self.sync(index - 1);
            prior.start + prior.len
        };
        let len = self.items[start..]
            .iter()
            .take_while(|item| state.mask.contains(item.kind()))
            .count();
        let bounds = Bounds {
            start,
            len,
            stamp: Some(self.generation),
        };
        state.bounds.set(bounds);
        bounds
    }
}

/// Read view of one segment
#[derive(Debug, Clone, Copy)]
pub struct SegmentView<'a, T> {
    list: &'a SegmentedList<T>,
    index: usize,
}

impl<'a, T: Tagged> SegmentView<'a, T> {
    /// Segment this view covers
    pub fn segment(&self) -> Segment {
        self.list.segments[self.index].segment
    }

    /// Kinds accepted by this segment
    pub fn mask(&self) -> KindMask {
        self.list.segments[self.index].mask
    }

    /// Offset of the segment in the backing list
    pub fn start(&self) -> usize {
        self.list.sync(self.index).start
    }

    /// Number of items in the segment
    pub fn len(&self) -> usize {
        self.list.sync(self.index).len
    }

    /// Check whether the segment is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item `index` of the segment
    pub fn get(&self, index: usize) -> Option<&'a T> {
        self.as_slice().get(index)
    }

    /// Items of the segment
    pub fn as_slice(&self) -> &'a [T] {
        let bounds = self.list.sync(self.index);
        &self.list.items[bounds.start..bounds.start + bounds.len]
    }

    /// Iterate the segment
    pub fn iter(&self) -> std::slice::Iter<'a, T> {
        self.as_slice().iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LAYOUT: Layout = &[
        (Segment::Annotation, KindMask::of(&[SchemaKind::Annotation])),
        (
            Segment::Content,
            KindMask::of(&[SchemaKind::Sequence, SchemaKind::Choice]),
        ),
        (
            Segment::Attributes,
            KindMask::of(&[SchemaKind::Attribute, SchemaKind::AttributeGroup]),
        ),
        (Segment::AnyAttribute, KindMask::of(&[SchemaKind::AnyAttribute])),
    ];

    fn concat(list: &SegmentedList<SchemaKind>) -> Vec<SchemaKind> {
        list.segments()
            .flat_map(|(segment, _)| list.segment(segment).to_vec())
            .collect()
    }

    #[test]
    fn test_append_places_in_document_order() {
        let mut list = SegmentedList::new(LAYOUT);
        assert_eq!(list.append(SchemaKind::Annotation), Some(Segment::Annotation));
        assert_eq!(list.append(SchemaKind::Sequence), Some(Segment::Content));
        assert_eq!(list.append(SchemaKind::Attribute), Some(Segment::Attributes));
        assert_eq!(list.append(SchemaKind::Attribute), Some(Segment::Attributes));
        // Going back to an earlier segment is not allowed.
        assert_eq!(list.append(SchemaKind::Annotation), None);
        assert_eq!(list.append(SchemaKind::AnyAttribute), Some(Segment::AnyAttribute));
        assert_eq!(list.len(), 5);
        assert_eq!(list.segment(Segment::Attributes).len(), 2);
    }

    #[test]
    fn test_shared_kind_belongs_to_earlier_segment() {
        const SHARED: Layout = &[
            (
                Segment::References,
                KindMask::of(&[SchemaKind::Annotation, SchemaKind::Import]),
            ),
            (
                Segment::Definitions,
                KindMask::of(&[SchemaKind::Annotation, SchemaKind::Element]),
            ),
        ];
        let mut list = SegmentedList::new(SHARED);
        list.push(Segment::References, SchemaKind::Import).unwrap();
        list.push(Segment::Definitions, SchemaKind::Element).unwrap();
        list.insert(Segment::Definitions, 0, SchemaKind::Annotation).unwrap();

        assert_eq!(
            list.segment(Segment::References),
            &[SchemaKind::Import, SchemaKind::Annotation]
        );
        assert_eq!(list.segment(Segment::Definitions), &[SchemaKind::Element]);
        assert_eq!(list.modifications(Segment::References), 2);
        assert_eq!(list.modifications(Segment::Definitions), 1);
        assert_eq!(concat(&list), list.as_slice());

        // past the boundary the item stays where it was put
        list.insert(Segment::Definitions, 1, SchemaKind::Annotation).unwrap();
        assert_eq!(
            list.segment(Segment::Definitions),
            &[SchemaKind::Element, SchemaKind::Annotation]
        );
        assert_eq!(list.modifications(Segment::Definitions), 2);
    }

    #[test]
    fn test_insert_into_segment() {
        let mut list = SegmentedList::new(LAYOUT);
        list.push(Segment::Attributes, SchemaKind::Attribute).unwrap();
        list.push(Segment::AnyAttribute, SchemaKind::AnyAttribute).unwrap();
        list.insert(Segment::Content, 0, SchemaKind::Sequence).unwrap();
        list.insert(Segment::Attributes, 0, SchemaKind::AttributeGroup).unwrap();

        assert_eq!(
            list.as_slice(),
            &[
                SchemaKind::Sequence,
                SchemaKind::AttributeGroup,
                SchemaKind::Attribute,
                SchemaKind::AnyAttribute
            ]
        );
        assert_eq!(list.modifications(Segment::Attributes), 2);
        let view = list.view(Segment::Attributes).unwrap();
        assert_eq!(view.start(), 1);
        assert_eq!(view.get(1), Some(&SchemaKind::Attribute));
    }

    #[test]
    fn test_wrong_kind_and_bounds() {
        let mut list = SegmentedList::new(LAYOUT);
        assert!(matches!(
            list.insert(Segment::Content, 0, SchemaKind::Attribute),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            list.insert(Segment::Content, 1, SchemaKind::Sequence),
            Err(Error::IndexOutOfBounds { index: 1, len: 0 })
        ));
        assert!(matches!(
            list.remove(Segment::Annotation, 0),
            Err(Error::IndexOutOfBounds { .. })
        ));
        assert!(matches!(
            list.insert(Segment::Facets, 0, SchemaKind::Pattern),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_set_and_remove_range() {
        let mut list = SegmentedList::new(LAYOUT);
        for kind in [SchemaKind::Attribute, SchemaKind::Attribute, SchemaKind::AttributeGroup] {
            list.push(Segment::Attributes, kind).unwrap();
        }
        let old = list.set(Segment::Attributes, 1, SchemaKind::AttributeGroup).unwrap();
        assert_eq!(old, SchemaKind::Attribute);
        let removed = list.remove_range(Segment::Attributes, 0, 2).unwrap();
        assert_eq!(removed, vec![SchemaKind::Attribute, SchemaKind::AttributeGroup]);
        assert_eq!(list.segment(Segment::Attributes), &[SchemaKind::AttributeGroup]);
        assert!(list.set(Segment::Attributes, 0, SchemaKind::Sequence).is_err());
    }

    #[test]
    fn test_stale_views_resync() {
        let mut list = SegmentedList::new(LAYOUT);
        list.push(Segment::Attributes, SchemaKind::Attribute).unwrap();
        assert_eq!(list.view(Segment::Attributes).unwrap().start(), 0);
        list.push(Segment::Annotation, SchemaKind::Annotation).unwrap();
        list.push(Segment::Content, SchemaKind::Choice).unwrap();
        assert_eq!(list.view(Segment::Attributes).unwrap().start(), 2);
        assert_eq!(list.segment_of(1), Some(Segment::Content));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(usize, usize, SchemaKind),
        Remove(usize, usize),
        Set(usize, usize, SchemaKind),
        RemoveRange(usize, usize, usize),
    }

    fn kinds() -> Vec<SchemaKind> {
        LAYOUT.iter().flat_map(|(_, mask)| mask.iter()).collect()
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        let kind = proptest::sample::select(kinds());
        prop_oneof![
            (0..LAYOUT.len(), 0..4usize, kind.clone()).prop_map(|(s, i, k)| Op::Insert(s, i, k)),
            (0..LAYOUT.len(), 0..4usize).prop_map(|(s, i)| Op::Remove(s, i)),
            (0..LAYOUT.len(), 0..4usize, kind).prop_map(|(s, i, k)| Op::Set(s, i, k)),
            (0..LAYOUT.len(), 0..4usize, 0..4usize).prop_map(|(s, a, b)| Op::RemoveRange(s, a, b)),
        ]
    }

    proptest! {
        #[test]
        fn prop_segments_partition_backing_list(ops in proptest::collection::vec(op_strategy(), 0..60)) {
            let mut list = SegmentedList::new(LAYOUT);
            for op in ops {
                // Contract violations are rejected without changing the list.
                let before = list.as_slice().to_vec();
                let result = match op {
                    Op::Insert(s, i, k) => list.insert(LAYOUT[s].0, i, k).map(|_| ()),
                    Op::Remove(s, i) => list.remove(LAYOUT[s].0, i).map(|_| ()),
                    Op::Set(s, i, k) => list.set(LAYOUT[s].0, i, k).map(|_| ()),
                    Op::RemoveRange(s, a, b) => list.remove_range(LAYOUT[s].0, a, b).map(|_| ()),
                };
                if result.is_err() {
                    prop_assert_eq!(list.as_slice(), before.as_slice());
                }
                prop_assert_eq!(concat(&list), list.as_slice().to_vec());
                for (segment, mask) in LAYOUT.iter() {
                    prop_assert!(list.segment(*segment).iter().all(|k| mask.contains(*k)));
                }
            }
        }
    }
}
