//! Schema element kinds
//!
//! Every element of the XSD vocabulary gets a stable tag, assigned in
//! alphabetical order of its local name, and a single bit derived from
//! that tag. Sets of kinds (the children a segment accepts, the facets a
//! facet excludes) are [`KindMask`]s.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

macro_rules! schema_kinds {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Kind of a schema component, one per XSD element name
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum SchemaKind {
            $(
                #[doc = concat!("`xs:", $name, "`")]
                $variant,
            )*
        }

        impl SchemaKind {
            /// All kinds in tag order
            pub const ALL: &'static [SchemaKind] = &[$(SchemaKind::$variant),*];

            const NAMES: &'static [&'static str] = &[$($name),*];
        }
    };
}

schema_kinds! {
    All => "all",
    Annotation => "annotation",
    Any => "any",
    AnyAttribute => "anyAttribute",
    Appinfo => "appinfo",
    Attribute => "attribute",
    AttributeGroup => "attributeGroup",
    Choice => "choice",
    ComplexContent => "complexContent",
    ComplexType => "complexType",
    Documentation => "documentation",
    Element => "element",
    Enumeration => "enumeration",
    Extension => "extension",
    Field => "field",
    FractionDigits => "fractionDigits",
    Group => "group",
    Import => "import",
    Include => "include",
    Key => "key",
    Keyref => "keyref",
    Length => "length",
    List => "list",
    MaxExclusive => "maxExclusive",
    MaxInclusive => "maxInclusive",
    MaxLength => "maxLength",
    MinExclusive => "minExclusive",
    MinInclusive => "minInclusive",
    MinLength => "minLength",
    Notation => "notation",
    Pattern => "pattern",
    Redefine => "redefine",
    Restriction => "restriction",
    Schema => "schema",
    Selector => "selector",
    Sequence => "sequence",
    SimpleContent => "simpleContent",
    SimpleType => "simpleType",
    TotalDigits => "totalDigits",
    Union => "union",
    Unique => "unique",
    WhiteSpace => "whiteSpace",
}

/// Number of schema kinds
pub const KIND_COUNT: usize = SchemaKind::ALL.len();

// A KindMask is one u64 word. More kinds need a multi-word bitset.
const _: () = assert!(KIND_COUNT <= 64);

impl SchemaKind {
    /// Stable integer tag
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// XSD local name
    pub const fn name(self) -> &'static str {
        Self::NAMES[self as usize]
    }

    /// Single-bit mask for this kind
    pub const fn bit(self) -> u64 {
        1u64 << (self as u8)
    }

    /// Kind with the given tag
    pub fn from_tag(tag: u8) -> Option<SchemaKind> {
        Self::ALL.get(tag as usize).copied()
    }

    /// Kind with the given XSD local name
    pub fn from_name(name: &str) -> Option<SchemaKind> {
        Self::NAMES
            .binary_search(&name)
            .ok()
            .map(|i| Self::ALL[i])
    }

    /// Check whether this kind is a constraining facet
    pub const fn is_facet(self) -> bool {
        KindMask::FACETS.contains(self)
    }

    /// Check whether this kind is a model group compositor
    pub const fn is_compositor(self) -> bool {
        KindMask::COMPOSITORS.contains(self)
    }

    /// Check whether this kind is an identity constraint
    pub const fn is_identity_constraint(self) -> bool {
        KindMask::IDENTITY_CONSTRAINTS.contains(self)
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of schema kinds
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KindMask(pub u64);

impl KindMask {
    /// Empty set
    pub const EMPTY: KindMask = KindMask(0);

    /// `all`, `choice`, `sequence`
    pub const COMPOSITORS: KindMask = KindMask::of(&[SchemaKind::All, SchemaKind::Choice, SchemaKind::Sequence]);

    /// Every constraining facet
    pub const FACETS: KindMask = KindMask::of(&[
        SchemaKind::Enumeration,
        SchemaKind::FractionDigits,
        SchemaKind::Length,
        SchemaKind::MaxExclusive,
        SchemaKind::MaxInclusive,
        SchemaKind::MaxLength,
        SchemaKind::MinExclusive,
        SchemaKind::MinInclusive,
        SchemaKind::MinLength,
        SchemaKind::Pattern,
        SchemaKind::TotalDigits,
        SchemaKind::WhiteSpace,
    ]);

    /// `key`, `keyref`, `unique`
    pub const IDENTITY_CONSTRAINTS: KindMask =
        KindMask::of(&[SchemaKind::Key, SchemaKind::Keyref, SchemaKind::Unique]);

    /// `simpleType`, `complexType`
    pub const TYPE_DEFINITIONS: KindMask =
        KindMask::of(&[SchemaKind::SimpleType, SchemaKind::ComplexType]);

    /// Build a mask from a list of kinds
    pub const fn of(kinds: &[SchemaKind]) -> KindMask {
        let mut bits = 0u64;
        let mut i = 0;
        while i < kinds.len() {
            bits |= kinds[i].bit();
            i += 1;
        }
        KindMask(bits)
    }

    /// Check whether `kind` is in the set
    pub const fn contains(self, kind: SchemaKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Check whether the two sets share a kind
    pub const fn intersects(self, other: KindMask) -> bool {
        self.0 & other.0 != 0
    }

    /// Set union
    pub const fn union(self, other: KindMask) -> KindMask {
        KindMask(self.0 | other.0)
    }

    /// Set intersection
    pub const fn intersection(self, other: KindMask) -> KindMask {
        KindMask(self.0 & other.0)
    }

    /// Check whether the set is empty
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of kinds in the set
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Kinds in tag order
    pub fn iter(self) -> impl Iterator<Item = SchemaKind> {
        SchemaKind::ALL
            .iter()
            .copied()
            .filter(move |kind| self.contains(*kind))
    }
}

impl From<SchemaKind> for KindMask {
    fn from(kind: SchemaKind) -> Self {
        KindMask(kind.bit())
    }
}

impl BitOr for KindMask {
    type Output = KindMask;

    fn bitor(self, rhs: KindMask) -> KindMask {
        self.union(rhs)
    }
}

impl BitOr<SchemaKind> for KindMask {
    type Output = KindMask;

    fn bitor(self, rhs: SchemaKind) -> KindMask {
        self.union(rhs.into())
    }
}

impl BitOr for SchemaKind {
    type Output = KindMask;

    fn bitor(self, rhs: SchemaKind) -> KindMask {
        KindMask(self.bit() | rhs.bit())
    }
}

impl BitOrAssign<SchemaKind> for KindMask {
    fn bitor_assign(&mut self, rhs: SchemaKind) {
        self.0 |= rhs.bit();
    }
}

impl fmt::Debug for KindMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(SchemaKind::name)).finish()
    }
}

impl fmt::Display for KindMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(SchemaKind::name).collect();
        f.write_str(&names.join("|"))
    }
}
