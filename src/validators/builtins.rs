//! XSD built-in types
//!
//! Names in the XSD namespace resolve to these definitions instead of to
//! schema components. Each entry knows its base type, whether it is
//! simple, and which facets a restriction of it may use.

use super::kinds::{KindMask, SchemaKind};
use crate::namespaces::{QName, XSD_NAMESPACE};
use std::fmt;

/// Category of XSD type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    /// Primitive type (defined directly in XSD Part 2)
    Primitive,
    /// Derived type (derived from another type)
    Derived,
    /// Special type (anyType, anySimpleType)
    Special,
}

/// Family of facets a built-in type admits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetFamily {
    /// String-like and binary types
    String,
    /// Boolean
    Boolean,
    /// Float and double
    Float,
    /// Decimal and integer types
    Decimal,
    /// Date, time and duration types
    DateTime,
    /// QName and NOTATION
    QName,
    /// anySimpleType: every facet
    Any,
    /// anyType: not a simple type, no facets
    None,
}

impl FacetFamily {
    /// Facet kinds admitted by the family
    pub const fn admitted(self) -> KindMask {
        use SchemaKind::*;
        match self {
            FacetFamily::String => KindMask::of(&[Length, MinLength, MaxLength, Pattern, Enumeration, WhiteSpace]),
            FacetFamily::Boolean => KindMask::of(&[Pattern, WhiteSpace]),
            FacetFamily::Float | FacetFamily::DateTime => KindMask::of(&[
                Pattern,
                Enumeration,
                WhiteSpace,
                MaxInclusive,
                MaxExclusive,
                MinInclusive,
                MinExclusive,
            ]),
            FacetFamily::Decimal => KindMask::of(&[
                TotalDigits,
                FractionDigits,
                Pattern,
                Enumeration,
                WhiteSpace,
                MaxInclusive,
                MaxExclusive,
                MinInclusive,
                MinExclusive,
            ]),
            FacetFamily::QName => KindMask::of(&[Length, MinLength, MaxLength, Pattern, Enumeration, WhiteSpace]),
            FacetFamily::Any => KindMask::FACETS,
            FacetFamily::None => KindMask::EMPTY,
        }
    }
}

/// Definition of a built-in XSD type
#[derive(Debug, PartialEq, Eq)]
pub struct BuiltinType {
    /// Type name (local name without namespace)
    pub name: &'static str,
    /// Type category
    pub category: TypeCategory,
    /// Base type name (for derived types)
    pub base_type: Option<&'static str>,
    /// Admitted facets
    pub facets: FacetFamily,
}

impl BuiltinType {
    /// Qualified name in the XSD namespace
    pub fn qname(&self) -> QName {
        QName::namespaced(XSD_NAMESPACE, self.name)
    }

    /// Check whether this is a simple type (everything but anyType)
    pub fn is_simple(&self) -> bool {
        self.name != XSD_ANY_TYPE
    }

    /// Check whether values of this type are ordered numbers
    pub fn is_numeric(&self) -> bool {
        matches!(self.facets, FacetFamily::Decimal | FacetFamily::Float)
    }

    /// Facet kinds a restriction of this type may use
    pub fn admitted_facets(&self) -> KindMask {
        self.facets.admitted()
    }

    /// Base type definition
    pub fn base(&self) -> Option<&'static BuiltinType> {
        self.base_type.and_then(get_builtin_type)
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xs:{}", self.name)
    }
}

/// `xs:anyType`
pub const XSD_ANY_TYPE: &str = "anyType";
/// `xs:anySimpleType`
pub const XSD_ANY_SIMPLE_TYPE: &str = "anySimpleType";

macro_rules! builtin {
    ($name:literal, $category:ident, $base:expr, $facets:ident) => {
        BuiltinType {
            name: $name,
            category: TypeCategory::$category,
            base_type: $base,
            facets: FacetFamily::$facets,
        }
    };
}

lazy_static::lazy_static! {
    /// Registry of all built-in XSD types
    pub static ref BUILTIN_TYPES: Vec<BuiltinType> = vec![
        builtin!("anyType", Special, None, None),
        builtin!("anySimpleType", Special, Some("anyType"), Any),
        // Primitive types
        builtin!("string", Primitive, Some("anySimpleType"), String),
        builtin!("boolean", Primitive, Some("anySimpleType"), Boolean),
        builtin!("decimal", Primitive, Some("anySimpleType"), Decimal),
        builtin!("float", Primitive, Some("anySimpleType"), Float),
        builtin!("double", Primitive, Some("anySimpleType"), Float),
        builtin!("duration", Primitive, Some("anySimpleType"), DateTime),
        builtin!("dateTime", Primitive, Some("anySimpleType"), DateTime),
        builtin!("time", Primitive, Some("anySimpleType"), DateTime),
        builtin!("date", Primitive, Some("anySimpleType"), DateTime),
        builtin!("gYearMonth", Primitive, Some("anySimpleType"), DateTime),
        builtin!("gYear", Primitive, Some("anySimpleType"), DateTime),
        builtin!("gMonthDay", Primitive, Some("anySimpleType"), DateTime),
        builtin!("gDay", Primitive, Some("anySimpleType"), DateTime),
        builtin!("gMonth", Primitive, Some("anySimpleType"), DateTime),
        builtin!("hexBinary", Primitive, Some("anySimpleType"), String),
        builtin!("base64Binary", Primitive, Some("anySimpleType"), String),
        builtin!("anyURI", Primitive, Some("anySimpleType"), String),
        builtin!("QName", Primitive, Some("anySimpleType"), QName),
        builtin!("NOTATION", Primitive, Some("anySimpleType"), QName),
        // Derived string types
        builtin!("normalizedString", Derived, Some("string"), String),
        builtin!("token", Derived, Some("normalizedString"), String),
        builtin!("language", Derived, Some("token"), String),
        builtin!("NMTOKEN", Derived, Some("token"), String),
        builtin!("NMTOKENS", Derived, Some("NMTOKEN"), String),
        builtin!("Name", Derived, Some("token"), String),
        builtin!("NCName", Derived, Some("Name"), String),
        builtin!("ID", Derived, Some("NCName"), String),
        builtin!("IDREF", Derived, Some("NCName"), String),
        builtin!("IDREFS", Derived, Some("IDREF"), String),
        builtin!("ENTITY", Derived, Some("NCName"), String),
        builtin!("ENTITIES", Derived, Some("ENTITY"), String),
        // Derived numeric types
        builtin!("integer", Derived, Some("decimal"), Decimal),
        builtin!("nonPositiveInteger", Derived, Some("integer"), Decimal),
        builtin!("negativeInteger", Derived, Some("nonPositiveInteger"), Decimal),
        builtin!("long", Derived, Some("integer"), Decimal),
        builtin!("int", Derived, Some("long"), Decimal),
        builtin!("short", Derived, Some("int"), Decimal),
        builtin!("byte", Derived, Some("short"), Decimal),
        builtin!("nonNegativeInteger", Derived, Some("integer"), Decimal),
        builtin!("unsignedLong", Derived, Some("nonNegativeInteger"), Decimal),
        builtin!("unsignedInt", Derived, Some("unsignedLong"), Decimal),
        builtin!("unsignedShort", Derived, Some("unsignedInt"), Decimal),
        builtin!("unsignedByte", Derived, Some("unsignedShort"), Decimal),
        builtin!("positiveInteger", Derived, Some("nonNegativeInteger"), Decimal),
    ];
}

/// Get a built-in type by local name
pub fn get_builtin_type(name: &str) -> Option<&'static BuiltinType> {
    BUILTIN_TYPES.iter().find(|t| t.name == name)
}

/// Get a built-in type by qualified name
pub fn lookup_builtin(qname: &QName) -> Option<&'static BuiltinType> {
    if qname.is_xsd() {
        get_builtin_type(&qname.local_name)
    } else {
        None
    }
}

/// `xs:anyType`
pub fn any_type() -> &'static BuiltinType {
    &BUILTIN_TYPES[0]
}

/// `xs:anySimpleType`
pub fn any_simple_type() -> &'static BuiltinType {
    &BUILTIN_TYPES[1]
}
