//! XSD constraining facets
//!
//! Each facet decodes its own `value` in the prevalidate pass. The
//! restriction owning a set of facets checks them against each other and
//! against the facets its base type admits once the base is resolved.

use super::base::{ComponentData, ComponentId};
use super::helpers::{parse_decimal, parse_non_negative_integer};
use super::kinds::{KindMask, SchemaKind};
use super::segments::Segment;
use super::validation::ValidationContext;
use regex::Regex;
use rust_decimal::Decimal;
use std::fmt;

use SchemaKind as K;

const FACET_ATTRIBUTES: &[&str] = &["id", "value", "fixed"];
const UNFIXABLE_FACET_ATTRIBUTES: &[&str] = &["id", "value"];

/// Facets that may appear more than once in a restriction
const REPEATABLE: KindMask = KindMask::of(&[K::Pattern, K::Enumeration]);

/// White space handling modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhiteSpace {
    /// Preserve all white space
    Preserve,
    /// Replace tabs and newlines with spaces
    Replace,
    /// Replace and collapse multiple spaces
    Collapse,
}

impl WhiteSpace {
    /// Parse from string value
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "preserve" => Some(WhiteSpace::Preserve),
            "replace" => Some(WhiteSpace::Replace),
            "collapse" => Some(WhiteSpace::Collapse),
            _ => None,
        }
    }

    /// Normalize a string according to this white space mode
    pub fn normalize(&self, s: &str) -> String {
        match self {
            WhiteSpace::Preserve => s.to_string(),
            WhiteSpace::Replace => s.replace(['\t', '\n', '\r'], " "),
            WhiteSpace::Collapse => s.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }
}

impl fmt::Display for WhiteSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WhiteSpace::Preserve => "preserve",
            WhiteSpace::Replace => "replace",
            WhiteSpace::Collapse => "collapse",
        })
    }
}

/// Decoded state of a facet
#[derive(Debug, Clone, Default)]
pub struct FacetData {
    /// `value`
    pub value: Option<String>,
    /// `fixed`
    pub fixed: bool,
    /// Integer value of the length and digits facets
    pub limit: Option<u64>,
    /// `whiteSpace` mode
    pub white_space: Option<WhiteSpace>,
    /// Compiled `pattern`, when the expression translates
    pub compiled: Option<Regex>,
}

impl FacetData {
    /// Check a value against a compiled pattern
    pub fn is_match(&self, value: &str) -> Option<bool> {
        self.compiled.as_ref().map(|regex| regex.is_match(value))
    }
}

/// Facets that cannot appear together with `kind`
pub const fn excluded_facets(kind: SchemaKind) -> KindMask {
    match kind {
        K::Length => KindMask::of(&[K::MinLength, K::MaxLength]),
        K::MinLength | K::MaxLength => KindMask::of(&[K::Length]),
        K::MinInclusive => KindMask::of(&[K::MinExclusive]),
        K::MinExclusive => KindMask::of(&[K::MinInclusive]),
        K::MaxInclusive => KindMask::of(&[K::MaxExclusive]),
        K::MaxExclusive => KindMask::of(&[K::MaxInclusive]),
        _ => KindMask::EMPTY,
    }
}

/// Translate an XSD regular expression for the `regex` crate
///
/// XSD patterns are implicitly anchored and have the `\i` / `\c` name
/// character classes.
pub fn translate_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str("^(?:");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('i') => out.push_str("[_:A-Za-z]"),
            Some('I') => out.push_str("[^_:A-Za-z]"),
            Some('c') => out.push_str("[-._:A-Za-z0-9]"),
            Some('C') => out.push_str("[^-._:A-Za-z0-9]"),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out.push_str(")$");
    out
}

pub(crate) fn prevalidate(ctx: &mut ValidationContext, id: ComponentId) {
    let kind = ctx.tree().kind(id);
    let legal = match kind {
        K::Pattern | K::Enumeration => UNFIXABLE_FACET_ATTRIBUTES,
        _ => FACET_ATTRIBUTES,
    };
    ctx.check_attributes(id, legal);

    let mut data = FacetData {
        value: ctx.require_attribute(id, "value"),
        fixed: ctx.decode_boolean(id, "fixed").unwrap_or(false),
        ..FacetData::default()
    };
    if let Some(value) = data.value.clone() {
        match kind {
            K::Length | K::MinLength | K::MaxLength | K::FractionDigits => {
                data.limit = parse_non_negative_integer(&value);
                if data.limit.is_none() {
                    ctx.error(
                        id,
                        format!("facet <{}>: '{}' is not a non-negative integer", kind, value),
                    );
                }
            }
            K::TotalDigits => {
                data.limit = parse_non_negative_integer(&value).filter(|&digits| digits > 0);
                if data.limit.is_none() {
                    ctx.error(
                        id,
                        format!("facet <{}>: '{}' is not a positive integer", kind, value),
                    );
                }
            }
            K::WhiteSpace => {
                data.white_space = WhiteSpace::from_str(&value);
                if data.white_space.is_none() {
                    ctx.error(
                        id,
                        format!(
                            "facet <{}>: wrong value '{}', expected 'preserve', 'replace' or 'collapse'",
                            kind, value
                        ),
                    );
                }
            }
            K::Pattern => match Regex::new(&translate_pattern(&value)) {
                Ok(regex) => data.compiled = Some(regex),
                Err(err) => ctx.warning(
                    id,
                    format!("pattern '{}' cannot be compiled: {}", value, err),
                ),
            },
            _ => {}
        }
    }
    ctx.tree_mut().node_mut(id).data = ComponentData::Facet(data);
}

/// Check the facets of the restriction `owner` against each other
///
/// With `admitted`, facets outside the set are reported too.
pub(crate) fn validate_facet_set(
    ctx: &mut ValidationContext,
    owner: ComponentId,
    admitted: Option<KindMask>,
) {
    let facets: Vec<(SchemaKind, ComponentId)> = ctx
        .tree()
        .segment(owner, Segment::Facets)
        .iter()
        .map(|child| (child.kind, child.id))
        .collect();

    let mut problems = Vec::new();
    let mut present = KindMask::EMPTY;
    for &(kind, _) in &facets {
        if let Some(admitted) = admitted {
            if !admitted.contains(kind) {
                problems.push(format!("facet <{}> is not admitted by the base type", kind));
            }
        }
        if present.contains(kind) && !REPEATABLE.contains(kind) {
            problems.push(format!("facet <{}> can appear only once", kind));
        }
        present |= kind;
    }
    for kind in present.iter() {
        for other in excluded_facets(kind).iter() {
            if other > kind && present.contains(other) {
                problems.push(format!(
                    "facets <{}> and <{}> are mutually exclusive",
                    kind, other
                ));
            }
        }
    }

    let limit = |kind: SchemaKind| -> Option<u64> {
        facets
            .iter()
            .find(|(k, _)| *k == kind)
            .and_then(|(_, id)| ctx.tree().node(*id).facet_data())
            .and_then(|data| data.limit)
    };
    if let (Some(min), Some(max)) = (limit(K::MinLength), limit(K::MaxLength)) {
        if min > max {
            problems.push(format!("minLength {} is greater than maxLength {}", min, max));
        }
    }
    if let (Some(fraction), Some(total)) = (limit(K::FractionDigits), limit(K::TotalDigits)) {
        if fraction > total {
            problems.push(format!(
                "fractionDigits {} is greater than totalDigits {}",
                fraction, total
            ));
        }
    }

    let bound = |kind: SchemaKind| -> Option<(SchemaKind, Decimal)> {
        facets
            .iter()
            .find(|(k, _)| *k == kind)
            .and_then(|(_, id)| ctx.tree().node(*id).facet_data())
            .and_then(|data| data.value.as_deref())
            .and_then(parse_decimal)
            .map(|value| (kind, value))
    };
    let lower = bound(K::MinInclusive).or_else(|| bound(K::MinExclusive));
    let upper = bound(K::MaxInclusive).or_else(|| bound(K::MaxExclusive));
    if let (Some((lower_kind, low)), Some((upper_kind, high))) = (lower, upper) {
        let exclusive = lower_kind == K::MinExclusive || upper_kind == K::MaxExclusive;
        if low > high || (exclusive && low == high) {
            problems.push(format!(
                "{} {} is not compatible with {} {}",
                lower_kind, low, upper_kind, high
            ));
        }
    }

    for problem in problems {
        ctx.error(owner, problem);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::MemoryResolver;
    use crate::validators::Severity;
    use pretty_assertions::assert_eq;

    fn run(restriction: &str) -> ValidationContext {
        let mut ctx = ValidationContext::new(MemoryResolver::new());
        let source = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:simpleType name="T">{}</xs:simpleType>
               </xs:schema>"#,
            restriction
        );
        ctx.add_schema_str("f.xsd", &source).unwrap();
        ctx.validate();
        ctx
    }

    fn messages(ctx: &ValidationContext) -> Vec<&str> {
        ctx.diagnostics().iter().map(|d| d.message.as_str()).collect()
    }

    #[test]
    fn test_white_space() {
        assert_eq!(WhiteSpace::from_str("collapse"), Some(WhiteSpace::Collapse));
        assert_eq!(WhiteSpace::from_str("trim"), None);
        assert_eq!(WhiteSpace::Collapse.normalize("  a \t b\n"), "a b");
        assert_eq!(WhiteSpace::Replace.normalize("a\tb"), "a b");
    }

    #[test]
    fn test_translate_pattern() {
        assert_eq!(translate_pattern(r"\i\c*"), "^(?:[_:A-Za-z][-._:A-Za-z0-9]*)$");
        let regex = Regex::new(&translate_pattern("[A-Z]{2}")).unwrap();
        assert!(regex.is_match("AB"));
        assert!(!regex.is_match("ABC"));
    }

    #[test]
    fn test_facet_values() {
        let ctx = run(
            r#"<xs:restriction base="xs:decimal">
                 <xs:totalDigits value="0"/>
                 <xs:fractionDigits value="-1"/>
                 <xs:pattern value="[0-9" fixed="true"/>
                 <xs:whiteSpace value="trim"/>
               </xs:restriction>"#,
        );
        let messages = messages(&ctx);
        assert_eq!(messages.len(), 5, "{:?}", messages);
        assert_eq!(
            messages[..3],
            [
                "facet <totalDigits>: '0' is not a positive integer",
                "facet <fractionDigits>: '-1' is not a non-negative integer",
                "undefined attribute 'fixed' in <pattern>",
            ]
        );
        assert!(messages[3].starts_with("pattern '[0-9' cannot be compiled"));
        assert_eq!(
            messages[4],
            "facet <whiteSpace>: wrong value 'trim', expected 'preserve', 'replace' or 'collapse'"
        );
        assert_eq!(ctx.diagnostics().count(Severity::Warning), 1);
    }

    #[test]
    fn test_facet_exclusion() {
        let ctx = run(
            r#"<xs:restriction base="xs:string">
                 <xs:length value="3"/>
                 <xs:minLength value="1"/>
               </xs:restriction>"#,
        );
        assert_eq!(
            messages(&ctx),
            vec!["facets <length> and <minLength> are mutually exclusive"]
        );
    }

    #[test]
    fn test_facet_set_rules() {
        let ctx = run(
            r#"<xs:restriction base="xs:int">
                 <xs:minInclusive value="10"/>
                 <xs:maxExclusive value="10"/>
                 <xs:maxLength value="3"/>
                 <xs:enumeration value="10"/>
                 <xs:enumeration value="11"/>
                 <xs:totalDigits value="2"/>
                 <xs:fractionDigits value="3"/>
                 <xs:totalDigits value="4"/>
               </xs:restriction>"#,
        );
        assert_eq!(
            messages(&ctx),
            vec![
                "facet <maxLength> is not admitted by the base type",
                "facet <totalDigits> can appear only once",
                "fractionDigits 3 is greater than totalDigits 2",
                "minInclusive 10 is not compatible with maxExclusive 10",
            ]
        );
    }

    #[test]
    fn test_length_bounds() {
        let ctx = run(
            r#"<xs:restriction base="xs:string">
                 <xs:minLength value="5"/>
                 <xs:maxLength value="2"/>
               </xs:restriction>"#,
        );
        assert_eq!(messages(&ctx), vec!["minLength 5 is greater than maxLength 2"]);
    }
}
