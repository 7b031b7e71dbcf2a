//! Identity constraints: `key`, `unique` and `keyref`
//!
//! Only the schema side is checked: names, the `selector` / `field`
//! structure, the XPath subset and the `refer` link of a `keyref`.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#cIdentity-constraint_Definitions

use super::base::{ComponentData, ComponentId};
use super::globals::DefinitionCategory;
use super::kinds::SchemaKind;
use super::segments::Segment;
use super::validation::ValidationContext;
use crate::namespaces::QName;
use crate::xpath::{IdentityPath, PathKind};
use std::fmt;

use SchemaKind as K;

const IDENTITY_ATTRIBUTES: &[&str] = &["id", "name"];
const KEYREF_ATTRIBUTES: &[&str] = &["id", "name", "refer"];
const PATH_ATTRIBUTES: &[&str] = &["id", "xpath"];

/// Type of identity constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityConstraintKind {
    /// xs:unique - values must be unique, but fields can be missing
    #[default]
    Unique,
    /// xs:key - values must be unique AND all fields must be present
    Key,
    /// xs:keyref - references a key or unique constraint
    Keyref,
}

impl IdentityConstraintKind {
    /// Constraint kind of a component kind
    pub fn from_kind(kind: SchemaKind) -> Option<Self> {
        match kind {
            K::Unique => Some(Self::Unique),
            K::Key => Some(Self::Key),
            K::Keyref => Some(Self::Keyref),
            _ => None,
        }
    }
}

impl fmt::Display for IdentityConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unique => write!(f, "unique"),
            Self::Key => write!(f, "key"),
            Self::Keyref => write!(f, "keyref"),
        }
    }
}

/// Decoded and resolved state of a `key` / `unique` / `keyref`
#[derive(Debug, Clone, Default)]
pub struct IdentityData {
    /// Kind of constraint
    pub kind: IdentityConstraintKind,
    /// Qualified name
    pub qname: Option<QName>,
    /// `refer` of a keyref
    pub refer_name: Option<QName>,
    /// Key or unique constraint a keyref refers to
    pub refer: Option<ComponentId>,
}

/// Decoded state of a `selector` / `field`
#[derive(Debug, Clone, Default)]
pub struct PathData {
    /// `xpath` as written
    pub xpath: String,
    /// Parsed expression; `None` if it is missing or does not parse
    pub parsed: Option<IdentityPath>,
}

pub(crate) fn prevalidate(ctx: &mut ValidationContext, id: ComponentId) {
    let Some(kind) = IdentityConstraintKind::from_kind(ctx.tree().kind(id)) else {
        return;
    };
    let legal = match kind {
        IdentityConstraintKind::Keyref => KEYREF_ATTRIBUTES,
        _ => IDENTITY_ATTRIBUTES,
    };
    ctx.check_attributes(id, legal);

    let mut data = IdentityData {
        kind,
        ..Default::default()
    };
    if ctx.require_attribute(id, "name").is_some() {
        if let Some(name) = ctx.decode_name(id) {
            let qname = QName::new(ctx.effective_namespace(id), name);
            ctx.register_global(id, DefinitionCategory::IdentityConstraint, qname.clone());
            data.qname = Some(qname);
        }
    }
    if kind == IdentityConstraintKind::Keyref && ctx.require_attribute(id, "refer").is_some() {
        data.refer_name = ctx.decode_qname(id, "refer");
    }

    match ctx.tree().segment(id, Segment::Selector).len() {
        0 => ctx.error(id, format!("<{}> requires a <selector> child", kind)),
        1 => {}
        _ => ctx.error(id, format!("<{}> can have only one <selector>", kind)),
    }
    if ctx.tree().segment(id, Segment::Fields).is_empty() {
        ctx.error(id, format!("<{}> requires at least one <field> child", kind));
    }
    ctx.tree_mut().node_mut(id).data = ComponentData::Identity(data);
}

pub(crate) fn prevalidate_path(ctx: &mut ValidationContext, id: ComponentId) {
    ctx.check_attributes(id, PATH_ATTRIBUTES);
    let path_kind = match ctx.tree().kind(id) {
        K::Field => PathKind::Field,
        _ => PathKind::Selector,
    };
    let mut data = PathData::default();
    if let Some(xpath) = ctx.require_attribute(id, "xpath") {
        match IdentityPath::parse(&xpath, path_kind) {
            Ok(parsed) => {
                let unbound: Vec<String> = parsed
                    .prefixes()
                    .into_iter()
                    .filter(|prefix| ctx.tree().resolve_prefix(id, Some(prefix)).is_none())
                    .map(str::to_string)
                    .collect();
                for prefix in unbound {
                    ctx.error(
                        id,
                        format!("attribute 'xpath': unbound namespace prefix '{}' in '{}'", prefix, xpath),
                    );
                }
                data.parsed = Some(parsed);
            }
            Err(err) => ctx.error(id, format!("attribute 'xpath': {} in '{}'", err, xpath.trim())),
        }
        data.xpath = xpath;
    }
    ctx.tree_mut().node_mut(id).data = ComponentData::Path(data);
}

/// Resolve the `refer` of a keyref
pub(crate) fn validate(ctx: &mut ValidationContext, id: ComponentId) {
    let Some(data) = ctx.tree().node(id).identity_data() else {
        return;
    };
    let Some(refer_name) = data.refer_name.clone() else {
        return;
    };
    let label = data
        .qname
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default();

    let Some(target) = ctx.resolve_reference(id, DefinitionCategory::IdentityConstraint, &refer_name)
    else {
        ctx.fatal(id, format!("undefined identity constraint '{}'", refer_name));
        return;
    };
    if ctx.tree().kind(target) == K::Keyref {
        ctx.error(
            id,
            format!(
                "keyref '{}' refers to '{}', which is not a key or unique constraint",
                label, refer_name
            ),
        );
    } else {
        let own = ctx.tree().segment(id, Segment::Fields).len();
        let referred = ctx.tree().segment(target, Segment::Fields).len();
        if own != referred {
            ctx.error(
                id,
                format!(
                    "keyref '{}' has {} field(s), but '{}' has {}",
                    label, own, refer_name, referred
                ),
            );
        }
    }
    if let Some(data) = ctx.tree_mut().node_mut(id).identity_data_mut() {
        data.refer = Some(target);
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
        let root = ctx.add_schema_str("id.xsd", source).unwrap();
        ctx.validate();
        (ctx, root)
    }

    fn messages(ctx: &ValidationContext) -> Vec<&str> {
        ctx.diagnostics().iter().map(|d| d.message.as_str()).collect()
    }

    #[test]
    fn test_keyref_resolution() {
        let (ctx, root) = run(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   xmlns:t="urn:t" targetNamespace="urn:t">
                 <xs:element name="catalog">
                   <xs:key name="productKey">
                     <xs:selector xpath=".//t:product"/>
                     <xs:field xpath="@sku"/>
                   </xs:key>
                   <xs:keyref name="orderRef" refer="t:productKey">
                     <xs:selector xpath="t:order | t:return"/>
                     <xs:field xpath="t:item/@sku"/>
                   </xs:keyref>
                 </xs:element>
               </xs:schema>"#,
        );
        assert!(ctx.diagnostics().is_empty(), "{:?}", ctx.diagnostics());

        let catalog = ctx.tree().children(root)[0].id;
        let key = ctx.tree().segment_ids(catalog, Segment::Identities)[0];
        let keyref = ctx.tree().segment_ids(catalog, Segment::Identities)[1];
        assert_eq!(
            ctx.find_identity_constraint(&QName::namespaced("urn:t", "productKey")),
            Some(key)
        );
        let data = ctx.tree().node(keyref).identity_data().unwrap();
        assert_eq!(data.kind, IdentityConstraintKind::Keyref);
        assert_eq!(data.refer, Some(key));

        let selector = ctx.tree().segment_ids(keyref, Segment::Selector)[0];
        let path = ctx.tree().node(selector).path_data().unwrap();
        assert_eq!(path.parsed.as_ref().unwrap().alternatives().len(), 2);
    }

    #[test]
    fn test_structure_errors() {
        let (ctx, _) = run(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:element name="a">
                   <xs:unique name="u"><xs:field xpath="@x"/></xs:unique>
                   <xs:key name="k"><xs:selector xpath="item"/></xs:key>
                   <xs:key name="u"><xs:selector xpath="/item"/><xs:field xpath="q:x"/></xs:key>
                 </xs:element>
               </xs:schema>"#,
        );
        assert_eq!(
            messages(&ctx),
            vec![
                "<unique> requires a <selector> child",
                "<key> requires at least one <field> child",
                "duplicate identity constraint 'u'",
                "attribute 'xpath': invalid syntax: absolute paths are not allowed in '/item'",
                "attribute 'xpath': unbound namespace prefix 'q' in 'q:x'",
            ]
        );
    }

    #[test]
    fn test_keyref_errors() {
        let (ctx, _) = run(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:element name="a">
                   <xs:key name="k">
                     <xs:selector xpath="item"/><xs:field xpath="@x"/><xs:field xpath="@y"/>
                   </xs:key>
                   <xs:keyref name="r1" refer="k">
                     <xs:selector xpath="ref"/><xs:field xpath="@x"/>
                   </xs:keyref>
                   <xs:keyref name="r2" refer="r1">
                     <xs:selector xpath="ref"/><xs:field xpath="@x"/>
                   </xs:keyref>
                   <xs:keyref name="r3" refer="missing">
                     <xs:selector xpath="ref"/><xs:field xpath="@x"/>
                   </xs:keyref>
                 </xs:element>
               </xs:schema>"#,
        );
        assert_eq!(
            messages(&ctx),
            vec![
                "keyref 'r1' has 1 field(s), but 'k' has 2",
                "keyref 'r2' refers to 'r1', which is not a key or unique constraint",
                "undefined identity constraint 'missing'",
            ]
        );
        assert_eq!(ctx.diagnostics().count(Severity::Fatal), 1);
    }
}
