//! `notation` declarations

use super::base::{ComponentData, ComponentId};
use super::globals::DefinitionCategory;
use super::validation::ValidationContext;
use crate::namespaces::QName;

const NOTATION_ATTRIBUTES: &[&str] = &["id", "name", "public", "system"];

/// Decoded state of a `notation`
#[derive(Debug, Clone, Default)]
pub struct NotationData {
    /// Qualified name
    pub qname: Option<QName>,
    /// `public` identifier
    pub public: Option<String>,
    /// `system` identifier
    pub system: Option<String>,
}

pub(crate) fn prevalidate(ctx: &mut ValidationContext, id: ComponentId) {
    ctx.check_attributes(id, NOTATION_ATTRIBUTES);
    if ctx.require_attribute(id, "name").is_none() {
        return;
    }
    let name = ctx.decode_name(id);
    let public = ctx.attribute(id, "public");
    let system = ctx.attribute(id, "system");
    if public.is_none() && system.is_none() {
        ctx.error(id, "a notation requires a 'public' or 'system' attribute");
    }

    let qname = name.map(|name| QName::new(ctx.effective_namespace(id), name));
    if let Some(qname) = &qname {
        ctx.register_global(id, DefinitionCategory::Notation, qname.clone());
    }
    ctx.tree_mut().node_mut(id).data = ComponentData::Notation(NotationData {
        qname,
        public,
        system,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::MemoryResolver;

    #[test]
    fn test_notation_rules() {
        let mut ctx = ValidationContext::new(MemoryResolver::new());
        ctx.add_schema_str(
            "n.xsd",
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:n">
                 <xs:notation name="gif" public="image/gif"/>
                 <xs:notation name="png"/>
                 <xs:notation public="x"/>
               </xs:schema>"#,
        )
        .unwrap();
        let diagnostics = ctx.validate();
        assert_eq!(diagnostics.len(), 2, "{:?}", diagnostics);
        assert_eq!(
            diagnostics.as_slice()[0].message,
            "a notation requires a 'public' or 'system' attribute"
        );
        assert_eq!(
            diagnostics.as_slice()[1].message,
            "missing required attribute 'name' in <notation>"
        );

        let gif = ctx.find_notation(&QName::namespaced("urn:n", "gif")).unwrap();
        let data = ctx.tree().node(gif).notation_data().unwrap();
        assert_eq!(data.public.as_deref(), Some("image/gif"));
        assert!(ctx.find_notation(&QName::namespaced("urn:n", "png")).is_some());
    }
}
