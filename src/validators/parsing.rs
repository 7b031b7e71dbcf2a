//! XSD document parsing
//!
//! Turns one schema document into a `schema` component subtree. Only the
//! shape is checked here: every element must be an XSD element that may
//! appear where it is. Attribute values are decoded later, by the
//! prevalidate pass.
//!
//! The content of `appinfo` and `documentation` is not made of components:
//! foreign elements inside them are skipped and their text pieces are kept,
//! whitespace-trimmed and joined with single spaces, on the item node.

use super::base::{ComponentId, ExtraAttribute};
use super::kinds::SchemaKind;
use super::tree::SchemaTree;
use crate::documents::{EventReader, XmlAttribute, XmlEvent};
use crate::error::{Error, ParseError, Result};
use crate::limits::Limits;
use crate::namespaces::{NamespaceDeclaration, QName, XSD_NAMESPACE};
use tracing::debug;

/// Open element while building
#[derive(Debug, Clone, Copy)]
enum Frame {
    /// Schema component
    Component(ComponentId),
    /// Element inside `appinfo` / `documentation`
    Foreign,
}

struct Builder<'a> {
    tree: &'a mut SchemaTree,
    name: &'a str,
    limits: &'a Limits,
    stack: Vec<Frame>,
    /// Innermost open `appinfo` / `documentation`
    item: Option<ComponentId>,
}

impl Builder<'_> {
    fn error(&self, message: impl Into<String>, line: usize) -> Error {
        Error::Parse(ParseError::new(message).with_location(format!("{}:{}", self.name, line)))
    }

    fn open(
        &mut self,
        element: &QName,
        attributes: Vec<XmlAttribute>,
        namespaces: Vec<NamespaceDeclaration>,
        line: usize,
    ) -> Result<()> {
        if self.item.is_some() {
            self.stack.push(Frame::Foreign);
            return Ok(());
        }

        let kind = if element.namespace() == Some(XSD_NAMESPACE) {
            SchemaKind::from_name(&element.local_name)
        } else {
            None
        };
        let id = match (self.stack.last().copied(), kind) {
            (None, Some(SchemaKind::Schema)) => self.tree.create(SchemaKind::Schema),
            (None, _) => {
                return Err(self.error(
                    format!("document root must be <xs:schema>, found <{}>", element),
                    line,
                ))
            }
            (Some(Frame::Component(parent)), Some(kind)) => {
                let parent_kind = self.tree.kind(parent);
                match self.tree.create_child(parent, kind) {
                    Ok(id) => id,
                    Err(_) => {
                        return Err(self.error(
                            format!("<{}> is not allowed here in <{}>", kind, parent_kind),
                            line,
                        ))
                    }
                }
            }
            (Some(Frame::Component(parent)), None) => {
                let parent_kind = self.tree.kind(parent);
                return Err(self.error(
                    format!("unexpected element <{}> in <{}>", element, parent_kind),
                    line,
                ));
            }
            (Some(Frame::Foreign), _) => {
                self.stack.push(Frame::Foreign);
                return Ok(());
            }
        };
        self.limits.check_schema_components(self.tree.len())?;

        let node = self.tree.node_mut(id);
        for attribute in attributes {
            match attribute.name.namespace {
                None => {
                    node.attributes.insert(attribute.name.local_name, attribute.value);
                }
                Some(namespace) => node.extra_attributes.push(ExtraAttribute {
                    name: attribute.name.local_name,
                    namespace: Some(namespace),
                    prefix: attribute.prefix,
                    value: attribute.value,
                }),
            }
        }
        node.namespace_declarations = namespaces;
        node.line = Some(line);
        if matches!(node.kind, SchemaKind::Appinfo | SchemaKind::Documentation) {
            self.item = Some(id);
        }
        self.stack.push(Frame::Component(id));
        Ok(())
    }

    fn close(&mut self) {
        if let Some(Frame::Component(id)) = self.stack.pop() {
            if self.item == Some(id) {
                self.item = None;
            }
        }
    }

    fn text(&mut self, text: String, line: usize) -> Result<()> {
        let Some(item) = self.item else {
            let owner = match self.stack.last() {
                Some(Frame::Component(id)) => self.tree.kind(*id).name(),
                _ => "document",
            };
            return Err(self.error(format!("unexpected text content in <{}>", owner), line));
        };
        let node = self.tree.node_mut(item);
        let piece = text.trim();
        match node.text.as_mut() {
            Some(existing) => {
                existing.push(' ');
                existing.push_str(piece);
            }
            None => node.text = Some(piece.to_string()),
        }
        Ok(())
    }
}

/// Parse `content` into a new `schema` subtree of `tree`
///
/// `name` is used in error locations. On failure nothing is left behind in
/// the tree.
pub(crate) fn build_schema(
    tree: &mut SchemaTree,
    content: &str,
    name: &str,
    limits: &Limits,
) -> Result<ComponentId> {
    let mark = tree.len();
    let result = build(tree, content, name, limits);
    if result.is_err() {
        tree.truncate(mark);
    }
    result
}

fn build(tree: &mut SchemaTree, content: &str, name: &str, limits: &Limits) -> Result<ComponentId> {
    let mut reader = EventReader::new(content, limits.clone())?;
    let mut builder = Builder {
        tree,
        name,
        limits,
        stack: Vec::new(),
        item: None,
    };
    let mut root = None;

    while let Some(event) = reader.next_event()? {
        match event {
            XmlEvent::StartElement {
                name: element,
                attributes,
                namespaces,
                line,
            } => {
                if root.is_some() && builder.stack.is_empty() {
                    return Err(builder.error("content after the document root", line));
                }
                builder.open(&element, attributes, namespaces, line)?;
                if root.is_none() {
                    if let Some(Frame::Component(id)) = builder.stack.first() {
                        root = Some(*id);
                    }
                }
            }
            XmlEvent::EndElement { .. } => builder.close(),
            XmlEvent::Text(text) => builder.text(text, reader.line())?,
        }
    }

    let root = root.ok_or_else(|| builder.error("document has no root element", reader.line()))?;
    debug!(schema = name, components = builder.tree.len() - root.index(), "schema document built");
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::segments::Segment;
    use pretty_assertions::assert_eq;

    fn parse(content: &str) -> Result<(SchemaTree, ComponentId)> {
        let mut tree = SchemaTree::new();
        let root = build_schema(&mut tree, content, "t.xsd", &Limits::default())?;
        Ok((tree, root))
    }

    fn location(result: Result<(SchemaTree, ComponentId)>) -> (String, Option<String>) {
        match result {
            Err(Error::Parse(err)) => (err.message, err.location),
            other => panic!("expected a parse error, got {:?}", other.map(|(_, root)| root)),
        }
    }

    #[test]
    fn test_builds_component_tree() {
        let (tree, root) = parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   xmlns:tns="urn:t" targetNamespace="urn:t" tns:note="x">
                 <xs:import namespace="urn:o"/>
                 <xs:complexType name="T">
                   <xs:sequence>
                     <xs:element name="a" type="xs:string"/>
                   </xs:sequence>
                   <xs:attribute name="id"/>
                 </xs:complexType>
               </xs:schema>"#,
        )
        .unwrap();
        assert_eq!(tree.kind(root), SchemaKind::Schema);
        assert_eq!(tree.segment(root, Segment::References).len(), 1);
        let node = tree.node(root);
        assert_eq!(node.attribute("targetNamespace"), Some("urn:t"));
        assert_eq!(node.extra_attributes.len(), 1);
        assert_eq!(node.extra_attributes[0].prefix.as_deref(), Some("tns"));
        assert_eq!(node.namespace_declarations.len(), 2);
        assert_eq!(node.line, Some(1));

        let ty = tree.segment_ids(root, Segment::Definitions)[0];
        assert_eq!(tree.node(ty).line, Some(4));
        assert_eq!(tree.segment(ty, Segment::Attributes).len(), 1);
        let sequence = tree.segment_ids(ty, Segment::Content)[0];
        let element = tree.children(sequence)[0].id;
        assert_eq!(tree.node(element).attribute("type"), Some("xs:string"));
        assert_eq!(tree.parent(element), Some(sequence));
    }

    #[test]
    fn test_annotation_content() {
        let (tree, root) = parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:annotation>
                   <xs:appinfo><xs:element name="ignored"/>tool data</xs:appinfo>
                   <xs:documentation>Some <em>marked up</em> text</xs:documentation>
                 </xs:annotation>
               </xs:schema>"#,
        )
        .unwrap();
        let annotation = tree.children(root)[0].id;
        let items = tree.children(annotation);
        assert_eq!(items.len(), 2);
        assert_eq!(tree.node(items[0].id).text.as_deref(), Some("tool data"));
        assert_eq!(tree.node(items[1].id).text.as_deref(), Some("Some marked up text"));
        assert!(tree.children(items[0].id).is_empty());
    }

    #[test]
    fn test_wrong_root() {
        let (message, at) = location(parse(r#"<schema xmlns="urn:not-xsd"/>"#));
        assert_eq!(message, "document root must be <xs:schema>, found <{urn:not-xsd}schema>");
        assert_eq!(at.as_deref(), Some("t.xsd:1"));
    }

    #[test]
    fn test_misplaced_and_foreign_elements() {
        let (message, at) = location(parse(
            "<xs:schema xmlns:xs=\"http://www.w3.org/2001/XMLSchema\">\n\
               <xs:element name=\"e\">\n\
                 <xs:sequence/>\n\
               </xs:element>\n\
             </xs:schema>",
        ));
        assert_eq!(message, "<sequence> is not allowed here in <element>");
        assert_eq!(at.as_deref(), Some("t.xsd:3"));

        let (message, _) = location(parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"><xs:elemnt/></xs:schema>"#,
        ));
        assert_eq!(
            message,
            "unexpected element <{http://www.w3.org/2001/XMLSchema}elemnt> in <schema>"
        );

        let (message, _) = location(parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">stray</xs:schema>"#,
        ));
        assert_eq!(message, "unexpected text content in <schema>");
    }

    #[test]
    fn test_failed_document_leaves_tree_unchanged() {
        let mut tree = SchemaTree::new();
        let first = build_schema(
            &mut tree,
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"><xs:element name="a"/></xs:schema>"#,
            "a.xsd",
            &Limits::default(),
        )
        .unwrap();
        let len = tree.len();
        let failed = build_schema(
            &mut tree,
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"><xs:element><xs:bad/></xs:element></xs:schema>"#,
            "b.xsd",
            &Limits::default(),
        );
        assert!(failed.is_err());
        assert_eq!(tree.len(), len);
        assert_eq!(tree.children(first).len(), 1);
    }

    #[test]
    fn test_malformed_xml() {
        let mut tree = SchemaTree::new();
        let result = build_schema(
            &mut tree,
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"><xs:element></xs:schema>"#,
            "m.xsd",
            &Limits::default(),
        );
        assert!(matches!(result, Err(Error::Xml(_))));
        assert!(tree.is_empty());
    }
}
