//! XML event source for schema documents
//!
//! A thin pull reader over `quick-xml` that delivers the events the schema
//! tree builder needs: start tags with resolved names, attributes and
//! namespace declarations, end tags, and text. Empty elements are reported
//! as a start tag immediately followed by an end tag. Comments, processing
//! instructions and the XML declaration are dropped.

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::namespaces::{lookup_prefix, NamespaceDeclaration, QName, XML_NAMESPACE};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// One attribute of a start tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Resolved name; unprefixed attributes have no namespace
    pub name: QName,
    /// Prefix as written in the document
    pub prefix: Option<String>,
    /// Unescaped value
    pub value: String,
}

/// Pull event delivered by [`EventReader`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    /// Start tag
    StartElement {
        /// Resolved element name
        name: QName,
        /// Attributes other than namespace declarations, in document order
        attributes: Vec<XmlAttribute>,
        /// Namespace declarations made on this element
        namespaces: Vec<NamespaceDeclaration>,
        /// 1-based line of the `<` that opens the tag
        line: usize,
    },
    /// End tag (also synthesized for empty elements)
    EndElement {
        /// Resolved element name
        name: QName,
    },
    /// Character data, whitespace-trimmed, never empty
    Text(String),
}

/// Namespace-aware pull reader over one document
pub struct EventReader<'a> {
    reader: Reader<&'a [u8]>,
    source: &'a str,
    buf: Vec<u8>,
    scopes: Vec<Vec<NamespaceDeclaration>>,
    open: Vec<QName>,
    pending_end: bool,
    limits: Limits,
    line: usize,
    counted_to: usize,
    finished: bool,
}

impl<'a> EventReader<'a> {
    /// Create a reader over `source`
    pub fn new(source: &'a str, limits: Limits) -> Result<Self> {
        limits.check_xml_size(source.len())?;
        let mut reader = Reader::from_reader(source.as_bytes());
        reader.trim_text(true);
        Ok(Self {
            reader,
            source,
            buf: Vec::new(),
            scopes: vec![vec![NamespaceDeclaration::prefixed("xml", XML_NAMESPACE)]],
            open: Vec::new(),
            pending_end: false,
            limits,
            line: 1,
            counted_to: 0,
            finished: false,
        })
    }

    /// Current element nesting depth
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Line reached by the reader so far
    pub fn line(&self) -> usize {
        self.line
    }

    /// Read the next event; `None` at end of document
    pub fn next_event(&mut self) -> Result<Option<XmlEvent>> {
        if self.pending_end {
            self.pending_end = false;
            return Ok(Some(self.close()?));
        }
        if self.finished {
            return Ok(None);
        }

        loop {
            let before = self.reader.buffer_position();
            self.buf.clear();
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|e| {
                    Error::Xml(format!(
                        "Error parsing XML at position {}: {}",
                        self.reader.buffer_position(),
                        e
                    ))
                })?
                .into_owned();
            let after = self.reader.buffer_position();

            match event {
                Event::Start(start) => {
                    let line = self.tag_line(before, after);
                    return self.open_element(&start, line).map(Some);
                }
                Event::Empty(start) => {
                    let line = self.tag_line(before, after);
                    let event = self.open_element(&start, line)?;
                    self.pending_end = true;
                    return Ok(Some(event));
                }
                Event::End(_) => {
                    self.advance_line(after);
                    return self.close().map(Some);
                }
                Event::Text(text) => {
                    self.advance_line(after);
                    let text = text
                        .unescape()
                        .map_err(|e| Error::Xml(format!("Failed to unescape text: {}", e)))?
                        .to_string();
                    if !text.is_empty() {
                        return Ok(Some(XmlEvent::Text(text)));
                    }
                }
                Event::CData(data) => {
                    self.advance_line(after);
                    let text = String::from_utf8(data.into_inner().into_owned())
                        .map_err(|e| Error::Xml(format!("Invalid UTF-8 in CDATA: {}", e)))?;
                    if !text.trim().is_empty() {
                        return Ok(Some(XmlEvent::Text(text)));
                    }
                }
                Event::Eof => {
                    self.finished = true;
                    if let Some(name) = self.open.last() {
                        return Err(Error::Xml(format!("Unexpected end of document inside <{}>", name)));
                    }
                    return Ok(None);
                }
                _ => self.advance_line(after),
            }
        }
    }

    fn open_element(&mut self, start: &BytesStart<'_>, line: usize) -> Result<XmlEvent> {
        self.limits.check_xml_depth(self.open.len() + 1)?;

        let raw_name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| Error::Xml(format!("Invalid element name: {}", e)))?
            .to_string();

        let mut namespaces = Vec::new();
        let mut raw_attributes = Vec::new();
        for attr_result in start.attributes() {
            let attr =
                attr_result.map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;
            let attr_name = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::Xml(format!("Invalid attribute name: {}", e)))?
                .to_string();
            let attr_value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(format!("Failed to unescape attribute value: {}", e)))?
                .to_string();

            if attr_name == "xmlns" {
                namespaces.push(NamespaceDeclaration::default_namespace(attr_value));
            } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
                namespaces.push(NamespaceDeclaration::prefixed(prefix, attr_value));
            } else {
                raw_attributes.push((attr_name, attr_value));
            }
        }
        self.limits.check_attributes(raw_attributes.len())?;
        self.limits.check_namespaces(namespaces.len())?;

        self.scopes.push(namespaces.clone());

        let name = self.resolve_name(&raw_name, true)?;
        let mut attributes = Vec::with_capacity(raw_attributes.len());
        for (raw, value) in raw_attributes {
            let (prefix, _) = crate::names::split_qname(&raw);
            let prefix = prefix.map(str::to_string);
            let name = self.resolve_name(&raw, false)?;
            attributes.push(XmlAttribute { name, prefix, value });
        }

        self.open.push(name.clone());
        Ok(XmlEvent::StartElement {
            name,
            attributes,
            namespaces,
            line,
        })
    }

    fn close(&mut self) -> Result<XmlEvent> {
        let name = self
            .open
            .pop()
            .ok_or_else(|| Error::Xml("End tag without matching start tag".to_string()))?;
        self.scopes.pop();
        Ok(XmlEvent::EndElement { name })
    }

    /// Resolve a raw `prefix:local` name against the open scopes
    fn resolve_name(&self, raw: &str, use_default: bool) -> Result<QName> {
        let (prefix, local) = crate::names::split_qname(raw);
        match prefix {
            Some(prefix) => match self.lookup(Some(prefix)) {
                Some(uri) if !uri.is_empty() => Ok(QName::namespaced(uri, local)),
                _ => Err(Error::Namespace(format!(
                    "Unbound namespace prefix '{}' in '{}'",
                    prefix, raw
                ))),
            },
            None if use_default => match self.lookup(None) {
                Some(uri) if !uri.is_empty() => Ok(QName::namespaced(uri, local)),
                _ => Ok(QName::local(local)),
            },
            None => Ok(QName::local(local)),
        }
    }

    fn lookup(&self, prefix: Option<&str>) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| lookup_prefix(scope, prefix))
    }

    /// Line of the `<` opening the tag read between `before` and `after`
    fn tag_line(&mut self, before: usize, after: usize) -> usize {
        let window = &self.source.as_bytes()[before.min(after)..after];
        let tag_start = window
            .iter()
            .rposition(|&b| b == b'<')
            .map(|p| before + p)
            .unwrap_or(before);
        self.advance_line(tag_start);
        let line = self.line;
        self.advance_line(after);
        line
    }

    fn advance_line(&mut self, to: usize) {
        let to = to.min(self.source.len());
        if to > self.counted_to {
            self.line += self.source.as_bytes()[self.counted_to..to]
                .iter()
                .filter(|&&b| b == b'\n')
                .count();
            self.counted_to = to;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::XSD_NAMESPACE;

    fn collect(xml: &str) -> Result<Vec<XmlEvent>> {
        let mut reader = EventReader::new(xml, Limits::default())?;
        let mut events = Vec::new();
        while let Some(event) = reader.next_event()? {
            events.push(event);
        }
        Ok(events)
    }

    #[test]
    fn test_empty_element_expands() {
        let events = collect(r#"<root><child/></root>"#).unwrap();
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[2], XmlEvent::EndElement { name } if name.local_name == "child"));
    }

    #[test]
    fn test_namespace_resolution() {
        let xml = format!(
            r#"<xs:schema xmlns:xs="{}" xmlns:tns="urn:t" tns:extra="1" name="n"/>"#,
            XSD_NAMESPACE
        );
        let events = collect(&xml).unwrap();
        match &events[0] {
            XmlEvent::StartElement {
                name,
                attributes,
                namespaces,
                ..
            } => {
                assert!(name.is_xsd());
                assert_eq!(name.local_name, "schema");
                assert_eq!(namespaces.len(), 2);
                assert_eq!(attributes[0].name, QName::namespaced("urn:t", "extra"));
                assert_eq!(attributes[0].prefix.as_deref(), Some("tns"));
                assert_eq!(attributes[1].name, QName::local("name"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_default_namespace_not_applied_to_attributes() {
        let events = collect(r#"<a xmlns="urn:d" b="1"/>"#).unwrap();
        match &events[0] {
            XmlEvent::StartElement { name, attributes, .. } => {
                assert_eq!(name.namespace(), Some("urn:d"));
                assert_eq!(attributes[0].name.namespace(), None);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_scope_is_popped() {
        let result = collect(r#"<a><b xmlns:p="urn:p"/><p:c/></a>"#);
        assert!(matches!(result, Err(Error::Namespace(_))));
    }

    #[test]
    fn test_line_numbers() {
        let xml = "<a>\n  <b/>\n\n  <c\n    x=\"1\"/>\n</a>";
        let lines: Vec<usize> = collect(xml)
            .unwrap()
            .into_iter()
            .filter_map(|e| match e {
                XmlEvent::StartElement { line, .. } => Some(line),
                _ => None,
            })
            .collect();
        assert_eq!(lines, vec![1, 2, 4]);
    }

    #[test]
    fn test_text_and_malformed() {
        let events = collect("<a> hello &amp; bye </a>").unwrap();
        assert_eq!(events[1], XmlEvent::Text("hello & bye".to_string()));
        assert!(collect("<a><b></a>").is_err());
    }

    #[test]
    fn test_depth_limit() {
        let mut limits = Limits::default();
        limits.max_xml_depth = 2;
        let mut reader = EventReader::new("<a><b><c/></b></a>", limits).unwrap();
        let mut result = Ok(None);
        for _ in 0..3 {
            result = reader.next_event();
        }
        assert!(matches!(result, Err(Error::LimitExceeded(_))));
    }
}
