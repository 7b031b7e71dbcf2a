//! Location paths over the component tree
//!
//! ```text
//! complexType[@name='Foo']/sequence/element
//! //element[@ref]
//! schema/**/attribute[2]
//! ```
//!
//! A step tests the component kind (`*` for any) and may carry predicates:
//! `[@attr]`, `[@attr='value']` and `[n]`, the 1-based position among the
//! components the step matched so far from one context component. A
//! leading `//`, an inner `//` or a `**` step lets the next step match at
//! any depth.

use super::XPathParseError;
use crate::names::is_valid_qname;
use crate::validators::base::ComponentId;
use crate::validators::kinds::SchemaKind;
use crate::validators::tree::SchemaTree;
use indexmap::IndexSet;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// How a step reaches its candidates from the context component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Direct children
    Child,
    /// Every descendant, excluding the context component
    Descendant,
}

/// Kind test of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindTest {
    /// `*`
    Any,
    /// A component kind name
    Kind(SchemaKind),
}

impl KindTest {
    fn matches(self, kind: SchemaKind) -> bool {
        match self {
            Self::Any => true,
            Self::Kind(expected) => expected == kind,
        }
    }
}

/// Step predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `[@attr]`
    HasAttribute(String),
    /// `[@attr='value']`
    AttributeEquals(String, String),
    /// `[n]`, 1-based
    Position(usize),
}

/// One step of a [`SchemaPath`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchStep {
    /// Axis
    pub axis: Axis,
    /// Kind test
    pub test: KindTest,
    /// Predicates, applied left to right
    pub predicates: Vec<Predicate>,
}

impl MatchStep {
    fn parse(text: &str, axis: Axis) -> Result<Self, XPathParseError> {
        let (name, mut rest) = match text.find('[') {
            Some(pos) => (text[..pos].trim(), &text[pos..]),
            None => (text.trim(), ""),
        };
        let test = match name {
            "*" => KindTest::Any,
            name => SchemaKind::from_name(name)
                .map(KindTest::Kind)
                .ok_or_else(|| XPathParseError::InvalidStep(text.trim().to_string()))?,
        };

        let mut predicates = Vec::new();
        while let Some(inner) = rest.trim_start().strip_prefix('[') {
            let end = closing_bracket(inner).ok_or(XPathParseError::UnexpectedEnd)?;
            predicates.push(parse_predicate(&inner[..end])?);
            rest = &inner[end + 1..];
        }
        if !rest.trim().is_empty() {
            return Err(XPathParseError::InvalidSyntax(format!(
                "unexpected '{}' after predicates",
                rest.trim()
            )));
        }
        Ok(Self {
            axis,
            test,
            predicates,
        })
    }

    fn accepts(&self, tree: &SchemaTree, id: ComponentId) -> bool {
        self.test.matches(tree.kind(id))
    }
}

/// Position of the `]` closing a predicate, skipping quoted text
fn closing_bracket(text: &str) -> Option<usize> {
    let mut quote = None;
    for (pos, c) in text.char_indices() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), c) if q == c => quote = None,
            (None, ']') => return Some(pos),
            _ => {}
        }
    }
    None
}

fn parse_predicate(text: &str) -> Result<Predicate, XPathParseError> {
    let text = text.trim();
    if let Some(attribute) = text.strip_prefix('@') {
        let (name, value) = match attribute.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.trim())),
            None => (attribute.trim(), None),
        };
        if !is_valid_qname(name) {
            return Err(XPathParseError::InvalidSyntax(format!(
                "invalid attribute name '{}'",
                name
            )));
        }
        return match value {
            None => Ok(Predicate::HasAttribute(name.to_string())),
            Some(value) => {
                let unquoted = value
                    .strip_prefix('\'')
                    .and_then(|v| v.strip_suffix('\''))
                    .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
                    .ok_or_else(|| {
                        XPathParseError::InvalidSyntax(format!("unquoted value {}", value))
                    })?;
                Ok(Predicate::AttributeEquals(name.to_string(), unquoted.to_string()))
            }
        };
    }
    match text.parse::<usize>() {
        Ok(position) if position > 0 => Ok(Predicate::Position(position)),
        _ => Err(XPathParseError::InvalidSyntax(format!(
            "unsupported predicate [{}]",
            text
        ))),
    }
}

/// Split on `/` outside predicates
fn split_steps(path: &str) -> Result<Vec<&str>, XPathParseError> {
    let mut steps = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = 0;
    for (pos, c) in path.char_indices() {
        match (quote, c) {
            (Some(q), c) if q == c => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    XPathParseError::InvalidSyntax("unbalanced ']'".to_string())
                })?
            }
            (None, '/') if depth == 0 => {
                steps.push(&path[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
    }
    if depth > 0 || quote.is_some() {
        return Err(XPathParseError::UnexpectedEnd);
    }
    steps.push(&path[start..]);
    Ok(steps)
}

/// Compiled location path over a [`SchemaTree`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaPath {
    path: String,
    steps: Vec<MatchStep>,
}

impl SchemaPath {
    /// Parse a path expression
    pub fn parse(path: &str) -> Result<Self, XPathParseError> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(XPathParseError::Empty);
        }
        let (mut axis, body) = match trimmed.strip_prefix("//") {
            Some(body) => (Axis::Descendant, body),
            None if trimmed.starts_with('/') => {
                return Err(XPathParseError::InvalidSyntax(
                    "paths are relative to the start component".to_string(),
                ))
            }
            None => (Axis::Child, trimmed),
        };

        let raw = split_steps(body)?;
        let last = raw.len() - 1;
        let mut steps = Vec::new();
        for (index, text) in raw.into_iter().enumerate() {
            match text.trim() {
                "" if index == last => return Err(XPathParseError::UnexpectedEnd),
                "" => axis = Axis::Descendant,
                "**" if index == last => steps.push(MatchStep {
                    axis: Axis::Descendant,
                    test: KindTest::Any,
                    predicates: Vec::new(),
                }),
                "**" => axis = Axis::Descendant,
                text => {
                    steps.push(MatchStep::parse(text, axis)?);
                    axis = Axis::Child;
                }
            }
        }
        Ok(Self {
            path: trimmed.to_string(),
            steps,
        })
    }

    /// Expression as written (trimmed)
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Compiled steps
    pub fn steps(&self) -> &[MatchStep] {
        &self.steps
    }

    /// Components selected from `start`, in document order
    pub fn find(&self, tree: &SchemaTree, start: ComponentId) -> Vec<ComponentId> {
        let mut current: IndexSet<ComponentId> = IndexSet::from([start]);
        for step in &self.steps {
            let mut next = IndexSet::new();
            for &context in &current {
                let mut matched: Vec<ComponentId> = match step.axis {
                    Axis::Child => tree.children(context).iter().map(|c| c.id).collect(),
                    Axis::Descendant => tree.descendants(context).into_iter().skip(1).collect(),
                };
                matched.retain(|&id| step.accepts(tree, id));
                for predicate in &step.predicates {
                    matched = match predicate {
                        Predicate::HasAttribute(name) => matched
                            .into_iter()
                            .filter(|&id| tree.node(id).has_attribute(name))
                            .collect(),
                        Predicate::AttributeEquals(name, value) => matched
                            .into_iter()
                            .filter(|&id| tree.node(id).attribute(name) == Some(value.as_str()))
                            .collect(),
                        Predicate::Position(n) => matched.get(n - 1).copied().into_iter().collect(),
                    };
                }
                next.extend(matched);
            }
            current = next;
            if current.is_empty() {
                break;
            }
        }

        let order: HashMap<ComponentId, usize> = tree
            .descendants(start)
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect();
        let mut found: Vec<ComponentId> = current.into_iter().collect();
        found.sort_by_key(|id| order.get(id).copied().unwrap_or(usize::MAX));
        found
    }

    /// Check whether `id` is among the components selected from `start`
    pub fn matches(&self, tree: &SchemaTree, start: ComponentId, id: ComponentId) -> bool {
        self.find(tree, start).contains(&id)
    }
}

impl FromStr for SchemaPath {
    type Err = XPathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use SchemaKind as K;

    /// schema
    ///   complexType name=Foo
    ///     sequence
    ///       element name=a
    ///       element name=b ref-less
    ///   complexType name=Bar
    ///     sequence
    ///       element name=c
    ///   element name=root
    fn sample() -> (SchemaTree, ComponentId, Vec<ComponentId>) {
        let mut tree = SchemaTree::new();
        let schema = tree.create(K::Schema);
        let mut elements = Vec::new();
        for (type_name, names) in [("Foo", &["a", "b"][..]), ("Bar", &["c"][..])] {
            let ty = tree.create_child(schema, K::ComplexType).unwrap();
            tree.node_mut(ty).set_attribute("name", type_name);
            let sequence = tree.create_child(ty, K::Sequence).unwrap();
            for name in names {
                let element = tree.create_child(sequence, K::Element).unwrap();
                tree.node_mut(element).set_attribute("name", *name);
                elements.push(element);
            }
        }
        let root = tree.create_child(schema, K::Element).unwrap();
        tree.node_mut(root).set_attribute("name", "root");
        elements.push(root);
        (tree, schema, elements)
    }

    #[test]
    fn test_child_steps_with_attribute_predicate() {
        let (tree, schema, elements) = sample();
        let path = SchemaPath::parse("complexType[@name='Foo']/sequence/element").unwrap();
        assert_eq!(path.find(&tree, schema), elements[..2].to_vec());
        assert_eq!(path.to_string(), "complexType[@name='Foo']/sequence/element");
    }

    #[test]
    fn test_descendant_steps() {
        let (tree, schema, elements) = sample();
        let all = SchemaPath::parse("//element").unwrap();
        assert_eq!(all.find(&tree, schema), elements);
        let nested: SchemaPath = "complexType/**/element[@name='c']".parse().unwrap();
        assert_eq!(nested.find(&tree, schema), vec![elements[2]]);
        assert!(nested.matches(&tree, schema, elements[2]));
        assert!(!nested.matches(&tree, schema, elements[0]));

        let everything = SchemaPath::parse("complexType[@name='Bar']/**").unwrap();
        assert_eq!(everything.find(&tree, schema).len(), 2);
    }

    #[test]
    fn test_position_predicate() {
        let (tree, schema, elements) = sample();
        let second = SchemaPath::parse("*/sequence/element[2]").unwrap();
        assert_eq!(second.find(&tree, schema), vec![elements[1]]);
        let first_each = SchemaPath::parse("complexType/sequence/*[1]").unwrap();
        assert_eq!(first_each.find(&tree, schema), vec![elements[0], elements[2]]);
        let named = SchemaPath::parse("*[@name][3]").unwrap();
        assert_eq!(named.find(&tree, schema), vec![elements[3]]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(SchemaPath::parse(""), Err(XPathParseError::Empty));
        assert!(matches!(
            SchemaPath::parse("complexTyp/element"),
            Err(XPathParseError::InvalidStep(_))
        ));
        assert_eq!(SchemaPath::parse("element[@name='a'"), Err(XPathParseError::UnexpectedEnd));
        assert_eq!(SchemaPath::parse("element/"), Err(XPathParseError::UnexpectedEnd));
        assert!(SchemaPath::parse("/schema").is_err());
        assert!(SchemaPath::parse("element[0]").is_err());
        assert!(SchemaPath::parse("element[@name=a]").is_err());
        assert!(SchemaPath::parse("element[last()]").is_err());
    }

    #[test]
    fn test_quoted_slash_in_predicate() {
        let mut tree = SchemaTree::new();
        let schema = tree.create(K::Schema);
        let import = tree.create_child(schema, K::Import).unwrap();
        tree.node_mut(import).set_attribute("namespace", "http://example.com/a/b");
        let path = SchemaPath::parse(r#"import[@namespace="http://example.com/a/b"]"#).unwrap();
        assert_eq!(path.find(&tree, schema), vec![import]);
    }
}
