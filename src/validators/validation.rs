//! Validation context
//!
//! A [`ValidationContext`] owns everything a validation run touches: the
//! component arena holding every loaded schema document, the resolver
//! that supplies documents for `import` / `include` / `redefine`, the
//! per-namespace name registers and the diagnostics.
//!
//! [`ValidationContext::validate`] runs two passes. The prevalidate pass
//! walks a worklist of schema documents seeded with the roots; references
//! resolved on the way append their targets to the queue, and each
//! document is processed once per run. The validate pass then resolves
//! cross-references over the same ordered set of documents.

use super::base::{ComponentData, ComponentId, ComponentState, TypeRef};
use super::builtins::lookup_builtin;
use super::diagnostics::{Diagnostic, Diagnostics, Severity};
use super::globals::{DefinitionCategory, NameRegister};
use super::helpers::{parse_boolean, DerivationSet, Form};
use super::kinds::SchemaKind;
use super::particles::{parse_occurs, Occurs};
use super::schemas::{SchemaData, SchemaSource};
use super::tree::SchemaTree;
use super::{
    annotations, attributes, complex_types, elements, facets, groups, identities, imports,
    notations, parsing, schemas, simple_types, wildcards,
};
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::loaders::{FileResolver, Loader, ResolvedSchema, SchemaResolver};
use crate::logging::{Pass, TracingLogger, ValidationEvent, ValidationLogger};
use crate::names::{is_valid_ncname, is_valid_qname, split_qname};
use crate::namespaces::{QName, XSD_NAMESPACE};
use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;
use std::fmt;

use SchemaKind as K;

/// Options of a validation context
#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    /// Resource limits for documents and components
    pub limits: Limits,
    /// Report foreign attributes on facets and `anyAttribute`
    pub strict_foreign_attributes: bool,
    /// Let the default file resolver fetch remote URLs
    pub allow_remote: bool,
}

impl ValidationOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the resource limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Report foreign-namespace attributes on facets and `anyAttribute`
    pub fn with_strict_foreign_attributes(mut self, strict: bool) -> Self {
        self.strict_foreign_attributes = strict;
        self
    }

    /// Allow remote documents
    pub fn with_allow_remote(mut self, allow: bool) -> Self {
        self.allow_remote = allow;
        self
    }
}

/// Schema documents, name registers and diagnostics of one validation
pub struct ValidationContext {
    tree: SchemaTree,
    resolver: Box<dyn SchemaResolver>,
    options: ValidationOptions,
    logger: Box<dyn ValidationLogger>,
    /// Canonical document id to root `schema` component
    schemas: IndexMap<String, ComponentId>,
    roots: Vec<ComponentId>,
    namespaces: IndexMap<Option<String>, NameRegister>,
    redefinitions: IndexMap<Option<String>, NameRegister>,
    ids: IndexMap<(ComponentId, String), ComponentId>,
    processed: IndexSet<ComponentId>,
    queue: VecDeque<ComponentId>,
    diagnostics: Diagnostics,
}

impl ValidationContext {
    /// Create a context reading documents through `resolver`
    pub fn new(resolver: impl SchemaResolver + 'static) -> Self {
        Self {
            tree: SchemaTree::new(),
            resolver: Box::new(resolver),
            options: ValidationOptions::default(),
            logger: Box::new(TracingLogger),
            schemas: IndexMap::new(),
            roots: Vec::new(),
            namespaces: IndexMap::new(),
            redefinitions: IndexMap::new(),
            ids: IndexMap::new(),
            processed: IndexSet::new(),
            queue: VecDeque::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Create a context reading files (and, if allowed, URLs)
    pub fn from_options(options: ValidationOptions) -> Self {
        let loader = Loader::new()
            .with_limits(options.limits.clone())
            .with_allow_remote(options.allow_remote);
        Self::new(FileResolver::new().with_loader(loader)).with_options(options)
    }

    /// Replace the options
    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the event logger
    pub fn with_logger(mut self, logger: impl ValidationLogger + 'static) -> Self {
        self.logger = Box::new(logger);
        self
    }

    /// Options in effect
    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Component arena
    pub fn tree(&self) -> &SchemaTree {
        &self.tree
    }

    /// Mutable component arena, for building or editing schemas
    pub fn tree_mut(&mut self) -> &mut SchemaTree {
        &mut self.tree
    }

    /// Diagnostics of the last run
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Check whether the last run reported no error and no fatal
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    /// Loaded documents: canonical id and root component, in load order
    pub fn schemas(&self) -> impl Iterator<Item = (&str, ComponentId)> {
        self.schemas.iter().map(|(id, root)| (id.as_str(), *root))
    }

    /// Root component of the document with canonical id `id`
    pub fn schema_for_id(&self, id: &str) -> Option<ComponentId> {
        self.schemas.get(id).copied()
    }

    /// Documents validation starts from
    pub fn roots(&self) -> &[ComponentId] {
        &self.roots
    }

    /// Register of the global definitions of `namespace` after a run
    pub fn namespace_register(&self, namespace: Option<&str>) -> Option<&NameRegister> {
        self.namespaces.get(&namespace.map(str::to_string))
    }

    /// Parse `content` as the document `id` and add it as a root
    ///
    /// A document already loaded under the same id is not parsed again.
    pub fn add_schema_str(&mut self, id: &str, content: &str) -> Result<ComponentId> {
        let root = self.attach_document(ResolvedSchema {
            id: id.to_string(),
            name: id.to_string(),
            content: content.to_string(),
        })?;
        self.add_root(root);
        Ok(root)
    }

    /// Resolve `location` with the resolver and add the document as a root
    pub fn load_schema(&mut self, location: &str, namespace: Option<&str>) -> Result<ComponentId> {
        let resolved = self.resolver.resolve(location, namespace, None)?;
        let root = self.attach_document(resolved)?;
        self.add_root(root);
        Ok(root)
    }

    /// Add a `schema` component built through the tree API as a root
    pub fn add_schema_root(&mut self, root: ComponentId, id: &str) -> Result<()> {
        let node = self
            .tree
            .get(root)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown component {}", root)))?;
        if node.kind != K::Schema || node.parent.is_some() {
            return Err(Error::InvalidArgument(format!(
                "component {} is not a detached <schema>",
                root
            )));
        }
        if let Some(&existing) = self.schemas.get(id) {
            if existing != root {
                return Err(Error::InvalidArgument(format!(
                    "a schema with id '{}' is already loaded",
                    id
                )));
            }
        }
        self.tree.node_mut(root).data = ComponentData::Schema(Box::new(SchemaData::new(
            SchemaSource::new(id, id),
        )));
        self.schemas.insert(id.to_string(), root);
        self.logger.event(&ValidationEvent::SchemaLoaded {
            id: id.to_string(),
            component: root,
        });
        self.add_root(root);
        Ok(())
    }

    fn add_root(&mut self, root: ComponentId) {
        if !self.roots.contains(&root) {
            self.roots.push(root);
        }
    }

    fn attach_document(&mut self, resolved: ResolvedSchema) -> Result<ComponentId> {
        if let Some(&root) = self.schemas.get(&resolved.id) {
            return Ok(root);
        }
        self.options
            .limits
            .check_schema_documents(self.schemas.len() + 1)?;
        let mark = self.tree.len();
        let root = parsing::build_schema(
            &mut self.tree,
            &resolved.content,
            &resolved.name,
            &self.options.limits,
        )?;
        if let Err(err) = self.options.limits.check_schema_components(self.tree.len()) {
            self.tree.truncate(mark);
            return Err(err);
        }
        self.tree.node_mut(root).data = ComponentData::Schema(Box::new(SchemaData::new(
            SchemaSource::new(&resolved.id, &resolved.name),
        )));
        self.schemas.insert(resolved.id.clone(), root);
        self.logger.event(&ValidationEvent::SchemaLoaded {
            id: resolved.id,
            component: root,
        });
        Ok(root)
    }

    /// Check every schema reachable from the roots
    ///
    /// Clears the diagnostics and every per-run state first, so running it
    /// again on an unchanged tree reports the same diagnostics.
    pub fn validate(&mut self) -> &Diagnostics {
        self.reset_run();

        self.logger.event(&ValidationEvent::PassStarted(Pass::Prevalidate));
        self.queue.extend(self.roots.iter().copied());
        let mut visited = 0;
        while let Some(schema) = self.queue.pop_front() {
            if !self.processed.insert(schema) {
                continue;
            }
            visited += self.run_pass(Pass::Prevalidate, schema);
        }
        self.logger.event(&ValidationEvent::PassFinished {
            pass: Pass::Prevalidate,
            visited,
        });

        self.logger.event(&ValidationEvent::PassStarted(Pass::Validate));
        let order: Vec<ComponentId> = self.processed.iter().copied().collect();
        let mut visited = 0;
        for schema in order {
            visited += self.run_pass(Pass::Validate, schema);
        }
        self.logger.event(&ValidationEvent::PassFinished {
            pass: Pass::Validate,
            visited,
        });

        &self.diagnostics
    }

    fn reset_run(&mut self) {
        self.diagnostics.clear();
        self.namespaces.clear();
        self.redefinitions.clear();
        self.ids.clear();
        self.processed.clear();
        self.queue.clear();
        for index in 0..self.tree.len() {
            let node = self.tree.node_mut(ComponentId::from_index(index));
            node.state = ComponentState::Created;
            node.data = match std::mem::take(&mut node.data) {
                ComponentData::Schema(mut data) => {
                    data.reset();
                    ComponentData::Schema(data)
                }
                _ => ComponentData::None,
            };
        }
    }

    /// Visit `schema` and its descendants in document order
    ///
    /// Subtrees of skipped components are not entered.
    fn run_pass(&mut self, pass: Pass, schema: ComponentId) -> usize {
        let mut visited = 0;
        let mut stack = vec![schema];
        while let Some(id) = stack.pop() {
            if self.tree.node(id).is_skipped() {
                continue;
            }
            let kind = self.tree.kind(id);
            visited += 1;
            self.logger.event(&ValidationEvent::ComponentVisited {
                pass,
                component: id,
                kind,
            });
            match pass {
                Pass::Prevalidate => self.prevalidate_component(id, kind),
                Pass::Validate => self.validate_component(id, kind),
            }

            let node = self.tree.node_mut(id);
            if node.is_skipped() {
                continue;
            }
            node.state = match pass {
                Pass::Prevalidate => ComponentState::Prevalidated,
                Pass::Validate => ComponentState::Validated,
            };
            stack.extend(self.tree.children(id).iter().rev().map(|c| c.id));
        }
        visited
    }

    fn prevalidate_component(&mut self, id: ComponentId, kind: SchemaKind) {
        match kind {
            K::Schema => schemas::prevalidate(self, id),
            K::Import | K::Include | K::Redefine => imports::prevalidate(self, id),
            K::Annotation | K::Appinfo | K::Documentation => annotations::prevalidate(self, id),
            K::Notation => notations::prevalidate(self, id),
            K::Element => elements::prevalidate(self, id),
            K::Attribute => attributes::prevalidate(self, id),
            K::AttributeGroup => attributes::prevalidate_group(self, id),
            K::ComplexType => complex_types::prevalidate(self, id),
            K::SimpleContent | K::ComplexContent => complex_types::prevalidate_content(self, id),
            K::Extension | K::Restriction if self.is_simple_derivation(id) => {
                simple_types::prevalidate_restriction(self, id)
            }
            K::Extension | K::Restriction => complex_types::prevalidate_derivation(self, id),
            K::SimpleType => simple_types::prevalidate(self, id),
            K::List => simple_types::prevalidate_list(self, id),
            K::Union => simple_types::prevalidate_union(self, id),
            K::All | K::Choice | K::Sequence => groups::prevalidate_compositor(self, id),
            K::Group => groups::prevalidate(self, id),
            K::Any | K::AnyAttribute => wildcards::prevalidate(self, id),
            K::Key | K::Keyref | K::Unique => identities::prevalidate(self, id),
            K::Selector | K::Field => identities::prevalidate_path(self, id),
            kind if kind.is_facet() => facets::prevalidate(self, id),
            _ => {}
        }
    }

    fn validate_component(&mut self, id: ComponentId, kind: SchemaKind) {
        match kind {
            K::Import | K::Include | K::Redefine => imports::validate(self, id),
            K::Element => elements::validate(self, id),
            K::Attribute => attributes::validate(self, id),
            K::AttributeGroup => attributes::validate_group(self, id),
            K::ComplexType => complex_types::validate(self, id),
            K::Extension | K::Restriction if self.is_simple_derivation(id) => {
                simple_types::validate_restriction(self, id)
            }
            K::Extension | K::Restriction => complex_types::validate_derivation(self, id),
            K::List => simple_types::validate_list(self, id),
            K::Union => simple_types::validate_union(self, id),
            K::Group => groups::validate(self, id),
            K::Keyref => identities::validate(self, id),
            _ => {}
        }
    }

    /// Check whether a derivation belongs to a `simpleType`
    pub(crate) fn is_simple_derivation(&self, id: ComponentId) -> bool {
        match self.tree.parent(id) {
            Some(parent) => self.tree.kind(parent) == K::SimpleType,
            None => true,
        }
    }

    // Reporting

    /// Record a diagnostic on `id`; a fatal one also skips the component
    pub(crate) fn report(&mut self, severity: Severity, id: ComponentId, message: impl Into<String>) {
        let schema = self.schema_data(id).map(|data| data.source.name.clone());
        let line = self.tree.node(id).line;
        let diagnostic = Diagnostic::new(severity, message)
            .with_component(id)
            .with_location(schema, line);
        self.logger.event(&ValidationEvent::Diagnostic(diagnostic.clone()));
        self.diagnostics.push(diagnostic);
        if severity == Severity::Fatal {
            self.tree.node_mut(id).state = ComponentState::Skipped;
        }
    }

    pub(crate) fn warning(&mut self, id: ComponentId, message: impl Into<String>) {
        self.report(Severity::Warning, id, message);
    }

    pub(crate) fn error(&mut self, id: ComponentId, message: impl Into<String>) {
        self.report(Severity::Error, id, message);
    }

    pub(crate) fn fatal(&mut self, id: ComponentId, message: impl Into<String>) {
        self.report(Severity::Fatal, id, message);
    }

    // Attribute decoding

    /// Report attributes outside `legal` and duplicate `id` values
    pub(crate) fn check_attributes(&mut self, id: ComponentId, legal: &[&str]) {
        let node = self.tree.node(id);
        let kind = node.kind;
        let strict = self.options.strict_foreign_attributes
            && (kind.is_facet() || kind == K::AnyAttribute);

        let mut problems: Vec<String> = node
            .undefined_attributes(legal)
            .into_iter()
            .map(|name| format!("undefined attribute '{}' in <{}>", name, kind))
            .collect();
        for extra in &node.extra_attributes {
            if extra.namespace.as_deref() == Some(XSD_NAMESPACE) {
                problems.push(format!("undefined attribute '{}' in <{}>", extra.qname(), kind));
            } else if strict {
                problems.push(format!(
                    "foreign attribute '{}' is not allowed in <{}>",
                    extra.qname(),
                    kind
                ));
            }
        }
        let id_value = node.attribute("id").map(|v| v.trim().to_string());

        for problem in problems {
            self.error(id, problem);
        }
        let Some(value) = id_value else { return };
        if !is_valid_ncname(&value) {
            self.error(id, format!("invalid id '{}': not an NCName", value));
            return;
        }
        let Some(schema) = self.tree.schema_of(id) else { return };
        let key = (schema, value);
        if self.ids.contains_key(&key) {
            self.error(id, format!("duplicate id '{}'", key.1));
        } else {
            self.ids.insert(key, id);
        }
    }

    /// Unqualified attribute value
    pub(crate) fn attribute(&self, id: ComponentId, name: &str) -> Option<String> {
        self.tree.node(id).attribute(name).map(str::to_string)
    }

    /// Attribute value, reporting its absence
    pub(crate) fn require_attribute(&mut self, id: ComponentId, name: &str) -> Option<String> {
        let value = self.attribute(id, name);
        if value.is_none() {
            let kind = self.tree.kind(id);
            self.error(id, format!("missing required attribute '{}' in <{}>", name, kind));
        }
        value
    }

    /// Report each of `names` present on `id`
    pub(crate) fn forbid_attributes(&mut self, id: ComponentId, names: &[&str], reason: &str) {
        for name in names {
            if self.tree.node(id).has_attribute(name) {
                self.error(id, format!("attribute '{}' is not allowed {}", name, reason));
            }
        }
    }

    /// `name` attribute, checked to be an NCName
    pub(crate) fn decode_name(&mut self, id: ComponentId) -> Option<String> {
        let name = self.attribute(id, "name")?;
        let name = name.trim();
        if is_valid_ncname(name) {
            Some(name.to_string())
        } else {
            self.error(id, format!("invalid name '{}': not an NCName", name));
            None
        }
    }

    /// Attribute holding a QName, resolved in the scope of `id`
    pub(crate) fn decode_qname(&mut self, id: ComponentId, attribute: &str) -> Option<QName> {
        let value = self.attribute(id, attribute)?;
        match self.resolve_qname(id, &value) {
            Ok(qname) => Some(qname),
            Err(message) => {
                self.error(id, format!("attribute '{}': {}", attribute, message));
                None
            }
        }
    }

    /// Boolean attribute
    pub(crate) fn decode_boolean(&mut self, id: ComponentId, attribute: &str) -> Option<bool> {
        let value = self.attribute(id, attribute)?;
        let parsed = parse_boolean(&value);
        if parsed.is_none() {
            self.error(
                id,
                format!("attribute '{}': '{}' is not a boolean", attribute, value),
            );
        }
        parsed
    }

    /// `minOccurs` / `maxOccurs`; invalid bounds fall back to once
    pub(crate) fn decode_occurs(&mut self, id: ComponentId) -> Occurs {
        let node = self.tree.node(id);
        match parse_occurs(node.attribute("minOccurs"), node.attribute("maxOccurs")) {
            Ok(occurs) => occurs,
            Err(message) => {
                self.error(id, message);
                Occurs::once()
            }
        }
    }

    /// `form`-like attribute
    pub(crate) fn decode_form(&mut self, id: ComponentId, attribute: &str) -> Option<Form> {
        let value = self.attribute(id, attribute)?;
        let form = Form::from_str(&value);
        if form.is_none() {
            self.error(
                id,
                format!(
                    "attribute '{}': wrong value '{}', expected 'qualified' or 'unqualified'",
                    attribute, value
                ),
            );
        }
        form
    }

    /// `block` / `final`-like attribute
    pub(crate) fn decode_derivation_set(
        &mut self,
        id: ComponentId,
        attribute: &str,
        allowed: &[&str],
    ) -> Option<DerivationSet> {
        let value = self.attribute(id, attribute)?;
        match DerivationSet::parse(&value, allowed) {
            Ok(set) => Some(set),
            Err(message) => {
                self.error(id, format!("attribute '{}': {}", attribute, message));
                None
            }
        }
    }

    // Names and namespaces

    /// Decoded data of the document holding `id`
    pub(crate) fn schema_data(&self, id: ComponentId) -> Option<&SchemaData> {
        self.tree
            .schema_of(id)
            .and_then(|schema| self.tree.node(schema).schema_data())
    }

    /// Namespace the global definitions of the document holding `id` live in
    pub fn effective_namespace(&self, id: ComponentId) -> Option<String> {
        self.schema_data(id)
            .and_then(|data| data.effective_namespace.clone())
    }

    /// Name of the document holding `id`, for messages
    pub(crate) fn schema_name(&self, id: ComponentId) -> String {
        self.schema_data(id)
            .map(|data| data.source.name.clone())
            .unwrap_or_else(|| "<detached>".to_string())
    }

    /// Resolve a QName value written on `id`
    ///
    /// Prefixes are looked up through the namespace declarations in
    /// scope. An unprefixed name takes the default namespace; inside a
    /// chameleon document without one it takes the namespace the document
    /// was included into.
    pub fn resolve_qname(&self, id: ComponentId, value: &str) -> std::result::Result<QName, String> {
        let value = value.trim();
        if !is_valid_qname(value) {
            return Err(format!("'{}' is not a valid QName", value));
        }
        match split_qname(value) {
            (Some(prefix), local) => match self.tree.resolve_prefix(id, Some(prefix)) {
                Some(uri) => Ok(QName::namespaced(uri, local)),
                None => Err(format!("unbound namespace prefix '{}' in '{}'", prefix, value)),
            },
            (None, local) => {
                if let Some(uri) = self
                    .tree
                    .resolve_prefix(id, None)
                    .filter(|uri| !uri.is_empty())
                {
                    return Ok(QName::namespaced(uri, local));
                }
                let chameleon = self
                    .schema_data(id)
                    .filter(|data| data.target_namespace.is_none())
                    .and_then(|data| data.effective_namespace.clone());
                Ok(QName::new(chameleon, local))
            }
        }
    }

    /// Register a global definition
    ///
    /// Children of `redefine` go to the redefinition register of their
    /// namespace; everything else is checked against its own document
    /// first, then against the whole namespace.
    pub(crate) fn register_global(
        &mut self,
        id: ComponentId,
        category: DefinitionCategory,
        qname: QName,
    ) {
        let redefining = self
            .tree
            .parent(id)
            .is_some_and(|parent| self.tree.kind(parent) == K::Redefine);
        if redefining {
            let register = self.redefinitions.entry(qname.namespace.clone()).or_default();
            if register.register(category, qname.clone(), id).is_err() {
                self.error(id, format!("duplicate redefinition of {} '{}'", category, qname));
            }
            return;
        }

        if let Some(schema) = self.tree.schema_of(id) {
            if let Some(data) = self.tree.node_mut(schema).schema_data_mut() {
                if data.register.register(category, qname.clone(), id).is_err() {
                    self.error(id, format!("duplicate {} '{}'", category, qname));
                    return;
                }
            }
        }

        let register = self.namespaces.entry(qname.namespace.clone()).or_default();
        if let Err(existing) = register.register(category, qname.clone(), id) {
            let other = self.schema_name(existing);
            self.error(
                id,
                format!("{} '{}' is already defined in {}", category, qname, other),
            );
        }
    }

    fn lookup(&self, category: DefinitionCategory, name: &QName) -> Option<ComponentId> {
        self.redefinitions
            .get(&name.namespace)
            .and_then(|register| register.lookup(category, name))
            .or_else(|| self.lookup_original(category, name))
    }

    fn lookup_original(&self, category: DefinitionCategory, name: &QName) -> Option<ComponentId> {
        self.namespaces
            .get(&name.namespace)
            .and_then(|register| register.lookup(category, name))
    }

    /// Definition that overrides an original one, if any
    pub fn redefinition_of(&self, category: DefinitionCategory, name: &QName) -> Option<ComponentId> {
        self.redefinitions
            .get(&name.namespace)
            .and_then(|register| register.lookup(category, name))
    }

    /// Definition as seen from `from`
    ///
    /// Inside a redefinition, a reference to the name being redefined
    /// denotes the original definition.
    pub(crate) fn resolve_reference(
        &self,
        from: ComponentId,
        category: DefinitionCategory,
        name: &QName,
    ) -> Option<ComponentId> {
        let redefinition = std::iter::once(from)
            .chain(self.tree.ancestors(from))
            .find(|&a| {
                self.tree
                    .parent(a)
                    .is_some_and(|parent| self.tree.kind(parent) == K::Redefine)
            });
        if let Some(definition) = redefinition {
            let same_category = DefinitionCategory::for_kind(self.tree.kind(definition)) == Some(category);
            let same_name = self.tree.node(definition).name().map(str::trim) == Some(name.local_name.as_str())
                && self.effective_namespace(definition) == name.namespace;
            if same_category && same_name {
                return self.lookup_original(category, name);
            }
        }
        self.lookup(category, name)
    }

    /// Type as seen from `from`
    pub(crate) fn resolve_type(&self, from: ComponentId, name: &QName) -> Option<TypeRef> {
        if name.is_xsd() {
            return lookup_builtin(name).map(TypeRef::Builtin);
        }
        self.resolve_reference(from, DefinitionCategory::Type, name)
            .map(TypeRef::Defined)
    }

    /// Look up a type definition; XSD names give built-in types
    pub fn find_type(&self, name: &QName) -> Option<TypeRef> {
        if name.is_xsd() {
            return lookup_builtin(name).map(TypeRef::Builtin);
        }
        self.lookup(DefinitionCategory::Type, name).map(TypeRef::Defined)
    }

    /// Look up a global element declaration
    pub fn find_element(&self, name: &QName) -> Option<ComponentId> {
        self.lookup(DefinitionCategory::Element, name)
    }

    /// Look up a global attribute declaration
    pub fn find_attribute(&self, name: &QName) -> Option<ComponentId> {
        self.lookup(DefinitionCategory::Attribute, name)
    }

    /// Look up a named model group
    pub fn find_group(&self, name: &QName) -> Option<ComponentId> {
        self.lookup(DefinitionCategory::Group, name)
    }

    /// Look up a named attribute group
    pub fn find_attribute_group(&self, name: &QName) -> Option<ComponentId> {
        self.lookup(DefinitionCategory::AttributeGroup, name)
    }

    /// Look up a notation
    pub fn find_notation(&self, name: &QName) -> Option<ComponentId> {
        self.lookup(DefinitionCategory::Notation, name)
    }

    /// Look up a key, keyref or unique constraint
    pub fn find_identity_constraint(&self, name: &QName) -> Option<ComponentId> {
        self.lookup(DefinitionCategory::IdentityConstraint, name)
    }

    // Document references

    /// Resolve a document referenced from the document holding `from`
    pub(crate) fn load_referenced(
        &mut self,
        from: ComponentId,
        location: &str,
        namespace: Option<&str>,
    ) -> Result<ComponentId> {
        let base = self.schema_data(from).map(|data| data.source.id.clone());
        let resolved = self.resolver.resolve(location, namespace, base.as_deref())?;
        self.attach_document(resolved)
    }

    /// Ask the resolver for a document defining `namespace`
    pub(crate) fn load_namespace(&mut self, namespace: Option<&str>) -> Result<Option<ComponentId>> {
        match self.resolver.resolve_namespace(namespace)? {
            Some(resolved) => self.attach_document(resolved).map(Some),
            None => Ok(None),
        }
    }

    /// First loaded document whose namespace is `namespace`
    pub(crate) fn schema_with_namespace(&self, namespace: Option<&str>) -> Option<ComponentId> {
        self.schemas.values().copied().find(|&root| {
            let node = self.tree.node(root);
            let declared = node
                .attribute("targetNamespace")
                .map(str::trim)
                .filter(|ns| !ns.is_empty());
            let effective = node
                .schema_data()
                .and_then(|data| data.effective_namespace.as_deref());
            declared == namespace || (effective.is_some() && effective == namespace)
        })
    }

    /// Queue a document for this run
    pub(crate) fn enqueue(&mut self, root: ComponentId) {
        if !self.processed.contains(&root) {
            self.queue.push_back(root);
        }
    }

    /// Check whether a document was already prevalidated in this run
    pub(crate) fn is_processed(&self, root: ComponentId) -> bool {
        self.processed.contains(&root)
    }
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self::from_options(ValidationOptions::default())
    }
}

impl fmt::Debug for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationContext")
            .field("options", &self.options)
            .field("schemas", &self.schemas)
            .field("roots", &self.roots)
            .field("components", &self.tree.len())
            .field("diagnostics", &self.diagnostics.len())
            .finish_non_exhaustive()
    }
}
