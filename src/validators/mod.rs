//! XML Schema validators
//!
//! The schema object model and its two-pass checker. Every XSD element of
//! a loaded document becomes a component in a [`SchemaTree`]; the
//! [`ValidationContext`] decodes, registers and resolves them and collects
//! [`Diagnostics`].
//!
//! One module per family of components, each with a `prevalidate` step
//! (attribute checks, decoding, global registration) and, where needed, a
//! `validate` step (cross-reference resolution).

// Foundation
pub mod base;
pub mod diagnostics;
pub mod helpers;
pub mod kinds;
pub mod segments;
pub mod tree;

// Type system
pub mod builtins;
pub mod facets;
pub mod simple_types;
pub mod attributes;
pub mod notations;

// Complex structures
pub mod particles;
pub mod wildcards;
pub mod groups;
pub mod complex_types;
pub mod elements;

// Schema documents
pub mod annotations;
pub mod identities;
pub mod globals;
pub mod imports;
pub mod schemas;
mod parsing;
pub mod validation;

// Re-exports
pub use base::{ChildRef, ComponentData, ComponentId, ComponentState, SchemaNode, TypeRef};
pub use builtins::BuiltinType;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use globals::{DefinitionCategory, NameRegister};
pub use helpers::{DerivationSet, Form};
pub use kinds::{KindMask, SchemaKind};
pub use particles::Occurs;
pub use segments::Segment;
pub use tree::SchemaTree;
pub use validation::{ValidationContext, ValidationOptions};
