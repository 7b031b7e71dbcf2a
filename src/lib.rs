//! # xmlschema-om
//!
//! An XML Schema (XSD 1.0) object model with structural validation.
//!
//! Schema documents are parsed into a tree of typed components. A
//! [`ValidationContext`] then runs two passes over every document reachable
//! from the roots: the first decodes attributes and registers global
//! definitions per namespace, the second resolves references between
//! components (across `import`, `include` and `redefine`). Problems are
//! reported as ordered [`Diagnostic`]s instead of failing the run.
//!
//! ## Features
//!
//! - Component arena with per-kind child layouts
//! - Two-pass validation with chameleon includes and redefinitions
//! - Pluggable document resolution (files, URLs, in-memory sets)
//! - Identity-constraint XPath checks and a path matcher over components
//! - Protection against oversized or deeply nested documents
//!
//! ## Example
//!
//! ```rust
//! use xmlschema_om::loaders::MemoryResolver;
//! use xmlschema_om::namespaces::QName;
//! use xmlschema_om::validators::ValidationContext;
//!
//! let mut ctx = ValidationContext::new(MemoryResolver::new());
//! ctx.add_schema_str(
//!     "order.xsd",
//!     r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
//!          <xs:element name="order" type="xs:string"/>
//!        </xs:schema>"#,
//! )?;
//! assert!(ctx.validate().is_empty());
//! assert!(ctx.find_element(&QName::local("order")).is_some());
//! # Ok::<(), xmlschema_om::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;
pub mod logging;

// Names and namespaces
pub mod namespaces;
pub mod names;
pub mod locations;

// Resource loading
pub mod loaders;
pub mod documents;

// Schema object model
pub mod validators;

// Path expressions
pub mod xpath;

// Re-exports for convenience
pub use error::{Error, Result};
pub use validators::{Diagnostic, Diagnostics, SchemaTree, Severity, ValidationContext};

/// Version of the xmlschema-om library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
