//! XPath support for XML Schema
//!
//! Two small path languages live here:
//!
//! - [`IdentityPath`]: the restricted XPath subset allowed in the `xpath`
//!   attribute of `selector` and `field`. It is only parsed and checked;
//!   instance documents are out of scope.
//! - [`SchemaPath`]: a location path over the component tree itself, used to
//!   pick components by kind and attribute (`complexType[@name='Foo']/sequence`).

mod matcher;
mod selectors;

pub use matcher::{Axis, KindTest, MatchStep, Predicate, SchemaPath};
pub use selectors::{split_alternatives, IdentityPath, PathKind, PathStep, PathStepKind};

use thiserror::Error;

/// Error raised while parsing a path expression
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XPathParseError {
    /// Nothing to parse
    #[error("empty path expression")]
    Empty,

    /// Axis outside the supported subset
    #[error("axis '{0}' is not allowed")]
    UnknownAxis(String),

    /// Step that is not a name test or `.`
    #[error("invalid step '{0}'")]
    InvalidStep(String),

    /// Malformed expression
    #[error("invalid syntax: {0}")]
    InvalidSyntax(String),

    /// Expression ends where a step or a closing bracket was expected
    #[error("unexpected end of expression")]
    UnexpectedEnd,
}
