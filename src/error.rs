//! Error types for xmlschema-om
//!
//! Data problems found while checking a schema are reported as
//! [`Diagnostic`](crate::validators::Diagnostic)s, not as errors. The types
//! here cover failures that stop an operation: unreadable or malformed
//! documents, resolver failures, exceeded limits, and caller contract
//! violations on the tree API.

use std::fmt;
use thiserror::Error;

/// Result type alias using the crate [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xmlschema-om operations
#[derive(Error, Debug)]
pub enum Error {
    /// Schema document could not be turned into a component tree
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(String),

    /// Namespace error
    #[error("namespace error: {0}")]
    Namespace(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// A child of the wrong kind was offered to a filtered view
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Index past the end of a filtered view
    #[error("index {index} out of bounds for view of length {len}")]
    IndexOutOfBounds {
        /// Offending index
        index: usize,
        /// Length of the view at the time of the call
        len: usize,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML well-formedness error reported by the reader
    #[error("XML error: {0}")]
    Xml(String),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Error raised while turning an XSD document into components
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Location in the schema document (`name:line`)
    pub location: Option<String>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref loc) = self.location {
            write!(f, " at {}", loc)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}
