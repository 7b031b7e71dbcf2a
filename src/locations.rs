//! Resource location resolution
//!
//! `schemaLocation` attributes are relative to the document that carries
//! them. This module turns a (location, base) pair into an absolute
//! location that a resolver can load and use as a canonical id.

use crate::error::Result;
use std::path::{Path, PathBuf};
use url::Url;

/// Resource location - can be a URL, file path, or string identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// File system path
    Path(PathBuf),
    /// URL (http, https, ftp, etc.)
    Url(Url),
    /// String identifier (for in-memory resources)
    String(String),
}

impl Location {
    /// Create a location from a string (auto-detect type)
    pub fn from_str(s: &str) -> Result<Self> {
        if let Ok(url) = Url::parse(s) {
            if url.scheme() == "file" {
                if let Ok(path) = url.to_file_path() {
                    return Ok(Location::Path(path));
                }
            } else if url.scheme().len() > 1 {
                // Single-letter schemes are Windows drive letters.
                return Ok(Location::Url(url));
            }
        }

        let path = PathBuf::from(s);
        if path.exists() || path.is_absolute() || s.starts_with('.') || s.ends_with(".xsd") {
            return Ok(Location::Path(path));
        }

        Ok(Location::String(s.to_string()))
    }

    /// Resolve `reference` against this location
    ///
    /// Absolute references are returned as they are. Relative references
    /// are joined to the directory of a path, or to a URL with the usual
    /// RFC 3986 rules. String identifiers are joined lexically.
    pub fn join(&self, reference: &str) -> Result<Location> {
        if let Ok(url) = Url::parse(reference) {
            if url.scheme().len() > 1 {
                return Location::from_str(reference);
            }
        }
        match self {
            Location::Path(base) => {
                let relative = Path::new(reference);
                if relative.is_absolute() {
                    return Ok(Location::Path(relative.to_path_buf()));
                }
                let dir = base.parent().unwrap_or_else(|| Path::new(""));
                Ok(Location::Path(normalize_path(&dir.join(relative))))
            }
            Location::Url(base) => Ok(Location::Url(base.join(reference)?)),
            Location::String(base) => {
                let joined = match base.rfind('/') {
                    Some(pos) => format!("{}{}", &base[..=pos], reference),
                    None => reference.to_string(),
                };
                Ok(Location::String(joined))
            }
        }
    }

    /// Get the location as a string
    pub fn as_str(&self) -> String {
        match self {
            Location::Path(p) => p.to_string_lossy().to_string(),
            Location::Url(u) => u.to_string(),
            Location::String(s) => s.clone(),
        }
    }

    /// Check if this is a remote location (URL)
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Url(_))
    }

    /// Check if this is a local file
    pub fn is_file(&self) -> bool {
        matches!(self, Location::Path(_))
    }
}

/// Collapse `.` and `..` components without touching the file system
fn normalize_path(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_url() {
        let loc = Location::from_str("http://example.com/schema.xsd").unwrap();
        assert!(matches!(loc, Location::Url(_)));
        assert!(loc.is_remote());
    }

    #[test]
    fn test_location_from_path() {
        let loc = Location::from_str("/tmp/schema.xsd").unwrap();
        assert!(matches!(loc, Location::Path(_)));
        assert!(loc.is_file());
    }

    #[test]
    fn test_location_as_str() {
        let loc = Location::String("test".to_string());
        assert_eq!(loc.as_str(), "test");
    }

    #[test]
    fn test_join_path() {
        let base = Location::Path(PathBuf::from("/schemas/main/root.xsd"));
        let joined = base.join("../common/types.xsd").unwrap();
        assert_eq!(joined, Location::Path(PathBuf::from("/schemas/common/types.xsd")));
    }

    #[test]
    fn test_join_url() {
        let base = Location::from_str("http://example.com/a/b.xsd").unwrap();
        let joined = base.join("c.xsd").unwrap();
        assert_eq!(joined.as_str(), "http://example.com/a/c.xsd");
    }

    #[test]
    fn test_join_string_identifier() {
        let base = Location::String("mem/root".to_string());
        assert_eq!(base.join("child").unwrap().as_str(), "mem/child");
        let flat = Location::String("root".to_string());
        assert_eq!(flat.join("child").unwrap().as_str(), "child");
    }
}
