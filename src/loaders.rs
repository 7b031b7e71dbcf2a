//! Resource loading utilities
//!
//! Schema documents reach the validation context through a
//! [`SchemaResolver`]. A resolver maps the `(schemaLocation, namespace)` pair
//! of an `import`, `include` or `redefine` to a canonical id plus the
//! document text. Two requests that produce the same id denote the same
//! schema and are parsed once.

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::locations::Location;
use indexmap::IndexMap;
use std::fs;
use std::path::Path;
#[cfg(feature = "remote")]
use std::time::Duration;

#[cfg(feature = "remote")]
const REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

/// A schema document handed back by a resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchema {
    /// Canonical identifier; equal ids mean the same document
    pub id: String,
    /// Human readable name used in diagnostics
    pub name: String,
    /// Document text
    pub content: String,
}

/// Source of schema documents
pub trait SchemaResolver {
    /// Resolve `location` (relative to the document `base`, if any)
    ///
    /// `namespace` is the namespace the referencing component expects the
    /// document to define.
    fn resolve(
        &self,
        location: &str,
        namespace: Option<&str>,
        base: Option<&str>,
    ) -> Result<ResolvedSchema>;

    /// Find a document for an `import` that carries no `schemaLocation`
    fn resolve_namespace(&self, _namespace: Option<&str>) -> Result<Option<ResolvedSchema>> {
        Ok(None)
    }
}

/// Resource loader for schemas and documents
#[derive(Debug, Clone)]
pub struct Loader {
    /// Resource limits
    limits: Limits,
    /// Whether to allow remote resources
    allow_remote: bool,
}

impl Loader {
    /// Create a new loader with default settings
    pub fn new() -> Self {
        Self {
            limits: Limits::default(),
            allow_remote: false,
        }
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set whether to allow remote resources
    pub fn with_allow_remote(mut self, allow: bool) -> Self {
        self.allow_remote = allow;
        self
    }

    /// Load a resource as a string
    pub fn load(&self, location: &Location) -> Result<String> {
        match location {
            Location::Path(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    Error::Resource(format!("Failed to read file '{}': {}", path.display(), e))
                })?;

                self.limits.check_xml_size(content.len())?;

                Ok(content)
            }
            Location::Url(url) => match url.scheme() {
                "http" | "https" => {
                    if !self.allow_remote {
                        return Err(Error::Resource(format!(
                            "Remote resources are not allowed: {}",
                            url
                        )));
                    }
                    let content = fetch_remote(url)?;
                    self.limits.check_xml_size(content.len())?;
                    Ok(content)
                }
                scheme => Err(Error::Resource(format!(
                    "Unsupported URL scheme '{}': {}",
                    scheme, url
                ))),
            },
            Location::String(s) => {
                self.limits.check_xml_size(s.len())?;
                Ok(s.clone())
            }
        }
    }
}

/// Fetch an http(s) document with a blocking client
#[cfg(feature = "remote")]
fn fetch_remote(url: &url::Url) -> Result<String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(REMOTE_TIMEOUT)
        .user_agent(concat!("xmlschema-om/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Resource(format!("Failed to create HTTP client: {}", e)))?;

    let response = client
        .get(url.as_str())
        .send()
        .map_err(|e| Error::Resource(format!("Failed to fetch '{}': {}", url, e)))?;
    if !response.status().is_success() {
        return Err(Error::Resource(format!(
            "HTTP error {} when fetching '{}'",
            response.status(),
            url
        )));
    }
    response
        .text()
        .map_err(|e| Error::Resource(format!("Failed to read response from '{}': {}", url, e)))
}

#[cfg(not(feature = "remote"))]
fn fetch_remote(url: &url::Url) -> Result<String> {
    Err(Error::Resource(format!(
        "Fetching '{}' requires the 'remote' feature",
        url
    )))
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolver reading schema documents from the file system
///
/// Relative locations are joined to the directory of the referencing
/// document. Canonical ids are canonicalized paths, so two spellings of the
/// same file share one schema.
#[derive(Debug, Clone, Default)]
pub struct FileResolver {
    loader: Loader,
}

impl FileResolver {
    /// Create a resolver with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `loader` for reading documents
    pub fn with_loader(mut self, loader: Loader) -> Self {
        self.loader = loader;
        self
    }

    fn locate(&self, location: &str, base: Option<&str>) -> Result<Location> {
        match base {
            Some(base) => Location::from_str(base)?.join(location),
            None => Location::from_str(location),
        }
    }
}

impl SchemaResolver for FileResolver {
    fn resolve(
        &self,
        location: &str,
        _namespace: Option<&str>,
        base: Option<&str>,
    ) -> Result<ResolvedSchema> {
        let mut target = self.locate(location, base)?;
        if let Location::String(s) = &target {
            target = Location::Path(s.into());
        }
        let content = self.loader.load(&target)?;
        let (id, name) = match &target {
            Location::Path(path) => {
                let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.clone());
                let name = Path::new(&canonical)
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| canonical.display().to_string());
                (canonical.display().to_string(), name)
            }
            other => (other.as_str(), other.as_str()),
        };
        Ok(ResolvedSchema { id, name, content })
    }
}

/// Resolver over documents held in memory
///
/// Locations are keys. A relative location is first tried against the
/// directory part of the referencing key, then as given.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    documents: IndexMap<String, String>,
    namespaces: IndexMap<Option<String>, String>,
}

impl MemoryResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document under `location`
    pub fn with_document(mut self, location: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(location, content);
        self
    }

    /// Add a document under `location`
    pub fn insert(&mut self, location: impl Into<String>, content: impl Into<String>) {
        self.documents.insert(location.into(), content.into());
    }

    /// Make `location` the answer for location-less imports of `namespace`
    pub fn with_namespace(mut self, namespace: Option<&str>, location: impl Into<String>) -> Self {
        self.namespaces
            .insert(namespace.map(str::to_string), location.into());
        self
    }

    /// Number of documents held
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check whether the resolver holds no documents
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn fetch(&self, key: &str) -> Option<ResolvedSchema> {
        self.documents.get(key).map(|content| ResolvedSchema {
            id: key.to_string(),
            name: key.to_string(),
            content: content.clone(),
        })
    }
}

impl SchemaResolver for MemoryResolver {
    fn resolve(
        &self,
        location: &str,
        _namespace: Option<&str>,
        base: Option<&str>,
    ) -> Result<ResolvedSchema> {
        if let Some(base) = base {
            let joined = Location::String(base.to_string()).join(location)?.as_str();
            if let Some(found) = self.fetch(&joined) {
                return Ok(found);
            }
        }
        self.fetch(location)
            .ok_or_else(|| Error::Resource(format!("No document registered for '{}'", location)))
    }

    fn resolve_namespace(&self, namespace: Option<&str>) -> Result<Option<ResolvedSchema>> {
        let key = namespace.map(str::to_string);
        Ok(self
            .namespaces
            .get(&key)
            .and_then(|location| self.fetch(location)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "<root>test</root>").unwrap();

        let location = Location::Path(file.path().to_path_buf());
        let loader = Loader::new();
        let content = loader.load(&location).unwrap();

        assert!(content.contains("<root>test</root>"));
    }

    #[test]
    fn test_load_from_string() {
        let location = Location::String("<root>test</root>".to_string());
        let loader = Loader::new();
        let content = loader.load(&location).unwrap();

        assert_eq!(content, "<root>test</root>");
    }

    #[test]
    fn test_size_limit() {
        let mut file = NamedTempFile::new().unwrap();
        let large_content = "x".repeat(11 * 1024 * 1024);
        write!(file, "{}", large_content).unwrap();

        let location = Location::Path(file.path().to_path_buf());
        let loader = Loader::new().with_limits(Limits::strict());

        // Strict limits (10 MB max) reject an 11 MB file
        assert!(matches!(loader.load(&location), Err(Error::LimitExceeded(_))));
    }

    #[test]
    fn test_remote_refused() {
        let location = Location::from_str("http://example.com/a.xsd").unwrap();
        match Loader::new().load(&location) {
            Err(Error::Resource(message)) => assert!(message.contains("not allowed")),
            other => panic!("expected a refusal, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_scheme() {
        let location = Location::from_str("ftp://example.com/a.xsd").unwrap();
        let loader = Loader::new().with_allow_remote(true);
        match loader.load(&location) {
            Err(Error::Resource(message)) => assert!(message.contains("Unsupported URL scheme 'ftp'")),
            other => panic!("expected an unsupported scheme, got {:?}", other),
        }
    }

    #[cfg(not(feature = "remote"))]
    #[test]
    fn test_remote_requires_feature() {
        let location = Location::from_str("http://127.0.0.1:9/a.xsd").unwrap();
        let loader = Loader::new().with_allow_remote(true);
        match loader.load(&location) {
            Err(Error::Resource(message)) => assert!(message.contains("'remote' feature")),
            other => panic!("expected a feature error, got {:?}", other),
        }
    }

    /// Serve `body` once over HTTP on a local port
    #[cfg(feature = "remote")]
    fn serve_once(status: &'static str, body: &'static str) -> String {
        use std::io::{BufRead, BufReader};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                line.clear();
            }
            write!(
                stream,
                "HTTP/1.1 {}\r\nContent-Type: application/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            )
            .unwrap();
        });
        format!("http://{}/schemas/a.xsd", address)
    }

    #[cfg(feature = "remote")]
    #[test]
    fn test_remote_fetch() {
        let url = serve_once("200 OK", "<xs:schema/>");
        let location = Location::from_str(&url).unwrap();
        let loader = Loader::new().with_allow_remote(true);
        assert_eq!(loader.load(&location).unwrap(), "<xs:schema/>");
    }

    #[cfg(feature = "remote")]
    #[test]
    fn test_remote_http_error() {
        let url = serve_once("404 Not Found", "");
        let location = Location::from_str(&url).unwrap();
        let loader = Loader::new().with_allow_remote(true);
        match loader.load(&location) {
            Err(Error::Resource(message)) => assert!(message.contains("HTTP error 404")),
            other => panic!("expected an HTTP error, got {:?}", other),
        }
    }

    #[cfg(feature = "remote")]
    #[test]
    fn test_file_resolver_remote_relative() {
        let url = serve_once("200 OK", "<types/>");
        let base = url.replace("a.xsd", "main.xsd");
        let resolver = FileResolver::new().with_loader(Loader::new().with_allow_remote(true));
        let resolved = resolver.resolve("a.xsd", None, Some(&base)).unwrap();
        assert_eq!(resolved.id, url);
        assert_eq!(resolved.content, "<types/>");
    }

    #[test]
    fn test_file_resolver_relative() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.xsd");
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("types.xsd"), "<types/>").unwrap();
        fs::write(&main, "<main/>").unwrap();

        let resolver = FileResolver::new();
        let base = resolver.resolve(main.to_str().unwrap(), None, None).unwrap();
        let resolved = resolver
            .resolve("sub/types.xsd", None, Some(&base.id))
            .unwrap();
        assert_eq!(resolved.content, "<types/>");
        assert_eq!(resolved.name, "types.xsd");

        let again = resolver
            .resolve("./sub/../sub/types.xsd", None, Some(&base.id))
            .unwrap();
        assert_eq!(again.id, resolved.id);
    }

    #[test]
    fn test_memory_resolver() {
        let resolver = MemoryResolver::new()
            .with_document("dir/a.xsd", "<a/>")
            .with_document("b.xsd", "<b/>")
            .with_namespace(Some("urn:b"), "b.xsd");

        assert_eq!(resolver.resolve("a.xsd", None, Some("dir/root.xsd")).unwrap().id, "dir/a.xsd");
        assert_eq!(resolver.resolve("b.xsd", None, Some("dir/root.xsd")).unwrap().id, "b.xsd");
        assert!(resolver.resolve("missing.xsd", None, None).is_err());
        assert_eq!(
            resolver.resolve_namespace(Some("urn:b")).unwrap().map(|r| r.id),
            Some("b.xsd".to_string())
        );
        assert!(resolver.resolve_namespace(None).unwrap().is_none());
    }
}
