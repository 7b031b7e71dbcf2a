//! CLI integration tests
//!
//! These run the `xsdcheck` binary against schemas written to a temporary
//! directory.

#![cfg(feature = "cli")]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const VALID: &str = r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="book" type="Book"/>
  <xs:complexType name="Book">
    <xs:sequence>
      <xs:element name="title" type="xs:string"/>
      <xs:element name="author" type="xs:string" maxOccurs="unbounded"/>
    </xs:sequence>
  </xs:complexType>
</xs:schema>"#;

const INVALID: &str = r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="book" type="Missing"/>
</xs:schema>"#;

fn fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn xsdcheck(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_xsdcheck"))
        .args(args)
        .output()
        .expect("Failed to execute xsdcheck")
}

#[test]
fn test_cli_validate_valid_schema() {
    let dir = TempDir::new().unwrap();
    let schema = fixture(dir.path(), "book.xsd", VALID);

    let output = xsdcheck(&["validate", schema.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stdout: {}", stdout);
    assert!(stdout.contains("1 schema(s), 0 error(s), 0 warning(s)"));
}

#[test]
fn test_cli_validate_reports_diagnostics() {
    let dir = TempDir::new().unwrap();
    let schema = fixture(dir.path(), "broken.xsd", INVALID);

    let output = xsdcheck(&["validate", schema.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout.contains("fatal: undefined type 'Missing' (broken.xsd:3)"));
    assert!(stdout.contains("1 error(s)"));
}

#[test]
fn test_cli_validate_json_output() {
    let dir = TempDir::new().unwrap();
    let schema = fixture(dir.path(), "broken.xsd", INVALID);

    let output = xsdcheck(&["validate", "--json", schema.to_str().unwrap()]);
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");

    let diagnostics = json.as_array().unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["severity"], "fatal");
    assert_eq!(diagnostics[0]["line"], 3);
}

#[test]
fn test_cli_validate_missing_file() {
    let output = xsdcheck(&["validate", "/nonexistent/schema.xsd"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.contains("Error:"));
}

#[test]
fn test_cli_inspect_lists_definitions() {
    let dir = TempDir::new().unwrap();
    let schema = fixture(dir.path(), "book.xsd", VALID);

    let output = xsdcheck(&["inspect", schema.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("xmlschema-om v"));
    assert!(stdout.contains("element"));
    assert!(stdout.contains("complexType"));
    assert!(stdout.contains("Book"));
}

#[test]
fn test_cli_inspect_path_json() {
    let dir = TempDir::new().unwrap();
    let schema = fixture(dir.path(), "book.xsd", VALID);

    let output = xsdcheck(&[
        "inspect",
        "--json",
        "--path",
        "complexType[@name='Book']/sequence/element",
        schema.to_str().unwrap(),
    ]);
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");

    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["title", "author"]);
}

#[test]
fn test_cli_inspect_invalid_path() {
    let dir = TempDir::new().unwrap();
    let schema = fixture(dir.path(), "book.xsd", VALID);

    let output = xsdcheck(&["inspect", "--path", "element[", schema.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
}
