//! Integration tests using TOML fixtures.
//!
//! This test harness loads test cases from TOML files in the `fixtures/` directory
//! and runs them against the bibslice library.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use serde::Deserialize;

use bibslice::{extract, scan_reader, CitationKeySet};

/// A test fixture loaded from a TOML file.
#[derive(Debug, Deserialize)]
struct Fixture {
    /// Name of the test case
    name: String,
    /// LaTeX document sources, scanned in order
    documents: Vec<String>,
    /// The `.bib` database
    database: String,
    /// Expected citation keys, sorted
    #[serde(default)]
    expected_keys: Option<Vec<String>>,
    /// Expected trimmed database
    #[serde(default)]
    expected: Option<String>,
    /// Expected missing keys
    #[serde(default)]
    expected_missing: Option<Vec<String>>,
    /// Expected error message (for error tests)
    #[serde(default)]
    expected_error: Option<String>,
}

/// Load all fixtures from a directory.
fn load_fixtures(dir: &Path) -> Vec<(String, Fixture)> {
    let mut fixtures = Vec::new();

    if !dir.exists() {
        return fixtures;
    }

    for entry in fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        let path = entry.path();

        if path.extension().map_or(false, |e| e == "toml") {
            let content = fs::read_to_string(&path).unwrap();
            let fixture: Fixture = toml::from_str(&content).unwrap();
            let name = path.file_stem().unwrap().to_string_lossy().to_string();
            fixtures.push((name, fixture));
        }
    }

    fixtures.sort_by(|a, b| a.0.cmp(&b.0));
    fixtures
}

fn scan_fixture(fixture: &Fixture) -> CitationKeySet {
    let mut keys = CitationKeySet::new();
    for document in &fixture.documents {
        scan_reader(Cursor::new(document.as_bytes()), &mut keys).unwrap();
    }
    keys
}

/// Scan the documents, extract from the database and compare the output.
fn run_extraction_test(name: &str, fixture: &Fixture) {
    let keys = scan_fixture(fixture);

    if let Some(expected_keys) = &fixture.expected_keys {
        let found: Vec<&str> = keys.iter().collect();
        assert_eq!(found, *expected_keys, "Test '{}' key mismatch", name);
    }

    let mut out = Vec::new();
    let report = extract(Cursor::new(fixture.database.as_bytes()), &keys, &mut out)
        .unwrap_or_else(|e| panic!("Test '{}' failed with unexpected error: {}", name, e));
    let output = String::from_utf8(out).unwrap();

    if let Some(expected) = &fixture.expected {
        assert_eq!(output, *expected, "Test '{}' output mismatch", name);
    }

    if let Some(expected_missing) = &fixture.expected_missing {
        assert_eq!(
            report.missing, *expected_missing,
            "Test '{}' missing keys mismatch",
            name
        );
    }

    // A second run over the same inputs must give the same bytes
    let mut again = Vec::new();
    extract(Cursor::new(fixture.database.as_bytes()), &keys, &mut again).unwrap();
    assert_eq!(
        output.as_bytes(),
        again.as_slice(),
        "Test '{}' is not idempotent",
        name
    );
}

/// Run error tests - verify malformed databases are reported.
fn run_error_test(name: &str, fixture: &Fixture) {
    let keys = scan_fixture(fixture);
    let mut out = Vec::new();
    let result = extract(Cursor::new(fixture.database.as_bytes()), &keys, &mut out);

    match result {
        Ok(_) => panic!("Test '{}' expected an error but succeeded", name),
        Err(e) => {
            let expected_error = fixture
                .expected_error
                .as_deref()
                .expect("error fixtures need expected_error");
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected_error),
                "Test '{}' error mismatch: expected '{}', got '{}'",
                name,
                expected_error,
                error_msg
            );
        }
    }
}

#[test]
fn test_extraction_fixtures() {
    let fixtures_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/extraction");
    let fixtures = load_fixtures(&fixtures_dir);
    assert!(!fixtures.is_empty(), "no extraction fixtures found");

    for (name, fixture) in fixtures {
        println!("Running extraction test: {}", fixture.name);
        run_extraction_test(&name, &fixture);
    }
}

#[test]
fn test_error_fixtures() {
    let fixtures_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/errors");
    let fixtures = load_fixtures(&fixtures_dir);
    assert!(!fixtures.is_empty(), "no error fixtures found");

    for (name, fixture) in fixtures {
        println!("Running error test: {}", fixture.name);
        run_error_test(&name, &fixture);
    }
}
