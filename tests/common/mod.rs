//! Shared test constants and helpers for integration tests.

use std::io::Write;

use tempfile::NamedTempFile;

/// A small database with two abbreviations, four records and one record of
/// an unrecognised type.
///
/// Used by the CLI tests; `knuth1973` spans several lines and nests braces.
pub const LIBRARY_BIB: &str = r#"@String{acm = "ACM Press"}
@string{aw = "Addison-Wesley"}

@book{knuth1973,
  author    = {Donald E. Knuth},
  title     = {The Art of Computer Programming, Volume {I:} Fundamental Algorithms},
  publisher = aw,
  year      = {1973}
}

@Article{lamport1978,
  author  = {Leslie Lamport},
  title   = {Time, Clocks, and the Ordering of Events in a Distributed System},
  journal = {Communications of the {ACM}},
  year    = 1978
}

@inproceedings{dijkstra1968, author = {Edsger W. Dijkstra}, title = {{GOTO} Considered Harmful}, year = 1968}

@dataset{census2020,
  title = {Census},
}

@misc{unused,
  note = {never cited}
}
"#;

/// Create a temporary file with content and the given extension.
pub fn create_temp_file(content: &str, extension: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(extension)
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
