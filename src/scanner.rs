//! LaTeX citation scanner.
//!
//! Collects the keys referenced by citation macros in document sources:
//! `\cite{a}`, `\parencite[p.~4]{b,c}`, `\nocite{d}` and friends.
//!
//! Macro arguments are assumed not to span lines. A macro whose opening
//! brace is missing from the line is ignored.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use memchr::memchr2;
use thiserror::Error;

use crate::cursor::{find_byte, find_subslice, read_line};

/// Citation macros recognised in document sources. All of them are treated alike.
pub const CITATION_MACROS: &[&str] = &[
    r"\cite",
    r"\nocite",
    r"\parencite",
    r"\footfullcite",
    r"\autocite",
    r"\fullcite",
    r"\textcite",
];

/// Errors that can occur while scanning documents.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot read document '{}': {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What to do with a document that cannot be opened or read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingInputPolicy {
    /// Log a warning and carry on; the document contributes no keys.
    #[default]
    Skip,
    /// Abort the scan with [`ScanError::Unreadable`].
    Fail,
}

/// The set of citation keys found in the scanned documents.
///
/// Keys are kept sorted so that reports and logs are stable between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationKeySet(BTreeSet<String>);

impl CitationKeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key. Returns `false` if it was already present.
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        self.0.insert(key.into())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for CitationKeySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Scans documents for citation keys according to a [`MissingInputPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Scanner {
    policy: MissingInputPolicy,
}

impl Scanner {
    pub fn new(policy: MissingInputPolicy) -> Self {
        Self { policy }
    }

    /// Scans every document in order and returns the keys they cite.
    ///
    /// A path of `-` reads from stdin.
    ///
    /// # Arguments
    ///
    /// * `paths` - Document paths, scanned in order
    ///
    /// # Returns
    ///
    /// The union of the keys cited by all readable documents.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Unreadable`] for the first unreadable document when
    /// the policy is [`MissingInputPolicy::Fail`].
    pub fn scan_documents<P: AsRef<Path>>(&self, paths: &[P]) -> Result<CitationKeySet, ScanError> {
        let mut keys = CitationKeySet::new();
        for path in paths {
            self.scan_document(path.as_ref(), &mut keys)?;
        }
        tracing::debug!(keys = keys.len(), documents = paths.len(), "scan finished");
        Ok(keys)
    }

    /// Scans a single document, adding its keys to `keys`.
    ///
    /// Keys found before a read error are kept.
    pub fn scan_document(&self, path: &Path, keys: &mut CitationKeySet) -> Result<(), ScanError> {
        let result = if path == Path::new("-") {
            scan_reader(io::stdin().lock(), keys)
        } else {
            File::open(path).and_then(|file| scan_reader(BufReader::new(file), keys))
        };

        match (result, self.policy) {
            (Ok(()), _) => Ok(()),
            (Err(source), MissingInputPolicy::Skip) => {
                tracing::warn!(path = %path.display(), error = %source, "skipping unreadable document");
                Ok(())
            }
            (Err(source), MissingInputPolicy::Fail) => Err(ScanError::Unreadable {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Scans documents with the default policy, skipping unreadable ones.
pub fn scan_documents<P: AsRef<Path>>(paths: &[P]) -> Result<CitationKeySet, ScanError> {
    Scanner::default().scan_documents(paths)
}

/// Scans every line of `reader`.
///
/// # Arguments
///
/// * `reader` - A document source
/// * `keys` - The set the found keys are added to
///
/// # Errors
///
/// Returns the underlying I/O error if a line cannot be read.
pub fn scan_reader<R: BufRead>(mut reader: R, keys: &mut CitationKeySet) -> io::Result<()> {
    let mut line = Vec::new();
    while read_line(&mut reader, &mut line)? {
        scan_line(&line, keys);
    }
    Ok(())
}

/// Adds the keys cited on one line to `keys`.
///
/// For each macro occurrence the keys run from just past the next `{` up to
/// the matching `}`, separated by commas. If the closing brace is missing the
/// rest of the line is taken as the last key.
pub fn scan_line(line: &[u8], keys: &mut CitationKeySet) {
    for token in CITATION_MACROS {
        let token = token.as_bytes();
        let mut cursor = 0;
        while let Some(at) = find_subslice(line, token, cursor) {
            let Some(open) = find_byte(line, b'{', at + token.len()) else {
                break;
            };
            cursor = scan_arguments(line, open + 1, keys);
        }
    }
}

/// Position of the next key separator (`,` or `}`) at or after `from`.
pub fn find_key_boundary(line: &[u8], from: usize) -> Option<(usize, u8)> {
    memchr2(b',', b'}', line.get(from..)?).map(|i| (from + i, line[from + i]))
}

/// Reads the comma-separated keys of one macro argument starting at `cursor`.
/// Returns the position after the closing brace.
fn scan_arguments(line: &[u8], mut cursor: usize, keys: &mut CitationKeySet) -> usize {
    loop {
        match find_key_boundary(line, cursor) {
            Some((end, boundary)) => {
                record_key(&line[cursor..end], keys);
                cursor = end + 1;
                if boundary == b'}' {
                    return cursor;
                }
            }
            None => {
                record_key(line.get(cursor..).unwrap_or_default(), keys);
                return line.len();
            }
        }
    }
}

fn record_key(raw: &[u8], keys: &mut CitationKeySet) {
    let key = String::from_utf8_lossy(raw);
    let key = key.trim();
    if keys.insert(key) {
        tracing::debug!(key, "citation key");
    }
}
