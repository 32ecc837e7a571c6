//! Extraction of cited records from a BibTeX database.
//!
//! The database is read twice. The first pass copies every `@string`
//! abbreviation line so the trimmed file stays self-contained; the second
//! copies each recognised record whose key was cited, verbatim and followed
//! by a blank line.

use std::collections::HashSet;
use std::io::{self, BufRead, Seek, Write};
use std::sync::LazyLock;

use regex::bytes::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::cursor::read_line;
use crate::record::{Balance, RecordBalancer, RecordHeader};
use crate::scanner::CitationKeySet;

/// Matches `@string` abbreviation lines, ignoring ASCII case.
static PREAMBLE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i-u)@string").expect("preamble pattern is valid"));

/// Errors that can occur during extraction.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to read database: {0}")]
    Read(#[source] io::Error),

    #[error("failed to write output: {0}")]
    Write(#[source] io::Error),

    #[error("record '{key}' starting at line {line} is never closed")]
    UnterminatedRecord { key: String, line: usize },
}

/// Summary of one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractReport {
    /// Number of `@string` lines copied.
    pub preamble_lines: usize,
    /// Number of distinct keys cited by the documents.
    pub cited: usize,
    /// Keys of the records written, in database order.
    pub emitted: Vec<String>,
    /// Cited non-empty keys for which no record was written, sorted.
    pub missing: Vec<String>,
}

/// Returns `true` if `line` is an `@string` abbreviation line.
pub fn is_preamble_line(line: &[u8]) -> bool {
    PREAMBLE_MARKER.is_match(line)
}

/// Copies every preamble line of `reader` to `writer`, then one blank line.
///
/// # Arguments
///
/// * `reader` - The database, positioned at its start
/// * `writer` - Destination of the trimmed database
///
/// # Returns
///
/// The number of preamble lines copied.
pub fn copy_preamble<R: BufRead, W: Write>(
    mut reader: R,
    writer: &mut W,
) -> Result<usize, ExtractError> {
    let mut line = Vec::new();
    let mut copied = 0;
    while read_line(&mut reader, &mut line).map_err(ExtractError::Read)? {
        if is_preamble_line(&line) {
            write_line(writer, &line)?;
            copied += 1;
        }
    }
    writer.write_all(b"\n").map_err(ExtractError::Write)?;
    Ok(copied)
}

/// Copies each cited record of `reader` to `writer`.
///
/// Only the first `@` of a line is considered, and scanning for the next
/// record resumes on the line after a record closes.
///
/// # Arguments
///
/// * `reader` - The database, positioned at its start
/// * `keys` - The cited keys; records with any other key are skipped
/// * `writer` - Destination of the trimmed database
///
/// # Returns
///
/// The keys of the records written, in database order.
///
/// # Errors
///
/// Returns [`ExtractError::UnterminatedRecord`] if the input ends inside a
/// cited record. Nothing of that record is written.
pub fn extract_records<R: BufRead, W: Write>(
    mut reader: R,
    keys: &CitationKeySet,
    writer: &mut W,
) -> Result<Vec<String>, ExtractError> {
    let mut line = Vec::new();
    let mut line_no = 0;
    let mut emitted = Vec::new();

    while read_line(&mut reader, &mut line).map_err(ExtractError::Read)? {
        line_no += 1;
        let Some(header) = RecordHeader::parse(&line) else {
            continue;
        };
        if !keys.contains(&header.key) {
            tracing::trace!(key = %header.key, line = line_no, "skipping uncited record");
            continue;
        }

        let start = line_no;
        let mut balancer = RecordBalancer::new();
        let mut balance = balancer.feed(&line, header.body_start);
        while let Balance::Open { .. } = balance {
            if !read_line(&mut reader, &mut line).map_err(ExtractError::Read)? {
                return Err(ExtractError::UnterminatedRecord {
                    key: header.key,
                    line: start,
                });
            }
            line_no += 1;
            balance = balancer.feed(&line, 0);
        }

        balancer.finish(writer).map_err(ExtractError::Write)?;
        tracing::debug!(
            key = %header.key,
            record_type = %header.record_type,
            lines = line_no - start + 1,
            "copied record"
        );
        emitted.push(header.key);
    }

    Ok(emitted)
}

/// Runs both passes over `database`, writing the trimmed bibliography to `output`.
///
/// The database is rewound between the passes.
///
/// # Arguments
///
/// * `database` - The full `.bib` database
/// * `keys` - The keys cited by the documents
/// * `output` - Destination of the trimmed database; flushed on success
///
/// # Returns
///
/// An [`ExtractReport`]. Empty keys (from `\cite{a,}`) are never reported
/// as missing.
pub fn extract<D, W>(
    mut database: D,
    keys: &CitationKeySet,
    output: &mut W,
) -> Result<ExtractReport, ExtractError>
where
    D: BufRead + Seek,
    W: Write,
{
    let preamble_lines = copy_preamble(&mut database, output)?;
    database.rewind().map_err(ExtractError::Read)?;
    let emitted = extract_records(&mut database, keys, output)?;
    output.flush().map_err(ExtractError::Write)?;

    let found: HashSet<&str> = emitted.iter().map(String::as_str).collect();
    let missing: Vec<String> = keys
        .iter()
        .filter(|key| !key.is_empty() && !found.contains(key))
        .map(str::to_string)
        .collect();
    for key in &missing {
        tracing::warn!(key = %key, "cited key has no record in the database");
    }

    Ok(ExtractReport {
        preamble_lines,
        cited: keys.len(),
        emitted,
        missing,
    })
}

fn write_line<W: Write>(writer: &mut W, line: &[u8]) -> Result<(), ExtractError> {
    writer
        .write_all(line)
        .and_then(|()| writer.write_all(b"\n"))
        .map_err(ExtractError::Write)
}
