//! bibslice: extract the cited entries of a BibTeX database.
//!
//! This library provides functionality to:
//! - Scan LaTeX sources for citation keys (`\cite{...}` and its variants)
//! - Copy the `@string` abbreviations of a `.bib` database
//! - Copy, verbatim, every record whose key is cited

pub mod cursor;
pub mod extractor;
pub mod record;
pub mod scanner;

pub use extractor::{copy_preamble, extract, extract_records, ExtractError, ExtractReport};
pub use record::{Balance, RecordBalancer, RecordHeader, RecordType};
pub use scanner::{
    scan_documents, scan_line, scan_reader, CitationKeySet, MissingInputPolicy, ScanError,
    Scanner,
};
