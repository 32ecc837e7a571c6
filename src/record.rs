//! BibTeX record headers and brace balancing.
//!
//! A record starts at a line like `@article{knuth1973,` and ends where the
//! brace opened after the record type is closed again, possibly many lines
//! later and after any number of nested groups such as `title = {{NASA}}`.

use std::fmt;
use std::io::{self, Write};

use memchr::memchr2;

use crate::cursor::find_byte;

/// The record types that are considered for extraction.
///
/// Any other tag after `@` (including `@string`, `@preamble` and `@comment`)
/// is not a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Article,
    InProceedings,
    InCollection,
    InBook,
    Proceedings,
    Book,
    Booklet,
    PhdThesis,
    MastersThesis,
    TechReport,
    Manual,
    Unpublished,
    Misc,
    Patent,
    Conference,
    Online,
    Collection,
    Www,
}

impl RecordType {
    pub const ALL: [RecordType; 18] = [
        RecordType::Article,
        RecordType::InProceedings,
        RecordType::InCollection,
        RecordType::InBook,
        RecordType::Proceedings,
        RecordType::Book,
        RecordType::Booklet,
        RecordType::PhdThesis,
        RecordType::MastersThesis,
        RecordType::TechReport,
        RecordType::Manual,
        RecordType::Unpublished,
        RecordType::Misc,
        RecordType::Patent,
        RecordType::Conference,
        RecordType::Online,
        RecordType::Collection,
        RecordType::Www,
    ];

    /// Looks up a tag, ignoring ASCII case.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(tag))
    }

    /// The lower-case tag, as written after `@`.
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::Article => "article",
            RecordType::InProceedings => "inproceedings",
            RecordType::InCollection => "incollection",
            RecordType::InBook => "inbook",
            RecordType::Proceedings => "proceedings",
            RecordType::Book => "book",
            RecordType::Booklet => "booklet",
            RecordType::PhdThesis => "phdthesis",
            RecordType::MastersThesis => "mastersthesis",
            RecordType::TechReport => "techreport",
            RecordType::Manual => "manual",
            RecordType::Unpublished => "unpublished",
            RecordType::Misc => "misc",
            RecordType::Patent => "patent",
            RecordType::Conference => "conference",
            RecordType::Online => "online",
            RecordType::Collection => "collection",
            RecordType::Www => "www",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The opening line of a record: `@<type>{<key>,`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    pub record_type: RecordType,
    pub key: String,
    /// Byte offset just past the opening brace, where balancing starts.
    pub body_start: usize,
}

impl RecordHeader {
    /// Parses the record header starting at the first `@` of `line`.
    ///
    /// The type is the text between `@` and the next `{`; the key runs from
    /// that brace to whichever of `,` or `}` comes first, or to the end of the
    /// line. Both are trimmed.
    ///
    /// # Arguments
    ///
    /// * `line` - One database line, without its terminator
    ///
    /// # Returns
    ///
    /// The header, or `None` when the line has no `@`, no brace after it, or
    /// the type is not a [`RecordType`].
    pub fn parse(line: &[u8]) -> Option<Self> {
        let at = find_byte(line, b'@', 0)?;
        let open = find_byte(line, b'{', at + 1)?;
        let tag = std::str::from_utf8(&line[at + 1..open]).ok()?;
        let record_type = RecordType::from_tag(tag.trim())?;

        let body_start = open + 1;
        let key_end = memchr2(b',', b'}', &line[body_start..])
            .map_or(line.len(), |i| body_start + i);
        let key = String::from_utf8_lossy(&line[body_start..key_end])
            .trim()
            .to_string();

        Some(Self {
            record_type,
            key,
            body_start,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Open,
    Close,
}

/// Position and kind of the next brace at or after `from`.
pub fn next_delimiter(line: &[u8], from: usize) -> Option<(usize, Delimiter)> {
    let at = from + memchr2(b'{', b'}', line.get(from..)?)?;
    let delimiter = if line[at] == b'{' {
        Delimiter::Open
    } else {
        Delimiter::Close
    };
    Some((at, delimiter))
}

/// Outcome of feeding one line to a [`RecordBalancer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Balance {
    /// The record continues on the next line.
    Open { depth: usize },
    /// The record's closing brace is at byte `end` of the line just fed.
    Closed { end: usize },
}

/// Accumulates the lines of one record until its braces balance.
///
/// Depth starts at 1: the brace after the record type has already been
/// consumed. Lines are buffered rather than written straight away, so a
/// record that never closes leaves no trace in the output.
#[derive(Debug)]
pub struct RecordBalancer {
    depth: usize,
    lines: Vec<Vec<u8>>,
}

impl Default for RecordBalancer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordBalancer {
    pub fn new() -> Self {
        Self {
            depth: 1,
            lines: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_closed(&self) -> bool {
        self.depth == 0
    }

    /// The lines buffered so far, without terminators.
    pub fn lines(&self) -> &[Vec<u8>] {
        &self.lines
    }

    /// Applies the braces of `line` from byte `from` onwards and buffers the line.
    ///
    /// Text after the closing brace is kept in the buffered line but not scanned.
    pub fn feed(&mut self, line: &[u8], from: usize) -> Balance {
        debug_assert!(!self.is_closed(), "record fed after it was closed");
        self.lines.push(line.to_vec());

        let mut cursor = from;
        while let Some((at, delimiter)) = next_delimiter(line, cursor) {
            match delimiter {
                Delimiter::Open => self.depth += 1,
                Delimiter::Close => self.depth -= 1,
            }
            if self.depth == 0 {
                return Balance::Closed { end: at };
            }
            cursor = at + 1;
        }
        Balance::Open { depth: self.depth }
    }

    /// Writes the buffered lines followed by one blank separator line.
    pub fn finish<W: Write>(self, writer: &mut W) -> io::Result<()> {
        for line in &self.lines {
            writer.write_all(line)?;
            writer.write_all(b"\n")?;
        }
        writer.write_all(b"\n")
    }
}
