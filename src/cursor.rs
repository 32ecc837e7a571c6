//! Line reading and byte-cursor helpers shared by the scanner and the extractor.
//!
//! Both stages work on raw bytes so that documents and databases in legacy
//! encodings (Latin-1 `.bib` files are common) pass through untouched. A cursor
//! is a plain byte offset into the current line; every helper here takes the
//! cursor explicitly and returns the next position instead of mutating state.

use std::io::{self, BufRead};

use memchr::{memchr, memmem};

/// Reads the next line into `buf`, without its trailing `\n`.
///
/// Returns `Ok(false)` at end of input. A `\r` before the `\n` is kept as part
/// of the line so that CRLF input round-trips unchanged.
pub fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<bool> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(false);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    Ok(true)
}

/// Position of the first `byte` at or after `from`.
pub fn find_byte(line: &[u8], byte: u8, from: usize) -> Option<usize> {
    memchr(byte, line.get(from..)?).map(|i| from + i)
}

/// Position of the first occurrence of `needle` at or after `from`.
pub fn find_subslice(line: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    memmem::find(line.get(from..)?, needle).map(|i| from + i)
}
