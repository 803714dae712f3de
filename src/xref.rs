//! Cross-reference table parser.
//!
//! The xref maps object numbers to where the object lives: a byte offset for
//! ordinary objects, or an (object stream, index) pair for compressed objects.
//! Both classic `xref` tables and PDF 1.5 cross-reference streams are read, and
//! the `/Prev` chain of incremental updates is followed with newer sections
//! taking precedence.

use crate::error::{PdfError, PdfResult};
use crate::lexer::is_whitespace;
use crate::object::{Dictionary, Object};
use crate::parser::{parse_indirect_object, parse_object_at};
use std::collections::{HashMap, HashSet};

/// Maximum number of xref sections followed through `/Prev`.
const MAX_SECTIONS: usize = 100;

/// How far from the end of file `startxref` is searched for.
const STARTXREF_WINDOW: usize = 2048;

/// Cross-reference table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    /// Free object
    Free,
    /// Object stored at a byte offset
    InUse {
        /// Byte offset of `N G obj`
        offset: usize,
        /// Generation number
        gen: u16,
    },
    /// Object stored inside an object stream
    Compressed {
        /// Object number of the object stream
        stream: u32,
        /// Index of the object inside the stream
        index: usize,
    },
}

/// Merged cross-reference table plus the newest trailer dictionary.
#[derive(Debug, Clone, Default)]
pub struct CrossRefTable {
    entries: HashMap<u32, XRefEntry>,
    trailer: Dictionary,
}

impl CrossRefTable {
    pub fn get(&self, object_number: u32) -> Option<&XRefEntry> {
        self.entries.get(&object_number)
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add entries from an older section; existing (newer) entries win.
    fn merge_older(&mut self, older: HashMap<u32, XRefEntry>) {
        for (num, entry) in older {
            self.entries.entry(num).or_insert(entry);
        }
    }
}

/// Locate the byte offset given after the last `startxref` keyword.
pub fn find_startxref(data: &[u8]) -> PdfResult<usize> {
    let window_start = data.len().saturating_sub(STARTXREF_WINDOW);
    let tail = &data[window_start..];
    let pos = tail
        .windows(b"startxref".len())
        .rposition(|w| w == b"startxref")
        .ok_or_else(|| PdfError::InvalidXref("startxref not found".to_string()))?;

    let mut cursor = Cursor::new(tail, pos + b"startxref".len());
    cursor
        .next_usize()
        .ok_or_else(|| PdfError::InvalidXref("startxref offset missing".to_string()))
}

/// Read the xref section at `offset` and every older section reachable from it.
pub fn parse_xref(data: &[u8], offset: usize) -> PdfResult<CrossRefTable> {
    let mut table = CrossRefTable::default();
    let mut visited = HashSet::new();
    let mut pending = vec![offset];
    let mut newest = true;

    while let Some(offset) = pending.pop() {
        if !visited.insert(offset) {
            log::warn!("xref section at {} visited twice, stopping", offset);
            continue;
        }
        if visited.len() > MAX_SECTIONS {
            return Err(PdfError::InvalidXref(format!(
                "more than {} xref sections",
                MAX_SECTIONS
            )));
        }

        let (entries, trailer) = parse_section(data, offset)?;
        table.merge_older(entries);

        // /Prev is pushed first so that a hybrid file's /XRefStm (same revision)
        // is read before the older revision.
        if let Some(prev) = trailer.get("Prev").and_then(Object::as_integer) {
            pending.push(usize::try_from(prev).map_err(|_| bad_offset(prev))?);
        }
        if let Some(stm) = trailer.get("XRefStm").and_then(Object::as_integer) {
            pending.push(usize::try_from(stm).map_err(|_| bad_offset(stm))?);
        }

        if newest {
            table.trailer = trailer;
            newest = false;
        }
    }

    Ok(table)
}

fn bad_offset(value: i64) -> PdfError {
    PdfError::InvalidXref(format!("invalid section offset {}", value))
}

/// Parse one section: a classic table with its trailer, or an xref stream.
fn parse_section(data: &[u8], offset: usize) -> PdfResult<(HashMap<u32, XRefEntry>, Dictionary)> {
    let at = data
        .get(offset..)
        .ok_or_else(|| PdfError::InvalidXref(format!("offset {} beyond end of file", offset)))?;
    let skipped = at.len() - skip_pdf_ws(at).len();

    if at[skipped..].starts_with(b"xref") {
        parse_classic_table(data, offset + skipped + b"xref".len())
    } else {
        parse_xref_stream(data, offset)
    }
}

fn parse_classic_table(
    data: &[u8],
    start: usize,
) -> PdfResult<(HashMap<u32, XRefEntry>, Dictionary)> {
    let mut entries = HashMap::new();
    let mut cursor = Cursor::new(data, start);

    loop {
        cursor.skip_ws();
        if cursor.rest().starts_with(b"trailer") {
            cursor.pos += b"trailer".len();
            break;
        }

        let first = cursor.next_usize();
        let count = cursor.next_usize();
        let (Some(first), Some(count)) = (first, count) else {
            return Err(PdfError::InvalidXref(format!(
                "bad subsection header at byte {}",
                cursor.pos
            )));
        };
        // Each entry is 20 bytes; a count that cannot fit in the file is corrupt.
        if count > data.len() / 18 {
            return Err(PdfError::InvalidXref(format!("subsection count {} too large", count)));
        }

        for i in 0..count {
            let offset = cursor.next_usize();
            let gen = cursor.next_usize();
            let kind = cursor.next_word();
            let entry = match (offset, gen, kind) {
                (Some(offset), Some(gen), Some(b"n")) => XRefEntry::InUse {
                    offset,
                    gen: gen.min(u16::MAX as usize) as u16,
                },
                (Some(_), Some(_), Some(b"f")) => XRefEntry::Free,
                _ => {
                    return Err(PdfError::InvalidXref(format!(
                        "malformed entry {} in subsection starting at {}",
                        i, first
                    )))
                },
            };
            let num = u32::try_from(first + i)
                .map_err(|_| PdfError::InvalidXref("object number overflow".to_string()))?;
            // Within one table the first occurrence of a number wins.
            entries.entry(num).or_insert(entry);
        }
    }

    let (trailer, _) = parse_object_at(cursor.rest(), cursor.pos)?;
    let trailer = match trailer {
        Object::Dictionary(dict) => dict,
        other => {
            return Err(PdfError::InvalidObjectType {
                expected: "Dictionary".to_string(),
                found: other.type_name().to_string(),
            })
        },
    };
    Ok((entries, trailer))
}

fn parse_xref_stream(data: &[u8], offset: usize) -> PdfResult<(HashMap<u32, XRefEntry>, Dictionary)> {
    let (_, obj) = parse_indirect_object(data, offset)?;
    let dict = match &obj {
        Object::Stream { dict, .. } => dict.clone(),
        other => {
            return Err(PdfError::InvalidXref(format!(
                "expected xref stream at {}, found {}",
                offset,
                other.type_name()
            )))
        },
    };
    if let Some(kind) = dict.get("Type").and_then(Object::as_name) {
        if kind != "XRef" {
            return Err(PdfError::InvalidXref(format!("expected /Type /XRef, got /{}", kind)));
        }
    }

    let widths: Vec<usize> = dict
        .get("W")
        .and_then(Object::as_array)
        .map(|w| {
            w.iter()
                .filter_map(Object::as_integer)
                .filter(|&n| (0..=8).contains(&n))
                .map(|n| n as usize)
                .collect()
        })
        .unwrap_or_default();
    if widths.len() != 3 {
        return Err(PdfError::InvalidXref("invalid /W array".to_string()));
    }
    let (w1, w2, w3) = (widths[0], widths[1], widths[2]);
    let entry_size = w1 + w2 + w3;
    if entry_size == 0 {
        return Err(PdfError::InvalidXref("zero-width xref stream entries".to_string()));
    }

    let size = dict.get("Size").and_then(Object::as_integer).unwrap_or(0).max(0);
    let ranges: Vec<(i64, i64)> = match dict.get("Index").and_then(Object::as_array) {
        Some(index) => index
            .chunks(2)
            .filter_map(|pair| Some((pair.first()?.as_integer()?, pair.get(1)?.as_integer()?)))
            .collect(),
        None => vec![(0, size)],
    };

    let decoded = obj.decode_stream_data()?;
    let mut rows = decoded.chunks_exact(entry_size);
    let mut entries = HashMap::new();

    for (start, count) in ranges {
        for i in 0..count.max(0) {
            let Some(row) = rows.next() else {
                return Err(PdfError::InvalidXref("truncated xref stream data".to_string()));
            };
            let kind = if w1 == 0 { 1 } else { read_be(&row[..w1]) };
            let field2 = read_be(&row[w1..w1 + w2]);
            let field3 = read_be(&row[w1 + w2..]);
            let entry = match kind {
                0 => XRefEntry::Free,
                1 => XRefEntry::InUse {
                    offset: field2 as usize,
                    gen: field3.min(u16::MAX as u64) as u16,
                },
                2 => XRefEntry::Compressed {
                    stream: u32::try_from(field2).map_err(|_| {
                        PdfError::InvalidXref("object stream number overflow".to_string())
                    })?,
                    index: field3 as usize,
                },
                // Unknown types are treated as null references.
                _ => continue,
            };
            let num = start
                .checked_add(i)
                .ok_or_else(|| PdfError::InvalidXref("/Index range overflows".to_string()))?;
            if let Ok(num) = u32::try_from(num) {
                entries.entry(num).or_insert(entry);
            }
        }
    }

    Ok((entries, dict))
}

/// Big-endian unsigned integer of up to 8 bytes.
fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

fn skip_pdf_ws(mut input: &[u8]) -> &[u8] {
    while input.first().is_some_and(|&c| is_whitespace(c)) {
        input = &input[1..];
    }
    input
}

/// Whitespace-separated word reader used for xref tables.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos: pos.min(data.len()) }
    }

    fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    fn skip_ws(&mut self) {
        loop {
            let rest = self.rest();
            let trimmed = skip_pdf_ws(rest);
            self.pos += rest.len() - trimmed.len();
            if trimmed.first() == Some(&b'%') {
                let eol = trimmed
                    .iter()
                    .position(|&c| c == b'\r' || c == b'\n')
                    .unwrap_or(trimmed.len());
                self.pos += eol;
            } else {
                return;
            }
        }
    }

    fn next_word(&mut self) -> Option<&'a [u8]> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest.iter().position(|&c| is_whitespace(c)).unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        self.pos += len;
        Some(&rest[..len])
    }

    fn next_usize(&mut self) -> Option<usize> {
        let save = self.pos;
        let parsed = self
            .next_word()
            .and_then(|w| std::str::from_utf8(w).ok())
            .and_then(|w| w.parse().ok());
        if parsed.is_none() {
            self.pos = save;
        }
        parsed
    }
}
