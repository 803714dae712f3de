//! Object streams (PDF 1.5+).
//!
//! An object stream packs several objects into one compressed stream. Its
//! decoded data starts with `/N` pairs of integers `objnum offset`, and the
//! objects themselves follow at byte `/First`, each offset relative to it.

use crate::error::{PdfError, PdfResult};
use crate::lexer::{token, Token};
use crate::object::Object;
use crate::parser::parse_object;

/// Upper bound for `/N`.
const MAX_OBJECTS: i64 = 1_000_000;

/// A decoded object stream.
#[derive(Debug)]
pub struct ObjectStream {
    data: Vec<u8>,
    first: usize,
    pairs: Vec<(u32, usize)>,
}

impl ObjectStream {
    /// Decode `stream_obj` and read its header pairs.
    pub fn new(stream_obj: &Object) -> PdfResult<Self> {
        let dict = match stream_obj {
            Object::Stream { dict, .. } => dict,
            other => {
                return Err(PdfError::InvalidObjectType {
                    expected: "Stream".to_string(),
                    found: other.type_name().to_string(),
                })
            },
        };
        if let Some(kind) = dict.get("Type").and_then(Object::as_name) {
            if kind != "ObjStm" {
                return Err(PdfError::Decode(format!("expected /Type /ObjStm, got /{}", kind)));
            }
        }

        let n = dict
            .get("N")
            .and_then(Object::as_integer)
            .filter(|n| (0..=MAX_OBJECTS).contains(n))
            .ok_or_else(|| PdfError::Decode("object stream has no valid /N".to_string()))?;
        let first = dict
            .get("First")
            .and_then(Object::as_integer)
            .filter(|f| *f >= 0)
            .ok_or_else(|| PdfError::Decode("object stream has no valid /First".to_string()))?
            as usize;

        let data = stream_obj.decode_stream_data()?;
        if data.len() < first {
            return Err(PdfError::Decode(format!(
                "object stream data too short: {} bytes, /First is {}",
                data.len(),
                first
            )));
        }

        let pairs = read_pairs(&data[..first], n as usize)?;
        Ok(Self { data, first, pairs })
    }

    /// Number of objects declared in the header.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Parse the object at `index`, checking that it carries number `expected_id`.
    pub fn object_at(&self, index: usize, expected_id: u32) -> PdfResult<Object> {
        let &(id, offset) = self
            .pairs
            .get(index)
            .ok_or_else(|| PdfError::ObjectNotFound(expected_id, 0))?;
        if id != expected_id {
            return Err(PdfError::Decode(format!(
                "object stream index {} holds object {}, expected {}",
                index, id, expected_id
            )));
        }
        let start = self.first.checked_add(offset).ok_or_else(|| PdfError::ParseError {
            offset,
            reason: "object offset overflows object stream".to_string(),
        })?;
        let body = self.data.get(start..).ok_or_else(|| PdfError::ParseError {
            offset: start,
            reason: "object offset beyond object stream data".to_string(),
        })?;
        parse_object(body)
            .map(|(_, obj)| obj)
            .map_err(|e| PdfError::ParseError {
                offset: start,
                reason: format!("object {} in object stream: {:?}", id, e.map(|e| e.code)),
            })
    }
}

fn read_pairs(mut header: &[u8], count: usize) -> PdfResult<Vec<(u32, usize)>> {
    let mut pairs = Vec::with_capacity(count.min(4096));
    for i in 0..count {
        let (rest, num) = token(header).map_err(|_| truncated(i))?;
        let (rest, offset) = token(rest).map_err(|_| truncated(i))?;
        match (num, offset) {
            (Token::Integer(num), Token::Integer(offset)) if num >= 0 && offset >= 0 => {
                let num = u32::try_from(num).map_err(|_| truncated(i))?;
                pairs.push((num, offset as usize));
            },
            _ => return Err(truncated(i)),
        }
        header = rest;
    }
    Ok(pairs)
}

fn truncated(index: usize) -> PdfError {
    PdfError::Decode(format!("object stream header pair {} is missing or invalid", index))
}
