//! PDF object parser.
//!
//! Combines lexer tokens into objects using recursive descent. Indirect
//! references (`10 0 R`) are recognized by two-token lookahead after an integer,
//! and a dictionary followed by `stream` becomes a stream object.

use crate::error::{PdfError, PdfResult};
use crate::lexer::{token, Token};
use crate::object::{Dictionary, Object, ObjectRef};
use nom::IResult;

/// Nesting limit for arrays and dictionaries.
const MAX_DEPTH: usize = 64;

fn fail<T>(input: &[u8], kind: nom::error::ErrorKind) -> IResult<&[u8], T> {
    Err(nom::Err::Error(nom::error::Error::new(input, kind)))
}

/// Parse one PDF object.
///
/// ```
/// use diploma_oxide::parser::parse_object;
///
/// let (_, obj) = parse_object(b"<< /ByteRange [0 10 20 30] >>").unwrap();
/// let range = obj.as_dict().unwrap()["ByteRange"].as_array().unwrap();
/// assert_eq!(range.len(), 4);
/// ```
pub fn parse_object(input: &[u8]) -> IResult<&[u8], Object> {
    parse_nested(input, 0)
}

fn parse_nested(input: &[u8], depth: usize) -> IResult<&[u8], Object> {
    if depth > MAX_DEPTH {
        return fail(input, nom::error::ErrorKind::TooLarge);
    }

    let (rest, tok) = token(input)?;
    match tok {
        Token::Null => Ok((rest, Object::Null)),
        Token::True => Ok((rest, Object::Boolean(true))),
        Token::False => Ok((rest, Object::Boolean(false))),
        Token::Integer(i) => {
            if let Ok((after_gen, Token::Integer(gen))) = token(rest) {
                if let Ok((after_r, Token::R)) = token(after_gen) {
                    if (0..=u32::MAX as i64).contains(&i) && (0..=u16::MAX as i64).contains(&gen) {
                        let r = ObjectRef::new(i as u32, gen as u16);
                        return Ok((after_r, Object::Reference(r)));
                    }
                }
            }
            Ok((rest, Object::Integer(i)))
        },
        Token::Real(r) => Ok((rest, Object::Real(r))),
        Token::LiteralString(raw) => Ok((rest, Object::String(decode_literal_string_escapes(raw)))),
        Token::HexString(hex) => Ok((rest, Object::String(decode_hex(hex)))),
        Token::Name(name) => Ok((rest, Object::Name(name))),
        Token::ArrayStart => parse_array(rest, depth),
        Token::DictStart => {
            let (rest, dict) = parse_dictionary(rest, depth)?;
            if let Ok((after_kw, Token::StreamStart)) = token(rest) {
                let (rest, data) = parse_stream_data(after_kw, &dict)?;
                return Ok((
                    rest,
                    Object::Stream {
                        dict,
                        data: bytes::Bytes::from(data),
                    },
                ));
            }
            Ok((rest, Object::Dictionary(dict)))
        },
        _ => fail(input, nom::error::ErrorKind::Tag),
    }
}

fn parse_array(mut input: &[u8], depth: usize) -> IResult<&[u8], Object> {
    let mut items = Vec::new();
    loop {
        if let Ok((rest, Token::ArrayEnd)) = token(input) {
            return Ok((rest, Object::Array(items)));
        }
        let (rest, obj) = parse_nested(input, depth + 1)?;
        items.push(obj);
        input = rest;
    }
}

fn parse_dictionary(mut input: &[u8], depth: usize) -> IResult<&[u8], Dictionary> {
    let mut dict = Dictionary::new();
    loop {
        let (rest, tok) = token(input)?;
        match tok {
            Token::DictEnd => return Ok((rest, dict)),
            Token::Name(key) => {
                let (rest, value) = parse_nested(rest, depth + 1)?;
                // A null value is equivalent to the key being absent.
                if !value.is_null() {
                    dict.insert(key, value);
                }
                input = rest;
            },
            _ => return fail(input, nom::error::ErrorKind::Tag),
        }
    }
}

/// Read stream bytes after the `stream` keyword: `/Length` bytes when it is a
/// direct integer that lands on `endstream`, else everything up to `endstream`.
fn parse_stream_data<'a>(input: &'a [u8], dict: &Dictionary) -> IResult<&'a [u8], Vec<u8>> {
    let input = if input.starts_with(b"\r\n") {
        &input[2..]
    } else if input.starts_with(b"\n") || input.starts_with(b"\r") {
        &input[1..]
    } else {
        input
    };

    if let Some(len) = dict.get("Length").and_then(Object::as_integer) {
        let len = len.max(0) as usize;
        if len <= input.len() {
            if let Ok((rest, Token::StreamEnd)) = token(&input[len..]) {
                return Ok((rest, input[..len].to_vec()));
            }
        }
        log::debug!("Stream /Length {} does not end at endstream, scanning", len);
    }

    match find_subslice(input, b"endstream") {
        Some(pos) => {
            let mut data = &input[..pos];
            if data.ends_with(b"\r\n") {
                data = &data[..data.len() - 2];
            } else if data.ends_with(b"\n") || data.ends_with(b"\r") {
                data = &data[..data.len() - 1];
            }
            Ok((&input[pos + b"endstream".len()..], data.to_vec()))
        },
        None => fail(input, nom::error::ErrorKind::Eof),
    }
}

/// Position of `needle` in `haystack`.
pub fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Decode escape sequences in literal string bytes.
///
/// Handles `\n \r \t \b \f \( \) \\`, octal `\ddd` and line continuations.
pub fn decode_literal_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let c = raw[i];
        if c != b'\\' || i + 1 >= raw.len() {
            out.push(c);
            i += 1;
            continue;
        }
        let next = raw[i + 1];
        i += 2;
        match next {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'0'..=b'7' => {
                let mut value = (next - b'0') as u32;
                let mut digits = 1;
                while digits < 3 && i < raw.len() && (b'0'..=b'7').contains(&raw[i]) {
                    value = value * 8 + (raw[i] - b'0') as u32;
                    i += 1;
                    digits += 1;
                }
                out.push((value & 0xFF) as u8);
            },
            b'\r' => {
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            },
            b'\n' => {},
            other => out.push(other),
        }
    }
    out
}

/// Decode hex string digits, ignoring whitespace; an odd final digit is padded with 0.
pub fn decode_hex(hex: &[u8]) -> Vec<u8> {
    let digits: Vec<u8> = hex
        .iter()
        .filter_map(|&c| (c as char).to_digit(16).map(|d| d as u8))
        .collect();
    digits
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect()
}

/// Parse a full object, mapping nom errors to a [`PdfError`] at `offset`.
pub fn parse_object_at(input: &[u8], offset: usize) -> PdfResult<(Object, &[u8])> {
    match parse_object(input) {
        Ok((rest, obj)) => Ok((obj, rest)),
        Err(e) => Err(PdfError::ParseError {
            offset,
            reason: format!("{:?}", e.map(|e| e.code)),
        }),
    }
}

/// Parse `N G obj`, returning the remaining input and the object number.
pub fn object_header(input: &[u8]) -> Option<(&[u8], u32, u16)> {
    let (rest, id) = token(input).ok()?;
    let (rest, gen) = token(rest).ok()?;
    let (rest, kw) = token(rest).ok()?;
    match (id, gen, kw) {
        (Token::Integer(id), Token::Integer(gen), Token::ObjStart) => {
            let id = u32::try_from(id).ok()?;
            let gen = u16::try_from(gen).ok()?;
            Some((rest, id, gen))
        },
        _ => None,
    }
}

/// Parse an indirect object `N G obj ... endobj` starting at `data[offset..]`.
///
/// `endobj` is optional; some writers omit it before `xref`.
pub fn parse_indirect_object(data: &[u8], offset: usize) -> PdfResult<(ObjectRef, Object)> {
    let bad = |reason: &str| PdfError::ParseError {
        offset,
        reason: reason.to_string(),
    };
    let input = data.get(offset..).ok_or_else(|| bad("offset beyond end of file"))?;

    let (rest, id, gen) = object_header(input).ok_or_else(|| bad("expected 'N G obj' header"))?;
    let (obj, _) = parse_object_at(rest, offset)?;
    Ok((ObjectRef::new(id, gen), obj))
}
