//! Stream decoders.
//!
//! Signature lookup only ever needs to decode cross-reference streams and object
//! streams, which in practice use `FlateDecode`, optionally with a PNG predictor.
//! `ASCIIHexDecode` is accepted because some writers wrap small streams in it.

use crate::error::{PdfError, PdfResult};
use crate::object::Object;
use flate2::read::ZlibDecoder;
use std::io::Read;

/// Upper bound for a single decoded stream.
const MAX_DECODED_SIZE: u64 = 64 * 1024 * 1024;

/// Decode parameters (`/DecodeParms`) relevant to predictors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeParams {
    /// Predictor algorithm (1 = none, 10-15 = PNG)
    pub predictor: i64,
    /// Number of columns (samples per row)
    pub columns: usize,
    /// Colour components per sample
    pub colors: usize,
    /// Bits per component
    pub bits_per_component: usize,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            columns: 1,
            colors: 1,
            bits_per_component: 8,
        }
    }
}

impl DecodeParams {
    /// Read parameters from a `/DecodeParms` dictionary, defaulting missing entries.
    pub fn from_object(obj: &Object) -> Self {
        let mut params = Self::default();
        let Some(dict) = obj.as_dict() else {
            return params;
        };
        let get = |key: &str| dict.get(key).and_then(Object::as_integer);
        if let Some(p) = get("Predictor") {
            params.predictor = p;
        }
        if let Some(c) = get("Columns").filter(|c| *c > 0) {
            params.columns = c as usize;
        }
        if let Some(c) = get("Colors").filter(|c| *c > 0) {
            params.colors = c as usize;
        }
        if let Some(b) = get("BitsPerComponent").filter(|b| *b > 0) {
            params.bits_per_component = b as usize;
        }
        params
    }

    /// Bytes per row of sample data, not counting the PNG tag byte.
    fn row_len(&self) -> PdfResult<usize> {
        self.columns
            .checked_mul(self.colors)
            .and_then(|n| n.checked_mul(self.bits_per_component))
            .map(|bits| bits.div_ceil(8))
            .ok_or_else(|| PdfError::Decode("predictor row size overflows".to_string()))
    }

    /// Bytes per sample, at least one.
    fn bytes_per_pixel(&self) -> PdfResult<usize> {
        self.colors
            .checked_mul(self.bits_per_component)
            .map(|bits| bits.div_ceil(8).max(1))
            .ok_or_else(|| PdfError::Decode("predictor sample size overflows".to_string()))
    }
}

/// Decode `data` with the filter called `name`.
pub fn decode(name: &str, data: &[u8], params: Option<&DecodeParams>) -> PdfResult<Vec<u8>> {
    let decoded = match name {
        "FlateDecode" | "Fl" => inflate(data)?,
        "ASCIIHexDecode" | "AHx" => decode_ascii_hex(data)?,
        other => return Err(PdfError::UnsupportedFilter(other.to_string())),
    };

    match params {
        Some(p) if p.predictor >= 10 => decode_png_predictor(&decoded, p),
        Some(p) if p.predictor > 1 => {
            Err(PdfError::Decode(format!("Unsupported predictor: {}", p.predictor)))
        },
        _ => Ok(decoded),
    }
}

fn inflate(data: &[u8]) -> PdfResult<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .take(MAX_DECODED_SIZE)
        .read_to_end(&mut out)
        .map_err(|e| PdfError::Decode(format!("FlateDecode: {}", e)))?;
    Ok(out)
}

fn decode_ascii_hex(data: &[u8]) -> PdfResult<Vec<u8>> {
    let mut digits: Vec<u8> = Vec::with_capacity(data.len());
    for &b in data {
        match b {
            b'>' => break,
            b if b.is_ascii_whitespace() => continue,
            b if b.is_ascii_hexdigit() => digits.push(b),
            other => {
                return Err(PdfError::Decode(format!(
                    "ASCIIHexDecode: invalid character 0x{:02x}",
                    other
                )))
            },
        }
    }
    if digits.len() % 2 == 1 {
        digits.push(b'0');
    }
    Ok(digits
        .chunks(2)
        .map(|pair| (hex_value(pair[0]) << 4) | hex_value(pair[1]))
        .collect())
}

fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => 0,
    }
}

/// Reverse PNG row filters (predictors 10-15). Every row starts with its own tag byte.
fn decode_png_predictor(data: &[u8], params: &DecodeParams) -> PdfResult<Vec<u8>> {
    let row_len = params.row_len()?;
    let bpp = params.bytes_per_pixel()?;
    if row_len >= data.len() {
        return Err(PdfError::Decode(format!(
            "predictor row of {} bytes does not fit in {} bytes of data",
            row_len,
            data.len()
        )));
    }
    let stride = row_len + 1;

    let mut output = Vec::with_capacity(data.len() / stride * row_len);
    let mut prev = vec![0u8; row_len];

    for chunk in data.chunks(stride) {
        if chunk.len() < stride {
            // Truncated trailing row: ignore like most readers do.
            log::debug!("Ignoring truncated predictor row of {} bytes", chunk.len());
            break;
        }
        let (tag, encoded) = (chunk[0], &chunk[1..]);
        let mut row = encoded.to_vec();

        for i in 0..row_len {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prev[i];
            let up_left = if i >= bpp { prev[i - bpp] } else { 0 };
            row[i] = match tag {
                0 => row[i],
                1 => row[i].wrapping_add(left),
                2 => row[i].wrapping_add(up),
                3 => row[i].wrapping_add(((left as u16 + up as u16) / 2) as u8),
                4 => row[i].wrapping_add(paeth(left, up, up_left)),
                other => {
                    return Err(PdfError::Decode(format!("Invalid PNG filter type: {}", other)))
                },
            };
        }

        output.extend_from_slice(&row);
        prev = row;
    }

    Ok(output)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}
