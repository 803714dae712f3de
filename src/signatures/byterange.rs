//! ByteRange validation and trusted-buffer reconstruction.
//!
//! The ByteRange of a signature names two spans of the file: everything before
//! the `/Contents` hex string and everything after it. A ByteRange is only
//! accepted when those spans start at the first byte, end at the last byte,
//! and do not overlap. All checks run before any hashing.

use super::types::{ByteRange, TrustedDocument};
use crate::error::{Error, ErrorKind, Result};

const OP: &str = "check byte range";

fn invalid(reason: String) -> Error {
    Error::new(OP, ErrorKind::InvalidByteRange).with_cause(reason)
}

impl ByteRange {
    /// Build a range from the four integers of a `/ByteRange` array.
    pub fn from_values(values: &[i64]) -> Result<Self> {
        let [o0, l0, o1, l1] = match values {
            [a, b, c, d] => [*a, *b, *c, *d],
            _ => return Err(invalid(format!("expected 4 integers, got {}", values.len()))),
        };
        let to_usize = |v: i64| {
            usize::try_from(v).map_err(|_| invalid(format!("negative or oversized value {}", v)))
        };
        Ok(Self {
            offset0: to_usize(o0)?,
            length0: to_usize(l0)?,
            offset1: to_usize(o1)?,
            length1: to_usize(l1)?,
        })
    }

    /// Check that the spans cover a file of `total_len` bytes end to end.
    pub fn validate(&self, total_len: usize) -> Result<()> {
        if self.offset0 != 0 {
            return Err(invalid(format!("first span starts at {}, not 0", self.offset0)));
        }
        let end = self
            .offset1
            .checked_add(self.length1)
            .ok_or_else(|| invalid("second span overflows".to_string()))?;
        if end != total_len {
            return Err(invalid(format!(
                "second span ends at {}, file has {} bytes",
                end, total_len
            )));
        }
        if self.length0 > self.offset1 {
            return Err(invalid(format!(
                "first span ({} bytes) overlaps second span at {}",
                self.length0, self.offset1
            )));
        }
        Ok(())
    }

    /// The two signed spans of `data`, in order.
    ///
    /// Call [`ByteRange::validate`] first; spans beyond `data` come back empty.
    pub fn spans<'a>(&self, data: &'a [u8]) -> (&'a [u8], &'a [u8]) {
        let before = data
            .get(self.offset0..self.offset0 + self.length0)
            .unwrap_or_default();
        let after = data
            .get(self.offset1..self.offset1 + self.length1)
            .unwrap_or_default();
        (before, after)
    }

    /// `before || after`, the message covered by the signature.
    pub fn signed_content(&self, data: &[u8]) -> Vec<u8> {
        let (before, after) = self.spans(data);
        let mut out = Vec::with_capacity(before.len() + after.len());
        out.extend_from_slice(before);
        out.extend_from_slice(after);
        out
    }

    /// Copy the signed spans of `data` into a fresh buffer of `offset1 + length1`
    /// bytes, at their original offsets. The gap between them is zero-filled.
    pub(crate) fn reconstruct(&self, data: &[u8]) -> TrustedDocument {
        let (before, after) = self.spans(data);
        let mut out = vec![0u8; self.offset1 + self.length1];
        out[self.offset0..self.offset0 + before.len()].copy_from_slice(before);
        out[self.offset1..self.offset1 + after.len()].copy_from_slice(after);
        TrustedDocument::new(out)
    }
}
