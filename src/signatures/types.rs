//! Signature data types.

use std::fmt;

/// Signature packaging declared by `/SubFilter`.
///
/// Only two formats are accepted. Anything else is carried as
/// [`SubFilterKind::Unsupported`] so that it can be reported, and is always
/// rejected by the verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubFilterKind {
    /// `adbe.pkcs7.sha1`: the envelope signs a SHA-1 digest of the byte ranges.
    LegacySha1,
    /// `adbe.pkcs7.detached`: the envelope signs the byte ranges directly.
    Detached,
    /// Any other sub-filter name.
    Unsupported(String),
}

impl SubFilterKind {
    /// Classify a `/SubFilter` name.
    pub fn from_pdf_name(name: &str) -> Self {
        match name {
            "adbe.pkcs7.sha1" => SubFilterKind::LegacySha1,
            "adbe.pkcs7.detached" => SubFilterKind::Detached,
            other => SubFilterKind::Unsupported(other.to_string()),
        }
    }

    /// The PDF name this kind was read from.
    pub fn as_pdf_name(&self) -> &str {
        match self {
            SubFilterKind::LegacySha1 => "adbe.pkcs7.sha1",
            SubFilterKind::Detached => "adbe.pkcs7.detached",
            SubFilterKind::Unsupported(name) => name,
        }
    }
}

impl fmt::Display for SubFilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_pdf_name())
    }
}

/// The two signed spans `[offset0, length0, offset1, length1]` of a file.
///
/// A `ByteRange` only exists once its four values are known to be
/// non-negative and to fit in `usize`; see [`ByteRange::from_values`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub offset0: usize,
    pub length0: usize,
    pub offset1: usize,
    pub length1: usize,
}

/// The located signature of a document.
#[derive(Debug, Clone)]
pub struct SignatureDescriptor {
    pub byte_range: ByteRange,
    pub sub_filter: SubFilterKind,
    /// Decoded `/Contents`, zero padding included.
    pub contents: Vec<u8>,
}

/// Bytes of a document that are covered by a verified signature.
///
/// Built only by the verifier. It is a fresh buffer: the signed spans are
/// copied to their original offsets and the signature container between
/// them is zeroed.
#[derive(Clone, PartialEq, Eq)]
pub struct TrustedDocument {
    bytes: Vec<u8>,
}

impl TrustedDocument {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for TrustedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustedDocument")
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl AsRef<[u8]> for TrustedDocument {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_filter_names() {
        assert_eq!(SubFilterKind::from_pdf_name("adbe.pkcs7.sha1"), SubFilterKind::LegacySha1);
        assert_eq!(SubFilterKind::from_pdf_name("adbe.pkcs7.detached"), SubFilterKind::Detached);
        assert_eq!(SubFilterKind::Detached.as_pdf_name(), "adbe.pkcs7.detached");
    }

    #[test]
    fn test_unknown_sub_filter_is_kept() {
        let kind = SubFilterKind::from_pdf_name("ETSI.CAdES.detached");
        assert_eq!(kind, SubFilterKind::Unsupported("ETSI.CAdES.detached".to_string()));
        assert_eq!(kind.to_string(), "ETSI.CAdES.detached");
        // Names are case-sensitive.
        assert!(matches!(
            SubFilterKind::from_pdf_name("ADBE.PKCS7.SHA1"),
            SubFilterKind::Unsupported(_)
        ));
    }

    #[test]
    fn test_trusted_document_debug_hides_bytes() {
        let doc = TrustedDocument::new(vec![0x25; 3]);
        assert_eq!(format!("{:?}", doc), "TrustedDocument { len: 3 }");
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.into_bytes(), b"%%%");
    }
}
