//! PDF signature verification.
//!
//! Finds the document-level signature at `trailer.Root.Perms.DocMDP`, checks
//! that its ByteRange covers the whole file, verifies the PKCS#7 envelope
//! against the trust store and returns only the signed bytes.

use super::envelope::{EnvelopeError, SignedEnvelope};
use super::trust::CertificateTrustStore;
use super::types::{ByteRange, SignatureDescriptor, SubFilterKind, TrustedDocument};
use crate::document::PdfDocument;
use crate::error::{Error, ErrorKind, PdfError, Result};
use crate::object::{Dictionary, Object};
use sha1::{Digest, Sha1};

const OP: &str = "verify PDF";

fn pdf_error(err: PdfError) -> Error {
    Error::new(OP, ErrorKind::Pdf).with_cause(err)
}

fn malformed(reason: &str) -> Error {
    Error::new(OP, ErrorKind::MalformedSignature).with_cause(reason.to_string())
}

fn invalid_signature(err: EnvelopeError) -> Error {
    Error::new(OP, ErrorKind::SignatureInvalid).with_cause(err)
}

/// Verify the DocMDP signature of `raw` and return the bytes it covers.
///
/// The returned document has the length `offset1 + length1` of the
/// ByteRange, holds the two signed spans at their original offsets, and
/// zeroes the signature container between them.
pub fn verify(raw: &[u8], trust: &CertificateTrustStore) -> Result<TrustedDocument> {
    let descriptor = locate_signature(raw)?;
    let range = descriptor.byte_range;
    range.validate(raw.len()).map_err(|e| e.context(OP))?;

    let content = range.signed_content(raw);
    log::debug!(
        "Verifying {} signature over {} of {} bytes",
        descriptor.sub_filter,
        content.len(),
        raw.len()
    );

    match &descriptor.sub_filter {
        SubFilterKind::LegacySha1 => verify_legacy(&descriptor.contents, &content, trust)?,
        SubFilterKind::Detached => verify_detached(&descriptor.contents, &content, trust)?,
        SubFilterKind::Unsupported(name) => {
            return Err(Error::new(OP, ErrorKind::UnsupportedSubFilter(name.clone())));
        },
    }

    Ok(range.reconstruct(raw))
}

/// `adbe.pkcs7.sha1`: the envelope signs the SHA-1 digest of the signed spans.
fn verify_legacy(contents: &[u8], content: &[u8], trust: &CertificateTrustStore) -> Result<()> {
    let envelope = SignedEnvelope::parse(contents).map_err(invalid_signature)?;
    let signed_digest = envelope
        .verify_attached(trust.certificates())
        .map_err(invalid_signature)?;
    if signed_digest.as_slice() != Sha1::digest(content).as_slice() {
        return Err(invalid_signature(EnvelopeError::DigestMismatch));
    }
    Ok(())
}

/// `adbe.pkcs7.detached`: the envelope signs the signed spans themselves.
fn verify_detached(contents: &[u8], content: &[u8], trust: &CertificateTrustStore) -> Result<()> {
    let envelope = SignedEnvelope::parse(contents).map_err(invalid_signature)?;
    envelope
        .verify_detached(content, trust.certificates())
        .map_err(invalid_signature)
}

/// Read the signature dictionary of `raw` without verifying anything.
pub fn locate_signature(raw: &[u8]) -> Result<SignatureDescriptor> {
    let mut doc = PdfDocument::from_bytes(raw).map_err(pdf_error)?;
    let signature = doc
        .lookup(&["Root", "Perms", "DocMDP"])
        .map_err(pdf_error)?
        .ok_or_else(|| Error::new(OP, ErrorKind::SignatureNotFound))?;
    let dict = signature
        .as_dict()
        .ok_or_else(|| malformed("DocMDP is not a dictionary"))?;

    let contents = field(&mut doc, dict, "Contents")?
        .and_then(|obj| obj.as_string().map(<[u8]>::to_vec))
        .ok_or_else(|| malformed("/Contents is missing or not a string"))?;
    let sub_filter = field(&mut doc, dict, "SubFilter")?
        .and_then(|obj| obj.as_name().map(SubFilterKind::from_pdf_name))
        .ok_or_else(|| malformed("/SubFilter is missing or not a name"))?;

    let values = match field(&mut doc, dict, "ByteRange")? {
        Some(Object::Array(items)) => {
            let mut values = Vec::with_capacity(items.len());
            for item in &items {
                values.push(doc.resolve(item).map_err(pdf_error)?.as_integer());
            }
            values.into_iter().collect::<Option<Vec<i64>>>()
        },
        _ => None,
    }
    .ok_or_else(|| {
        Error::new(OP, ErrorKind::InvalidByteRange)
            .with_cause("/ByteRange is missing or not an array of integers")
    })?;
    let byte_range = ByteRange::from_values(&values).map_err(|e| e.context(OP))?;

    Ok(SignatureDescriptor {
        byte_range,
        sub_filter,
        contents,
    })
}

fn field(doc: &mut PdfDocument<'_>, dict: &Dictionary, key: &str) -> Result<Option<Object>> {
    match dict.get(key) {
        Some(value) => {
            let value = doc.resolve(value).map_err(pdf_error)?;
            Ok((!value.is_null()).then_some(value))
        },
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatures::test_support::Authority;

    /// One-object-per-entry PDF whose catalog is object 1.
    fn build_pdf(objects: &[&str]) -> Vec<u8> {
        let mut out = b"%PDF-1.7\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }
        let xref_at = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for offset in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref_at
            )
            .as_bytes(),
        );
        out
    }

    fn trust() -> CertificateTrustStore {
        CertificateTrustStore::from_der_certificates([Authority::root("Root").der()]).unwrap()
    }

    fn kind_of(raw: &[u8]) -> ErrorKind {
        locate_signature(raw).unwrap_err().kind().clone()
    }

    #[test]
    fn test_locate_signature() {
        let pdf = build_pdf(&[
            "<< /Type /Catalog /Perms << /DocMDP 2 0 R >> >>",
            "<< /Type /Sig /SubFilter /adbe.pkcs7.detached /ByteRange [0 10 20 5] /Contents <3082AB00> >>",
        ]);
        let sig = locate_signature(&pdf).unwrap();
        assert_eq!(sig.sub_filter, SubFilterKind::Detached);
        assert_eq!(sig.contents, vec![0x30, 0x82, 0xAB, 0x00]);
        assert_eq!(
            sig.byte_range,
            ByteRange {
                offset0: 0,
                length0: 10,
                offset1: 20,
                length1: 5
            }
        );
    }

    #[test]
    fn test_indirect_byte_range() {
        let pdf = build_pdf(&[
            "<< /Type /Catalog /Perms << /DocMDP 2 0 R >> >>",
            "<< /SubFilter /adbe.pkcs7.sha1 /ByteRange 3 0 R /Contents <00> >>",
            "[0 4 0 R 8 9]",
            "100",
        ]);
        let sig = locate_signature(&pdf).unwrap();
        assert_eq!(sig.sub_filter, SubFilterKind::LegacySha1);
        assert_eq!(sig.byte_range.length0, 100);
    }

    #[test]
    fn test_no_docmdp() {
        let pdf = build_pdf(&["<< /Type /Catalog >>"]);
        assert_eq!(kind_of(&pdf), ErrorKind::SignatureNotFound);

        let pdf = build_pdf(&["<< /Type /Catalog /Perms << /UR3 2 0 R >> >>", "<< >>"]);
        assert_eq!(kind_of(&pdf), ErrorKind::SignatureNotFound);
    }

    #[test]
    fn test_malformed_fields() {
        let pdf = build_pdf(&[
            "<< /Type /Catalog /Perms << /DocMDP << /SubFilter /adbe.pkcs7.detached /ByteRange [0 1 2 3] >> >> >>",
        ]);
        assert_eq!(kind_of(&pdf), ErrorKind::MalformedSignature);

        let pdf = build_pdf(&[
            "<< /Type /Catalog /Perms << /DocMDP << /SubFilter (adbe.pkcs7.detached) /Contents <00> /ByteRange [0 1 2 3] >> >> >>",
        ]);
        assert_eq!(kind_of(&pdf), ErrorKind::MalformedSignature);
    }

    #[test]
    fn test_bad_byte_range_shape() {
        for range in ["[0 1 2]", "[0 1 2 3.5]", "[0 -1 2 3]", "(0 1 2 3)"] {
            let catalog = format!(
                "<< /Type /Catalog /Perms << /DocMDP << /SubFilter /adbe.pkcs7.detached /Contents <00> /ByteRange {} >> >> >>",
                range
            );
            let pdf = build_pdf(&[&catalog]);
            assert_eq!(kind_of(&pdf), ErrorKind::InvalidByteRange, "{}", range);
        }
    }

    #[test]
    fn test_not_a_pdf() {
        let err = verify(b"PK\x03\x04 definitely a zip", &trust()).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Pdf);
        assert_eq!(err.op(), "verify PDF");
    }

    #[test]
    fn test_byte_range_checked_before_sub_filter() {
        // The range cannot match this file, so hashing and dispatch never happen.
        let pdf = build_pdf(&[
            "<< /Type /Catalog /Perms << /DocMDP << /SubFilter /ETSI.CAdES.detached /Contents <00> /ByteRange [0 10 20 5] >> >> >>",
        ]);
        assert_eq!(verify(&pdf, &trust()).unwrap_err().kind(), &ErrorKind::InvalidByteRange);
    }

    #[test]
    fn test_unsupported_sub_filter() {
        let body = "<< /Type /Catalog /Perms << /DocMDP << /SubFilter /ETSI.CAdES.detached /Contents <00> /ByteRange [0 0 0 LEN] >> >> >>";
        // Iterate until the declared length matches the file length.
        let mut len = 0;
        let pdf = loop {
            let pdf = build_pdf(&[&body.replace("LEN", &len.to_string())]);
            if pdf.len() == len {
                break pdf;
            }
            len = pdf.len();
        };
        let err = verify(&pdf, &trust()).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnsupportedSubFilter("ETSI.CAdES.detached".to_string()));
    }
}
