//! Shared fixtures: test certificate authorities and signed diploma PDFs.

#![allow(dead_code)]

use diploma_oxide::CertificateTrustStore;
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::stack::Stack;
use openssl::x509::extension::{BasicConstraints, SubjectKeyIdentifier};
use openssl::x509::{X509Builder, X509NameBuilder, X509};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static SERIAL: AtomicU32 = AtomicU32::new(1000);

pub const DAY: i64 = 24 * 60 * 60;

/// Hex digits reserved for `/Contents`.
const CONTENTS_HEX_LEN: usize = 16384;

const BYTE_RANGE_PLACEHOLDER: &str = "[0000000000 0000000000 0000000000 0000000000]";

pub fn now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64
}

/// A certificate, its key and the intermediates between it and the root.
pub struct TestCa {
    pub cert: X509,
    pub key: PKey<Private>,
    pub chain: Vec<X509>,
    is_root: bool,
}

impl TestCa {
    pub fn root(cn: &str) -> Self {
        let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        let cert = make_cert(cn, &key, None, true, now() - DAY, now() + 365 * DAY);
        Self {
            cert,
            key,
            chain: Vec::new(),
            is_root: true,
        }
    }

    pub fn intermediate(&self, cn: &str) -> Self {
        self.child(cn, true, now() - DAY, now() + 365 * DAY)
    }

    pub fn leaf(&self, cn: &str) -> Self {
        self.child(cn, false, now() - DAY, now() + 365 * DAY)
    }

    pub fn leaf_valid_between(&self, cn: &str, not_before: i64, not_after: i64) -> Self {
        self.child(cn, false, not_before, not_after)
    }

    fn child(&self, cn: &str, ca: bool, not_before: i64, not_after: i64) -> Self {
        let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        let cert = make_cert(cn, &key, Some(self), ca, not_before, not_after);
        let mut chain = Vec::new();
        if !self.is_root {
            chain.push(self.cert.clone());
            chain.extend(self.chain.iter().cloned());
        }
        Self {
            cert,
            key,
            chain,
            is_root: false,
        }
    }

    pub fn der(&self) -> Vec<u8> {
        self.cert.to_der().unwrap()
    }

    pub fn pem(&self) -> Vec<u8> {
        self.cert.to_pem().unwrap()
    }

    /// A trust store holding just this certificate.
    pub fn trust_store(&self) -> CertificateTrustStore {
        CertificateTrustStore::from_der_certificates([self.der()]).unwrap()
    }
}

fn make_cert(
    cn: &str,
    key: &PKey<Private>,
    issuer: Option<&TestCa>,
    ca: bool,
    not_before: i64,
    not_after: i64,
) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", cn).unwrap();
    name.append_entry_by_text("O", "Diploma Register Test").unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(SERIAL.fetch_add(1, Ordering::SeqCst)).unwrap();
    builder.set_serial_number(&serial.to_asn1_integer().unwrap()).unwrap();
    builder.set_subject_name(&name).unwrap();
    match issuer {
        Some(issuer) => builder.set_issuer_name(issuer.cert.subject_name()).unwrap(),
        None => builder.set_issuer_name(&name).unwrap(),
    }
    builder.set_pubkey(key).unwrap();
    builder.set_not_before(&Asn1Time::from_unix(not_before).unwrap()).unwrap();
    builder.set_not_after(&Asn1Time::from_unix(not_after).unwrap()).unwrap();
    if ca {
        builder
            .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
            .unwrap();
    }
    let ski = SubjectKeyIdentifier::new()
        .build(&builder.x509v3_context(issuer.map(|i| i.cert.as_ref()), None))
        .unwrap();
    builder.append_extension(ski).unwrap();

    let signing_key = issuer.map(|i| &i.key).unwrap_or(key);
    builder.sign(signing_key, MessageDigest::sha256()).unwrap();
    builder.build()
}

fn pkcs7(signer: &TestCa, data: &[u8], flags: Pkcs7Flags) -> Vec<u8> {
    let mut certs = Stack::new().unwrap();
    for cert in &signer.chain {
        certs.push(cert.clone()).unwrap();
    }
    Pkcs7::sign(&signer.cert, &signer.key, &certs, data, flags)
        .unwrap()
        .to_der()
        .unwrap()
}

/// Signature packaging written into `/SubFilter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packaging {
    Detached,
    LegacySha1,
}

impl Packaging {
    fn sub_filter(self) -> &'static str {
        match self {
            Packaging::Detached => "adbe.pkcs7.detached",
            Packaging::LegacySha1 => "adbe.pkcs7.sha1",
        }
    }
}

/// A signed PDF with the location of its signature container.
pub struct SignedPdf {
    pub bytes: Vec<u8>,
    /// Offset of `<` opening `/Contents`.
    pub gap_start: usize,
    /// Offset just past the closing `>`.
    pub gap_end: usize,
}

/// Build a one-page PDF whose catalog carries a DocMDP signature by `signer`.
pub fn signed_pdf(signer: &TestCa, packaging: Packaging) -> SignedPdf {
    signed_pdf_with_sub_filter(signer, packaging, packaging.sub_filter())
}

/// Like [`signed_pdf`] but writes `sub_filter` regardless of how the envelope is packed.
pub fn signed_pdf_with_sub_filter(signer: &TestCa, packaging: Packaging, sub_filter: &str) -> SignedPdf {
    let placeholder = "0".repeat(CONTENTS_HEX_LEN);
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R /Perms << /DocMDP 4 0 R >> >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] >>".to_string(),
        format!(
            "<< /Type /Sig /Filter /Adobe.PPKLite /SubFilter /{} /ByteRange {} /Contents <{}> /M (D:20240101120000Z) >>",
            sub_filter, BYTE_RANGE_PLACEHOLDER, placeholder
        ),
    ];
    let mut pdf = assemble(&objects);

    let gap_start = find(&pdf, b"/Contents <") + "/Contents ".len();
    let gap_end = gap_start + CONTENTS_HEX_LEN + 2;
    let byte_range = format!(
        "[{:010} {:010} {:010} {:010}]",
        0,
        gap_start,
        gap_end,
        pdf.len() - gap_end
    );
    let at = find(&pdf, BYTE_RANGE_PLACEHOLDER.as_bytes());
    pdf[at..at + byte_range.len()].copy_from_slice(byte_range.as_bytes());

    let mut signed = pdf[..gap_start].to_vec();
    signed.extend_from_slice(&pdf[gap_end..]);
    let envelope = match packaging {
        Packaging::Detached => pkcs7(signer, &signed, Pkcs7Flags::DETACHED | Pkcs7Flags::BINARY),
        Packaging::LegacySha1 => pkcs7(signer, &openssl::sha::sha1(&signed), Pkcs7Flags::BINARY),
    };
    let hex: String = envelope.iter().map(|b| format!("{:02X}", b)).collect();
    assert!(hex.len() <= CONTENTS_HEX_LEN, "envelope does not fit the placeholder");
    pdf[gap_start + 1..gap_start + 1 + hex.len()].copy_from_slice(hex.as_bytes());

    SignedPdf {
        bytes: pdf,
        gap_start,
        gap_end,
    }
}

/// An unsigned PDF with a plain catalog.
pub fn unsigned_pdf() -> Vec<u8> {
    assemble(&[
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [] /Count 0 >>".to_string(),
    ])
}

fn assemble(objects: &[String]) -> Vec<u8> {
    let mut out = b"%PDF-1.7\n% diploma register test file\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    out.extend_from_slice(b"% issued for testing only\n");
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

pub fn find(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
        .unwrap_or_else(|| panic!("{:?} not found", String::from_utf8_lossy(needle)))
}
