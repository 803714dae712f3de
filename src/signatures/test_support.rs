//! Test certificates and PKCS#7 envelopes minted with OpenSSL.

use super::chain::ParsedCert;
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

static SERIAL: AtomicU32 = AtomicU32::new(1);

pub const DAY: i64 = 24 * 60 * 60;

pub fn now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64
}

/// A certificate with its private key and the chain above it (root excluded).
pub struct Authority {
    pub cert: X509,
    pub key: PKey<Private>,
    pub chain: Vec<X509>,
    is_root: bool,
}

impl Authority {
    pub fn root(cn: &str) -> Self {
        let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        let cert = build_cert(cn, &key, None, true, now() - DAY, now() + 365 * DAY);
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

    pub fn issue(&self, cn: &str) -> Self {
        self.child(cn, false, now() - DAY, now() + 365 * DAY)
    }

    pub fn issue_with_validity(&self, cn: &str, not_before: i64, not_after: i64) -> Self {
        self.child(cn, false, not_before, not_after)
    }

    fn child(&self, cn: &str, ca: bool, not_before: i64, not_after: i64) -> Self {
        let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        let cert = build_cert(cn, &key, Some(self), ca, not_before, not_after);
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

    pub fn parsed(&self) -> ParsedCert {
        ParsedCert::from_der(&self.der()).unwrap()
    }
}

fn build_cert(
    cn: &str,
    key: &PKey<Private>,
    issuer: Option<&Authority>,
    ca: bool,
    not_before: i64,
    not_after: i64,
) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", cn).unwrap();
    name.append_entry_by_text("O", "Test Registry").unwrap();
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

fn sign(signer: &Authority, data: &[u8], flags: Pkcs7Flags) -> Vec<u8> {
    let mut certs = Stack::new().unwrap();
    for cert in &signer.chain {
        certs.push(cert.clone()).unwrap();
    }
    Pkcs7::sign(&signer.cert, &signer.key, &certs, data, flags)
        .unwrap()
        .to_der()
        .unwrap()
}

/// `adbe.pkcs7.detached` style envelope over `data`.
pub fn detached_pkcs7(signer: &Authority, data: &[u8]) -> Vec<u8> {
    sign(signer, data, Pkcs7Flags::DETACHED | Pkcs7Flags::BINARY)
}

/// Envelope that encapsulates `data` itself.
pub fn attached_pkcs7(signer: &Authority, data: &[u8]) -> Vec<u8> {
    sign(signer, data, Pkcs7Flags::BINARY)
}
