//! X.509 certificate path building.
//!
//! A signer certificate is trusted when a path of issuer signatures leads from
//! it to a certificate that is byte-identical to a trust-store entry. The
//! certificates embedded in the signature envelope serve as intermediates.
//! Extended key usage is not checked.

use rsa::pkcs1v15;
use rsa::pkcs8::DecodePublicKey as _;
use rsa::RsaPublicKey;
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use signature::Verifier as _;
use x509_parser::extensions::ParsedExtension;

/// Longest path followed from the signer to an anchor.
const MAX_DEPTH: usize = 16;

/// Chain building failures.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("invalid certificate DER: {0}")]
    Parse(String),

    #[error("certificate '{subject}' is not valid at {at}")]
    Expired { subject: String, at: i64 },

    #[error("no trusted issuer found for '{0}'")]
    Untrusted(String),

    #[error("chain longer than {0} certificates")]
    TooLong(usize),

    #[error("unsupported signature algorithm {0}")]
    UnsupportedAlgorithm(String),

    #[error("bad RSA public key: {0}")]
    PublicKey(String),

    #[error("signature verification failed")]
    BadSignature,
}

/// Owned view of the certificate fields used for path building.
#[derive(Debug, Clone)]
pub struct ParsedCert {
    pub der: Vec<u8>,
    pub subject: String,
    pub subject_raw: Vec<u8>,
    pub issuer_raw: Vec<u8>,
    pub serial: Vec<u8>,
    pub subject_key_id: Option<Vec<u8>>,
    pub spki_der: Vec<u8>,
    tbs_der: Vec<u8>,
    signature_oid: String,
    signature: Vec<u8>,
    is_ca: bool,
    not_before: i64,
    not_after: i64,
}

impl ParsedCert {
    pub fn from_der(der: &[u8]) -> Result<Self, ChainError> {
        let (_, cert) = x509_parser::parse_x509_certificate(der)
            .map_err(|e| ChainError::Parse(e.to_string()))?;
        let tbs = &cert.tbs_certificate;

        let subject_key_id = tbs.extensions().iter().find_map(|ext| match ext.parsed_extension() {
            ParsedExtension::SubjectKeyIdentifier(id) => Some(id.0.to_vec()),
            _ => None,
        });
        let is_ca = tbs
            .basic_constraints()
            .ok()
            .flatten()
            .map(|bc| bc.value.ca)
            .unwrap_or(false);

        Ok(Self {
            der: der.to_vec(),
            subject: tbs.subject.to_string(),
            subject_raw: tbs.subject.as_raw().to_vec(),
            issuer_raw: tbs.issuer.as_raw().to_vec(),
            serial: tbs.raw_serial().to_vec(),
            subject_key_id,
            spki_der: tbs.subject_pki.raw.to_vec(),
            tbs_der: tbs.as_ref().to_vec(),
            signature_oid: cert.signature_algorithm.algorithm.to_string(),
            signature: cert.signature_value.data.to_vec(),
            is_ca,
            not_before: cert.validity().not_before.timestamp(),
            not_after: cert.validity().not_after.timestamp(),
        })
    }

    /// Whether the validity window contains `at` (seconds since the epoch).
    pub fn is_valid_at(&self, at: i64) -> bool {
        self.not_before <= at && at <= self.not_after
    }

    fn check_valid_at(&self, at: i64) -> Result<(), ChainError> {
        if self.is_valid_at(at) {
            Ok(())
        } else {
            Err(ChainError::Expired {
                subject: self.subject.clone(),
                at,
            })
        }
    }

    /// Whether `issuer` signed this certificate.
    fn is_signed_by(&self, issuer: &ParsedCert) -> bool {
        self.issuer_raw == issuer.subject_raw
            && verify_rsa_signature(
                &issuer.spki_der,
                &self.signature_oid,
                &self.tbs_der,
                &self.signature,
            )
            .is_ok()
    }
}

/// Verify an RSA PKCS#1 v1.5 signature identified by a `*WithRSAEncryption` OID.
pub fn verify_rsa_signature(
    spki_der: &[u8],
    signature_oid: &str,
    message: &[u8],
    signature: &[u8],
) -> Result<(), ChainError> {
    let key = RsaPublicKey::from_public_key_der(spki_der)
        .map_err(|e| ChainError::PublicKey(e.to_string()))?;
    let sig = pkcs1v15::Signature::try_from(signature).map_err(|_| ChainError::BadSignature)?;
    let result = match signature_oid {
        "1.2.840.113549.1.1.5" => pkcs1v15::VerifyingKey::<Sha1>::new(key).verify(message, &sig),
        "1.2.840.113549.1.1.11" => pkcs1v15::VerifyingKey::<Sha256>::new(key).verify(message, &sig),
        "1.2.840.113549.1.1.12" => pkcs1v15::VerifyingKey::<Sha384>::new(key).verify(message, &sig),
        "1.2.840.113549.1.1.13" => pkcs1v15::VerifyingKey::<Sha512>::new(key).verify(message, &sig),
        other => return Err(ChainError::UnsupportedAlgorithm(other.to_string())),
    };
    result.map_err(|_| ChainError::BadSignature)
}

/// Build a path from `leaf` to one of `anchors`, checking validity at `at`.
///
/// Returns the path, leaf first and anchor last.
pub fn verify_chain<'a>(
    leaf: &'a ParsedCert,
    intermediates: &'a [ParsedCert],
    anchors: &'a [ParsedCert],
    at: i64,
) -> Result<Vec<&'a ParsedCert>, ChainError> {
    let is_anchor = |cert: &ParsedCert| anchors.iter().any(|a| a.der == cert.der);

    let mut path = vec![leaf];
    let mut current = leaf;
    loop {
        current.check_valid_at(at)?;
        if is_anchor(current) {
            log::debug!("Chain anchored at '{}' after {} certificate(s)", current.subject, path.len());
            return Ok(path);
        }
        if path.len() >= MAX_DEPTH {
            return Err(ChainError::TooLong(MAX_DEPTH));
        }

        // Anchors first; an embedded copy of a root is then never needed.
        let issuer = anchors
            .iter()
            .find(|a| current.is_signed_by(a))
            .or_else(|| {
                intermediates.iter().find(|c| {
                    c.is_ca
                        && !path.iter().any(|seen| seen.der == c.der)
                        && current.is_signed_by(c)
                })
            })
            .ok_or_else(|| ChainError::Untrusted(current.subject.clone()))?;

        path.push(issuer);
        current = issuer;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatures::test_support::{now, Authority, DAY};

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(ParsedCert::from_der(b"\x30\x00"), Err(ChainError::Parse(_))));
    }

    #[test]
    fn test_chain_through_intermediate() {
        let root = Authority::root("Root");
        let sub = root.intermediate("Issuing CA");
        let leaf = sub.issue("Registry");

        let leaf_cert = leaf.parsed();
        let intermediates = vec![sub.parsed()];
        let anchors = vec![root.parsed()];
        let path = verify_chain(&leaf_cert, &intermediates, &anchors, now()).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path[2].der, root.der());

        // Without the intermediate there is no path.
        assert!(matches!(
            verify_chain(&leaf_cert, &[], &anchors, now()),
            Err(ChainError::Untrusted(_))
        ));
    }

    #[test]
    fn test_pinned_intermediate_and_leaf() {
        let root = Authority::root("Root");
        let sub = root.intermediate("Issuing CA");
        let leaf = sub.issue("Registry");
        let leaf_cert = leaf.parsed();
        let pinned_sub = [sub.parsed()];
        let pinned_leaf = [leaf.parsed()];

        let path = verify_chain(&leaf_cert, &[], &pinned_sub, now()).unwrap();
        assert_eq!(path.len(), 2);

        let path = verify_chain(&leaf_cert, &[], &pinned_leaf, now()).unwrap();
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn test_validity_window() {
        let root = Authority::root("Root");
        let leaf = root.issue_with_validity("Registry", now() - 30 * DAY, now() - 10 * DAY);
        let leaf_cert = leaf.parsed();
        let anchors = vec![root.parsed()];

        assert!(matches!(
            verify_chain(&leaf_cert, &[], &anchors, now()),
            Err(ChainError::Expired { .. })
        ));
        assert!(leaf_cert.is_valid_at(now() - 20 * DAY));
        assert!(!leaf_cert.is_valid_at(now() - 40 * DAY));
    }

    #[test]
    fn test_non_ca_cannot_issue() {
        let root = Authority::root("Root");
        let fake_ca = root.issue("Not A CA");
        let leaf = fake_ca.issue("Registry");
        let leaf_cert = leaf.parsed();
        let intermediates = [fake_ca.parsed()];
        let anchors = [root.parsed()];
        let result = verify_chain(&leaf_cert, &intermediates, &anchors, now());
        assert!(matches!(result, Err(ChainError::Untrusted(_))));
    }
}
