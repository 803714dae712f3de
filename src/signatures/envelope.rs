//! PKCS#7 / CMS SignedData verification.
//!
//! `/Contents` holds a DER `ContentInfo` wrapping a `SignedData`, usually
//! followed by zero padding up to the size of the placeholder. Every
//! `SignerInfo` must verify:
//!
//! 1. its certificate is found among the embedded certificates,
//! 2. with signed attributes, `messageDigest` equals the content digest and the
//!    RSA signature covers the DER `SET OF` attributes; without them the
//!    signature covers the content itself,
//! 3. the certificate chains to the trust store at the signing time.

use super::chain::{self, ChainError, ParsedCert};
use cms::cert::CertificateChoices;
use cms::content_info::ContentInfo;
use cms::signed_data::{SignedData, SignerIdentifier, SignerInfo};
use der::asn1::{GeneralizedTime, ObjectIdentifier, OctetString, UtcTime};
use der::{Decode, Encode, SliceReader};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::time::{SystemTime, UNIX_EPOCH};

const ID_SIGNED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");
const ID_MESSAGE_DIGEST: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");
const ID_SIGNING_TIME: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5");
const RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";

/// Envelope verification failures. All of them mean the signature is invalid.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("malformed CMS envelope: {0}")]
    Der(#[from] der::Error),

    #[error("content type {0} is not signed-data")]
    NotSignedData(String),

    #[error("envelope has no signer")]
    NoSigners,

    #[error("signer certificate not included in envelope")]
    SignerNotFound,

    #[error("unsupported digest algorithm {0}")]
    UnsupportedDigest(String),

    #[error("signed attributes lack a message digest")]
    MissingMessageDigest,

    #[error("message digest does not match signed content")]
    DigestMismatch,

    #[error("envelope carries no encapsulated content")]
    MissingContent,

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Digest algorithms accepted in a `SignerInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestKind {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestKind {
    /// Map a digest OID. Some signers put the combined `*WithRSAEncryption`
    /// OID in `digestAlgorithm`; those are accepted too.
    pub fn from_oid(oid: &str) -> Option<Self> {
        match oid {
            "1.3.14.3.2.26" | "1.2.840.113549.1.1.5" => Some(DigestKind::Sha1),
            "2.16.840.1.101.3.4.2.1" | "1.2.840.113549.1.1.11" => Some(DigestKind::Sha256),
            "2.16.840.1.101.3.4.2.2" | "1.2.840.113549.1.1.12" => Some(DigestKind::Sha384),
            "2.16.840.1.101.3.4.2.3" | "1.2.840.113549.1.1.13" => Some(DigestKind::Sha512),
            _ => None,
        }
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestKind::Sha1 => Sha1::digest(data).to_vec(),
            DigestKind::Sha256 => Sha256::digest(data).to_vec(),
            DigestKind::Sha384 => Sha384::digest(data).to_vec(),
            DigestKind::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    fn rsa_signature_oid(self) -> &'static str {
        match self {
            DigestKind::Sha1 => "1.2.840.113549.1.1.5",
            DigestKind::Sha256 => "1.2.840.113549.1.1.11",
            DigestKind::Sha384 => "1.2.840.113549.1.1.12",
            DigestKind::Sha512 => "1.2.840.113549.1.1.13",
        }
    }
}

/// A decoded SignedData envelope.
#[derive(Debug)]
pub struct SignedEnvelope {
    signed_data: SignedData,
    certificates: Vec<ParsedCert>,
}

impl SignedEnvelope {
    /// Decode `contents`. Bytes after the DER `ContentInfo` are ignored.
    pub fn parse(contents: &[u8]) -> Result<Self, EnvelopeError> {
        let mut reader = SliceReader::new(contents)?;
        let content_info = ContentInfo::decode(&mut reader)?;
        if content_info.content_type != ID_SIGNED_DATA {
            return Err(EnvelopeError::NotSignedData(content_info.content_type.to_string()));
        }
        let signed_data: SignedData = content_info.content.decode_as()?;

        let mut certificates = Vec::new();
        if let Some(set) = &signed_data.certificates {
            for choice in set.0.iter() {
                let CertificateChoices::Certificate(cert) = choice else {
                    continue;
                };
                match ParsedCert::from_der(&cert.to_der()?) {
                    Ok(parsed) => certificates.push(parsed),
                    Err(e) => log::debug!("Skipping embedded certificate: {}", e),
                }
            }
        }

        Ok(Self {
            signed_data,
            certificates,
        })
    }

    /// Certificates embedded in the envelope, in envelope order.
    pub fn certificates(&self) -> &[ParsedCert] {
        &self.certificates
    }

    /// The encapsulated content, if the envelope is not detached.
    pub fn encapsulated_content(&self) -> Option<Vec<u8>> {
        let any = self.signed_data.encap_content_info.econtent.as_ref()?;
        match any.decode_as::<OctetString>() {
            Ok(octets) => Some(octets.as_bytes().to_vec()),
            Err(_) => Some(any.value().to_vec()),
        }
    }

    /// Verify every signer over externally supplied `content`.
    pub fn verify_detached(&self, content: &[u8], anchors: &[ParsedCert]) -> Result<(), EnvelopeError> {
        let signers = &self.signed_data.signer_infos.0;
        if signers.is_empty() {
            return Err(EnvelopeError::NoSigners);
        }
        for signer in signers.iter() {
            self.verify_signer(signer, content, anchors)?;
        }
        Ok(())
    }

    /// Verify every signer over the encapsulated content and return that content.
    pub fn verify_attached(&self, anchors: &[ParsedCert]) -> Result<Vec<u8>, EnvelopeError> {
        let content = self
            .encapsulated_content()
            .ok_or(EnvelopeError::MissingContent)?;
        self.verify_detached(&content, anchors)?;
        Ok(content)
    }

    fn verify_signer(
        &self,
        signer: &SignerInfo,
        content: &[u8],
        anchors: &[ParsedCert],
    ) -> Result<(), EnvelopeError> {
        let cert = self.find_signer(&signer.sid)?;
        let digest_oid = signer.digest_alg.oid.to_string();
        let digest = DigestKind::from_oid(&digest_oid)
            .ok_or(EnvelopeError::UnsupportedDigest(digest_oid))?;

        let mut signing_time = None;
        let message = match &signer.signed_attrs {
            Some(attrs) => {
                let mut message_digest = None;
                for attr in attrs.iter() {
                    let Some(value) = attr.values.iter().next() else {
                        continue;
                    };
                    if attr.oid == ID_MESSAGE_DIGEST {
                        message_digest = Some(value.value());
                    } else if attr.oid == ID_SIGNING_TIME {
                        signing_time = value
                            .decode_as::<UtcTime>()
                            .map(|t| t.to_unix_duration())
                            .or_else(|_| value.decode_as::<GeneralizedTime>().map(|t| t.to_unix_duration()))
                            .ok()
                            .map(|d| d.as_secs() as i64);
                    }
                }
                let message_digest = message_digest.ok_or(EnvelopeError::MissingMessageDigest)?;
                if message_digest != digest.digest(content).as_slice() {
                    return Err(EnvelopeError::DigestMismatch);
                }
                attrs.to_der()?
            },
            None => content.to_vec(),
        };

        let algorithm = signer.signature_algorithm.oid.to_string();
        let signature_oid = if algorithm == RSA_ENCRYPTION {
            digest.rsa_signature_oid()
        } else {
            algorithm.as_str()
        };
        chain::verify_rsa_signature(&cert.spki_der, signature_oid, &message, signer.signature.as_bytes())?;

        let at = signing_time.unwrap_or_else(now);
        chain::verify_chain(cert, &self.certificates, anchors, at)?;
        log::debug!("Signer '{}' verified ({:?})", cert.subject, digest);
        Ok(())
    }

    fn find_signer(&self, sid: &SignerIdentifier) -> Result<&ParsedCert, EnvelopeError> {
        let found = match sid {
            SignerIdentifier::IssuerAndSerialNumber(isn) => {
                let issuer = isn.issuer.to_der()?;
                let serial = isn.serial_number.as_bytes();
                self.certificates
                    .iter()
                    .find(|c| c.issuer_raw == issuer && c.serial == serial)
            },
            SignerIdentifier::SubjectKeyIdentifier(ski) => {
                let id = ski.0.as_bytes();
                self.certificates
                    .iter()
                    .find(|c| c.subject_key_id.as_deref() == Some(id))
            },
        };
        found.ok_or(EnvelopeError::SignerNotFound)
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
