//! PDF digital signature verification.
//!
//! A diploma extract carries one document-level (DocMDP) signature. Two
//! packagings are accepted:
//!
//! - `adbe.pkcs7.detached`: a CMS SignedData over the signed byte ranges
//! - `adbe.pkcs7.sha1`: a CMS SignedData whose content is the SHA-1 digest of
//!   the signed byte ranges
//!
//! Signer certificates must chain to a [`CertificateTrustStore`]. On success the
//! verifier returns a [`TrustedDocument`] holding only the signed bytes.
//!
//! ## Example
//!
//! ```no_run
//! use diploma_oxide::signatures::{verify, CertificateTrustStore};
//!
//! # fn main() -> diploma_oxide::Result<()> {
//! let trust = CertificateTrustStore::load_dir("certs")?;
//! let raw = std::fs::read("diploma.pdf")?;
//! let trusted = verify(&raw, &trust)?;
//! println!("{} signed bytes", trusted.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## References
//!
//! - ISO 32000-1:2008 Section 12.8 - Digital Signatures
//! - RFC 5652 - Cryptographic Message Syntax

mod byterange;
mod chain;
mod envelope;
mod trust;
mod types;
mod verifier;

#[cfg(test)]
pub(crate) mod test_support;

pub use chain::{ChainError, ParsedCert};
pub use envelope::{DigestKind, EnvelopeError, SignedEnvelope};
pub use trust::{CachedTrustStore, CertificateTrustStore};
pub use types::{ByteRange, SignatureDescriptor, SubFilterKind, TrustedDocument};
pub use verifier::{locate_signature, verify};
