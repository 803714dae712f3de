// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::enum_variant_names)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # Diploma Oxide
//!
//! Verification of digitally signed Dutch diploma register extracts
//! ("Uittreksel uit het diplomaregister") and extraction of the diploma
//! attributes they carry.
//!
//! ## Pipeline
//!
//! 1. [`signatures::verify`] finds the DocMDP signature of the PDF, checks that
//!    its byte range covers the whole file and verifies the PKCS#7 envelope
//!    against a [`CertificateTrustStore`]. Only the signed bytes survive, as a
//!    [`TrustedDocument`].
//! 2. A [`Renderer`] turns the trusted bytes into a DOM whose
//!    `page-container` element holds one element per page.
//! 3. [`extract::extract`] reads the `label : value` rows of each diploma page
//!    and normalizes them into an [`AttributeMap`] per diploma.
//!
//! Any failure aborts the whole call; partial results are never returned.
//!
//! ## Quick Start
//!
//! ```no_run
//! use diploma_oxide::{verify_and_extract, DiplomaConfig, Pdf2HtmlEx};
//!
//! # fn main() -> diploma_oxide::Result<()> {
//! let config = DiplomaConfig::new().with_cert_dir("certs");
//! let renderer = Pdf2HtmlEx::from_config(&config);
//! let pdf = std::fs::read("diploma.pdf")?;
//!
//! for diploma in verify_and_extract(&pdf, &config, &renderer)? {
//!     for (key, value) in &diploma {
//!         println!("{}: {}", key, value);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## PDF reading
//!
//! Only the object graph leading to the signature dictionary is read:
//! cross-reference tables and streams (with incremental updates), indirect
//! objects and object streams. Content streams, fonts and encryption are out
//! of scope.

// Error handling
pub mod error;

// PDF object layer
pub mod decoders;
pub mod document;
pub mod lexer;
pub mod object;
pub mod objstm;
pub mod parser;
pub mod xref;

// Signature verification
pub mod signatures;

// Rendered pages and attribute extraction
pub mod dom;
pub mod extract;
pub mod render;

// Configuration
pub mod config;

pub use config::DiplomaConfig;
pub use dom::{Document, PageNode};
pub use error::{Error, ErrorKind, Result};
pub use extract::{AttributeKey, AttributeMap, AttributeRequirements, ExtractedAttributeSet};
pub use render::{Pdf2HtmlEx, Renderer};
pub use signatures::{CertificateTrustStore, TrustedDocument};

/// Verify `pdf` against the certificates in `config.cert_dir` and extract its diplomas.
///
/// The trust store is read from disk on every call; use
/// [`verify_and_extract_with`] together with a
/// [`CachedTrustStore`](signatures::CachedTrustStore) to load it once.
pub fn verify_and_extract(
    pdf: &[u8],
    config: &DiplomaConfig,
    renderer: &dyn Renderer,
) -> Result<ExtractedAttributeSet> {
    let trust = CertificateTrustStore::load_dir(&config.cert_dir)?;
    verify_and_extract_with(pdf, &trust, renderer, &config.requirements)
}

/// [`verify_and_extract`] with an already loaded trust store.
pub fn verify_and_extract_with(
    pdf: &[u8],
    trust: &CertificateTrustStore,
    renderer: &dyn Renderer,
    requirements: &AttributeRequirements,
) -> Result<ExtractedAttributeSet> {
    let trusted = signatures::verify(pdf, trust)?;
    log::info!("Signature verified, {} trusted bytes", trusted.len());

    let document = renderer.render(&trusted)?;
    let pages = document.pages()?;
    extract::extract(&pages, requirements)
}
