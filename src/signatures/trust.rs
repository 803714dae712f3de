//! Trusted certificate store.
//!
//! The store is the set of certificates a signature chain may end in. It is
//! loaded from a directory of PEM (`.pem`, `.crt`, `.cer`) and DER (`.der`)
//! files. Files that do not parse are logged and skipped, but an empty store
//! is always an error: it would silently trust nothing.

use super::chain::ParsedCert;
use crate::error::{Error, ErrorKind, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use x509_parser::pem::Pem;

const OP: &str = "load certificates";

/// An immutable, non-empty set of trust anchors.
#[derive(Debug, Clone)]
pub struct CertificateTrustStore {
    certificates: Vec<ParsedCert>,
}

impl CertificateTrustStore {
    /// Load every certificate file in `dir`, in sorted path order.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|e| {
            Error::new(format!("{} from {}", OP, dir.display()), ErrorKind::Io).with_cause(e)
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::from(e).context(OP))?.path();
            if path.is_file() && certificate_format(&path).is_some() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut certificates = Vec::new();
        for path in &paths {
            let data = fs::read(path).map_err(|e| {
                Error::new(format!("{} from {}", OP, path.display()), ErrorKind::Io).with_cause(e)
            })?;
            match certificate_format(path) {
                Some(Format::Pem) => read_pem(path, &data, &mut certificates),
                Some(Format::Der) => match ParsedCert::from_der(&data) {
                    Ok(cert) => certificates.push(cert),
                    Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
                },
                None => {},
            }
        }

        log::debug!(
            "Loaded {} trusted certificate(s) from {} file(s) in {}",
            certificates.len(),
            paths.len(),
            dir.display()
        );
        Self::non_empty(certificates)
    }

    /// Build a store from DER-encoded certificates.
    pub fn from_der_certificates<I, B>(certificates: I) -> Result<Self>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let certificates = certificates
            .into_iter()
            .map(|der| {
                ParsedCert::from_der(der.as_ref())
                    .map_err(|e| Error::new(OP, ErrorKind::Certificate).with_cause(e))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::non_empty(certificates)
    }

    fn non_empty(certificates: Vec<ParsedCert>) -> Result<Self> {
        if certificates.is_empty() {
            return Err(Error::new(OP, ErrorKind::NoCertificates));
        }
        Ok(Self { certificates })
    }

    /// The trust anchors.
    pub fn certificates(&self) -> &[ParsedCert] {
        &self.certificates
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }
}

enum Format {
    Pem,
    Der,
}

fn certificate_format(path: &Path) -> Option<Format> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pem" | "crt" | "cer" => Some(Format::Pem),
        "der" => Some(Format::Der),
        _ => None,
    }
}

fn read_pem(path: &Path, data: &[u8], out: &mut Vec<ParsedCert>) {
    let before = out.len();
    for pem in Pem::iter_from_buffer(data) {
        let pem = match pem {
            Ok(pem) => pem,
            Err(e) => {
                log::warn!("Skipping rest of {}: {}", path.display(), e);
                break;
            },
        };
        if pem.label != "CERTIFICATE" {
            continue;
        }
        match ParsedCert::from_der(&pem.contents) {
            Ok(cert) => out.push(cert),
            Err(e) => log::warn!("Skipping certificate in {}: {}", path.display(), e),
        }
    }
    if out.len() == before {
        log::warn!("No certificate found in {}", path.display());
    }
}

/// A trust store loaded once and shared between verifications.
///
/// Readers get an `Arc` to the current store; [`CachedTrustStore::reload`]
/// swaps in a fresh one. A failed reload leaves the previous store in place.
#[derive(Debug)]
pub struct CachedTrustStore {
    dir: PathBuf,
    current: RwLock<Option<Arc<CertificateTrustStore>>>,
}

impl CachedTrustStore {
    /// Create a cache for `dir`. Nothing is read until the first [`get`](Self::get).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current: RwLock::new(None),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The current store, loading it on first use.
    pub fn get(&self) -> Result<Arc<CertificateTrustStore>> {
        if let Some(store) = self.current.read().unwrap_or_else(|e| e.into_inner()).as_ref() {
            return Ok(Arc::clone(store));
        }

        let mut slot = self.current.write().unwrap_or_else(|e| e.into_inner());
        if let Some(store) = slot.as_ref() {
            return Ok(Arc::clone(store));
        }
        let store = Arc::new(CertificateTrustStore::load_dir(&self.dir)?);
        *slot = Some(Arc::clone(&store));
        Ok(store)
    }

    /// Re-read the directory and replace the cached store.
    pub fn reload(&self) -> Result<Arc<CertificateTrustStore>> {
        let store = match CertificateTrustStore::load_dir(&self.dir) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                log::warn!("Keeping previous trust store: {}", e.chain());
                return Err(e);
            },
        };
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&store));
        log::info!("Reloaded trust store from {}", self.dir.display());
        Ok(store)
    }
}
