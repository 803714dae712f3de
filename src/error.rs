//! Error types for diploma verification and extraction.
//!
//! Two layers live here:
//!
//! - [`PdfError`] describes what went wrong while reading the PDF object graph
//!   (offsets, object numbers, stream decoding). It never leaves the crate on its
//!   own; it is attached as the cause of an [`Error`].
//! - [`Error`] is what every public operation returns. It carries the name of the
//!   operation that failed, an [`ErrorKind`] that callers match on, and an optional
//!   underlying cause reachable through [`std::error::Error::source`].

use std::borrow::Cow;
use std::error::Error as StdError;

/// Result type alias for public operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for the PDF object layer.
pub type PdfResult<T> = std::result::Result<T, PdfError>;

/// Boxed cause attached to an [`Error`].
pub type Cause = Box<dyn StdError + Send + Sync + 'static>;

/// Classification of a failure.
///
/// This is the contract with the surrounding service: it maps kinds to
/// user-facing messages, so each failure path picks the most precise kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum ErrorKind {
    /// `trailer.Root.Perms.DocMDP` is absent.
    #[error("could not find signature")]
    SignatureNotFound,

    /// The signature dictionary lacks `/Contents` or `/SubFilter`, or they have the wrong type.
    #[error("malformed signature dictionary")]
    MalformedSignature,

    /// `/ByteRange` does not describe the whole file around the signature container.
    #[error("invalid byte range")]
    InvalidByteRange,

    /// `/SubFilter` names a signature format that is not accepted.
    #[error("unsupported sub-filter: {0}")]
    UnsupportedSubFilter(String),

    /// Chain verification, digest comparison or signature check failed.
    #[error("signature invalid")]
    SignatureInvalid,

    /// The rendered document has no `page-container` element.
    #[error("page container not found")]
    PageContainerNotFound,

    /// A diploma page lacks a mandatory attribute.
    #[error("cannot find attribute: {0}")]
    MissingAttribute(String),

    /// The trust directory yielded no certificates.
    #[error("no certificates found")]
    NoCertificates,

    /// A trust-store certificate could not be decoded.
    #[error("invalid certificate")]
    Certificate,

    /// The PDF object graph could not be read.
    #[error("unreadable PDF")]
    Pdf,

    /// The rendering collaborator failed.
    #[error("rendering failed")]
    Render,

    /// The rendered document could not be parsed.
    #[error("unreadable HTML")]
    Html,

    /// Local file access failed.
    #[error("I/O error")]
    Io,
}

/// Error returned by every public operation.
///
/// Display renders `"<op>: <kind>"`; the cause (if any) is available through
/// `source()` so that callers can print the full chain.
#[derive(Debug, thiserror::Error)]
#[error("{op}: {kind}")]
pub struct Error {
    op: Cow<'static, str>,
    kind: ErrorKind,
    #[source]
    cause: Option<Cause>,
}

impl Error {
    /// Create an error for operation `op`.
    pub fn new(op: impl Into<Cow<'static, str>>, kind: ErrorKind) -> Self {
        Self {
            op: op.into(),
            kind,
            cause: None,
        }
    }

    /// Attach an underlying cause.
    pub fn with_cause(mut self, cause: impl Into<Cause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Name of the operation that failed.
    pub fn op(&self) -> &str {
        &self.op
    }

    /// Failure classification.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Re-label this error as a failure of an enclosing operation.
    ///
    /// The kind is preserved; the original error becomes the cause.
    pub fn context(self, op: impl Into<Cow<'static, str>>) -> Self {
        let kind = self.kind.clone();
        Error::new(op, kind).with_cause(self)
    }

    /// Render the error and all its causes on one line, `": "` separated.
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut source = StdError::source(self);
        while let Some(err) = source {
            out.push_str(": ");
            out.push_str(&err.to_string());
            source = err.source();
        }
        out
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new("io", ErrorKind::Io).with_cause(err)
    }
}

/// Errors from the PDF object layer.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum PdfError {
    /// Invalid PDF header (expected '%PDF-')
    #[error("Invalid PDF header: expected '%PDF-', found '{0}'")]
    InvalidHeader(String),

    /// Parse error at specific byte offset
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Reason for parse failure
        reason: String,
    },

    /// Invalid cross-reference data
    #[error("Invalid cross-reference table: {0}")]
    InvalidXref(String),

    /// Referenced object not found in cross-reference table
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Unsupported stream filter
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// Reference chain loops back on itself
    #[error("Circular reference detected: {0}")]
    CircularReference(crate::object::ObjectRef),

    /// Nesting limit exceeded while resolving
    #[error("Recursion limit exceeded: {0}")]
    RecursionLimitExceeded(u32),
}
