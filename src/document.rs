//! In-memory PDF document reader.
//!
//! Reads just enough of a PDF to walk the object graph from the trailer:
//! header, cross-reference data (with incremental updates), indirect objects
//! and objects stored in object streams. Content streams, fonts, page trees
//! and encryption are never touched.

use crate::error::{PdfError, PdfResult};
use crate::object::{Dictionary, Object, ObjectRef};
use crate::objstm::ObjectStream;
use crate::parser::parse_indirect_object;
use crate::xref::{self, CrossRefTable, XRefEntry};
use std::collections::{HashMap, HashSet};

/// Longest reference chain followed by [`PdfDocument::resolve`].
const MAX_RESOLVE_DEPTH: u32 = 32;

/// How far into the file the `%PDF-` header may start.
const HEADER_WINDOW: usize = 1024;

/// A PDF document backed by a borrowed byte buffer.
pub struct PdfDocument<'a> {
    data: &'a [u8],
    version: (u8, u8),
    xref: CrossRefTable,
    object_cache: HashMap<ObjectRef, Object>,
    objstm_cache: HashMap<u32, ObjectStream>,
}

impl std::fmt::Debug for PdfDocument<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("len", &self.data.len())
            .field("version", &self.version)
            .field("objects", &self.xref.len())
            .finish()
    }
}

impl<'a> PdfDocument<'a> {
    /// Parse the header and cross-reference data of `data`.
    pub fn from_bytes(data: &'a [u8]) -> PdfResult<Self> {
        let version = parse_header(data)?;
        let startxref = xref::find_startxref(data)?;
        let xref = xref::parse_xref(data, startxref)?;
        log::debug!(
            "Opened PDF {}.{}: {} bytes, {} xref entries",
            version.0,
            version.1,
            data.len(),
            xref.len()
        );

        Ok(Self {
            data,
            version,
            xref,
            object_cache: HashMap::new(),
            objstm_cache: HashMap::new(),
        })
    }

    /// PDF version from the header, as (major, minor).
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    /// The newest trailer dictionary.
    pub fn trailer(&self) -> &Dictionary {
        self.xref.trailer()
    }

    /// Load an indirect object.
    ///
    /// A reference to an object that is free or absent from the xref
    /// resolves to [`Object::Null`].
    pub fn load_object(&mut self, obj_ref: ObjectRef) -> PdfResult<Object> {
        if let Some(obj) = self.object_cache.get(&obj_ref) {
            return Ok(obj.clone());
        }

        let obj = match self.xref.get(obj_ref.id).copied() {
            Some(XRefEntry::InUse { offset, gen }) => {
                if gen != obj_ref.gen {
                    log::debug!("{} has generation {} in xref, treating as null", obj_ref, gen);
                    Object::Null
                } else {
                    self.load_uncompressed(obj_ref, offset)?
                }
            },
            Some(XRefEntry::Compressed { stream, index }) => {
                self.load_compressed(obj_ref, stream, index)?
            },
            Some(XRefEntry::Free) | None => {
                log::debug!("{} is not in use, treating as null", obj_ref);
                Object::Null
            },
        };

        self.object_cache.insert(obj_ref, obj.clone());
        Ok(obj)
    }

    fn load_uncompressed(&mut self, obj_ref: ObjectRef, offset: usize) -> PdfResult<Object> {
        let (found, obj) = parse_indirect_object(self.data, offset)?;
        if found != obj_ref {
            return Err(PdfError::ParseError {
                offset,
                reason: format!("expected object {}, found {}", obj_ref, found),
            });
        }
        Ok(obj)
    }

    fn load_compressed(&mut self, obj_ref: ObjectRef, stream: u32, index: usize) -> PdfResult<Object> {
        if !self.objstm_cache.contains_key(&stream) {
            let offset = match self.xref.get(stream) {
                Some(XRefEntry::InUse { offset, .. }) => *offset,
                _ => return Err(PdfError::ObjectNotFound(stream, 0)),
            };
            let (_, stream_obj) = parse_indirect_object(self.data, offset)?;
            self.objstm_cache.insert(stream, ObjectStream::new(&stream_obj)?);
        }
        match self.objstm_cache.get(&stream) {
            Some(objstm) => objstm.object_at(index, obj_ref.id),
            None => Err(PdfError::ObjectNotFound(stream, 0)),
        }
    }

    /// Follow references until a direct object is reached.
    pub fn resolve(&mut self, obj: &Object) -> PdfResult<Object> {
        let mut current = obj.clone();
        let mut seen = HashSet::new();
        while let Object::Reference(r) = current {
            if !seen.insert(r) {
                return Err(PdfError::CircularReference(r));
            }
            if seen.len() as u32 > MAX_RESOLVE_DEPTH {
                return Err(PdfError::RecursionLimitExceeded(MAX_RESOLVE_DEPTH));
            }
            current = self.load_object(r)?;
        }
        Ok(current)
    }

    /// Walk dictionary keys starting at the trailer, resolving each step.
    ///
    /// Returns `None` as soon as a key is missing or a step is not a dictionary.
    ///
    /// ```no_run
    /// # fn demo(bytes: &[u8]) -> Result<(), diploma_oxide::error::PdfError> {
    /// use diploma_oxide::document::PdfDocument;
    ///
    /// let mut doc = PdfDocument::from_bytes(bytes)?;
    /// let docmdp = doc.lookup(&["Root", "Perms", "DocMDP"])?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn lookup(&mut self, path: &[&str]) -> PdfResult<Option<Object>> {
        let mut current = Object::Dictionary(self.trailer().clone());
        for key in path {
            let next = match current.as_dict().and_then(|d| d.get(*key)) {
                Some(value) => value.clone(),
                None => return Ok(None),
            };
            current = self.resolve(&next)?;
            if current.is_null() {
                return Ok(None);
            }
        }
        Ok(Some(current))
    }
}

/// Parse `%PDF-M.m` near the start of the file.
pub fn parse_header(data: &[u8]) -> PdfResult<(u8, u8)> {
    let window = &data[..data.len().min(HEADER_WINDOW)];
    let start = window
        .windows(5)
        .position(|w| w == b"%PDF-")
        .ok_or_else(|| {
            let found = String::from_utf8_lossy(&data[..data.len().min(5)]).into_owned();
            PdfError::InvalidHeader(found)
        })?;

    match data.get(start + 5..start + 8) {
        Some([major, b'.', minor]) if major.is_ascii_digit() && minor.is_ascii_digit() => {
            Ok((major - b'0', minor - b'0'))
        },
        _ => Err(PdfError::InvalidHeader(
            String::from_utf8_lossy(&data[start..data.len().min(start + 8)]).into_owned(),
        )),
    }
}
