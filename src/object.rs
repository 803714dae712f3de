//! PDF object types.
//!
//! Only the value model is here; locating and loading objects is the job of
//! [`crate::document`].

use crate::decoders::{self, DecodeParams};
use crate::error::{PdfError, PdfResult};
use std::collections::HashMap;

/// PDF dictionary.
pub type Dictionary = HashMap<String, Object>;

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// String (byte array)
    String(Vec<u8>),
    /// Name (without the leading /)
    Name(String),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (key-value pairs)
    Dictionary(Dictionary),
    /// Stream (dictionary + raw, still encoded, data)
    Stream {
        /// Stream dictionary
        dict: Dictionary,
        /// Stream data
        data: bytes::Bytes,
    },
    /// Indirect object reference
    Reference(ObjectRef),
}

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

impl Object {
    /// Name of the object's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(_) => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream { .. } => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Dictionary view of this object; streams expose their dictionary.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Decode the data of a stream object through its `/Filter` chain.
    ///
    /// Returns an error if this is not a stream or a filter is not supported.
    pub fn decode_stream_data(&self) -> PdfResult<Vec<u8>> {
        let Object::Stream { dict, data } = self else {
            return Err(PdfError::InvalidObjectType {
                expected: "Stream".to_string(),
                found: self.type_name().to_string(),
            });
        };

        let filters = dict.get("Filter").map(filter_names).unwrap_or_default();
        let params = dict.get("DecodeParms");

        let mut out = data.to_vec();
        for (i, name) in filters.iter().enumerate() {
            let params = params.and_then(|p| match p {
                Object::Array(list) => list.get(i),
                other => Some(other),
            });
            out = decoders::decode(name, &out, params.map(DecodeParams::from_object).as_ref())?;
        }
        Ok(out)
    }
}

/// Filter names from a `/Filter` entry: a single name or an array of names.
fn filter_names(filter: &Object) -> Vec<String> {
    match filter {
        Object::Name(name) => vec![name.clone()],
        Object::Array(arr) => arr
            .iter()
            .filter_map(|obj| obj.as_name().map(str::to_string))
            .collect(),
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_accessors() {
        assert_eq!(Object::Integer(42).as_integer(), Some(42));
        assert_eq!(Object::Name("DocMDP".to_string()).as_name(), Some("DocMDP"));
        assert_eq!(Object::String(b"abc".to_vec()).as_string(), Some(&b"abc"[..]));
        assert_eq!(Object::Boolean(true).as_bool(), Some(true));
        assert!(Object::Null.is_null());
        assert_eq!(Object::Integer(1).as_name(), None);
        assert_eq!(
            Object::Reference(ObjectRef::new(3, 0)).as_reference(),
            Some(ObjectRef::new(3, 0))
        );
    }

    #[test]
    fn test_stream_exposes_dict() {
        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::Name("XRef".to_string()));
        let stream = Object::Stream {
            dict,
            data: bytes::Bytes::new(),
        };
        assert_eq!(stream.as_dict().unwrap()["Type"].as_name(), Some("XRef"));
    }

    #[test]
    fn test_object_ref_display() {
        assert_eq!(ObjectRef::new(12, 0).to_string(), "12 0 R");
    }

    #[test]
    fn test_decode_unfiltered_stream() {
        let stream = Object::Stream {
            dict: Dictionary::new(),
            data: bytes::Bytes::from_static(b"raw"),
        };
        assert_eq!(stream.decode_stream_data().unwrap(), b"raw");
    }

    #[test]
    fn test_decode_flate_stream() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"1 0 obj").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut dict = Dictionary::new();
        dict.insert("Filter".to_string(), Object::Name("FlateDecode".to_string()));
        let stream = Object::Stream {
            dict,
            data: bytes::Bytes::from(compressed),
        };
        assert_eq!(stream.decode_stream_data().unwrap(), b"1 0 obj");
    }

    #[test]
    fn test_decode_rejects_non_stream() {
        let err = Object::Integer(1).decode_stream_data().unwrap_err();
        assert!(matches!(err, PdfError::InvalidObjectType { .. }));
    }
}
