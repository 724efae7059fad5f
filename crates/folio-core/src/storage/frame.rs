//! Type header prepended to every stored object
//!
//! XML resources and raw blobs share one URN space; the header tells them
//! apart and is covered by the hash.

use crate::errors::{FolioError, Result};
use crate::urn::Urn;
use std::fmt;

pub const XML_HEADER: &[u8] = b"xml\0";
pub const BLOB_HEADER: &[u8] = b"blob\0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Xml,
    Blob,
}

impl ObjectKind {
    fn header(self) -> &'static [u8] {
        match self {
            ObjectKind::Xml => XML_HEADER,
            ObjectKind::Blob => BLOB_HEADER,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Xml => f.write_str("xml"),
            ObjectKind::Blob => f.write_str("blob"),
        }
    }
}

pub(crate) fn frame(kind: ObjectKind, payload: &[u8]) -> Vec<u8> {
    let header = kind.header();
    let mut framed = Vec::with_capacity(header.len() + payload.len());
    framed.extend_from_slice(header);
    framed.extend_from_slice(payload);
    framed
}

pub(crate) fn unframe<'a>(urn: &Urn, framed: &'a [u8]) -> Result<(ObjectKind, &'a [u8])> {
    for kind in [ObjectKind::Xml, ObjectKind::Blob] {
        if let Some(payload) = framed.strip_prefix(kind.header()) {
            return Ok((kind, payload));
        }
    }
    Err(FolioError::Integrity {
        urn: urn.to_string(),
        message: "stored object has no recognized type header".to_string(),
    })
}
