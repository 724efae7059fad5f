//! Storage collaborator contract
//!
//! [`ContentStore`] is the byte-level backend: content-addressed,
//! idempotent writes, integrity faults on collisions. [`ResourceDatabase`]
//! layers framing, XML and type resolution on top of it.

mod frame;
mod memory;

pub use frame::{ObjectKind, BLOB_HEADER, XML_HEADER};
pub use memory::MemoryStore;

use crate::clock::{Clock, SystemClock};
use crate::errors::{FolioError, Result};
use crate::registry::Registry;
use crate::resource::Resource;
use crate::settings::Settings;
use crate::urn::Urn;
use crate::xml::XmlNode;
use crate::element::ValidationMode;
use crate::{log_op_end, log_op_error, log_op_start};
use std::sync::Arc;
use std::time::Instant;

/// Byte-level content-addressed backend
///
/// `put` must be idempotent for identical bytes and must never overwrite
/// differing bytes stored under the same URN: the original is kept and
/// `Integrity` is returned.
pub trait ContentStore: Send + Sync {
    /// # Errors
    ///
    /// Backend I/O failures
    fn contains(&self, urn: &Urn) -> Result<bool>;

    /// # Errors
    ///
    /// `NotFound` if nothing is stored under `urn`
    fn get(&self, urn: &Urn) -> Result<Vec<u8>>;

    /// # Errors
    ///
    /// `Integrity` if different bytes are already stored under `urn`
    fn put(&self, urn: &Urn, content: &[u8]) -> Result<()>;
}

/// Resource-level view of a [`ContentStore`]
#[derive(Clone)]
pub struct ResourceDatabase {
    store: Arc<dyn ContentStore>,
    registry: Arc<Registry>,
    settings: Arc<Settings>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ResourceDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceDatabase")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ResourceDatabase {
    pub fn new(store: Arc<dyn ContentStore>, registry: Arc<Registry>, settings: Arc<Settings>) -> Self {
        Self {
            store,
            registry,
            settings,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// # Errors
    ///
    /// Backend failures
    pub fn contains(&self, urn: &Urn) -> Result<bool> {
        self.store.contains(urn)
    }

    fn put_framed(&self, kind: ObjectKind, payload: &[u8]) -> Result<Urn> {
        let framed = frame::frame(kind, payload);
        let urn = Urn::for_content(&framed);
        self.store.put(&urn, &framed)?;
        tracing::debug!(urn = urn.as_str(), kind = ?kind, bytes = framed.len(), "object stored");
        Ok(urn)
    }

    fn get_framed(&self, urn: &Urn, expected: ObjectKind) -> Result<Vec<u8>> {
        let framed = self.store.get(urn)?;
        let (kind, payload) = frame::unframe(urn, &framed)?;
        if kind != expected {
            return Err(FolioError::TypeMismatch {
                expected: expected.to_string(),
                actual: kind.to_string(),
            });
        }
        Ok(payload.to_vec())
    }

    /// Serialized XML of a stored resource
    ///
    /// # Errors
    ///
    /// `NotFound` if absent, `TypeMismatch` if `urn` names a raw blob
    pub fn get_xml(&self, urn: &Urn) -> Result<Vec<u8>> {
        self.get_framed(urn, ObjectKind::Xml)
    }

    /// # Errors
    ///
    /// As [`ResourceDatabase::get_xml`], plus XML parse errors
    pub fn get_xml_tree(&self, urn: &Urn) -> Result<XmlNode> {
        XmlNode::parse(&self.get_xml(urn)?)
    }

    /// Load, reconstruct and leniently validate a resource
    ///
    /// # Errors
    ///
    /// `NotFound`, `Structure` for unregistered or malformed documents, and
    /// validation errors
    pub fn get_resource_object(&self, urn: &Urn) -> Result<Resource> {
        let start = Instant::now();
        log_op_start!("get_resource_object", urn = urn.as_str());
        match self.get_resource_object_impl(urn) {
            Ok(resource) => {
                log_op_end!(
                    "get_resource_object",
                    duration_ms = start.elapsed().as_millis() as u64,
                    urn = urn.as_str()
                );
                Ok(resource)
            }
            Err(e) => {
                log_op_error!(
                    "get_resource_object",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    urn = urn.as_str()
                );
                Err(e)
            }
        }
    }

    fn get_resource_object_impl(&self, urn: &Urn) -> Result<Resource> {
        let tree = self.get_xml_tree(urn)?;
        let resource = Resource::from_xml_tree(&self.registry, &tree)?;
        resource.validate(self, ValidationMode::Lenient)?;
        Ok(resource.with_urn(urn.clone()))
    }

    /// Canonicalize, hash and persist an XML tree
    ///
    /// # Errors
    ///
    /// Serialization errors, or the store's write errors
    pub fn store_xml_tree(&self, root: &XmlNode) -> Result<Urn> {
        self.put_framed(ObjectKind::Xml, &root.to_bytes()?)
    }

    /// # Errors
    ///
    /// The store's write errors
    pub fn store_blob(&self, content: &[u8]) -> Result<Urn> {
        self.put_framed(ObjectKind::Blob, content)
    }

    /// # Errors
    ///
    /// `NotFound` if absent, `TypeMismatch` if `urn` names an XML resource
    pub fn get_blob(&self, urn: &Urn) -> Result<Vec<u8>> {
        self.get_framed(urn, ObjectKind::Blob)
    }
}
