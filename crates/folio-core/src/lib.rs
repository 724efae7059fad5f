//! Folio Core - schema-driven element model for content-addressed resources
//!
//! This crate provides:
//! - Declarative schemas (attributes, subelements, arrays, links, blobs)
//!   and the built-in provenance block every licensed resource carries
//! - Element instances with validation, canonical XML and JSON projection
//! - Root resources: content-hashed, immutable once saved, forkable
//! - The JSON blueprint protocol (`href`, `@create`, `@patch`)
//! - The storage collaborator contract and an in-memory store
//!
//! ```
//! use folio_core::{SchemaBuilder, Attribute, Registry};
//!
//! let tag = SchemaBuilder::new("TagElement")
//!     .namespace("urn:example:tags")
//!     .attribute("value", Attribute::required())
//!     .licensed()
//!     .build()
//!     .unwrap();
//! let registry = Registry::builder().register(&tag).unwrap().build();
//! assert!(registry.get("{urn:example:tags}tag_element").is_some());
//! ```

pub mod blueprint;
pub mod builtin;
pub mod clock;
pub mod element;
pub mod errors;
pub mod license;
pub mod logging_facility;
pub mod registry;
pub mod resource;
pub mod save_context;
pub mod schema;
pub mod settings;
pub mod storage;
pub mod urn;
pub mod xml;

// The logging macros refer to `$crate::folio_core_types`
pub use folio_core_types;

pub use blueprint::save_blueprint;
pub use clock::{Clock, FixedClock, SystemClock};
pub use element::{Element, ValidationMode};
pub use errors::{ExError, ExErrorKind, FolioError, Result};
pub use registry::{Registry, RegistryBuilder};
pub use resource::Resource;
pub use save_context::SaveContext;
pub use schema::{Attribute, Schema, SchemaBuilder};
pub use settings::Settings;
pub use storage::{ContentStore, MemoryStore, ResourceDatabase};
pub use urn::Urn;
