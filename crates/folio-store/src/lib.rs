//! Folio Store - persistent backends for the resource layer
//!
//! Provides:
//! - [`cas::FsStore`], a sharded content-addressed object store on disk
//! - [`VerifyingStore`], which re-hashes objects from untrusted backends
//! - [`open_database`], a resource database over an on-disk store

pub mod cas;
pub mod errors;
pub mod untrusted;

pub use cas::FsStore;
pub use errors::Result;
pub use untrusted::VerifyingStore;

use folio_core::{Registry, ResourceDatabase, Settings};
use std::path::Path;
use std::sync::Arc;

/// Resource database backed by an [`FsStore`] rooted at `path`
///
/// # Errors
///
/// `Io` if the store directory cannot be created
pub fn open_database(
    path: impl AsRef<Path>,
    registry: Arc<Registry>,
    settings: Arc<Settings>,
) -> Result<ResourceDatabase> {
    let store = FsStore::open(path.as_ref())?;
    tracing::info!(root = %store.root().display(), "opened object store");
    Ok(ResourceDatabase::new(Arc::new(store), registry, settings))
}
