//! Filesystem-based content-addressed store
//!
//! Objects are published without ever replacing an existing file. When
//! different bytes already sit under a URN they are kept and the newcomer
//! is set aside for inspection.

use crate::cas::atomic::{atomic_write, write_new, TEMP_SUFFIX};
use crate::cas::sharding::shard_path;
use crate::errors::{collision, io_error, FolioError, Result};
use folio_core::{ContentStore, Urn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Appended to an object's path to hold a colliding payload
pub const COLLISION_SUFFIX: &str = "-collision";

/// Filesystem-based object store
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open a store rooted at `root`, creating the directory if needed
    ///
    /// # Errors
    ///
    /// `Io` if the root directory cannot be created
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| io_error("create_store_root", e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the object named by `urn` lives
    pub fn path_for(&self, urn: &Urn) -> PathBuf {
        shard_path(&self.root, urn.algorithm(), urn.digest())
    }

    /// Every URN with a stored object, sorted
    ///
    /// Temp files, collision payloads, names that are not digests and files
    /// outside their shard directory are skipped.
    ///
    /// # Errors
    ///
    /// `Io` if a directory cannot be listed
    pub fn urns(&self) -> Result<Vec<Urn>> {
        let mut urns = Vec::new();
        for algorithm in list_dir(&self.root)? {
            if !algorithm.is_dir() {
                continue;
            }
            let Some(alg) = file_name(&algorithm) else {
                continue;
            };
            let mut stack = vec![algorithm.clone()];
            while let Some(dir) = stack.pop() {
                for entry in list_dir(&dir)? {
                    if entry.is_dir() {
                        stack.push(entry);
                        continue;
                    }
                    let Some(name) = file_name(&entry) else {
                        continue;
                    };
                    if name.ends_with(TEMP_SUFFIX) || name.ends_with(COLLISION_SUFFIX) {
                        continue;
                    }
                    let Ok(urn) = Urn::parse(&format!("urn:{}:{}", alg, name)) else {
                        continue;
                    };
                    // a misplaced file is not an object of this store
                    if self.path_for(&urn) == entry {
                        urns.push(urn);
                    }
                }
            }
        }
        urns.sort();
        Ok(urns)
    }
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| io_error("list_store_dir", e))?;
    entries
        .map(|entry| {
            entry
                .map(|e| e.path())
                .map_err(|e| io_error("list_store_dir", e))
        })
        .collect()
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().and_then(|n| n.to_str()).map(str::to_string)
}

fn collision_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(COLLISION_SUFFIX);
    PathBuf::from(name)
}

impl ContentStore for FsStore {
    fn contains(&self, urn: &Urn) -> Result<bool> {
        Ok(self.path_for(urn).is_file())
    }

    fn get(&self, urn: &Urn) -> Result<Vec<u8>> {
        fs::read(self.path_for(urn)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => FolioError::NotFound {
                urn: urn.to_string(),
            },
            _ => io_error("read_object", e),
        })
    }

    fn put(&self, urn: &Urn, content: &[u8]) -> Result<()> {
        let path = self.path_for(urn);

        match fs::read(&path) {
            Ok(existing) => return settle(urn, &path, &existing, content),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_error("read_object", e)),
        }

        if write_new(&path, content)? {
            tracing::debug!(urn = %urn, bytes = content.len(), "object stored");
            return Ok(());
        }
        // another writer published first
        let existing = fs::read(&path).map_err(|e| io_error("read_object", e))?;
        settle(urn, &path, &existing, content)
    }
}

/// Compare a write with what is already stored under `urn`
fn settle(urn: &Urn, path: &Path, existing: &[u8], content: &[u8]) -> Result<()> {
    if existing == content {
        tracing::debug!(urn = %urn, "object already stored");
        return Ok(());
    }
    let aside = collision_path(path);
    atomic_write(&aside, content)?;
    tracing::error!(urn = %urn, aside = %aside.display(), "hash collision");
    Err(collision(urn, &aside))
}
