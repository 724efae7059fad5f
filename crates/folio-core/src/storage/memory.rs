//! In-process content store

use super::ContentStore;
use crate::errors::{FolioError, Result};
use crate::urn::Urn;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Map-backed store that counts writes and keeps colliding payloads aside
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<Urn, Vec<u8>>>,
    collisions: Mutex<Vec<(Urn, Vec<u8>)>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Objects actually written (idempotent re-puts are not counted)
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock_objects().map(|o| o.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payloads rejected because differing bytes already held their URN
    pub fn collisions(&self) -> Vec<(Urn, Vec<u8>)> {
        self.collisions
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Store bytes under `urn` without hashing them; for integrity tests
    ///
    /// # Errors
    ///
    /// `Internal` if the store's lock is poisoned
    pub fn insert_unchecked(&self, urn: Urn, content: Vec<u8>) -> Result<()> {
        self.lock_objects()?.insert(urn, content);
        Ok(())
    }

    fn lock_objects(&self) -> Result<MutexGuard<'_, HashMap<Urn, Vec<u8>>>> {
        self.objects.lock().map_err(|_| FolioError::Internal {
            message: "memory store lock poisoned".to_string(),
        })
    }
}

impl ContentStore for MemoryStore {
    fn contains(&self, urn: &Urn) -> Result<bool> {
        Ok(self.lock_objects()?.contains_key(urn))
    }

    fn get(&self, urn: &Urn) -> Result<Vec<u8>> {
        self.lock_objects()?
            .get(urn)
            .cloned()
            .ok_or_else(|| FolioError::NotFound {
                urn: urn.to_string(),
            })
    }

    fn put(&self, urn: &Urn, content: &[u8]) -> Result<()> {
        let mut objects = self.lock_objects()?;
        match objects.get(urn) {
            Some(existing) if existing.as_slice() == content => Ok(()),
            Some(_) => {
                if let Ok(mut collisions) = self.collisions.lock() {
                    collisions.push((urn.clone(), content.to_vec()));
                }
                Err(FolioError::Integrity {
                    urn: urn.to_string(),
                    message: "hash collision: different content already stored".to_string(),
                })
            }
            None => {
                objects.insert(urn.clone(), content.to_vec());
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }
}
