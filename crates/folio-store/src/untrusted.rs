//! Hash verification for backends that are not trusted to return what was stored

use crate::errors::{corrupt, Result};
use folio_core::settings::DEFAULT_MAX_RESOURCE_SIZE;
use folio_core::{ContentStore, Settings, Urn};

/// Wraps a [`ContentStore`] and re-hashes every object crossing it
///
/// Reads fail with `Integrity` when the bytes do not hash to their URN or
/// exceed the size limit. Objects addressed with an algorithm that new
/// content is never hashed with cannot be checked and are refused.
#[derive(Debug)]
pub struct VerifyingStore<S> {
    inner: S,
    max_size: u64,
}

impl<S: ContentStore> VerifyingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            max_size: DEFAULT_MAX_RESOURCE_SIZE,
        }
    }

    /// Use the size limit from `settings`
    pub fn with_settings(inner: S, settings: &Settings) -> Self {
        Self {
            inner,
            max_size: settings.max_resource_size,
        }
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn verify(&self, urn: &Urn, content: &[u8]) -> Result<()> {
        let len = content.len() as u64;
        if len > self.max_size {
            return Err(corrupt(
                urn,
                format!("object of {} bytes exceeds limit of {}", len, self.max_size),
            ));
        }
        match urn.matches_content(content) {
            Some(true) => Ok(()),
            Some(false) => Err(corrupt(urn, "content does not hash to its URN")),
            None => Err(corrupt(
                urn,
                format!("cannot verify {} digests", urn.algorithm()),
            )),
        }
    }
}

impl<S: ContentStore> ContentStore for VerifyingStore<S> {
    fn contains(&self, urn: &Urn) -> Result<bool> {
        self.inner.contains(urn)
    }

    fn get(&self, urn: &Urn) -> Result<Vec<u8>> {
        let content = self.inner.get(urn)?;
        if let Err(e) = self.verify(urn, &content) {
            tracing::warn!(urn = %urn, "rejected object from untrusted store");
            return Err(e);
        }
        Ok(content)
    }

    fn put(&self, urn: &Urn, content: &[u8]) -> Result<()> {
        self.verify(urn, content)?;
        self.inner.put(urn, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{FolioError, MemoryStore};

    #[test]
    fn test_honest_content_passes() {
        let store = VerifyingStore::new(MemoryStore::new());
        let urn = Urn::for_content(b"honest");

        store.put(&urn, b"honest").unwrap();

        assert_eq!(store.get(&urn).unwrap(), b"honest");
    }

    #[test]
    fn test_tampered_content_is_rejected() {
        // GIVEN a backend returning bytes that do not match the URN
        let inner = MemoryStore::new();
        let urn = Urn::for_content(b"original");
        inner.insert_unchecked(urn.clone(), b"tampered".to_vec()).unwrap();
        let store = VerifyingStore::new(inner);

        // WHEN reading through the wrapper
        let err = store.get(&urn).unwrap_err();

        // THEN an integrity fault is raised
        assert!(matches!(err, FolioError::Integrity { .. }));
    }

    #[test]
    fn test_oversized_content_is_rejected() {
        let settings = Settings {
            max_resource_size: 4,
            ..Settings::default()
        };
        let store = VerifyingStore::with_settings(MemoryStore::new(), &settings);
        let urn = Urn::for_content(b"too large");

        let err = store.put(&urn, b"too large").unwrap_err();

        match err {
            FolioError::Integrity { message, .. } => assert!(message.contains("exceeds")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(store.inner().is_empty());
    }

    #[test]
    fn test_unverifiable_algorithm_is_rejected() {
        let inner = MemoryStore::new();
        let urn = Urn::parse(&format!("urn:sha1:{}", "0".repeat(40))).unwrap();
        inner.insert_unchecked(urn.clone(), b"legacy".to_vec()).unwrap();
        let store = VerifyingStore::new(inner);

        assert!(matches!(
            store.get(&urn),
            Err(FolioError::Integrity { .. })
        ));
    }
}
