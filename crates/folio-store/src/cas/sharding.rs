//! Sharding logic for the object store
//!
//! Objects are spread over two directory levels taken from the digest so
//! no directory grows too large.

use std::path::{Path, PathBuf};

/// For `urn:sha256:abcdef...`, returns `<root>/sha256/ab/cd/abcdef...`
///
/// Digests shorter than four characters are not produced by valid URNs;
/// they land directly under the algorithm directory.
pub fn shard_path(root: &Path, algorithm: &str, digest: &str) -> PathBuf {
    let base = root.join(algorithm);
    match (digest.get(..2), digest.get(2..4)) {
        (Some(first), Some(second)) => base.join(first).join(second).join(digest),
        _ => base.join(digest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_path() {
        let path = shard_path(Path::new("/store"), "sha256", "abc123def456");

        assert_eq!(path, PathBuf::from("/store/sha256/ab/c1/abc123def456"));
    }

    #[test]
    fn test_shard_path_full_digest() {
        let digest = "a".repeat(64);
        let path = shard_path(Path::new("/store"), "sha256", &digest);

        assert!(path.starts_with("/store/sha256/aa/aa"));
        assert!(path.ends_with(&digest));
    }

    #[test]
    fn test_short_digest() {
        let path = shard_path(Path::new("/store"), "sha1", "ab");

        assert_eq!(path, PathBuf::from("/store/sha1/ab"));
    }
}
