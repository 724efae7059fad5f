//! Content addresses
//!
//! A URN has the shape `urn:<algorithm>:<lowercase hex digest>`. Validity is
//! decided from the string alone; whether the URN names stored content is a
//! question for the storage collaborator.

use crate::errors::{FolioError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Algorithm used to address newly stored content
pub const HASH_ALGORITHM: &str = "sha256";

/// (algorithm, hex digest length) pairs accepted in URNs
const KNOWN_ALGORITHMS: &[(&str, usize)] =
    &[("sha1", 40), ("sha256", 64), ("sha384", 96), ("sha512", 128)];

/// Pure string predicate: is `s` a well-formed URN?
pub fn is_valid_urn(s: &str) -> bool {
    split_urn(s).is_some()
}

fn split_urn(s: &str) -> Option<(&str, &str)> {
    let rest = s.strip_prefix("urn:")?;
    let (algorithm, digest) = rest.split_once(':')?;
    let expected_len = KNOWN_ALGORITHMS
        .iter()
        .find(|(name, _)| *name == algorithm)
        .map(|(_, len)| *len)?;
    let hex_ok = digest
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    (digest.len() == expected_len && hex_ok).then_some((algorithm, digest))
}

/// A validated content address
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Urn(String);

impl Urn {
    /// # Errors
    ///
    /// `InvalidUrn` if `s` does not have the URN shape
    pub fn parse(s: &str) -> Result<Self> {
        if is_valid_urn(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(FolioError::InvalidUrn { urn: s.to_string() })
        }
    }

    /// Address `content` with the default algorithm
    pub fn for_content(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(format!("urn:{}:{}", HASH_ALGORITHM, hex::encode(hasher.finalize())))
    }

    /// Recompute the address of `content` using this URN's algorithm
    ///
    /// Returns `None` for algorithms new content is never addressed with.
    pub fn matches_content(&self, content: &[u8]) -> Option<bool> {
        (self.algorithm() == HASH_ALGORITHM).then(|| Urn::for_content(content) == *self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn algorithm(&self) -> &str {
        split_urn(&self.0).map(|(a, _)| a).unwrap_or_default()
    }

    pub fn digest(&self) -> &str {
        split_urn(&self.0).map(|(_, d)| d).unwrap_or_default()
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Urn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Urn {
    type Error = FolioError;

    fn try_from(value: String) -> Result<Self> {
        Urn::parse(&value)
    }
}

impl From<Urn> for String {
    fn from(urn: Urn) -> Self {
        urn.0
    }
}

impl std::str::FromStr for Urn {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self> {
        Urn::parse(s)
    }
}
