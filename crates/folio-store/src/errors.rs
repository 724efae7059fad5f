//! Error helpers for folio-store
//!
//! Backends report through folio-core's `FolioError` so they can sit behind
//! the `ContentStore` contract.

use folio_core::Urn;
use std::path::Path;

pub use folio_core::errors::{FolioError, Result};

/// Create an IO error
pub fn io_error(op: &str, err: std::io::Error) -> FolioError {
    FolioError::Io {
        op: op.to_string(),
        message: err.to_string(),
    }
}

/// Different bytes already live under `urn`; the payload was set aside at `aside`
pub fn collision(urn: &Urn, aside: &Path) -> FolioError {
    FolioError::Integrity {
        urn: urn.to_string(),
        message: format!(
            "hash collision: stored bytes differ, payload kept at {}",
            aside.display()
        ),
    }
}

/// Create an integrity fault for content read back from a backend
pub fn corrupt(urn: &Urn, message: impl Into<String>) -> FolioError {
    FolioError::Integrity {
        urn: urn.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::ExError;

    #[test]
    fn test_io_error_maps_to_err_io() {
        let err = io_error("read_object", std::io::Error::other("disk gone"));

        let ex: ExError = err.into();
        assert_eq!(ex.code(), "ERR_IO");
        assert_eq!(ex.op(), Some("read_object"));
    }

    #[test]
    fn test_collision_names_the_aside_path() {
        let urn = Urn::for_content(b"x");
        let err = collision(&urn, Path::new("/store/ab/cd/abcd-collision"));

        match err {
            FolioError::Integrity { urn: u, message } => {
                assert_eq!(u, urn.to_string());
                assert!(message.contains("abcd-collision"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
