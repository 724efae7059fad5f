//! Atomic write primitives
//!
//! Content goes to a temp file first so readers never see a partial write.
//! It is then renamed over the target, or linked into place when an
//! existing file must not be replaced.

use crate::errors::{io_error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Suffix marking in-flight writes; never a valid object name
pub const TEMP_SUFFIX: &str = ".tmp";

fn temp_path_for(target: &Path) -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = target
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!("{}.{}.{}{}", name, std::process::id(), n, TEMP_SUFFIX))
}

/// Atomically write bytes to a file
///
/// The temp file lives next to the target so the rename stays on one
/// filesystem. Concurrent writers each get their own temp name.
pub fn atomic_write(target_path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error("create_store_dir", e))?;
    }

    let temp_path = temp_path_for(target_path);
    fs::write(&temp_path, content).map_err(|e| io_error("write_store_temp", e))?;

    if let Err(e) = fs::rename(&temp_path, target_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(io_error("rename_store_temp", e));
    }
    Ok(())
}

/// Publish bytes at `target_path` only if nothing is there yet
///
/// The content is written to a temp file and hard-linked into place, so
/// the target appears complete or not at all and an existing file is never
/// replaced. Returns `false` when the target already existed; its content
/// is left untouched.
pub fn write_new(target_path: &Path, content: &[u8]) -> Result<bool> {
    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error("create_store_dir", e))?;
    }

    let temp_path = temp_path_for(target_path);
    fs::write(&temp_path, content).map_err(|e| io_error("write_store_temp", e))?;

    let linked = fs::hard_link(&temp_path, target_path);
    let _ = fs::remove_file(&temp_path);
    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(io_error("link_store_temp", e)),
    }
}
