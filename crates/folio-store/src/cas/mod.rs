//! Content-addressed object storage on the filesystem
//!
//! Provides:
//! - Sharded layout by algorithm and digest prefix
//! - Atomic writes and collision detection

mod atomic;
mod fs_store;
mod sharding;

pub use fs_store::{FsStore, COLLISION_SUFFIX};
