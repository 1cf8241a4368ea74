//! # tricache-ffi
//!
//! C ABI over [`tricache`] for callers in other runtimes (ctypes, cgo, JNI).
//!
//! Caches are addressed by `u64` handles from the process-wide registry, not
//! by pointers. A destroyed or never-issued handle is rejected with
//! `TRICACHE_INVALID_HANDLE` (or a null / `-1` result) instead of being
//! dereferenced.
//!
//! ## Returned data
//! The plain lookup calls copy their result into a per-thread buffer and
//! return a pointer into it. Copy it out before the next pointer-returning
//! call on the same thread. Text results are NUL-terminated and an absent
//! key reads as "", the same as a stored empty string.
//!
//! The `_owned` variants hand back a `TricacheBuffer` the caller owns and
//! frees with `tricache_buffer_free`. They also report absence separately
//! via `TRICACHE_ABSENT`.

#![warn(missing_docs)]

mod api;
mod buffer;

pub use api::*;
pub use buffer::TricacheBuffer;

/// Call succeeded
pub const TRICACHE_OK: i32 = 0;

/// Call succeeded but the key was not present (`_owned` variants only)
pub const TRICACHE_ABSENT: i32 = 1;

/// Handle unknown or already destroyed
pub const TRICACHE_INVALID_HANDLE: i32 = -1;

/// A required pointer argument was null
pub const TRICACHE_NULL_ARGUMENT: i32 = -2;

/// No registry slot available
pub const TRICACHE_REGISTRY_FULL: i32 = -3;
