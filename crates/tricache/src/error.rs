//! Error types for tricache

use std::fmt;

/// Result type alias for tricache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for handle-based access
///
/// Cache operations themselves never fail; a missing key is reported as
/// `None`. These errors only come from the handle registry and the foreign
/// boundary built on top of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Handle was never issued, or its cache was already destroyed
    InvalidHandle(u64),

    /// A required pointer argument was null
    NullArgument(&'static str),

    /// All slot indices are in use
    RegistryFull,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidHandle(raw) => write!(f, "Invalid or destroyed cache handle: {:#x}", raw),
            Error::NullArgument(name) => write!(f, "Null pointer passed for argument '{}'", name),
            Error::RegistryFull => write!(f, "Registry full: no free cache slots"),
        }
    }
}

impl std::error::Error for Error {}
