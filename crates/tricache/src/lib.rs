//! # tricache
//!
//! In-process key/value cache made of three independently locked stores.
//!
//! ## Architecture
//! - **Ordered store**: `BTreeMap` behind its own `RwLock`
//! - **Hash store**: AHash `HashMap` behind its own `RwLock`
//! - **Blob store**: AHash `HashMap` of opaque byte payloads
//! - **Registry**: generation-checked handles so foreign callers never hold
//!   raw pointers
//!
//! Lookups in the ordered and hash stores record their own wall-clock
//! latency, most recent value only, per cache.

#![warn(missing_docs)]

mod cache;
mod error;
mod registry;
mod stats;
mod store;
mod timer;

pub use bytes::Bytes;
pub use cache::{Cache, StoreKind};
pub use error::{Error, Result};
pub use registry::{global, Handle, Registry};
pub use stats::LookupStats;
pub use store::{HashStore, OrderedStore, Store, StoreMap};
pub use timer::{time, LatencySlot, Timer};
