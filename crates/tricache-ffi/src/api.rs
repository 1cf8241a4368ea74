//! `extern "C"` entry points
//!
//! Every entry point resolves its handle through the global registry first.
//! A bad handle or a null argument is logged and reported through the return
//! value; it never touches freed memory.

use std::ffi::{c_char, CStr};
use std::ptr;
use std::slice;
use std::sync::Arc;

use tracing::warn;
use tricache::{global, Bytes, Cache, Error, Handle, Result};

use crate::buffer::{stash_bytes, stash_text, TricacheBuffer};
use crate::{
    TRICACHE_ABSENT, TRICACHE_INVALID_HANDLE, TRICACHE_NULL_ARGUMENT, TRICACHE_OK,
    TRICACHE_REGISTRY_FULL,
};

fn cache_for(handle: u64) -> Result<Arc<Cache>> {
    global().get(Handle::from_raw(handle))
}

/// Borrow a NUL-terminated foreign string as raw bytes (terminator excluded).
unsafe fn text_arg<'a>(ptr: *const c_char, name: &'static str) -> Result<&'a [u8]> {
    if ptr.is_null() {
        return Err(Error::NullArgument(name));
    }
    Ok(CStr::from_ptr(ptr).to_bytes())
}

fn status_code(err: &Error) -> i32 {
    match err {
        Error::InvalidHandle(_) => TRICACHE_INVALID_HANDLE,
        Error::NullArgument(_) => TRICACHE_NULL_ARGUMENT,
        Error::RegistryFull => TRICACHE_REGISTRY_FULL,
    }
}

fn report(op: &'static str, result: Result<()>) -> i32 {
    match result {
        Ok(()) => TRICACHE_OK,
        Err(e) => {
            warn!(op, error = %e, "rejected boundary call");
            status_code(&e)
        }
    }
}

/// Allocate a new cache. Returns its handle, or 0 if no slot is available.
#[no_mangle]
pub extern "C" fn tricache_create() -> u64 {
    match global().create() {
        Ok(handle) => handle.into_raw(),
        Err(e) => {
            warn!(error = %e, "cache creation failed");
            0
        }
    }
}

/// Release a cache. Any later use of `handle` is rejected.
#[no_mangle]
pub extern "C" fn tricache_destroy(handle: u64) -> i32 {
    report("destroy", global().destroy(Handle::from_raw(handle)))
}

/// Insert or overwrite an ordered-store entry.
///
/// # Safety
/// `key` and `value` must be null or point to NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn tricache_populate_ordered(
    handle: u64,
    key: *const c_char,
    value: *const c_char,
) -> i32 {
    let result = (|| -> Result<()> {
        let cache = cache_for(handle)?;
        let key = text_arg(key, "key")?;
        let value = text_arg(value, "value")?;
        cache.populate_ordered(key, Bytes::copy_from_slice(value));
        Ok(())
    })();
    report("populate_ordered", result)
}

/// Insert or overwrite a hash-store entry.
///
/// # Safety
/// `key` and `value` must be null or point to NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn tricache_populate_hash(
    handle: u64,
    key: *const c_char,
    value: *const c_char,
) -> i32 {
    let result = (|| -> Result<()> {
        let cache = cache_for(handle)?;
        let key = text_arg(key, "key")?;
        let value = text_arg(value, "value")?;
        cache.populate_hash(key, Bytes::copy_from_slice(value));
        Ok(())
    })();
    report("populate_hash", result)
}

/// Store `len` bytes from `data` as a blob. Zero bytes inside are kept.
///
/// # Safety
/// `key` must be null or NUL-terminated. `data` must be valid for `len`
/// bytes; it may be null only when `len` is 0.
#[no_mangle]
pub unsafe extern "C" fn tricache_set_blob(
    handle: u64,
    key: *const c_char,
    data: *const u8,
    len: usize,
) -> i32 {
    let result = (|| -> Result<()> {
        let cache = cache_for(handle)?;
        let key = text_arg(key, "key")?;
        let payload = if len == 0 {
            &[][..]
        } else if data.is_null() {
            return Err(Error::NullArgument("data"));
        } else {
            slice::from_raw_parts(data, len)
        };
        cache.set_blob(key, Bytes::copy_from_slice(payload));
        Ok(())
    })();
    report("set_blob", result)
}

/// Fetch a blob into this thread's result buffer.
///
/// Writes the payload length to `len_out` (0 if absent). The returned
/// pointer is valid until the next pointer-returning call on this thread.
/// Returns null, with `len_out` set to 0, on a bad handle or null key.
///
/// # Safety
/// `key` must be null or NUL-terminated; `len_out` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn tricache_get_blob(
    handle: u64,
    key: *const c_char,
    len_out: *mut usize,
) -> *const u8 {
    if len_out.is_null() {
        warn!(op = "get_blob", "null len_out");
        return ptr::null();
    }
    *len_out = 0;

    let result = (|| -> Result<Option<Bytes>> {
        let cache = cache_for(handle)?;
        let key = text_arg(key, "key")?;
        Ok(cache.get_blob(key))
    })();

    match result {
        Ok(value) => {
            let (data, len) = stash_bytes(value);
            *len_out = len;
            data
        }
        Err(e) => {
            warn!(op = "get_blob", error = %e, "rejected boundary call");
            ptr::null()
        }
    }
}

unsafe fn lookup_text(
    op: &'static str,
    handle: u64,
    key: *const c_char,
    lookup: fn(&Cache, &[u8]) -> Option<Bytes>,
) -> *const c_char {
    let result = (|| -> Result<Option<Bytes>> {
        let cache = cache_for(handle)?;
        let key = text_arg(key, "key")?;
        Ok(lookup(&cache, key))
    })();

    match result {
        Ok(value) => stash_text(value),
        Err(e) => {
            warn!(op, error = %e, "rejected boundary call");
            ptr::null()
        }
    }
}

/// Look up an ordered-store entry into this thread's result buffer.
///
/// Returns "" when absent and null on a bad handle or null key.
///
/// # Safety
/// `key` must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn tricache_lookup_ordered(handle: u64, key: *const c_char) -> *const c_char {
    lookup_text("lookup_ordered", handle, key, |cache, key| {
        cache.lookup_ordered(key)
    })
}

/// Look up a hash-store entry into this thread's result buffer.
///
/// Returns "" when absent and null on a bad handle or null key.
///
/// # Safety
/// `key` must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn tricache_lookup_hash(handle: u64, key: *const c_char) -> *const c_char {
    lookup_text("lookup_hash", handle, key, |cache, key| cache.lookup_hash(key))
}

fn latency_ns(op: &'static str, handle: u64, read: fn(&Cache) -> u128) -> i64 {
    match cache_for(handle) {
        Ok(cache) => i64::try_from(read(&cache)).unwrap_or(i64::MAX),
        Err(e) => {
            warn!(op, error = %e, "rejected boundary call");
            -1
        }
    }
}

/// Nanoseconds taken by the most recent ordered lookup, or -1 on a bad handle.
#[no_mangle]
pub extern "C" fn tricache_ordered_lookup_latency_ns(handle: u64) -> i64 {
    latency_ns("ordered_lookup_latency_ns", handle, |cache| {
        cache.ordered_lookup_latency().as_nanos()
    })
}

/// Nanoseconds taken by the most recent hash lookup, or -1 on a bad handle.
#[no_mangle]
pub extern "C" fn tricache_hash_lookup_latency_ns(handle: u64) -> i64 {
    latency_ns("hash_lookup_latency_ns", handle, |cache| {
        cache.hash_lookup_latency().as_nanos()
    })
}

unsafe fn fetch_owned(
    op: &'static str,
    handle: u64,
    key: *const c_char,
    out: *mut TricacheBuffer,
    fetch: fn(&Cache, &[u8]) -> Option<Bytes>,
) -> i32 {
    if out.is_null() {
        warn!(op, "null out buffer");
        return TRICACHE_NULL_ARGUMENT;
    }
    out.write(TricacheBuffer::empty());

    let result = (|| -> Result<Option<Bytes>> {
        let cache = cache_for(handle)?;
        let key = text_arg(key, "key")?;
        Ok(fetch(&cache, key))
    })();

    match result {
        Ok(Some(value)) => {
            out.write(TricacheBuffer::from_bytes(&value));
            TRICACHE_OK
        }
        Ok(None) => TRICACHE_ABSENT,
        Err(e) => {
            warn!(op, error = %e, "rejected boundary call");
            status_code(&e)
        }
    }
}

/// Fetch a blob into a caller-owned buffer.
///
/// Returns `TRICACHE_OK` with `out` filled, `TRICACHE_ABSENT` with `out`
/// empty, or a negative status. Free `out` with `tricache_buffer_free`.
///
/// # Safety
/// `key` must be null or NUL-terminated; `out` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn tricache_get_blob_owned(
    handle: u64,
    key: *const c_char,
    out: *mut TricacheBuffer,
) -> i32 {
    fetch_owned("get_blob_owned", handle, key, out, |cache, key| {
        cache.get_blob(key)
    })
}

/// Ordered lookup into a caller-owned buffer (no NUL terminator).
///
/// # Safety
/// Same contract as `tricache_get_blob_owned`.
#[no_mangle]
pub unsafe extern "C" fn tricache_lookup_ordered_owned(
    handle: u64,
    key: *const c_char,
    out: *mut TricacheBuffer,
) -> i32 {
    fetch_owned("lookup_ordered_owned", handle, key, out, |cache, key| {
        cache.lookup_ordered(key)
    })
}

/// Hash lookup into a caller-owned buffer (no NUL terminator).
///
/// # Safety
/// Same contract as `tricache_get_blob_owned`.
#[no_mangle]
pub unsafe extern "C" fn tricache_lookup_hash_owned(
    handle: u64,
    key: *const c_char,
    out: *mut TricacheBuffer,
) -> i32 {
    fetch_owned("lookup_hash_owned", handle, key, out, |cache, key| {
        cache.lookup_hash(key)
    })
}

/// Release a buffer filled by one of the `_owned` calls.
///
/// # Safety
/// `buffer` must come from an `_owned` call and be freed only once.
#[no_mangle]
pub unsafe extern "C" fn tricache_buffer_free(buffer: TricacheBuffer) {
    buffer.release();
}
