//! Result buffers handed back across the C boundary

use std::cell::RefCell;
use std::ffi::c_char;
use std::mem::ManuallyDrop;
use std::ptr;

use tricache::Bytes;

thread_local! {
    /// Most recent borrowed result on this thread. Every pointer-returning
    /// call overwrites it, so one thread can never clobber another's result.
    static LAST_RETURNED: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
}

/// Copy a text result into this thread's buffer, NUL-terminated.
///
/// `None` becomes the empty string. The pointer stays valid until the next
/// pointer-returning call on the same thread.
pub(crate) fn stash_text(value: Option<Bytes>) -> *const c_char {
    LAST_RETURNED.with(|buf| {
        let mut buf = buf.borrow_mut();
        buf.clear();
        if let Some(value) = value {
            buf.extend_from_slice(&value);
        }
        buf.push(0);
        buf.as_ptr().cast::<c_char>()
    })
}

/// Copy a binary result into this thread's buffer and return its length.
///
/// `None` yields length 0.
pub(crate) fn stash_bytes(value: Option<Bytes>) -> (*const u8, usize) {
    LAST_RETURNED.with(|buf| {
        let mut buf = buf.borrow_mut();
        buf.clear();
        if let Some(value) = value {
            buf.extend_from_slice(&value);
        }
        (buf.as_ptr(), buf.len())
    })
}

/// Independently owned result buffer.
///
/// Released with `tricache_buffer_free`; there is no reuse contract. `data`
/// is null when the key was absent, so absent and empty stay distinguishable.
#[repr(C)]
#[derive(Debug)]
pub struct TricacheBuffer {
    /// Start of the payload, or null
    pub data: *mut u8,
    /// Payload length in bytes
    pub len: usize,
    /// Allocation capacity; only meaningful to `tricache_buffer_free`
    pub capacity: usize,
}

impl TricacheBuffer {
    pub(crate) fn empty() -> Self {
        Self {
            data: ptr::null_mut(),
            len: 0,
            capacity: 0,
        }
    }

    pub(crate) fn from_bytes(value: &Bytes) -> Self {
        let mut vec = ManuallyDrop::new(value.to_vec());
        Self {
            data: vec.as_mut_ptr(),
            len: vec.len(),
            capacity: vec.capacity(),
        }
    }

    /// Reclaim the allocation.
    ///
    /// # Safety
    /// `self` must come from `from_bytes` and must not have been freed yet.
    pub(crate) unsafe fn release(self) {
        if self.data.is_null() {
            return;
        }
        drop(Vec::from_raw_parts(self.data, self.len, self.capacity));
    }
}
