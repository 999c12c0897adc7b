//! View lifetime management.
//!
//! Every initialized [`MemorySlice`] owns one acquisition on its buffer.
//! The first acquirer of a buffer takes the host ownership handle
//! ([`HostRuntime::retain`](crate::HostRuntime::retain)); the last releaser
//! drops it. `Clone` and `Drop` keep the invariant without explicit calls.
//!
//! An impossible counter value (negative before an acquire, non-positive
//! before a release) means the bookkeeping itself has been corrupted,
//! typically by a use-after-release, and recovery would risk a
//! use-after-free. That path logs and aborts the process; it is not an
//! error callers can observe.

use crate::host::HostAccess;
use crate::slice::MemorySlice;

#[cold]
fn fatal_acquisition_count(count: isize) -> ! {
    log::error!(
        "acquisition count is {count}; aborting (memory corruption or use-after-release)"
    );
    std::process::abort();
}

impl MemorySlice {
    /// Record one additional live reference to this descriptor's buffer.
    ///
    /// Pairs with a later [`release`](Self::release) of the duplicate
    /// descriptor. Uninitialized descriptors are ignored, matching the
    /// permitted "assign over uninitialized" pattern.
    ///
    /// `holds_exclusive` declares that the caller is already inside the
    /// host's exclusive section, skipping re-entry around a first-time
    /// retain.
    pub fn acquire(&self, holds_exclusive: bool) {
        let Some(buffer) = self.buffer.as_ref() else {
            return;
        };
        let prev = buffer.acquisitions().increment();
        if prev < 0 {
            fatal_acquisition_count(prev);
        }
        if prev == 0 {
            log::trace!("first acquisition: taking host ownership handle");
            let _access = HostAccess::ensure(buffer.runtime(), holds_exclusive);
            buffer.runtime().retain();
        }
    }

    /// Release this descriptor's acquisition and reset it to uninitialized.
    ///
    /// The last release over a buffer drops the host ownership handle.
    /// Uninitialized descriptors are ignored.
    pub fn release(&mut self, holds_exclusive: bool) {
        let Some(buffer) = self.buffer.take() else {
            return;
        };
        let prev = buffer.acquisitions().decrement();
        if prev <= 0 {
            fatal_acquisition_count(prev);
        }
        self.data = std::ptr::null_mut();
        self.ndim = 0;
        if prev == 1 {
            log::trace!("last release: dropping host ownership handle");
            let _access = HostAccess::ensure(buffer.runtime(), holds_exclusive);
            buffer.runtime().release();
        }
    }
}

impl Drop for MemorySlice {
    fn drop(&mut self) {
        self.release(false);
    }
}

impl Clone for MemorySlice {
    fn clone(&self) -> Self {
        let dup = MemorySlice {
            buffer: self.buffer.clone(),
            data: self.data,
            shape: self.shape,
            strides: self.strides,
            suboffsets: self.suboffsets,
            ndim: self.ndim,
        };
        dup.acquire(false);
        dup
    }
}
