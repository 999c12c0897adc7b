//! Per-buffer acquisition counter.
//!
//! The counter is the only shared mutable state in the crate. On targets with
//! pointer-width atomics the increment/decrement are lock-free fetch ops; on
//! targets without them the same operations run under a mutex. Callers cannot
//! observe which path was taken: both return the pre-operation value.

#[cfg(target_has_atomic = "ptr")]
mod imp {
    use std::sync::atomic::{AtomicIsize, Ordering};

    #[derive(Debug, Default)]
    pub(crate) struct AcquisitionCount(AtomicIsize);

    impl AcquisitionCount {
        pub(crate) fn new() -> Self {
            Self(AtomicIsize::new(0))
        }

        /// Increment, returning the pre-increment value.
        pub(crate) fn increment(&self) -> isize {
            self.0.fetch_add(1, Ordering::AcqRel)
        }

        /// Decrement, returning the pre-decrement value.
        pub(crate) fn decrement(&self) -> isize {
            self.0.fetch_sub(1, Ordering::AcqRel)
        }

        pub(crate) fn get(&self) -> isize {
            self.0.load(Ordering::Acquire)
        }
    }
}

#[cfg(not(target_has_atomic = "ptr"))]
mod imp {
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub(crate) struct AcquisitionCount(Mutex<isize>);

    impl AcquisitionCount {
        pub(crate) fn new() -> Self {
            Self(Mutex::new(0))
        }

        pub(crate) fn increment(&self) -> isize {
            let mut count = self.0.lock().unwrap_or_else(|e| e.into_inner());
            let prev = *count;
            *count += 1;
            prev
        }

        pub(crate) fn decrement(&self) -> isize {
            let mut count = self.0.lock().unwrap_or_else(|e| e.into_inner());
            let prev = *count;
            *count -= 1;
            prev
        }

        pub(crate) fn get(&self) -> isize {
            *self.0.lock().unwrap_or_else(|e| e.into_inner())
        }
    }
}

pub(crate) use imp::AcquisitionCount;
