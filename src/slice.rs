//! The slice descriptor: a window into a shared buffer.

use std::fmt;
use std::ptr;
use std::sync::Arc;

use crate::buffer::Buffer;
use crate::error::{MemviewError, Result};
use crate::MAX_DIMS;

/// A strided, possibly indirect window into a shared [`Buffer`].
///
/// A descriptor is either fully uninitialized (no buffer handle, null data
/// pointer) or fully initialized; there is no partial state. Every
/// initialized descriptor owns exactly one acquisition on its buffer,
/// released when the descriptor is dropped or explicitly released.
///
/// Layout per dimension `i` (active dimensions are `0..ndim`):
///
/// - `shape[i]`: non-negative extent; zero means an empty footprint.
/// - `strides[i]`: signed byte stride.
/// - `suboffsets[i]`: negative for direct addressing; non-negative means the
///   byte location reached in this dimension holds a pointer which is
///   dereferenced and advanced by the suboffset before continuing.
pub struct MemorySlice {
    pub(crate) buffer: Option<Arc<Buffer>>,
    pub(crate) data: *mut u8,
    pub(crate) shape: [isize; MAX_DIMS],
    pub(crate) strides: [isize; MAX_DIMS],
    pub(crate) suboffsets: [isize; MAX_DIMS],
    pub(crate) ndim: usize,
}

// Safety: the referenced Buffer is Send + Sync, acquisition bookkeeping is
// thread-safe, and element access through raw pointers carries the same
// external-synchronization contract as the buffer itself.
unsafe impl Send for MemorySlice {}
unsafe impl Sync for MemorySlice {}

impl MemorySlice {
    /// An uninitialized descriptor: no buffer handle, null data pointer.
    pub const fn uninit() -> Self {
        Self {
            buffer: None,
            data: ptr::null_mut(),
            shape: [0; MAX_DIMS],
            strides: [0; MAX_DIMS],
            suboffsets: [-1; MAX_DIMS],
            ndim: 0,
        }
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.buffer.is_some()
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Extents of the active dimensions.
    #[inline]
    pub fn shape(&self) -> &[isize] {
        &self.shape[..self.ndim]
    }

    /// Byte strides of the active dimensions.
    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides[..self.ndim]
    }

    /// Suboffsets of the active dimensions (`-1` for direct dimensions).
    #[inline]
    pub fn suboffsets(&self) -> &[isize] {
        &self.suboffsets[..self.ndim]
    }

    /// Data pointer, already adjusted for any applied indexing.
    #[inline]
    pub fn data_ptr(&self) -> *mut u8 {
        self.data
    }

    /// Shared handle to the underlying buffer, if initialized.
    #[inline]
    pub fn buffer(&self) -> Option<&Arc<Buffer>> {
        self.buffer.as_ref()
    }

    /// Element size in bytes, if initialized.
    #[inline]
    pub fn itemsize(&self) -> Option<usize> {
        self.buffer.as_ref().map(|b| b.itemsize())
    }

    /// Number of elements in the view; 0 for an uninitialized descriptor.
    pub fn len(&self) -> usize {
        if !self.is_initialized() {
            return 0;
        }
        self.shape().iter().map(|&extent| extent as usize).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pointer to the element at `indices`, one index per dimension.
    ///
    /// Negative indices wrap (`index += shape`); indirect dimensions are
    /// resolved by chasing their stored pointer.
    pub fn element_ptr(&self, indices: &[isize]) -> Result<*mut u8> {
        if !self.is_initialized() {
            return Err(MemviewError::NotInitialized);
        }
        if indices.len() != self.ndim {
            return Err(MemviewError::DimensionMismatch {
                expected: self.ndim,
                got: indices.len(),
            });
        }
        let mut p = self.data;
        for (dim, &index) in indices.iter().enumerate() {
            let extent = self.shape[dim];
            let mut idx = index;
            if idx < 0 {
                idx += extent;
            }
            if idx < 0 || idx >= extent {
                return Err(MemviewError::IndexOutOfBounds { dim, index });
            }
            // Safety: idx is in bounds and the buffer contract guarantees the
            // pointer chain for indirect dimensions.
            p = unsafe { index_full(p, idx, self.strides[dim], self.suboffsets[dim]) };
        }
        Ok(p)
    }

    /// Whether any active dimension is indirect.
    pub fn has_indirection(&self) -> bool {
        self.suboffsets().iter().any(|&suboffset| suboffset >= 0)
    }
}

impl Default for MemorySlice {
    fn default() -> Self {
        Self::uninit()
    }
}

impl fmt::Debug for MemorySlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySlice")
            .field("initialized", &self.is_initialized())
            .field("ndim", &self.ndim)
            .field("shape", &self.shape())
            .field("strides", &self.strides())
            .field("suboffsets", &self.suboffsets())
            .finish()
    }
}

/// Advance `ptr` by `idx * stride`, then resolve one level of indirection
/// when `suboffset` is non-negative.
///
/// # Safety
///
/// For indirect dimensions the advanced location must hold a valid pointer,
/// per the buffer contract.
#[inline]
pub(crate) unsafe fn index_full(
    ptr: *mut u8,
    idx: isize,
    stride: isize,
    suboffset: isize,
) -> *mut u8 {
    let mut p = ptr.wrapping_offset(idx * stride);
    if suboffset >= 0 {
        p = (*(p as *const *mut u8)).wrapping_offset(suboffset);
    }
    p
}
