//! Shared buffer bookkeeping.
//!
//! A [`Buffer`] pairs a host-supplied buffer description with the acquisition
//! counter and the host ownership hooks. Buffers are shared between slice
//! descriptors through `Arc<Buffer>`; the *host object's* lifetime is driven
//! only through [`HostRuntime`] on the first-acquire / last-release
//! transitions.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::count::AcquisitionCount;
use crate::error::{MemviewError, Result};
use crate::host::HostRuntime;
use crate::order::MemoryOrder;
use crate::MAX_DIMS;

type DimVec = SmallVec<[isize; MAX_DIMS]>;

/// External buffer description as supplied by the host.
///
/// The analogue of a host buffer-protocol record: a raw data pointer plus
/// per-dimension layout. `strides` may be absent (a flat buffer without
/// stride information, rejected by validation), and `suboffsets` may be
/// absent, meaning no indirection in any dimension.
#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    /// Pointer to the first element.
    pub data: *mut u8,
    /// Element size in bytes.
    pub itemsize: usize,
    /// Opaque element-layout tag, checked by a
    /// [`FormatMatcher`](crate::FormatMatcher) during validation.
    pub format: String,
    /// Extent of each dimension; all extents must be non-negative.
    pub shape: Vec<isize>,
    /// Byte stride per dimension; signed, may be negative.
    pub strides: Option<Vec<isize>>,
    /// Per-dimension suboffsets; `>= 0` marks an indirect dimension.
    pub suboffsets: Option<Vec<isize>>,
}

/// Owned zeroed allocation backing buffers created by the contiguous copier.
struct OwnedBlock {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl OwnedBlock {
    fn allocate(size: usize) -> Result<Self> {
        let layout =
            Layout::from_size_align(size, 1).map_err(|_| MemviewError::OffsetOverflow)?;
        if size == 0 {
            return Ok(Self {
                ptr: NonNull::dangling(),
                layout,
            });
        }
        // Safety: layout has non-zero size.
        let raw = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(MemviewError::AllocationFailed)?;
        Ok(Self { ptr, layout })
    }
}

impl Drop for OwnedBlock {
    fn drop(&mut self) {
        if self.layout.size() != 0 {
            // Safety: allocated with this exact layout in `allocate`.
            unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
        }
    }
}

// Safety: the block is a plain byte allocation; access synchronization is the
// responsibility of the views over it, as with any external buffer.
unsafe impl Send for OwnedBlock {}
unsafe impl Sync for OwnedBlock {}

/// A shared buffer: host-supplied layout plus acquisition bookkeeping.
pub struct Buffer {
    data: *mut u8,
    itemsize: usize,
    format: String,
    shape: DimVec,
    strides: Option<DimVec>,
    suboffsets: Option<DimVec>,
    acquisitions: AcquisitionCount,
    runtime: Arc<dyn HostRuntime>,
    _owned: Option<OwnedBlock>,
}

// Safety: the raw data pointer refers to memory whose validity is guaranteed
// by the host for the lifetime of the exporting object, which the lifetime
// machinery keeps retained while any view is live. The acquisition counter is
// thread-safe by construction.
unsafe impl Send for Buffer {}
unsafe impl Sync for Buffer {}

impl Buffer {
    /// Wrap an external buffer description.
    ///
    /// # Safety
    ///
    /// `desc.data` (and, for indirect dimensions, every pointer reachable
    /// through the suboffset chain) must stay valid for reads and writes of
    /// the described extents for as long as the host object is retained via
    /// `runtime`. The `strides`/`suboffsets` vectors, when present, must have
    /// the same length as `shape`.
    pub unsafe fn from_descriptor(
        desc: BufferDescriptor,
        runtime: Arc<dyn HostRuntime>,
    ) -> Arc<Self> {
        debug_assert!(desc
            .strides
            .as_ref()
            .map_or(true, |s| s.len() == desc.shape.len()));
        debug_assert!(desc
            .suboffsets
            .as_ref()
            .map_or(true, |s| s.len() == desc.shape.len()));
        Arc::new(Self {
            data: desc.data,
            itemsize: desc.itemsize,
            format: desc.format,
            shape: DimVec::from_slice(&desc.shape),
            strides: desc.strides.map(|s| DimVec::from_slice(&s)),
            suboffsets: desc.suboffsets.map(|s| DimVec::from_slice(&s)),
            acquisitions: AcquisitionCount::new(),
            runtime,
            _owned: None,
        })
    }

    /// Allocate a fresh owned, zeroed, contiguous buffer.
    ///
    /// This is the allocation primitive used by the contiguous copier. The
    /// storage is freed when the last `Arc<Buffer>` handle drops.
    pub fn new_contiguous(
        shape: &[isize],
        itemsize: usize,
        format: impl Into<String>,
        order: MemoryOrder,
        runtime: Arc<dyn HostRuntime>,
    ) -> Result<Arc<Self>> {
        let strides = order.contiguous_strides(shape, itemsize)?;
        let total = shape.iter().try_fold(itemsize, |acc, &extent| {
            acc.checked_mul(extent as usize)
        });
        let total = total.ok_or(MemviewError::OffsetOverflow)?;
        let owned = OwnedBlock::allocate(total)?;
        Ok(Arc::new(Self {
            data: owned.ptr.as_ptr(),
            itemsize,
            format: format.into(),
            shape: DimVec::from_slice(shape),
            strides: Some(strides),
            suboffsets: None,
            acquisitions: AcquisitionCount::new(),
            runtime,
            _owned: Some(owned),
        }))
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn itemsize(&self) -> usize {
        self.itemsize
    }

    #[inline]
    pub fn format(&self) -> &str {
        &self.format
    }

    #[inline]
    pub fn shape(&self) -> &[isize] {
        &self.shape
    }

    #[inline]
    pub fn strides(&self) -> Option<&[isize]> {
        self.strides.as_deref()
    }

    #[inline]
    pub fn suboffsets(&self) -> Option<&[isize]> {
        self.suboffsets.as_deref()
    }

    /// Pointer to the first element.
    #[inline]
    pub fn data_ptr(&self) -> *mut u8 {
        self.data
    }

    /// Number of live slice descriptors referencing this buffer.
    pub fn acquisition_count(&self) -> isize {
        self.acquisitions.get()
    }

    #[inline]
    pub(crate) fn acquisitions(&self) -> &AcquisitionCount {
        &self.acquisitions
    }

    #[inline]
    pub(crate) fn runtime(&self) -> &dyn HostRuntime {
        &*self.runtime
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("itemsize", &self.itemsize)
            .field("format", &self.format)
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .field("suboffsets", &self.suboffsets)
            .field("acquisitions", &self.acquisitions.get())
            .field("owned", &self._owned.is_some())
            .finish()
    }
}
