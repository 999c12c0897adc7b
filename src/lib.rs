//! Type-erased strided multi-dimensional views over externally-owned memory.
//!
//! A [`MemorySlice`] describes an n-dimensional window into a flat byte
//! buffer through per-dimension shape, stride and suboffset arrays. Strides
//! may be negative, and a non-negative suboffset marks an *indirect*
//! dimension whose elements are pointers into separately allocated blocks
//! (jagged host layouts). Views are constructed by validating an external
//! [`Buffer`] against per-dimension [`AxisSpec`] constraints, derived from
//! one another by slicing, and copied into freshly allocated contiguous
//! storage.
//!
//! # Core Types
//!
//! - [`MemorySlice`]: fixed-capacity view descriptor, cheap to copy around
//! - [`Buffer`]: shared bookkeeping for one underlying allocation, with an
//!   acquisition count driving host retain/release
//! - [`AxisSpec`] ([`AxisAccess`] × [`AxisPacking`]): what a view demands of
//!   each buffer dimension
//! - [`HostRuntime`]: hooks into whatever runtime owns the memory
//!
//! # Operations
//!
//! - [`validate_and_init`] / [`MemorySlice::from_buffer`]: gate an external
//!   buffer into a view
//! - [`MemorySlice::slice`] and [`SliceBuilder`]: integer indexing, range
//!   slices and full-dimension copies, with deferred pointer chasing through
//!   indirect dimensions
//! - [`MemorySlice::is_contiguous`], [`MemorySlice::overlaps`]
//! - [`MemorySlice::copy_contiguous`]: materialize any view as an owned
//!   C- or Fortran-contiguous buffer
//!
//! Acquisition counting is automatic: every initialized view holds one
//! acquisition on its buffer, released on drop. [`MemorySlice::acquire`] and
//! [`MemorySlice::release`] expose the raw transitions for embedders that
//! manage descriptor lifetime themselves.

mod buffer;
mod contig;
mod copy;
mod count;
mod error;
mod host;
mod lifetime;
mod order;
mod overlap;
mod slice;
mod slicer;
mod validate;

/// Maximum number of dimensions a view descriptor can represent.
///
/// Descriptors store shape/stride/suboffset arrays inline at this fixed
/// capacity, so they can be moved and copied without touching the heap.
pub const MAX_DIMS: usize = 8;

pub use buffer::{Buffer, BufferDescriptor};
pub use error::{AxisConstraintKind, MemviewError, Result};
pub use host::{ElementType, ExactFormat, FormatMatcher, HostRuntime, NoHost};
pub use order::MemoryOrder;
pub use overlap::{memory_extents, slices_overlap};
pub use slice::MemorySlice;
pub use slicer::{range, IndexOp, SliceBuilder};
pub use validate::{validate_and_init, AxisAccess, AxisPacking, AxisSpec};
