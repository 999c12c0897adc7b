//! Buffer validation and descriptor initialization.
//!
//! [`validate_and_init`] is the only way a descriptor is constructed from an
//! external buffer: it enforces the per-dimension axis specifications, an
//! optional global contiguity requirement, and the expected element layout,
//! then copies the buffer's geometry into the descriptor and acquires it.

use std::sync::Arc;

use crate::buffer::Buffer;
use crate::error::{AxisConstraintKind, MemviewError, Result};
use crate::host::{ElementType, FormatMatcher};
use crate::order::MemoryOrder;
use crate::slice::MemorySlice;
use crate::MAX_DIMS;

/// How a dimension is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisAccess {
    /// Plain strided addressing; indirection is forbidden.
    Direct,
    /// Indirect addressing; a non-negative suboffset is required.
    Ptr,
    /// Either direct or indirect, as the buffer provides.
    Full,
}

/// How a dimension's elements are packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisPacking {
    /// Stride equals the itemsize (or the pointer size for indirect access).
    Contig,
    /// Stride is at least the itemsize.
    Strided,
    /// Like `Strided`; the dimension follows the contiguous one.
    Follow,
}

/// Per-dimension constraint for buffer validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSpec {
    pub access: AxisAccess,
    pub packing: AxisPacking,
}

impl AxisSpec {
    pub const fn new(access: AxisAccess, packing: AxisPacking) -> Self {
        Self { access, packing }
    }
}

/// Validate an external buffer and initialize `out` as a view over it.
///
/// The expected dimension count is `specs.len()`. Checks run in a fixed
/// order, each with its own error kind; on any failure `out` is left
/// untouched (and therefore still uninitialized) and no acquisition is held.
pub fn validate_and_init(
    out: &mut MemorySlice,
    buffer: &Arc<Buffer>,
    specs: &[AxisSpec],
    contiguity: Option<MemoryOrder>,
    dtype: &ElementType,
    matcher: &dyn FormatMatcher,
) -> Result<()> {
    if out.is_initialized() {
        return Err(MemviewError::AlreadyInitialized);
    }
    if specs.len() > MAX_DIMS {
        return Err(MemviewError::TooManyDimensions { ndim: specs.len() });
    }
    if buffer.ndim() != specs.len() {
        return Err(MemviewError::DimensionMismatch {
            expected: specs.len(),
            got: buffer.ndim(),
        });
    }
    if !matcher.matches(buffer.format(), dtype) {
        return Err(MemviewError::TypeLayoutMismatch {
            buffer: matcher.describe(buffer.format()),
            expected: format!("'{}' ({})", dtype.name, dtype.format),
        });
    }
    if buffer.itemsize() != dtype.size {
        return Err(MemviewError::TypeLayoutMismatch {
            buffer: format!(
                "{} ({} bytes)",
                matcher.describe(buffer.format()),
                buffer.itemsize()
            ),
            expected: format!("'{}' ({} bytes)", dtype.name, dtype.size),
        });
    }
    let Some(strides) = buffer.strides() else {
        return Err(MemviewError::MissingStrides);
    };

    let itemsize = buffer.itemsize() as isize;
    let ptr_size = std::mem::size_of::<*const u8>() as isize;
    let suboffsets = buffer.suboffsets();

    for (dim, spec) in specs.iter().enumerate() {
        match spec.packing {
            AxisPacking::Contig => match spec.access {
                AxisAccess::Ptr | AxisAccess::Full => {
                    if strides[dim] != ptr_size {
                        return Err(MemviewError::AxisConstraint {
                            dim,
                            kind: AxisConstraintKind::NotIndirectlyContiguous,
                        });
                    }
                }
                AxisAccess::Direct => {
                    if strides[dim] != itemsize {
                        return Err(MemviewError::AxisConstraint {
                            dim,
                            kind: AxisConstraintKind::NotContiguous,
                        });
                    }
                }
            },
            AxisPacking::Strided | AxisPacking::Follow => {
                if strides[dim] < itemsize {
                    return Err(MemviewError::AxisConstraint {
                        dim,
                        kind: AxisConstraintKind::NotContiguous,
                    });
                }
            }
        }

        match spec.access {
            AxisAccess::Direct => {
                if suboffsets.map_or(false, |s| s[dim] >= 0) {
                    return Err(MemviewError::AxisConstraint {
                        dim,
                        kind: AxisConstraintKind::DirectAccess,
                    });
                }
            }
            AxisAccess::Ptr => {
                if !suboffsets.map_or(false, |s| s[dim] >= 0) {
                    return Err(MemviewError::AxisConstraint {
                        dim,
                        kind: AxisConstraintKind::NotIndirectlyAccessible,
                    });
                }
            }
            AxisAccess::Full => {}
        }
    }

    if let Some(order) = contiguity {
        let shape = buffer.shape();
        let mut expected = 1isize;
        for dim in order.walk(specs.len()) {
            if expected * itemsize != strides[dim] {
                return Err(MemviewError::ContiguityViolation { order });
            }
            expected = expected
                .checked_mul(shape[dim])
                .ok_or(MemviewError::OffsetOverflow)?;
        }
    }

    init_slice(out, buffer)
}

/// Copy the buffer geometry into `out`, attach the buffer handle and acquire.
///
/// Suboffsets default to `-1` when the buffer supplies none.
pub(crate) fn init_slice(out: &mut MemorySlice, buffer: &Arc<Buffer>) -> Result<()> {
    if out.is_initialized() {
        return Err(MemviewError::AlreadyInitialized);
    }
    let ndim = buffer.ndim();
    if ndim > MAX_DIMS {
        return Err(MemviewError::TooManyDimensions { ndim });
    }
    let strides = buffer.strides().ok_or(MemviewError::MissingStrides)?;
    let suboffsets = buffer.suboffsets();
    for dim in 0..ndim {
        out.shape[dim] = buffer.shape()[dim];
        out.strides[dim] = strides[dim];
        out.suboffsets[dim] = suboffsets.map_or(-1, |s| s[dim]);
    }
    out.ndim = ndim;
    out.data = buffer.data_ptr();
    out.buffer = Some(Arc::clone(buffer));
    out.acquire(false);
    log::debug!(
        "initialized {}-d view (itemsize {}, acquisitions {})",
        ndim,
        buffer.itemsize(),
        buffer.acquisition_count()
    );
    Ok(())
}

impl MemorySlice {
    /// Validate `buffer` and return a fresh view over it.
    ///
    /// By-value convenience wrapper around [`validate_and_init`].
    pub fn from_buffer(
        buffer: &Arc<Buffer>,
        specs: &[AxisSpec],
        contiguity: Option<MemoryOrder>,
        dtype: &ElementType,
        matcher: &dyn FormatMatcher,
    ) -> Result<Self> {
        let mut out = MemorySlice::uninit();
        validate_and_init(&mut out, buffer, specs, contiguity, dtype, matcher)?;
        Ok(out)
    }
}
