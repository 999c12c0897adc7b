//! Dimension-by-dimension slicing of initialized views.
//!
//! A [`SliceBuilder`] consumes one [`IndexOp`] per source dimension and emits
//! an output descriptor. Integer indices collapse a dimension, ranges keep it
//! with adjusted extent and stride, and [`IndexOp::Full`] keeps it unchanged.
//!
//! Indirect dimensions need care: when a range slice passes through an
//! indirect dimension, the displacement of later indexed dimensions cannot be
//! folded into the data pointer (the pointer table has not been chased yet).
//! The builder instead remembers the position of the most recent sliced
//! indirect dimension and accumulates those displacements into its suboffset,
//! so the chase happens per element at access time.

use std::sync::Arc;

use crate::error::{MemviewError, Result};
use crate::slice::MemorySlice;

/// One slicing operation, applied to one source dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOp {
    /// Select a single element; the dimension disappears from the output.
    /// Negative values index from the end.
    Index(isize),
    /// Select a range with optional start, stop and step (step defaults
    /// to 1 and may not be zero). Bounds wrap once from the end when
    /// negative; out-of-range or inverted bounds are rejected.
    Range {
        start: Option<isize>,
        stop: Option<isize>,
        step: Option<isize>,
    },
    /// Keep the dimension as-is.
    Full,
}

/// Incremental construction of a sliced view.
pub struct SliceBuilder<'a> {
    src: &'a MemorySlice,
    dst: MemorySlice,
    src_dim: usize,
    dst_dim: usize,
    /// Output dimension of the most recent *sliced* indirect dimension;
    /// displacements of later dimensions accumulate into its suboffset.
    pending_indirect: Option<usize>,
}

impl<'a> SliceBuilder<'a> {
    pub fn new(src: &'a MemorySlice) -> Result<Self> {
        if !src.is_initialized() {
            return Err(MemviewError::NotInitialized);
        }
        let mut dst = MemorySlice::uninit();
        dst.data = src.data;
        Ok(Self {
            src,
            dst,
            src_dim: 0,
            dst_dim: 0,
            pending_indirect: None,
        })
    }

    /// Apply `op` to the next source dimension.
    pub fn apply(&mut self, op: IndexOp) -> Result<()> {
        if self.src_dim >= self.src.ndim {
            return Err(MemviewError::DimensionMismatch {
                expected: self.src.ndim,
                got: self.src_dim + 1,
            });
        }
        match op {
            IndexOp::Index(index) => self.index_dim(index),
            IndexOp::Range { start, stop, step } => self.range_dim(start, stop, step),
            IndexOp::Full => {
                self.full_dim();
                Ok(())
            }
        }
    }

    fn full_dim(&mut self) {
        let d = self.src_dim;
        let suboffset = self.src.suboffsets[d];
        self.dst.shape[self.dst_dim] = self.src.shape[d];
        self.dst.strides[self.dst_dim] = self.src.strides[d];
        if suboffset >= 0 {
            self.dst.suboffsets[self.dst_dim] = suboffset;
            self.pending_indirect = Some(self.dst_dim);
        } else {
            // Direct dimensions carry the canonical -1 regardless of what
            // the source buffer reported.
            self.dst.suboffsets[self.dst_dim] = -1;
        }
        self.src_dim += 1;
        self.dst_dim += 1;
    }

    fn index_dim(&mut self, index: isize) -> Result<()> {
        let d = self.src_dim;
        let extent = self.src.shape[d];
        let mut idx = index;
        if idx < 0 {
            idx += extent;
        }
        if idx < 0 || idx >= extent {
            return Err(MemviewError::IndexOutOfBounds { dim: d, index });
        }

        let stride = self.src.strides[d];
        let suboffset = self.src.suboffsets[d];
        let displacement = idx * stride;
        match self.pending_indirect {
            Some(sd) => {
                if suboffset >= 0 {
                    return Err(MemviewError::UnresolvedIndirection { dim: d });
                }
                self.dst.suboffsets[sd] += displacement;
            }
            None => {
                self.dst.data = self.dst.data.wrapping_offset(displacement);
                if suboffset >= 0 {
                    // The chase is only well-defined while the data pointer
                    // still addresses a single pointer slot.
                    if self.dst_dim != 0 {
                        return Err(MemviewError::UnresolvedIndirection { dim: d });
                    }
                    self.dst.data = unsafe {
                        (*(self.dst.data as *const *mut u8)).wrapping_offset(suboffset)
                    };
                }
            }
        }
        self.src_dim += 1;
        Ok(())
    }

    fn range_dim(
        &mut self,
        start: Option<isize>,
        stop: Option<isize>,
        step: Option<isize>,
    ) -> Result<()> {
        let d = self.src_dim;
        let extent = self.src.shape[d];
        let step = step.unwrap_or(1);
        if step == 0 {
            return Err(MemviewError::InvalidSliceBounds { dim: d });
        }
        let negative_step = step < 0;

        // Bounds wrap once from the end, then must land inside the
        // dimension. For a negative step the walk starts at extent-1 and the
        // exclusive stop may reach -1 (only via the default).
        let start = match start {
            Some(mut s) => {
                if s < 0 {
                    s += extent;
                }
                let max = if negative_step { extent - 1 } else { extent };
                if s < 0 || s > max {
                    return Err(MemviewError::InvalidSliceBounds { dim: d });
                }
                s
            }
            None => {
                if negative_step {
                    extent - 1
                } else {
                    0
                }
            }
        };
        let stop = match stop {
            Some(mut s) => {
                if s < 0 {
                    s += extent;
                }
                let max = if negative_step { extent - 1 } else { extent };
                if s < 0 || s > max {
                    return Err(MemviewError::InvalidSliceBounds { dim: d });
                }
                s
            }
            None => {
                if negative_step {
                    -1
                } else {
                    extent
                }
            }
        };
        if if negative_step { stop > start } else { stop < start } {
            return Err(MemviewError::InvalidSliceBounds { dim: d });
        }

        let span = stop - start;
        let mut new_extent = span / step;
        if span % step != 0 {
            new_extent += 1;
        }

        let stride = self.src.strides[d];
        let suboffset = self.src.suboffsets[d];
        self.dst.shape[self.dst_dim] = new_extent;
        self.dst.strides[self.dst_dim] = stride * step;
        self.dst.suboffsets[self.dst_dim] = suboffset;

        let displacement = start * stride;
        match self.pending_indirect {
            Some(sd) => self.dst.suboffsets[sd] += displacement,
            None => self.dst.data = self.dst.data.wrapping_offset(displacement),
        }
        if suboffset >= 0 {
            self.pending_indirect = Some(self.dst_dim);
        }
        self.src_dim += 1;
        self.dst_dim += 1;
        Ok(())
    }

    /// Seal the builder into an initialized view sharing the source buffer.
    pub fn finish(mut self) -> Result<MemorySlice> {
        if self.src_dim != self.src.ndim {
            return Err(MemviewError::DimensionMismatch {
                expected: self.src.ndim,
                got: self.src_dim,
            });
        }
        self.dst.ndim = self.dst_dim;
        // Unreachable in practice: new() refused uninitialized sources.
        let buffer = self.src.buffer.as_ref().ok_or(MemviewError::NotInitialized)?;
        self.dst.buffer = Some(Arc::clone(buffer));
        self.dst.acquire(false);
        Ok(self.dst)
    }
}

impl MemorySlice {
    /// Slice the view with one operation per dimension.
    ///
    /// Missing trailing operations default to [`IndexOp::Full`]; supplying
    /// more operations than dimensions is an error.
    pub fn slice(&self, ops: &[IndexOp]) -> Result<MemorySlice> {
        if ops.len() > self.ndim {
            return Err(MemviewError::DimensionMismatch {
                expected: self.ndim,
                got: ops.len(),
            });
        }
        let mut builder = SliceBuilder::new(self)?;
        for &op in ops {
            builder.apply(op)?;
        }
        for _ in ops.len()..self.ndim {
            builder.apply(IndexOp::Full)?;
        }
        builder.finish()
    }
}

/// Shorthand for a fully-specified range op.
pub fn range(start: Option<isize>, stop: Option<isize>, step: Option<isize>) -> IndexOp {
    IndexOp::Range { start, stop, step }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{Buffer, BufferDescriptor};
    use crate::host::NoHost;
    use std::sync::Arc;

    fn view_3x4(storage: &mut [u8]) -> MemorySlice {
        assert!(storage.len() >= 96);
        let desc = BufferDescriptor {
            data: storage.as_mut_ptr(),
            itemsize: 8,
            format: "d".to_owned(),
            shape: vec![3, 4],
            strides: Some(vec![32, 8]),
            suboffsets: None,
        };
        let buffer = unsafe { Buffer::from_descriptor(desc, Arc::new(NoHost)) };
        let mut out = MemorySlice::uninit();
        crate::validate::init_slice(&mut out, &buffer).unwrap();
        out
    }

    #[test]
    fn test_index_collapses_dimension() {
        let mut storage = vec![0u8; 96];
        let base = storage.as_mut_ptr();
        let view = view_3x4(&mut storage);
        let row = view.slice(&[IndexOp::Index(1)]).unwrap();
        assert_eq!(row.ndim(), 1);
        assert_eq!(row.shape(), &[4]);
        assert_eq!(row.strides(), &[8]);
        assert_eq!(row.data_ptr(), base.wrapping_offset(32));
    }

    #[test]
    fn test_negative_index_wraps() {
        let mut storage = vec![0u8; 96];
        let base = storage.as_mut_ptr();
        let view = view_3x4(&mut storage);
        let row = view.slice(&[IndexOp::Index(-1)]).unwrap();
        assert_eq!(row.data_ptr(), base.wrapping_offset(64));
    }

    #[test]
    fn test_index_bounds() {
        let mut storage = vec![0u8; 96];
        let view = view_3x4(&mut storage);
        assert!(view.slice(&[IndexOp::Index(2)]).is_ok());
        assert!(view.slice(&[IndexOp::Index(-3)]).is_ok());
        assert!(matches!(
            view.slice(&[IndexOp::Index(3)]).unwrap_err(),
            MemviewError::IndexOutOfBounds { dim: 0, index: 3 }
        ));
        assert!(matches!(
            view.slice(&[IndexOp::Index(-4)]).unwrap_err(),
            MemviewError::IndexOutOfBounds { dim: 0, index: -4 }
        ));
    }

    #[test]
    fn test_range_with_step() {
        let mut storage = vec![0u8; 96];
        let base = storage.as_mut_ptr();
        let view = view_3x4(&mut storage);
        // columns 1 and 3
        let cols = view.slice(&[IndexOp::Full, range(Some(1), None, Some(2))]).unwrap();
        assert_eq!(cols.shape(), &[3, 2]);
        assert_eq!(cols.strides(), &[32, 16]);
        assert_eq!(cols.data_ptr(), base.wrapping_offset(8));
    }

    #[test]
    fn test_negative_step_reverses() {
        let mut storage = vec![0u8; 96];
        let base = storage.as_mut_ptr();
        let view = view_3x4(&mut storage);
        let rev = view.slice(&[range(None, None, Some(-1))]).unwrap();
        assert_eq!(rev.shape(), &[3, 4]);
        assert_eq!(rev.strides(), &[-32, 8]);
        assert_eq!(rev.data_ptr(), base.wrapping_offset(64));
    }

    #[test]
    fn test_out_of_range_bounds_rejected() {
        let mut storage = vec![0u8; 96];
        let view = view_3x4(&mut storage);
        for bad in [
            range(Some(3), Some(100), None),
            range(Some(4), None, None),
            range(Some(-10), None, None),
            range(None, Some(-5), None),
            range(Some(3), None, Some(-1)),
        ] {
            assert!(matches!(
                view.slice(&[bad]).unwrap_err(),
                MemviewError::InvalidSliceBounds { dim: 0 }
            ));
        }
        // The boundary itself is a valid (empty) slice.
        let empty = view.slice(&[range(Some(3), Some(3), None)]).unwrap();
        assert_eq!(empty.shape()[0], 0);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut storage = vec![0u8; 96];
        let view = view_3x4(&mut storage);
        assert!(matches!(
            view.slice(&[range(Some(2), Some(1), None)]).unwrap_err(),
            MemviewError::InvalidSliceBounds { dim: 0 }
        ));
        assert!(matches!(
            view.slice(&[range(Some(0), Some(2), Some(-1))]).unwrap_err(),
            MemviewError::InvalidSliceBounds { dim: 0 }
        ));
    }

    #[test]
    fn test_zero_step_rejected() {
        let mut storage = vec![0u8; 96];
        let view = view_3x4(&mut storage);
        assert!(matches!(
            view.slice(&[range(None, None, Some(0))]).unwrap_err(),
            MemviewError::InvalidSliceBounds { dim: 0 }
        ));
    }

    #[test]
    fn test_full_normalizes_direct_suboffset() {
        let mut storage = vec![0u8; 96];
        let desc = BufferDescriptor {
            data: storage.as_mut_ptr(),
            itemsize: 8,
            format: "d".to_owned(),
            shape: vec![3, 4],
            strides: Some(vec![32, 8]),
            // Any negative suboffset means direct; -1 is the canonical form.
            suboffsets: Some(vec![-7, -1]),
        };
        let buffer = unsafe { Buffer::from_descriptor(desc, Arc::new(NoHost)) };
        let mut view = MemorySlice::uninit();
        crate::validate::init_slice(&mut view, &buffer).unwrap();
        assert_eq!(view.suboffsets(), &[-7, -1]);
        let full = view.slice(&[IndexOp::Full, IndexOp::Full]).unwrap();
        assert_eq!(full.suboffsets(), &[-1, -1]);
    }

    #[test]
    fn test_too_many_ops() {
        let mut storage = vec![0u8; 96];
        let view = view_3x4(&mut storage);
        let err = view
            .slice(&[IndexOp::Full, IndexOp::Full, IndexOp::Full])
            .unwrap_err();
        assert!(matches!(err, MemviewError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_shared_buffer_acquisitions() {
        let mut storage = vec![0u8; 96];
        let view = view_3x4(&mut storage);
        let buffer = Arc::clone(view.buffer().unwrap());
        assert_eq!(buffer.acquisition_count(), 1);
        let sub = view.slice(&[IndexOp::Index(0)]).unwrap();
        assert_eq!(buffer.acquisition_count(), 2);
        drop(sub);
        assert_eq!(buffer.acquisition_count(), 1);
        drop(view);
        assert_eq!(buffer.acquisition_count(), 0);
    }
}
