//! Conservative memory-overlap detection between views.
//!
//! Each view is reduced to the bounding interval of addresses it can touch;
//! two views are reported as overlapping when those intervals intersect.
//! This never misses a true overlap but may report one for interleaved
//! disjoint views, which callers treat as "copy through a temporary".
//! Indirect dimensions are bounded by the pointer table itself, so the
//! intervals are only meaningful for direct views; callers resolve
//! indirection first.

use crate::slice::MemorySlice;

/// Lowest and one-past-highest byte address `slice` can reach through its
/// first `ndim` dimensions.
///
/// A zero extent in any dimension collapses the interval to an empty one at
/// the data pointer. Negative strides extend the interval downwards.
pub fn memory_extents(slice: &MemorySlice, ndim: usize, itemsize: usize) -> (usize, usize) {
    let mut start = slice.data_ptr() as usize;
    let mut end = start;
    for dim in 0..ndim {
        let extent = slice.shape[dim];
        if extent == 0 {
            return (start, start);
        }
        let span = slice.strides[dim] * (extent - 1);
        if span > 0 {
            end = end.wrapping_add_signed(span);
        } else {
            start = start.wrapping_add_signed(span);
        }
    }
    (start, end + itemsize)
}

/// Whether the bounding address intervals of two views intersect.
pub fn slices_overlap(a: &MemorySlice, b: &MemorySlice, ndim: usize, itemsize: usize) -> bool {
    let (start1, end1) = memory_extents(a, ndim, itemsize);
    let (start2, end2) = memory_extents(b, ndim, itemsize);
    start1 < end2 && start2 < end1
}

impl MemorySlice {
    /// Conservative check whether `self` and `other` can touch common bytes.
    pub fn overlaps(&self, other: &MemorySlice) -> bool {
        debug_assert_eq!(self.ndim, other.ndim);
        let Some(itemsize) = self.itemsize() else {
            return false;
        };
        debug_assert_eq!(other.itemsize(), Some(itemsize));
        slices_overlap(self, other, self.ndim, itemsize)
    }
}
