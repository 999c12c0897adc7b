//! Contiguity queries on initialized views.

use crate::order::MemoryOrder;
use crate::slice::MemorySlice;

impl MemorySlice {
    /// Whether the view is contiguous in the given memory order.
    ///
    /// Walks the dimensions fastest-varying first (last dimension for
    /// [`MemoryOrder::C`], first for [`MemoryOrder::Fortran`]) and requires
    /// every stride to equal the accumulated element count times the
    /// itemsize. Any indirect dimension disqualifies the view. Uninitialized
    /// views report `false`; zero-dimensional views are trivially contiguous.
    pub fn is_contiguous(&self, order: MemoryOrder) -> bool {
        let Some(itemsize) = self.itemsize() else {
            return false;
        };
        let mut expected = itemsize as isize;
        for dim in order.walk(self.ndim) {
            if self.suboffsets[dim] >= 0 || self.strides[dim] != expected {
                return false;
            }
            expected *= self.shape[dim];
        }
        true
    }
}
