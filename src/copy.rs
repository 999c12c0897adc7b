//! Contiguous copies of arbitrary strided views.

use std::sync::Arc;

use crate::buffer::Buffer;
use crate::error::{MemviewError, Result};
use crate::host::NoHost;
use crate::order::MemoryOrder;
use crate::slice::{index_full, MemorySlice};
use crate::validate::init_slice;

impl MemorySlice {
    /// Copy this view into a freshly allocated buffer, contiguous in `order`.
    ///
    /// The returned view owns its storage (freed when the last handle to it
    /// is dropped) and carries no indirection regardless of the source's
    /// layout. On any allocation or validation failure nothing is leaked and
    /// no partially initialized descriptor escapes.
    pub fn copy_contiguous(&self, order: MemoryOrder) -> Result<MemorySlice> {
        let buffer = self.buffer().ok_or(MemviewError::NotInitialized)?;
        let itemsize = buffer.itemsize();
        let format = buffer.format().to_owned();

        let dst_buffer =
            Buffer::new_contiguous(self.shape(), itemsize, format, order, Arc::new(NoHost))?;

        // The allocation is contiguous by construction; no axis-spec gate is
        // needed (and zero-extent shapes would not pass one, since the
        // strides slower than an empty dimension collapse to zero).
        let mut dst = MemorySlice::uninit();
        init_slice(&mut dst, &dst_buffer)?;

        unsafe {
            copy_strided(
                self.data_ptr(),
                dst.data_ptr(),
                self.shape(),
                self.strides(),
                self.suboffsets(),
                dst.strides(),
                itemsize,
            );
        }
        Ok(dst)
    }
}

/// Element-wise strided copy, recursing over the leading dimension.
///
/// Caller guarantees both pointers address live buffers matching `shape`,
/// that `dst` carries no indirection, and that the regions do not overlap.
unsafe fn copy_strided(
    src: *mut u8,
    dst: *mut u8,
    shape: &[isize],
    src_strides: &[isize],
    src_suboffsets: &[isize],
    dst_strides: &[isize],
    itemsize: usize,
) {
    match shape.len() {
        0 => std::ptr::copy_nonoverlapping(src, dst, itemsize),
        1 => {
            let extent = shape[0] as usize;
            let sub = src_suboffsets[0];
            if sub < 0
                && src_strides[0] == itemsize as isize
                && dst_strides[0] == itemsize as isize
            {
                std::ptr::copy_nonoverlapping(src, dst, extent * itemsize);
            } else {
                for i in 0..extent as isize {
                    let s = index_full(src, i, src_strides[0], sub);
                    let d = dst.wrapping_offset(i * dst_strides[0]);
                    std::ptr::copy_nonoverlapping(s, d, itemsize);
                }
            }
        }
        _ => {
            for i in 0..shape[0] {
                let s = index_full(src, i, src_strides[0], src_suboffsets[0]);
                let d = dst.wrapping_offset(i * dst_strides[0]);
                copy_strided(
                    s,
                    d,
                    &shape[1..],
                    &src_strides[1..],
                    &src_suboffsets[1..],
                    &dst_strides[1..],
                    itemsize,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferDescriptor;
    use crate::slicer::{range, IndexOp};

    fn view_over(storage: &mut [i64], shape: Vec<isize>, strides: Vec<isize>) -> MemorySlice {
        let desc = BufferDescriptor {
            data: storage.as_mut_ptr() as *mut u8,
            itemsize: 8,
            format: "q".to_owned(),
            shape,
            strides: Some(strides),
            suboffsets: None,
        };
        let buffer = unsafe { Buffer::from_descriptor(desc, Arc::new(NoHost)) };
        let mut out = MemorySlice::uninit();
        crate::validate::init_slice(&mut out, &buffer).unwrap();
        out
    }

    fn read_i64(slice: &MemorySlice, indices: &[isize]) -> i64 {
        let p = slice.element_ptr(indices).unwrap();
        unsafe { (p as *const i64).read_unaligned() }
    }

    #[test]
    fn test_c_copy_of_c_view() {
        let mut storage: Vec<i64> = (0..12).collect();
        let v = view_over(&mut storage, vec![3, 4], vec![32, 8]);
        let c = v.copy_contiguous(MemoryOrder::C).unwrap();
        assert!(c.is_contiguous(MemoryOrder::C));
        assert_ne!(c.data_ptr(), v.data_ptr());
        for i in 0..3 {
            for j in 0..4 {
                assert_eq!(read_i64(&c, &[i, j]), (i * 4 + j) as i64);
            }
        }
    }

    #[test]
    fn test_fortran_copy_reorders_storage() {
        let mut storage: Vec<i64> = (0..12).collect();
        let v = view_over(&mut storage, vec![3, 4], vec![32, 8]);
        let f = v.copy_contiguous(MemoryOrder::Fortran).unwrap();
        assert!(f.is_contiguous(MemoryOrder::Fortran));
        assert_eq!(f.strides(), &[8, 24]);
        for i in 0..3 {
            for j in 0..4 {
                assert_eq!(read_i64(&f, &[i, j]), (i * 4 + j) as i64);
            }
        }
    }

    #[test]
    fn test_copy_of_reversed_view() {
        let mut storage: Vec<i64> = (0..8).collect();
        let v = view_over(&mut storage, vec![8], vec![8]);
        let rev = v.slice(&[range(None, None, Some(-1))]).unwrap();
        let c = rev.copy_contiguous(MemoryOrder::C).unwrap();
        for i in 0..8 {
            assert_eq!(read_i64(&c, &[i]), (7 - i) as i64);
        }
    }

    #[test]
    fn test_copy_of_strided_slice() {
        let mut storage: Vec<i64> = (0..12).collect();
        let v = view_over(&mut storage, vec![3, 4], vec![32, 8]);
        let s = v.slice(&[IndexOp::Full, range(Some(1), None, Some(2))]).unwrap();
        let c = s.copy_contiguous(MemoryOrder::C).unwrap();
        assert_eq!(c.shape(), &[3, 2]);
        for i in 0..3 {
            assert_eq!(read_i64(&c, &[i, 0]), (i * 4 + 1) as i64);
            assert_eq!(read_i64(&c, &[i, 1]), (i * 4 + 3) as i64);
        }
    }

    #[test]
    fn test_copy_outlives_source() {
        let mut storage: Vec<i64> = (0..4).collect();
        let v = view_over(&mut storage, vec![4], vec![8]);
        let c = v.copy_contiguous(MemoryOrder::C).unwrap();
        drop(v);
        drop(storage);
        for i in 0..4 {
            assert_eq!(read_i64(&c, &[i]), i as i64);
        }
    }

    #[test]
    fn test_copy_of_empty_view() {
        let mut storage: Vec<i64> = (0..12).collect();
        let v = view_over(&mut storage, vec![3, 0], vec![32, 8]);
        let c = v.copy_contiguous(MemoryOrder::C).unwrap();
        assert_eq!(c.shape(), &[3, 0]);
        assert!(c.is_empty());
        let f = v.copy_contiguous(MemoryOrder::Fortran).unwrap();
        assert_eq!(f.shape(), &[3, 0]);
    }

    #[test]
    fn test_copy_uninitialized_fails() {
        let v = MemorySlice::uninit();
        assert!(matches!(
            v.copy_contiguous(MemoryOrder::C).unwrap_err(),
            MemviewError::NotInitialized
        ));
    }
}
