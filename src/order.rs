//! Memory order (C / Fortran) and contiguous stride computation.

use std::fmt;

use smallvec::{smallvec, SmallVec};

use crate::error::{MemviewError, Result};
use crate::MAX_DIMS;

/// Major order of a multi-dimensional layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOrder {
    /// Row-major: the last dimension varies fastest.
    C,
    /// Column-major: the first dimension varies fastest.
    Fortran,
}

impl MemoryOrder {
    /// Dimension indices, fastest-varying dimension first.
    pub(crate) fn walk(self, ndim: usize) -> impl Iterator<Item = usize> {
        let forward = matches!(self, MemoryOrder::Fortran);
        (0..ndim).map(move |i| if forward { i } else { ndim - 1 - i })
    }

    /// Byte strides of a contiguous layout with the given shape and itemsize.
    pub fn contiguous_strides(
        self,
        shape: &[isize],
        itemsize: usize,
    ) -> Result<SmallVec<[isize; MAX_DIMS]>> {
        for (dim, &extent) in shape.iter().enumerate() {
            if extent < 0 {
                return Err(MemviewError::NegativeExtent { dim, extent });
            }
        }
        let mut strides: SmallVec<[isize; MAX_DIMS]> = smallvec![0; shape.len()];
        let mut acc = itemsize as isize;
        for i in self.walk(shape.len()) {
            strides[i] = acc;
            acc = acc
                .checked_mul(shape[i])
                .ok_or(MemviewError::OffsetOverflow)?;
        }
        Ok(strides)
    }
}

impl fmt::Display for MemoryOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryOrder::C => f.write_str("C"),
            MemoryOrder::Fortran => f.write_str("Fortran"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_strides() {
        let strides = MemoryOrder::C.contiguous_strides(&[2, 3, 4], 8).unwrap();
        assert_eq!(strides.as_slice(), &[96, 32, 8]);
    }

    #[test]
    fn test_fortran_strides() {
        let strides = MemoryOrder::Fortran
            .contiguous_strides(&[2, 3, 4], 8)
            .unwrap();
        assert_eq!(strides.as_slice(), &[8, 16, 48]);
    }

    #[test]
    fn test_zero_dim_strides() {
        assert!(MemoryOrder::C.contiguous_strides(&[], 8).unwrap().is_empty());
    }

    #[test]
    fn test_negative_extent_rejected() {
        assert!(matches!(
            MemoryOrder::C.contiguous_strides(&[2, -1], 8),
            Err(MemviewError::NegativeExtent { dim: 1, extent: -1 })
        ));
    }

    #[test]
    fn test_walk_order() {
        let c: Vec<_> = MemoryOrder::C.walk(3).collect();
        let f: Vec<_> = MemoryOrder::Fortran.walk(3).collect();
        assert_eq!(c, vec![2, 1, 0]);
        assert_eq!(f, vec![0, 1, 2]);
    }
}
