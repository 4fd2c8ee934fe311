//! Dense blocks and the block backends operating on them.
//!
//! ```text
//! Block<T>                  dense column-major array
//!   │
//!   ├── BlockBackend<T>     primitive operations on blocks (trait)
//!   │     ├── FaerBlockBackend   faer GEMM kernels
//!   │     └── NaiveBlockBackend  plain loops
//!   │
//!   └── linalg              matrix decompositions shared by both backends
//! ```

mod backend;
mod gemm;
mod index;
pub mod linalg;
mod naive;
mod plan;

pub use self::backend::{BlockBackend, MatrixSvd, MatrixifyAux};
pub use self::gemm::FaerBlockBackend;
pub use self::index::BlockIndex;
pub use self::naive::NaiveBlockBackend;

use faer::{MatMut, MatRef};
use std::ops::Range;

use crate::error::TensorError;
use crate::scalar::Scalar;
use crate::strides::{
    cartesian_to_linear, compute_strides, increment_index, validate_permutation,
};

/// A dense multi-dimensional array in column-major order.
///
/// A block with an empty shape holds exactly one element.
///
/// # Example
/// ```
/// use symtensors::Block;
///
/// let b = Block::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
/// assert_eq!(b.get(&[1, 0]), Some(&2.0));
/// assert_eq!(b.get(&[0, 1]), Some(&3.0));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Block<T: Scalar> {
    data: Vec<T>,
    shape: Vec<usize>,
}

impl<T: Scalar> Block<T> {
    pub fn zeros(shape: &[usize]) -> Self {
        let len = shape.iter().product();
        Self {
            data: vec![T::zero(); len],
            shape: shape.to_vec(),
        }
    }

    /// Wrap column-major `data` with the given shape.
    pub fn from_vec(data: Vec<T>, shape: &[usize]) -> Result<Self, TensorError> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(TensorError::DataLengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            shape: shape.to_vec(),
        })
    }

    /// Build a block by evaluating `f` at every multi-index.
    pub fn from_fn<F: FnMut(&[usize]) -> T>(shape: &[usize], mut f: F) -> Self {
        let len: usize = shape.iter().product();
        let mut data = Vec::with_capacity(len);
        if len > 0 {
            let mut index = vec![0; shape.len()];
            loop {
                data.push(f(&index));
                if !increment_index(&mut index, shape) {
                    break;
                }
            }
        }
        Self {
            data,
            shape: shape.to_vec(),
        }
    }

    /// A zero-dimensional block holding `value`.
    pub fn scalar(value: T) -> Self {
        Self {
            data: vec![value],
            shape: vec![],
        }
    }

    /// The `n × n` identity matrix.
    pub fn identity(n: usize) -> Self {
        Self::from_fn(&[n, n], |idx| if idx[0] == idx[1] { T::one() } else { T::zero() })
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn get(&self, index: &[usize]) -> Option<&T> {
        if index.len() != self.ndim() || index.iter().zip(&self.shape).any(|(&i, &d)| i >= d) {
            return None;
        }
        let strides = compute_strides(&self.shape);
        self.data.get(cartesian_to_linear(index, &strides))
    }

    pub fn get_mut(&mut self, index: &[usize]) -> Option<&mut T> {
        if index.len() != self.ndim() || index.iter().zip(&self.shape).any(|(&i, &d)| i >= d) {
            return None;
        }
        let strides = compute_strides(&self.shape);
        self.data.get_mut(cartesian_to_linear(index, &strides))
    }

    /// Reinterpret the data with a new shape of the same size.
    pub fn reshape(&self, shape: &[usize]) -> Result<Self, TensorError> {
        self.clone().into_reshaped(shape)
    }

    pub fn into_reshaped(mut self, shape: &[usize]) -> Result<Self, TensorError> {
        let expected: usize = shape.iter().product();
        if expected != self.len() {
            return Err(TensorError::DataLengthMismatch {
                expected,
                actual: self.len(),
            });
        }
        self.shape = shape.to_vec();
        Ok(self)
    }

    /// Permute axes: axis `i` of the result is axis `perm[i]` of `self`.
    pub fn permute(&self, perm: &[usize]) -> Result<Self, TensorError> {
        validate_permutation(perm, self.ndim())?;
        let new_shape: Vec<usize> = perm.iter().map(|&p| self.shape[p]).collect();
        let old_strides = compute_strides(&self.shape);
        // stride in the source for a unit step along each destination axis
        let src_strides: Vec<usize> = perm.iter().map(|&p| old_strides[p]).collect();
        let mut data = Vec::with_capacity(self.len());
        if !self.data.is_empty() {
            let mut index = vec![0; new_shape.len()];
            let mut offset = 0;
            'walk: loop {
                data.push(self.data[offset]);
                for ((i, &dim), &stride) in index.iter_mut().zip(&new_shape).zip(&src_strides) {
                    *i += 1;
                    if *i < dim {
                        offset += stride;
                        continue 'walk;
                    }
                    *i = 0;
                    offset -= (dim - 1) * stride;
                }
                break;
            }
        }
        Ok(Self {
            data,
            shape: new_shape,
        })
    }

    /// Copy out the sub-block selected by one range per axis.
    pub fn slice(&self, ranges: &[Range<usize>]) -> Result<Self, TensorError> {
        self.check_ranges(ranges)?;
        let new_shape: Vec<usize> = ranges.iter().map(|r| r.end - r.start).collect();
        let strides = compute_strides(&self.shape);
        let mut src = vec![0; self.ndim()];
        Ok(Self::from_fn(&new_shape, |idx| {
            for ((s, &i), r) in src.iter_mut().zip(idx).zip(ranges) {
                *s = r.start + i;
            }
            self.data[cartesian_to_linear(&src, &strides)]
        }))
    }

    /// Overwrite the region starting at `offsets` with the contents of `src`.
    pub fn assign_slice(&mut self, offsets: &[usize], src: &Block<T>) -> Result<(), TensorError> {
        let ranges: Vec<Range<usize>> = offsets
            .iter()
            .zip(src.shape())
            .map(|(&o, &d)| o..o + d)
            .collect();
        if offsets.len() != self.ndim() || src.ndim() != self.ndim() {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape.clone(),
                actual: src.shape.clone(),
            });
        }
        self.check_ranges(&ranges)?;
        if src.is_empty() {
            return Ok(());
        }
        let strides = compute_strides(&self.shape);
        let mut idx = vec![0; src.ndim()];
        let mut dst = vec![0; src.ndim()];
        for &value in &src.data {
            for ((d, &i), &o) in dst.iter_mut().zip(&idx).zip(offsets) {
                *d = o + i;
            }
            self.data[cartesian_to_linear(&dst, &strides)] = value;
            increment_index(&mut idx, &src.shape);
        }
        Ok(())
    }

    fn check_ranges(&self, ranges: &[Range<usize>]) -> Result<(), TensorError> {
        let in_bounds = ranges.len() == self.ndim()
            && ranges
                .iter()
                .zip(&self.shape)
                .all(|(r, &d)| r.start <= r.end && r.end <= d);
        if in_bounds {
            Ok(())
        } else {
            Err(TensorError::ShapeMismatch {
                expected: self.shape.clone(),
                actual: ranges.iter().map(|r| r.end).collect(),
            })
        }
    }

    pub fn map<F: FnMut(T) -> T>(&self, f: F) -> Self {
        Self {
            data: self.data.iter().copied().map(f).collect(),
            shape: self.shape.clone(),
        }
    }

    pub fn conj(&self) -> Self {
        if T::DTYPE.is_real() {
            return self.clone();
        }
        self.map(Scalar::conjugate)
    }

    pub fn scale(&self, factor: T) -> Self {
        self.map(|x| x * factor)
    }

    pub fn scale_inplace(&mut self, factor: T) {
        for x in &mut self.data {
            *x *= factor;
        }
    }

    /// `self += alpha * other`.
    pub fn add_scaled(&mut self, alpha: T, other: &Block<T>) -> Result<(), TensorError> {
        if self.shape != other.shape {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape.clone(),
                actual: other.shape.clone(),
            });
        }
        for (a, &b) in self.data.iter_mut().zip(&other.data) {
            *a += alpha * b;
        }
        Ok(())
    }

    pub fn norm_sqr(&self) -> f64 {
        self.data.iter().map(|x| x.abs_sqr()).sum()
    }

    /// Frobenius norm.
    pub fn norm(&self) -> f64 {
        self.norm_sqr().sqrt()
    }

    pub fn max_abs(&self) -> f64 {
        self.data.iter().map(|x| x.magnitude()).fold(0.0, f64::max)
    }

    /// Convert every entry to another scalar type.
    pub fn cast<U: Scalar>(&self) -> Block<U> {
        Block {
            data: self.data.iter().map(|&x| x.cast()).collect(),
            shape: self.shape.clone(),
        }
    }

    /// View a block holding `rows * cols` entries as a faer matrix.
    pub(crate) fn as_mat(&self, rows: usize, cols: usize) -> MatRef<'_, T> {
        debug_assert_eq!(rows * cols, self.len());
        MatRef::from_column_major_slice(&self.data, rows, cols)
    }

    pub(crate) fn as_mat_mut(&mut self, rows: usize, cols: usize) -> MatMut<'_, T> {
        debug_assert_eq!(rows * cols, self.len());
        MatMut::from_column_major_slice_mut(&mut self.data, rows, cols)
    }

    /// Copy a faer matrix into a 2-D block.
    pub(crate) fn from_mat(mat: MatRef<'_, T>) -> Self {
        let (rows, cols) = (mat.nrows(), mat.ncols());
        let mut data = Vec::with_capacity(rows * cols);
        for j in 0..cols {
            for i in 0..rows {
                data.push(mat[(i, j)]);
            }
        }
        Self {
            data,
            shape: vec![rows, cols],
        }
    }

    /// Number of rows and columns of a 2-D block.
    pub(crate) fn matrix_dims(&self) -> Result<(usize, usize), TensorError> {
        match self.shape.as_slice() {
            &[rows, cols] => Ok((rows, cols)),
            _ => Err(TensorError::ShapeMismatch {
                expected: vec![self.len(), 1],
                actual: self.shape.clone(),
            }),
        }
    }
}
