//! Symmetry backend for tensors without symmetry: one dense block each.

use std::ops::Range;

use super::{
    data_mismatch, leg_dims, matrix_legs, square_legs, QrData, SvdData, SymmetryBackend, SymmetryBackendKind,
    TensorData,
};
use crate::block::{Block, BlockBackend};
use crate::config::{SvdAlgorithm, Tolerance};
use crate::error::TensorError;
use crate::scalar::Scalar;
use crate::space::VectorSpace;
use crate::symmetry::Symmetry;

/// Delegates every operation to the block backend on the full array.
///
/// # Example
/// ```
/// use symtensors::{Block, FaerBlockBackend, NoSymmetryBackend, SymmetryBackend, TensorData};
///
/// let backend = NoSymmetryBackend::new(FaerBlockBackend::default());
/// let a = TensorData::NoSymmetry(Block::from_vec(vec![1.0, 2.0], &[2]).unwrap());
/// let b = TensorData::NoSymmetry(Block::from_vec(vec![3.0, 4.0], &[2]).unwrap());
/// assert_eq!(backend.inner(&a, &b, true, None).unwrap(), 11.0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct NoSymmetryBackend<B> {
    block_backend: B,
}

impl<B> NoSymmetryBackend<B> {
    pub fn new(block_backend: B) -> Self {
        Self { block_backend }
    }
}

fn dense<T: Scalar>(data: &TensorData<T>) -> Result<&Block<T>, TensorError> {
    match data {
        TensorData::NoSymmetry(block) => Ok(block),
        other => Err(data_mismatch("no_symmetry", other)),
    }
}

/// A leg of dimension `dim` carrying only the trivial sector of `symmetry`.
fn trivial_leg(symmetry: &Symmetry, dim: usize) -> Result<VectorSpace, TensorError> {
    if dim == 0 {
        return VectorSpace::new(symmetry.clone(), vec![], vec![], false);
    }
    VectorSpace::new(symmetry.clone(), vec![symmetry.trivial_sector()], vec![dim], false)
}

impl<T: Scalar, B: BlockBackend<T>> SymmetryBackend<T> for NoSymmetryBackend<B> {
    fn kind(&self) -> SymmetryBackendKind {
        SymmetryBackendKind::NoSymmetry
    }

    fn block_backend(&self) -> &dyn BlockBackend<T> {
        &self.block_backend
    }

    fn supports_symmetry(&self, symmetry: &Symmetry) -> bool {
        symmetry.is_trivial()
    }

    fn check_data(&self, data: &TensorData<T>, legs: &[VectorSpace]) -> Result<(), TensorError> {
        let block = dense(data)?;
        let dims = leg_dims(legs);
        if block.shape() != dims.as_slice() {
            return Err(TensorError::ShapeMismatch {
                expected: dims,
                actual: block.shape().to_vec(),
            });
        }
        Ok(())
    }

    fn scalar_data(&self, value: T) -> Result<TensorData<T>, TensorError> {
        Ok(TensorData::NoSymmetry(Block::scalar(value)))
    }

    fn zero_data(&self, legs: &[VectorSpace]) -> Result<TensorData<T>, TensorError> {
        Ok(TensorData::NoSymmetry(self.block_backend.zero_block(&leg_dims(legs))))
    }

    fn eye_data(&self, legs: &[VectorSpace]) -> Result<TensorData<T>, TensorError> {
        Ok(TensorData::NoSymmetry(self.block_backend.eye_block(&leg_dims(legs))?))
    }

    fn from_dense_block(
        &self,
        block: &Block<T>,
        legs: &[VectorSpace],
        _tol: Tolerance,
    ) -> Result<TensorData<T>, TensorError> {
        let data = TensorData::NoSymmetry(block.clone());
        self.check_data(&data, legs)?;
        Ok(data)
    }

    fn to_dense_block(&self, data: &TensorData<T>, _legs: &[VectorSpace]) -> Result<Block<T>, TensorError> {
        dense(data).cloned()
    }

    fn from_block_func(
        &self,
        legs: &[VectorSpace],
        func: &mut dyn FnMut(&[usize]) -> Block<T>,
    ) -> Result<TensorData<T>, TensorError> {
        let data = TensorData::NoSymmetry(func(&leg_dims(legs)));
        self.check_data(&data, legs)?;
        Ok(data)
    }

    fn tdot(
        &self,
        a: &TensorData<T>,
        b: &TensorData<T>,
        axs_a: &[usize],
        axs_b: &[usize],
    ) -> Result<TensorData<T>, TensorError> {
        let block = self.block_backend.block_tdot(dense(a)?, dense(b)?, axs_a, axs_b)?;
        Ok(TensorData::NoSymmetry(block))
    }

    fn inner(
        &self,
        a: &TensorData<T>,
        b: &TensorData<T>,
        do_conj: bool,
        axs2: Option<&[usize]>,
    ) -> Result<T, TensorError> {
        self.block_backend.block_inner(dense(a)?, dense(b)?, do_conj, axs2)
    }

    fn transpose(&self, data: &TensorData<T>, perm: &[usize]) -> Result<TensorData<T>, TensorError> {
        Ok(TensorData::NoSymmetry(self.block_backend.block_transpose(dense(data)?, perm)?))
    }

    fn trace_full(&self, data: &TensorData<T>, idcs1: &[usize], idcs2: &[usize]) -> Result<T, TensorError> {
        self.block_backend.block_trace_full(dense(data)?, idcs1, idcs2)
    }

    fn trace_partial(
        &self,
        data: &TensorData<T>,
        idcs1: &[usize],
        idcs2: &[usize],
        remaining: &[usize],
    ) -> Result<TensorData<T>, TensorError> {
        let block = self
            .block_backend
            .block_trace_partial(dense(data)?, idcs1, idcs2, remaining)?;
        Ok(TensorData::NoSymmetry(block))
    }

    fn conj(&self, data: &TensorData<T>) -> Result<TensorData<T>, TensorError> {
        Ok(TensorData::NoSymmetry(self.block_backend.block_conj(dense(data)?)))
    }

    fn combine_legs(
        &self,
        data: &TensorData<T>,
        _legs: &[VectorSpace],
        _ranges: &[Range<usize>],
        new_legs: &[VectorSpace],
    ) -> Result<TensorData<T>, TensorError> {
        // the fusion table of trivial legs is a column-major reshape
        let block = self.block_backend.block_reshape(dense(data)?, &leg_dims(new_legs))?;
        Ok(TensorData::NoSymmetry(block))
    }

    fn split_legs(
        &self,
        data: &TensorData<T>,
        legs: &[VectorSpace],
        idcs: &[usize],
    ) -> Result<TensorData<T>, TensorError> {
        let mut shape = Vec::with_capacity(legs.len());
        for (i, leg) in legs.iter().enumerate() {
            match leg.factors() {
                Some(factors) if idcs.contains(&i) => shape.extend(factors.iter().map(VectorSpace::dim)),
                None if idcs.contains(&i) => return Err(TensorError::NotAProductSpace { index: i }),
                _ => shape.push(leg.dim()),
            }
        }
        let block = self.block_backend.block_reshape(dense(data)?, &shape)?;
        Ok(TensorData::NoSymmetry(block))
    }

    fn squeeze_legs(&self, data: &TensorData<T>, idcs: &[usize]) -> Result<TensorData<T>, TensorError> {
        Ok(TensorData::NoSymmetry(self.block_backend.block_squeeze_legs(dense(data)?, idcs)?))
    }

    fn linear_combination(
        &self,
        a_coef: T,
        a: &TensorData<T>,
        b_coef: T,
        b: &TensorData<T>,
    ) -> Result<TensorData<T>, TensorError> {
        let mut out = dense(a)?.scale(a_coef);
        out.add_scaled(b_coef, dense(b)?)?;
        Ok(TensorData::NoSymmetry(out))
    }

    fn scale(&self, data: &TensorData<T>, factor: T) -> Result<TensorData<T>, TensorError> {
        Ok(TensorData::NoSymmetry(dense(data)?.scale(factor)))
    }

    fn norm(&self, data: &TensorData<T>) -> Result<f64, TensorError> {
        Ok(self.block_backend.block_norm(dense(data)?))
    }

    fn max_abs(&self, data: &TensorData<T>) -> Result<f64, TensorError> {
        Ok(self.block_backend.block_max_abs(dense(data)?))
    }

    fn almost_equal(&self, a: &TensorData<T>, b: &TensorData<T>, tol: Tolerance) -> Result<bool, TensorError> {
        Ok(self
            .block_backend
            .block_allclose(dense(a)?, dense(b)?, tol.rtol, tol.atol))
    }

    fn item(&self, data: &TensorData<T>) -> Result<T, TensorError> {
        self.block_backend.block_item(dense(data)?)
    }

    fn svd(
        &self,
        data: &TensorData<T>,
        legs: &[VectorSpace],
        algorithm: SvdAlgorithm,
    ) -> Result<SvdData<T>, TensorError> {
        let (row, _) = matrix_legs(legs)?;
        let svd = self.block_backend.matrix_svd(dense(data)?, algorithm)?;
        let k = svd.s.len();
        let s = Block::from_fn(&[k, k], |idx| {
            if idx[0] == idx[1] {
                T::from_f64(svd.s[idx[0]])
            } else {
                T::zero()
            }
        });
        Ok(SvdData {
            u: TensorData::NoSymmetry(svd.u),
            s: TensorData::NoSymmetry(s),
            vh: TensorData::NoSymmetry(svd.vh),
            new_leg: trivial_leg(row.symmetry(), k)?,
        })
    }

    fn qr(&self, data: &TensorData<T>, legs: &[VectorSpace], full: bool) -> Result<QrData<T>, TensorError> {
        let (row, _) = matrix_legs(legs)?;
        let (q, r) = self.block_backend.matrix_qr(dense(data)?, full)?;
        let k = q.shape()[1];
        Ok(QrData {
            q: TensorData::NoSymmetry(q),
            r: TensorData::NoSymmetry(r),
            new_leg: trivial_leg(row.symmetry(), k)?,
        })
    }

    fn exp(&self, data: &TensorData<T>, legs: &[VectorSpace]) -> Result<TensorData<T>, TensorError> {
        square_legs(legs)?;
        Ok(TensorData::NoSymmetry(self.block_backend.matrix_exp(dense(data)?)?))
    }

    fn log(&self, data: &TensorData<T>, legs: &[VectorSpace]) -> Result<TensorData<T>, TensorError> {
        square_legs(legs)?;
        Ok(TensorData::NoSymmetry(self.block_backend.matrix_log(dense(data)?)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{FaerBlockBackend, NaiveBlockBackend};
    use approx::assert_relative_eq;

    fn iota(shape: &[usize]) -> TensorData<f64> {
        let len: usize = shape.iter().product();
        TensorData::NoSymmetry(Block::from_vec((0..len).map(|x| x as f64).collect(), shape).unwrap())
    }

    #[test]
    fn test_combine_then_split_is_reshape() {
        let backend = NoSymmetryBackend::new(FaerBlockBackend::default());
        let legs = vec![VectorSpace::non_symmetric(2), VectorSpace::non_symmetric(3)];
        let product = VectorSpace::product(&legs, false).unwrap();
        let data = iota(&[2, 3]);
        let combined = backend.combine_legs(&data, &legs, &[0..2], &[product.clone()]).unwrap();
        assert_eq!(dense(&combined).unwrap().shape(), &[6]);
        let split = backend.split_legs(&combined, &[product], &[0]).unwrap();
        assert!(backend.almost_equal(&split, &data, Tolerance::default()).unwrap());
    }

    #[test]
    fn test_split_requires_product_leg() {
        let backend = NoSymmetryBackend::new(NaiveBlockBackend);
        let legs = vec![VectorSpace::non_symmetric(4)];
        assert!(matches!(
            backend.split_legs(&iota(&[4]), &legs, &[0]),
            Err(TensorError::NotAProductSpace { index: 0 })
        ));
    }

    #[test]
    fn test_svd_shapes() {
        let backend = NoSymmetryBackend::new(FaerBlockBackend::default());
        let legs = vec![VectorSpace::non_symmetric(4), VectorSpace::non_symmetric(2).dual()];
        let svd = backend.svd(&iota(&[4, 2]), &legs, SvdAlgorithm::Default).unwrap();
        assert_eq!(svd.new_leg.dim(), 2);
        assert_eq!(dense(&svd.u).unwrap().shape(), &[4, 2]);
        assert_eq!(dense(&svd.vh).unwrap().shape(), &[2, 2]);
        let us = backend.tdot(&svd.u, &svd.s, &[1], &[0]).unwrap();
        let usv = backend.tdot(&us, &svd.vh, &[1], &[0]).unwrap();
        for (x, y) in dense(&usv).unwrap().data().iter().zip(dense(&iota(&[4, 2])).unwrap().data()) {
            assert_relative_eq!(x, y, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_rejects_abelian_data() {
        let backend = NoSymmetryBackend::new(NaiveBlockBackend);
        let data = TensorData::<f64>::Abelian(Default::default());
        assert!(matches!(backend.norm(&data), Err(TensorError::DataMismatch { .. })));
    }
}
