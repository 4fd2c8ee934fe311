//! Loop-based block backend.
//!
//! Evaluates contractions entry by entry without any BLAS-style kernel.
//! Useful as a reference for the faer backend and for tiny blocks where
//! kernel dispatch dominates.

use super::plan::ContractionPlan;
use super::{Block, BlockBackend};
use crate::config::BlockBackendKind;
use crate::error::TensorError;
use crate::scalar::Scalar;
use crate::strides::{cartesian_to_linear, compute_strides, increment_index};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NaiveBlockBackend;

impl<T: Scalar> BlockBackend<T> for NaiveBlockBackend {
    fn kind(&self) -> BlockBackendKind {
        BlockBackendKind::Naive
    }

    fn block_tdot(
        &self,
        a: &Block<T>,
        b: &Block<T>,
        axes_a: &[usize],
        axes_b: &[usize],
    ) -> Result<Block<T>, TensorError> {
        let plan = ContractionPlan::compute(a.shape(), b.shape(), axes_a, axes_b)?;
        let strides_a = compute_strides(a.shape());
        let strides_b = compute_strides(b.shape());
        let contracted_dims: Vec<usize> = axes_a.iter().map(|&i| a.shape()[i]).collect();
        let n_open_a = plan.open_a.len();

        let mut idx_a = vec![0; a.ndim()];
        let mut idx_b = vec![0; b.ndim()];
        let mut contracted = vec![0; contracted_dims.len()];

        Ok(Block::from_fn(&plan.out_shape, |out| {
            for (k, &ax) in plan.open_a.iter().enumerate() {
                idx_a[ax] = out[k];
            }
            for (k, &ax) in plan.open_b.iter().enumerate() {
                idx_b[ax] = out[n_open_a + k];
            }
            let mut sum = T::zero();
            if plan.dmid == 0 {
                return sum;
            }
            contracted.iter_mut().for_each(|c| *c = 0);
            loop {
                for (k, &c) in contracted.iter().enumerate() {
                    idx_a[axes_a[k]] = c;
                    idx_b[axes_b[k]] = c;
                }
                sum += a.data()[cartesian_to_linear(&idx_a, &strides_a)]
                    * b.data()[cartesian_to_linear(&idx_b, &strides_b)];
                if !increment_index(&mut contracted, &contracted_dims) {
                    break;
                }
            }
            sum
        }))
    }

    fn block_transpose(&self, a: &Block<T>, perm: &[usize]) -> Result<Block<T>, TensorError> {
        a.permute(perm)
    }

    fn matrix_dot(&self, a: &Block<T>, b: &Block<T>) -> Result<Block<T>, TensorError> {
        let (m, k) = a.matrix_dims()?;
        let (k2, n) = b.matrix_dims()?;
        if k != k2 {
            return Err(TensorError::ShapeMismatch {
                expected: vec![k, n],
                actual: b.shape().to_vec(),
            });
        }
        Ok(Block::from_fn(&[m, n], |idx| {
            let (i, j) = (idx[0], idx[1]);
            let mut sum = T::zero();
            for l in 0..k {
                sum += a.data()[i + l * m] * b.data()[l + j * k];
            }
            sum
        }))
    }
}
