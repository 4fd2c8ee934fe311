//! Block backend using faer's GEMM kernels.
//!
//! Contractions are reduced to a single matrix product by permuting the
//! operands (see [`ContractionPlan`]) and handing column-major views to
//! `faer::linalg::matmul::matmul`.

use std::borrow::Cow;

use faer::linalg::matmul::matmul;
use faer::{Accum, Par};

use super::plan::ContractionPlan;
use super::{Block, BlockBackend};
use crate::config::{BlockBackendKind, BlockBackendOptions};
use crate::error::TensorError;
use crate::scalar::Scalar;

/// Block backend delegating products to faer.
///
/// # Example
/// ```
/// use symtensors::{Block, BlockBackend, FaerBlockBackend};
///
/// let backend = FaerBlockBackend::default();
/// let a = Block::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
/// let b = Block::<f64>::identity(2);
/// let c = backend.block_tdot(&a, &b, &[1], &[0]).unwrap();
/// assert_eq!(c.data(), a.data());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FaerBlockBackend {
    options: BlockBackendOptions,
}

impl FaerBlockBackend {
    pub fn new(options: BlockBackendOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> BlockBackendOptions {
        self.options
    }

    fn gemm<T: Scalar>(&self, a: &Block<T>, b: &Block<T>, m: usize, k: usize, n: usize) -> Block<T> {
        let mut c = Block::zeros(&[m, n]);
        if m > 0 && n > 0 {
            matmul(
                c.as_mat_mut(m, n),
                Accum::Replace,
                a.as_mat(m, k),
                b.as_mat(k, n),
                T::one(),
                self.par(),
            );
        }
        c
    }

    fn par(&self) -> Par {
        self.options.parallelism()
    }
}

impl<T: Scalar> BlockBackend<T> for FaerBlockBackend {
    fn kind(&self) -> BlockBackendKind {
        BlockBackendKind::Faer
    }

    fn options(&self) -> BlockBackendOptions {
        self.options
    }

    fn block_tdot(
        &self,
        a: &Block<T>,
        b: &Block<T>,
        axes_a: &[usize],
        axes_b: &[usize],
    ) -> Result<Block<T>, TensorError> {
        let plan = ContractionPlan::compute(a.shape(), b.shape(), axes_a, axes_b)?;
        let a_work: Cow<'_, Block<T>> = if plan.permute_a {
            Cow::Owned(a.permute(&plan.perm_a)?)
        } else {
            Cow::Borrowed(a)
        };
        let b_work: Cow<'_, Block<T>> = if plan.permute_b {
            Cow::Owned(b.permute(&plan.perm_b)?)
        } else {
            Cow::Borrowed(b)
        };
        let c = self.gemm(&a_work, &b_work, plan.dleft, plan.dmid, plan.dright);
        c.into_reshaped(&plan.out_shape)
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
        Ok(self.gemm(a, b, m, k, n))
    }
}
