//! The block backend interface.
//!
//! A block backend provides the dense-array primitives the symmetry
//! backends are built from. Only contraction, transposition and matrix
//! products are backend specific; every other primitive has a default
//! implementation in terms of [`Block`] and the shared [`linalg`] kernels.

use rand::RngCore;
use std::fmt::Debug;

use super::linalg;
use super::Block;
use crate::config::{BlockBackendKind, BlockBackendOptions, SvdAlgorithm};
use crate::error::TensorError;
use crate::random::{sample_normal, sample_uniform};
use crate::scalar::{Dtype, Scalar};
use crate::strides::{complement_axes, inverse_permutation, validate_permutation};

/// Thin SVD of a matrix: `a = u * diag(s) * vh`, `s` sorted descending.
#[derive(Clone, Debug)]
pub struct MatrixSvd<T: Scalar> {
    pub u: Block<T>,
    pub s: Vec<f64>,
    pub vh: Block<T>,
}

/// What [`BlockBackend::block_matrixify`] did, so that
/// [`BlockBackend::block_dematrixify`] can undo it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatrixifyAux {
    /// Axis order used to build the matrix.
    pub perm: Vec<usize>,
    /// Shape after permutation.
    pub permuted_shape: Vec<usize>,
    /// Number of leading permuted axes forming the rows.
    pub num_row_axes: usize,
}

/// Dense-array primitives on [`Block`]s.
///
/// Implementations are stateless apart from construction options and have
/// no side effects beyond their return values.
pub trait BlockBackend<T: Scalar>: Debug + Send + Sync {
    fn kind(&self) -> BlockBackendKind;

    /// Construction options, part of the backend cache key.
    fn options(&self) -> BlockBackendOptions {
        BlockBackendOptions::default()
    }

    /// Short name used in logs.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Contract `axes_a` of `a` with `axes_b` of `b`.
    ///
    /// The result carries the open axes of `a` followed by those of `b`.
    fn block_tdot(
        &self,
        a: &Block<T>,
        b: &Block<T>,
        axes_a: &[usize],
        axes_b: &[usize],
    ) -> Result<Block<T>, TensorError>;

    /// Axis `i` of the result is axis `perm[i]` of `a`.
    fn block_transpose(&self, a: &Block<T>, perm: &[usize]) -> Result<Block<T>, TensorError>;

    /// Product of two 2-D blocks.
    fn matrix_dot(&self, a: &Block<T>, b: &Block<T>) -> Result<Block<T>, TensorError>;

    fn block_dtype(&self) -> Dtype {
        T::DTYPE
    }

    fn block_outer(&self, a: &Block<T>, b: &Block<T>) -> Result<Block<T>, TensorError> {
        self.block_tdot(a, b, &[], &[])
    }

    /// Full contraction of `a` with `b`, conjugating `a` if `do_conj`.
    ///
    /// When `axs2` is given, axis `i` of `a` pairs with axis `axs2[i]` of `b`.
    fn block_inner(
        &self,
        a: &Block<T>,
        b: &Block<T>,
        do_conj: bool,
        axs2: Option<&[usize]>,
    ) -> Result<T, TensorError> {
        let b = match axs2 {
            Some(perm) => self.block_transpose(b, perm)?,
            None => b.clone(),
        };
        if a.shape() != b.shape() {
            return Err(TensorError::ShapeMismatch {
                expected: a.shape().to_vec(),
                actual: b.shape().to_vec(),
            });
        }
        let mut acc = T::zero();
        for (&x, &y) in a.data().iter().zip(b.data()) {
            acc += if do_conj { x.conjugate() * y } else { x * y };
        }
        Ok(acc)
    }

    fn block_reshape(&self, a: &Block<T>, shape: &[usize]) -> Result<Block<T>, TensorError> {
        a.reshape(shape)
    }

    /// Trace over all axes, pairing `idcs1[i]` with `idcs2[i]`.
    fn block_trace_full(
        &self,
        a: &Block<T>,
        idcs1: &[usize],
        idcs2: &[usize],
    ) -> Result<T, TensorError> {
        let (matrix, _) = self.block_matrixify(a, idcs1, idcs2)?;
        let (rows, cols) = matrix.matrix_dims()?;
        if rows != cols {
            return Err(TensorError::NotSquareMatrix { rows, cols });
        }
        let mut acc = T::zero();
        for i in 0..rows {
            acc += matrix.data()[i + i * rows];
        }
        Ok(acc)
    }

    /// Trace over the pairs `(idcs1[i], idcs2[i])`, keeping `remaining` in order.
    fn block_trace_partial(
        &self,
        a: &Block<T>,
        idcs1: &[usize],
        idcs2: &[usize],
        remaining: &[usize],
    ) -> Result<Block<T>, TensorError> {
        let perm: Vec<usize> = remaining.iter().chain(idcs1).chain(idcs2).copied().collect();
        let permuted = self.block_transpose(a, &perm)?;
        let rem_shape: Vec<usize> = remaining.iter().map(|&i| a.shape()[i]).collect();
        let rows: usize = idcs1.iter().map(|&i| a.shape()[i]).product();
        let cols: usize = idcs2.iter().map(|&i| a.shape()[i]).product();
        if rows != cols {
            return Err(TensorError::NotSquareMatrix { rows, cols });
        }
        let outer: usize = rem_shape.iter().product();
        let data = permuted.data();
        let traced: Vec<T> = (0..outer)
            .map(|r| {
                let mut acc = T::zero();
                for i in 0..rows {
                    acc += data[r + outer * (i + rows * i)];
                }
                acc
            })
            .collect();
        Block::from_vec(traced, &rem_shape)
    }

    fn block_conj(&self, a: &Block<T>) -> Block<T> {
        a.conj()
    }

    /// Entrywise `|a - b| <= atol + rtol * |b|`.
    fn block_allclose(&self, a: &Block<T>, b: &Block<T>, rtol: f64, atol: f64) -> bool {
        a.shape() == b.shape()
            && a
                .data()
                .iter()
                .zip(b.data())
                .all(|(&x, &y)| (x - y).magnitude() <= atol + rtol * y.magnitude())
    }

    /// Remove axes of dimension one.
    fn block_squeeze_legs(&self, a: &Block<T>, idcs: &[usize]) -> Result<Block<T>, TensorError> {
        if let Some(&bad) = idcs.iter().find(|&&i| a.shape().get(i) != Some(&1)) {
            return Err(TensorError::ShapeMismatch {
                expected: vec![1],
                actual: a.shape().get(bad).map(|&d| vec![d]).unwrap_or_default(),
            });
        }
        let shape: Vec<usize> = complement_axes(idcs, a.ndim())
            .into_iter()
            .map(|i| a.shape()[i])
            .collect();
        a.reshape(&shape)
    }

    fn block_norm(&self, a: &Block<T>) -> f64 {
        a.norm()
    }

    fn block_max_abs(&self, a: &Block<T>) -> f64 {
        a.max_abs()
    }

    /// The single entry of a block of size one.
    fn block_item(&self, a: &Block<T>) -> Result<T, TensorError> {
        match a.data() {
            [x] => Ok(*x),
            other => Err(TensorError::NotScalar { size: other.len() }),
        }
    }

    /// Entries uniform in `[-1, 1)`, with an independent imaginary part for complex types.
    fn block_random_uniform(&self, shape: &[usize], rng: &mut dyn RngCore) -> Block<T> {
        Block::from_fn(shape, |_| sample_uniform(&mut *rng))
    }

    /// Normally distributed entries with standard deviation `sigma`.
    fn block_random_normal(&self, shape: &[usize], sigma: f64, rng: &mut dyn RngCore) -> Block<T> {
        Block::from_fn(shape, |_| sample_normal(&mut *rng, sigma))
    }

    fn zero_block(&self, shape: &[usize]) -> Block<T> {
        Block::zeros(shape)
    }

    /// Identity on `leg_dims`, with shape `leg_dims + leg_dims`.
    fn eye_block(&self, leg_dims: &[usize]) -> Result<Block<T>, TensorError> {
        let n = leg_dims.iter().product();
        let shape: Vec<usize> = leg_dims.iter().chain(leg_dims).copied().collect();
        Block::identity(n).into_reshaped(&shape)
    }

    /// Flatten `idcs1` into rows and `idcs2` into columns.
    fn block_matrixify(
        &self,
        a: &Block<T>,
        idcs1: &[usize],
        idcs2: &[usize],
    ) -> Result<(Block<T>, MatrixifyAux), TensorError> {
        let perm: Vec<usize> = idcs1.iter().chain(idcs2).copied().collect();
        validate_permutation(&perm, a.ndim())?;
        let permuted = self.block_transpose(a, &perm)?;
        let rows: usize = idcs1.iter().map(|&i| a.shape()[i]).product();
        let cols: usize = idcs2.iter().map(|&i| a.shape()[i]).product();
        let aux = MatrixifyAux {
            permuted_shape: permuted.shape().to_vec(),
            perm,
            num_row_axes: idcs1.len(),
        };
        Ok((permuted.into_reshaped(&[rows, cols])?, aux))
    }

    /// Restore the axes of a matrix with the shape produced by [`BlockBackend::block_matrixify`].
    fn block_dematrixify(&self, matrix: &Block<T>, aux: &MatrixifyAux) -> Result<Block<T>, TensorError> {
        let reshaped = matrix.reshape(&aux.permuted_shape)?;
        self.block_transpose(&reshaped, &inverse_permutation(&aux.perm))
    }

    /// Singular value decomposition with the chosen driver.
    ///
    /// `Robust` and `RobustSilent` retry with the Jacobi driver when the
    /// default driver fails; other errors propagate unchanged.
    fn matrix_svd(&self, a: &Block<T>, algorithm: SvdAlgorithm) -> Result<MatrixSvd<T>, TensorError> {
        match algorithm {
            SvdAlgorithm::Default => linalg::svd::svd_default(a),
            SvdAlgorithm::Fallback => linalg::svd::svd_jacobi(a),
            SvdAlgorithm::Robust | SvdAlgorithm::RobustSilent => {
                match linalg::svd::svd_default(a) {
                    Ok(svd) => Ok(svd),
                    Err(err) => {
                        if algorithm == SvdAlgorithm::Robust {
                            tracing::warn!(error = %err, "SVD driver failed, retrying with Jacobi SVD");
                        }
                        linalg::svd::svd_jacobi(a)
                    }
                }
            }
        }
    }

    /// QR decomposition; economy sized unless `full`.
    fn matrix_qr(&self, a: &Block<T>, full: bool) -> Result<(Block<T>, Block<T>), TensorError> {
        linalg::qr::qr(a, full)
    }

    fn matrix_exp(&self, a: &Block<T>) -> Result<Block<T>, TensorError> {
        linalg::exp::matrix_exp(self, a)
    }

    fn matrix_log(&self, a: &Block<T>) -> Result<Block<T>, TensorError> {
        linalg::log::matrix_log(self, a)
    }
}
