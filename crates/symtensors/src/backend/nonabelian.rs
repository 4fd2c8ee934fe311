//! Placeholder backend for nonabelian symmetries.
//!
//! Storing nonabelian tensors needs fusion trees and recoupling
//! coefficients on top of the block structure. Until those exist, every
//! operation of this backend fails with [`TensorError::NotImplemented`].

use std::ops::Range;

use super::{QrData, SvdData, SymmetryBackend, SymmetryBackendKind, TensorData};
use crate::block::{Block, BlockBackend};
use crate::config::{SvdAlgorithm, Tolerance};
use crate::error::TensorError;
use crate::scalar::Scalar;
use crate::space::VectorSpace;
use crate::symmetry::Symmetry;

#[derive(Clone, Debug, Default)]
pub struct NonabelianBackend<B> {
    block_backend: B,
}

impl<B> NonabelianBackend<B> {
    pub fn new(block_backend: B) -> Self {
        Self { block_backend }
    }
}

fn missing<R>(operation: &str) -> Result<R, TensorError> {
    Err(TensorError::not_implemented(format!(
        "{} for nonabelian symmetries",
        operation
    )))
}

impl<T: Scalar, B: BlockBackend<T>> SymmetryBackend<T> for NonabelianBackend<B> {
    fn kind(&self) -> SymmetryBackendKind {
        SymmetryBackendKind::Nonabelian
    }

    fn block_backend(&self) -> &dyn BlockBackend<T> {
        &self.block_backend
    }

    fn supports_symmetry(&self, _symmetry: &Symmetry) -> bool {
        true
    }

    fn check_data(&self, _data: &TensorData<T>, _legs: &[VectorSpace]) -> Result<(), TensorError> {
        missing("check_data")
    }

    fn scalar_data(&self, _value: T) -> Result<TensorData<T>, TensorError> {
        missing("scalar_data")
    }

    fn zero_data(&self, _legs: &[VectorSpace]) -> Result<TensorData<T>, TensorError> {
        missing("zero_data")
    }

    fn eye_data(&self, _legs: &[VectorSpace]) -> Result<TensorData<T>, TensorError> {
        missing("eye_data")
    }

    fn from_dense_block(
        &self,
        _block: &Block<T>,
        _legs: &[VectorSpace],
        _tol: Tolerance,
    ) -> Result<TensorData<T>, TensorError> {
        missing("from_dense_block")
    }

    fn to_dense_block(&self, _data: &TensorData<T>, _legs: &[VectorSpace]) -> Result<Block<T>, TensorError> {
        missing("to_dense_block")
    }

    fn from_block_func(
        &self,
        _legs: &[VectorSpace],
        _func: &mut dyn FnMut(&[usize]) -> Block<T>,
    ) -> Result<TensorData<T>, TensorError> {
        missing("from_block_func")
    }

    fn tdot(
        &self,
        _a: &TensorData<T>,
        _b: &TensorData<T>,
        _axs_a: &[usize],
        _axs_b: &[usize],
    ) -> Result<TensorData<T>, TensorError> {
        missing("tdot")
    }

    fn inner(
        &self,
        _a: &TensorData<T>,
        _b: &TensorData<T>,
        _do_conj: bool,
        _axs2: Option<&[usize]>,
    ) -> Result<T, TensorError> {
        missing("inner")
    }

    fn transpose(&self, _data: &TensorData<T>, _perm: &[usize]) -> Result<TensorData<T>, TensorError> {
        missing("transpose")
    }

    fn trace_full(&self, _data: &TensorData<T>, _idcs1: &[usize], _idcs2: &[usize]) -> Result<T, TensorError> {
        missing("trace_full")
    }

    fn trace_partial(
        &self,
        _data: &TensorData<T>,
        _idcs1: &[usize],
        _idcs2: &[usize],
        _remaining: &[usize],
    ) -> Result<TensorData<T>, TensorError> {
        missing("trace_partial")
    }

    fn conj(&self, _data: &TensorData<T>) -> Result<TensorData<T>, TensorError> {
        missing("conj")
    }

    fn combine_legs(
        &self,
        _data: &TensorData<T>,
        _legs: &[VectorSpace],
        _ranges: &[Range<usize>],
        _new_legs: &[VectorSpace],
    ) -> Result<TensorData<T>, TensorError> {
        missing("combine_legs")
    }

    fn split_legs(
        &self,
        _data: &TensorData<T>,
        _legs: &[VectorSpace],
        _idcs: &[usize],
    ) -> Result<TensorData<T>, TensorError> {
        missing("split_legs")
    }

    fn squeeze_legs(&self, _data: &TensorData<T>, _idcs: &[usize]) -> Result<TensorData<T>, TensorError> {
        missing("squeeze_legs")
    }

    fn linear_combination(
        &self,
        _a_coef: T,
        _a: &TensorData<T>,
        _b_coef: T,
        _b: &TensorData<T>,
    ) -> Result<TensorData<T>, TensorError> {
        missing("linear_combination")
    }

    fn scale(&self, _data: &TensorData<T>, _factor: T) -> Result<TensorData<T>, TensorError> {
        missing("scale")
    }

    fn norm(&self, _data: &TensorData<T>) -> Result<f64, TensorError> {
        missing("norm")
    }

    fn max_abs(&self, _data: &TensorData<T>) -> Result<f64, TensorError> {
        missing("max_abs")
    }

    fn almost_equal(&self, _a: &TensorData<T>, _b: &TensorData<T>, _tol: Tolerance) -> Result<bool, TensorError> {
        missing("almost_equal")
    }

    fn item(&self, _data: &TensorData<T>) -> Result<T, TensorError> {
        missing("item")
    }

    fn svd(
        &self,
        _data: &TensorData<T>,
        _legs: &[VectorSpace],
        _algorithm: SvdAlgorithm,
    ) -> Result<SvdData<T>, TensorError> {
        missing("svd")
    }

    fn qr(&self, _data: &TensorData<T>, _legs: &[VectorSpace], _full: bool) -> Result<QrData<T>, TensorError> {
        missing("qr")
    }

    fn exp(&self, _data: &TensorData<T>, _legs: &[VectorSpace]) -> Result<TensorData<T>, TensorError> {
        missing("exp")
    }

    fn log(&self, _data: &TensorData<T>, _legs: &[VectorSpace]) -> Result<TensorData<T>, TensorError> {
        missing("log")
    }
}
