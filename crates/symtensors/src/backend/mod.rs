//! Symmetry backends: tensor-level operations on symmetry-allowed blocks.
//!
//! A symmetry backend owns a [`BlockBackend`] and maps every tensor
//! operation onto block primitives, visiting only blocks the symmetry
//! allows.
//!
//! ```text
//! SymmetryBackend<T>          (trait, object safe)
//!   ├── NoSymmetryBackend<B>  one dense block per tensor
//!   ├── AbelianBackend<B>     sorted blocks keyed by sector indices
//!   └── NonabelianBackend     every operation returns NotImplemented
//!
//! BackendCache<T>             explicit cache keyed by
//!                             (SymmetryBackendKind, BlockBackendKind, options)
//! ```

mod abelian;
mod data;
mod factory;
mod no_symmetry;
mod nonabelian;

pub use self::abelian::AbelianBackend;
pub use self::data::{AbelianData, TensorData};
pub use self::factory::{create_backend, default_backend, BackendCache, BackendKey};
pub use self::no_symmetry::NoSymmetryBackend;
pub use self::nonabelian::NonabelianBackend;

use std::fmt::{self, Debug};
use std::ops::Range;
use std::str::FromStr;
use std::sync::Arc;

use crate::block::{Block, BlockBackend};
use crate::config::{SvdAlgorithm, Tolerance};
use crate::error::TensorError;
use crate::scalar::Scalar;
use crate::space::VectorSpace;
use crate::symmetry::Symmetry;

/// A symmetry backend shared between tensors.
pub type SharedBackend<T> = Arc<dyn SymmetryBackend<T>>;

/// Family of symmetry backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymmetryBackendKind {
    NoSymmetry,
    Abelian,
    Nonabelian,
}

impl SymmetryBackendKind {
    /// The kind suited to `symmetry`.
    pub fn select(symmetry: &Symmetry) -> Self {
        if symmetry.is_trivial() {
            SymmetryBackendKind::NoSymmetry
        } else if symmetry.is_abelian() {
            SymmetryBackendKind::Abelian
        } else {
            SymmetryBackendKind::Nonabelian
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SymmetryBackendKind::NoSymmetry => "no_symmetry",
            SymmetryBackendKind::Abelian => "abelian",
            SymmetryBackendKind::Nonabelian => "nonabelian",
        }
    }
}

impl FromStr for SymmetryBackendKind {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_symmetry" => Ok(SymmetryBackendKind::NoSymmetry),
            "abelian" => Ok(SymmetryBackendKind::Abelian),
            "nonabelian" => Ok(SymmetryBackendKind::Nonabelian),
            other => Err(TensorError::UnknownBackend {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for SymmetryBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a symmetric SVD of a two-leg tensor `[row, col]`.
///
/// `u` has legs `[row, new_leg]`, `s` has legs `[new_leg.dual(), new_leg]`
/// and `vh` has legs `[new_leg.dual(), col]`.
#[derive(Clone, Debug)]
pub struct SvdData<T: Scalar> {
    pub u: TensorData<T>,
    pub s: TensorData<T>,
    pub vh: TensorData<T>,
    pub new_leg: VectorSpace,
}

/// Result of a symmetric QR decomposition of a two-leg tensor `[row, col]`.
///
/// `q` has legs `[row, new_leg]` and `r` has legs `[new_leg.dual(), col]`.
#[derive(Clone, Debug)]
pub struct QrData<T: Scalar> {
    pub q: TensorData<T>,
    pub r: TensorData<T>,
    pub new_leg: VectorSpace,
}

/// Tensor-level operations for one family of symmetries.
///
/// Methods take the raw [`TensorData`] together with whatever leg
/// information they need; validation of labels and leg compatibility
/// happens in [`Tensor`](crate::Tensor) before a backend is called.
/// Passing data of another layout yields [`TensorError::DataMismatch`].
pub trait SymmetryBackend<T: Scalar>: Debug + Send + Sync {
    fn kind(&self) -> SymmetryBackendKind;

    fn block_backend(&self) -> &dyn BlockBackend<T>;

    /// Whether tensors with legs of `symmetry` can be stored.
    fn supports_symmetry(&self, symmetry: &Symmetry) -> bool;

    /// Verify that `data` matches `legs` and holds only allowed blocks.
    fn check_data(&self, data: &TensorData<T>, legs: &[VectorSpace]) -> Result<(), TensorError>;

    /// Data of a tensor without legs.
    fn scalar_data(&self, value: T) -> Result<TensorData<T>, TensorError>;

    fn zero_data(&self, legs: &[VectorSpace]) -> Result<TensorData<T>, TensorError>;

    /// Identity on `legs`; the tensor has legs `legs` followed by their duals.
    fn eye_data(&self, legs: &[VectorSpace]) -> Result<TensorData<T>, TensorError>;

    /// Project a dense block onto the allowed blocks.
    ///
    /// Fails with [`TensorError::SymmetryViolation`] if the discarded part
    /// exceeds `tol` relative to the norm of `block`.
    fn from_dense_block(
        &self,
        block: &Block<T>,
        legs: &[VectorSpace],
        tol: Tolerance,
    ) -> Result<TensorData<T>, TensorError>;

    fn to_dense_block(&self, data: &TensorData<T>, legs: &[VectorSpace]) -> Result<Block<T>, TensorError>;

    /// Fill every allowed block with `func(block_shape)`.
    fn from_block_func(
        &self,
        legs: &[VectorSpace],
        func: &mut dyn FnMut(&[usize]) -> Block<T>,
    ) -> Result<TensorData<T>, TensorError>;

    /// Contract `axs_a` of `a` with `axs_b` of `b`; open legs of `a` come first.
    fn tdot(
        &self,
        a: &TensorData<T>,
        b: &TensorData<T>,
        axs_a: &[usize],
        axs_b: &[usize],
    ) -> Result<TensorData<T>, TensorError>;

    /// Full contraction of two tensors with equal legs, axis `i` of `a`
    /// pairing with axis `axs2[i]` of `b`.
    fn inner(
        &self,
        a: &TensorData<T>,
        b: &TensorData<T>,
        do_conj: bool,
        axs2: Option<&[usize]>,
    ) -> Result<T, TensorError>;

    fn transpose(&self, data: &TensorData<T>, perm: &[usize]) -> Result<TensorData<T>, TensorError>;

    fn trace_full(&self, data: &TensorData<T>, idcs1: &[usize], idcs2: &[usize]) -> Result<T, TensorError>;

    fn trace_partial(
        &self,
        data: &TensorData<T>,
        idcs1: &[usize],
        idcs2: &[usize],
        remaining: &[usize],
    ) -> Result<TensorData<T>, TensorError>;

    /// Complex conjugate; the legs become their duals.
    fn conj(&self, data: &TensorData<T>) -> Result<TensorData<T>, TensorError>;

    /// Fuse each contiguous range of `legs` into the corresponding
    /// composite leg of `new_legs`.
    fn combine_legs(
        &self,
        data: &TensorData<T>,
        legs: &[VectorSpace],
        ranges: &[Range<usize>],
        new_legs: &[VectorSpace],
    ) -> Result<TensorData<T>, TensorError>;

    /// Replace each composite leg listed in `idcs` by its factors.
    fn split_legs(
        &self,
        data: &TensorData<T>,
        legs: &[VectorSpace],
        idcs: &[usize],
    ) -> Result<TensorData<T>, TensorError>;

    /// Drop trivial legs of dimension one.
    fn squeeze_legs(&self, data: &TensorData<T>, idcs: &[usize]) -> Result<TensorData<T>, TensorError>;

    /// `a_coef * a + b_coef * b`.
    fn linear_combination(
        &self,
        a_coef: T,
        a: &TensorData<T>,
        b_coef: T,
        b: &TensorData<T>,
    ) -> Result<TensorData<T>, TensorError>;

    fn scale(&self, data: &TensorData<T>, factor: T) -> Result<TensorData<T>, TensorError>;

    fn norm(&self, data: &TensorData<T>) -> Result<f64, TensorError>;

    fn max_abs(&self, data: &TensorData<T>) -> Result<f64, TensorError>;

    fn almost_equal(&self, a: &TensorData<T>, b: &TensorData<T>, tol: Tolerance) -> Result<bool, TensorError>;

    /// The single entry of a tensor whose legs all have dimension one.
    fn item(&self, data: &TensorData<T>) -> Result<T, TensorError>;

    fn svd(
        &self,
        data: &TensorData<T>,
        legs: &[VectorSpace],
        algorithm: SvdAlgorithm,
    ) -> Result<SvdData<T>, TensorError>;

    fn qr(&self, data: &TensorData<T>, legs: &[VectorSpace], full: bool) -> Result<QrData<T>, TensorError>;

    /// Matrix exponential of a tensor with legs `[leg, leg.dual()]`.
    fn exp(&self, data: &TensorData<T>, legs: &[VectorSpace]) -> Result<TensorData<T>, TensorError>;

    /// Matrix logarithm of a tensor with legs `[leg, leg.dual()]`.
    fn log(&self, data: &TensorData<T>, legs: &[VectorSpace]) -> Result<TensorData<T>, TensorError>;
}

fn data_mismatch<T: Scalar>(expected: &'static str, actual: &TensorData<T>) -> TensorError {
    TensorError::DataMismatch {
        expected,
        actual: actual.layout(),
    }
}

/// Dimension of each leg.
pub(crate) fn leg_dims(legs: &[VectorSpace]) -> Vec<usize> {
    legs.iter().map(VectorSpace::dim).collect()
}

fn matrix_legs(legs: &[VectorSpace]) -> Result<(&VectorSpace, &VectorSpace), TensorError> {
    match legs {
        [row, col] => Ok((row, col)),
        _ => Err(TensorError::leg_mismatch(format!(
            "matrix operation needs exactly two legs, got {}",
            legs.len()
        ))),
    }
}

/// Matrix functions need the second leg to be the dual of the first.
fn square_legs(legs: &[VectorSpace]) -> Result<&VectorSpace, TensorError> {
    let (row, col) = matrix_legs(legs)?;
    if !row.can_contract_with(col) {
        return Err(TensorError::IncompatibleLegs {
            left: row.to_string(),
            right: col.to_string(),
        });
    }
    Ok(row)
}
