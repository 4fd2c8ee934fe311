//! Linear operators acting on tensors, for iterative eigensolvers.
//!
//! An operator maps vectors (tensors of a fixed [`Shape`]) to vectors of
//! the same shape. Wrappers ([`SumOperator`], [`ShiftedOperator`],
//! [`ProjectedOperator`]) own the operator they modify and expose it
//! through [`LinearOperator::inner_operator`]; [`unwrapped`] follows that
//! chain down to the innermost operator.

use std::fmt::Debug;

use crate::error::TensorError;
use crate::scalar::{Dtype, Scalar};
use crate::tensor::{LegRef, Shape, Tensor};

/// Maximum number of wrappers [`unwrapped`] looks through.
pub const MAX_UNWRAP_DEPTH: usize = 10_000;

/// Default relative cutoff of [`gram_schmidt`] in [`ProjectedOperator::new`].
pub const DEFAULT_RCOND: f64 = 1e-14;

/// A linear map on tensors of shape [`LinearOperator::vector_shape`].
pub trait LinearOperator<T: Scalar>: Debug {
    fn matvec(&self, vec: &Tensor<T>) -> Result<Tensor<T>, TensorError>;

    /// The Hermitian adjoint.
    fn adjoint(&self) -> Result<Box<dyn LinearOperator<T>>, TensorError> {
        Err(TensorError::AdjointUndefined {
            operator: std::any::type_name::<Self>().to_string(),
        })
    }

    /// Legs and labels of the vectors this operator acts on.
    fn vector_shape(&self) -> Shape<'_>;

    fn dtype(&self) -> Dtype {
        T::DTYPE
    }

    /// The operator this one wraps, if any.
    fn inner_operator(&self) -> Option<&dyn LinearOperator<T>> {
        None
    }
}

/// The innermost operator below a stack of wrappers.
///
/// # Errors
///
/// Returns [`TensorError::UnwrapDepthExceeded`] after
/// [`MAX_UNWRAP_DEPTH`] steps.
pub fn unwrapped<'a, T: Scalar>(op: &'a dyn LinearOperator<T>) -> Result<&'a dyn LinearOperator<T>, TensorError> {
    let mut current = op;
    for _ in 0..MAX_UNWRAP_DEPTH {
        match current.inner_operator() {
            Some(inner) => current = inner,
            None => return Ok(current),
        }
    }
    Err(TensorError::UnwrapDepthExceeded {
        depth: MAX_UNWRAP_DEPTH,
    })
}

fn check_vector_legs<T: Scalar>(shape: Shape<'_>, vec: &Tensor<T>) -> Result<(), TensorError> {
    if shape.legs != vec.legs() {
        return Err(TensorError::leg_mismatch(format!(
            "vector of shape {} does not match operator shape {}",
            vec.shape(),
            shape
        )));
    }
    Ok(())
}

/// A two-leg tensor acting on one of its legs.
///
/// `matvec(v)` contracts leg `which_leg` of the tensor with the single leg
/// of `v`. Vectors have the other leg of the tensor.
#[derive(Clone, Debug)]
pub struct TensorLinearOperator<T: Scalar> {
    tensor: Tensor<T>,
    which_leg: usize,
    other_leg: usize,
}

impl<T: Scalar> TensorLinearOperator<T> {
    pub fn new<'a>(tensor: Tensor<T>, which_leg: impl Into<LegRef<'a>>) -> Result<Self, TensorError> {
        if tensor.num_legs() != 2 {
            return Err(TensorError::leg_mismatch(format!(
                "a linear operator needs a tensor with two legs, got {}",
                tensor.num_legs()
            )));
        }
        let which_leg = tensor.get_leg_idx(which_leg)?;
        let legs = tensor.legs();
        if !legs[which_leg].can_contract_with(&legs[1 - which_leg]) {
            return Err(TensorError::IncompatibleLegs {
                left: legs[which_leg].to_string(),
                right: legs[1 - which_leg].to_string(),
            });
        }
        Ok(Self {
            tensor,
            which_leg,
            other_leg: 1 - which_leg,
        })
    }

    pub fn tensor(&self) -> &Tensor<T> {
        &self.tensor
    }
}

impl<T: Scalar> LinearOperator<T> for TensorLinearOperator<T> {
    fn matvec(&self, vec: &Tensor<T>) -> Result<Tensor<T>, TensorError> {
        check_vector_legs(self.vector_shape(), vec)?;
        self.tensor.tdot_idcs(vec, &[self.which_leg], &[0])
    }

    fn adjoint(&self) -> Result<Box<dyn LinearOperator<T>>, TensorError> {
        Ok(Box::new(TensorLinearOperator::new(self.tensor.conj()?, self.other_leg)?))
    }

    fn vector_shape(&self) -> Shape<'_> {
        let range = self.other_leg..self.other_leg + 1;
        Shape {
            legs: &self.tensor.legs()[range.clone()],
            labels: &self.tensor.labels()[range],
        }
    }
}

/// The sum of several operators on the same vector shape.
#[derive(Debug)]
pub struct SumOperator<T: Scalar> {
    operators: Vec<Box<dyn LinearOperator<T>>>,
}

impl<T: Scalar> SumOperator<T> {
    pub fn new(operators: Vec<Box<dyn LinearOperator<T>>>) -> Result<Self, TensorError> {
        let Some(first) = operators.first() else {
            return Err(TensorError::leg_mismatch("a sum needs at least one operator"));
        };
        let legs = first.vector_shape().legs;
        if operators.iter().any(|op| op.vector_shape().legs != legs) {
            return Err(TensorError::leg_mismatch("summed operators act on different vector shapes"));
        }
        Ok(Self { operators })
    }
}

impl<T: Scalar> LinearOperator<T> for SumOperator<T> {
    fn matvec(&self, vec: &Tensor<T>) -> Result<Tensor<T>, TensorError> {
        let (first, rest) = self
            .operators
            .split_first()
            .ok_or_else(|| TensorError::leg_mismatch("a sum needs at least one operator"))?;
        let mut acc = first.matvec(vec)?;
        for op in rest {
            acc.add_assign(&op.matvec(vec)?)?;
        }
        Ok(acc)
    }

    fn adjoint(&self) -> Result<Box<dyn LinearOperator<T>>, TensorError> {
        let adjoints = self
            .operators
            .iter()
            .map(|op| op.adjoint())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Box::new(SumOperator::new(adjoints)?))
    }

    fn vector_shape(&self) -> Shape<'_> {
        self.operators[0].vector_shape()
    }

    fn dtype(&self) -> Dtype {
        self.operators
            .iter()
            .map(|op| op.dtype())
            .fold(T::DTYPE, Dtype::common)
    }

    fn inner_operator(&self) -> Option<&dyn LinearOperator<T>> {
        self.operators.first().map(|op| op.as_ref())
    }
}

/// `original + shift * identity`.
#[derive(Debug)]
pub struct ShiftedOperator<T: Scalar> {
    original: Box<dyn LinearOperator<T>>,
    shift: T,
}

impl<T: Scalar> ShiftedOperator<T> {
    pub fn new(original: Box<dyn LinearOperator<T>>, shift: T) -> Self {
        if shift == T::zero() {
            tracing::warn!("zero shift, the shifted operator equals the original");
        }
        Self { original, shift }
    }

    pub fn shift(&self) -> T {
        self.shift
    }
}

impl<T: Scalar> LinearOperator<T> for ShiftedOperator<T> {
    fn matvec(&self, vec: &Tensor<T>) -> Result<Tensor<T>, TensorError> {
        self.original
            .matvec(vec)?
            .linear_combination(T::one(), vec, self.shift)
    }

    fn adjoint(&self) -> Result<Box<dyn LinearOperator<T>>, TensorError> {
        Ok(Box::new(ShiftedOperator::new(
            self.original.adjoint()?,
            self.shift.conjugate(),
        )))
    }

    fn vector_shape(&self) -> Shape<'_> {
        self.original.vector_shape()
    }

    fn dtype(&self) -> Dtype {
        self.original.dtype()
    }

    fn inner_operator(&self) -> Option<&dyn LinearOperator<T>> {
        Some(self.original.as_ref())
    }
}

/// `P H P + penalty * (1 - P)` with `P = 1 - sum_o |o><o|`.
///
/// The span of the excluded vectors becomes an eigenspace with eigenvalue
/// `penalty` (zero if none is given), while the action on its orthogonal
/// complement is that of `H`.
#[derive(Debug)]
pub struct ProjectedOperator<T: Scalar> {
    original: Box<dyn LinearOperator<T>>,
    ortho_vecs: Vec<Tensor<T>>,
    penalty: Option<T>,
}

impl<T: Scalar> ProjectedOperator<T> {
    /// The vectors need not be orthonormal; they are orthonormalized with
    /// [`gram_schmidt`] first.
    pub fn new(
        original: Box<dyn LinearOperator<T>>,
        ortho_vecs: Vec<Tensor<T>>,
        penalty: Option<T>,
    ) -> Result<Self, TensorError> {
        if ortho_vecs.is_empty() {
            tracing::warn!("no vectors to project out, the projected operator equals the original");
        }
        for vec in &ortho_vecs {
            check_vector_legs(original.vector_shape(), vec)?;
        }
        let ortho_vecs = gram_schmidt(&ortho_vecs, DEFAULT_RCOND)?;
        Ok(Self {
            original,
            ortho_vecs,
            penalty,
        })
    }

    /// The orthonormalized excluded vectors.
    pub fn ortho_vecs(&self) -> &[Tensor<T>] {
        &self.ortho_vecs
    }
}

impl<T: Scalar> LinearOperator<T> for ProjectedOperator<T> {
    fn matvec(&self, vec: &Tensor<T>) -> Result<Tensor<T>, TensorError> {
        // P v, keeping the overlaps for the penalty term
        let mut res = vec.clone();
        let mut overlaps = Vec::with_capacity(self.ortho_vecs.len());
        for o in &self.ortho_vecs {
            let c = o.inner(&res)?;
            res = res.linear_combination(T::one(), o, -c)?;
            overlaps.push(c);
        }
        let mut res = self.original.matvec(&res)?;
        // P H P v; the basis is orthonormal, so the order of this pass does
        // not change the result
        for o in self.ortho_vecs.iter().rev() {
            let c = o.inner(&res)?;
            res = res.linear_combination(T::one(), o, -c)?;
        }
        if let Some(penalty) = self.penalty {
            for (o, &c) in self.ortho_vecs.iter().zip(&overlaps) {
                res = res.linear_combination(T::one(), o, penalty * c)?;
            }
        }
        Ok(res)
    }

    fn adjoint(&self) -> Result<Box<dyn LinearOperator<T>>, TensorError> {
        // |o><o| is Hermitian, so the basis carries over unchanged
        Ok(Box::new(ProjectedOperator {
            original: self.original.adjoint()?,
            ortho_vecs: self.ortho_vecs.clone(),
            penalty: self.penalty.map(Scalar::conjugate),
        }))
    }

    fn vector_shape(&self) -> Shape<'_> {
        self.original.vector_shape()
    }

    fn dtype(&self) -> Dtype {
        self.original.dtype()
    }

    fn inner_operator(&self) -> Option<&dyn LinearOperator<T>> {
        Some(self.original.as_ref())
    }
}

/// Orthonormalize `vecs` with modified Gram-Schmidt.
///
/// A vector whose remainder after projection has norm below `rcond` times
/// its original norm is linearly dependent on the previous ones and is
/// dropped.
pub fn gram_schmidt<T: Scalar>(vecs: &[Tensor<T>], rcond: f64) -> Result<Vec<Tensor<T>>, TensorError> {
    let mut basis: Vec<Tensor<T>> = Vec::with_capacity(vecs.len());
    for (i, vec) in vecs.iter().enumerate() {
        let original_norm = vec.norm()?;
        let mut w = vec.clone();
        for q in &basis {
            let c = q.inner(&w)?;
            w = w.linear_combination(T::one(), q, -c)?;
        }
        let norm = w.norm()?;
        if norm <= rcond * original_norm || norm == 0.0 {
            tracing::warn!(index = i, norm, "dropping linearly dependent vector");
            continue;
        }
        basis.push(w.div_scalar(T::from_f64(norm))?);
    }
    Ok(basis)
}
