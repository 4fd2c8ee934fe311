//! Labelled tensors on top of a symmetry backend.
//!
//! A [`Tensor`] bundles the backend data with its legs and one optional
//! label per leg. Every operation validates labels and leg compatibility
//! before any backend work, then delegates to the [`SymmetryBackend`].
//! Operations return new tensors; only relabelling and the in-place
//! arithmetic methods mutate.

mod decomposition;
mod legs;
mod ops;

pub use self::decomposition::TensorSvd;
pub use self::legs::{IntoLabels, LegRef, Unlabelled};

use std::fmt;

use rand::Rng;

use self::legs::{check_unique, resolve_leg};
use crate::backend::{SharedBackend, SymmetryBackend, TensorData};
use crate::block::Block;
use crate::config::Tolerance;
use crate::error::TensorError;
use crate::scalar::{Dtype, Scalar};
use crate::space::VectorSpace;
use crate::symmetry::Symmetry;

/// A tensor with symmetric legs and optional leg labels.
///
/// Tensors cannot be compared with `==`, since it is unclear whether that
/// should compare entries or identity. Use [`Tensor::almost_equal`]:
///
/// ```compile_fail
/// use symtensors::{default_backend, Symmetry, Tensor, VectorSpace};
///
/// let backend = default_backend::<f64>(&Symmetry::NoSymmetry).unwrap();
/// let a = Tensor::zero(&backend, vec![VectorSpace::non_symmetric(2)], ["a"]).unwrap();
/// let b = a.clone();
/// assert!(a == b);
/// ```
///
/// # Example
/// ```
/// use symtensors::{default_backend, Block, Symmetry, Tensor, Tolerance, VectorSpace};
///
/// let backend = default_backend::<f64>(&Symmetry::NoSymmetry).unwrap();
/// let leg = VectorSpace::non_symmetric(2);
/// let block = Block::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
/// let legs = vec![leg.clone(), leg.dual()];
/// let t = Tensor::from_dense_block(&backend, &block, legs, ["a", "a*"], Tolerance::default()).unwrap();
/// let tr = t.trace(&["a"], &["a*"]).unwrap();
/// assert_eq!(tr.item().unwrap(), 5.0);
/// ```
#[derive(Clone, Debug)]
pub struct Tensor<T: Scalar> {
    data: TensorData<T>,
    legs: Vec<VectorSpace>,
    labels: Vec<Option<String>>,
    symmetry: Symmetry,
    backend: SharedBackend<T>,
}

/// Legs together with their labels, as returned by [`Tensor::shape`].
#[derive(Clone, Copy, Debug)]
pub struct Shape<'a> {
    pub legs: &'a [VectorSpace],
    pub labels: &'a [Option<String>],
}

impl Shape<'_> {
    pub fn dims(&self) -> Vec<usize> {
        self.legs.iter().map(VectorSpace::dim).collect()
    }
}

impl fmt::Display for Shape<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, (leg, label)) in self.legs.iter().zip(self.labels).enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", label.as_deref().unwrap_or("?"), leg.dim())?;
        }
        f.write_str(")")
    }
}

fn common_symmetry(legs: &[VectorSpace]) -> Result<Symmetry, TensorError> {
    let Some(first) = legs.first() else {
        return Ok(Symmetry::NoSymmetry);
    };
    for leg in legs {
        if leg.symmetry() != first.symmetry() {
            return Err(TensorError::SymmetryMismatch {
                expected: first.symmetry().to_string(),
                actual: leg.symmetry().to_string(),
            });
        }
    }
    Ok(first.symmetry().clone())
}

impl<T: Scalar> Tensor<T> {
    /// Wrap backend data, validating labels, legs and data.
    ///
    /// # Errors
    ///
    /// Fails on a wrong number of labels, repeated labels, legs of different
    /// symmetries, a symmetry the backend cannot store, or data that does not
    /// match the legs.
    pub fn new(
        backend: &SharedBackend<T>,
        data: TensorData<T>,
        legs: Vec<VectorSpace>,
        labels: impl IntoLabels,
    ) -> Result<Self, TensorError> {
        let symmetry = common_symmetry(&legs)?;
        let labels = labels.into_labels(legs.len())?;
        let tensor = Self::from_parts(backend.clone(), data, legs, labels, symmetry)?;
        tensor.backend.check_data(&tensor.data, &tensor.legs)?;
        Ok(tensor)
    }

    /// Assemble a tensor from data a backend produced for `legs`.
    ///
    /// Checks labels and symmetry support but trusts the data layout.
    pub(crate) fn from_parts(
        backend: SharedBackend<T>,
        data: TensorData<T>,
        legs: Vec<VectorSpace>,
        labels: Vec<Option<String>>,
        symmetry: Symmetry,
    ) -> Result<Self, TensorError> {
        if labels.len() != legs.len() {
            return Err(TensorError::LabelCountMismatch {
                legs: legs.len(),
                labels: labels.len(),
            });
        }
        check_unique(&labels)?;
        if !backend.supports_symmetry(&symmetry) {
            return Err(TensorError::NotSupported {
                what: format!("{} backend for symmetry {}", backend.kind(), symmetry),
            });
        }
        Ok(Self {
            data,
            legs,
            labels,
            symmetry,
            backend,
        })
    }

    /// Same backend and symmetry as `self`, new content.
    pub(crate) fn derived(
        &self,
        data: TensorData<T>,
        legs: Vec<VectorSpace>,
        labels: Vec<Option<String>>,
    ) -> Result<Self, TensorError> {
        Self::from_parts(self.backend.clone(), data, legs, labels, self.symmetry.clone())
    }

    /// Project a dense block onto the symmetry-allowed blocks of `legs`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::SymmetryViolation`] if the block has more than
    /// `tol` weight in forbidden blocks.
    pub fn from_dense_block(
        backend: &SharedBackend<T>,
        block: &Block<T>,
        legs: Vec<VectorSpace>,
        labels: impl IntoLabels,
        tol: Tolerance,
    ) -> Result<Self, TensorError> {
        let symmetry = common_symmetry(&legs)?;
        let labels = labels.into_labels(legs.len())?;
        let data = backend.from_dense_block(block, &legs, tol)?;
        Self::from_parts(backend.clone(), data, legs, labels, symmetry)
    }

    pub fn zero(backend: &SharedBackend<T>, legs: Vec<VectorSpace>, labels: impl IntoLabels) -> Result<Self, TensorError> {
        let symmetry = common_symmetry(&legs)?;
        let labels = labels.into_labels(legs.len())?;
        let data = backend.zero_data(&legs)?;
        Self::from_parts(backend.clone(), data, legs, labels, symmetry)
    }

    /// Identity on `legs`. The tensor has the legs `legs` followed by their
    /// duals, so `labels` names `2 * legs.len()` legs.
    pub fn eye(backend: &SharedBackend<T>, legs: Vec<VectorSpace>, labels: impl IntoLabels) -> Result<Self, TensorError> {
        let symmetry = common_symmetry(&legs)?;
        let data = backend.eye_data(&legs)?;
        let all_legs: Vec<VectorSpace> = legs.iter().cloned().chain(legs.iter().map(VectorSpace::dual)).collect();
        let labels = labels.into_labels(all_legs.len())?;
        Self::from_parts(backend.clone(), data, all_legs, labels, symmetry)
    }

    /// Fill every allowed block with `func(block_shape)`.
    pub fn from_block_func<F>(
        backend: &SharedBackend<T>,
        legs: Vec<VectorSpace>,
        labels: impl IntoLabels,
        mut func: F,
    ) -> Result<Self, TensorError>
    where
        F: FnMut(&[usize]) -> Block<T>,
    {
        let symmetry = common_symmetry(&legs)?;
        let labels = labels.into_labels(legs.len())?;
        let data = backend.from_block_func(&legs, &mut func)?;
        Self::from_parts(backend.clone(), data, legs, labels, symmetry)
    }

    /// Entries uniform in `[-1, 1)` in every allowed block.
    pub fn random_uniform<R: Rng>(
        backend: &SharedBackend<T>,
        legs: Vec<VectorSpace>,
        labels: impl IntoLabels,
        rng: &mut R,
    ) -> Result<Self, TensorError> {
        let block_backend = backend.block_backend();
        Self::from_block_func(backend, legs, labels, |shape| {
            block_backend.block_random_uniform(shape, &mut *rng)
        })
    }

    /// Normally distributed entries with standard deviation `sigma`.
    pub fn random_normal<R: Rng>(
        backend: &SharedBackend<T>,
        legs: Vec<VectorSpace>,
        labels: impl IntoLabels,
        sigma: f64,
        rng: &mut R,
    ) -> Result<Self, TensorError> {
        let block_backend = backend.block_backend();
        Self::from_block_func(backend, legs, labels, |shape| {
            block_backend.block_random_normal(shape, sigma, &mut *rng)
        })
    }

    // queries

    pub fn data(&self) -> &TensorData<T> {
        &self.data
    }

    pub fn legs(&self) -> &[VectorSpace] {
        &self.legs
    }

    #[inline]
    pub fn num_legs(&self) -> usize {
        self.legs.len()
    }

    pub fn dims(&self) -> Vec<usize> {
        self.legs.iter().map(VectorSpace::dim).collect()
    }

    /// Number of entries of the dense tensor.
    pub fn size(&self) -> usize {
        self.legs.iter().map(VectorSpace::dim).product()
    }

    pub fn dtype(&self) -> Dtype {
        T::DTYPE
    }

    pub fn symmetry(&self) -> &Symmetry {
        &self.symmetry
    }

    pub fn backend(&self) -> &SharedBackend<T> {
        &self.backend
    }

    pub fn shape(&self) -> Shape<'_> {
        Shape {
            legs: &self.legs,
            labels: &self.labels,
        }
    }

    /// Whether the tensor holds exactly one entry.
    pub fn is_scalar(&self) -> bool {
        self.size() == 1
    }

    /// Re-validate labels, legs and data.
    pub fn check_invariants(&self) -> Result<(), TensorError> {
        if self.labels.len() != self.legs.len() {
            return Err(TensorError::LabelCountMismatch {
                legs: self.legs.len(),
                labels: self.labels.len(),
            });
        }
        check_unique(&self.labels)?;
        if let Some(leg) = self.legs.iter().find(|leg| leg.symmetry() != &self.symmetry) {
            return Err(TensorError::SymmetryMismatch {
                expected: self.symmetry.to_string(),
                actual: leg.symmetry().to_string(),
            });
        }
        self.backend.check_data(&self.data, &self.legs)
    }

    // labels

    pub fn labels(&self) -> &[Option<String>] {
        &self.labels
    }

    pub fn set_labels(&mut self, labels: impl IntoLabels) -> Result<(), TensorError> {
        let labels = labels.into_labels(self.legs.len())?;
        check_unique(&labels)?;
        self.labels = labels;
        Ok(())
    }

    /// Rename legs; each pair is `(old, new)`.
    pub fn relabel(&mut self, mapping: &[(&str, &str)]) -> Result<(), TensorError> {
        let mut labels = self.labels.clone();
        for &(old, new) in mapping {
            let idx = resolve_leg(&self.labels, LegRef::Label(old))?;
            labels[idx] = Some(new.to_string());
        }
        check_unique(&labels)?;
        self.labels = labels;
        Ok(())
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.as_deref() == Some(label))
    }

    /// Whether the labels are exactly `labels`, in any order.
    pub fn labels_are(&self, labels: &[&str]) -> bool {
        labels.len() == self.labels.len()
            && self.is_fully_labelled()
            && labels.iter().all(|&l| self.has_label(l))
    }

    pub fn is_fully_labelled(&self) -> bool {
        self.labels.iter().all(Option::is_some)
    }

    /// Position of a leg given by axis or label.
    pub fn get_leg_idx<'a>(&self, leg: impl Into<LegRef<'a>>) -> Result<usize, TensorError> {
        resolve_leg(&self.labels, leg.into())
    }

    pub fn get_leg_idcs<'a, L>(&self, legs: &[L]) -> Result<Vec<usize>, TensorError>
    where
        L: Into<LegRef<'a>> + Copy,
    {
        legs.iter().map(|&leg| self.get_leg_idx(leg)).collect()
    }

    pub fn get_legs<'a, L>(&self, legs: &[L]) -> Result<Vec<&VectorSpace>, TensorError>
    where
        L: Into<LegRef<'a>> + Copy,
    {
        Ok(self.get_leg_idcs(legs)?.into_iter().map(|i| &self.legs[i]).collect())
    }
}
