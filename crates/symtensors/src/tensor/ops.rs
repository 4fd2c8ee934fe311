//! Tensor operations: contraction, leg manipulation and arithmetic.

use std::borrow::Cow;
use std::ops::{Div, Mul, Neg, Range};

use super::legs::{combined_label, conj_label, split_label};
use super::{LegRef, Tensor};
use crate::backend::{create_backend, SymmetryBackend, TensorData};
use crate::block::Block;
use crate::config::{CombineOptions, Tolerance};
use crate::error::TensorError;
use crate::scalar::{c64, Scalar};
use crate::space::VectorSpace;
use crate::strides::{complement_axes, is_identity_permutation, validate_permutation};

/// Fail if an axis appears twice.
fn check_distinct(idcs: &[usize]) -> Result<(), TensorError> {
    for (i, ax) in idcs.iter().enumerate() {
        if idcs[..i].contains(ax) {
            return Err(TensorError::leg_mismatch(format!("leg {} is used twice", ax)));
        }
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Unit {
    Single(usize),
    Group(usize),
}

impl<T: Scalar> Tensor<T> {
    fn check_compatible(&self, other: &Tensor<T>) -> Result<(), TensorError> {
        if self.symmetry != other.symmetry {
            return Err(TensorError::SymmetryMismatch {
                expected: self.symmetry.to_string(),
                actual: other.symmetry.to_string(),
            });
        }
        if self.backend.kind() != other.backend.kind() {
            return Err(TensorError::NotSupported {
                what: format!("mixing {} and {} backends", self.backend.kind(), other.backend.kind()),
            });
        }
        Ok(())
    }

    fn check_contractible(&self, idcs1: &[usize], other: &Tensor<T>, idcs2: &[usize]) -> Result<(), TensorError> {
        if idcs1.len() != idcs2.len() {
            return Err(TensorError::leg_mismatch(format!(
                "{} legs cannot be paired with {} legs",
                idcs1.len(),
                idcs2.len()
            )));
        }
        for (&i, &j) in idcs1.iter().zip(idcs2) {
            if !self.legs[i].can_contract_with(&other.legs[j]) {
                return Err(TensorError::IncompatibleLegs {
                    left: self.legs[i].to_string(),
                    right: other.legs[j].to_string(),
                });
            }
        }
        Ok(())
    }

    fn permuted_parts(&self, perm: &[usize]) -> Result<(TensorData<T>, Vec<VectorSpace>), TensorError> {
        let legs = perm.iter().map(|&i| self.legs[i].clone()).collect();
        if is_identity_permutation(perm) {
            return Ok((self.data.clone(), legs));
        }
        Ok((self.backend.transpose(&self.data, perm)?, legs))
    }

    /// Contract legs `legs1` of `self` with legs `legs2` of `other`.
    ///
    /// The open legs of `self` come first, followed by those of `other`.
    /// Each pair of contracted legs must be mutually dual.
    pub fn tdot<'a, 'b, L1, L2>(&self, other: &Tensor<T>, legs1: &[L1], legs2: &[L2]) -> Result<Tensor<T>, TensorError>
    where
        L1: Into<LegRef<'a>> + Copy,
        L2: Into<LegRef<'b>> + Copy,
    {
        let idcs1 = self.get_leg_idcs(legs1)?;
        let idcs2 = other.get_leg_idcs(legs2)?;
        self.tdot_idcs(other, &idcs1, &idcs2)
    }

    pub(crate) fn tdot_idcs(&self, other: &Tensor<T>, idcs1: &[usize], idcs2: &[usize]) -> Result<Tensor<T>, TensorError> {
        self.check_compatible(other)?;
        check_distinct(idcs1)?;
        check_distinct(idcs2)?;
        self.check_contractible(idcs1, other, idcs2)?;
        let data = self.backend.tdot(&self.data, &other.data, idcs1, idcs2)?;
        let open1 = complement_axes(idcs1, self.num_legs());
        let open2 = complement_axes(idcs2, other.num_legs());
        let legs = open1
            .iter()
            .map(|&i| self.legs[i].clone())
            .chain(open2.iter().map(|&i| other.legs[i].clone()))
            .collect();
        let labels = open1
            .iter()
            .map(|&i| self.labels[i].clone())
            .chain(open2.iter().map(|&i| other.labels[i].clone()))
            .collect();
        self.derived(data, legs, labels)
    }

    /// Tensor product; the legs of `self` come first.
    pub fn outer(&self, other: &Tensor<T>) -> Result<Tensor<T>, TensorError> {
        self.tdot_idcs(other, &[], &[])
    }

    /// `<self|other>`: conjugates `self` and contracts every leg.
    ///
    /// Legs are paired by label if both tensors are fully labelled, and by
    /// position otherwise. Paired legs must be equal.
    pub fn inner(&self, other: &Tensor<T>) -> Result<T, TensorError> {
        self.check_compatible(other)?;
        if self.num_legs() != other.num_legs() {
            return Err(TensorError::leg_mismatch(format!(
                "inner product of tensors with {} and {} legs",
                self.num_legs(),
                other.num_legs()
            )));
        }
        let axs2 = if self.is_fully_labelled() && other.is_fully_labelled() {
            let axs: Vec<usize> = self
                .labels
                .iter()
                .map(|l| other.get_leg_idx(l.as_deref()))
                .collect::<Result<_, _>>()?;
            (!is_identity_permutation(&axs)).then_some(axs)
        } else {
            None
        };
        for (i, leg) in self.legs.iter().enumerate() {
            let j = axs2.as_ref().map_or(i, |axs| axs[i]);
            if leg != &other.legs[j] {
                return Err(TensorError::leg_mismatch(format!("leg {} differs from leg {} of the other tensor", i, j)));
            }
        }
        self.backend.inner(&self.data, &other.data, true, axs2.as_deref())
    }

    /// Trace over pairs of mutually dual legs.
    ///
    /// Tracing every leg yields a tensor without legs; use
    /// [`Tensor::item`] to read its value.
    pub fn trace<'a, 'b, L1, L2>(&self, legs1: &[L1], legs2: &[L2]) -> Result<Tensor<T>, TensorError>
    where
        L1: Into<LegRef<'a>> + Copy,
        L2: Into<LegRef<'b>> + Copy,
    {
        let idcs1 = self.get_leg_idcs(legs1)?;
        let idcs2 = self.get_leg_idcs(legs2)?;
        let all: Vec<usize> = idcs1.iter().chain(&idcs2).copied().collect();
        check_distinct(&all)?;
        self.check_contractible(&idcs1, self, &idcs2)?;
        let remaining = complement_axes(&all, self.num_legs());
        let data = if remaining.is_empty() {
            let value = self.backend.trace_full(&self.data, &idcs1, &idcs2)?;
            self.backend.scalar_data(value)?
        } else {
            self.backend.trace_partial(&self.data, &idcs1, &idcs2, &remaining)?
        };
        let legs = remaining.iter().map(|&i| self.legs[i].clone()).collect();
        let labels = remaining.iter().map(|&i| self.labels[i].clone()).collect();
        self.derived(data, legs, labels)
    }

    /// Reorder the legs; `order` lists every leg once.
    pub fn transpose<'a, L>(&self, order: &[L]) -> Result<Tensor<T>, TensorError>
    where
        L: Into<LegRef<'a>> + Copy,
    {
        let perm = self.get_leg_idcs(order)?;
        self.transpose_idcs(&perm)
    }

    pub(crate) fn transpose_idcs(&self, perm: &[usize]) -> Result<Tensor<T>, TensorError> {
        validate_permutation(perm, self.num_legs())?;
        let (data, legs) = self.permuted_parts(perm)?;
        let labels = perm.iter().map(|&i| self.labels[i].clone()).collect();
        self.derived(data, legs, labels)
    }

    /// Complex conjugate. Legs become their duals and labels toggle a
    /// trailing `*`.
    pub fn conj(&self) -> Result<Tensor<T>, TensorError> {
        let data = self.backend.conj(&self.data)?;
        let legs = self.legs.iter().map(VectorSpace::dual).collect();
        let labels = self
            .labels
            .iter()
            .map(|l| l.as_deref().map(conj_label))
            .collect();
        self.derived(data, legs, labels)
    }

    /// Fuse each group of legs into one composite leg.
    ///
    /// A combined leg is labelled `(a.b)` if all its factors are labelled.
    /// By default it sits where the smallest axis of its group was; see
    /// [`CombineOptions`] for explicit positions and duality.
    pub fn combine_legs<'a, L>(&self, groups: &[&[L]], options: CombineOptions) -> Result<Tensor<T>, TensorError>
    where
        L: Into<LegRef<'a>> + Copy,
    {
        let groups = groups
            .iter()
            .map(|group| self.get_leg_idcs(group))
            .collect::<Result<Vec<_>, _>>()?;
        self.combine_idcs(&groups, &options)
    }

    pub(crate) fn combine_idcs(&self, groups: &[Vec<usize>], options: &CombineOptions) -> Result<Tensor<T>, TensorError> {
        let num_legs = self.num_legs();
        let mut owner = vec![None; num_legs];
        for (g, group) in groups.iter().enumerate() {
            if group.is_empty() {
                return Err(TensorError::leg_mismatch("cannot combine an empty group of legs"));
            }
            for &ax in group {
                if owner[ax].replace(g).is_some() {
                    return Err(TensorError::leg_mismatch(format!("leg {} is used twice", ax)));
                }
            }
        }

        let mut units: Vec<Unit> = (0..num_legs)
            .filter_map(|ax| match owner[ax] {
                None => Some(Unit::Single(ax)),
                Some(g) if groups[g].iter().min() == Some(&ax) => Some(Unit::Group(g)),
                Some(_) => None,
            })
            .collect();
        if let Some(new_axes) = &options.new_axes {
            units = place_groups(&units, new_axes, groups.len())?;
        }

        let duals = match &options.product_spaces_dual {
            Some(duals) if duals.len() != groups.len() => {
                return Err(TensorError::leg_mismatch(format!(
                    "{} duality flags for {} groups",
                    duals.len(),
                    groups.len()
                )))
            }
            Some(duals) => duals.clone(),
            None => groups.iter().map(|g| self.legs[g[0]].is_dual()).collect(),
        };

        let mut perm = Vec::with_capacity(num_legs);
        let mut ranges: Vec<Range<usize>> = Vec::with_capacity(groups.len());
        let mut new_legs = Vec::with_capacity(units.len());
        let mut new_labels = Vec::with_capacity(units.len());
        for unit in units {
            match unit {
                Unit::Single(ax) => {
                    perm.push(ax);
                    new_legs.push(self.legs[ax].clone());
                    new_labels.push(self.labels[ax].clone());
                }
                Unit::Group(g) => {
                    let start = perm.len();
                    perm.extend_from_slice(&groups[g]);
                    ranges.push(start..perm.len());
                    let factors: Vec<VectorSpace> = groups[g].iter().map(|&i| self.legs[i].clone()).collect();
                    new_legs.push(VectorSpace::product(&factors, duals[g])?);
                    let labels: Vec<Option<String>> = groups[g].iter().map(|&i| self.labels[i].clone()).collect();
                    new_labels.push(combined_label(&labels));
                }
            }
        }

        let (data, legs) = self.permuted_parts(&perm)?;
        let data = self.backend.combine_legs(&data, &legs, &ranges, &new_legs)?;
        self.derived(data, new_legs, new_labels)
    }

    /// Split one composite leg into its factors.
    pub fn split_leg<'a>(&self, leg: impl Into<LegRef<'a>>) -> Result<Tensor<T>, TensorError> {
        let idx = self.get_leg_idx(leg)?;
        self.split_idcs(vec![idx])
    }

    /// Split the given composite legs into their factors.
    ///
    /// Factor labels are recovered from labels of the form `(a.b)`.
    pub fn split_legs<'a, L>(&self, legs: &[L]) -> Result<Tensor<T>, TensorError>
    where
        L: Into<LegRef<'a>> + Copy,
    {
        let idcs = self.get_leg_idcs(legs)?;
        self.split_idcs(idcs)
    }

    /// Split every composite leg.
    pub fn split_all_legs(&self) -> Result<Tensor<T>, TensorError> {
        let idcs = (0..self.num_legs()).filter(|&i| self.legs[i].is_product()).collect();
        self.split_idcs(idcs)
    }

    pub(crate) fn split_idcs(&self, mut idcs: Vec<usize>) -> Result<Tensor<T>, TensorError> {
        idcs.sort_unstable();
        idcs.dedup();
        if idcs.is_empty() {
            return Ok(self.clone());
        }
        let mut legs = Vec::new();
        let mut labels = Vec::new();
        for (ax, leg) in self.legs.iter().enumerate() {
            if !idcs.contains(&ax) {
                legs.push(leg.clone());
                labels.push(self.labels[ax].clone());
                continue;
            }
            let factors = leg.factors().ok_or(TensorError::NotAProductSpace { index: ax })?;
            legs.extend_from_slice(factors);
            labels.extend(split_label(self.labels[ax].as_deref(), factors.len()));
        }
        let data = self.backend.split_legs(&self.data, &self.legs, &idcs)?;
        self.derived(data, legs, labels)
    }

    /// Remove legs that are one-dimensional and carry the trivial sector.
    pub fn squeeze_legs<'a, L>(&self, legs: &[L]) -> Result<Tensor<T>, TensorError>
    where
        L: Into<LegRef<'a>> + Copy,
    {
        let mut idcs = self.get_leg_idcs(legs)?;
        check_distinct(&idcs)?;
        idcs.sort_unstable();
        if let Some(&ax) = idcs.iter().find(|&&ax| !self.legs[ax].is_trivial()) {
            return Err(TensorError::leg_mismatch(format!(
                "leg {} ({}) is not trivial and cannot be squeezed",
                ax, self.legs[ax]
            )));
        }
        let data = self.backend.squeeze_legs(&self.data, &idcs)?;
        let keep = complement_axes(&idcs, self.num_legs());
        let legs = keep.iter().map(|&i| self.legs[i].clone()).collect();
        let labels = keep.iter().map(|&i| self.labels[i].clone()).collect();
        self.derived(data, legs, labels)
    }

    /// Bring `other` into the leg order of `self` for elementwise operations.
    ///
    /// Fully labelled operands must carry the same labels and are matched by
    /// label. Otherwise legs are matched by position and the result keeps
    /// labels only where both operands agree on all of them.
    fn aligned<'o>(&self, other: &'o Tensor<T>) -> Result<(Cow<'o, Tensor<T>>, Vec<Option<String>>), TensorError> {
        self.check_compatible(other)?;
        if self.num_legs() != other.num_legs() {
            return Err(TensorError::leg_mismatch(format!(
                "tensors with {} and {} legs",
                self.num_legs(),
                other.num_legs()
            )));
        }
        let (other, labels) = if self.is_fully_labelled() && other.is_fully_labelled() {
            if self.labels == other.labels {
                (Cow::Borrowed(other), self.labels.clone())
            } else {
                let perm = self
                    .labels
                    .iter()
                    .map(|l| other.get_leg_idx(l.as_deref()))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| {
                        TensorError::leg_mismatch(format!(
                            "labels {:?} and {:?} differ",
                            self.labels, other.labels
                        ))
                    })?;
                (Cow::Owned(other.transpose_idcs(&perm)?), self.labels.clone())
            }
        } else if self.labels == other.labels {
            (Cow::Borrowed(other), self.labels.clone())
        } else {
            (Cow::Borrowed(other), vec![None; self.num_legs()])
        };
        if self.legs != other.legs {
            return Err(TensorError::leg_mismatch("operands have different legs"));
        }
        Ok((other, labels))
    }

    /// `a * self + b * other`.
    pub fn linear_combination(&self, a: T, other: &Tensor<T>, b: T) -> Result<Tensor<T>, TensorError> {
        let (other, labels) = self.aligned(other)?;
        let data = self.backend.linear_combination(a, &self.data, b, &other.data)?;
        self.derived(data, self.legs.clone(), labels)
    }

    pub fn add(&self, other: &Tensor<T>) -> Result<Tensor<T>, TensorError> {
        self.linear_combination(T::one(), other, T::one())
    }

    pub fn sub(&self, other: &Tensor<T>) -> Result<Tensor<T>, TensorError> {
        self.linear_combination(T::one(), other, -T::one())
    }

    pub fn scale(&self, factor: T) -> Result<Tensor<T>, TensorError> {
        let data = self.backend.scale(&self.data, factor)?;
        self.derived(data, self.legs.clone(), self.labels.clone())
    }

    pub fn div_scalar(&self, divisor: T) -> Result<Tensor<T>, TensorError> {
        self.scale(T::one() / divisor)
    }

    pub fn scale_inplace(&mut self, factor: T) -> Result<(), TensorError> {
        self.data = self.backend.scale(&self.data, factor)?;
        Ok(())
    }

    /// `self += other`.
    pub fn add_assign(&mut self, other: &Tensor<T>) -> Result<(), TensorError> {
        let (other, labels) = self.aligned(other)?;
        self.data = self
            .backend
            .linear_combination(T::one(), &self.data, T::one(), &other.data)?;
        self.labels = labels;
        Ok(())
    }

    /// Frobenius norm.
    pub fn norm(&self) -> Result<f64, TensorError> {
        self.backend.norm(&self.data)
    }

    pub fn max_abs(&self) -> Result<f64, TensorError> {
        self.backend.max_abs(&self.data)
    }

    /// Entrywise comparison within `tol`, after matching legs as in [`Tensor::add`].
    pub fn almost_equal(&self, other: &Tensor<T>, tol: Tolerance) -> Result<bool, TensorError> {
        let (other, _) = self.aligned(other)?;
        self.backend.almost_equal(&self.data, &other.data, tol)
    }

    /// `==` is not defined for tensors.
    ///
    /// # Errors
    ///
    /// Always returns [`TensorError::ComparisonUndefined`].
    pub fn try_eq(&self, _other: &Tensor<T>) -> Result<bool, TensorError> {
        Err(TensorError::ComparisonUndefined)
    }

    /// The single entry of a tensor of size one.
    pub fn item(&self) -> Result<T, TensorError> {
        if !self.is_scalar() {
            return Err(TensorError::NotScalar { size: self.size() });
        }
        self.backend.item(&self.data)
    }

    /// The single entry as a real number, dropping an imaginary part.
    pub fn to_f64(&self) -> Result<f64, TensorError> {
        let value = self.item()?;
        if value.imag_part() != 0.0 {
            tracing::warn!(imag = value.imag_part(), "discarding imaginary part in conversion to f64");
        }
        Ok(value.real_part())
    }

    pub fn to_c64(&self) -> Result<c64, TensorError> {
        Ok(self.item()?.to_c64())
    }

    /// The tensor as one dense block over the full shape.
    pub fn to_dense_block(&self) -> Result<Block<T>, TensorError> {
        self.backend.to_dense_block(&self.data, &self.legs)
    }

    /// Convert to another element type on an equivalent backend.
    pub fn cast<U: Scalar>(&self) -> Result<Tensor<U>, TensorError> {
        let block_backend = self.backend.block_backend();
        let backend = create_backend::<U>(self.backend.kind(), block_backend.kind(), block_backend.options())?;
        if !T::DTYPE.is_real() && U::DTYPE.is_real() {
            let dropped = self
                .data
                .blocks()
                .iter()
                .flat_map(Block::data)
                .map(|x| x.imag_part().abs())
                .fold(0.0, f64::max);
            if dropped > 0.0 {
                tracing::warn!(max_imag = dropped, from = %T::DTYPE, to = %U::DTYPE, "discarding imaginary parts");
            }
        }
        Tensor::from_parts(
            backend,
            self.data.cast(),
            self.legs.clone(),
            self.labels.clone(),
            self.symmetry.clone(),
        )
    }
}

/// Put group `g` at position `new_axes[g]`; single legs fill the rest in order.
fn place_groups(units: &[Unit], new_axes: &[usize], num_groups: usize) -> Result<Vec<Unit>, TensorError> {
    if new_axes.len() != num_groups {
        return Err(TensorError::leg_mismatch(format!(
            "{} new axes for {} groups",
            new_axes.len(),
            num_groups
        )));
    }
    let mut slots: Vec<Option<Unit>> = vec![None; units.len()];
    for (g, &pos) in new_axes.iter().enumerate() {
        let slot = slots.get_mut(pos).ok_or(TensorError::AxisOutOfRange {
            index: pos as isize,
            num_legs: units.len(),
        })?;
        if slot.replace(Unit::Group(g)).is_some() {
            return Err(TensorError::leg_mismatch(format!("new axis {} is used twice", pos)));
        }
    }
    let mut singles = units.iter().filter(|u| matches!(u, Unit::Single(_)));
    for slot in slots.iter_mut().filter(|s| s.is_none()) {
        *slot = singles.next().copied();
    }
    slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| TensorError::leg_mismatch("could not place all legs"))
}

impl<T: Scalar> Neg for &Tensor<T> {
    type Output = Result<Tensor<T>, TensorError>;

    fn neg(self) -> Self::Output {
        self.scale(-T::one())
    }
}

impl<T: Scalar> Neg for Tensor<T> {
    type Output = Result<Tensor<T>, TensorError>;

    fn neg(self) -> Self::Output {
        -&self
    }
}

impl<T: Scalar> Mul<T> for &Tensor<T> {
    type Output = Result<Tensor<T>, TensorError>;

    fn mul(self, factor: T) -> Self::Output {
        self.scale(factor)
    }
}

impl<T: Scalar> Mul<T> for Tensor<T> {
    type Output = Result<Tensor<T>, TensorError>;

    fn mul(self, factor: T) -> Self::Output {
        self.scale(factor)
    }
}

impl<T: Scalar> Div<T> for &Tensor<T> {
    type Output = Result<Tensor<T>, TensorError>;

    fn div(self, divisor: T) -> Self::Output {
        self.div_scalar(divisor)
    }
}

impl<T: Scalar> Div<T> for Tensor<T> {
    type Output = Result<Tensor<T>, TensorError>;

    fn div(self, divisor: T) -> Self::Output {
        self.div_scalar(divisor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::default_backend;
    use crate::symmetry::Symmetry;
    use crate::tensor::Unlabelled;
    use approx::assert_relative_eq;

    fn iota(shape: &[usize], labels: [&str; 2]) -> Tensor<f64> {
        let backend = default_backend::<f64>(&Symmetry::NoSymmetry).unwrap();
        let len: usize = shape.iter().product();
        let block = Block::from_vec((0..len).map(|x| x as f64).collect(), shape).unwrap();
        let legs = shape.iter().map(|&d| VectorSpace::non_symmetric(d)).collect();
        Tensor::from_dense_block(&backend, &block, legs, labels, Tolerance::default()).unwrap()
    }

    #[test]
    fn test_place_groups() {
        let units = [Unit::Single(0), Unit::Group(0), Unit::Single(3)];
        assert_eq!(
            place_groups(&units, &[2], 1).unwrap(),
            vec![Unit::Single(0), Unit::Single(3), Unit::Group(0)]
        );
        assert!(place_groups(&units, &[3], 1).is_err());
        assert!(place_groups(&units, &[0, 1], 1).is_err());
    }

    #[test]
    fn test_add_matches_by_label() {
        let a = iota(&[2, 2], ["x", "y"]);
        let b = a.transpose(&["y", "x"]).unwrap();
        let sum = a.add(&b).unwrap();
        assert_eq!(sum.labels(), a.labels());
        let doubled = (&a * 2.0).unwrap();
        assert!(sum.almost_equal(&doubled, Tolerance::default()).unwrap());
        let diff = a.sub(&b).unwrap();
        assert_relative_eq!(diff.norm().unwrap(), 0.0);
    }

    #[test]
    fn test_add_rejects_other_labels() {
        let a = iota(&[2, 2], ["x", "y"]);
        let b = iota(&[2, 2], ["x", "z"]);
        assert!(matches!(a.add(&b), Err(TensorError::LegMismatch { .. })));
    }

    #[test]
    fn test_partially_labelled_sum_drops_labels() {
        let a = iota(&[2, 3], ["x", "y"]);
        let mut b = a.clone();
        b.set_labels(Unlabelled).unwrap();
        let sum = a.add(&b).unwrap();
        assert_eq!(sum.labels(), &[None, None]);
        let mut c = a.clone();
        c.add_assign(&a).unwrap();
        assert!(c.almost_equal(&(&a * 2.0).unwrap(), Tolerance::default()).unwrap());
    }

    #[test]
    fn test_item_requires_size_one() {
        let a = iota(&[2, 1], ["x", "y"]);
        assert!(matches!(a.item(), Err(TensorError::NotScalar { size: 2 })));
        let b = iota(&[1, 1], ["x", "y"]);
        assert_eq!(b.to_f64().unwrap(), 0.0);
        assert!(matches!(a.try_eq(&a), Err(TensorError::ComparisonUndefined)));
    }

    #[test]
    fn test_conj_labels() {
        let a = iota(&[2, 2], ["p", "q*"]);
        let c = a.conj().unwrap();
        assert_eq!(c.labels(), &[Some("p*".to_string()), Some("q".to_string())]);
        assert!(c.legs()[0].can_contract_with(&a.legs()[0]));
    }

    #[test]
    fn test_negation_and_division() {
        let a = iota(&[2, 2], ["x", "y"]);
        let neg = (-&a).unwrap();
        assert!(neg.add(&a).unwrap().norm().unwrap() < 1e-14);
        let half = (&a / 2.0).unwrap();
        assert_relative_eq!(half.norm().unwrap(), a.norm().unwrap() / 2.0);
    }
}
