//! Matrix decompositions and matrix functions of tensors.
//!
//! Each routine groups the legs into a row and a column composite leg,
//! hands the resulting matrix to the backend and splits the composite legs
//! of the result again.

use super::legs::check_unique;
use super::{LegRef, Tensor};
use crate::backend::SymmetryBackend;
use crate::config::{CombineOptions, SvdAlgorithm};
use crate::error::TensorError;
use crate::scalar::Scalar;
use crate::strides::{inverse_permutation, validate_permutation};

/// The factors of [`Tensor::svd`].
#[derive(Clone, Debug)]
pub struct TensorSvd<T: Scalar> {
    pub u: Tensor<T>,
    pub s: Tensor<T>,
    pub vh: Tensor<T>,
}

impl<T: Scalar> Tensor<T> {
    fn with_labels(mut self, labels: Vec<Option<String>>) -> Result<Tensor<T>, TensorError> {
        if labels.len() != self.legs.len() {
            return Err(TensorError::LabelCountMismatch {
                legs: self.legs.len(),
                labels: labels.len(),
            });
        }
        check_unique(&labels)?;
        self.labels = labels;
        Ok(self)
    }

    fn labels_at(&self, idcs: &[usize]) -> Vec<Option<String>> {
        idcs.iter().map(|&i| self.labels[i].clone()).collect()
    }

    /// Combine `idcs1` into the row leg and `idcs2` into the column leg.
    fn matrix_form(&self, idcs1: &[usize], idcs2: &[usize], duals: Option<[bool; 2]>) -> Result<Tensor<T>, TensorError> {
        if idcs1.is_empty() || idcs2.is_empty() {
            return Err(TensorError::leg_mismatch("both sides of a matrix need at least one leg"));
        }
        let all: Vec<usize> = idcs1.iter().chain(idcs2).copied().collect();
        validate_permutation(&all, self.num_legs())?;
        let options = CombineOptions {
            new_axes: Some(vec![0, 1]),
            product_spaces_dual: duals.map(|d| d.to_vec()),
        };
        self.combine_idcs(&[idcs1.to_vec(), idcs2.to_vec()], &options)
    }

    /// Singular value decomposition `self = U S Vh`.
    ///
    /// `u_legs` and `vh_legs` must together list every leg once. With
    /// `new_labels = (l1, l2)` the factors have legs
    /// `U: [u_legs.., l1]`, `S: [l2, l1]` and `Vh: [l2, vh_legs..]`, so
    /// `U.tdot(S, [l1], [l2])` contracts as expected.
    pub fn svd<'a, 'b, L1, L2>(
        &self,
        u_legs: &[L1],
        vh_legs: &[L2],
        new_labels: (&str, &str),
        algorithm: SvdAlgorithm,
    ) -> Result<TensorSvd<T>, TensorError>
    where
        L1: Into<LegRef<'a>> + Copy,
        L2: Into<LegRef<'b>> + Copy,
    {
        let idcs1 = self.get_leg_idcs(u_legs)?;
        let idcs2 = self.get_leg_idcs(vh_legs)?;
        let matrix = self.matrix_form(&idcs1, &idcs2, None)?;
        let svd = self.backend.svd(&matrix.data, &matrix.legs, algorithm)?;
        let (l1, l2) = (Some(new_labels.0.to_string()), Some(new_labels.1.to_string()));
        let (row, col) = (&matrix.legs[0], &matrix.legs[1]);
        let new_leg = svd.new_leg;

        let mut u_labels = self.labels_at(&idcs1);
        u_labels.push(l1.clone());
        let u = matrix
            .derived(svd.u, vec![row.clone(), new_leg.clone()], vec![None; 2])?
            .split_idcs(vec![0])?
            .with_labels(u_labels)?;

        let s = matrix.derived(svd.s, vec![new_leg.dual(), new_leg.clone()], vec![l2.clone(), l1])?;

        let mut vh_labels = vec![l2];
        vh_labels.extend(self.labels_at(&idcs2));
        let vh = matrix
            .derived(svd.vh, vec![new_leg.dual(), col.clone()], vec![None; 2])?
            .split_idcs(vec![1])?
            .with_labels(vh_labels)?;
        Ok(TensorSvd { u, s, vh })
    }

    /// QR decomposition `self = Q R`.
    ///
    /// `Q` has legs `[q_legs.., l1]` and `R` has legs `[l2, r_legs..]`. With
    /// `full` the new leg has the full row dimension.
    pub fn qr<'a, 'b, L1, L2>(
        &self,
        q_legs: &[L1],
        r_legs: &[L2],
        new_labels: (&str, &str),
        full: bool,
    ) -> Result<(Tensor<T>, Tensor<T>), TensorError>
    where
        L1: Into<LegRef<'a>> + Copy,
        L2: Into<LegRef<'b>> + Copy,
    {
        let idcs1 = self.get_leg_idcs(q_legs)?;
        let idcs2 = self.get_leg_idcs(r_legs)?;
        let matrix = self.matrix_form(&idcs1, &idcs2, None)?;
        let qr = self.backend.qr(&matrix.data, &matrix.legs, full)?;
        let (row, col) = (&matrix.legs[0], &matrix.legs[1]);

        let mut q_labels = self.labels_at(&idcs1);
        q_labels.push(Some(new_labels.0.to_string()));
        let q = matrix
            .derived(qr.q, vec![row.clone(), qr.new_leg.clone()], vec![None; 2])?
            .split_idcs(vec![0])?
            .with_labels(q_labels)?;

        let mut r_labels = vec![Some(new_labels.1.to_string())];
        r_labels.extend(self.labels_at(&idcs2));
        let r = matrix
            .derived(qr.r, vec![qr.new_leg.dual(), col.clone()], vec![None; 2])?
            .split_idcs(vec![1])?
            .with_labels(r_labels)?;
        Ok((q, r))
    }

    /// Apply a matrix function to `self` viewed as a map from `legs2` to `legs1`.
    fn matrix_function<'a, 'b, L1, L2>(
        &self,
        legs1: &[L1],
        legs2: &[L2],
        apply: impl FnOnce(&Tensor<T>) -> Result<Tensor<T>, TensorError>,
    ) -> Result<Tensor<T>, TensorError>
    where
        L1: Into<LegRef<'a>> + Copy,
        L2: Into<LegRef<'b>> + Copy,
    {
        let idcs1 = self.get_leg_idcs(legs1)?;
        let idcs2 = self.get_leg_idcs(legs2)?;
        if idcs1.len() != idcs2.len() {
            return Err(TensorError::leg_mismatch(format!(
                "matrix function maps {} legs to {} legs",
                idcs2.len(),
                idcs1.len()
            )));
        }
        let first_dual = idcs1
            .first()
            .map(|&i| self.legs[i].is_dual())
            .ok_or_else(|| TensorError::leg_mismatch("matrix function needs at least one leg pair"))?;
        // opposite duality makes the two composite legs mutually dual
        let matrix = self.matrix_form(&idcs1, &idcs2, Some([first_dual, !first_dual]))?;
        let result = apply(&matrix)?.split_idcs(vec![0, 1])?;
        let order: Vec<usize> = idcs1.iter().chain(&idcs2).copied().collect();
        result
            .transpose_idcs(&inverse_permutation(&order))?
            .with_labels(self.labels.clone())
    }

    /// Matrix exponential; `legs2[k]` must be dual to `legs1[k]`.
    pub fn exp<'a, 'b, L1, L2>(&self, legs1: &[L1], legs2: &[L2]) -> Result<Tensor<T>, TensorError>
    where
        L1: Into<LegRef<'a>> + Copy,
        L2: Into<LegRef<'b>> + Copy,
    {
        self.matrix_function(legs1, legs2, |m| {
            let data = m.backend.exp(&m.data, &m.legs)?;
            m.derived(data, m.legs.clone(), m.labels.clone())
        })
    }

    /// Principal matrix logarithm; `legs2[k]` must be dual to `legs1[k]`.
    pub fn log<'a, 'b, L1, L2>(&self, legs1: &[L1], legs2: &[L2]) -> Result<Tensor<T>, TensorError>
    where
        L1: Into<LegRef<'a>> + Copy,
        L2: Into<LegRef<'b>> + Copy,
    {
        self.matrix_function(legs1, legs2, |m| {
            let data = m.backend.log(&m.data, &m.legs)?;
            m.derived(data, m.legs.clone(), m.labels.clone())
        })
    }
}
