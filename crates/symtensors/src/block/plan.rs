//! Contraction plans shared by the block backends.
//!
//! A plan reduces a tensor contraction to a matrix product
//! `C(dleft, dright) = A(dleft, dmid) * B(dmid, dright)` and records the
//! permutations that bring the operands into that form.

use crate::error::TensorError;
use crate::strides::{complement_axes, is_identity_permutation};

#[derive(Debug, Clone)]
pub(crate) struct ContractionPlan {
    /// Open axes of `a`, in order.
    pub open_a: Vec<usize>,
    /// Open axes of `b`, in order.
    pub open_b: Vec<usize>,
    /// `open_a` followed by the contracted axes of `a`.
    pub perm_a: Vec<usize>,
    /// Contracted axes of `b` followed by `open_b`.
    pub perm_b: Vec<usize>,
    pub permute_a: bool,
    pub permute_b: bool,
    pub dleft: usize,
    pub dmid: usize,
    pub dright: usize,
    pub out_shape: Vec<usize>,
}

impl ContractionPlan {
    /// Validate the axis pairs and compute the GEMM dimensions.
    pub fn compute(
        shape_a: &[usize],
        shape_b: &[usize],
        axes_a: &[usize],
        axes_b: &[usize],
    ) -> Result<Self, TensorError> {
        if axes_a.len() != axes_b.len() {
            return Err(TensorError::ShapeMismatch {
                expected: axes_a.to_vec(),
                actual: axes_b.to_vec(),
            });
        }
        check_axes(axes_a, shape_a.len())?;
        check_axes(axes_b, shape_b.len())?;
        for (&i, &j) in axes_a.iter().zip(axes_b) {
            if shape_a[i] != shape_b[j] {
                return Err(TensorError::ShapeMismatch {
                    expected: vec![shape_a[i]],
                    actual: vec![shape_b[j]],
                });
            }
        }

        let open_a = complement_axes(axes_a, shape_a.len());
        let open_b = complement_axes(axes_b, shape_b.len());
        let perm_a: Vec<usize> = open_a.iter().chain(axes_a).copied().collect();
        let perm_b: Vec<usize> = axes_b.iter().chain(&open_b).copied().collect();

        let dleft = open_a.iter().map(|&i| shape_a[i]).product();
        let dmid = axes_a.iter().map(|&i| shape_a[i]).product();
        let dright = open_b.iter().map(|&i| shape_b[i]).product();
        let out_shape = open_a
            .iter()
            .map(|&i| shape_a[i])
            .chain(open_b.iter().map(|&i| shape_b[i]))
            .collect();

        Ok(Self {
            permute_a: !is_identity_permutation(&perm_a),
            permute_b: !is_identity_permutation(&perm_b),
            open_a,
            open_b,
            perm_a,
            perm_b,
            dleft,
            dmid,
            dright,
            out_shape,
        })
    }
}

fn check_axes(axes: &[usize], ndim: usize) -> Result<(), TensorError> {
    let mut seen = vec![false; ndim];
    for &ax in axes {
        if ax >= ndim || seen[ax] {
            return Err(TensorError::InvalidPermutation {
                perm: axes.to_vec(),
                ndim,
            });
        }
        seen[ax] = true;
    }
    Ok(())
}
