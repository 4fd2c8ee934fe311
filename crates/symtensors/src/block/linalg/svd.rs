//! Singular value decompositions.
//!
//! [`svd_default`] uses faer's driver. [`svd_jacobi`] is a one-sided
//! (Hestenes) Jacobi SVD used as the fallback of the robust mode; it only
//! needs column inner products and plane rotations, so it converges for any
//! finite input, if slowly.

use faer::linalg::solvers::{Svd, SvdError};
use faer_traits::math_utils::conj;

use super::{adjoint, epsilon};
use crate::block::{Block, MatrixSvd};
use crate::error::TensorError;
use crate::scalar::Scalar;

const MAX_SWEEPS: usize = 80;

/// Thin SVD with faer's default driver.
pub fn svd_default<T: Scalar>(a: &Block<T>) -> Result<MatrixSvd<T>, TensorError> {
    let (m, n) = a.matrix_dims()?;
    let k = m.min(n);
    if k == 0 {
        return Ok(empty_svd(m, n));
    }
    let svd: Svd<T> = Svd::new_thin(a.as_mat(m, n)).map_err(|e: SvdError| TensorError::SvdError {
        message: format!("{:?}", e),
    })?;
    let u_mat = svd.U();
    let s_diag = svd.S();
    let v_mat = svd.V();

    let u = Block::from_mat(u_mat);
    let s: Vec<f64> = (0..k).map(|i| s_diag[i].real_part()).collect();
    if s.iter().any(|x| !x.is_finite()) {
        return Err(TensorError::SvdError {
            message: "non-finite singular values".to_string(),
        });
    }
    // V^H[i, j] = conj(V[j, i])
    let vh = Block::from_fn(&[k, n], |idx| conj(&v_mat[(idx[1], idx[0])]));
    Ok(MatrixSvd { u, s, vh })
}

/// Thin SVD by one-sided Jacobi rotations.
///
/// # Errors
///
/// Returns [`TensorError::SvdError`] if the input is not finite or the
/// rotations do not converge within the sweep limit.
pub fn svd_jacobi<T: Scalar>(a: &Block<T>) -> Result<MatrixSvd<T>, TensorError> {
    let (m, n) = a.matrix_dims()?;
    if m.min(n) == 0 {
        return Ok(empty_svd(m, n));
    }
    if a.data().iter().any(|x| !(x.real_part().is_finite() && x.imag_part().is_finite())) {
        return Err(TensorError::SvdError {
            message: "input contains non-finite entries".to_string(),
        });
    }
    if m < n {
        // a^H = u' s v'^H, hence a = v' s u'^H
        let svd = svd_jacobi(&adjoint(a)?)?;
        return Ok(MatrixSvd {
            u: adjoint(&svd.vh)?,
            s: svd.s,
            vh: adjoint(&svd.u)?,
        });
    }

    let mut u = a.data().to_vec();
    let mut v = Block::<T>::identity(n).into_vec();
    let tol = epsilon::<T>() * (m as f64).sqrt();

    let mut converged = false;
    for _ in 0..MAX_SWEEPS {
        let mut rotated = false;
        for p in 0..n {
            for q in (p + 1)..n {
                let (alpha, beta, gamma) = column_products(&u, m, p, q);
                let g = gamma.magnitude();
                if g == 0.0 || g <= tol * (alpha * beta).sqrt() {
                    continue;
                }
                rotated = true;
                // rotate the phase of column q so that <u_p, u_q> is real
                let phase = (gamma * T::from_f64(1.0 / g)).conjugate();
                let zeta = (beta - alpha) / (2.0 * g);
                let t = zeta.signum() / (zeta.abs() + (1.0 + zeta * zeta).sqrt());
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = c * t;
                rotate(&mut u, m, p, q, phase, c, s);
                rotate(&mut v, n, p, q, phase, c, s);
            }
        }
        if !rotated {
            converged = true;
            break;
        }
    }
    if !converged {
        return Err(TensorError::SvdError {
            message: format!("Jacobi SVD did not converge in {} sweeps", MAX_SWEEPS),
        });
    }

    let norms: Vec<f64> = (0..n)
        .map(|j| u[j * m..(j + 1) * m].iter().map(|x| x.abs_sqr()).sum::<f64>().sqrt())
        .collect();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| norms[j].total_cmp(&norms[i]));

    let cutoff = norms[order[0]] * epsilon::<T>() * m as f64;
    let mut u_sorted = vec![T::zero(); m * n];
    let mut valid = vec![false; n];
    let mut s = Vec::with_capacity(n);
    for (new, &old) in order.iter().enumerate() {
        let sigma = norms[old];
        if sigma > cutoff && sigma > 0.0 {
            let inv = T::from_f64(1.0 / sigma);
            for i in 0..m {
                u_sorted[i + new * m] = u[i + old * m] * inv;
            }
            valid[new] = true;
            s.push(sigma);
        } else {
            s.push(0.0);
        }
    }
    complete_orthonormal_columns(&mut u_sorted, m, &valid);

    let vh = Block::from_fn(&[n, n], |idx| v[idx[1] + order[idx[0]] * n].conjugate());
    Ok(MatrixSvd {
        u: Block::from_vec(u_sorted, &[m, n])?,
        s,
        vh,
    })
}

fn empty_svd<T: Scalar>(m: usize, n: usize) -> MatrixSvd<T> {
    MatrixSvd {
        u: Block::zeros(&[m, 0]),
        s: vec![],
        vh: Block::zeros(&[0, n]),
    }
}

/// `(|u_p|^2, |u_q|^2, <u_p, u_q>)` for columns of a column-major matrix.
fn column_products<T: Scalar>(u: &[T], m: usize, p: usize, q: usize) -> (f64, f64, T) {
    let (mut alpha, mut beta, mut gamma) = (0.0, 0.0, T::zero());
    for i in 0..m {
        let up = u[i + p * m];
        let uq = u[i + q * m];
        alpha += up.abs_sqr();
        beta += uq.abs_sqr();
        gamma += up.conjugate() * uq;
    }
    (alpha, beta, gamma)
}

fn rotate<T: Scalar>(x: &mut [T], rows: usize, p: usize, q: usize, phase: T, c: f64, s: f64) {
    let (c, s) = (T::from_f64(c), T::from_f64(s));
    for i in 0..rows {
        let xp = x[i + p * rows];
        let xq = x[i + q * rows] * phase;
        x[i + p * rows] = c * xp - s * xq;
        x[i + q * rows] = s * xp + c * xq;
    }
}

/// Replace the columns not marked `valid` by unit vectors orthogonal to all others.
fn complete_orthonormal_columns<T: Scalar>(u: &mut [T], m: usize, valid: &[bool]) {
    let mut done: Vec<usize> = (0..valid.len()).filter(|&j| valid[j]).collect();
    for j in (0..valid.len()).filter(|&j| !valid[j]) {
        let mut best: Option<(f64, Vec<T>)> = None;
        for e in 0..m {
            let mut w = vec![T::zero(); m];
            w[e] = T::one();
            // two passes of Gram-Schmidt
            for _ in 0..2 {
                for &k in &done {
                    let col = &u[k * m..(k + 1) * m];
                    let mut dot = T::zero();
                    for i in 0..m {
                        dot += col[i].conjugate() * w[i];
                    }
                    for i in 0..m {
                        w[i] -= dot * col[i];
                    }
                }
            }
            let norm = w.iter().map(|x| x.abs_sqr()).sum::<f64>().sqrt();
            if best.as_ref().map_or(true, |(b, _)| norm > *b) {
                best = Some((norm, w));
            }
        }
        if let Some((norm, w)) = best {
            let inv = T::from_f64(1.0 / norm);
            for i in 0..m {
                u[i + j * m] = w[i] * inv;
            }
        }
        done.push(j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::c64;
    use approx::assert_relative_eq;

    fn reconstruct<T: Scalar>(svd: &MatrixSvd<T>) -> Block<T> {
        let (m, k) = svd.u.matrix_dims().unwrap();
        let (_, n) = svd.vh.matrix_dims().unwrap();
        Block::from_fn(&[m, n], |idx| {
            let mut acc = T::zero();
            for l in 0..k {
                acc += svd.u.data()[idx[0] + l * m] * T::from_f64(svd.s[l]) * svd.vh.data()[l + idx[1] * k];
            }
            acc
        })
    }

    fn assert_orthonormal_columns<T: Scalar>(u: &Block<T>) {
        let (m, k) = u.matrix_dims().unwrap();
        for p in 0..k {
            for q in 0..k {
                let mut dot = T::zero();
                for i in 0..m {
                    dot += u.data()[i + p * m].conjugate() * u.data()[i + q * m];
                }
                let expected = if p == q { 1.0 } else { 0.0 };
                assert_relative_eq!(dot.real_part(), expected, epsilon = 1e-10);
                assert_relative_eq!(dot.imag_part(), 0.0, epsilon = 1e-10);
            }
        }
    }

    fn sample_matrix(m: usize, n: usize) -> Block<c64> {
        Block::from_fn(&[m, n], |idx| {
            let x = (idx[0] * 7 + idx[1] * 3) as f64;
            c64::new(x.sin(), (0.5 * x).cos())
        })
    }

    #[test]
    fn test_default_and_jacobi_agree() {
        let a = sample_matrix(5, 3);
        let d = svd_default(&a).unwrap();
        let j = svd_jacobi(&a).unwrap();
        for (x, y) in d.s.iter().zip(&j.s) {
            assert_relative_eq!(x, y, epsilon = 1e-10);
        }
        let r = reconstruct(&j);
        for (x, y) in r.data().iter().zip(a.data()) {
            assert_relative_eq!((*x - *y).magnitude(), 0.0, epsilon = 1e-10);
        }
        assert_orthonormal_columns(&j.u);
    }

    #[test]
    fn test_jacobi_wide_matrix() {
        let a = sample_matrix(2, 4);
        let j = svd_jacobi(&a).unwrap();
        assert_eq!(j.u.shape(), &[2, 2]);
        assert_eq!(j.vh.shape(), &[2, 4]);
        let r = reconstruct(&j);
        for (x, y) in r.data().iter().zip(a.data()) {
            assert_relative_eq!((*x - *y).magnitude(), 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_jacobi_rank_deficient() {
        // rank one: outer product of [1, 2, 3] and [1, 1]
        let a = Block::from_vec(vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0], &[3, 2]).unwrap();
        let j = svd_jacobi(&a).unwrap();
        assert_relative_eq!(j.s[0], (28.0f64).sqrt(), epsilon = 1e-10);
        assert_relative_eq!(j.s[1], 0.0, epsilon = 1e-10);
        assert_orthonormal_columns(&j.u);
    }

    #[test]
    fn test_jacobi_rejects_nan() {
        let a = Block::from_vec(vec![f64::NAN, 1.0, 2.0, 3.0], &[2, 2]).unwrap();
        assert!(matches!(svd_jacobi(&a), Err(TensorError::SvdError { .. })));
    }

    #[test]
    fn test_empty_matrix() {
        let a = Block::<f64>::zeros(&[3, 0]);
        let d = svd_default(&a).unwrap();
        assert!(d.s.is_empty());
        assert_eq!(d.u.shape(), &[3, 0]);
    }
}
