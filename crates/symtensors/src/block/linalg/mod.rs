//! Matrix kernels shared by the block backends.
//!
//! Every function takes and returns 2-D [`Block`]s. Decompositions that faer
//! provides are delegated to it; the Jacobi SVD fallback and the matrix
//! logarithm are implemented here.

pub mod exp;
pub mod log;
pub mod qr;
pub mod svd;

use faer::linalg::solvers::Solve;

use super::Block;
use crate::error::TensorError;
use crate::scalar::{Dtype, Scalar};

/// Machine epsilon of the real type underlying `T`.
pub(crate) fn epsilon<T: Scalar>() -> f64 {
    match T::DTYPE.to_real() {
        Dtype::Float32 => f32::EPSILON as f64,
        _ => f64::EPSILON,
    }
}

/// Maximum absolute column sum.
pub(crate) fn norm_1<T: Scalar>(a: &Block<T>, n: usize) -> f64 {
    (0..n)
        .map(|j| (0..n).map(|i| a.data()[i + j * n].magnitude()).sum::<f64>())
        .fold(0.0, f64::max)
}

/// `alpha * a + beta * b` for blocks of equal shape.
pub(crate) fn axpby<T: Scalar>(alpha: f64, a: &Block<T>, beta: f64, b: &Block<T>) -> Result<Block<T>, TensorError> {
    let mut out = a.scale(T::from_f64(alpha));
    out.add_scaled(T::from_f64(beta), b)?;
    Ok(out)
}

/// Conjugate transpose of a 2-D block.
pub(crate) fn adjoint<T: Scalar>(a: &Block<T>) -> Result<Block<T>, TensorError> {
    Ok(a.permute(&[1, 0])?.conj())
}

/// Solve `a x = b` through an LU decomposition with partial pivoting.
///
/// Fails if the solution is not finite, which is how a singular `a` shows up.
pub(crate) fn solve<T: Scalar>(a: &Block<T>, b: &Block<T>) -> Result<Block<T>, TensorError> {
    let (n, n2) = a.matrix_dims()?;
    if n != n2 {
        return Err(TensorError::NotSquareMatrix { rows: n, cols: n2 });
    }
    let (rows, nrhs) = b.matrix_dims()?;
    if rows != n {
        return Err(TensorError::ShapeMismatch {
            expected: vec![n, nrhs],
            actual: b.shape().to_vec(),
        });
    }
    let lu = a.as_mat(n, n).partial_piv_lu();
    let mut x = b.as_mat(n, nrhs).to_owned();
    lu.solve_in_place(&mut x);
    let x = Block::from_mat(x.as_ref());
    if x.data().iter().any(|v| !(v.real_part().is_finite() && v.imag_part().is_finite())) {
        return Err(TensorError::SingularMatrix);
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solve() {
        // [[4, 1], [2, 3]] x = [1, 2]
        let a = Block::from_vec(vec![4.0, 2.0, 1.0, 3.0], &[2, 2]).unwrap();
        let b = Block::from_vec(vec![1.0, 2.0], &[2, 1]).unwrap();
        let x = solve(&a, &b).unwrap();
        assert_relative_eq!(x.data()[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(x.data()[1], 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_solve_singular() {
        let a = Block::<f64>::zeros(&[2, 2]);
        let b = Block::<f64>::identity(2);
        assert!(matches!(solve(&a, &b), Err(TensorError::SingularMatrix)));
    }

    #[test]
    fn test_norm_1() {
        let a = Block::from_vec(vec![1.0, -3.0, 2.0, 0.5], &[2, 2]).unwrap();
        assert_relative_eq!(norm_1(&a, 2), 4.0);
    }
}
