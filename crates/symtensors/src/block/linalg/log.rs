//! Principal matrix logarithm by inverse scaling and squaring.
//!
//! Repeated Denman-Beavers square roots bring the matrix close to the
//! identity, where the Mercator series for `log(I + Y)` converges quickly.

use super::{axpby, epsilon, norm_1, solve};
use crate::block::{Block, BlockBackend};
use crate::error::TensorError;
use crate::scalar::Scalar;

const MAX_SQUARE_ROOTS: usize = 40;
const MAX_SQRT_ITERATIONS: usize = 100;
const MAX_SERIES_TERMS: usize = 200;
/// Series radius: square roots are taken until `||X - I||_1` drops below this.
const SERIES_RADIUS: f64 = 0.25;

/// `log(a)` for a square matrix without eigenvalues on the closed negative real axis.
pub fn matrix_log<T, B>(backend: &B, a: &Block<T>) -> Result<Block<T>, TensorError>
where
    T: Scalar,
    B: BlockBackend<T> + ?Sized,
{
    let (n, cols) = a.matrix_dims()?;
    if n != cols {
        return Err(TensorError::NotSquareMatrix { rows: n, cols });
    }
    if n == 0 {
        return Ok(Block::zeros(&[0, 0]));
    }
    if !norm_1(a, n).is_finite() {
        return Err(TensorError::MatrixLogError {
            message: "matrix contains non-finite entries".to_string(),
        });
    }

    let identity = Block::<T>::identity(n);
    let mut x = a.clone();
    let mut roots = 0;
    while norm_1(&axpby(1.0, &x, -1.0, &identity)?, n) > SERIES_RADIUS {
        if roots == MAX_SQUARE_ROOTS {
            return Err(TensorError::MatrixLogError {
                message: format!("matrix not near the identity after {} square roots", roots),
            });
        }
        x = sqrtm(backend, &x, &identity, n)?;
        roots += 1;
    }

    let y = axpby(1.0, &x, -1.0, &identity)?;
    let mut power = y.clone();
    let mut log = y.clone();
    let tol = epsilon::<T>();
    for j in 2..=MAX_SERIES_TERMS {
        power = backend.matrix_dot(&power, &y)?;
        let sign = if j % 2 == 0 { -1.0 } else { 1.0 };
        log.add_scaled(T::from_f64(sign / j as f64), &power)?;
        if norm_1(&power, n) / (j as f64) <= tol * norm_1(&log, n).max(tol) {
            break;
        }
    }
    log.scale_inplace(T::from_f64(2f64.powi(roots as i32)));
    Ok(log)
}

/// Principal square root by the Denman-Beavers iteration.
fn sqrtm<T, B>(backend: &B, a: &Block<T>, identity: &Block<T>, n: usize) -> Result<Block<T>, TensorError>
where
    T: Scalar,
    B: BlockBackend<T> + ?Sized,
{
    let singular = |_: TensorError| TensorError::MatrixLogError {
        message: "matrix is singular or has eigenvalues on the negative real axis".to_string(),
    };
    // convergence is quadratic, so a step of this size leaves an error near its square
    let tol = epsilon::<T>().sqrt() * 1e-2;
    let mut y = a.clone();
    let mut z = identity.clone();
    for _ in 0..MAX_SQRT_ITERATIONS {
        let y_inv = solve(&y, identity).map_err(singular)?;
        let z_inv = solve(&z, identity).map_err(singular)?;
        let y_next = axpby(0.5, &y, 0.5, &z_inv)?;
        let z_next = axpby(0.5, &z, 0.5, &y_inv)?;
        let change = norm_1(&axpby(1.0, &y_next, -1.0, &y)?, n);
        let scale = norm_1(&y_next, n);
        y = y_next;
        z = z_next;
        if change <= tol * scale {
            // one more product confirms y is a square root of a
            let residual = norm_1(&axpby(1.0, &backend.matrix_dot(&y, &y)?, -1.0, a)?, n);
            if residual <= epsilon::<T>().sqrt() * norm_1(a, n).max(1.0) {
                return Ok(y);
            }
            break;
        }
    }
    Err(TensorError::MatrixLogError {
        message: "square root iteration did not converge".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::linalg::exp::matrix_exp;
    use crate::block::{FaerBlockBackend, NaiveBlockBackend};
    use crate::scalar::c64;
    use approx::assert_relative_eq;

    #[test]
    fn test_log_identity_is_zero() {
        let l = matrix_log(&FaerBlockBackend::default(), &Block::<f64>::identity(3)).unwrap();
        assert!(l.max_abs() < 1e-14);
    }

    #[test]
    fn test_log_diagonal() {
        let a = Block::from_vec(vec![1f64.exp(), 0.0, 0.0, 20f64.exp()], &[2, 2]).unwrap();
        let l = matrix_log(&NaiveBlockBackend, &a).unwrap();
        assert_relative_eq!(l.data()[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(l.data()[3], 20.0, epsilon = 1e-8);
        assert_relative_eq!(l.data()[1], 0.0, epsilon = 1e-8);
    }

    #[test]
    fn test_log_inverts_exp() {
        let backend = FaerBlockBackend::default();
        let a = Block::from_fn(&[3, 3], |idx| {
            c64::new(0.3 * (idx[0] as f64 - idx[1] as f64), 0.1 * (idx[0] + idx[1]) as f64)
        });
        let e = matrix_exp(&backend, &a).unwrap();
        let l = matrix_log(&backend, &e).unwrap();
        for (x, y) in l.data().iter().zip(a.data()) {
            assert_relative_eq!((*x - *y).magnitude(), 0.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_log_of_singular_matrix_fails() {
        let a = Block::<f64>::zeros(&[2, 2]);
        assert!(matches!(
            matrix_log(&FaerBlockBackend::default(), &a),
            Err(TensorError::MatrixLogError { .. })
        ));
    }
}
