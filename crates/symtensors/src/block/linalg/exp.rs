//! Matrix exponential by scaling and squaring with a [13/13] Padé approximant.

use super::{axpby, norm_1, solve};
use crate::block::{Block, BlockBackend};
use crate::error::TensorError;
use crate::scalar::Scalar;

/// Padé [13/13] coefficients.
const PADE_13: [f64; 14] = [
    64764752532480000.0,
    32382376266240000.0,
    7771770303897600.0,
    1187353796428800.0,
    129060195264000.0,
    10559470521600.0,
    670442572800.0,
    33522128640.0,
    1323241920.0,
    40840800.0,
    960960.0,
    16380.0,
    182.0,
    1.0,
];

/// Largest 1-norm for which the [13/13] approximant is accurate to double precision.
const THETA_13: f64 = 5.371920351148152;

/// `exp(a)` for a square matrix, with products taken by `backend`.
pub fn matrix_exp<T, B>(backend: &B, a: &Block<T>) -> Result<Block<T>, TensorError>
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
    let norm = norm_1(a, n);
    if !norm.is_finite() {
        return Err(TensorError::MatrixExpError {
            message: "matrix contains non-finite entries".to_string(),
        });
    }

    // a / 2^s has 1-norm at most THETA_13
    let s = if norm > THETA_13 {
        (norm / THETA_13).log2().ceil() as u32
    } else {
        0
    };
    let scaled = a.scale(T::from_f64(0.5f64.powi(s as i32)));

    let mut result = pade_13(backend, &scaled, n)?;
    for _ in 0..s {
        result = backend.matrix_dot(&result, &result)?;
    }
    Ok(result)
}

fn pade_13<T, B>(backend: &B, a: &Block<T>, n: usize) -> Result<Block<T>, TensorError>
where
    T: Scalar,
    B: BlockBackend<T> + ?Sized,
{
    let b = &PADE_13;
    let identity = Block::identity(n);
    let a2 = backend.matrix_dot(a, a)?;
    let a4 = backend.matrix_dot(&a2, &a2)?;
    let a6 = backend.matrix_dot(&a2, &a4)?;

    // U = A (A6 (b13 A6 + b11 A4 + b9 A2) + b7 A6 + b5 A4 + b3 A2 + b1 I)
    let inner = axpby(b[13], &a6, b[11], &a4)?;
    let inner = axpby(1.0, &inner, b[9], &a2)?;
    let mut u = backend.matrix_dot(&a6, &inner)?;
    u.add_scaled(T::from_f64(b[7]), &a6)?;
    u.add_scaled(T::from_f64(b[5]), &a4)?;
    u.add_scaled(T::from_f64(b[3]), &a2)?;
    u.add_scaled(T::from_f64(b[1]), &identity)?;
    let u = backend.matrix_dot(a, &u)?;

    // V = A6 (b12 A6 + b10 A4 + b8 A2) + b6 A6 + b4 A4 + b2 A2 + b0 I
    let inner = axpby(b[12], &a6, b[10], &a4)?;
    let inner = axpby(1.0, &inner, b[8], &a2)?;
    let mut v = backend.matrix_dot(&a6, &inner)?;
    v.add_scaled(T::from_f64(b[6]), &a6)?;
    v.add_scaled(T::from_f64(b[4]), &a4)?;
    v.add_scaled(T::from_f64(b[2]), &a2)?;
    v.add_scaled(T::from_f64(b[0]), &identity)?;

    // exp(A) ≈ (V - U)^{-1} (V + U)
    let numerator = axpby(1.0, &v, 1.0, &u)?;
    let denominator = axpby(1.0, &v, -1.0, &u)?;
    solve(&denominator, &numerator).map_err(|e| TensorError::MatrixExpError {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{FaerBlockBackend, NaiveBlockBackend};
    use crate::scalar::c64;
    use approx::assert_relative_eq;

    #[test]
    fn test_exp_zero_is_identity() {
        let e = matrix_exp(&FaerBlockBackend::default(), &Block::<f64>::zeros(&[3, 3])).unwrap();
        for (x, y) in e.data().iter().zip(Block::<f64>::identity(3).data()) {
            assert_relative_eq!(x, y, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_exp_diagonal_large_norm() {
        let a = Block::from_vec(vec![10.0, 0.0, 0.0, -3.0], &[2, 2]).unwrap();
        let e = matrix_exp(&NaiveBlockBackend, &a).unwrap();
        assert_relative_eq!(e.data()[0], 10f64.exp(), max_relative = 1e-12);
        assert_relative_eq!(e.data()[3], (-3f64).exp(), max_relative = 1e-12);
        assert_relative_eq!(e.data()[1], 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_exp_rotation_generator() {
        // exp([[0, -t], [t, 0]]) = [[cos t, -sin t], [sin t, cos t]]
        let t: f64 = 7.5;
        let a = Block::from_vec(vec![0.0, t, -t, 0.0], &[2, 2]).unwrap();
        let e = matrix_exp(&FaerBlockBackend::default(), &a).unwrap();
        assert_relative_eq!(e.data()[0], t.cos(), epsilon = 1e-10);
        assert_relative_eq!(e.data()[1], t.sin(), epsilon = 1e-10);
        assert_relative_eq!(e.data()[2], -t.sin(), epsilon = 1e-10);
    }

    #[test]
    fn test_exp_complex_phase() {
        let a = Block::from_vec(vec![c64::new(0.0, 1.0)], &[1, 1]).unwrap();
        let e = matrix_exp(&FaerBlockBackend::default(), &a).unwrap();
        assert_relative_eq!(e.data()[0].re, 1f64.cos(), epsilon = 1e-12);
        assert_relative_eq!(e.data()[0].im, 1f64.sin(), epsilon = 1e-12);
    }

    #[test]
    fn test_exp_requires_square() {
        let a = Block::<f64>::zeros(&[2, 3]);
        assert!(matches!(
            matrix_exp(&NaiveBlockBackend, &a),
            Err(TensorError::NotSquareMatrix { rows: 2, cols: 3 })
        ));
    }
}
