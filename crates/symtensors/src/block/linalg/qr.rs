//! QR decomposition.

use faer::linalg::solvers::Qr;

use crate::block::Block;
use crate::error::TensorError;
use crate::scalar::Scalar;

/// QR decomposition of an `m × n` matrix.
///
/// Economy mode returns `q: m × k`, `r: k × n` with `k = min(m, n)`. Full
/// mode returns a square unitary `q: m × m` and `r: m × n`.
pub fn qr<T: Scalar>(a: &Block<T>, full: bool) -> Result<(Block<T>, Block<T>), TensorError> {
    let (m, n) = a.matrix_dims()?;
    let k = if full { m } else { m.min(n) };
    if m == 0 || n == 0 {
        let q = if full { Block::identity(m) } else { Block::zeros(&[m, k]) };
        return Ok((q, Block::zeros(&[k, n])));
    }

    let qr: Qr<T> = Qr::new(a.as_mat(m, n));
    let (q, r) = if full {
        (Block::from_mat(qr.compute_Q().as_ref()), Block::from_mat(qr.R()))
    } else {
        (
            Block::from_mat(qr.compute_thin_Q().as_ref()),
            Block::from_mat(qr.thin_R()),
        )
    };
    if q.shape() != [m, k] || r.shape() != [k, n] {
        return Err(TensorError::ShapeMismatch {
            expected: vec![m, k, k, n],
            actual: q.shape().iter().chain(r.shape()).copied().collect(),
        });
    }
    Ok((q, r))
}
