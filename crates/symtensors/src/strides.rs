//! Stride, index and permutation utilities.
//!
//! All blocks use column-major (Fortran) order so they can be viewed as faer
//! matrices without copying.

use crate::error::TensorError;

/// Compute column-major strides from shape.
///
/// For shape [d0, d1, d2, ...], returns strides [1, d0, d0*d1, ...].
///
/// # Examples
///
/// ```
/// use symtensors::strides::compute_strides;
///
/// assert_eq!(compute_strides(&[3, 4, 5]), vec![1, 3, 12]);
/// assert_eq!(compute_strides(&[]), Vec::<usize>::new());
/// ```
pub fn compute_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = Vec::with_capacity(shape.len());
    let mut stride = 1;
    for &dim in shape {
        strides.push(stride);
        stride *= dim;
    }
    strides
}

/// Convert cartesian indices to a linear offset.
#[inline]
pub fn cartesian_to_linear(indices: &[usize], strides: &[usize]) -> usize {
    indices
        .iter()
        .zip(strides.iter())
        .map(|(&idx, &stride)| idx * stride)
        .sum()
}

/// Convert a linear offset to cartesian indices using column-major order.
pub fn linear_to_cartesian(mut linear: usize, shape: &[usize]) -> Vec<usize> {
    let mut indices = Vec::with_capacity(shape.len());
    for &dim in shape {
        indices.push(linear % dim);
        linear /= dim;
    }
    indices
}

/// Advance a multi-index in column-major order (first index fastest).
///
/// Returns `false` once the index wraps around to all zeros, so a loop
/// `loop { ...; if !increment_index(..) { break } }` visits every index once.
#[inline]
pub fn increment_index(index: &mut [usize], shape: &[usize]) -> bool {
    for (i, &dim) in index.iter_mut().zip(shape.iter()) {
        *i += 1;
        if *i < dim {
            return true;
        }
        *i = 0;
    }
    false
}

/// Advance a multi-index in lexicographic order (last index fastest).
#[inline]
pub fn increment_index_lex(index: &mut [usize], shape: &[usize]) -> bool {
    for (i, &dim) in index.iter_mut().zip(shape.iter()).rev() {
        *i += 1;
        if *i < dim {
            return true;
        }
        *i = 0;
    }
    false
}

/// Check that `perm` is a permutation of `0..ndim`.
pub fn validate_permutation(perm: &[usize], ndim: usize) -> Result<(), TensorError> {
    let invalid = || TensorError::InvalidPermutation {
        perm: perm.to_vec(),
        ndim,
    };
    if perm.len() != ndim {
        return Err(invalid());
    }
    let mut seen = vec![false; ndim];
    for &p in perm {
        if p >= ndim || seen[p] {
            return Err(invalid());
        }
        seen[p] = true;
    }
    Ok(())
}

/// The permutation undoing `perm`.
pub fn inverse_permutation(perm: &[usize]) -> Vec<usize> {
    let mut inv = vec![0; perm.len()];
    for (i, &p) in perm.iter().enumerate() {
        inv[p] = i;
    }
    inv
}

pub fn is_identity_permutation(perm: &[usize]) -> bool {
    perm.iter().enumerate().all(|(i, &p)| i == p)
}

/// Axes of `0..ndim` not listed in `used`, in increasing order.
pub fn complement_axes(used: &[usize], ndim: usize) -> Vec<usize> {
    (0..ndim).filter(|ax| !used.contains(ax)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_strides() {
        assert_eq!(compute_strides(&[3, 4, 5]), vec![1, 3, 12]);
        assert_eq!(compute_strides(&[5]), vec![1]);
    }

    #[test]
    fn test_cartesian_linear_roundtrip() {
        let shape = [3, 4, 5];
        let strides = compute_strides(&shape);
        for linear in 0..60 {
            let cartesian = linear_to_cartesian(linear, &shape);
            assert_eq!(cartesian_to_linear(&cartesian, &strides), linear);
        }
    }

    #[test]
    fn test_increment_index_visits_column_major() {
        let shape = [2, 3];
        let mut index = vec![0, 0];
        let mut visited = vec![index.clone()];
        while increment_index(&mut index, &shape) {
            visited.push(index.clone());
        }
        assert_eq!(visited.len(), 6);
        assert_eq!(visited[1], vec![1, 0]);
        assert_eq!(visited[2], vec![0, 1]);
    }

    #[test]
    fn test_increment_index_lex() {
        let shape = [2, 2];
        let mut index = vec![0, 0];
        assert!(increment_index_lex(&mut index, &shape));
        assert_eq!(index, vec![0, 1]);
        assert!(increment_index_lex(&mut index, &shape));
        assert_eq!(index, vec![1, 0]);
    }

    #[test]
    fn test_permutations() {
        assert!(validate_permutation(&[2, 0, 1], 3).is_ok());
        assert!(validate_permutation(&[0, 0, 1], 3).is_err());
        assert!(validate_permutation(&[0, 1], 3).is_err());
        assert_eq!(inverse_permutation(&[2, 0, 1]), vec![1, 2, 0]);
        assert!(is_identity_permutation(&[0, 1, 2]));
        assert_eq!(complement_axes(&[1, 3], 5), vec![0, 2, 4]);
    }
}
