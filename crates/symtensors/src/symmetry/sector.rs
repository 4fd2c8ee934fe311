//! Sector labels.

use smallvec::SmallVec;
use std::fmt;

/// Label of an irreducible representation.
///
/// Sectors of a product symmetry concatenate the labels of the factors.
/// Ordering is lexicographic on the entries, which is the canonical order of
/// sectors within a [`VectorSpace`](crate::VectorSpace).
///
/// # Example
/// ```
/// use symtensors::Sector;
///
/// let a = Sector::new(&[1, 0]);
/// let b = Sector::from([1, 2]);
/// assert!(a < b);
/// assert_eq!(a.len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sector(SmallVec<[i64; 4]>);

impl Sector {
    pub fn new(entries: &[i64]) -> Self {
        Self(entries.iter().copied().collect())
    }

    /// A sector with `len` zero entries.
    pub fn zeros(len: usize) -> Self {
        Self(SmallVec::from_elem(0, len))
    }

    pub fn collect_from<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn entries(&self) -> &[i64] {
        &self.0
    }

    /// Concatenate two sectors, as used by product symmetries.
    pub fn concat(&self, other: &Sector) -> Sector {
        Sector(self.0.iter().chain(other.0.iter()).copied().collect())
    }
}

impl std::ops::Index<usize> for Sector {
    type Output = i64;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "]")
    }
}

impl<const N: usize> From<[i64; N]> for Sector {
    fn from(entries: [i64; N]) -> Self {
        Self::new(&entries)
    }
}

impl From<&[i64]> for Sector {
    fn from(entries: &[i64]) -> Self {
        Self::new(entries)
    }
}

impl From<Vec<i64>> for Sector {
    fn from(entries: Vec<i64>) -> Self {
        Self(SmallVec::from_vec(entries))
    }
}
