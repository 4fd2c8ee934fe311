//! Block indices of symmetric tensors.
//!
//! A block index holds one sector index per leg and identifies a block in
//! the storage of an abelian tensor.

use smallvec::SmallVec;
use std::hash::{Hash, Hasher};

/// Sector indices (one per leg) with a precomputed hash.
///
/// Ordering is lexicographic, which is the order blocks are stored in.
///
/// # Example
/// ```
/// use symtensors::BlockIndex;
///
/// let idx = BlockIndex::new(&[2, 0, 1]);
/// assert_eq!(idx.select(&[2, 0]).coords(), &[1, 2]);
/// assert!(BlockIndex::new(&[0, 5]) < BlockIndex::new(&[1, 0]));
/// ```
#[derive(Clone, Debug)]
pub struct BlockIndex {
    coords: SmallVec<[usize; 8]>,
    hash: u64,
}

impl BlockIndex {
    pub fn new(coords: &[usize]) -> Self {
        Self::collect_from(coords.iter().copied())
    }

    pub fn collect_from<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let coords: SmallVec<[usize; 8]> = iter.into_iter().collect();
        let hash = compute_hash(&coords);
        Self { coords, hash }
    }

    /// Number of legs.
    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    #[inline]
    pub fn coords(&self) -> &[usize] {
        &self.coords
    }

    /// Entry `i` of the result is entry `perm[i]` of `self`.
    pub fn permute(&self, perm: &[usize]) -> Self {
        self.select(perm)
    }

    /// Sector indices on the given legs, in the given order.
    pub fn select(&self, axes: &[usize]) -> Self {
        Self::collect_from(axes.iter().map(|&i| self.coords[i]))
    }

    /// Drop the entries on the given legs.
    pub fn remove(&self, axes: &[usize]) -> Self {
        Self::collect_from(
            self.coords
                .iter()
                .enumerate()
                .filter(|(i, _)| !axes.contains(i))
                .map(|(_, &c)| c),
        )
    }

    pub fn concat(&self, other: &BlockIndex) -> Self {
        Self::collect_from(self.coords.iter().chain(other.coords.iter()).copied())
    }
}

impl std::ops::Index<usize> for BlockIndex {
    type Output = usize;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.coords[index]
    }
}

impl PartialEq for BlockIndex {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.coords == other.coords
    }
}

impl Eq for BlockIndex {}

impl Hash for BlockIndex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialOrd for BlockIndex {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BlockIndex {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.coords.cmp(&other.coords)
    }
}

impl std::fmt::Display for BlockIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.coords.as_slice())
    }
}

/// FNV-1a over the coordinates.
fn compute_hash(coords: &[usize]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut hash = FNV_OFFSET;
    for &coord in coords {
        hash ^= coord as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

impl<const N: usize> From<[usize; N]> for BlockIndex {
    fn from(coords: [usize; N]) -> Self {
        Self::new(&coords)
    }
}

impl From<Vec<usize>> for BlockIndex {
    fn from(coords: Vec<usize>) -> Self {
        Self::new(&coords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};

    #[test]
    fn test_select_remove_concat() {
        let idx = BlockIndex::from([3, 1, 4, 1]);
        assert_eq!(idx.select(&[1, 2]).coords(), &[1, 4]);
        assert_eq!(idx.remove(&[0, 2]).coords(), &[1, 1]);
        let joined = idx.select(&[0]).concat(&BlockIndex::from([9]));
        assert_eq!(joined, BlockIndex::from([3, 9]));
        assert_eq!(idx.permute(&[3, 2, 1, 0]), BlockIndex::from([1, 4, 1, 3]));
    }

    #[test]
    fn test_btreemap_iterates_sorted() {
        let mut map = BTreeMap::new();
        for coords in [[1, 0], [0, 2], [0, 1]] {
            map.insert(BlockIndex::from(coords), ());
        }
        let keys: Vec<_> = map.keys().map(|k| k.coords().to_vec()).collect();
        assert_eq!(keys, vec![vec![0, 1], vec![0, 2], vec![1, 0]]);
    }

    #[test]
    fn test_hash_lookup() {
        let mut map = HashMap::new();
        map.insert(BlockIndex::from([1, 2]), "a");
        assert_eq!(map.get(&BlockIndex::new(&[1, 2])), Some(&"a"));
        assert_eq!(map.get(&BlockIndex::new(&[2, 1])), None);
    }

    #[test]
    fn test_empty_index() {
        let idx = BlockIndex::new(&[]);
        assert!(idx.is_empty());
        assert_eq!(idx.to_string(), "[]");
    }
}
