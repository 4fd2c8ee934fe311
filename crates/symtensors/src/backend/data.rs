//! Per-tensor block storage.

use crate::block::{Block, BlockIndex};
use crate::error::TensorError;
use crate::scalar::Scalar;

/// The numerical content of a tensor, in the layout of its symmetry backend.
#[derive(Clone, Debug)]
pub enum TensorData<T: Scalar> {
    /// One dense block covering the full shape.
    NoSymmetry(Block<T>),
    /// Symmetry-allowed blocks, keyed by sector indices.
    Abelian(AbelianData<T>),
}

impl<T: Scalar> TensorData<T> {
    /// Layout name used in error messages.
    pub fn layout(&self) -> &'static str {
        match self {
            TensorData::NoSymmetry(_) => "no_symmetry",
            TensorData::Abelian(_) => "abelian",
        }
    }

    /// All stored blocks.
    pub fn blocks(&self) -> &[Block<T>] {
        match self {
            TensorData::NoSymmetry(block) => std::slice::from_ref(block),
            TensorData::Abelian(data) => data.blocks(),
        }
    }

    pub fn cast<U: Scalar>(&self) -> TensorData<U> {
        match self {
            TensorData::NoSymmetry(block) => TensorData::NoSymmetry(block.cast()),
            TensorData::Abelian(data) => TensorData::Abelian(AbelianData {
                block_inds: data.block_inds.clone(),
                blocks: data.blocks.iter().map(Block::cast).collect(),
            }),
        }
    }
}

/// Blocks of an abelian tensor.
///
/// `block_inds[i]` holds, for every leg, the index of the sector that block
/// `blocks[i]` sits in. Block indices are unique and sorted
/// lexicographically; every constructor restores that order.
#[derive(Clone, Debug, Default)]
pub struct AbelianData<T: Scalar> {
    block_inds: Vec<BlockIndex>,
    blocks: Vec<Block<T>>,
}

impl<T: Scalar> AbelianData<T> {
    /// Sort `(index, block)` pairs into canonical order.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::DataLengthMismatch`] if the lists differ in
    /// length and [`TensorError::LegMismatch`] if an index repeats.
    pub fn new(block_inds: Vec<BlockIndex>, blocks: Vec<Block<T>>) -> Result<Self, TensorError> {
        if block_inds.len() != blocks.len() {
            return Err(TensorError::DataLengthMismatch {
                expected: block_inds.len(),
                actual: blocks.len(),
            });
        }
        let mut pairs: Vec<(BlockIndex, Block<T>)> = block_inds.into_iter().zip(blocks).collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        if let Some(w) = pairs.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(TensorError::leg_mismatch(format!("block index {} appears twice", w[0].0)));
        }
        Ok(Self::from_sorted_pairs(pairs))
    }

    /// Build from pairs already in canonical order, e.g. drained from a `BTreeMap`.
    pub(crate) fn from_sorted_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (BlockIndex, Block<T>)>,
    {
        let (block_inds, blocks) = pairs.into_iter().unzip();
        Self { block_inds, blocks }
    }

    pub(crate) fn from_sorted(block_inds: Vec<BlockIndex>, blocks: Vec<Block<T>>) -> Self {
        debug_assert!(block_inds.windows(2).all(|w| w[0] < w[1]));
        Self { block_inds, blocks }
    }

    /// No blocks: the zero tensor.
    pub fn empty() -> Self {
        Self {
            block_inds: Vec::new(),
            blocks: Vec::new(),
        }
    }

    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn block_inds(&self) -> &[BlockIndex] {
        &self.block_inds
    }

    pub fn blocks(&self) -> &[Block<T>] {
        &self.blocks
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut [Block<T>] {
        &mut self.blocks
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BlockIndex, &Block<T>)> {
        self.block_inds.iter().zip(&self.blocks)
    }

    /// The block at `index`, if stored.
    pub fn get(&self, index: &BlockIndex) -> Option<&Block<T>> {
        self.block_inds
            .binary_search(index)
            .ok()
            .map(|i| &self.blocks[i])
    }

    pub fn is_sorted(&self) -> bool {
        self.block_inds.windows(2).all(|w| w[0] < w[1])
    }

    pub fn into_parts(self) -> (Vec<BlockIndex>, Vec<Block<T>>) {
        (self.block_inds, self.blocks)
    }
}
