//! Symmetry backend for abelian symmetries.
//!
//! A tensor is stored as the list of its symmetry-allowed blocks. A block
//! is identified by one sector index per leg and is allowed iff the
//! effective sectors of its legs fuse to the trivial sector. Since every
//! abelian sector is one-dimensional, the block at index `(i_0, .., i_n)`
//! has shape `(m_0[i_0], .., m_n[i_n])` with `m_k` the multiplicities of
//! leg `k`.
//!
//! Block lists are kept sorted lexicographically by index. Routines that
//! accumulate results do so in a `BTreeMap`, which yields sorted output
//! directly; routines that permute indices re-sort before returning.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use super::{
    data_mismatch, leg_dims, matrix_legs, square_legs, AbelianData, QrData, SvdData, SymmetryBackend,
    SymmetryBackendKind, TensorData,
};
use crate::block::{Block, BlockBackend, BlockIndex};
use crate::config::{SvdAlgorithm, Tolerance};
use crate::error::TensorError;
use crate::scalar::Scalar;
use crate::space::{FusionEntry, VectorSpace};
use crate::strides::{complement_axes, increment_index_lex, inverse_permutation};
use crate::symmetry::{Sector, Symmetry};

/// Block-sparse backend for abelian symmetries.
#[derive(Clone, Debug, Default)]
pub struct AbelianBackend<B> {
    block_backend: B,
}

impl<B> AbelianBackend<B> {
    pub fn new(block_backend: B) -> Self {
        Self { block_backend }
    }
}

fn blocks<T: Scalar>(data: &TensorData<T>) -> Result<&AbelianData<T>, TensorError> {
    match data {
        TensorData::Abelian(blocks) => Ok(blocks),
        other => Err(data_mismatch("abelian", other)),
    }
}

fn symmetry_of(legs: &[VectorSpace]) -> Symmetry {
    legs.first()
        .map_or(Symmetry::NoSymmetry, |leg| leg.symmetry().clone())
}

/// Shape of the block at `index`.
fn block_shape(legs: &[VectorSpace], index: &BlockIndex) -> Vec<usize> {
    legs.iter()
        .zip(index.coords())
        .map(|(leg, &i)| leg.sector_size(i))
        .collect()
}

fn is_allowed(legs: &[VectorSpace], index: &BlockIndex) -> Result<bool, TensorError> {
    let symmetry = symmetry_of(legs);
    let sectors: Vec<Sector> = legs
        .iter()
        .zip(index.coords())
        .map(|(leg, &i)| leg.sector(i))
        .collect();
    Ok(symmetry.fuse_sectors(&sectors)? == symmetry.trivial_sector())
}

/// Indices of all symmetry-allowed blocks, in lexicographic order.
///
/// The sector of the last leg is fixed by the others, so only the first
/// `n - 1` legs are enumerated.
pub(crate) fn allowed_block_indices(legs: &[VectorSpace]) -> Result<Vec<BlockIndex>, TensorError> {
    let Some((last, rest)) = legs.split_last() else {
        return Ok(vec![BlockIndex::new(&[])]);
    };
    let symmetry = last.symmetry();
    let shape: Vec<usize> = rest.iter().map(VectorSpace::num_sectors).collect();
    if last.num_sectors() == 0 || shape.contains(&0) {
        return Ok(Vec::new());
    }
    let sectors: Vec<Vec<Sector>> = rest.iter().map(VectorSpace::sectors).collect();
    let mut combo = vec![0usize; rest.len()];
    let mut out = Vec::new();
    loop {
        let fused = symmetry.fuse_sectors(combo.iter().zip(&sectors).map(|(&i, s)| &s[i]))?;
        if let Some(j) = last.effective_sector_index(&symmetry.dual_sector(&fused)) {
            out.push(BlockIndex::collect_from(combo.iter().copied().chain([j])));
        }
        if !increment_index_lex(&mut combo, &shape) {
            break;
        }
    }
    Ok(out)
}

/// Add `block` at `index`, summing with a block already there.
fn accumulate<T: Scalar>(
    out: &mut BTreeMap<BlockIndex, Block<T>>,
    index: BlockIndex,
    block: Block<T>,
) -> Result<(), TensorError> {
    match out.entry(index) {
        Entry::Vacant(e) => {
            e.insert(block);
        }
        Entry::Occupied(mut e) => e.get_mut().add_scaled(T::one(), &block)?,
    }
    Ok(())
}

/// Position of each result leg of a combination: an untouched leg or a range of fused legs.
enum CombinedAxis {
    Single(usize),
    Group(Range<usize>),
}

fn combined_layout(num_legs: usize, ranges: &[Range<usize>]) -> Vec<CombinedAxis> {
    let mut layout = Vec::new();
    let mut ranges = ranges.iter().peekable();
    let mut ax = 0;
    while ax < num_legs {
        match ranges.peek() {
            Some(r) if r.start == ax => {
                layout.push(CombinedAxis::Group((*r).clone()));
                ax = r.end.max(ax + 1);
                ranges.next();
            }
            _ => {
                layout.push(CombinedAxis::Single(ax));
                ax += 1;
            }
        }
    }
    layout
}

impl<B> AbelianBackend<B> {
    /// The new leg of a decomposition of `[row, col]`: one sector per
    /// decomposed block, chosen so that blocks `(r, n)` are allowed.
    fn new_leg_for(
        row: &VectorSpace,
        rows: &[usize],
        mults: Vec<usize>,
    ) -> Result<(VectorSpace, Vec<usize>), TensorError> {
        let symmetry = row.symmetry();
        let sectors: Vec<Sector> = rows
            .iter()
            .map(|&r| symmetry.dual_sector(&row.sector(r)))
            .collect();
        let new_leg = VectorSpace::new(symmetry.clone(), sectors.clone(), mults, false)?;
        let positions = sectors
            .iter()
            .map(|s| {
                new_leg
                    .sector_index(s)
                    .ok_or_else(|| TensorError::leg_mismatch(format!("sector {} missing on new leg", s)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((new_leg, positions))
    }
}

impl<T: Scalar, B: BlockBackend<T>> SymmetryBackend<T> for AbelianBackend<B> {
    fn kind(&self) -> SymmetryBackendKind {
        SymmetryBackendKind::Abelian
    }

    fn block_backend(&self) -> &dyn BlockBackend<T> {
        &self.block_backend
    }

    fn supports_symmetry(&self, symmetry: &Symmetry) -> bool {
        symmetry.is_abelian()
    }

    fn check_data(&self, data: &TensorData<T>, legs: &[VectorSpace]) -> Result<(), TensorError> {
        let data = blocks(data)?;
        if !data.is_sorted() {
            return Err(TensorError::leg_mismatch("block indices are not sorted"));
        }
        for (index, block) in data.iter() {
            let in_range = index.len() == legs.len()
                && legs
                    .iter()
                    .zip(index.coords())
                    .all(|(leg, &i)| i < leg.num_sectors());
            if !in_range {
                return Err(TensorError::leg_mismatch(format!("block index {} does not fit the legs", index)));
            }
            if !is_allowed(legs, index)? {
                return Err(TensorError::leg_mismatch(format!("block {} is not symmetry-allowed", index)));
            }
            let shape = block_shape(legs, index);
            if block.shape() != shape.as_slice() {
                return Err(TensorError::ShapeMismatch {
                    expected: shape,
                    actual: block.shape().to_vec(),
                });
            }
        }
        Ok(())
    }

    fn scalar_data(&self, value: T) -> Result<TensorData<T>, TensorError> {
        Ok(TensorData::Abelian(AbelianData::from_sorted(
            vec![BlockIndex::new(&[])],
            vec![Block::scalar(value)],
        )))
    }

    fn zero_data(&self, _legs: &[VectorSpace]) -> Result<TensorData<T>, TensorError> {
        Ok(TensorData::Abelian(AbelianData::empty()))
    }

    fn eye_data(&self, legs: &[VectorSpace]) -> Result<TensorData<T>, TensorError> {
        let shape: Vec<usize> = legs.iter().map(VectorSpace::num_sectors).collect();
        if shape.contains(&0) {
            return Ok(TensorData::Abelian(AbelianData::empty()));
        }
        let mut inds = Vec::new();
        let mut blocks = Vec::new();
        let mut combo = vec![0usize; legs.len()];
        loop {
            let index = BlockIndex::new(&combo);
            let dims = block_shape(legs, &index);
            inds.push(index.concat(&index));
            blocks.push(self.block_backend.eye_block(&dims)?);
            if !increment_index_lex(&mut combo, &shape) {
                break;
            }
        }
        Ok(TensorData::Abelian(AbelianData::from_sorted(inds, blocks)))
    }

    fn from_dense_block(
        &self,
        block: &Block<T>,
        legs: &[VectorSpace],
        tol: Tolerance,
    ) -> Result<TensorData<T>, TensorError> {
        let dims = leg_dims(legs);
        if block.shape() != dims.as_slice() {
            return Err(TensorError::ShapeMismatch {
                expected: dims,
                actual: block.shape().to_vec(),
            });
        }
        let shape: Vec<usize> = legs.iter().map(VectorSpace::num_sectors).collect();
        if shape.contains(&0) {
            return Ok(TensorData::Abelian(AbelianData::empty()));
        }
        let slices: Vec<Vec<Range<usize>>> = legs.iter().map(VectorSpace::sector_slices).collect();
        let mut inds = Vec::new();
        let mut kept = Vec::new();
        let mut discarded = 0.0;
        let mut combo = vec![0usize; legs.len()];
        loop {
            let index = BlockIndex::new(&combo);
            let ranges: Vec<Range<usize>> = combo
                .iter()
                .zip(&slices)
                .map(|(&i, s)| s[i].clone())
                .collect();
            let piece = block.slice(&ranges)?;
            if is_allowed(legs, &index)? {
                inds.push(index);
                kept.push(piece);
            } else {
                discarded += piece.norm_sqr();
            }
            if !increment_index_lex(&mut combo, &shape) {
                break;
            }
        }
        let discarded = discarded.sqrt();
        if !tol.is_close(discarded, block.norm()) {
            return Err(TensorError::SymmetryViolation {
                norm: discarded,
                atol: tol.atol + tol.rtol * block.norm(),
            });
        }
        Ok(TensorData::Abelian(AbelianData::from_sorted(inds, kept)))
    }

    fn to_dense_block(&self, data: &TensorData<T>, legs: &[VectorSpace]) -> Result<Block<T>, TensorError> {
        let data = blocks(data)?;
        let slices: Vec<Vec<Range<usize>>> = legs.iter().map(VectorSpace::sector_slices).collect();
        let mut dense = self.block_backend.zero_block(&leg_dims(legs));
        for (index, block) in data.iter() {
            let offsets: Vec<usize> = index
                .coords()
                .iter()
                .zip(&slices)
                .map(|(&i, s)| s[i].start)
                .collect();
            dense.assign_slice(&offsets, block)?;
        }
        Ok(dense)
    }

    fn from_block_func(
        &self,
        legs: &[VectorSpace],
        func: &mut dyn FnMut(&[usize]) -> Block<T>,
    ) -> Result<TensorData<T>, TensorError> {
        let inds = allowed_block_indices(legs)?;
        let mut blocks = Vec::with_capacity(inds.len());
        for index in &inds {
            let shape = block_shape(legs, index);
            let block = func(&shape);
            if block.shape() != shape.as_slice() {
                return Err(TensorError::ShapeMismatch {
                    expected: shape,
                    actual: block.shape().to_vec(),
                });
            }
            blocks.push(block);
        }
        Ok(TensorData::Abelian(AbelianData::from_sorted(inds, blocks)))
    }

    fn tdot(
        &self,
        a: &TensorData<T>,
        b: &TensorData<T>,
        axs_a: &[usize],
        axs_b: &[usize],
    ) -> Result<TensorData<T>, TensorError> {
        let (a, b) = (blocks(a)?, blocks(b)?);
        let (Some(first_a), Some(first_b)) = (a.block_inds().first(), b.block_inds().first()) else {
            return Ok(TensorData::Abelian(AbelianData::empty()));
        };
        let open_a = complement_axes(axs_a, first_a.len());
        let open_b = complement_axes(axs_b, first_b.len());

        // join on the sector indices of the contracted legs; a leg and its
        // dual share sector indices
        let mut by_key: HashMap<BlockIndex, Vec<usize>> = HashMap::new();
        for (j, index) in b.block_inds().iter().enumerate() {
            by_key.entry(index.select(axs_b)).or_default().push(j);
        }

        let mut out = BTreeMap::new();
        for (index_a, block_a) in a.iter() {
            let Some(partners) = by_key.get(&index_a.select(axs_a)) else {
                continue;
            };
            let open_index_a = index_a.select(&open_a);
            for &j in partners {
                let index_b = &b.block_inds()[j];
                let index = open_index_a.concat(&index_b.select(&open_b));
                tracing::trace!(a = %index_a, b = %index_b, out = %index, "contracting block pair");
                let product = self
                    .block_backend
                    .block_tdot(block_a, &b.blocks()[j], axs_a, axs_b)?;
                accumulate(&mut out, index, product)?;
            }
        }
        Ok(TensorData::Abelian(AbelianData::from_sorted_pairs(out)))
    }

    fn inner(
        &self,
        a: &TensorData<T>,
        b: &TensorData<T>,
        do_conj: bool,
        axs2: Option<&[usize]>,
    ) -> Result<T, TensorError> {
        let (a, b) = (blocks(a)?, blocks(b)?);
        let to_b = axs2.map(inverse_permutation);
        let mut acc = T::zero();
        for (index, block_a) in a.iter() {
            let index_b = match &to_b {
                Some(perm) => index.permute(perm),
                None => index.clone(),
            };
            if let Some(block_b) = b.get(&index_b) {
                acc += self.block_backend.block_inner(block_a, block_b, do_conj, axs2)?;
            }
        }
        Ok(acc)
    }

    fn transpose(&self, data: &TensorData<T>, perm: &[usize]) -> Result<TensorData<T>, TensorError> {
        let data = blocks(data)?;
        let mut inds = Vec::with_capacity(data.num_blocks());
        let mut transposed = Vec::with_capacity(data.num_blocks());
        for (index, block) in data.iter() {
            inds.push(index.permute(perm));
            transposed.push(self.block_backend.block_transpose(block, perm)?);
        }
        Ok(TensorData::Abelian(AbelianData::new(inds, transposed)?))
    }

    fn trace_full(&self, data: &TensorData<T>, idcs1: &[usize], idcs2: &[usize]) -> Result<T, TensorError> {
        let data = blocks(data)?;
        let mut acc = T::zero();
        for (index, block) in data.iter() {
            if idcs1.iter().zip(idcs2).all(|(&i, &j)| index[i] == index[j]) {
                acc += self.block_backend.block_trace_full(block, idcs1, idcs2)?;
            }
        }
        Ok(acc)
    }

    fn trace_partial(
        &self,
        data: &TensorData<T>,
        idcs1: &[usize],
        idcs2: &[usize],
        remaining: &[usize],
    ) -> Result<TensorData<T>, TensorError> {
        let data = blocks(data)?;
        let mut out = BTreeMap::new();
        for (index, block) in data.iter() {
            if idcs1.iter().zip(idcs2).all(|(&i, &j)| index[i] == index[j]) {
                let traced = self
                    .block_backend
                    .block_trace_partial(block, idcs1, idcs2, remaining)?;
                accumulate(&mut out, index.select(remaining), traced)?;
            }
        }
        Ok(TensorData::Abelian(AbelianData::from_sorted_pairs(out)))
    }

    fn conj(&self, data: &TensorData<T>) -> Result<TensorData<T>, TensorError> {
        let data = blocks(data)?;
        Ok(TensorData::Abelian(AbelianData::from_sorted(
            data.block_inds().to_vec(),
            data.blocks()
                .iter()
                .map(|b| self.block_backend.block_conj(b))
                .collect(),
        )))
    }

    fn combine_legs(
        &self,
        data: &TensorData<T>,
        legs: &[VectorSpace],
        ranges: &[Range<usize>],
        new_legs: &[VectorSpace],
    ) -> Result<TensorData<T>, TensorError> {
        let data = blocks(data)?;
        let layout = combined_layout(legs.len(), ranges);
        if layout.len() != new_legs.len() {
            return Err(TensorError::leg_mismatch(format!(
                "combining into {} legs, but {} new legs given",
                layout.len(),
                new_legs.len()
            )));
        }

        let mut out: BTreeMap<BlockIndex, Block<T>> = BTreeMap::new();
        for (index, block) in data.iter() {
            let mut coords = Vec::with_capacity(layout.len());
            let mut offsets = Vec::with_capacity(layout.len());
            let mut fused_shape = Vec::with_capacity(layout.len());
            for (ax, axis) in layout.iter().enumerate() {
                match axis {
                    CombinedAxis::Single(old) => {
                        coords.push(index[*old]);
                        offsets.push(0);
                        fused_shape.push(block.shape()[*old]);
                    }
                    CombinedAxis::Group(range) => {
                        let product = new_legs[ax]
                            .product_space()
                            .ok_or(TensorError::NotAProductSpace { index: ax })?;
                        let entry = product.entries_for(&index.coords()[range.clone()]).next().ok_or_else(|| {
                            TensorError::leg_mismatch(format!("no fusion entry for block {}", index))
                        })?;
                        coords.push(entry.sector);
                        offsets.push(entry.offset);
                        fused_shape.push(entry.size);
                    }
                }
            }
            let new_index = BlockIndex::new(&coords);
            // legs of a group are adjacent, so fusing them is a reshape
            let fused = self.block_backend.block_reshape(block, &fused_shape)?;
            let target = match out.entry(new_index) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => {
                    let shape = block_shape(new_legs, e.key());
                    e.insert(self.block_backend.zero_block(&shape))
                }
            };
            target.assign_slice(&offsets, &fused)?;
        }
        Ok(TensorData::Abelian(AbelianData::from_sorted_pairs(out)))
    }

    fn split_legs(
        &self,
        data: &TensorData<T>,
        legs: &[VectorSpace],
        idcs: &[usize],
    ) -> Result<TensorData<T>, TensorError> {
        let data = blocks(data)?;
        let mut products = Vec::with_capacity(idcs.len());
        for &i in idcs {
            let product = legs
                .get(i)
                .and_then(VectorSpace::product_space)
                .ok_or(TensorError::NotAProductSpace { index: i })?;
            products.push(product);
        }

        let mut inds = Vec::new();
        let mut pieces = Vec::new();
        for (index, block) in data.iter() {
            let options: Vec<Vec<&FusionEntry>> = idcs
                .iter()
                .zip(&products)
                .map(|(&i, p)| p.entries_in_sector(index[i]).collect())
                .collect();
            let counts: Vec<usize> = options.iter().map(Vec::len).collect();
            if counts.contains(&0) {
                continue;
            }
            let mut choice = vec![0usize; idcs.len()];
            loop {
                let mut ranges: Vec<Range<usize>> = block.shape().iter().map(|&d| 0..d).collect();
                let mut coords = Vec::new();
                let mut shape = Vec::new();
                for (ax, &c) in index.coords().iter().enumerate() {
                    match idcs.iter().position(|&i| i == ax) {
                        Some(k) => {
                            let entry = options[k][choice[k]];
                            ranges[ax] = entry.offset..entry.offset + entry.size;
                            for (factor, &s) in products[k].factors().iter().zip(&entry.factor_sectors) {
                                coords.push(s);
                                shape.push(factor.sector_size(s));
                            }
                        }
                        None => {
                            coords.push(c);
                            shape.push(block.shape()[ax]);
                        }
                    }
                }
                let piece = block.slice(&ranges)?;
                inds.push(BlockIndex::new(&coords));
                pieces.push(self.block_backend.block_reshape(&piece, &shape)?);
                if !increment_index_lex(&mut choice, &counts) {
                    break;
                }
            }
        }
        Ok(TensorData::Abelian(AbelianData::new(inds, pieces)?))
    }

    fn squeeze_legs(&self, data: &TensorData<T>, idcs: &[usize]) -> Result<TensorData<T>, TensorError> {
        let data = blocks(data)?;
        let mut inds = Vec::with_capacity(data.num_blocks());
        let mut squeezed = Vec::with_capacity(data.num_blocks());
        for (index, block) in data.iter() {
            inds.push(index.remove(idcs));
            squeezed.push(self.block_backend.block_squeeze_legs(block, idcs)?);
        }
        Ok(TensorData::Abelian(AbelianData::new(inds, squeezed)?))
    }

    fn linear_combination(
        &self,
        a_coef: T,
        a: &TensorData<T>,
        b_coef: T,
        b: &TensorData<T>,
    ) -> Result<TensorData<T>, TensorError> {
        let (a, b) = (blocks(a)?, blocks(b)?);
        let mut out: BTreeMap<BlockIndex, Block<T>> = a
            .iter()
            .map(|(index, block)| (index.clone(), block.scale(a_coef)))
            .collect();
        for (index, block) in b.iter() {
            accumulate(&mut out, index.clone(), block.scale(b_coef))?;
        }
        Ok(TensorData::Abelian(AbelianData::from_sorted_pairs(out)))
    }

    fn scale(&self, data: &TensorData<T>, factor: T) -> Result<TensorData<T>, TensorError> {
        let data = blocks(data)?;
        let mut scaled = data.clone();
        for block in scaled.blocks_mut() {
            block.scale_inplace(factor);
        }
        Ok(TensorData::Abelian(scaled))
    }

    fn norm(&self, data: &TensorData<T>) -> Result<f64, TensorError> {
        Ok(blocks(data)?
            .blocks()
            .iter()
            .map(Block::norm_sqr)
            .sum::<f64>()
            .sqrt())
    }

    fn max_abs(&self, data: &TensorData<T>) -> Result<f64, TensorError> {
        Ok(blocks(data)?
            .blocks()
            .iter()
            .map(|b| self.block_backend.block_max_abs(b))
            .fold(0.0, f64::max))
    }

    fn almost_equal(&self, a: &TensorData<T>, b: &TensorData<T>, tol: Tolerance) -> Result<bool, TensorError> {
        let (a, b) = (blocks(a)?, blocks(b)?);
        let close = |x: &Block<T>, y: &Block<T>| self.block_backend.block_allclose(x, y, tol.rtol, tol.atol);
        for (index, block_a) in a.iter() {
            let equal = match b.get(index) {
                Some(block_b) => close(block_a, block_b),
                None => close(block_a, &Block::zeros(block_a.shape())),
            };
            if !equal {
                return Ok(false);
            }
        }
        // blocks only present in b must vanish
        for (index, block_b) in b.iter() {
            if a.get(index).is_none() && !close(&Block::zeros(block_b.shape()), block_b) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn item(&self, data: &TensorData<T>) -> Result<T, TensorError> {
        let data = blocks(data)?;
        match data.blocks() {
            [] => Ok(T::zero()),
            [block] => self.block_backend.block_item(block),
            many => Err(TensorError::NotScalar {
                size: many.iter().map(Block::len).sum(),
            }),
        }
    }

    fn svd(
        &self,
        data: &TensorData<T>,
        legs: &[VectorSpace],
        algorithm: SvdAlgorithm,
    ) -> Result<SvdData<T>, TensorError> {
        let (row, _) = matrix_legs(legs)?;
        let data = blocks(data)?;
        let mut rows = Vec::with_capacity(data.num_blocks());
        let mut decompositions = Vec::with_capacity(data.num_blocks());
        for (index, block) in data.iter() {
            rows.push(index[0]);
            decompositions.push((index[1], self.block_backend.matrix_svd(block, algorithm)?));
        }
        let mults = decompositions.iter().map(|(_, svd)| svd.s.len()).collect();
        let (new_leg, positions) = Self::new_leg_for(row, &rows, mults)?;

        let (mut u_inds, mut s_inds, mut vh_inds) = (Vec::new(), Vec::new(), Vec::new());
        let (mut u_blocks, mut s_blocks, mut vh_blocks) = (Vec::new(), Vec::new(), Vec::new());
        for ((&r, &n), (c, svd)) in rows.iter().zip(&positions).zip(decompositions) {
            let k = svd.s.len();
            u_inds.push(BlockIndex::new(&[r, n]));
            s_inds.push(BlockIndex::new(&[n, n]));
            vh_inds.push(BlockIndex::new(&[n, c]));
            u_blocks.push(svd.u);
            s_blocks.push(Block::from_fn(&[k, k], |idx| {
                if idx[0] == idx[1] {
                    T::from_f64(svd.s[idx[0]])
                } else {
                    T::zero()
                }
            }));
            vh_blocks.push(svd.vh);
        }
        Ok(SvdData {
            u: TensorData::Abelian(AbelianData::new(u_inds, u_blocks)?),
            s: TensorData::Abelian(AbelianData::new(s_inds, s_blocks)?),
            vh: TensorData::Abelian(AbelianData::new(vh_inds, vh_blocks)?),
            new_leg,
        })
    }

    fn qr(&self, data: &TensorData<T>, legs: &[VectorSpace], full: bool) -> Result<QrData<T>, TensorError> {
        let (row, _) = matrix_legs(legs)?;
        let data = blocks(data)?;
        // rows without a block still need a unitary Q block in full mode
        let mut by_row: BTreeMap<usize, Option<(usize, Block<T>, Block<T>)>> = BTreeMap::new();
        if full {
            for r in 0..row.num_sectors() {
                by_row.insert(r, None);
            }
        }
        for (index, block) in data.iter() {
            let (q, r) = self.block_backend.matrix_qr(block, full)?;
            by_row.insert(index[0], Some((index[1], q, r)));
        }
        let rows: Vec<usize> = by_row.keys().copied().collect();
        let mults = by_row
            .iter()
            .map(|(&r, entry)| entry.as_ref().map_or(row.sector_size(r), |(_, q, _)| q.shape()[1]))
            .collect();
        let (new_leg, positions) = Self::new_leg_for(row, &rows, mults)?;

        let (mut q_inds, mut r_inds, mut q_blocks, mut r_blocks) = (Vec::new(), Vec::new(), Vec::new(), Vec::new());
        for ((r, entry), n) in by_row.into_iter().zip(positions) {
            q_inds.push(BlockIndex::new(&[r, n]));
            match entry {
                Some((c, q, r_block)) => {
                    q_blocks.push(q);
                    r_inds.push(BlockIndex::new(&[n, c]));
                    r_blocks.push(r_block);
                }
                None => q_blocks.push(Block::identity(row.sector_size(r))),
            }
        }
        Ok(QrData {
            q: TensorData::Abelian(AbelianData::new(q_inds, q_blocks)?),
            r: TensorData::Abelian(AbelianData::new(r_inds, r_blocks)?),
            new_leg,
        })
    }

    fn exp(&self, data: &TensorData<T>, legs: &[VectorSpace]) -> Result<TensorData<T>, TensorError> {
        let leg = square_legs(legs)?;
        let data = blocks(data)?;
        let mut inds = Vec::with_capacity(leg.num_sectors());
        let mut out = Vec::with_capacity(leg.num_sectors());
        for i in 0..leg.num_sectors() {
            let index = BlockIndex::new(&[i, i]);
            // a missing block is zero, and exp(0) is the identity
            let block = match data.get(&index) {
                Some(block) => self.block_backend.matrix_exp(block)?,
                None => Block::identity(leg.sector_size(i)),
            };
            inds.push(index);
            out.push(block);
        }
        Ok(TensorData::Abelian(AbelianData::from_sorted(inds, out)))
    }

    fn log(&self, data: &TensorData<T>, legs: &[VectorSpace]) -> Result<TensorData<T>, TensorError> {
        let leg = square_legs(legs)?;
        let data = blocks(data)?;
        let mut inds = Vec::with_capacity(leg.num_sectors());
        let mut out = Vec::with_capacity(leg.num_sectors());
        for i in 0..leg.num_sectors() {
            let index = BlockIndex::new(&[i, i]);
            let block = data.get(&index).ok_or_else(|| TensorError::MatrixLogError {
                message: format!("block {} is zero, the logarithm is undefined", index),
            })?;
            inds.push(index);
            out.push(self.block_backend.matrix_log(block)?);
        }
        Ok(TensorData::Abelian(AbelianData::from_sorted(inds, out)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::FaerBlockBackend;
    use approx::assert_relative_eq;

    fn u1(charges: &[i64], mults: &[usize], is_dual: bool) -> VectorSpace {
        VectorSpace::new(
            Symmetry::U1,
            charges.iter().map(|&c| Sector::from([c])).collect(),
            mults.to_vec(),
            is_dual,
        )
        .unwrap()
    }

    fn counting(legs: &[VectorSpace]) -> TensorData<f64> {
        let backend = AbelianBackend::new(FaerBlockBackend::default());
        let mut next = 0.0;
        backend
            .from_block_func(legs, &mut |shape| {
                Block::from_fn(shape, |_| {
                    next += 1.0;
                    next
                })
            })
            .unwrap()
    }

    #[test]
    fn test_allowed_block_indices() {
        let legs = [u1(&[0, 1], &[1, 2], false), u1(&[0, 1], &[2, 1], true)];
        let inds = allowed_block_indices(&legs).unwrap();
        let coords: Vec<&[usize]> = inds.iter().map(BlockIndex::coords).collect();
        assert_eq!(coords, vec![&[0, 0][..], &[1, 1][..]]);
        for index in &inds {
            assert!(is_allowed(&legs, index).unwrap());
        }
    }

    #[test]
    fn test_dense_round_trip_and_violation() {
        let backend = AbelianBackend::new(FaerBlockBackend::default());
        let legs = [u1(&[-1, 1], &[1, 1], false), u1(&[-1, 1], &[1, 1], true)];
        // diag(2, 3) respects the symmetry
        let dense = Block::from_vec(vec![2.0, 0.0, 0.0, 3.0], &[2, 2]).unwrap();
        let data = backend.from_dense_block(&dense, &legs, Tolerance::default()).unwrap();
        backend.check_data(&data, &legs).unwrap();
        assert_eq!(backend.to_dense_block(&data, &legs).unwrap(), dense);

        let bad = Block::from_vec(vec![2.0, 1.0, 0.0, 3.0], &[2, 2]).unwrap();
        assert!(matches!(
            backend.from_dense_block(&bad, &legs, Tolerance::default()),
            Err(TensorError::SymmetryViolation { .. })
        ));
    }

    #[test]
    fn test_tdot_matches_dense() {
        let backend = AbelianBackend::new(FaerBlockBackend::default());
        let a_legs = [u1(&[0, 1, 2], &[1, 2, 1], false), u1(&[0, 1], &[2, 1], true), u1(&[-1, 0, 1], &[1, 1, 2], false)];
        let b_legs = [a_legs[2].dual(), u1(&[0, 1, 2], &[1, 1, 1], true)];
        let a = counting(&a_legs);
        let b = counting(&b_legs);
        let c = backend.tdot(&a, &b, &[2], &[0]).unwrap();
        let c_legs = [a_legs[0].clone(), a_legs[1].clone(), b_legs[1].clone()];
        backend.check_data(&c, &c_legs).unwrap();

        let dense_a = backend.to_dense_block(&a, &a_legs).unwrap();
        let dense_b = backend.to_dense_block(&b, &b_legs).unwrap();
        let expected = backend.block_backend.block_tdot(&dense_a, &dense_b, &[2], &[0]).unwrap();
        let actual = backend.to_dense_block(&c, &c_legs).unwrap();
        for (x, y) in actual.data().iter().zip(expected.data()) {
            assert_relative_eq!(x, y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_combine_split_round_trip() {
        let backend = AbelianBackend::new(FaerBlockBackend::default());
        let legs = vec![u1(&[0, 1], &[1, 2], false), u1(&[-1, 0, 1], &[2, 1, 1], false), u1(&[0, 1], &[1, 1], true)];
        let data = counting(&legs);
        let product = VectorSpace::product(&legs[..2], false).unwrap();
        let new_legs = vec![product, legs[2].clone()];
        let combined = backend.combine_legs(&data, &legs, &[0..2], &new_legs).unwrap();
        backend.check_data(&combined, &new_legs).unwrap();
        assert_relative_eq!(backend.norm(&combined).unwrap(), backend.norm(&data).unwrap(), epsilon = 1e-12);

        let split = backend.split_legs(&combined, &new_legs, &[0]).unwrap();
        backend.check_data(&split, &legs).unwrap();
        assert!(backend.almost_equal(&split, &data, Tolerance::default()).unwrap());
    }

    #[test]
    fn test_exp_fills_missing_blocks() {
        let backend = AbelianBackend::new(FaerBlockBackend::default());
        let leg = u1(&[0, 1], &[2, 1], false);
        let legs = [leg.clone(), leg.dual()];
        let zero: TensorData<f64> = backend.zero_data(&legs).unwrap();
        let e = backend.exp(&zero, &legs).unwrap();
        let eye = backend.eye_data(&[leg]).unwrap();
        assert!(backend.almost_equal(&e, &eye, Tolerance::default()).unwrap());
        assert!(matches!(backend.log(&zero, &legs), Err(TensorError::MatrixLogError { .. })));
    }
}
