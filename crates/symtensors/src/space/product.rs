//! Composite legs built by fusing several legs.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

use smallvec::SmallVec;

use super::VectorSpace;
use crate::error::TensorError;
use crate::strides::increment_index_lex;
use crate::symmetry::{Sector, Symmetry};

/// Sector indices, one per factor leg.
pub type FactorSectors = SmallVec<[usize; 4]>;

/// Where one combination of factor sectors lands inside the composite leg.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FusionEntry {
    /// Sector index on each factor leg.
    pub factor_sectors: FactorSectors,
    /// Index of the fused sector on the composite leg.
    pub sector: usize,
    /// Start of this combination within the multiplicity of `sector`.
    pub offset: usize,
    /// Number of multiplicity slots occupied (product of factor multiplicities
    /// times the fusion multiplicity).
    pub size: usize,
}

#[derive(Debug)]
pub(crate) struct FusionTable {
    entries: Vec<FusionEntry>,
    by_factors: OnceLock<HashMap<FactorSectors, Vec<usize>>>,
    by_sector: OnceLock<Vec<Vec<usize>>>,
    num_sectors: usize,
}

impl FusionTable {
    fn lookup(&self) -> &HashMap<FactorSectors, Vec<usize>> {
        self.by_factors.get_or_init(|| {
            let mut map: HashMap<FactorSectors, Vec<usize>> = HashMap::new();
            for (i, entry) in self.entries.iter().enumerate() {
                map.entry(entry.factor_sectors.clone()).or_default().push(i);
            }
            map
        })
    }

    fn per_sector(&self) -> &[Vec<usize>] {
        self.by_sector.get_or_init(|| {
            let mut groups = vec![Vec::new(); self.num_sectors];
            for (i, entry) in self.entries.iter().enumerate() {
                groups[entry.sector].push(i);
            }
            groups
        })
    }
}

/// Decomposition recipe of a composite leg.
///
/// Stores the factor legs and, for every combination of factor sectors, the
/// fused sector and the slot range it occupies. The lookup indices are built
/// on first use and shared between a composite leg and its dual.
#[derive(Clone, Debug)]
pub struct ProductSpace {
    factors: Vec<VectorSpace>,
    table: Arc<FusionTable>,
}

impl ProductSpace {
    pub fn factors(&self) -> &[VectorSpace] {
        &self.factors
    }

    pub fn entries(&self) -> &[FusionEntry] {
        &self.table.entries
    }

    /// Fusion entries for one combination of factor sectors.
    pub fn entries_for(&self, factor_sectors: &[usize]) -> impl Iterator<Item = &FusionEntry> {
        self.table
            .lookup()
            .get(factor_sectors)
            .into_iter()
            .flatten()
            .map(move |&i| &self.table.entries[i])
    }

    /// Fusion entries landing in a sector of the composite leg, in slot order.
    pub fn entries_in_sector(&self, sector: usize) -> impl Iterator<Item = &FusionEntry> {
        self.table
            .per_sector()
            .get(sector)
            .into_iter()
            .flatten()
            .map(move |&i| &self.table.entries[i])
    }

    pub(crate) fn dual(&self) -> ProductSpace {
        ProductSpace {
            factors: self.factors.iter().map(VectorSpace::dual).collect(),
            table: Arc::clone(&self.table),
        }
    }
}

/// Fuse `factors` into the sectors and multiplicities of a composite leg.
///
/// Combinations of factor sectors are visited in lexicographic order, and each
/// fused sector hands out slots in that order, so combining and splitting
/// are deterministic inverses.
pub(crate) fn fuse_factors(
    symmetry: &Symmetry,
    factors: &[VectorSpace],
    is_dual: bool,
) -> Result<(Vec<Sector>, Vec<usize>, ProductSpace), TensorError> {
    let shape: Vec<usize> = factors.iter().map(VectorSpace::num_sectors).collect();
    let mut pending: Vec<(FactorSectors, Sector, usize)> = Vec::new();

    if !shape.contains(&0) {
        let mut combo = vec![0usize; shape.len()];
        loop {
            let base: usize = combo
                .iter()
                .zip(factors.iter())
                .map(|(&i, leg)| leg.multiplicity(i))
                .product();
            let mut outcomes: Vec<(Sector, usize)> = vec![(symmetry.trivial_sector(), 1)];
            for (&i, leg) in combo.iter().zip(factors.iter()) {
                let sector = leg.sector(i);
                let mut merged: BTreeMap<Sector, usize> = BTreeMap::new();
                for (s, n) in &outcomes {
                    for (fused, m) in symmetry.fusion_outcomes(s, &sector)? {
                        *merged.entry(fused).or_default() += n * m;
                    }
                }
                outcomes = merged.into_iter().collect();
            }
            for (s, n) in outcomes {
                let non_dual = if is_dual { symmetry.dual_sector(&s) } else { s };
                pending.push((combo.iter().copied().collect(), non_dual, n * base));
            }
            if !increment_index_lex(&mut combo, &shape) {
                break;
            }
        }
    }

    let mut totals: BTreeMap<Sector, usize> = BTreeMap::new();
    for (_, s, size) in &pending {
        *totals.entry(s.clone()).or_default() += size;
    }
    let sectors: Vec<Sector> = totals.keys().cloned().collect();
    let multiplicities: Vec<usize> = totals.values().copied().collect();

    let mut next_offset = vec![0usize; sectors.len()];
    let entries = pending
        .into_iter()
        .map(|(factor_sectors, s, size)| {
            // keys of `totals` are exactly `sectors`
            let sector = sectors.binary_search(&s).unwrap_or_default();
            let offset = next_offset[sector];
            next_offset[sector] += size;
            FusionEntry {
                factor_sectors,
                sector,
                offset,
                size,
            }
        })
        .collect();

    let product = ProductSpace {
        factors: factors.to_vec(),
        table: Arc::new(FusionTable {
            entries,
            by_factors: OnceLock::new(),
            by_sector: OnceLock::new(),
            num_sectors: sectors.len(),
        }),
    };
    Ok((sectors, multiplicities, product))
}
