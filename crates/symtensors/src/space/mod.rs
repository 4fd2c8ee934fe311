//! Vector spaces (legs): sectors with multiplicities and a duality flag.

mod product;

pub use product::{FactorSectors, FusionEntry, ProductSpace};

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::error::TensorError;
use crate::symmetry::{Sector, Symmetry};

/// A tensor leg decomposed into symmetry sectors.
///
/// Sectors are stored as the sectors of the non-dual ("ket") space, sorted
/// and unique. A dual leg keeps the same stored sectors and flips `is_dual`;
/// its effective sectors, as returned by [`VectorSpace::sectors`], are the
/// dual sectors in the same order. Sector index `i` therefore refers to
/// the same slice of the leg on a space and its dual.
///
/// # Example
/// ```
/// use symtensors::{Sector, Symmetry, VectorSpace};
///
/// let leg = VectorSpace::new(
///     Symmetry::U1,
///     vec![Sector::from([1]), Sector::from([-1]), Sector::from([1])],
///     vec![2, 1, 1],
///     false,
/// ).unwrap();
/// assert_eq!(leg.non_dual_sectors(), &[Sector::from([-1]), Sector::from([1])]);
/// assert_eq!(leg.multiplicities(), &[1, 3]);
/// assert_eq!(leg.dim(), 4);
/// assert!(leg.can_contract_with(&leg.dual()));
/// ```
#[derive(Clone, Debug)]
pub struct VectorSpace {
    symmetry: Symmetry,
    sectors: Vec<Sector>,
    multiplicities: Vec<usize>,
    is_dual: bool,
    product: Option<Arc<ProductSpace>>,
}

impl VectorSpace {
    /// Create a leg from (possibly unsorted, repeated) non-dual sectors.
    ///
    /// Repeated sectors are merged by summing their multiplicities.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of sectors and multiplicities differ,
    /// a multiplicity is zero, or a sector is invalid for `symmetry`.
    pub fn new(
        symmetry: Symmetry,
        sectors: Vec<Sector>,
        multiplicities: Vec<usize>,
        is_dual: bool,
    ) -> Result<Self, TensorError> {
        symmetry.check()?;
        if sectors.len() != multiplicities.len() {
            return Err(TensorError::InvalidMultiplicity {
                message: format!(
                    "{} sectors but {} multiplicities",
                    sectors.len(),
                    multiplicities.len()
                ),
            });
        }
        let mut merged: BTreeMap<Sector, usize> = BTreeMap::new();
        for (sector, mult) in sectors.into_iter().zip(multiplicities) {
            symmetry.check_sector(&sector)?;
            if mult == 0 {
                return Err(TensorError::InvalidMultiplicity {
                    message: format!("sector {} has multiplicity zero", sector),
                });
            }
            *merged.entry(sector).or_default() += mult;
        }
        Ok(Self {
            symmetry,
            sectors: merged.keys().cloned().collect(),
            multiplicities: merged.into_values().collect(),
            is_dual,
            product: None,
        })
    }

    /// A leg of dimension `dim` without symmetry.
    pub fn non_symmetric(dim: usize) -> Self {
        let (sectors, multiplicities) = if dim == 0 {
            (vec![], vec![])
        } else {
            (vec![Sector::from([0])], vec![dim])
        };
        Self {
            symmetry: Symmetry::NoSymmetry,
            sectors,
            multiplicities,
            is_dual: false,
            product: None,
        }
    }

    /// Fuse several legs into one composite leg.
    ///
    /// The composite leg remembers its factors, so tensors can split it
    /// again. For abelian symmetries its dimension is the product of the
    /// factor dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::SymmetryMismatch`] if the factors do not share
    /// one symmetry.
    pub fn product(factors: &[VectorSpace], is_dual: bool) -> Result<Self, TensorError> {
        let first = factors.first().ok_or_else(|| TensorError::InvalidMultiplicity {
            message: "a product space needs at least one factor".to_string(),
        })?;
        let symmetry = first.symmetry.clone();
        for leg in factors {
            if leg.symmetry != symmetry {
                return Err(TensorError::SymmetryMismatch {
                    expected: symmetry.to_string(),
                    actual: leg.symmetry.to_string(),
                });
            }
        }
        let (sectors, multiplicities, product) = product::fuse_factors(&symmetry, factors, is_dual)?;
        Ok(Self {
            symmetry,
            sectors,
            multiplicities,
            is_dual,
            product: Some(Arc::new(product)),
        })
    }

    pub fn symmetry(&self) -> &Symmetry {
        &self.symmetry
    }

    pub fn is_dual(&self) -> bool {
        self.is_dual
    }

    pub fn num_sectors(&self) -> usize {
        self.sectors.len()
    }

    /// Stored (non-dual) sectors, sorted.
    pub fn non_dual_sectors(&self) -> &[Sector] {
        &self.sectors
    }

    /// Effective sectors, i.e. dualized when the leg is dual.
    pub fn sectors(&self) -> Vec<Sector> {
        (0..self.num_sectors()).map(|i| self.sector(i)).collect()
    }

    /// Effective sector at index `i`.
    pub fn sector(&self, i: usize) -> Sector {
        if self.is_dual {
            self.symmetry.dual_sector(&self.sectors[i])
        } else {
            self.sectors[i].clone()
        }
    }

    pub fn multiplicities(&self) -> &[usize] {
        &self.multiplicities
    }

    #[inline]
    pub fn multiplicity(&self, i: usize) -> usize {
        self.multiplicities[i]
    }

    /// Dense size of sector `i`: irrep dimension times multiplicity.
    pub fn sector_size(&self, i: usize) -> usize {
        self.symmetry.sector_dim(&self.sectors[i]) * self.multiplicities[i]
    }

    pub fn dim(&self) -> usize {
        (0..self.num_sectors()).map(|i| self.sector_size(i)).sum()
    }

    /// Index ranges of each sector in the dense leg.
    pub fn sector_slices(&self) -> Vec<Range<usize>> {
        let mut start = 0;
        (0..self.num_sectors())
            .map(|i| {
                let end = start + self.sector_size(i);
                let range = start..end;
                start = end;
                range
            })
            .collect()
    }

    /// Index of a non-dual sector.
    pub fn sector_index(&self, non_dual: &Sector) -> Option<usize> {
        self.sectors.binary_search(non_dual).ok()
    }

    /// Index of an effective sector.
    pub fn effective_sector_index(&self, sector: &Sector) -> Option<usize> {
        if self.is_dual {
            self.sector_index(&self.symmetry.dual_sector(sector))
        } else {
            self.sector_index(sector)
        }
    }

    /// Whether the leg is one-dimensional and carries the trivial sector.
    pub fn is_trivial(&self) -> bool {
        self.dim() == 1 && self.sectors[0] == self.symmetry.trivial_sector()
    }

    /// The dual leg. Composite legs dualize their factors as well.
    pub fn dual(&self) -> VectorSpace {
        VectorSpace {
            symmetry: self.symmetry.clone(),
            sectors: self.sectors.clone(),
            multiplicities: self.multiplicities.clone(),
            is_dual: !self.is_dual,
            product: self.product.as_ref().map(|p| Arc::new(p.dual())),
        }
    }

    /// Whether `other` is exactly the dual of `self`.
    pub fn can_contract_with(&self, other: &VectorSpace) -> bool {
        self.symmetry == other.symmetry
            && self.sectors == other.sectors
            && self.multiplicities == other.multiplicities
            && self.is_dual != other.is_dual
    }

    pub fn is_product(&self) -> bool {
        self.product.is_some()
    }

    pub fn product_space(&self) -> Option<&ProductSpace> {
        self.product.as_deref()
    }

    /// Factor legs of a composite leg.
    pub fn factors(&self) -> Option<&[VectorSpace]> {
        self.product.as_deref().map(ProductSpace::factors)
    }

    /// The same leg without its composite structure.
    pub fn flattened(&self) -> VectorSpace {
        VectorSpace {
            product: None,
            ..self.clone()
        }
    }
}

impl PartialEq for VectorSpace {
    fn eq(&self, other: &Self) -> bool {
        self.symmetry == other.symmetry
            && self.is_dual == other.is_dual
            && self.sectors == other.sectors
            && self.multiplicities == other.multiplicities
            && self.factors() == other.factors()
    }
}

impl fmt::Display for VectorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VectorSpace({}, sectors=[", self.symmetry)?;
        for (i, (s, m)) in self.sectors.iter().zip(&self.multiplicities).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", s, m)?;
        }
        write!(f, "]")?;
        if self.is_dual {
            write!(f, ", dual")?;
        }
        if let Some(factors) = self.factors() {
            write!(f, ", {} factors", factors.len())?;
        }
        write!(f, ")")
    }
}
