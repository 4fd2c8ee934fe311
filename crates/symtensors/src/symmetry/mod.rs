//! Symmetry groups: sector validity, fusion rules and duality.
//!
//! ```text
//! Symmetry
//!   ├── NoSymmetry        single sector [0]
//!   ├── U1                sectors [n], n ∈ Z,        a ⊗ b = a + b
//!   ├── ZN(N)             sectors [n], 0 <= n < N,   a ⊗ b = (a + b) mod N
//!   ├── FermionParity     sectors [0] / [1],         Z_2 with fermionic meaning
//!   ├── SU2               sectors [2j],              |a-b|, ..., a+b (step 2)
//!   └── Product(factors)  concatenated sectors,      cartesian product of factor fusions
//! ```

mod sector;

pub use sector::Sector;

use std::fmt;

use crate::error::TensorError;

/// A symmetry group acting on tensor legs.
///
/// Symmetries are small value objects compared by structure.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Symmetry {
    NoSymmetry,
    U1,
    ZN(u32),
    FermionParity,
    SU2,
    Product(Vec<Symmetry>),
}

impl Symmetry {
    /// Number of integers identifying one sector.
    pub fn sector_ind_len(&self) -> usize {
        match self {
            Symmetry::Product(factors) => factors.iter().map(Symmetry::sector_ind_len).sum(),
            _ => 1,
        }
    }

    /// Whether all fusion outcomes are unique with multiplicity one.
    pub fn is_abelian(&self) -> bool {
        match self {
            Symmetry::SU2 => false,
            Symmetry::Product(factors) => factors.iter().all(Symmetry::is_abelian),
            _ => true,
        }
    }

    /// Whether this symmetry has no non-trivial sectors.
    pub fn is_trivial(&self) -> bool {
        match self {
            Symmetry::NoSymmetry => true,
            Symmetry::Product(factors) => factors.iter().all(Symmetry::is_trivial),
            _ => false,
        }
    }

    /// Check that the group itself is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::InvalidSymmetry`] for `ZN(0)`, anywhere in a
    /// product.
    pub fn check(&self) -> Result<(), TensorError> {
        match self {
            Symmetry::ZN(0) => Err(TensorError::InvalidSymmetry {
                symmetry: self.to_string(),
                message: "Z_N needs N >= 1".to_string(),
            }),
            Symmetry::Product(factors) => factors.iter().try_for_each(Symmetry::check),
            _ => Ok(()),
        }
    }

    pub fn trivial_sector(&self) -> Sector {
        Sector::zeros(self.sector_ind_len())
    }

    /// Check that `sector` labels an irrep of this symmetry.
    pub fn is_valid_sector(&self, sector: &Sector) -> bool {
        if sector.len() != self.sector_ind_len() {
            return false;
        }
        match self {
            Symmetry::NoSymmetry => sector[0] == 0,
            // i64::MIN has no dual
            Symmetry::U1 => sector[0] != i64::MIN,
            Symmetry::ZN(n) => sector[0] >= 0 && sector[0] < *n as i64,
            Symmetry::FermionParity => sector[0] == 0 || sector[0] == 1,
            Symmetry::SU2 => sector[0] >= 0,
            Symmetry::Product(factors) => self
                .split_sector(sector)
                .iter()
                .zip(factors.iter())
                .all(|(part, factor)| factor.is_valid_sector(part)),
        }
    }

    /// Validate a sector, reporting why it is rejected.
    pub fn check_sector(&self, sector: &Sector) -> Result<(), TensorError> {
        self.check()?;
        let expected = self.sector_ind_len();
        if sector.len() != expected {
            return Err(TensorError::SectorLengthMismatch {
                sector: sector.to_string(),
                symmetry: self.to_string(),
                expected,
                actual: sector.len(),
            });
        }
        if !self.is_valid_sector(sector) {
            return Err(TensorError::InvalidSector {
                sector: sector.to_string(),
                symmetry: self.to_string(),
            });
        }
        Ok(())
    }

    /// The sector of the dual (conjugate) representation.
    pub fn dual_sector(&self, sector: &Sector) -> Sector {
        match self {
            Symmetry::NoSymmetry | Symmetry::FermionParity | Symmetry::SU2 => sector.clone(),
            Symmetry::U1 => Sector::from([sector[0].saturating_neg()]),
            Symmetry::ZN(0) => sector.clone(),
            Symmetry::ZN(n) => {
                let n = *n as i64;
                Sector::from([(-(sector[0] % n)).rem_euclid(n)])
            }
            Symmetry::Product(factors) => Sector::collect_from(
                self.split_sector(sector)
                    .iter()
                    .zip(factors.iter())
                    .flat_map(|(part, factor)| factor.dual_sector(part).entries().to_vec()),
            ),
        }
    }

    /// Dimension of the irrep labelled by `sector`. One for abelian sectors.
    pub fn sector_dim(&self, sector: &Sector) -> usize {
        match self {
            Symmetry::SU2 => sector[0] as usize + 1,
            Symmetry::Product(factors) => self
                .split_sector(sector)
                .iter()
                .zip(factors.iter())
                .map(|(part, factor)| factor.sector_dim(part))
                .product(),
            _ => 1,
        }
    }

    /// All outcomes of fusing `a` with `b`, with their multiplicities.
    ///
    /// Abelian symmetries always produce exactly one outcome of
    /// multiplicity one.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::SectorLengthMismatch`] if either sector has the
    /// wrong length for this symmetry.
    ///
    /// # Example
    ///
    /// ```
    /// use symtensors::{Sector, Symmetry};
    ///
    /// let outcomes = Symmetry::SU2.fusion_outcomes(&Sector::from([1]), &Sector::from([1])).unwrap();
    /// assert_eq!(outcomes, vec![(Sector::from([0]), 1), (Sector::from([2]), 1)]);
    /// ```
    pub fn fusion_outcomes(&self, a: &Sector, b: &Sector) -> Result<Vec<(Sector, usize)>, TensorError> {
        self.check()?;
        self.check_len(a)?;
        self.check_len(b)?;
        self.fuse_unchecked(a, b)
    }

    /// The unique fusion outcome of an abelian symmetry.
    pub fn fuse_abelian(&self, a: &Sector, b: &Sector) -> Result<Sector, TensorError> {
        if !self.is_abelian() {
            return Err(TensorError::NotSupported {
                what: format!("unique fusion outcome for non-abelian symmetry {}", self),
            });
        }
        self.check()?;
        self.check_len(a)?;
        self.check_len(b)?;
        self.fuse_abelian_unchecked(a, b)
    }

    /// Fold [`Symmetry::fuse_abelian`] over any number of sectors.
    pub fn fuse_sectors<'a, I>(&self, sectors: I) -> Result<Sector, TensorError>
    where
        I: IntoIterator<Item = &'a Sector>,
    {
        let mut acc = self.trivial_sector();
        for s in sectors {
            acc = self.fuse_abelian(&acc, s)?;
        }
        Ok(acc)
    }

    /// Number of sectors for finite groups, `None` otherwise.
    pub fn num_sectors(&self) -> Option<usize> {
        match self {
            Symmetry::NoSymmetry => Some(1),
            Symmetry::ZN(n) => Some(*n as usize),
            Symmetry::FermionParity => Some(2),
            Symmetry::U1 | Symmetry::SU2 => None,
            Symmetry::Product(factors) => factors.iter().map(Symmetry::num_sectors).product(),
        }
    }

    /// Every sector of a finite group, sorted.
    pub fn all_sectors(&self) -> Option<Vec<Sector>> {
        let mut sectors = match self {
            Symmetry::NoSymmetry => vec![Sector::from([0])],
            Symmetry::ZN(n) => (0..*n as i64).map(|a| Sector::from([a])).collect(),
            Symmetry::FermionParity => vec![Sector::from([0]), Sector::from([1])],
            Symmetry::U1 | Symmetry::SU2 => return None,
            Symmetry::Product(factors) => {
                let mut acc = vec![Sector::new(&[])];
                for factor in factors {
                    let part = factor.all_sectors()?;
                    acc = acc
                        .iter()
                        .flat_map(|prefix| part.iter().map(move |s| prefix.concat(s)))
                        .collect();
                }
                acc
            }
        };
        sectors.sort();
        Some(sectors)
    }

    fn check_len(&self, sector: &Sector) -> Result<(), TensorError> {
        let expected = self.sector_ind_len();
        if sector.len() != expected {
            return Err(TensorError::SectorLengthMismatch {
                sector: sector.to_string(),
                symmetry: self.to_string(),
                expected,
                actual: sector.len(),
            });
        }
        Ok(())
    }

    fn fuse_abelian_unchecked(&self, a: &Sector, b: &Sector) -> Result<Sector, TensorError> {
        Ok(match self {
            Symmetry::NoSymmetry => a.clone(),
            Symmetry::U1 => Sector::from([self.checked_add(a, b)?]),
            Symmetry::ZN(n) => Sector::from([add_mod(a[0], b[0], i64::from(*n))]),
            Symmetry::FermionParity => Sector::from([add_mod(a[0], b[0], 2)]),
            Symmetry::SU2 => {
                return Err(TensorError::NotSupported {
                    what: "unique fusion outcome for SU(2)".to_string(),
                })
            }
            Symmetry::Product(factors) => {
                let parts_a = self.split_sector(a);
                let parts_b = self.split_sector(b);
                let mut entries = Vec::with_capacity(a.len());
                for (i, factor) in factors.iter().enumerate() {
                    let part = factor.fuse_abelian_unchecked(&parts_a[i], &parts_b[i])?;
                    entries.extend_from_slice(part.entries());
                }
                Sector::new(&entries)
            }
        })
    }

    fn checked_add(&self, a: &Sector, b: &Sector) -> Result<i64, TensorError> {
        a[0].checked_add(b[0]).ok_or_else(|| TensorError::SectorOverflow {
            symmetry: self.to_string(),
            a: a.to_string(),
            b: b.to_string(),
        })
    }

    fn fuse_unchecked(&self, a: &Sector, b: &Sector) -> Result<Vec<(Sector, usize)>, TensorError> {
        Ok(match self {
            Symmetry::SU2 => {
                let (ja, jb) = (a[0], b[0]);
                let top = self.checked_add(a, b)?;
                (ja.abs_diff(jb) as i64..=top)
                    .step_by(2)
                    .map(|c| (Sector::from([c]), 1))
                    .collect()
            }
            Symmetry::Product(factors) => {
                let parts_a = self.split_sector(a);
                let parts_b = self.split_sector(b);
                let mut acc = vec![(Sector::new(&[]), 1usize)];
                for (i, factor) in factors.iter().enumerate() {
                    let outcomes = factor.fuse_unchecked(&parts_a[i], &parts_b[i])?;
                    acc = acc
                        .iter()
                        .flat_map(|(prefix, mult)| {
                            outcomes
                                .iter()
                                .map(move |(s, m)| (prefix.concat(s), mult * m))
                        })
                        .collect();
                }
                acc
            }
            _ => vec![(self.fuse_abelian_unchecked(a, b)?, 1)],
        })
    }

    /// Split a product sector into the sectors of each factor.
    fn split_sector(&self, sector: &Sector) -> Vec<Sector> {
        match self {
            Symmetry::Product(factors) => {
                let mut start = 0;
                factors
                    .iter()
                    .map(|factor| {
                        let len = factor.sector_ind_len();
                        let part = Sector::new(&sector.entries()[start..start + len]);
                        start += len;
                        part
                    })
                    .collect()
            }
            _ => vec![sector.clone()],
        }
    }
}

/// `(a + b) mod n` in `[0, n)` without intermediate overflow.
fn add_mod(a: i64, b: i64, n: i64) -> i64 {
    if n == 0 {
        return a.wrapping_add(b);
    }
    (a % n + b % n).rem_euclid(n)
}

impl fmt::Display for Symmetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symmetry::NoSymmetry => write!(f, "NoSymmetry"),
            Symmetry::U1 => write!(f, "U(1)"),
            Symmetry::ZN(n) => write!(f, "Z_{}", n),
            Symmetry::FermionParity => write!(f, "FermionParity"),
            Symmetry::SU2 => write!(f, "SU(2)"),
            Symmetry::Product(factors) => {
                for (i, factor) in factors.iter().enumerate() {
                    if i > 0 {
                        write!(f, " × ")?;
                    }
                    write!(f, "{}", factor)?;
                }
                Ok(())
            }
        }
    }
}
