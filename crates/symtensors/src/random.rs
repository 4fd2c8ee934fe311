//! Random entries, legs and tensors.
//!
//! Every function takes the random number generator explicitly, so seeding
//! it (e.g. with `StdRng::seed_from_u64`) makes the results reproducible.
//! The leg and tensor helpers generate test data with a controlled number
//! of sectors.

use std::collections::BTreeSet;

use rand::distr::{Distribution, StandardUniform};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::backend::SharedBackend;
use crate::error::TensorError;
use crate::scalar::{c64, Scalar};
use crate::space::VectorSpace;
use crate::symmetry::{Sector, Symmetry};
use crate::tensor::{IntoLabels, Tensor};

/// A value uniform in `[-1, 1)`. Complex types draw the imaginary part
/// independently from the same interval.
pub fn sample_uniform<T: Scalar, R: Rng + ?Sized>(rng: &mut R) -> T {
    let mut draw = || {
        let u: f64 = StandardUniform.sample(&mut *rng);
        2.0 * u - 1.0
    };
    let re = draw();
    if T::DTYPE.is_real() {
        T::from_f64(re)
    } else {
        T::from_c64(c64::new(re, draw()))
    }
}

/// A normally distributed value with standard deviation `sigma`. Complex
/// types draw the imaginary part independently with the same `sigma`.
pub fn sample_normal<T: Scalar, R: Rng + ?Sized>(rng: &mut R, sigma: f64) -> T {
    let mut draw = || {
        let x: f64 = StandardNormal.sample(&mut *rng);
        sigma * x
    };
    let re = draw();
    if T::DTYPE.is_real() {
        T::from_f64(re)
    } else {
        T::from_c64(c64::new(re, draw()))
    }
}

/// A random valid sector. Entries of infinite groups are drawn from a range
/// of width `spread` around the trivial sector.
pub fn random_sector<R: Rng>(symmetry: &Symmetry, spread: i64, rng: &mut R) -> Sector {
    let spread = spread.max(1);
    match symmetry {
        Symmetry::NoSymmetry => Sector::from([0]),
        Symmetry::U1 => Sector::from([rng.random_range(-spread..=spread)]),
        Symmetry::ZN(n) => Sector::from([rng.random_range(0..i64::from(*n))]),
        Symmetry::FermionParity => Sector::from([rng.random_range(0..2)]),
        Symmetry::SU2 => Sector::from([rng.random_range(0..=spread)]),
        Symmetry::Product(factors) => {
            let mut sector = Sector::new(&[]);
            for factor in factors {
                sector = sector.concat(&random_sector(factor, spread, rng));
            }
            sector
        }
    }
}

/// Up to `num` distinct random sectors, sorted.
///
/// Fewer are returned only when the group has fewer than `num` sectors.
pub fn random_sectors<R: Rng>(symmetry: &Symmetry, num: usize, rng: &mut R) -> Vec<Sector> {
    let target = symmetry.num_sectors().map_or(num, |n| n.min(num));
    let spread = num as i64;
    let mut sectors = BTreeSet::new();
    while sectors.len() < target {
        sectors.insert(random_sector(symmetry, spread, rng));
    }
    sectors.into_iter().collect()
}

/// `num` multiplicities in `1..=max_mult`.
pub fn random_multiplicities<R: Rng>(num: usize, max_mult: usize, rng: &mut R) -> Vec<usize> {
    (0..num).map(|_| rng.random_range(1..=max_mult.max(1))).collect()
}

/// A leg with up to `num_sectors` random sectors.
pub fn random_leg<R: Rng>(
    symmetry: &Symmetry,
    num_sectors: usize,
    max_mult: usize,
    is_dual: bool,
    rng: &mut R,
) -> Result<VectorSpace, TensorError> {
    let sectors = random_sectors(symmetry, num_sectors, rng);
    let multiplicities = random_multiplicities(sectors.len(), max_mult, rng);
    VectorSpace::new(symmetry.clone(), sectors, multiplicities, is_dual)
}

/// A leg that, added to `legs`, admits at least one symmetry-allowed block.
///
/// The sectors are the duals of fusion outcomes of randomly chosen sectors
/// of `legs`.
pub fn compatible_leg<R: Rng>(
    legs: &[VectorSpace],
    max_mult: usize,
    is_dual: bool,
    rng: &mut R,
) -> Result<VectorSpace, TensorError> {
    let symmetry = legs.first().map_or(Symmetry::NoSymmetry, |leg| leg.symmetry().clone());
    if legs.iter().any(|leg| leg.num_sectors() == 0) {
        return Err(TensorError::InvalidMultiplicity {
            message: "cannot build a compatible leg for a leg without sectors".to_string(),
        });
    }
    let attempts = 1 + legs.iter().map(VectorSpace::num_sectors).max().unwrap_or(0);
    let mut sectors = BTreeSet::new();
    for _ in 0..attempts {
        let mut fused = symmetry.trivial_sector();
        for leg in legs {
            let sector = leg.sector(rng.random_range(0..leg.num_sectors()));
            let outcomes = symmetry.fusion_outcomes(&fused, &sector)?;
            fused = outcomes[rng.random_range(0..outcomes.len())].0.clone();
        }
        // effective sector of the new leg is the dual of `fused`
        let non_dual = if is_dual { fused } else { symmetry.dual_sector(&fused) };
        sectors.insert(non_dual);
    }
    let sectors: Vec<Sector> = sectors.into_iter().collect();
    let multiplicities = random_multiplicities(sectors.len(), max_mult, rng);
    VectorSpace::new(symmetry, sectors, multiplicities, is_dual)
}

/// A tensor with uniform random entries in every allowed block.
pub fn random_tensor<T: Scalar, R: Rng>(
    backend: &SharedBackend<T>,
    legs: Vec<VectorSpace>,
    labels: impl IntoLabels,
    rng: &mut R,
) -> Result<Tensor<T>, TensorError> {
    Tensor::random_uniform(backend, legs, labels, rng)
}
