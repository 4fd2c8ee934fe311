//! Integration tests for symmetries, legs and composite legs.

use std::collections::BTreeMap;

use symtensors::{Sector, Symmetry, TensorError, VectorSpace};

fn s(entries: &[i64]) -> Sector {
    Sector::new(entries)
}

#[test]
fn test_abelian_fusion() {
    assert_eq!(Symmetry::U1.fuse_abelian(&s(&[2]), &s(&[-3])).unwrap(), s(&[-1]));
    assert_eq!(Symmetry::ZN(3).fuse_abelian(&s(&[2]), &s(&[2])).unwrap(), s(&[1]));
    assert_eq!(Symmetry::FermionParity.fuse_abelian(&s(&[1]), &s(&[1])).unwrap(), s(&[0]));

    let z2_u1 = Symmetry::Product(vec![Symmetry::ZN(2), Symmetry::U1]);
    assert_eq!(z2_u1.sector_ind_len(), 2);
    assert!(z2_u1.is_abelian());
    assert!(!z2_u1.is_trivial());
    assert_eq!(z2_u1.fuse_abelian(&s(&[1, 4]), &s(&[1, -1])).unwrap(), s(&[0, 3]));
    assert_eq!(z2_u1.dual_sector(&s(&[1, 4])), s(&[1, -4]));
    assert_eq!(z2_u1.num_sectors(), None);
}

#[test]
fn test_dual_sector_fuses_to_trivial() {
    let symmetries = [
        Symmetry::U1,
        Symmetry::ZN(5),
        Symmetry::FermionParity,
        Symmetry::Product(vec![Symmetry::ZN(4), Symmetry::FermionParity]),
    ];
    for symmetry in &symmetries {
        let sectors = symmetry.all_sectors().unwrap_or_else(|| (-2..=2).map(|c| s(&[c])).collect());
        for sector in &sectors {
            let dual = symmetry.dual_sector(sector);
            assert_eq!(
                symmetry.fuse_abelian(sector, &dual).unwrap(),
                symmetry.trivial_sector(),
                "{} sector {}",
                symmetry,
                sector
            );
        }
    }
}

#[test]
fn test_nonabelian_fusion() {
    let outcomes = Symmetry::SU2.fusion_outcomes(&s(&[2]), &s(&[1])).unwrap();
    assert_eq!(outcomes, vec![(s(&[1]), 1), (s(&[3]), 1)]);
    assert_eq!(Symmetry::SU2.sector_dim(&s(&[2])), 3);
    assert!(matches!(
        Symmetry::SU2.fuse_abelian(&s(&[1]), &s(&[1])),
        Err(TensorError::NotSupported { .. })
    ));
}

#[test]
fn test_sector_validation() {
    assert!(matches!(
        Symmetry::ZN(3).check_sector(&s(&[3])),
        Err(TensorError::InvalidSector { .. })
    ));
    assert!(matches!(
        Symmetry::U1.check_sector(&s(&[1, 2])),
        Err(TensorError::SectorLengthMismatch { expected: 1, actual: 2, .. })
    ));
    assert!(matches!(
        VectorSpace::new(Symmetry::U1, vec![s(&[0])], vec![0], false),
        Err(TensorError::InvalidMultiplicity { .. })
    ));
}

#[test]
fn test_malformed_symmetry_and_overflow() {
    assert!(matches!(
        VectorSpace::new(Symmetry::ZN(0), vec![], vec![], false),
        Err(TensorError::InvalidSymmetry { .. })
    ));
    let product = Symmetry::Product(vec![Symmetry::ZN(0), Symmetry::U1]);
    assert!(matches!(
        product.fusion_outcomes(&s(&[0, 1]), &s(&[0, 1])),
        Err(TensorError::InvalidSymmetry { .. })
    ));
    assert!(matches!(
        symtensors::default_backend::<f64>(&Symmetry::ZN(0)),
        Err(TensorError::InvalidSymmetry { .. })
    ));
    assert!(matches!(
        Symmetry::U1.fuse_abelian(&s(&[i64::MAX]), &s(&[i64::MAX])),
        Err(TensorError::SectorOverflow { .. })
    ));
    assert!(matches!(
        Symmetry::U1.check_sector(&s(&[i64::MIN])),
        Err(TensorError::InvalidSector { .. })
    ));
}

#[test]
fn test_leg_sorting_and_duality() {
    let leg = VectorSpace::new(Symmetry::U1, vec![s(&[2]), s(&[-1]), s(&[2])], vec![1, 3, 2], false).unwrap();
    assert_eq!(leg.non_dual_sectors(), &[s(&[-1]), s(&[2])]);
    assert_eq!(leg.multiplicities(), &[3, 3]);
    assert_eq!(leg.dim(), 6);
    assert_eq!(leg.sector_slices(), vec![0..3, 3..6]);

    let dual = leg.dual();
    assert!(dual.is_dual());
    assert_eq!(dual.sectors(), vec![s(&[1]), s(&[-2])]);
    assert_eq!(dual.effective_sector_index(&s(&[-2])), Some(1));
    assert!(leg.can_contract_with(&dual));
    assert!(!leg.can_contract_with(&leg));
    assert_eq!(dual.dual(), leg);
}

#[test]
fn test_product_space() {
    let a = VectorSpace::new(Symmetry::U1, vec![s(&[0]), s(&[1])], vec![1, 2], false).unwrap();
    let b = VectorSpace::new(Symmetry::U1, vec![s(&[-1]), s(&[0])], vec![2, 1], true).unwrap();
    let fused = VectorSpace::product(&[a.clone(), b.clone()], false).unwrap();
    assert_eq!(fused.dim(), a.dim() * b.dim());
    assert!(fused.is_product());
    assert_eq!(fused.factors().unwrap(), &[a.clone(), b.clone()]);

    // every combination of factor sectors occupies its own slot range
    let product = fused.product_space().unwrap();
    let mut used: BTreeMap<usize, usize> = BTreeMap::new();
    for entry in product.entries() {
        let expected = Symmetry::U1
            .fuse_abelian(&a.sector(entry.factor_sectors[0]), &b.sector(entry.factor_sectors[1]))
            .unwrap();
        assert_eq!(fused.sector(entry.sector), expected);
        assert_eq!(entry.size, a.multiplicity(entry.factor_sectors[0]) * b.multiplicity(entry.factor_sectors[1]));
        let next = used.entry(entry.sector).or_default();
        assert_eq!(entry.offset, *next);
        *next += entry.size;
    }
    for (sector, total) in used {
        assert_eq!(fused.multiplicity(sector), total);
    }

    // a dual composite leg carries the same effective sectors, stored dualized
    let dual_fused = VectorSpace::product(&[a, b], true).unwrap();
    assert!(dual_fused.is_dual());
    let mut effective = dual_fused.sectors();
    effective.sort();
    assert_eq!(effective, fused.sectors());
    assert!(dual_fused.flattened().product_space().is_none());
}

#[test]
fn test_product_symmetry_mismatch() {
    let a = VectorSpace::non_symmetric(2);
    let b = VectorSpace::new(Symmetry::U1, vec![s(&[0])], vec![2], false).unwrap();
    assert!(matches!(
        VectorSpace::product(&[a, b], false),
        Err(TensorError::SymmetryMismatch { .. })
    ));
}
