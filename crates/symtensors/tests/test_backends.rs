//! Integration tests for backend selection and backend interchangeability.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use symtensors::{
    c64, create_backend, BackendCache, BlockBackendKind, BlockBackendOptions, Dtype, FaerBlockBackend,
    NonabelianBackend, Sector, SharedBackend, Symmetry, SymmetryBackendKind, Tensor, TensorError, Tolerance,
    VectorSpace,
};

fn z3(charges: &[i64], mults: &[usize], is_dual: bool) -> VectorSpace {
    VectorSpace::new(
        Symmetry::ZN(3),
        charges.iter().map(|&c| Sector::new(&[c])).collect(),
        mults.to_vec(),
        is_dual,
    )
    .unwrap()
}

/// Contract the same random data on two backends and compare.
fn contract_on(backend: &SharedBackend<f64>, legs: &[VectorSpace], seed: u64) -> Tensor<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let a = Tensor::random_uniform(backend, legs.to_vec(), ["a", "b", "c"], &mut rng).unwrap();
    let b = Tensor::random_uniform(backend, vec![legs[2].dual(), legs[1].dual()], ["c*", "b*"], &mut rng).unwrap();
    a.tdot(&b, &["b", "c"], &["b*", "c*"]).unwrap()
}

#[test]
fn test_cache_selects_kind() {
    let mut cache = BackendCache::<f64>::new();
    assert!(cache.is_empty());
    let trivial = cache.get_backend(&Symmetry::NoSymmetry, BlockBackendKind::Faer, None).unwrap();
    assert_eq!(trivial.kind(), SymmetryBackendKind::NoSymmetry);
    let abelian = cache.get_backend(&Symmetry::ZN(3), BlockBackendKind::Faer, None).unwrap();
    assert_eq!(abelian.kind(), SymmetryBackendKind::Abelian);
    let again = cache.get_backend(&Symmetry::U1, BlockBackendKind::Faer, None).unwrap();
    assert!(Arc::ptr_eq(&abelian, &again));
    assert_eq!(cache.len(), 2);

    let threaded = cache
        .get_backend_with_options(&Symmetry::U1, BlockBackendKind::Faer, None, BlockBackendOptions::default().with_threads(2))
        .unwrap();
    assert!(!Arc::ptr_eq(&abelian, &threaded));
    assert_eq!(cache.len(), 3);
}

#[test]
fn test_unavailable_backends() {
    let mut cache = BackendCache::<f64>::new();
    assert!(matches!(
        cache.get_backend(&Symmetry::SU2, BlockBackendKind::Faer, None),
        Err(TensorError::NotImplemented { .. })
    ));
    assert!(matches!(
        cache.get_backend(&Symmetry::U1, BlockBackendKind::Faer, Some(SymmetryBackendKind::NoSymmetry)),
        Err(TensorError::NotSupported { .. })
    ));
    assert!(matches!(
        cache.get_backend(&Symmetry::U1, BlockBackendKind::Gpu, None),
        Err(TensorError::NotImplemented { .. })
    ));
    assert!(matches!(
        "quantum".parse::<BlockBackendKind>(),
        Err(TensorError::UnknownBackend { .. })
    ));
    assert!(cache.is_empty());
}

#[test]
fn test_nonabelian_operations_not_implemented() {
    let backend: SharedBackend<f64> = Arc::new(NonabelianBackend::new(FaerBlockBackend::default()));
    let leg = VectorSpace::new(Symmetry::SU2, vec![Sector::new(&[1])], vec![1], false).unwrap();
    assert!(matches!(
        Tensor::zero(&backend, vec![leg.clone(), leg.dual()], ["a", "a*"]),
        Err(TensorError::NotImplemented { .. })
    ));
}

#[test]
fn test_block_backends_agree() {
    let legs = [z3(&[0, 1, 2], &[2, 1, 2], false), z3(&[0, 2], &[1, 3], false), z3(&[0, 1, 2], &[1, 2, 1], true)];
    let faer = create_backend::<f64>(SymmetryBackendKind::Abelian, BlockBackendKind::Faer, BlockBackendOptions::default())
        .unwrap();
    let naive =
        create_backend::<f64>(SymmetryBackendKind::Abelian, BlockBackendKind::Naive, BlockBackendOptions::default())
            .unwrap();
    let x = contract_on(&faer, &legs, 8);
    let y = contract_on(&naive, &legs, 8);
    assert!(x.almost_equal(&y, Tolerance::new(1e-12, 1e-12)).unwrap());
}

#[test]
fn test_abelian_backend_handles_trivial_symmetry() {
    let legs = [VectorSpace::non_symmetric(3), VectorSpace::non_symmetric(4), VectorSpace::non_symmetric(2)];
    let mut cache = BackendCache::<f64>::new();
    let plain = cache.get_backend(&Symmetry::NoSymmetry, BlockBackendKind::Faer, None).unwrap();
    let blocked = cache
        .get_backend(&Symmetry::NoSymmetry, BlockBackendKind::Faer, Some(SymmetryBackendKind::Abelian))
        .unwrap();
    let x = contract_on(&plain, &legs, 9).to_dense_block().unwrap();
    let y = contract_on(&blocked, &legs, 9).to_dense_block().unwrap();
    assert_eq!(x.shape(), y.shape());
    for (a, b) in x.data().iter().zip(y.data()) {
        assert!((a - b).abs() < 1e-12);
    }
}

#[test]
fn test_cast_to_complex() {
    let mut rng = StdRng::seed_from_u64(12);
    let mut cache = BackendCache::<f64>::new();
    let backend = cache.get_backend(&Symmetry::ZN(3), BlockBackendKind::Faer, None).unwrap();
    let legs = vec![z3(&[0, 1], &[2, 1], false), z3(&[0, 1], &[2, 1], true)];
    let t = Tensor::random_uniform(&backend, legs, ["a", "b"], &mut rng).unwrap();
    let z = t.cast::<c64>().unwrap();
    assert_eq!(z.dtype(), Dtype::Complex128);
    assert!(z.labels_are(&["a", "b"]));
    assert!((z.norm().unwrap() - t.norm().unwrap()).abs() < 1e-12);
    let back = z.cast::<f64>().unwrap();
    assert!(back.almost_equal(&t, Tolerance::default()).unwrap());
}
