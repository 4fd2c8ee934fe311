//! Integration tests for tensor decompositions and matrix functions.

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use symtensors::{
    c64, default_backend, Block, Sector, SvdAlgorithm, Symmetry, Tensor, TensorError, Tolerance, VectorSpace,
};

fn u1(charges: &[i64], mults: &[usize], is_dual: bool) -> VectorSpace {
    VectorSpace::new(
        Symmetry::U1,
        charges.iter().map(|&c| Sector::new(&[c])).collect(),
        mults.to_vec(),
        is_dual,
    )
    .unwrap()
}

fn tol() -> Tolerance {
    Tolerance::new(1e-10, 1e-12)
}

#[test]
fn test_svd_all_algorithms() {
    let backend = default_backend::<f64>(&Symmetry::U1).unwrap();
    let mut rng = StdRng::seed_from_u64(17);
    let legs = vec![u1(&[-1, 0, 1], &[1, 2, 1], false), u1(&[0, 1], &[2, 1], false), u1(&[-1, 0, 1, 2], &[1, 2, 2, 1], true)];
    let t = Tensor::random_normal(&backend, legs, ["a", "b", "c"], 1.0, &mut rng).unwrap();

    for algorithm in ["gesdd", "gesvd", "robust", "robust_silent"] {
        let algorithm: SvdAlgorithm = algorithm.parse().unwrap();
        let svd = t.svd(&["a", "b"], &["c"], ("k", "k*"), algorithm).unwrap();

        let usv = svd
            .u
            .tdot(&svd.s, &["k"], &["k*"])
            .unwrap()
            .tdot(&svd.vh, &["k"], &["k*"])
            .unwrap();
        assert!(usv.almost_equal(&t, tol()).unwrap(), "{}", algorithm);

        // U has orthonormal columns
        let k = svd.u.legs()[2].clone();
        let uu = svd.u.conj().unwrap().tdot(&svd.u, &["a*", "b*"], &["a", "b"]).unwrap();
        let eye = Tensor::eye(&backend, vec![k.dual()], ["k*", "k"]).unwrap();
        assert!(uu.almost_equal(&eye, tol()).unwrap(), "{}", algorithm);

        // singular values sit on the diagonal and are non-negative
        let s = svd.s.to_dense_block().unwrap();
        let n = s.shape()[0];
        for j in 0..n {
            for i in 0..n {
                let value = s.data()[i + j * n];
                if i == j {
                    assert!(value >= 0.0);
                } else {
                    assert_eq!(value, 0.0);
                }
            }
        }
    }

    assert!(matches!(
        "lapack".parse::<SvdAlgorithm>(),
        Err(TensorError::UnknownSvdAlgorithm { .. })
    ));
}

#[test]
fn test_svd_complex() {
    let backend = default_backend::<c64>(&Symmetry::U1).unwrap();
    let mut rng = StdRng::seed_from_u64(23);
    let legs = vec![u1(&[0, 1], &[2, 2], false), u1(&[0, 1], &[3, 1], true)];
    let t = Tensor::random_uniform(&backend, legs, ["a", "b"], &mut rng).unwrap();
    let svd = t.svd(&["a"], &["b"], ("k", "k*"), SvdAlgorithm::Robust).unwrap();
    let usv = svd
        .u
        .tdot(&svd.s, &["k"], &["k*"])
        .unwrap()
        .tdot(&svd.vh, &["k"], &["k*"])
        .unwrap();
    assert!(usv.almost_equal(&t, tol()).unwrap());
}

#[test]
fn test_full_qr() {
    let backend = default_backend::<f64>(&Symmetry::NoSymmetry).unwrap();
    let mut rng = StdRng::seed_from_u64(29);
    let legs = vec![VectorSpace::non_symmetric(3), VectorSpace::non_symmetric(2)];
    let t = Tensor::random_uniform(&backend, legs, ["a", "b"], &mut rng).unwrap();

    let (q, r) = t.qr(&["a"], &["b"], ("k", "k*"), true).unwrap();
    assert_eq!(q.dims(), vec![3, 3]);
    assert_eq!(r.dims(), vec![3, 2]);
    assert!(q.tdot(&r, &["k"], &["k*"]).unwrap().almost_equal(&t, tol()).unwrap());

    let (q, r) = t.qr(&["a"], &["b"], ("k", "k*"), false).unwrap();
    assert_eq!(q.dims(), vec![3, 2]);
    assert!(r.labels_are(&["k*", "b"]));
}

#[test]
fn test_exp_and_log_of_diagonal() {
    let backend = default_backend::<f64>(&Symmetry::NoSymmetry).unwrap();
    let leg = VectorSpace::non_symmetric(3);
    let values = [0.0, 2.0_f64.ln(), -1.0];
    let block = Block::from_fn(&[3, 3], |idx| if idx[0] == idx[1] { values[idx[0]] } else { 0.0 });
    let t = Tensor::from_dense_block(&backend, &block, vec![leg.clone(), leg.dual()], ["p", "p*"], Tolerance::default())
        .unwrap();

    let e = t.exp(&["p"], &["p*"]).unwrap();
    assert!(e.labels_are(&["p", "p*"]));
    let dense = e.to_dense_block().unwrap();
    assert_relative_eq!(dense.data()[0], 1.0, epsilon = 1e-12);
    assert_relative_eq!(dense.data()[4], 2.0, epsilon = 1e-12);
    assert_relative_eq!(dense.data()[8], (-1.0_f64).exp(), epsilon = 1e-12);

    let back = e.log(&["p"], &["p*"]).unwrap();
    assert!(back.almost_equal(&t, Tolerance::new(1e-8, 1e-8)).unwrap());
}

#[test]
fn test_exp_permuted_legs() {
    let backend = default_backend::<f64>(&Symmetry::U1).unwrap();
    let mut rng = StdRng::seed_from_u64(31);
    let a = u1(&[0, 1], &[1, 2], false);
    let b = u1(&[-1, 0], &[1, 1], false);
    let t = Tensor::random_uniform(&backend, vec![a.clone(), a.dual(), b.clone(), b.dual()], ["a", "a*", "b", "b*"], &mut rng)
        .unwrap()
        .scale(0.1)
        .unwrap();

    // exp(X) exp(-X) = 1 with the legs of X interleaved
    let e = t.exp(&["a", "b"], &["a*", "b*"]).unwrap();
    assert!(e.labels_are(&["a", "a*", "b", "b*"]));
    let mut e_neg = (-&t).unwrap().exp(&["a", "b"], &["a*", "b*"]).unwrap();
    e_neg.relabel(&[("a", "x"), ("b", "y")]).unwrap();
    let product = e.tdot(&e_neg, &["a*", "b*"], &["x", "y"]).unwrap();
    assert!(product.labels_are(&["a", "b", "a*", "b*"]));
    let eye = Tensor::eye(&backend, vec![a, b], ["a", "b", "a*", "b*"]).unwrap();
    assert!(product.almost_equal(&eye, tol()).unwrap());
}
