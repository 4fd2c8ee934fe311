//! Integration tests for the linear operator wrappers.

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use symtensors::{
    default_backend, gram_schmidt, unwrapped, Block, LinearOperator, ProjectedOperator, Sector, SharedBackend,
    ShiftedOperator, SumOperator, Symmetry, Tensor, TensorError, TensorLinearOperator, Tolerance, VectorSpace,
};

fn backend() -> SharedBackend<f64> {
    default_backend::<f64>(&Symmetry::NoSymmetry).unwrap()
}

fn vector(values: &[f64]) -> Tensor<f64> {
    let n = values.len();
    let block = Block::from_vec(values.to_vec(), &[n]).unwrap();
    Tensor::from_dense_block(&backend(), &block, vec![VectorSpace::non_symmetric(n)], ["p"], Tolerance::default())
        .unwrap()
}

/// A random real symmetric operator on a leg of dimension `n`.
fn random_hermitian(n: usize, rng: &mut StdRng) -> TensorLinearOperator<f64> {
    let leg = VectorSpace::non_symmetric(n);
    let a = Tensor::random_uniform(&backend(), vec![leg.clone(), leg.dual()], ["p", "p*"], rng).unwrap();
    // conj swaps the duality of both legs, so reordering by label yields A^dagger
    let adjoint = a.conj().unwrap().transpose(&["p", "p*"]).unwrap();
    let h = a.add(&adjoint).unwrap();
    TensorLinearOperator::new(h, "p*").unwrap()
}

fn tol() -> Tolerance {
    Tolerance::new(1e-10, 1e-12)
}

#[test]
fn test_shifted_operator() {
    let mut rng = StdRng::seed_from_u64(1);
    let h = random_hermitian(4, &mut rng);
    let v = Tensor::random_uniform(&backend(), vec![VectorSpace::non_symmetric(4)], ["p"], &mut rng).unwrap();
    let hv = h.matvec(&v).unwrap();

    let shifted = ShiftedOperator::<f64>::new(Box::new(h), 2.0);
    let expected = hv.linear_combination(1.0, &v, 2.0).unwrap();
    assert!(shifted.matvec(&v).unwrap().almost_equal(&expected, tol()).unwrap());
    assert_eq!(shifted.shift(), 2.0);

    let adjoint = shifted.adjoint().unwrap();
    assert!(adjoint.matvec(&v).unwrap().almost_equal(&expected, tol()).unwrap());
}

#[test]
fn test_projected_operator_penalty() {
    let h = TensorLinearOperator::new(diagonal(&[1.0, -2.0, 3.0]), "p*").unwrap();
    let o = vector(&[1.0, 0.0, 0.0]);
    let projected = ProjectedOperator::<f64>::new(Box::new(h.clone()), vec![o.clone()], Some(5.0)).unwrap();

    let res = projected.matvec(&o).unwrap();
    assert!(res.almost_equal(&o.scale(5.0).unwrap(), tol()).unwrap());

    // o is an eigenvector of h, so vectors orthogonal to o are mapped as by h
    let v = vector(&[0.0, 0.5, -1.5]);
    let expected = h.matvec(&v).unwrap();
    assert!(projected.matvec(&v).unwrap().almost_equal(&expected, tol()).unwrap());
}

#[test]
fn test_projected_operator_without_penalty_annihilates() {
    let mut rng = StdRng::seed_from_u64(2);
    let h = random_hermitian(5, &mut rng);
    let o1 = Tensor::random_uniform(&backend(), vec![VectorSpace::non_symmetric(5)], ["p"], &mut rng).unwrap();
    let o2 = Tensor::random_uniform(&backend(), vec![VectorSpace::non_symmetric(5)], ["p"], &mut rng).unwrap();
    let projected = ProjectedOperator::<f64>::new(Box::new(h), vec![o1.clone(), o2.clone()], None).unwrap();
    assert_eq!(projected.ortho_vecs().len(), 2);

    assert!(projected.matvec(&o1).unwrap().norm().unwrap() < 1e-10);
    let v = Tensor::random_uniform(&backend(), vec![VectorSpace::non_symmetric(5)], ["p"], &mut rng).unwrap();
    let res = projected.matvec(&v).unwrap();
    assert_relative_eq!(o1.inner(&res).unwrap(), 0.0, epsilon = 1e-10);
    assert_relative_eq!(o2.inner(&res).unwrap(), 0.0, epsilon = 1e-10);
}

/// Projecting the result in forward or reverse order gives the same vector
/// for an orthonormal basis.
#[test]
fn test_projection_order_is_irrelevant() {
    let mut rng = StdRng::seed_from_u64(3);
    let h = random_hermitian(6, &mut rng);
    let raw: Vec<Tensor<f64>> = (0..3)
        .map(|_| Tensor::random_uniform(&backend(), vec![VectorSpace::non_symmetric(6)], ["p"], &mut rng).unwrap())
        .collect();
    let projected = ProjectedOperator::<f64>::new(Box::new(h.clone()), raw, None).unwrap();
    let basis = projected.ortho_vecs().to_vec();
    let v = Tensor::random_uniform(&backend(), vec![VectorSpace::non_symmetric(6)], ["p"], &mut rng).unwrap();

    fn project<'a>(mut x: Tensor<f64>, order: impl Iterator<Item = &'a Tensor<f64>>) -> Tensor<f64> {
        for o in order {
            let c = o.inner(&x).unwrap();
            x = x.linear_combination(1.0, o, -c).unwrap();
        }
        x
    }
    let pv = project(v.clone(), basis.iter());
    let hpv = h.matvec(&pv).unwrap();
    let forward = project(hpv, basis.iter());
    assert!(projected.matvec(&v).unwrap().almost_equal(&forward, tol()).unwrap());
}

#[test]
fn test_sum_operator() {
    let mut rng = StdRng::seed_from_u64(4);
    let h1 = random_hermitian(3, &mut rng);
    let h2 = random_hermitian(3, &mut rng);
    let v = Tensor::random_uniform(&backend(), vec![VectorSpace::non_symmetric(3)], ["p"], &mut rng).unwrap();
    let expected = h1.matvec(&v).unwrap().add(&h2.matvec(&v).unwrap()).unwrap();

    let ops: Vec<Box<dyn LinearOperator<f64>>> = vec![Box::new(h1), Box::new(h2)];
    let sum = SumOperator::new(ops).unwrap();
    assert!(sum.matvec(&v).unwrap().almost_equal(&expected, tol()).unwrap());
    assert!(sum.adjoint().unwrap().matvec(&v).unwrap().almost_equal(&expected, tol()).unwrap());

    let other: Vec<Box<dyn LinearOperator<f64>>> =
        vec![Box::new(random_hermitian(3, &mut rng)), Box::new(random_hermitian(4, &mut rng))];
    assert!(matches!(SumOperator::new(other), Err(TensorError::LegMismatch { .. })));
}

#[test]
fn test_tensor_operator_adjoint() {
    let backend = default_backend::<f64>(&Symmetry::U1).unwrap();
    let leg = VectorSpace::new(Symmetry::U1, vec![Sector::new(&[0]), Sector::new(&[1])], vec![2, 1], false).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    let a = Tensor::random_uniform(&backend, vec![leg.clone(), leg.dual()], ["p", "p*"], &mut rng).unwrap();
    let op = TensorLinearOperator::new(a.clone(), "p*").unwrap();
    let v = Tensor::random_uniform(&backend, vec![leg.clone()], ["p"], &mut rng).unwrap();
    let w = Tensor::random_uniform(&backend, vec![leg], ["p"], &mut rng).unwrap();

    // <w|A v> == <A^dagger w|v>
    let av = op.matvec(&v).unwrap();
    let adjoint = op.adjoint().unwrap();
    let mut aw = adjoint.matvec(&w).unwrap();
    aw.set_labels(["p"]).unwrap();
    assert_relative_eq!(w.inner(&av).unwrap(), aw.inner(&v).unwrap(), epsilon = 1e-12);

    assert!(matches!(
        TensorLinearOperator::new(vector(&[1.0, 2.0]), 0),
        Err(TensorError::LegMismatch { .. })
    ));
}

#[test]
fn test_tensor_operator_requires_square_tensor() {
    // legs of different dimension
    let rect = Tensor::<f64>::zero(
        &backend(),
        vec![VectorSpace::non_symmetric(3), VectorSpace::non_symmetric(4)],
        ["a", "b"],
    )
    .unwrap();
    assert!(matches!(
        TensorLinearOperator::new(rect, "b"),
        Err(TensorError::IncompatibleLegs { .. })
    ));

    // same leg twice, neither one dual to the other
    let leg = VectorSpace::non_symmetric(3);
    let same = Tensor::<f64>::zero(&backend(), vec![leg.clone(), leg], ["a", "b"]).unwrap();
    assert!(matches!(
        TensorLinearOperator::new(same, 0),
        Err(TensorError::IncompatibleLegs { .. })
    ));
}

#[test]
fn test_unwrapped_and_gram_schmidt() {
    let h = TensorLinearOperator::new(diagonal(&[1.0, 2.0]), "p*").unwrap();
    let shifted = ShiftedOperator::<f64>::new(Box::new(h), 0.5);
    let projected = ProjectedOperator::<f64>::new(Box::new(shifted), vec![], None).unwrap();
    let root = unwrapped::<f64>(&projected).unwrap();
    assert!(root.inner_operator().is_none());

    let vecs = [vector(&[1.0, 0.0]), vector(&[1.0, 1.0]), vector(&[0.0, 3.0])];
    let basis = gram_schmidt(&vecs, 1e-12).unwrap();
    assert_eq!(basis.len(), 2);
    assert_relative_eq!(basis[1].inner(&vector(&[0.0, 1.0])).unwrap(), 1.0, epsilon = 1e-12);
}

fn diagonal(values: &[f64]) -> Tensor<f64> {
    let n = values.len();
    let block = Block::from_fn(&[n, n], |idx| if idx[0] == idx[1] { values[idx[0]] } else { 0.0 });
    let leg = VectorSpace::non_symmetric(n);
    Tensor::from_dense_block(&backend(), &block, vec![leg.clone(), leg.dual()], ["p", "p*"], Tolerance::default())
        .unwrap()
}
