use fv_core::Real;
use fv_mesh::{FaceSpec, Grid1D, MeshGeometry};
use fv_vars::{Field, Location, VarGraph};
use nalgebra::DMatrix;
use proptest::prelude::*;

/// Two unit cells joined by a single face.
fn two_cells(id1: usize, id2: usize, normal: Real) -> MeshGeometry {
    let face = FaceSpec {
        id1,
        id2: Some(id2),
        oriented_area: [normal, 0.0, 0.0],
        center: [1.0, 0.0, 0.0],
    };
    MeshGeometry::new(
        1,
        &[face],
        vec![[0.5, 0.0, 0.0], [1.5, 0.0, 0.0]],
        vec![1.0, 1.0],
    )
    .unwrap()
}

/// Split blocks of face 0 as `(slot0, slot1)`.
fn split(mesh: &MeshGeometry, c0: &DMatrix<Real>, c1: &DMatrix<Real>) -> (DMatrix<Real>, DMatrix<Real>) {
    let n = c0.nrows();
    let mut g = VarGraph::new(mesh);
    let q = g
        .primary("q", Location::Cell, vec![n], vec![0.0; 2 * n])
        .unwrap();
    // component-major: coeff[0, r, c] of cell i at (r * n + c) * 2 + i
    let mut values = vec![0.0; 2 * n * n];
    for r in 0..n {
        for c in 0..n {
            values[(r * n + c) * 2] = c0[(r, c)];
            values[(r * n + c) * 2 + 1] = c1[(r, c)];
        }
    }
    let coeff = g
        .primary("A", Location::Cell, vec![1, n, n], values)
        .unwrap();
    let roe = g.roe(q, coeff).unwrap();
    let field: &Field = g.value(roe).unwrap();
    let slot = |s: usize| DMatrix::from_fn(n, n, |r, c| field.get(s * n * n + r * n + c, 0));
    (slot(0), slot(1))
}

fn assert_close(a: &DMatrix<Real>, b: &DMatrix<Real>) -> Result<(), TestCaseError> {
    let scale = 1.0 + a.amax().max(b.amax());
    for (x, y) in a.iter().zip(b.iter()) {
        prop_assert!((x - y).abs() <= 1e-8 * scale, "{} != {}", a, b);
    }
    Ok(())
}

/// Cell coefficients `M + E` and `M - E` whose Roe average `M` has a known,
/// well separated real spectrum.
fn coefficient_pair(n: usize) -> impl Strategy<Value = (DMatrix<Real>, DMatrix<Real>)> {
    (
        proptest::collection::vec(-0.3..0.3_f64, n * n),
        proptest::collection::vec(-4.0..4.0_f64, n),
        proptest::collection::vec(-2.0..2.0_f64, n * n),
    )
        .prop_map(move |(perturb, mut lambda, e)| {
            lambda.sort_by(|a, b| a.total_cmp(b));
            for k in 1..n {
                if lambda[k] - lambda[k - 1] < 0.5 {
                    lambda[k] = lambda[k - 1] + 0.5;
                }
            }
            let r = DMatrix::identity(n, n) + DMatrix::from_vec(n, n, perturb);
            let r_inv = r.clone().try_inverse().unwrap();
            let m = &r * DMatrix::from_diagonal(&nalgebra::DVector::from_vec(lambda)) * r_inv;
            let e = DMatrix::from_vec(n, n, e);
            (&m + &e, &m - &e)
        })
}

proptest! {
    #[test]
    fn slots_sum_to_roe_average((c0, c1) in (2usize..=3).prop_flat_map(coefficient_pair)) {
        let mesh = two_cells(0, 1, 1.0);
        let (s0, s1) = split(&mesh, &c0, &c1);
        let average = (&c0 + &c1) * 0.5;
        assert_close(&(s0 + s1), &average)?;
    }

    #[test]
    fn swapping_cells_with_reversed_normal_negates_and_exchanges(
        (c0, c1) in (2usize..=3).prop_flat_map(coefficient_pair)
    ) {
        let (s0, s1) = split(&two_cells(0, 1, 1.0), &c0, &c1);
        let (t0, t1) = split(&two_cells(1, 0, -1.0), &c0, &c1);
        assert_close(&t0, &(-&s1))?;
        assert_close(&t1, &(-&s0))?;
    }

    #[test]
    fn swapping_cells_keeps_the_sum((c0, c1) in (2usize..=3).prop_flat_map(coefficient_pair)) {
        let (s0, s1) = split(&two_cells(0, 1, 1.0), &c0, &c1);
        let (t0, t1) = split(&two_cells(1, 0, 1.0), &c0, &c1);
        assert_close(&(t0 + t1), &(s0 + s1))?;
    }
}

#[test]
fn scalar_roe_is_first_order_upwind() {
    let mesh = Grid1D::new(4, 0.25).unwrap();
    for u in [2.0, -3.0] {
        let mut g = VarGraph::new(&mesh);
        let phi = g.cell_var("phi", 0.0).unwrap();
        let velocity = g
            .primary("u", Location::Cell, vec![1], vec![u; 4])
            .unwrap();
        let roe = g.roe(phi, velocity).unwrap();
        let field = g.value(roe).unwrap().clone();
        // interior faces have unit area along +x
        for f in 1..4 {
            assert_eq!(field.get(0, f), u.max(0.0));
            assert_eq!(field.get(1, f), u.min(0.0));
        }
    }
}

#[test]
fn complex_spectrum_propagates_nan() {
    let rotation = DMatrix::from_row_slice(2, 2, &[0.0, -1.0, 1.0, 0.0]);
    let (s0, s1) = split(&two_cells(0, 1, 1.0), &rotation, &rotation);
    assert!(s0.iter().chain(s1.iter()).all(|v| v.is_nan()));
}

#[test]
fn singular_average_splits_into_finite_blocks() {
    // eigenvalues 0 and 2: |A| = A
    let a = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
    let (s0, s1) = split(&two_cells(0, 1, 1.0), &a, &a);
    assert_close(&s0, &a).unwrap();
    assert_close(&s1, &DMatrix::zeros(2, 2)).unwrap();

    // nilpotent: |A| = 0
    let a = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 0.0, 0.0]);
    let (s0, s1) = split(&two_cells(0, 1, 1.0), &a, &a);
    assert_close(&s0, &(&a * 0.5)).unwrap();
    assert_close(&s1, &(&a * 0.5)).unwrap();
}

#[test]
fn jordan_average_splits_into_finite_blocks() {
    let a = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 0.0, 1.0]);
    let (s0, s1) = split(&two_cells(0, 1, 1.0), &a, &a);
    assert!(s0.iter().chain(s1.iter()).all(|v| v.is_finite()));
    assert_close(&s0, &DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.0, 1.0])).unwrap();
    assert_close(&s1, &DMatrix::from_row_slice(2, 2, &[0.0, 0.5, 0.0, 0.0])).unwrap();
}
