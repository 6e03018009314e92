//! Roe flux splitting.
//!
//! For a face with projected cell coefficients `cD` (upstream cell `id1`)
//! and `cU` (downstream cell `id2`), the Roe average is `A = (cD + cU) / 2`
//! and its absolute value `|A| = R |Λ| R⁻¹`. The split blocks are
//!
//! - slot 0: `(cD + |A|) / 2`, multiplying the `id1` value
//! - slot 1: `(cU − |A|) / 2`, multiplying the `id2` value
//!
//! so that `slot0 + slot1 == A`.

use fv_core::Real;
use fv_mesh::Mesh;
use nalgebra::DMatrix;
use nalgebra::linalg::{SVD, Schur};
use rayon::prelude::*;
use tracing::warn;

use crate::field::{Field, Location};

const MAX_ITERATIONS: usize = 1000;

/// Relative gap below which sorted eigenvalues share an eigenspace.
const CLUSTER_TOL: Real = 1e-7;

fn nan_matrix(n: usize) -> DMatrix<Real> {
    DMatrix::from_element(n, n, Real::NAN)
}

/// Eigenvalues of `a` sorted ascending, or `None` for a complex spectrum.
fn sorted_real_eigenvalues(a: &DMatrix<Real>, scale: Real) -> Option<Vec<Real>> {
    let schur = Schur::try_new(a.clone(), Real::EPSILON, MAX_ITERATIONS)?;
    let mut values = Vec::with_capacity(a.nrows());
    for z in schur.complex_eigenvalues().iter() {
        if z.im.abs() > CLUSTER_TOL * scale {
            return None;
        }
        values.push(z.re);
    }
    values.sort_by(|x, y| x.total_cmp(y));
    Some(values)
}

/// `|A| = R |Λ| R⁻¹` for a square matrix with a real spectrum.
///
/// Eigenvalues are grouped into clusters of numerically equal values and
/// each cluster contributes a basis of its generalized eigenspace, the null
/// space of `(A − λI)^m` for a cluster of size `m`. For a diagonalizable
/// matrix this is the usual eigenvector matrix; for a defective one (Jordan
/// blocks, nilpotent blocks) it still spans the invariant subspace, so the
/// result is `Σ |λ| P` over the spectral projectors `P` and stays finite.
/// Non-finite input or a complex spectrum give a matrix full of `NaN`.
pub fn abs_matrix(a: &DMatrix<Real>) -> DMatrix<Real> {
    let n = a.nrows();
    if n != a.ncols() || a.iter().any(|v| !v.is_finite()) {
        return nan_matrix(n.max(a.ncols()));
    }
    if n == 0 {
        return DMatrix::zeros(0, 0);
    }
    if n == 1 {
        return DMatrix::from_element(1, 1, a[(0, 0)].abs());
    }
    let scale = a.amax();
    if scale == 0.0 {
        return DMatrix::zeros(n, n);
    }

    let Some(lambda) = sorted_real_eigenvalues(a, scale) else {
        return nan_matrix(n);
    };

    let identity = DMatrix::<Real>::identity(n, n);
    let mut r = DMatrix::<Real>::zeros(n, n);
    let mut abs_lambda = nalgebra::DVector::<Real>::zeros(n);
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && lambda[end] - lambda[end - 1] <= CLUSTER_TOL * scale {
            end += 1;
        }
        let size = end - start;
        let mean = lambda[start..end].iter().sum::<Real>() / size as Real;

        // scaled so the power stays O(1)
        let shifted = (a - &identity * mean) / scale;
        let mut power = shifted.clone();
        for _ in 1..size {
            power = &power * &shifted;
        }

        let Some(svd) = SVD::try_new(power, false, true, Real::EPSILON, MAX_ITERATIONS) else {
            return nan_matrix(n);
        };
        let Some(v_t) = svd.v_t.as_ref() else {
            return nan_matrix(n);
        };
        let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
        order.sort_by(|&i, &j| svd.singular_values[i].total_cmp(&svd.singular_values[j]));

        for (k, &row) in order.iter().take(size).enumerate() {
            r.set_column(start + k, &v_t.row(row).transpose());
            abs_lambda[start + k] = mean.abs();
        }
        start = end;
    }

    let Some(r_inv) = r.clone().try_inverse() else {
        warn!(n, "generalized eigenvector basis is singular");
        return nan_matrix(n);
    };
    r * DMatrix::from_diagonal(&abs_lambda) * r_inv
}

/// Coefficient block of one cell projected onto an oriented face area.
fn project(coeff: &Field, dim: usize, nequ: usize, cell: usize, area: &[Real; 3]) -> DMatrix<Real> {
    let block = nequ * nequ;
    DMatrix::from_fn(nequ, nequ, |row, col| {
        (0..dim)
            .map(|d| coeff.get(d * block + row * nequ + col, cell) * area[d])
            .sum()
    })
}

fn split_face(
    mesh: &dyn Mesh,
    coeff: &Field,
    dim: usize,
    nequ: usize,
    face: usize,
) -> (DMatrix<Real>, DMatrix<Real>) {
    let (id1, id2) = mesh.adjacent_cell_ids();
    let area = &mesh.oriented_face_areas()[face];
    let c_d = project(coeff, dim, nequ, id1[face], area);
    let c_u = project(coeff, dim, nequ, id2[face], area);
    let average = (&c_u + &c_d) * 0.5;
    let abs = abs_matrix(&average);
    ((c_d + &abs) * 0.5, (c_u - abs) * 0.5)
}

/// Split every face of the mesh. `coeff` is a cell field of element shape
/// `[dim, nequ, nequ]` (or `[nequ, nequ]`, read as `dim == 1`; a scalar
/// unknown may also pass a `[dim]` vector); the result is a face field of
/// element shape `[2, nequ, nequ]`.
pub(crate) fn roe_split(mesh: &dyn Mesh, coeff: &Field, nequ: usize) -> Field {
    let dim = match coeff.elem_shape() {
        [d, _, _] | [d] => *d,
        _ => 1,
    };
    let nf = mesh.face_count();
    let block = nequ * nequ;

    let faces: Vec<(DMatrix<Real>, DMatrix<Real>)> = (0..nf)
        .into_par_iter()
        .map(|f| split_face(mesh, coeff, dim, nequ, f))
        .collect();

    let mut out = Field::uniform(Location::Face, vec![2, nequ, nequ], nf, 0.0);
    let data = out.data_mut();
    let mut degenerate = 0_usize;
    for (f, (slot0, slot1)) in faces.iter().enumerate() {
        if slot0.iter().chain(slot1.iter()).any(|v| !v.is_finite()) {
            degenerate += 1;
        }
        for row in 0..nequ {
            for col in 0..nequ {
                let c = row * nequ + col;
                data[c * nf + f] = slot0[(row, col)];
                data[(block + c) * nf + f] = slot1[(row, col)];
            }
        }
    }
    if degenerate > 0 {
        warn!(faces = degenerate, "Roe decomposition produced non-finite blocks");
    }
    out
}
