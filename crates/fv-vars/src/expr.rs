//! Expression nodes for derived variables.
//!
//! Each node names its inputs (`requires`) and computes a fresh `Field` from
//! their current values (`evaluate`). Evaluation is a pure function of the
//! inputs and the mesh, so unchanged inputs give bit-identical output.

use fv_core::{Real, VarId};
use fv_mesh::Mesh;

use crate::error::{VarError, VarResult};
use crate::field::{Field, Location};
use crate::graph::VarGraph;
use crate::roe;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UnaryOp {
    Neg,
    Abs,
    Square,
    Sqrt,
    Scale(Real),
    Offset(Real),
    /// 1 where the value exceeds the threshold, 0 elsewhere.
    Greater(Real),
}

/// Cell-to-face interpolation scheme.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Interpolation {
    /// Distance-weighted blend of the two adjacent cells.
    Linear,
    /// Plain average of the two adjacent cells.
    Arithmetic,
    /// Take the cell the face velocity flows out of.
    Upwind { velocity: VarId },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Expr {
    Binary { op: BinaryOp, lhs: VarId, rhs: VarId },
    Unary { op: UnaryOp, arg: VarId },
    /// Normal derivative across each face.
    FaceGrad(VarId),
    /// Gauss-theorem gradient vector per cell.
    CellGrad(VarId),
    /// Euclidean norm over the leading element axis.
    Magnitude(VarId),
    Interpolate { arg: VarId, scheme: Interpolation },
    /// Depends on the coefficient alone; the unknown only fixes `nequ`.
    RoeSplit { coeff: VarId },
}

impl Expr {
    pub fn requires(&self) -> Vec<VarId> {
        match *self {
            Expr::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Expr::Unary { arg, .. }
            | Expr::FaceGrad(arg)
            | Expr::CellGrad(arg)
            | Expr::Magnitude(arg) => vec![arg],
            Expr::Interpolate { arg, scheme } => match scheme {
                Interpolation::Upwind { velocity } => vec![arg, velocity],
                Interpolation::Linear | Interpolation::Arithmetic => vec![arg],
            },
            Expr::RoeSplit { coeff } => vec![coeff],
        }
    }

    /// Compute the node value; every requirement must already be fresh.
    pub(crate) fn evaluate(
        &self,
        graph: &VarGraph<'_>,
        location: Location,
        elem_shape: &[usize],
    ) -> VarResult<Field> {
        let mesh = graph.mesh();
        let len = match location {
            Location::Cell => mesh.cell_count(),
            Location::Face => mesh.face_count(),
        };
        let mut out = Field::uniform(location, elem_shape.to_vec(), len, 0.0);

        match *self {
            Expr::Binary { op, lhs, rhs } => {
                binary(op, graph.cached(lhs)?, graph.cached(rhs)?, &mut out)
            }
            Expr::Unary { op, arg } => unary(op, graph.cached(arg)?, &mut out),
            Expr::FaceGrad(arg) => face_grad(mesh, graph.cached(arg)?, &mut out),
            Expr::CellGrad(arg) => cell_grad(mesh, graph.cached(arg)?, &mut out),
            Expr::Magnitude(arg) => magnitude(graph.cached(arg)?, &mut out),
            Expr::Interpolate { arg, scheme } => {
                let velocity = match scheme {
                    Interpolation::Upwind { velocity } => Some(graph.cached(velocity)?),
                    Interpolation::Linear | Interpolation::Arithmetic => None,
                };
                interpolate(mesh, graph.cached(arg)?, scheme, velocity, &mut out)
            }
            Expr::RoeSplit { coeff } => {
                let nequ = elem_shape.get(1).copied().ok_or_else(|| {
                    VarError::shape("Roe split output", &[2, 0, 0], elem_shape)
                })?;
                return Ok(roe::roe_split(mesh, graph.cached(coeff)?, nequ));
            }
        }
        Ok(out)
    }
}

fn binary(op: BinaryOp, a: &Field, b: &Field, out: &mut Field) {
    let n = out.len();
    let ca = a.components();
    let cb = b.components();
    let comps = out.components();
    let (ad, bd) = (a.data(), b.data());
    let data = out.data_mut();
    for c in 0..comps {
        // scalar operands broadcast over components
        let ka = if ca == 1 { 0 } else { c };
        let kb = if cb == 1 { 0 } else { c };
        for i in 0..n {
            let x = ad[ka * n + i];
            let y = bd[kb * n + i];
            data[c * n + i] = match op {
                BinaryOp::Add => x + y,
                BinaryOp::Sub => x - y,
                BinaryOp::Mul => x * y,
                BinaryOp::Div => x / y,
            };
        }
    }
}

fn unary(op: UnaryOp, a: &Field, out: &mut Field) {
    for (o, &x) in out.data_mut().iter_mut().zip(a.data()) {
        *o = match op {
            UnaryOp::Neg => -x,
            UnaryOp::Abs => x.abs(),
            UnaryOp::Square => x * x,
            UnaryOp::Sqrt => x.sqrt(),
            UnaryOp::Scale(k) => k * x,
            UnaryOp::Offset(k) => x + k,
            UnaryOp::Greater(t) => {
                if x > t {
                    1.0
                } else {
                    0.0
                }
            }
        };
    }
}

fn face_grad(mesh: &dyn Mesh, a: &Field, out: &mut Field) {
    let (id1, id2) = mesh.adjacent_cell_ids();
    let nf = out.len();
    let comps = out.components();
    let data = out.data_mut();
    for f in 0..nf {
        if id1[f] == id2[f] {
            continue;
        }
        let d = mesh.cell_distance(f);
        for c in 0..comps {
            data[c * nf + f] = (a.get(c, id2[f]) - a.get(c, id1[f])) / d;
        }
    }
}

fn cell_grad(mesh: &dyn Mesh, a: &Field, out: &mut Field) {
    let (id1, id2) = mesh.adjacent_cell_ids();
    let areas = mesh.oriented_face_areas();
    let volumes = mesh.cell_volumes();
    let nc = out.len();
    let dim = out.components();
    let data = out.data_mut();

    for f in 0..mesh.face_count() {
        let w = mesh.interpolation_weight(f);
        let value = w * a.get(0, id1[f]) + (1.0 - w) * a.get(0, id2[f]);
        for d in 0..dim {
            let flux = value * areas[f][d];
            data[d * nc + id1[f]] += flux;
            if id1[f] != id2[f] {
                data[d * nc + id2[f]] -= flux;
            }
        }
    }
    for d in 0..dim {
        for i in 0..nc {
            data[d * nc + i] /= volumes[i];
        }
    }
}

fn magnitude(a: &Field, out: &mut Field) {
    let n = out.len();
    let inner = out.components();
    let leading = if a.elem_shape().is_empty() {
        1
    } else {
        a.elem_shape()[0]
    };
    let data = out.data_mut();
    for c in 0..inner {
        for i in 0..n {
            let mut sum: Real = 0.0;
            for k in 0..leading {
                let x = a.get(k * inner + c, i);
                sum += x * x;
            }
            data[c * n + i] = sum.sqrt();
        }
    }
}

fn interpolate(
    mesh: &dyn Mesh,
    a: &Field,
    scheme: Interpolation,
    velocity: Option<&Field>,
    out: &mut Field,
) {
    let (id1, id2) = mesh.adjacent_cell_ids();
    let areas = mesh.oriented_face_areas();
    let nf = out.len();
    let comps = out.components();
    let data = out.data_mut();

    for f in 0..nf {
        let w = match (scheme, velocity) {
            (Interpolation::Linear, _) => mesh.interpolation_weight(f),
            (Interpolation::Arithmetic, _) => {
                if id1[f] == id2[f] {
                    1.0
                } else {
                    0.5
                }
            }
            (Interpolation::Upwind { .. }, Some(u)) => {
                if normal_velocity(u, areas[f], f) >= 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            (Interpolation::Upwind { .. }, None) => 1.0,
        };
        for c in 0..comps {
            data[c * nf + f] = w * a.get(c, id1[f]) + (1.0 - w) * a.get(c, id2[f]);
        }
    }
}

/// Signed normal velocity on a face: scalar fields already are normal
/// components, vector fields are projected onto the oriented area.
pub(crate) fn normal_velocity(u: &Field, area: [Real; 3], f: usize) -> Real {
    if u.components() == 1 {
        return u.get(0, f);
    }
    (0..u.components().min(3))
        .map(|d| u.get(d, f) * area[d])
        .sum()
}
