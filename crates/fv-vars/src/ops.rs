//! Combinators that register derived variables.
//!
//! Every method validates locations and element shapes up front, so a
//! registered node can always be evaluated.

use fv_core::{Real, VarId};

use crate::error::{VarError, VarResult};
use crate::expr::{BinaryOp, Expr, Interpolation, UnaryOp};
use crate::field::{Location, component_count};
use crate::graph::VarGraph;

impl VarGraph<'_> {
    fn expect_location(&self, id: VarId, expected: Location, what: &str) -> VarResult<()> {
        let actual = self.location(id)?;
        if actual != expected {
            return Err(VarError::LocationMismatch {
                what: format!("{what} of '{}'", self.name(id)?),
                expected,
                actual,
            });
        }
        Ok(())
    }

    fn binary(&mut self, op: BinaryOp, lhs: VarId, rhs: VarId) -> VarResult<VarId> {
        let location = self.location(lhs)?;
        self.expect_location(rhs, location, "binary operand")?;

        let a = self.elem_shape(lhs)?.to_vec();
        let b = self.elem_shape(rhs)?.to_vec();
        let elem_shape = if a == b || component_count(&b) == 1 {
            a
        } else if component_count(&a) == 1 {
            b
        } else {
            return Err(VarError::shape("binary operand", &a, &b));
        };

        let symbol = match op {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        };
        let name = format!("({} {symbol} {})", self.name(lhs)?, self.name(rhs)?);
        self.derived(name, location, elem_shape, Expr::Binary { op, lhs, rhs })
    }

    fn unary(&mut self, op: UnaryOp, arg: VarId) -> VarResult<VarId> {
        let location = self.location(arg)?;
        let elem_shape = self.elem_shape(arg)?.to_vec();
        let inner = self.name(arg)?;
        let name = match op {
            UnaryOp::Neg => format!("-{inner}"),
            UnaryOp::Abs => format!("abs({inner})"),
            UnaryOp::Square => format!("{inner}^2"),
            UnaryOp::Sqrt => format!("sqrt({inner})"),
            UnaryOp::Scale(k) => format!("{k} * {inner}"),
            UnaryOp::Offset(k) => format!("({inner} + {k})"),
            UnaryOp::Greater(t) => format!("({inner} > {t})"),
        };
        self.derived(name, location, elem_shape, Expr::Unary { op, arg })
    }

    pub fn add(&mut self, lhs: VarId, rhs: VarId) -> VarResult<VarId> {
        self.binary(BinaryOp::Add, lhs, rhs)
    }

    pub fn sub(&mut self, lhs: VarId, rhs: VarId) -> VarResult<VarId> {
        self.binary(BinaryOp::Sub, lhs, rhs)
    }

    pub fn mul(&mut self, lhs: VarId, rhs: VarId) -> VarResult<VarId> {
        self.binary(BinaryOp::Mul, lhs, rhs)
    }

    pub fn div(&mut self, lhs: VarId, rhs: VarId) -> VarResult<VarId> {
        self.binary(BinaryOp::Div, lhs, rhs)
    }

    pub fn scale(&mut self, arg: VarId, factor: Real) -> VarResult<VarId> {
        self.unary(UnaryOp::Scale(factor), arg)
    }

    pub fn offset(&mut self, arg: VarId, shift: Real) -> VarResult<VarId> {
        self.unary(UnaryOp::Offset(shift), arg)
    }

    pub fn neg(&mut self, arg: VarId) -> VarResult<VarId> {
        self.unary(UnaryOp::Neg, arg)
    }

    pub fn abs(&mut self, arg: VarId) -> VarResult<VarId> {
        self.unary(UnaryOp::Abs, arg)
    }

    pub fn square(&mut self, arg: VarId) -> VarResult<VarId> {
        self.unary(UnaryOp::Square, arg)
    }

    pub fn sqrt(&mut self, arg: VarId) -> VarResult<VarId> {
        self.unary(UnaryOp::Sqrt, arg)
    }

    /// 1/0 mask of `arg > threshold`.
    pub fn greater(&mut self, arg: VarId, threshold: Real) -> VarResult<VarId> {
        self.unary(UnaryOp::Greater(threshold), arg)
    }

    /// Normal derivative `(a[id2] - a[id1]) / d` on every face; zero on the
    /// boundary.
    pub fn face_grad(&mut self, arg: VarId) -> VarResult<VarId> {
        self.expect_location(arg, Location::Cell, "face gradient input")?;
        let elem_shape = self.elem_shape(arg)?.to_vec();
        let name = format!("{}.faceGrad", self.name(arg)?);
        self.derived(name, Location::Face, elem_shape, Expr::FaceGrad(arg))
    }

    /// Cell gradient of a scalar cell variable, element shape `[dim]`.
    pub fn cell_grad(&mut self, arg: VarId) -> VarResult<VarId> {
        self.expect_location(arg, Location::Cell, "cell gradient input")?;
        if self.components(arg)? != 1 {
            return Err(VarError::shape(
                "cell gradient input",
                &[],
                self.elem_shape(arg)?,
            ));
        }
        let dim = self.mesh().dim();
        let name = format!("{}.grad", self.name(arg)?);
        self.derived(name, Location::Cell, vec![dim], Expr::CellGrad(arg))
    }

    /// Euclidean norm over the leading element axis.
    pub fn mag(&mut self, arg: VarId) -> VarResult<VarId> {
        let location = self.location(arg)?;
        let shape = self.elem_shape(arg)?;
        let elem_shape = shape.get(1..).map(<[usize]>::to_vec).unwrap_or_default();
        let name = format!("{}.mag", self.name(arg)?);
        self.derived(name, location, elem_shape, Expr::Magnitude(arg))
    }

    /// Cell-to-face interpolation.
    pub fn interpolate(&mut self, arg: VarId, scheme: Interpolation) -> VarResult<VarId> {
        self.expect_location(arg, Location::Cell, "interpolation input")?;
        if let Interpolation::Upwind { velocity } = scheme {
            self.expect_location(velocity, Location::Face, "upwind velocity")?;
            let comps = self.components(velocity)?;
            if comps != 1 && comps != self.mesh().dim() {
                return Err(VarError::shape(
                    "upwind velocity",
                    &[self.mesh().dim()],
                    self.elem_shape(velocity)?,
                ));
            }
        }
        let elem_shape = self.elem_shape(arg)?.to_vec();
        let suffix = match scheme {
            Interpolation::Linear => "faceValue",
            Interpolation::Arithmetic => "arithmeticFaceValue",
            Interpolation::Upwind { .. } => "upwindFaceValue",
        };
        let name = format!("{}.{suffix}", self.name(arg)?);
        self.derived(name, Location::Face, elem_shape, Expr::Interpolate { arg, scheme })
    }

    /// Roe split of a coupled system.
    ///
    /// `var` is the cell unknown, scalar or of shape `[nequ]`; `coeff` is a
    /// cell variable of shape `[dim, nequ, nequ]` or `[nequ, nequ]`. The
    /// result is a face variable of shape `[2, nequ, nequ]`.
    pub fn roe(&mut self, var: VarId, coeff: VarId) -> VarResult<VarId> {
        self.expect_location(var, Location::Cell, "Roe unknown")?;
        self.expect_location(coeff, Location::Cell, "Roe coefficient")?;

        let nequ = self.components(var)?;
        let shape = self.elem_shape(coeff)?.to_vec();
        let ok = match shape.as_slice() {
            [r, c] => *r == nequ && *c == nequ,
            [d, r, c] => *d >= 1 && *d <= 3 && *r == nequ && *c == nequ,
            // scalar unknown with a velocity-like coefficient
            [] => nequ == 1,
            [d] => nequ == 1 && *d >= 1 && *d <= 3,
            _ => false,
        };
        if !ok {
            return Err(VarError::shape(
                "Roe coefficient",
                &[self.mesh().dim(), nequ, nequ],
                &shape,
            ));
        }

        let name = format!("roe({}, {})", self.name(var)?, self.name(coeff)?);
        self.derived(
            name,
            Location::Face,
            vec![2, nequ, nequ],
            Expr::RoeSplit { coeff },
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::{Field, Interpolation, Location, VarError, VarGraph};
    use fv_mesh::{Grid1D, Grid2D, Mesh};

    #[test]
    fn arithmetic_broadcasts_scalars() {
        let mesh = Grid1D::new(2, 1.0).unwrap();
        let mut g = VarGraph::new(&mesh);
        let v = g
            .primary("v", Location::Cell, vec![2], vec![1.0, 2.0, 3.0, 4.0])
            .unwrap();
        let s = g.cell_var("s", 10.0).unwrap();
        let prod = g.mul(s, v).unwrap();
        assert_eq!(g.elem_shape(prod).unwrap(), &[2]);
        assert_eq!(g.value(prod).unwrap().data(), &[10.0, 20.0, 30.0, 40.0]);
        let diff = g.sub(v, s).unwrap();
        assert_eq!(g.value(diff).unwrap().data(), &[-9.0, -8.0, -7.0, -6.0]);
    }

    #[test]
    fn arithmetic_rejects_mixed_locations() {
        let mesh = Grid1D::new(2, 1.0).unwrap();
        let mut g = VarGraph::new(&mesh);
        let c = g.cell_var("c", 1.0).unwrap();
        let f = g.face_var("f", 1.0).unwrap();
        assert!(matches!(
            g.add(c, f),
            Err(VarError::LocationMismatch { .. })
        ));
    }

    #[test]
    fn arithmetic_rejects_incompatible_shapes() {
        let mesh = Grid1D::new(2, 1.0).unwrap();
        let mut g = VarGraph::new(&mesh);
        let a = g
            .primary("a", Location::Cell, vec![2], vec![0.0; 4])
            .unwrap();
        let b = g
            .primary("b", Location::Cell, vec![3], vec![0.0; 6])
            .unwrap();
        assert!(matches!(g.add(a, b), Err(VarError::ShapeMismatch { .. })));
    }

    #[test]
    fn mask_times_value() {
        let mesh = Grid1D::new(4, 1.0).unwrap();
        let mut g = VarGraph::new(&mesh);
        let m = g
            .primary("m", Location::Cell, vec![], vec![-1.0, 0.0, 0.5, 2.0])
            .unwrap();
        let mask = g.greater(m, 0.0).unwrap();
        let pos = g.mul(mask, m).unwrap();
        assert_eq!(g.value(pos).unwrap().data(), &[0.0, 0.0, 0.5, 2.0]);
    }

    #[test]
    fn face_grad_of_linear_profile() {
        let mesh = Grid1D::new(4, 0.5).unwrap();
        let mut g = VarGraph::new(&mesh);
        let x: Vec<f64> = mesh.cell_centers().iter().map(|c| 3.0 * c[0]).collect();
        let phi = g.primary("phi", Location::Cell, vec![], x).unwrap();
        let grad = g.face_grad(phi).unwrap();
        let values = g.value(grad).unwrap().data().to_vec();
        assert_eq!(values[0], 0.0);
        assert_eq!(values[4], 0.0);
        for v in &values[1..4] {
            assert!((v - 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn cell_grad_exact_for_linear_field_in_interior() {
        let mesh = Grid2D::new(4, 3, 1.0, 2.0).unwrap();
        let mut g = VarGraph::new(&mesh);
        let values: Vec<f64> = mesh
            .cell_centers()
            .iter()
            .map(|c| 2.0 * c[0] - c[1])
            .collect();
        let phi = g.primary("phi", Location::Cell, vec![], values).unwrap();
        let grad = g.cell_grad(phi).unwrap();
        assert_eq!(g.elem_shape(grad).unwrap(), &[2]);
        let field = g.value(grad).unwrap().clone();
        // cell (1, 1) has only interior faces
        let cell = 4 + 1;
        assert!((field.get(0, cell) - 2.0).abs() < 1e-12);
        assert!((field.get(1, cell) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn magnitude_over_leading_axis() {
        let mesh = Grid1D::new(2, 1.0).unwrap();
        let mut g = VarGraph::new(&mesh);
        let v = g
            .primary("v", Location::Cell, vec![2], vec![3.0, 0.0, 4.0, -2.0])
            .unwrap();
        let m = g.mag(v).unwrap();
        assert!(g.elem_shape(m).unwrap().is_empty());
        assert_eq!(g.value(m).unwrap().data(), &[5.0, 2.0]);
    }

    #[test]
    fn interpolation_schemes() {
        let mesh = Grid1D::new(3, 1.0).unwrap();
        let mut g = VarGraph::new(&mesh);
        let phi = g
            .primary("phi", Location::Cell, vec![], vec![1.0, 2.0, 4.0])
            .unwrap();
        let lin = g.interpolate(phi, Interpolation::Linear).unwrap();
        assert_eq!(g.value(lin).unwrap().data(), &[1.0, 1.5, 3.0, 4.0]);

        let u = g.face_var("u", -1.0).unwrap();
        let up = g
            .interpolate(phi, Interpolation::Upwind { velocity: u })
            .unwrap();
        assert_eq!(g.value(up).unwrap().data(), &[1.0, 2.0, 4.0, 4.0]);
        g.set_uniform(u, 1.0).unwrap();
        assert_eq!(g.value(up).unwrap().data(), &[1.0, 1.0, 2.0, 4.0]);
    }

    #[test]
    fn face_grad_requires_cell_input() {
        let mesh = Grid1D::new(2, 1.0).unwrap();
        let mut g = VarGraph::new(&mesh);
        let f = g.face_var("f", 0.0).unwrap();
        assert!(g.face_grad(f).is_err());
        assert!(g.interpolate(f, Interpolation::Linear).is_err());
    }

    #[test]
    fn roe_checks_coefficient_shape() {
        let mesh = Grid1D::new(2, 1.0).unwrap();
        let mut g = VarGraph::new(&mesh);
        let q = g
            .primary("q", Location::Cell, vec![2], vec![0.0; 4])
            .unwrap();
        let bad = g
            .primary("a", Location::Cell, vec![3, 3], vec![0.0; 18])
            .unwrap();
        assert!(g.roe(q, bad).is_err());
        let good = g
            .primary("a", Location::Cell, vec![1, 2, 2], vec![0.0; 8])
            .unwrap();
        let split = g.roe(q, good).unwrap();
        assert_eq!(g.elem_shape(split).unwrap(), &[2, 2, 2]);
        let field: &Field = g.value(split).unwrap();
        assert!(field.data().iter().all(|&v| v == 0.0));
    }
}
