use crate::FvError;

/// Floating point type used throughout system
pub type Real = f64;

/// Absolute and relative tolerance pair for residual tests.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

/// Check a whole slice; reports the first offending value.
pub fn ensure_all_finite(values: &[Real], what: &'static str) -> Result<(), FvError> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(&value) => Err(FvError::NonFinite { what, value }),
        None => Ok(()),
    }
}

/// Residual-style convergence test; `false` whenever `norm` is NaN.
pub fn within_tolerance(norm: Real, reference: Real, tol: Tolerances) -> bool {
    norm <= tol.abs || norm <= tol.rel * reference
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_all_finite_reports_first_bad_value() {
        assert!(ensure_all_finite(&[1.0, 2.0], "ok").is_ok());
        let err = ensure_all_finite(&[1.0, Real::INFINITY, Real::NAN], "vec").unwrap_err();
        assert!(matches!(err, FvError::NonFinite { value, .. } if value.is_infinite()));
    }

    #[test]
    fn nan_never_within_tolerance() {
        let tol = Tolerances::default();
        assert!(!within_tolerance(Real::NAN, 1.0, tol));
        assert!(within_tolerance(1e-13, 1.0, tol));
    }
}
