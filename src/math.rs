//! Shared numerical primitives anchored on `nalgebra`.

use nalgebra::{DMatrix, DVector};

/// Primary scalar type used across the crate.
pub type Scalar = f64;
/// Primary complex scalar type used for phasors and admittances.
pub type CScalar = num_complex::Complex<Scalar>;
/// Dense complex matrix.
pub type CMatrix = DMatrix<CScalar>;
/// Dense complex column vector.
pub type CVector = DVector<CScalar>;

/// Returns the complex exponential `e^(j * theta)` using `Scalar` precision.
#[must_use]
pub fn phasor(theta: Scalar) -> CScalar {
    CScalar::from_polar(1.0, theta)
}

/// Wraps an angle in radians into `(-π, π]`.
#[must_use]
pub fn wrap_phase(theta: Scalar) -> Scalar {
    let wrapped = phasor(theta).arg();
    if wrapped <= -std::f64::consts::PI {
        wrapped + 2.0 * std::f64::consts::PI
    } else {
        wrapped
    }
}

/// Largest entry magnitude of each column, `max_i |a_ij|`.
#[must_use]
pub fn column_max_abs(matrix: &CMatrix) -> Vec<Scalar> {
    matrix
        .column_iter()
        .map(|col| col.iter().fold(0.0, |acc: Scalar, v| acc.max(v.norm())))
        .collect()
}

/// Relative residual `‖A·x − b‖ / ‖b‖`, or the absolute residual when `b = 0`.
#[must_use]
pub fn relative_residual(a: &CMatrix, x: &CVector, b: &CVector) -> Scalar {
    let residual = (a * x - b).norm();
    let scale = b.norm();
    if scale > 0.0 { residual / scale } else { residual }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn wrap_phase_folds_into_principal_range() {
        let pi = std::f64::consts::PI;
        assert_relative_eq!(wrap_phase(3.0 * pi), pi, epsilon = 1.0e-12);
        assert_relative_eq!(wrap_phase(-pi / 2.0), -pi / 2.0, epsilon = 1.0e-12);
    }

    #[test]
    fn column_maxima_ignore_other_columns() {
        let a = CMatrix::from_row_slice(2, 2, &[
            CScalar::new(100.0, 0.0), CScalar::new(0.0, 0.0),
            CScalar::new(-3.0, 4.0), CScalar::new(0.0, 1.0e-12),
        ]);
        let m = column_max_abs(&a);
        assert_relative_eq!(m[0], 100.0);
        assert_relative_eq!(m[1], 1.0e-12);
    }

    #[test]
    fn residual_of_exact_solution_vanishes() {
        let a = CMatrix::from_row_slice(2, 2, &[
            CScalar::new(2.0, 0.0), CScalar::new(0.0, 1.0),
            CScalar::new(0.0, 1.0), CScalar::new(3.0, 0.0),
        ]);
        let x = CVector::from_vec(vec![CScalar::new(1.0, 0.0), CScalar::new(-1.0, 0.0)]);
        let b = &a * &x;
        assert!(relative_residual(&a, &x, &b) < 1.0e-15);
    }
}
