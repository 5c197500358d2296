//! Conversions between linear frequency and the Laplace variable.

use std::f64::consts::PI;

use num_complex::Complex;

/// Returns the angular frequency corresponding to a linear frequency `hz`.
#[inline]
#[must_use]
pub fn angular_frequency(hz: f64) -> f64 {
    2.0 * PI * hz
}

/// Returns the linear frequency in hertz for an angular frequency `omega`.
#[inline]
#[must_use]
pub fn frequency_from_angular(omega: f64) -> f64 {
    omega / (2.0 * PI)
}

/// Laplace variable on the imaginary axis, `s = j·2π·f`, for pure AC analysis.
#[inline]
#[must_use]
pub fn laplace_at(hz: f64) -> Complex<f64> {
    Complex::new(0.0, angular_frequency(hz))
}
