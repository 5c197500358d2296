//! Frequency sample generation and post-processing helpers.

use num_complex::Complex;

use crate::constants::laplace_at;
use crate::math::{wrap_phase, CScalar, Scalar};

/// Generates `n` linearly spaced samples in [start, stop].
#[must_use]
pub fn linspace(start: Scalar, stop: Scalar, n: usize) -> Vec<Scalar> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n as Scalar - 1.0);
            (0..n).map(|i| start + step * i as Scalar).collect()
        }
    }
}

/// One point of a linear frequency sweep.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencySample {
    /// Position in `0..=partitions`.
    pub index: usize,
    /// Frequency in hertz.
    pub frequency_hz: Scalar,
    /// Laplace variable `j·2π·f`.
    pub s: CScalar,
}

/// Lazy iterator over `partitions + 1` evenly spaced frequency samples.
///
/// Sample `i` sits at `f_start + i·(f_end − f_start)/partitions`; the last one
/// is pinned to `f_end` so the range is closed exactly.
#[derive(Debug, Clone)]
pub struct FrequencySamples {
    f_start: Scalar,
    f_end: Scalar,
    partitions: usize,
    next: usize,
}

impl FrequencySamples {
    fn frequency(&self, i: usize) -> Scalar {
        if i == self.partitions {
            self.f_end
        } else {
            self.f_start + i as Scalar * (self.f_end - self.f_start) / self.partitions as Scalar
        }
    }
}

impl Iterator for FrequencySamples {
    type Item = FrequencySample;

    fn next(&mut self) -> Option<Self::Item> {
        if self.partitions == 0 || self.next > self.partitions {
            return None;
        }
        let index = self.next;
        self.next += 1;
        let frequency_hz = self.frequency(index);
        Some(FrequencySample { index, frequency_hz, s: laplace_at(frequency_hz) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.partitions == 0 {
            0
        } else {
            (self.partitions + 1).saturating_sub(self.next)
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FrequencySamples {}

/// Samples `[f_start_hz, f_end_hz]` split into `partitions` intervals.
///
/// Yields nothing when `partitions` is zero.
#[must_use]
pub const fn frequency_samples(f_start_hz: Scalar, f_end_hz: Scalar, partitions: usize) -> FrequencySamples {
    FrequencySamples { f_start: f_start_hz, f_end: f_end_hz, partitions, next: 0 }
}

/// Magnitude of complex sequence.
#[must_use]
pub fn mag(values: impl IntoIterator<Item = Complex<Scalar>>) -> Vec<Scalar> {
    values.into_iter().map(|v| v.norm()).collect()
}

/// Magnitude in dB (20*log10(|x|)), clamping very small values.
#[must_use]
pub fn mag_db(values: impl IntoIterator<Item = Complex<Scalar>>) -> Vec<Scalar> {
    const MIN: Scalar = 1e-300;
    values
        .into_iter()
        .map(|v| 20.0 * (v.norm().max(MIN)).log10())
        .collect()
}

/// Phase in radians of complex sequence.
#[must_use]
pub fn phase_rad(values: impl IntoIterator<Item = Complex<Scalar>>) -> Vec<Scalar> {
    values.into_iter().map(|v| v.arg()).collect()
}

/// Phase in degrees of complex sequence.
#[must_use]
pub fn phase_deg(values: impl IntoIterator<Item = Complex<Scalar>>) -> Vec<Scalar> {
    phase_rad(values).into_iter().map(|r| r.to_degrees()).collect()
}

/// Phase of `a` relative to `b` in radians, wrapped to (-π, π].
#[must_use]
pub fn phase_difference(a: CScalar, b: CScalar) -> Scalar {
    wrap_phase(a.arg() - b.arg())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn linspace_basic() {
        let v = linspace(0.0, 1.0, 5);
        assert_eq!(v, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn samples_cover_closed_range() {
        let samples: Vec<_> = frequency_samples(10.0, 20.0, 4).collect();
        assert_eq!(samples.len(), 5);
        let hz: Vec<_> = samples.iter().map(|s| s.frequency_hz).collect();
        assert_eq!(hz, vec![10.0, 12.5, 15.0, 17.5, 20.0]);
        for (i, s) in samples.iter().enumerate() {
            assert_eq!(s.index, i);
            assert_eq!(s.s.re, 0.0);
            assert_relative_eq!(s.s.im, 2.0 * std::f64::consts::PI * s.frequency_hz);
        }
    }

    #[test]
    fn samples_report_exact_size() {
        let mut it = frequency_samples(0.0, 1.0, 3);
        assert_eq!(it.len(), 4);
        it.next();
        assert_eq!(it.len(), 3);
        assert_eq!(frequency_samples(0.0, 1.0, 0).len(), 0);
        assert_eq!(frequency_samples(0.0, 1.0, 0).next(), None);
    }

    #[test]
    fn descending_range_is_allowed() {
        let hz: Vec<_> = frequency_samples(5.0, 1.0, 4).map(|s| s.frequency_hz).collect();
        assert_eq!(hz, vec![5.0, 4.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn mag_phase_roundtrip() {
        let x = vec![Complex::new(1.0, 0.0), Complex::new(0.0, 1.0)];
        let m = mag(x.clone());
        let p = phase_deg(x);
        assert_relative_eq!(m[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(m[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(p[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(p[1], 90.0, epsilon = 1e-12);
    }

    #[test]
    fn phase_difference_wraps() {
        let a = Complex::from_polar(1.0, 3.0);
        let b = Complex::from_polar(1.0, -3.0);
        assert_relative_eq!(phase_difference(a, b), 6.0 - 2.0 * std::f64::consts::PI, epsilon = 1e-12);
        assert_relative_eq!(mag_db([Complex::new(10.0, 0.0)])[0], 20.0, epsilon = 1e-12);
    }
}
