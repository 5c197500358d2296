//! Seeded multiplicative noise on admittance entries.
//!
//! [`NoisyAdmittance`] wraps another builder and scales every nonzero entry by
//! `1 + σ·z` with `z ~ N(0, 1)`. Mirrored entries `Y[a][b]` and `Y[b][a]` share
//! one draw, so the perturbed matrix stays symmetric. The stream for each
//! sample is reseeded from the base seed and the bits of `s`, which keeps
//! `build` a pure function of `s` and lets parallel sweeps reproduce
//! sequential ones exactly.

use std::collections::BTreeMap;

use crate::math::{CScalar, Scalar};

use super::analysis::{AdmittanceBuilder, Assembly, SystemMatrix};
use super::component::BuildError;

/// A source of standard normal deviates.
pub trait NoiseSource {
    /// Next sample from `N(0, 1)`.
    fn next_standard_normal(&mut self) -> Scalar;
}

/// 64-bit LCG with a Box-Muller transform. Reproducible, not cryptographic.
#[derive(Debug, Clone)]
pub struct SeededNoise {
    state: u64,
}

impl SeededNoise {
    /// Creates a generator from an explicit seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Uniform sample in `[0, 1)`.
    pub fn next_uniform(&mut self) -> Scalar {
        self.state = self.state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        (self.state >> 33) as Scalar / (1u64 << 31) as Scalar
    }
}

impl NoiseSource for SeededNoise {
    fn next_standard_normal(&mut self) -> Scalar {
        let u1 = self.next_uniform().max(1e-10);
        let u2 = self.next_uniform();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

/// Finalizer from SplitMix64; spreads nearby `s` values across the seed space.
const fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Decorator adding seeded multiplicative noise to another builder's output.
#[derive(Debug, Clone)]
pub struct NoisyAdmittance<B> {
    inner: B,
    sigma: Scalar,
    seed: u64,
}

impl<B: AdmittanceBuilder> NoisyAdmittance<B> {
    /// Wraps `inner` with relative standard deviation `sigma`.
    #[must_use]
    pub const fn new(inner: B, sigma: Scalar, seed: u64) -> Self {
        Self { inner, sigma, seed }
    }

    /// Relative standard deviation.
    #[must_use]
    pub const fn sigma(&self) -> Scalar {
        self.sigma
    }

    /// Wrapped builder.
    #[must_use]
    pub const fn inner(&self) -> &B {
        &self.inner
    }

    fn source_for(&self, s: CScalar) -> SeededNoise {
        SeededNoise::new(mix(self.seed ^ mix(s.re.to_bits()) ^ mix(s.im.to_bits().rotate_left(17))))
    }

    /// Factor for the unordered pair `(i, j)`, drawn on first use.
    fn factor(
        &self,
        factors: &mut BTreeMap<(usize, usize), Scalar>,
        noise: &mut impl NoiseSource,
        i: usize,
        j: usize,
    ) -> Scalar {
        *factors
            .entry((i.min(j), i.max(j)))
            .or_insert_with(|| 1.0 + self.sigma * noise.next_standard_normal())
    }
}

impl<B: AdmittanceBuilder> AdmittanceBuilder for NoisyAdmittance<B> {
    fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    fn assembly(&self) -> Assembly {
        self.inner.assembly()
    }

    fn build(&self, s: CScalar) -> Result<SystemMatrix, BuildError> {
        let mut matrix = self.inner.build(s)?;
        if self.sigma == 0.0 {
            return Ok(matrix);
        }
        let mut noise = self.source_for(s);
        let mut factors = BTreeMap::new();
        let zero = CScalar::new(0.0, 0.0);
        match &mut matrix {
            SystemMatrix::Dense(m) => {
                for j in 0..m.ncols() {
                    for i in 0..m.nrows() {
                        if m[(i, j)] != zero {
                            let k = self.factor(&mut factors, &mut noise, i, j);
                            m[(i, j)] *= k;
                        }
                    }
                }
            }
            #[cfg(feature = "sparse")]
            SystemMatrix::Sparse(m) => {
                for (i, j, v) in m.triplet_iter_mut() {
                    if *v != zero {
                        let k = self.factor(&mut factors, &mut noise, i, j);
                        *v *= k;
                    }
                }
            }
        }
        Ok(matrix)
    }
}
