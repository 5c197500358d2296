use num_complex::Complex;
use thiserror::Error;

use crate::math::{CScalar, Scalar};

/// Errors raised while assembling an admittance matrix.
///
/// These are configuration errors: the same topology evaluated at the same `s`
/// fails the same way every time, so callers should not retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    /// A component value sits in a denominator that evaluates to exactly zero.
    #[error("singular configuration: {component} ({reason})")]
    SingularConfiguration {
        /// Name of the offending component.
        component: String,
        /// Which term vanished.
        reason: &'static str,
    },
    /// A component value is NaN or infinite.
    #[error("component {component} has non-finite value {value}")]
    NonFiniteValue {
        /// Name of the offending component.
        component: String,
        /// The rejected value.
        value: Scalar,
    },
    /// A branch references a node outside `0..node_count`.
    #[error("branch {component} references node {node}, but the circuit has {node_count} nodes")]
    NodeOutOfRange {
        /// Name of the offending component.
        component: String,
        /// Referenced node index.
        node: usize,
        /// Number of non-ground nodes.
        node_count: usize,
    },
    /// A hand-written builder returned a matrix of the wrong shape.
    #[error("builder produced a {rows}x{cols} matrix, expected {expected}x{expected}")]
    DimensionMismatch {
        /// Rows produced.
        rows: usize,
        /// Columns produced.
        cols: usize,
        /// Expected node count.
        expected: usize,
    },
}

/// Trait implemented by lumped two-terminal components.
pub trait Component {
    /// Returns the component's admittance at the complex frequency `s`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::SingularConfiguration`] if the admittance term
    /// would divide by exactly zero.
    fn admittance(&self, s: CScalar) -> Result<CScalar, BuildError>;

    /// Human-readable identifier (e.g. `R1`).
    fn name(&self) -> &str;

    /// Checks values that are invalid at every frequency.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] describing the rejected value.
    fn validate(&self) -> Result<(), BuildError>;
}

fn finite(name: &str, value: Scalar) -> Result<(), BuildError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(BuildError::NonFiniteValue { component: name.to_owned(), value })
    }
}

fn singular(name: &str, reason: &'static str) -> BuildError {
    BuildError::SingularConfiguration { component: name.to_owned(), reason }
}

/// Lumped resistor model.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Resistor {
    name: String,
    resistance: Scalar,
}

impl Resistor {
    /// Creates a resistor.
    #[must_use]
    pub fn new(name: impl Into<String>, resistance_ohms: Scalar) -> Self {
        Self { name: name.into(), resistance: resistance_ohms }
    }

    /// Resistance in ohms.
    #[must_use]
    pub const fn resistance(&self) -> Scalar {
        self.resistance
    }
}

impl Component for Resistor {
    fn admittance(&self, _s: CScalar) -> Result<CScalar, BuildError> {
        if self.resistance == 0.0 {
            return Err(singular(&self.name, "zero resistance in 1/R"));
        }
        Ok(Complex::new(1.0 / self.resistance, 0.0))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), BuildError> {
        finite(&self.name, self.resistance)?;
        if self.resistance == 0.0 {
            return Err(singular(&self.name, "zero resistance in 1/R"));
        }
        Ok(())
    }
}

/// Lumped capacitor model (ideal).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Capacitor {
    name: String,
    capacitance: Scalar,
}

impl Capacitor {
    /// Creates a capacitor.
    #[must_use]
    pub fn new(name: impl Into<String>, capacitance_f: Scalar) -> Self {
        Self { name: name.into(), capacitance: capacitance_f }
    }

    /// Returns the capacitance in farads.
    #[must_use]
    pub const fn capacitance(&self) -> Scalar {
        self.capacitance
    }
}

impl Component for Capacitor {
    fn admittance(&self, s: CScalar) -> Result<CScalar, BuildError> {
        Ok(s * self.capacitance)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), BuildError> {
        finite(&self.name, self.capacitance)
    }
}

/// Lumped inductor model (ideal).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Inductor {
    name: String,
    inductance: Scalar,
}

impl Inductor {
    /// Creates an inductor.
    #[must_use]
    pub fn new(name: impl Into<String>, inductance_h: Scalar) -> Self {
        Self { name: name.into(), inductance: inductance_h }
    }

    /// Returns the inductance in henries.
    #[must_use]
    pub const fn inductance(&self) -> Scalar {
        self.inductance
    }
}

impl Component for Inductor {
    fn admittance(&self, s: CScalar) -> Result<CScalar, BuildError> {
        let sl = s * self.inductance;
        if sl == Complex::new(0.0, 0.0) {
            return Err(singular(&self.name, "s·L is zero in 1/(s·L)"));
        }
        Ok(sl.inv())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), BuildError> {
        finite(&self.name, self.inductance)?;
        if self.inductance == 0.0 {
            return Err(singular(&self.name, "zero inductance in 1/(s·L)"));
        }
        Ok(())
    }
}

/// Series resistor-inductor branch, `Y = 1/(R + s·L)`.
///
/// Used for lossy line sections where the winding resistance and inductance
/// share a single branch without an internal node.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRl {
    name: String,
    resistance: Scalar,
    inductance: Scalar,
}

impl SeriesRl {
    /// Creates a series R-L branch.
    #[must_use]
    pub fn new(name: impl Into<String>, resistance_ohms: Scalar, inductance_h: Scalar) -> Self {
        Self { name: name.into(), resistance: resistance_ohms, inductance: inductance_h }
    }

    /// Branch impedance `R + s·L`.
    #[must_use]
    pub fn impedance(&self, s: CScalar) -> CScalar {
        s * self.inductance + self.resistance
    }
}

impl Component for SeriesRl {
    fn admittance(&self, s: CScalar) -> Result<CScalar, BuildError> {
        let z = self.impedance(s);
        if z == Complex::new(0.0, 0.0) {
            return Err(singular(&self.name, "R + s·L is zero"));
        }
        Ok(z.inv())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), BuildError> {
        finite(&self.name, self.resistance)?;
        finite(&self.name, self.inductance)?;
        if self.resistance == 0.0 && self.inductance == 0.0 {
            return Err(singular(&self.name, "R and L are both zero"));
        }
        Ok(())
    }
}
