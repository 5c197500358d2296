//! High-level orchestration for frequency sweeps.

use log::{info, warn};

use crate::circuits::analysis::{ac_sweep, AdmittanceBuilder, SweepError, SweepResult};
use crate::circuits::solver::{DenseLu, SolveStrategy};
use crate::math::{CVector, Scalar};

#[cfg(feature = "sparse")]
use crate::circuits::solver::{AutoSolve, SparseLu};

/// Which linear solver a sweep uses.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverChoice {
    /// Dense LU.
    Dense,
    /// Sparse LU with bandwidth-reducing ordering (feature `sparse`).
    Sparse,
    /// Dense or sparse per sample from the matrix shape; dense without feature `sparse`.
    #[default]
    Auto,
}

impl SolverChoice {
    /// Instantiates the strategy.
    ///
    /// # Errors
    ///
    /// [`SimulationError::InvalidConfig`] for [`SolverChoice::Sparse`] when the
    /// crate is built without the `sparse` feature.
    pub fn strategy(self) -> Result<Box<dyn SolveStrategy>, SimulationError> {
        match self {
            Self::Dense => Ok(Box::new(DenseLu)),
            #[cfg(feature = "sparse")]
            Self::Sparse => Ok(Box::new(SparseLu::default())),
            #[cfg(feature = "sparse")]
            Self::Auto => Ok(Box::new(AutoSolve::default())),
            #[cfg(not(feature = "sparse"))]
            Self::Sparse => Err(SimulationError::InvalidConfig(
                "sparse solver requested but the `sparse` feature is disabled".into(),
            )),
            #[cfg(not(feature = "sparse"))]
            Self::Auto => Ok(Box::new(DenseLu)),
        }
    }
}

/// Parameters of one linear AC sweep.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    /// Human-readable identifier.
    pub name: String,
    /// First sample frequency in hertz.
    pub f_start_hz: Scalar,
    /// Last sample frequency in hertz.
    pub f_end_hz: Scalar,
    /// Number of intervals; the sweep has `partitions + 1` samples.
    pub partitions: usize,
    /// Linear solver.
    pub solver: SolverChoice,
    /// Solve samples on rayon's pool (feature `parallel`).
    pub parallel: bool,
}

impl SweepConfig {
    /// Creates a sequential sweep over `[f_start_hz, f_end_hz]` with automatic solver choice.
    #[must_use]
    pub fn new(name: impl Into<String>, f_start_hz: Scalar, f_end_hz: Scalar, partitions: usize) -> Self {
        Self {
            name: name.into(),
            f_start_hz,
            f_end_hz,
            partitions,
            solver: SolverChoice::Auto,
            parallel: false,
        }
    }

    /// Sets the solver.
    #[must_use]
    pub const fn with_solver(mut self, solver: SolverChoice) -> Self {
        self.solver = solver;
        self
    }

    /// Enables or disables parallel solving.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the partition count.
    #[must_use]
    pub const fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions;
        self
    }

    /// Number of samples the sweep produces.
    #[must_use]
    pub const fn sample_count(&self) -> usize {
        self.partitions + 1
    }

    /// Checks the configuration without running it.
    ///
    /// # Errors
    ///
    /// [`SimulationError::InvalidConfig`] for a zero partition count or
    /// negative or non-finite frequencies.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.partitions == 0 {
            return Err(SimulationError::InvalidConfig("partitions must be > 0".into()));
        }
        for (label, f) in [("f_start_hz", self.f_start_hz), ("f_end_hz", self.f_end_hz)] {
            if !f.is_finite() || f < 0.0 {
                return Err(SimulationError::InvalidConfig(format!(
                    "{label} must be a finite, non-negative frequency (got {f})"
                )));
            }
        }
        Ok(())
    }

    /// Runs the sweep for `builder` driven by the fixed source vector `rhs`.
    ///
    /// # Errors
    ///
    /// Configuration errors from [`Self::validate`] or [`SolverChoice::strategy`],
    /// and [`SweepError`] from the sweep itself. Per-sample solver failures are
    /// reported inside the returned [`SweepResult`].
    pub fn run<B>(&self, builder: &B, rhs: &CVector) -> Result<SweepResult, SimulationError>
    where
        B: AdmittanceBuilder + ?Sized,
    {
        self.validate()?;
        let strategy = self.solver.strategy()?;
        info!(
            "{}: {} samples over {:.3e}..{:.3e} Hz, {} nodes, solver {}",
            self.name,
            self.sample_count(),
            self.f_start_hz,
            self.f_end_hz,
            builder.node_count(),
            strategy.name()
        );
        let result = if self.parallel {
            self.run_parallel(builder, rhs, strategy.as_ref())?
        } else {
            ac_sweep(builder, rhs, self.f_start_hz, self.f_end_hz, self.partitions, strategy.as_ref())?
        };
        Ok(result)
    }

    #[cfg(feature = "parallel")]
    fn run_parallel<B>(&self, builder: &B, rhs: &CVector, strategy: &dyn SolveStrategy) -> Result<SweepResult, SweepError>
    where
        B: AdmittanceBuilder + ?Sized,
    {
        crate::circuits::analysis::ac_sweep_parallel(builder, rhs, self.f_start_hz, self.f_end_hz, self.partitions, strategy)
    }

    #[cfg(not(feature = "parallel"))]
    fn run_parallel<B>(&self, builder: &B, rhs: &CVector, strategy: &dyn SolveStrategy) -> Result<SweepResult, SweepError>
    where
        B: AdmittanceBuilder + ?Sized,
    {
        warn!("{}: parallel sweep requested without the `parallel` feature; running sequentially", self.name);
        ac_sweep(builder, rhs, self.f_start_hz, self.f_end_hz, self.partitions, strategy)
    }
}

/// Trait for simulation engines.
pub trait SimulationEngine {
    /// Executes the simulation using the provided configuration.
    ///
    /// # Errors
    ///
    /// Implementation-specific configuration or execution failures.
    fn run(&mut self, config: &SweepConfig) -> Result<(), SimulationError>;
}

/// Sweep engine bound to one circuit and source vector, keeping the last result.
pub struct SweepEngine<B> {
    builder: B,
    rhs: CVector,
    result: Option<SweepResult>,
}

impl<B: AdmittanceBuilder> SweepEngine<B> {
    /// Binds `builder` to the source vector `rhs`.
    ///
    /// # Errors
    ///
    /// [`SimulationError::InvalidConfig`] if `rhs` does not have one entry per node.
    pub fn new(builder: B, rhs: CVector) -> Result<Self, SimulationError> {
        if rhs.len() != builder.node_count() {
            return Err(SimulationError::InvalidConfig(format!(
                "source vector has length {}, circuit has {} nodes",
                rhs.len(),
                builder.node_count()
            )));
        }
        Ok(Self { builder, rhs, result: None })
    }

    /// Result of the most recent run.
    #[must_use]
    pub const fn result(&self) -> Option<&SweepResult> {
        self.result.as_ref()
    }

    /// Takes ownership of the most recent result.
    pub fn take_result(&mut self) -> Option<SweepResult> {
        self.result.take()
    }

    /// Bound builder.
    #[must_use]
    pub const fn builder(&self) -> &B {
        &self.builder
    }
}

impl<B: AdmittanceBuilder> SimulationEngine for SweepEngine<B> {
    fn run(&mut self, config: &SweepConfig) -> Result<(), SimulationError> {
        let result = config.run(&self.builder, &self.rhs)?;
        if !result.is_complete() {
            warn!("{}: {} of {} samples failed", config.name, result.failures().len(), result.len());
        }
        self.result = Some(result);
        Ok(())
    }
}

/// Errors that can occur while configuring or executing simulations.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// Raised when the configuration is internally inconsistent.
    #[error("configuration error: {0}")]
    InvalidConfig(String),
    /// The sweep itself failed.
    #[error(transparent)]
    Sweep(#[from] SweepError),
}
