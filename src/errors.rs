//! Shared error types used across submodules.

use thiserror::Error;

use crate::circuits::analysis::SweepError;
use crate::circuits::component::BuildError;
use crate::circuits::solver::SolverError;
use crate::simulation::SimulationError;

/// Top-level error type for the crate.
#[derive(Debug, Error)]
pub enum NodalSweepError {
    /// Wraps admittance assembly errors.
    #[error(transparent)]
    Build(#[from] BuildError),
    /// Wraps linear solve errors.
    #[error(transparent)]
    Solver(#[from] SolverError),
    /// Wraps sweep errors.
    #[error(transparent)]
    Sweep(#[from] SweepError),
    /// Wraps simulation-related errors.
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    /// Writing exported results failed.
    #[error("export failed: {0}")]
    Io(#[from] std::io::Error),
}
