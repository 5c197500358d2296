//! Nodal admittance assembly, linear solve strategies and AC sweeps.

/// Admittance builders, assembly and the frequency sweep driver.
pub mod analysis;
/// Lumped component definitions and traits.
pub mod component;
/// Reference topologies.
pub mod library;
/// Fixed two-terminal topologies.
pub mod netlist;
/// Seeded multiplicative noise on admittance entries.
pub mod noise;
/// Dense nodal stamping and half-dense symmetrization.
pub mod stamp;
/// Dense and sparse linear solve strategies.
pub mod solver;
/// Optional sparse helpers (feature = "sparse").
#[cfg(feature = "sparse")]
pub mod sparse;
/// Bandwidth-reducing orderings (feature = "sparse").
#[cfg(feature = "sparse")]
pub mod ordering;

pub use analysis::{
    ac_sweep, assemble, AdmittanceBuilder, AdmittanceMatrix, Assembly, FnAdmittance, NetlistAdmittance, SweepError,
    SweepPoint, SweepResult, SystemMatrix,
};
#[cfg(feature = "parallel")]
pub use analysis::ac_sweep_parallel;
pub use component::{BuildError, Capacitor, Component, Inductor, Resistor, SeriesRl};
pub use netlist::{Element, Netlist, Node};
pub use noise::{NoiseSource, NoisyAdmittance, SeededNoise};
pub use solver::{DenseLu, Solution, SolveStrategy, SolverError, SolverStats};
#[cfg(feature = "sparse")]
pub use solver::{AutoSolve, SparseLu, SparseLuSolver, SparseSolver};
