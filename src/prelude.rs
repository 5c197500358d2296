//! Convenience re-exports for running nodal sweeps.

pub use crate::circuits::{
    analysis::{
        ac_sweep, assemble, write_sweep_node_csv, AdmittanceBuilder, AdmittanceMatrix, Assembly, FnAdmittance,
        NetlistAdmittance, SweepError, SweepPoint, SweepResult, SystemMatrix,
    },
    component::{BuildError, Capacitor, Component, Inductor, Resistor, SeriesRl},
    library::{phase_splitter, phase_splitter_source, transmission_line, LineParameters, PHASE_SPLITTER_OUTPUTS},
    netlist::{Netlist, Node},
    noise::{NoiseSource, NoisyAdmittance, SeededNoise},
    solver::{DenseLu, Solution, SolveStrategy, SolverError, SolverStats},
    stamp::{symmetrize, HalfDenseBuilder, NodalBuilder},
};
#[cfg(feature = "sparse")]
pub use crate::circuits::{
    ordering::OrderingStrategy,
    solver::{AutoSolve, SparseLu},
};
pub use crate::constants::*;
pub use crate::errors::NodalSweepError;
pub use crate::math::{phasor, CMatrix, CScalar, CVector, Scalar};
pub use crate::simulation::{SimulationEngine, SimulationError, SolverChoice, SweepConfig, SweepEngine};
pub use crate::sweep::{frequency_samples, linspace, mag, mag_db, phase_deg, phase_difference, phase_rad, FrequencySample};
