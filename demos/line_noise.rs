use std::time::Instant;

use nodal_sweep::circuits::analysis::{ac_sweep, Assembly, NetlistAdmittance};
use nodal_sweep::circuits::library::{line_source, transmission_line, LineParameters};
use nodal_sweep::circuits::noise::NoisyAdmittance;
use nodal_sweep::circuits::solver::{DenseLu, SolveStrategy, SparseLu};
use nodal_sweep::errors::NodalSweepError;
use nodal_sweep::sweep::mag;

fn main() -> Result<(), NodalSweepError> {
    env_logger::init();

    let sections = 400;
    let line = LineParameters { conductance: 1e-7, ..LineParameters::default() };
    let clean = NetlistAdmittance::new(transmission_line(sections, &line), Assembly::Sparse)?;
    // 1% component tolerance, reproducible.
    let noisy = NoisyAdmittance::new(clean, 0.01, 2024);
    let rhs = line_source(sections + 1);

    let strategies: [&dyn SolveStrategy; 2] = [&DenseLu, &SparseLu::default()];
    let mut loads = Vec::new();
    for strategy in strategies {
        let start = Instant::now();
        let result = ac_sweep(&noisy, &rhs, 1.0e6, 1.0e8, 50, strategy)?;
        println!(
            "{:>10}: {} samples in {:?} ({} failed)",
            strategy.name(),
            result.len(),
            start.elapsed(),
            result.failures().len()
        );
        loads.push(result.node_voltages(sections));
    }

    let worst = loads[0]
        .iter()
        .zip(&loads[1])
        .filter_map(|(a, b)| Some((*a)? - (*b)?))
        .map(|d| d.norm())
        .fold(0.0_f64, f64::max);
    println!("max |V_dense - V_sparse| at load: {worst:.3e}");

    let load: Vec<_> = loads[1].iter().flatten().copied().collect();
    let m = mag(load);
    println!("load |V| range: {:.4e} .. {:.4e}", m.iter().copied().fold(f64::INFINITY, f64::min), m.iter().copied().fold(0.0, f64::max));
    Ok(())
}
