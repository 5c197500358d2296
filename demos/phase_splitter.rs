use nodal_sweep::circuits::analysis::{Assembly, NetlistAdmittance};
use nodal_sweep::circuits::library::{phase_splitter, phase_splitter_source, PHASE_SPLITTER_OUTPUTS};
use nodal_sweep::errors::NodalSweepError;
use nodal_sweep::simulation::{SolverChoice, SweepConfig};
use nodal_sweep::sweep::{mag_db, phase_deg, phase_difference};

fn main() -> Result<(), NodalSweepError> {
    env_logger::init();

    // Half-dense assembly: only the upper triangle is stamped, then mirrored.
    let builder = NetlistAdmittance::new(phase_splitter(), Assembly::HalfDense)?;
    let rhs = phase_splitter_source();

    // 40 Hz .. 80 Hz in 1 Hz steps around mains frequency.
    let config = SweepConfig::new("phase-splitter", 40.0, 80.0, 40).with_solver(SolverChoice::Dense);
    let result = config.run(&builder, &rhs)?;

    let (a, b) = PHASE_SPLITTER_OUTPUTS;
    println!("freq(Hz), |Va|(dB), arg Va(deg), |Vb|(dB), arg Vb(deg), dphi(deg)");
    for p in &result.points {
        match p.voltages() {
            Some(v) => {
                let db = mag_db([v[a], v[b]]);
                let deg = phase_deg([v[a], v[b]]);
                let dphi = phase_difference(v[a], v[b]).to_degrees();
                println!(
                    "{:.1}, {:.3}, {:.2}, {:.3}, {:.2}, {:.2}",
                    p.frequency_hz, db[0], deg[0], db[1], deg[1], dphi
                );
            }
            None => println!("{:.1}, failed", p.frequency_hz),
        }
    }

    nodal_sweep::circuits::analysis::write_sweep_node_csv(std::io::stdout().lock(), &result, a)?;
    Ok(())
}
