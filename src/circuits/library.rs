//! Ready-made topologies used by the tests, benches and demos.

use num_complex::Complex;

use crate::math::{CVector, Scalar};

use super::netlist::{Netlist, Node};

/// One node, `R` to ground.
#[must_use]
pub fn single_resistor(ohms: Scalar) -> Netlist {
    let mut net = Netlist::new("single-resistor", 1);
    net.resistor("R1", Some(0), None, ohms);
    net
}

/// Two nodes, 1 Ω between them and 1 Ω from the second to ground.
///
/// `Y = [[1, -1], [-1, 2]]` at every frequency.
#[must_use]
pub fn two_node_divider() -> Netlist {
    let mut net = Netlist::new("two-node-divider", 2);
    net.resistor("R1", Some(0), Some(1), 1.0).resistor("Rg", Some(1), None, 1.0);
    net
}

/// Nodes of the phase splitter's two outputs.
pub const PHASE_SPLITTER_OUTPUTS: (usize, usize) = (8, 16);

/// Node count of [`phase_splitter`].
pub const PHASE_SPLITTER_NODES: usize = 17;

/// Arm entry nodes driven by the floating source of [`phase_splitter_source`].
const PHASE_SPLITTER_DRIVE: (usize, usize) = (1, 9);

/// Capacitor coupling the fourth node of each splitter arm.
const CROSS_CAPACITANCE: Scalar = 4.7e-6;

/// Lays out one arm of the phase splitter on nodes `first..first + 8`, its
/// winding returning to `tap`.
fn splitter_arm(net: &mut Netlist, tag: &str, first: usize, tap: Node) {
    const WINDING: Scalar = 0.1;
    const SERIES_R: Scalar = 10.0;
    const SERIES_L: Scalar = 20e-3;
    const SHUNT_R: Scalar = 1.0e3;
    const SHUNT_C: Scalar = 10e-6;

    net.inductor(&format!("Lw{tag}"), Some(first), tap, WINDING);
    for k in 0..7 {
        let (a, b) = (first + k, first + k + 1);
        if k % 2 == 0 {
            net.resistor(&format!("Rs{tag}{k}"), Some(a), Some(b), SERIES_R);
        } else {
            net.inductor(&format!("Ls{tag}{k}"), Some(a), Some(b), SERIES_L);
        }
    }
    for k in 0..8 {
        let node = Some(first + k);
        if k % 2 == 0 {
            net.resistor(&format!("Ra{tag}{k}"), node, None, SHUNT_R);
        } else {
            net.capacitor(&format!("Ca{tag}{k}"), node, None, SHUNT_C);
        }
    }
    let out = Some(first + 7);
    net.resistor(&format!("RL{tag}"), out, None, 600.0)
        .capacitor(&format!("CL{tag}"), out, None, 1e-6);
}

/// 17-node RLC phase splitter.
///
/// This is a constructed mirror-symmetric network with the node count and
/// output nodes of a 17-node phase splitter. It is not a transcription of any
/// particular schematic, and its 180° output relation follows from the mirror
/// symmetry and the antisymmetric drive. Use it as a fixture for assembly and
/// solver checks, not as a reference for a real splitter's response.
///
/// Node 0 is a centre tap tied to ground through 1 Ω. Nodes `1..=8` and
/// `9..=16` are two identical arms, each fed from the tap through a 0.1 H
/// winding and built as an alternating R/L ladder with shunt R and C. A
/// 4.7 µF capacitor couples the fourth node of each arm. Driven by
/// [`phase_splitter_source`], the two outputs ([`PHASE_SPLITTER_OUTPUTS`])
/// are equal in magnitude and 180° apart at every frequency.
#[must_use]
pub fn phase_splitter() -> Netlist {
    let mut net = Netlist::new("phase-splitter", PHASE_SPLITTER_NODES);
    net.resistor("Rct", Some(0), None, 1.0);
    splitter_arm(&mut net, "a", 1, Some(0));
    splitter_arm(&mut net, "b", 9, Some(0));
    net.capacitor("Cx", Some(4), Some(12), CROSS_CAPACITANCE);
    net
}

/// Floating 1 A source between the two arm inputs of [`phase_splitter`].
#[must_use]
pub fn phase_splitter_source() -> CVector {
    let mut j = CVector::zeros(PHASE_SPLITTER_NODES);
    j[PHASE_SPLITTER_DRIVE.0] = Complex::new(1.0, 0.0);
    j[PHASE_SPLITTER_DRIVE.1] = Complex::new(-1.0, 0.0);
    j
}

/// Per-section values of an RLGC ladder.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineParameters {
    /// Series resistance per section (Ω).
    pub resistance: Scalar,
    /// Series inductance per section (H).
    pub inductance: Scalar,
    /// Shunt conductance per section (S); zero omits the branch.
    pub conductance: Scalar,
    /// Shunt capacitance per section (F).
    pub capacitance: Scalar,
    /// Norton source resistance at the sending end (Ω).
    pub source_resistance: Scalar,
    /// Load resistance at the receiving end (Ω).
    pub load_resistance: Scalar,
}

impl Default for LineParameters {
    fn default() -> Self {
        // Roughly 50 Ω coax cut into centimetre sections.
        Self {
            resistance: 0.01,
            inductance: 2.5e-9,
            conductance: 0.0,
            capacitance: 1.0e-12,
            source_resistance: 50.0,
            load_resistance: 50.0,
        }
    }
}

/// Lumped RLGC ladder of `sections` sections, `sections + 1` nodes.
///
/// Node 0 is the sending end, node `sections` the receiving end. The matrix
/// is tridiagonal in natural order, which makes it the large sparse case.
#[must_use]
pub fn transmission_line(sections: usize, line: &LineParameters) -> Netlist {
    let n = sections + 1;
    let mut net = Netlist::new(format!("rlgc-line-{sections}"), n);
    net.resistor("Rs", Some(0), None, line.source_resistance);
    for k in 0..sections {
        let next = Some(k + 1);
        net.series_rl(&format!("Z{k}"), Some(k), next, line.resistance, line.inductance)
            .capacitor(&format!("C{k}"), next, None, line.capacitance);
        if line.conductance > 0.0 {
            net.resistor(&format!("G{k}"), next, None, line.conductance.recip());
        }
    }
    net.resistor("Rl", Some(sections), None, line.load_resistance);
    net
}

/// Unit current injected at the sending end of an `n`-node line.
#[must_use]
pub fn line_source(node_count: usize) -> CVector {
    let mut j = CVector::zeros(node_count);
    if node_count > 0 {
        j[0] = Complex::new(1.0, 0.0);
    }
    j
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::circuits::analysis::{assemble, Assembly, NetlistAdmittance, SystemMatrix};
    use crate::circuits::solver::{DenseLu, SolveStrategy};
    use crate::constants::laplace_at;
    use crate::sweep::phase_difference;

    fn solve_splitter(hz: f64) -> CVector {
        let builder = NetlistAdmittance::new(phase_splitter(), Assembly::HalfDense).unwrap();
        let y = assemble(&builder, laplace_at(hz)).unwrap();
        DenseLu.solve(&y, &phase_splitter_source()).unwrap().voltages
    }

    #[test]
    fn phase_splitter_is_well_formed() {
        let net = phase_splitter();
        assert!(net.validate().is_ok());
        assert_eq!(net.node_count(), 17);
        // tap + 2 × (winding + 7 series + 8 shunt + 2 load) + cross
        assert_eq!(net.len(), 1 + 2 * 18 + 1);
    }

    #[test]
    fn phase_splitter_outputs_are_antiphase_at_60_hz() {
        let v = solve_splitter(60.0);
        let (a, b) = PHASE_SPLITTER_OUTPUTS;
        assert!(v[a].norm() > 0.0);
        assert_relative_eq!(v[a].norm(), v[b].norm(), max_relative = 1e-9);
        assert_relative_eq!(phase_difference(v[a], v[b]).abs(), std::f64::consts::PI, epsilon = 1e-6);
        // Centre tap sits at virtual ground.
        assert!(v[0].norm() < 1e-6 * v[a].norm());
    }

    #[test]
    fn phase_splitter_matches_half_circuit_at_60_hz() {
        // Under the antisymmetric drive the tap sits at ground and the far end
        // of Cx at -V, so one arm with 2·Cx to ground carries the same voltages.
        let mut half = Netlist::new("splitter-half", 8);
        splitter_arm(&mut half, "a", 0, None);
        half.capacitor("Cx2", Some(3), None, 2.0 * CROSS_CAPACITANCE);
        let builder = NetlistAdmittance::new(half, Assembly::Full).unwrap();
        let y = assemble(&builder, laplace_at(60.0)).unwrap();
        let mut j = CVector::zeros(8);
        j[0] = Complex::new(1.0, 0.0);
        let expected = DenseLu.solve(&y, &j).unwrap().voltages;

        let v = solve_splitter(60.0);
        for k in 0..8 {
            assert!(expected[k].norm() > 0.0);
            assert!((v[k + 1] - expected[k]).norm() <= 1e-9 * expected[k].norm(), "arm a node {}", k + 1);
            assert!((v[k + 9] + expected[k]).norm() <= 1e-9 * expected[k].norm(), "arm b node {}", k + 9);
        }
        let (a, _) = PHASE_SPLITTER_OUTPUTS;
        assert_relative_eq!(v[a].norm(), expected[7].norm(), max_relative = 1e-9);
    }

    #[test]
    fn phase_splitter_stays_antiphase_across_band() {
        let (a, b) = PHASE_SPLITTER_OUTPUTS;
        for hz in [5.0, 60.0, 400.0, 2.0e3] {
            let v = solve_splitter(hz);
            assert_relative_eq!(phase_difference(v[a], v[b]).abs(), std::f64::consts::PI, epsilon = 1e-6);
        }
    }

    #[test]
    fn divider_matrix_is_frequency_independent() {
        let builder = NetlistAdmittance::new(two_node_divider(), Assembly::Full).unwrap();
        let a = assemble(&builder, laplace_at(1.0)).unwrap();
        let b = assemble(&builder, laplace_at(1.0e6)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn line_is_tridiagonal() {
        let net = transmission_line(10, &LineParameters::default());
        assert_eq!(net.node_count(), 11);
        let builder = NetlistAdmittance::new(net, Assembly::Full).unwrap();
        let SystemMatrix::Dense(y) = assemble(&builder, laplace_at(1.0e6)).unwrap() else {
            panic!("full assembly is dense");
        };
        for r in 0..11_usize {
            for c in 0..11_usize {
                if r.abs_diff(c) > 1 {
                    assert_eq!(y[(r, c)].norm(), 0.0);
                }
            }
        }
        let v = DenseLu.solve(&SystemMatrix::Dense(y), &line_source(11)).unwrap();
        assert!(v.stats.residual < 1e-12);
    }

    #[test]
    fn conductance_adds_shunt_branches() {
        let lossy = LineParameters { conductance: 1e-6, ..LineParameters::default() };
        assert_eq!(transmission_line(4, &lossy).len(), transmission_line(4, &LineParameters::default()).len() + 4);
    }
}
