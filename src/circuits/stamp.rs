//! Nodal stamping helpers for dense admittance assembly.
//!
//! Two dense conventions are supported:
//!
//! - [`NodalBuilder`] stamps every branch into the full symmetric matrix.
//! - [`HalfDenseBuilder`] only writes the upper triangle (diagonal included).
//!   The result is *not* an admittance matrix until it has been passed through
//!   [`symmetrize`] exactly once.

use nalgebra::DMatrix;

use crate::math::{CMatrix, CScalar};

use super::component::{BuildError, Component};
use super::netlist::{Netlist, Node};

/// Builder for nodal analysis systems using element stamping.
pub struct NodalBuilder {
    y: CMatrix,
}

impl NodalBuilder {
    /// Creates a stamping context with `node_count` non-ground nodes.
    #[must_use]
    pub fn new(node_count: usize) -> Self {
        Self { y: DMatrix::zeros(node_count, node_count) }
    }

    /// Stamps an admittance `y` between nodes `a` and `b`.
    pub fn stamp_admittance(&mut self, a: Node, b: Node, y: CScalar) {
        match (a, b) {
            (Some(i), Some(j)) if i == j => {}
            (Some(i), Some(j)) => {
                self.y[(i, i)] += y;
                self.y[(j, j)] += y;
                self.y[(i, j)] -= y;
                self.y[(j, i)] -= y;
            }
            (Some(i), None) | (None, Some(i)) => {
                self.y[(i, i)] += y;
            }
            (None, None) => {}
        }
    }

    /// Stamps every branch of `netlist` at complex frequency `s`.
    ///
    /// # Errors
    ///
    /// Propagates the first [`BuildError`] raised by a component.
    pub fn stamp_netlist(&mut self, netlist: &Netlist, s: CScalar) -> Result<(), BuildError> {
        for branch in netlist.branches() {
            let y = branch.element.admittance(s)?;
            self.stamp_admittance(branch.a, branch.b, y);
        }
        Ok(())
    }

    /// Returns the assembled admittance matrix.
    #[must_use]
    pub fn into_matrix(self) -> CMatrix {
        self.y
    }
}

/// Builder that fills only the upper triangle of the admittance matrix.
///
/// Each node-to-node branch contributes to both diagonals and to the single
/// off-diagonal slot `(min(a, b), max(a, b))`. The strictly-lower triangle
/// stays zero.
pub struct HalfDenseBuilder {
    y: CMatrix,
}

impl HalfDenseBuilder {
    /// Creates an all-zero half matrix for `node_count` nodes.
    #[must_use]
    pub fn new(node_count: usize) -> Self {
        Self { y: DMatrix::zeros(node_count, node_count) }
    }

    /// Stamps an admittance `y` between nodes `a` and `b` into the upper triangle.
    pub fn stamp_admittance(&mut self, a: Node, b: Node, y: CScalar) {
        match (a, b) {
            (Some(i), Some(j)) if i == j => {}
            (Some(i), Some(j)) => {
                self.y[(i, i)] += y;
                self.y[(j, j)] += y;
                self.y[(i.min(j), i.max(j))] -= y;
            }
            (Some(i), None) | (None, Some(i)) => {
                self.y[(i, i)] += y;
            }
            (None, None) => {}
        }
    }

    /// Stamps every branch of `netlist` at complex frequency `s`.
    ///
    /// # Errors
    ///
    /// Propagates the first [`BuildError`] raised by a component.
    pub fn stamp_netlist(&mut self, netlist: &Netlist, s: CScalar) -> Result<(), BuildError> {
        for branch in netlist.branches() {
            let y = branch.element.admittance(s)?;
            self.stamp_admittance(branch.a, branch.b, y);
        }
        Ok(())
    }

    /// Returns the half-filled matrix. Pass it through [`symmetrize`] before solving.
    #[must_use]
    pub fn into_half(self) -> CMatrix {
        self.y
    }
}

/// Restores the full admittance matrix from its upper-triangle form:
/// `Y = Y_half + Y_halfᵀ − diag(Y_half)`.
///
/// The diagonal is present once in `Y_half` and would be doubled by adding the
/// transpose, so it is subtracted once. Applying this to an already-full matrix
/// corrupts it.
#[must_use]
pub fn symmetrize(half: &CMatrix) -> CMatrix {
    let mut full = half + half.transpose();
    for k in 0..full.nrows().min(full.ncols()) {
        full[(k, k)] -= half[(k, k)];
    }
    full
}

/// Largest `|Y[a][b] − Y[b][a]|` over all index pairs.
#[must_use]
pub fn symmetry_defect(matrix: &CMatrix) -> f64 {
    let n = matrix.nrows();
    let mut worst: f64 = 0.0;
    for r in 0..n {
        for c in (r + 1)..n {
            worst = worst.max((matrix[(r, c)] - matrix[(c, r)]).norm());
        }
    }
    worst
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use num_complex::Complex;

    use super::*;
    use crate::constants::laplace_at;
    use crate::math::CVector;

    fn rlc_net() -> Netlist {
        let mut net = Netlist::new("rlc", 3);
        net.resistor("R1", Some(0), None, 50.0)
            .inductor("L1", Some(0), Some(1), 1e-3)
            .capacitor("C1", Some(1), None, 1e-6)
            .resistor("R2", Some(1), Some(2), 100.0)
            .capacitor("C2", Some(2), Some(0), 2e-6)
            .resistor("R3", Some(2), None, 1_000.0);
        net
    }

    #[test]
    fn dc_resistor_with_current_source() {
        // 1Ω from node 0 to ground, 1A injected into node 0 => 1V at node 0.
        let mut b = NodalBuilder::new(1);
        b.stamp_admittance(Some(0), None, Complex::new(1.0, 0.0));
        let y = b.into_matrix();
        let i = CVector::from_element(1, Complex::new(1.0, 0.0));
        let v = y.lu().solve(&i).unwrap();
        assert_relative_eq!(v[0].re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn half_dense_leaves_lower_triangle_empty() {
        let mut b = HalfDenseBuilder::new(3);
        b.stamp_netlist(&rlc_net(), laplace_at(1.0e3)).unwrap();
        let half = b.into_half();
        for r in 0..3 {
            for c in 0..r {
                assert_eq!(half[(r, c)], Complex::new(0.0, 0.0));
            }
        }
    }

    #[test]
    fn symmetrized_half_matches_full_stamp() {
        let net = rlc_net();
        let s = laplace_at(2.5e3);
        let mut half = HalfDenseBuilder::new(3);
        half.stamp_netlist(&net, s).unwrap();
        let mut full = NodalBuilder::new(3);
        full.stamp_netlist(&net, s).unwrap();

        let restored = symmetrize(&half.into_half());
        let reference = full.into_matrix();
        for r in 0..3 {
            for c in 0..3 {
                assert_relative_eq!(restored[(r, c)].re, reference[(r, c)].re, max_relative = 1e-14);
                assert_relative_eq!(restored[(r, c)].im, reference[(r, c)].im, max_relative = 1e-14);
            }
        }
        assert_eq!(symmetry_defect(&restored), 0.0);
    }

    #[test]
    fn symmetrize_does_not_double_diagonal() {
        let half = CMatrix::from_row_slice(2, 2, &[
            Complex::new(1.0, 0.0), Complex::new(-1.0, 0.0),
            Complex::new(0.0, 0.0), Complex::new(2.0, 0.0),
        ]);
        let full = symmetrize(&half);
        assert_eq!(full[(0, 0)], Complex::new(1.0, 0.0));
        assert_eq!(full[(1, 1)], Complex::new(2.0, 0.0));
        assert_eq!(full[(1, 0)], Complex::new(-1.0, 0.0));
    }

    #[test]
    fn zero_resistor_propagates_build_error() {
        let mut net = Netlist::new("short", 1);
        net.resistor("R0", Some(0), None, 0.0);
        let mut b = NodalBuilder::new(1);
        assert!(matches!(
            b.stamp_netlist(&net, laplace_at(60.0)),
            Err(BuildError::SingularConfiguration { .. })
        ));
    }
}
