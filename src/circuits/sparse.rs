//! Sparse admittance assembly (coo builder -> csc matrix), gated behind `sparse`.

#![cfg(feature = "sparse")]

use nalgebra::DMatrix;
use nalgebra_sparse::{coo::CooMatrix, CscMatrix};
use num_complex::Complex;

use crate::math::{CMatrix, CScalar, Scalar};

use super::component::{BuildError, Component};
use super::netlist::{Netlist, Node};

/// Sparse nodal builder. Duplicate entries are summed when finalized.
#[derive(Clone)]
pub struct SparseNodalBuilder {
    coo: CooMatrix<CScalar>,
}

impl SparseNodalBuilder {
    /// Creates a sparse builder with `node_count` nodes.
    pub fn new(node_count: usize) -> Self {
        Self { coo: CooMatrix::new(node_count, node_count) }
    }

    /// Adds a value at (i,j).
    pub fn add(&mut self, i: usize, j: usize, val: CScalar) {
        self.coo.push(i, j, val);
    }

    /// Stamps an admittance `y` between nodes `a` and `b`.
    pub fn stamp_admittance(&mut self, a: Node, b: Node, y: CScalar) {
        match (a, b) {
            (Some(i), Some(j)) if i == j => {}
            (Some(i), Some(j)) => {
                self.add(i, i, y);
                self.add(j, j, y);
                self.add(i, j, -y);
                self.add(j, i, -y);
            }
            (Some(i), None) | (None, Some(i)) => self.add(i, i, y),
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

    /// Finalizes into a CSC matrix, summing duplicate triplets.
    pub fn finalize(self) -> CscMatrix<CScalar> {
        CscMatrix::from(&self.coo)
    }
}

/// Converts a dense matrix to CSC, dropping exact zeros.
#[must_use]
pub fn dense_to_csc(dense: &CMatrix) -> CscMatrix<CScalar> {
    let zero = Complex::new(0.0, 0.0);
    let mut coo = CooMatrix::new(dense.nrows(), dense.ncols());
    for c in 0..dense.ncols() {
        for r in 0..dense.nrows() {
            let v = dense[(r, c)];
            if v != zero {
                coo.push(r, c, v);
            }
        }
    }
    CscMatrix::from(&coo)
}

/// Converts a CSC matrix to dense.
#[must_use]
pub fn csc_to_dense(csc: &CscMatrix<CScalar>) -> CMatrix {
    let mut dense = DMatrix::zeros(csc.nrows(), csc.ncols());
    for (row, col, &value) in csc.triplet_iter() {
        dense[(row, col)] += value;
    }
    dense
}

/// Fraction of stored entries, `nnz / (rows·cols)`.
#[must_use]
pub fn density(csc: &CscMatrix<CScalar>) -> Scalar {
    let cells = csc.nrows() * csc.ncols();
    if cells == 0 {
        return 0.0;
    }
    csc.nnz() as Scalar / cells as Scalar
}
