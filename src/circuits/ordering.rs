//! Bandwidth-reducing orderings for sparse admittance matrices.
//!
//! Nodal admittance matrices of ladder-like circuits are narrow-banded once
//! their nodes are numbered along the ladder. Reverse Cuthill-McKee recovers
//! such a numbering from an arbitrary one. [`super::solver::SparseLuSolver`]
//! applies it as a pre-pass before the sparse LU.
//!
//! # References
//!
//! - Cuthill & McKee (1969). "Reducing the Bandwidth of Sparse Symmetric Matrices".
//!   Proc. 24th Nat. Conf. ACM, 157-172.
//! - George & Liu (1979). "An Implementation of a Pseudoperipheral Node Finder".
//!   ACM TOMS 5(3), 284-295.

#![cfg(feature = "sparse")]

use std::collections::VecDeque;

use nalgebra_sparse::{coo::CooMatrix, CscMatrix};

use crate::math::CScalar;

/// Permutation vector representing a reordering of rows/columns.
///
/// `perm[i] = j` means the i-th row/column in the new ordering corresponds
/// to the j-th row/column in the original matrix.
pub type Permutation = Vec<usize>;

/// Adjacency lists of the pattern of `A + Aᵀ`, sorted and deduplicated.
fn build_adjacency(matrix: &CscMatrix<CScalar>) -> Vec<Vec<usize>> {
    let n = matrix.nrows();
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (row, col, _val) in matrix.triplet_iter() {
        if row != col {
            adj[row].push(col);
            adj[col].push(row);
        }
    }
    for list in &mut adj {
        list.sort_unstable();
        list.dedup();
    }
    adj
}

/// Breadth-first level structure rooted at `root`, restricted to unvisited nodes.
fn level_structure(adj: &[Vec<usize>], root: usize, blocked: &[bool]) -> Vec<Vec<usize>> {
    let mut seen = blocked.to_vec();
    let mut levels = vec![vec![root]];
    seen[root] = true;
    loop {
        let mut next = Vec::new();
        for &node in levels.last().into_iter().flatten() {
            for &nb in &adj[node] {
                if !seen[nb] {
                    seen[nb] = true;
                    next.push(nb);
                }
            }
        }
        if next.is_empty() {
            return levels;
        }
        levels.push(next);
    }
}

/// Finds a pseudo-peripheral node of the component containing `start`.
///
/// Repeatedly jumps to a minimum-degree node of the deepest level until the
/// eccentricity stops growing.
fn pseudo_peripheral_node(adj: &[Vec<usize>], start: usize, blocked: &[bool]) -> usize {
    let mut root = start;
    let mut depth = level_structure(adj, root, blocked).len();
    loop {
        let levels = level_structure(adj, root, blocked);
        let candidate = levels
            .last()
            .and_then(|last| last.iter().copied().min_by_key(|&v| adj[v].len()))
            .unwrap_or(root);
        let candidate_depth = level_structure(adj, candidate, blocked).len();
        if candidate_depth <= depth {
            return root;
        }
        root = candidate;
        depth = candidate_depth;
    }
}

/// Reverse Cuthill-McKee (RCM) ordering for bandwidth reduction.
///
/// Each connected component is traversed breadth-first from a
/// pseudo-peripheral node, visiting neighbours in increasing degree order
/// (ties broken by index, so the result is deterministic). The concatenated
/// order is then reversed.
///
/// # Complexity
///
/// O(n + nnz) per level-structure pass.
#[must_use]
pub fn rcm_ordering(matrix: &CscMatrix<CScalar>) -> Permutation {
    let n = matrix.nrows();
    let adj = build_adjacency(matrix);

    let mut ordering = Vec::with_capacity(n);
    let mut visited = vec![false; n];
    let mut queue = VecDeque::new();

    while ordering.len() < n {
        // Lowest-degree unvisited node seeds the next component.
        let Some(seed) = (0..n).filter(|&v| !visited[v]).min_by_key(|&v| adj[v].len()) else {
            break;
        };
        let start = pseudo_peripheral_node(&adj, seed, &visited);

        queue.push_back(start);
        visited[start] = true;
        while let Some(node) = queue.pop_front() {
            ordering.push(node);
            let mut neighbors: Vec<usize> = adj[node]
                .iter()
                .copied()
                .filter(|&nb| !visited[nb])
                .collect();
            neighbors.sort_by_key(|&nb| (adj[nb].len(), nb));
            for nb in neighbors {
                visited[nb] = true;
                queue.push_back(nb);
            }
        }
    }

    ordering.reverse();
    ordering
}

/// Inverse of a permutation: `inv[perm[i]] = i`.
#[must_use]
pub fn invert(perm: &Permutation) -> Permutation {
    let mut inv = vec![0; perm.len()];
    for (new_idx, &old_idx) in perm.iter().enumerate() {
        inv[old_idx] = new_idx;
    }
    inv
}

/// Bandwidth `max |i − j|` over stored off-diagonal entries after applying `perm`.
#[must_use]
pub fn compute_bandwidth(matrix: &CscMatrix<CScalar>, perm: &Permutation) -> usize {
    let inv = invert(perm);
    matrix
        .triplet_iter()
        .map(|(row, col, _)| inv[row].abs_diff(inv[col]))
        .max()
        .unwrap_or(0)
}

/// Applies a symmetric permutation: returns `P·A·Pᵀ`.
#[must_use]
pub fn permute_matrix(matrix: &CscMatrix<CScalar>, perm: &Permutation) -> CscMatrix<CScalar> {
    let n = matrix.nrows();
    let inv = invert(perm);
    let mut coo = CooMatrix::new(n, n);
    for (row, col, &val) in matrix.triplet_iter() {
        coo.push(inv[row], inv[col], val);
    }
    CscMatrix::from(&coo)
}

/// Ordering strategy selection.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderingStrategy {
    /// No reordering (natural ordering).
    Natural,
    /// Reverse Cuthill-McKee (bandwidth reduction).
    Rcm,
    /// RCM unless the matrix is tiny or nearly dense.
    #[default]
    Auto,
}

/// Below this dimension reordering costs more than it saves.
const AUTO_MIN_DIMENSION: usize = 32;

/// Computes the permutation for `strategy`, resolving `Auto` from the matrix shape.
#[must_use]
pub fn ordering_for(matrix: &CscMatrix<CScalar>, strategy: OrderingStrategy) -> (Permutation, OrderingStrategy) {
    let n = matrix.nrows();
    let resolved = match strategy {
        OrderingStrategy::Auto => {
            let cells = (n * n).max(1);
            let density = matrix.nnz() as f64 / cells as f64;
            if n < AUTO_MIN_DIMENSION || density > 0.25 {
                OrderingStrategy::Natural
            } else {
                OrderingStrategy::Rcm
            }
        }
        other => other,
    };
    let perm = match resolved {
        OrderingStrategy::Rcm => rcm_ordering(matrix),
        _ => (0..n).collect(),
    };
    (perm, resolved)
}
