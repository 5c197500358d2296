//! Linear solve strategies for `Y·V = J`.
//!
//! Every strategy implements [`SolveStrategy`] and must return the same
//! voltages up to floating-point tolerance; picking one is a performance
//! decision only.
//!
//! - [`DenseLu`]: nalgebra partial-pivot LU on a dense copy of `Y`.
//! - [`SparseLu`] (feature `sparse`): optional Reverse Cuthill-McKee pre-pass
//!   followed by faer's sparse LU ([`SparseLuSolver`]).
//! - [`AutoSolve`] (feature `sparse`): picks one of the above per call from the
//!   matrix dimension and density.
//!
//! # References
//!
//! - Davis (2006). "Direct Methods for Sparse Linear Systems". SIAM.

use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::math::{column_max_abs, relative_residual, CMatrix, CScalar, CVector, Scalar};

use super::analysis::SystemMatrix;

#[cfg(feature = "sparse")]
use faer::prelude::*;
#[cfg(feature = "sparse")]
use faer::sparse::linalg::solvers::{Lu, SymbolicLu};
#[cfg(feature = "sparse")]
use faer::sparse::{SparseColMat, Triplet};
#[cfg(feature = "sparse")]
use faer::{c64, Mat};
#[cfg(feature = "sparse")]
use nalgebra_sparse::{pattern::SparsityPattern, CscMatrix};
#[cfg(feature = "sparse")]
use num_complex::Complex;

#[cfg(feature = "sparse")]
use super::ordering::{compute_bandwidth, ordering_for, permute_matrix, OrderingStrategy, Permutation};
#[cfg(feature = "sparse")]
use super::sparse::density;

/// Pivots smaller than this fraction of the largest entry in their column are treated as zero.
pub const PIVOT_TOLERANCE: Scalar = 1.0e-13;

/// Sparse solutions with a relative residual above this are rejected as singular.
pub const SINGULAR_RESIDUAL: Scalar = 1.0e-6;

/// Condition estimates above this are reported as ill-conditioned.
pub const ILL_CONDITIONED: Scalar = 1.0e12;

/// Error types for linear solves.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Matrix is singular or numerically singular.
    SingularMatrix {
        /// Elimination step that found no usable pivot, when the factorization exposes it.
        step: Option<usize>,
        /// Magnitude of the rejected pivot, when known.
        pivot: Option<Scalar>,
    },
    /// Matrix does not match the right-hand side.
    DimensionMismatch {
        /// Matrix rows.
        rows: usize,
        /// Matrix columns.
        cols: usize,
        /// Right-hand side length.
        rhs: usize,
    },
    /// Matrix is not square.
    NotSquare {
        /// Matrix rows.
        rows: usize,
        /// Matrix columns.
        cols: usize,
    },
    /// Matrix or right-hand side holds NaN or infinite entries.
    NonFinite,
    /// Solver used out of order (e.g. `solve` before `numeric`).
    InvalidState(&'static str),
    /// The sparse backend could not set up the factorization.
    Factorization(String),
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SingularMatrix { step: Some(step), pivot: Some(pivot) } => {
                write!(f, "Matrix is singular (pivot {pivot:.2e} at step {step})")
            }
            Self::SingularMatrix { .. } => write!(f, "Matrix is singular"),
            Self::DimensionMismatch { rows, cols, rhs } => {
                write!(f, "Dimension mismatch: {rows}x{cols} matrix with rhs of length {rhs}")
            }
            Self::NotSquare { rows, cols } => write!(f, "Matrix is not square: {rows}x{cols}"),
            Self::NonFinite => write!(f, "Matrix or rhs contains non-finite entries"),
            Self::InvalidState(msg) => write!(f, "Invalid solver state: {msg}"),
            Self::Factorization(msg) => write!(f, "Sparse factorization failed: {msg}"),
        }
    }
}

impl std::error::Error for SolverError {}

/// Statistics and diagnostics from a single solve.
#[derive(Debug, Clone, Default)]
pub struct SolverStats {
    /// Strategy that produced the solution.
    pub strategy: &'static str,
    /// Number of stored entries in the system matrix.
    pub nnz_matrix: usize,
    /// Number of stored entries in the LU factors, when the backend reports it.
    pub nnz_factor: Option<usize>,
    /// Ratio of largest to smallest `|u_kk|`; a cheap lower bound on the condition number.
    /// Only the dense strategy fills this in.
    pub condition_estimate: Option<Scalar>,
    /// Relative residual `‖Y·V − J‖ / ‖J‖`.
    pub residual: Scalar,
    /// Bandwidth after reordering (sparse strategy only).
    pub bandwidth: Option<usize>,
    /// Time spent in ordering and factorization.
    pub factor_time: Duration,
    /// Time spent in triangular solves.
    pub solve_time: Duration,
    /// Human-readable notes.
    pub notes: Vec<String>,
}

impl SolverStats {
    /// True when the condition estimate exceeds [`ILL_CONDITIONED`].
    #[must_use]
    pub fn is_ill_conditioned(&self) -> bool {
        self.condition_estimate.is_some_and(|c| c > ILL_CONDITIONED)
    }
}

/// Node voltages for one right-hand side plus diagnostics.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Solution vector `V`.
    pub voltages: CVector,
    /// Solve diagnostics.
    pub stats: SolverStats,
}

/// A way of solving `Y·V = J`.
pub trait SolveStrategy: Send + Sync {
    /// Short identifier used in logs and stats.
    fn name(&self) -> &'static str;

    /// Solves `matrix · V = rhs`.
    ///
    /// # Errors
    ///
    /// [`SolverError::SingularMatrix`] if the matrix is numerically singular,
    /// [`SolverError::NotSquare`] or [`SolverError::DimensionMismatch`] for
    /// inconsistent shapes.
    fn solve(&self, matrix: &SystemMatrix, rhs: &CVector) -> Result<Solution, SolverError>;
}

fn check_shape(rows: usize, cols: usize, rhs: &CVector) -> Result<(), SolverError> {
    if rows != cols {
        return Err(SolverError::NotSquare { rows, cols });
    }
    if rows != rhs.len() {
        return Err(SolverError::DimensionMismatch { rows, cols, rhs: rhs.len() });
    }
    if rhs.iter().any(|v| !v.re.is_finite() || !v.im.is_finite()) {
        return Err(SolverError::NonFinite);
    }
    Ok(())
}

fn diagonal_condition(diag: impl Iterator<Item = Scalar>) -> Option<Scalar> {
    let (lo, hi) = diag.fold((Scalar::INFINITY, 0.0_f64), |(lo, hi), d| (lo.min(d), hi.max(d)));
    (lo.is_finite() && lo > 0.0).then(|| hi / lo)
}

/// Dense strategy: nalgebra LU with partial pivoting.
///
/// Partial pivoting only exchanges rows, so pivot `k` is judged against the
/// largest entry of column `k` of `Y`. A circuit that mixes milliohm and
/// picofarad nodes is not mistaken for a singular one.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseLu;

impl SolveStrategy for DenseLu {
    fn name(&self) -> &'static str {
        "dense-lu"
    }

    fn solve(&self, matrix: &SystemMatrix, rhs: &CVector) -> Result<Solution, SolverError> {
        let dense = matrix.to_dense();
        let dense: &CMatrix = &dense;
        check_shape(dense.nrows(), dense.ncols(), rhs)?;
        if dense.iter().any(|v| !v.re.is_finite() || !v.im.is_finite()) {
            return Err(SolverError::NonFinite);
        }

        let start = Instant::now();
        let column_scale = column_max_abs(dense);
        let lu = dense.clone().lu();
        let u = lu.u();
        let n = u.nrows().min(u.ncols());
        for (k, &scale) in column_scale.iter().enumerate().take(n) {
            let d = u[(k, k)].norm();
            if !d.is_finite() || d <= PIVOT_TOLERANCE * scale {
                return Err(SolverError::SingularMatrix { step: Some(k), pivot: Some(d) });
            }
        }
        let factor_time = start.elapsed();

        let start = Instant::now();
        let voltages = lu
            .solve(rhs)
            .ok_or(SolverError::SingularMatrix { step: None, pivot: None })?;
        let solve_time = start.elapsed();

        let stats = SolverStats {
            strategy: self.name(),
            nnz_matrix: matrix.nnz(),
            nnz_factor: Some(n * n),
            condition_estimate: diagonal_condition((0..n).map(|k| u[(k, k)].norm())),
            residual: relative_residual(dense, &voltages, rhs),
            bandwidth: None,
            factor_time,
            solve_time,
            notes: Vec::new(),
        };
        Ok(Solution { voltages, stats })
    }
}

/// Three-phase interface for sparse direct solvers.
///
/// 1. **Symbolic**: analyze the pattern and compute an ordering.
/// 2. **Numeric**: factor a matrix whose pattern matches the symbolic phase.
/// 3. **Solve**: apply the factors to a right-hand side.
///
/// For repeated solves with the same structure (e.g. an AC sweep), the
/// symbolic result can be reused across numeric factorizations.
#[cfg(feature = "sparse")]
pub trait SparseSolver {
    /// Analyzes the matrix structure and prepares for factorization.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::NotSquare`] if the matrix is not square.
    fn symbolic(&mut self, matrix: &CscMatrix<CScalar>) -> Result<(), SolverError>;

    /// Performs the numerical factorization.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::SingularMatrix`] if elimination breaks down.
    fn numeric(&mut self, matrix: &CscMatrix<CScalar>) -> Result<(), SolverError>;

    /// Solves `A·x = b` with the current factors.
    ///
    /// # Errors
    ///
    /// Returns an error if called before [`Self::numeric`] or with a wrong-length `rhs`.
    fn solve(&self, rhs: &CVector) -> Result<CVector, SolverError>;

    /// Returns solver name for logging/debugging.
    fn name(&self) -> &str;

    /// Returns true if factors are available.
    fn is_ready(&self) -> bool;
}

#[cfg(feature = "sparse")]
fn to_faer(matrix: &CscMatrix<CScalar>) -> Result<SparseColMat<usize, c64>, SolverError> {
    let mut triplets = Vec::with_capacity(matrix.nnz());
    for (row, col, v) in matrix.triplet_iter() {
        if !v.re.is_finite() || !v.im.is_finite() {
            return Err(SolverError::NonFinite);
        }
        triplets.push(Triplet::new(row, col, c64::new(v.re, v.im)));
    }
    SparseColMat::<usize, c64>::try_new_from_triplets(matrix.nrows(), matrix.ncols(), &triplets)
        .map_err(|e| SolverError::Factorization(format!("sparse matrix build failed: {e:?}")))
}

/// Sparse LU backed by faer, with an optional bandwidth-reducing pre-pass.
///
/// The symbolic phase permutes `Y` symmetrically with the chosen
/// [`OrderingStrategy`] and hands the pattern to faer's symbolic LU. The
/// numeric phase refactors any matrix with that same pattern, which is what
/// an AC sweep produces at every frequency.
#[cfg(feature = "sparse")]
pub struct SparseLuSolver {
    ordering: OrderingStrategy,
    perm: Option<Permutation>,
    pattern: Option<SparsityPattern>,
    bandwidth: usize,
    symbolic: Option<SymbolicLu<usize>>,
    factors: Option<Lu<usize, c64>>,
}

#[cfg(feature = "sparse")]
impl SparseLuSolver {
    /// Creates an unanalyzed solver using `ordering` in the symbolic phase.
    #[must_use]
    pub const fn new(ordering: OrderingStrategy) -> Self {
        Self { ordering, perm: None, pattern: None, bandwidth: 0, symbolic: None, factors: None }
    }

    /// Bandwidth of the reordered pattern found by the symbolic phase.
    #[must_use]
    pub const fn bandwidth(&self) -> usize {
        self.bandwidth
    }
}

#[cfg(feature = "sparse")]
impl Default for SparseLuSolver {
    fn default() -> Self {
        Self::new(OrderingStrategy::Auto)
    }
}

#[cfg(feature = "sparse")]
impl SparseSolver for SparseLuSolver {
    fn symbolic(&mut self, matrix: &CscMatrix<CScalar>) -> Result<(), SolverError> {
        if matrix.nrows() != matrix.ncols() {
            return Err(SolverError::NotSquare { rows: matrix.nrows(), cols: matrix.ncols() });
        }
        let (perm, used) = ordering_for(matrix, self.ordering);
        let permuted = permute_matrix(matrix, &perm);
        let pattern = to_faer(&permuted)?;
        let symbolic = SymbolicLu::try_new(pattern.symbolic())
            .map_err(|e| SolverError::Factorization(format!("symbolic LU failed: {e:?}")))?;

        self.bandwidth = compute_bandwidth(matrix, &perm);
        debug!(
            "sparse LU symbolic: n={}, nnz={}, ordering={used:?}, bandwidth={}",
            matrix.nrows(),
            matrix.nnz(),
            self.bandwidth
        );
        self.pattern = Some(permuted.pattern().clone());
        self.perm = Some(perm);
        self.symbolic = Some(symbolic);
        self.factors = None;
        Ok(())
    }

    fn numeric(&mut self, matrix: &CscMatrix<CScalar>) -> Result<(), SolverError> {
        let (Some(perm), Some(symbolic)) = (self.perm.as_ref(), self.symbolic.as_ref()) else {
            return Err(SolverError::InvalidState("symbolic() must run before numeric()"));
        };
        if matrix.nrows() != matrix.ncols() {
            return Err(SolverError::NotSquare { rows: matrix.nrows(), cols: matrix.ncols() });
        }
        if matrix.nrows() != perm.len() {
            return Err(SolverError::InvalidState("numeric() got a different dimension than symbolic()"));
        }

        let permuted = permute_matrix(matrix, perm);
        if self.pattern.as_ref() != Some(permuted.pattern()) {
            return Err(SolverError::InvalidState("numeric() got a different pattern than symbolic()"));
        }
        let values = to_faer(&permuted)?;
        let lu = Lu::try_new_with_symbolic(symbolic.clone(), values.as_ref())
            .map_err(|_| SolverError::SingularMatrix { step: None, pivot: None })?;
        debug!("sparse LU numeric: n={}, nnz={}", perm.len(), permuted.nnz());
        self.factors = Some(lu);
        Ok(())
    }

    fn solve(&self, rhs: &CVector) -> Result<CVector, SolverError> {
        let (Some(lu), Some(perm)) = (self.factors.as_ref(), self.perm.as_ref()) else {
            return Err(SolverError::InvalidState("numeric() must run before solve()"));
        };
        let n = perm.len();
        check_shape(n, n, rhs)?;

        let b = Mat::<c64>::from_fn(n, 1, |i, _| {
            let v = rhs[perm[i]];
            c64::new(v.re, v.im)
        });
        let z = lu.solve(b);

        let mut x = CVector::zeros(n);
        for (i, &old) in perm.iter().enumerate() {
            let zi = z[(i, 0)];
            if !zi.re.is_finite() || !zi.im.is_finite() {
                return Err(SolverError::SingularMatrix { step: None, pivot: None });
            }
            x[old] = Complex::new(zi.re, zi.im);
        }
        Ok(x)
    }

    fn name(&self) -> &str {
        "SparseLU"
    }

    fn is_ready(&self) -> bool {
        self.factors.is_some()
    }
}

/// `‖A·x − b‖ / ‖b‖` for a CSC matrix.
#[cfg(feature = "sparse")]
#[must_use]
pub fn sparse_relative_residual(matrix: &CscMatrix<CScalar>, x: &CVector, b: &CVector) -> Scalar {
    let mut ax = CVector::zeros(matrix.nrows());
    for (row, col, &val) in matrix.triplet_iter() {
        ax[row] += val * x[col];
    }
    let residual = (ax - b).norm();
    let scale = b.norm();
    if scale > 0.0 { residual / scale } else { residual }
}

/// Sparse strategy: converts `Y` to CSC if needed, orders, factors, solves.
#[cfg(feature = "sparse")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SparseLu {
    /// Ordering used in the symbolic phase.
    pub ordering: OrderingStrategy,
}

#[cfg(feature = "sparse")]
impl SolveStrategy for SparseLu {
    fn name(&self) -> &'static str {
        "sparse-lu"
    }

    fn solve(&self, matrix: &SystemMatrix, rhs: &CVector) -> Result<Solution, SolverError> {
        let csc = matrix.to_csc();
        let csc: &CscMatrix<CScalar> = &csc;
        check_shape(csc.nrows(), csc.ncols(), rhs)?;

        let start = Instant::now();
        let mut solver = SparseLuSolver::new(self.ordering);
        solver.symbolic(csc)?;
        solver.numeric(csc)?;
        let factor_time = start.elapsed();

        let start = Instant::now();
        let voltages = SparseSolver::solve(&solver, rhs)?;
        let solve_time = start.elapsed();

        let residual = sparse_relative_residual(csc, &voltages, rhs);
        if !residual.is_finite() || residual > SINGULAR_RESIDUAL {
            return Err(SolverError::SingularMatrix { step: None, pivot: None });
        }

        let stats = SolverStats {
            strategy: self.name(),
            nnz_matrix: csc.nnz(),
            nnz_factor: None,
            condition_estimate: None,
            residual,
            bandwidth: Some(solver.bandwidth()),
            factor_time,
            solve_time,
            notes: Vec::new(),
        };
        Ok(Solution { voltages, stats })
    }
}

/// Chooses [`DenseLu`] or [`SparseLu`] per call from the matrix shape.
///
/// Dense wins for small or well-filled matrices, where sparse bookkeeping
/// dominates the flop count.
#[cfg(feature = "sparse")]
#[derive(Debug, Clone, Copy)]
pub struct AutoSolve {
    /// Matrices with fewer rows than this go to the dense strategy.
    pub dense_below: usize,
    /// Matrices denser than this go to the dense strategy.
    pub max_sparse_density: Scalar,
    /// Ordering passed to the sparse strategy.
    pub ordering: OrderingStrategy,
}

#[cfg(feature = "sparse")]
impl Default for AutoSolve {
    fn default() -> Self {
        Self { dense_below: 64, max_sparse_density: 0.2, ordering: OrderingStrategy::Auto }
    }
}

#[cfg(feature = "sparse")]
impl AutoSolve {
    /// Returns true when `matrix` should take the sparse path.
    #[must_use]
    pub fn prefers_sparse(&self, matrix: &SystemMatrix) -> bool {
        let n = matrix.dim();
        if n < self.dense_below {
            return false;
        }
        let fill = match matrix {
            SystemMatrix::Sparse(csc) => density(csc),
            SystemMatrix::Dense(_) => matrix.nnz() as Scalar / (n * n) as Scalar,
        };
        fill <= self.max_sparse_density
    }
}

#[cfg(feature = "sparse")]
impl SolveStrategy for AutoSolve {
    fn name(&self) -> &'static str {
        "auto"
    }

    fn solve(&self, matrix: &SystemMatrix, rhs: &CVector) -> Result<Solution, SolverError> {
        if self.prefers_sparse(matrix) {
            SparseLu { ordering: self.ordering }.solve(matrix, rhs)
        } else {
            DenseLu.solve(matrix, rhs)
        }
    }
}

/// Logs a warning for ill-conditioned solutions.
pub(crate) fn note_conditioning(index: usize, solution: &mut Solution) {
    if solution.stats.is_ill_conditioned() {
        let cond = solution.stats.condition_estimate.unwrap_or(Scalar::INFINITY);
        warn!("sample {index}: ill-conditioned admittance matrix (cond ≈ {cond:.2e})");
        solution.stats.notes.push(format!("Ill-conditioned matrix (cond ≈ {cond:.2e})"));
    }
}
