use std::borrow::Cow;
use std::io;
use std::io::Write;

use log::{debug, info, warn};
use num_complex::Complex;
use thiserror::Error;

use crate::math::{CMatrix, CScalar, CVector, Scalar};
use crate::sweep::{frequency_samples, FrequencySample};

use super::component::BuildError;
use super::netlist::Netlist;
use super::solver::{note_conditioning, Solution, SolveStrategy, SolverError};
use super::stamp::{symmetrize, HalfDenseBuilder, NodalBuilder};

#[cfg(feature = "sparse")]
use nalgebra_sparse::CscMatrix;

#[cfg(feature = "sparse")]
use super::sparse::{csc_to_dense, dense_to_csc, SparseNodalBuilder};

/// Dense admittance matrix used in nodal analysis.
pub type AdmittanceMatrix = CMatrix;
/// Complex current injection vector.
pub type CurrentVector = CVector;

/// How a builder lays out its output matrix.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assembly {
    /// Dense upper triangle only; must be symmetrized once before use.
    HalfDense,
    /// Dense, fully assembled and symmetric.
    Full,
    /// Sparse (CSC), fully assembled and symmetric.
    Sparse,
}

/// An admittance matrix in dense or sparse storage.
#[derive(Debug, Clone, PartialEq)]
pub enum SystemMatrix {
    /// Dense column-major storage.
    Dense(CMatrix),
    /// Compressed sparse column storage.
    #[cfg(feature = "sparse")]
    Sparse(CscMatrix<CScalar>),
}

impl SystemMatrix {
    /// Number of rows.
    #[must_use]
    pub fn dim(&self) -> usize {
        match self {
            Self::Dense(m) => m.nrows(),
            #[cfg(feature = "sparse")]
            Self::Sparse(m) => m.nrows(),
        }
    }

    /// Number of nonzero (dense) or stored (sparse) entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        match self {
            Self::Dense(m) => {
                let zero = Complex::new(0.0, 0.0);
                m.iter().filter(|v| **v != zero).count()
            }
            #[cfg(feature = "sparse")]
            Self::Sparse(m) => m.nnz(),
        }
    }

    /// Dense view, converting from sparse if needed.
    #[must_use]
    pub fn to_dense(&self) -> Cow<'_, CMatrix> {
        match self {
            Self::Dense(m) => Cow::Borrowed(m),
            #[cfg(feature = "sparse")]
            Self::Sparse(m) => Cow::Owned(csc_to_dense(m)),
        }
    }

    /// Sparse view, converting from dense (dropping exact zeros) if needed.
    #[cfg(feature = "sparse")]
    #[must_use]
    pub fn to_csc(&self) -> Cow<'_, CscMatrix<CScalar>> {
        match self {
            Self::Dense(m) => Cow::Owned(dense_to_csc(m)),
            Self::Sparse(m) => Cow::Borrowed(m),
        }
    }
}

/// Produces the admittance matrix of a fixed topology at a complex frequency.
///
/// Implementations must be pure: the same `s` always yields the same matrix.
pub trait AdmittanceBuilder: Sync {
    /// Number of non-ground nodes (matrix dimension).
    fn node_count(&self) -> usize;

    /// Layout of the matrix returned by [`Self::build`].
    fn assembly(&self) -> Assembly;

    /// Builds the matrix at `s`. Half-dense builders return only the upper triangle.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if a component term divides by zero.
    fn build(&self, s: CScalar) -> Result<SystemMatrix, BuildError>;
}

impl<B: AdmittanceBuilder + ?Sized> AdmittanceBuilder for &B {
    fn node_count(&self) -> usize {
        (**self).node_count()
    }

    fn assembly(&self) -> Assembly {
        (**self).assembly()
    }

    fn build(&self, s: CScalar) -> Result<SystemMatrix, BuildError> {
        (**self).build(s)
    }
}

/// Builds and, for half-dense builders, symmetrizes the admittance matrix at `s`.
///
/// This is the only place symmetrization happens, so it is applied exactly once
/// per sample.
///
/// # Errors
///
/// Propagates [`BuildError`] from the builder, or
/// [`BuildError::DimensionMismatch`] if the matrix is not `n×n`.
pub fn assemble<B: AdmittanceBuilder + ?Sized>(builder: &B, s: CScalar) -> Result<SystemMatrix, BuildError> {
    let n = builder.node_count();
    let matrix = builder.build(s)?;
    let (rows, cols) = match &matrix {
        SystemMatrix::Dense(m) => m.shape(),
        #[cfg(feature = "sparse")]
        SystemMatrix::Sparse(m) => (m.nrows(), m.ncols()),
    };
    if rows != n || cols != n {
        return Err(BuildError::DimensionMismatch { rows, cols, expected: n });
    }
    Ok(match builder.assembly() {
        Assembly::HalfDense => SystemMatrix::Dense(symmetrize(&matrix.to_dense())),
        Assembly::Full | Assembly::Sparse => matrix,
    })
}

/// Admittance builder backed by a validated [`Netlist`].
#[derive(Debug, Clone)]
pub struct NetlistAdmittance {
    netlist: Netlist,
    assembly: Assembly,
}

impl NetlistAdmittance {
    /// Validates `netlist` and binds it to an assembly convention.
    ///
    /// # Errors
    ///
    /// Returns the first [`BuildError`] found by [`Netlist::validate`].
    pub fn new(netlist: Netlist, assembly: Assembly) -> Result<Self, BuildError> {
        netlist.validate()?;
        Ok(Self { netlist, assembly })
    }

    /// The bound topology.
    #[must_use]
    pub const fn netlist(&self) -> &Netlist {
        &self.netlist
    }

    /// Same topology with a different assembly convention.
    #[must_use]
    pub fn with_assembly(&self, assembly: Assembly) -> Self {
        Self { netlist: self.netlist.clone(), assembly }
    }
}

impl AdmittanceBuilder for NetlistAdmittance {
    fn node_count(&self) -> usize {
        self.netlist.node_count()
    }

    fn assembly(&self) -> Assembly {
        self.assembly
    }

    fn build(&self, s: CScalar) -> Result<SystemMatrix, BuildError> {
        let n = self.netlist.node_count();
        match self.assembly {
            Assembly::HalfDense => {
                let mut b = HalfDenseBuilder::new(n);
                b.stamp_netlist(&self.netlist, s)?;
                Ok(SystemMatrix::Dense(b.into_half()))
            }
            Assembly::Full => {
                let mut b = NodalBuilder::new(n);
                b.stamp_netlist(&self.netlist, s)?;
                Ok(SystemMatrix::Dense(b.into_matrix()))
            }
            #[cfg(feature = "sparse")]
            Assembly::Sparse => {
                let mut b = SparseNodalBuilder::new(n);
                b.stamp_netlist(&self.netlist, s)?;
                Ok(SystemMatrix::Sparse(b.finalize()))
            }
            #[cfg(not(feature = "sparse"))]
            Assembly::Sparse => {
                let mut b = NodalBuilder::new(n);
                b.stamp_netlist(&self.netlist, s)?;
                Ok(SystemMatrix::Dense(b.into_matrix()))
            }
        }
    }
}

/// Admittance builder backed by a closure returning a hand-written matrix.
///
/// Useful when matrix entries are maintained as configuration data rather than
/// derived from a netlist.
pub struct FnAdmittance<F> {
    node_count: usize,
    assembly: Assembly,
    f: F,
}

impl<F> FnAdmittance<F>
where
    F: Fn(CScalar) -> Result<CMatrix, BuildError> + Sync,
{
    /// Wraps `f`, which must return an `node_count × node_count` matrix in `assembly` layout.
    pub const fn new(node_count: usize, assembly: Assembly, f: F) -> Self {
        Self { node_count, assembly, f }
    }
}

impl<F> AdmittanceBuilder for FnAdmittance<F>
where
    F: Fn(CScalar) -> Result<CMatrix, BuildError> + Sync,
{
    fn node_count(&self) -> usize {
        self.node_count
    }

    fn assembly(&self) -> Assembly {
        self.assembly
    }

    fn build(&self, s: CScalar) -> Result<SystemMatrix, BuildError> {
        (self.f)(s).map(SystemMatrix::Dense)
    }
}

/// Errors that abort a whole sweep.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SweepError {
    /// The sweep parameters are unusable.
    #[error("invalid sweep: {0}")]
    InvalidConfig(String),
    /// The builder failed at a sample; configuration errors are fatal.
    #[error("admittance build failed at sample {index}: {source}")]
    Build {
        /// Sample index.
        index: usize,
        /// Underlying build error.
        #[source]
        source: BuildError,
    },
}

/// Result of solving the network at a single frequency sample.
#[derive(Debug, Clone)]
pub struct SweepPoint {
    /// Sample index in `0..=partitions`.
    pub index: usize,
    /// Linear frequency in hertz.
    pub frequency_hz: Scalar,
    /// Laplace variable `s = j·2π·f`.
    pub s: CScalar,
    /// Node voltages with diagnostics, or the reason this sample failed.
    pub outcome: Result<Solution, SolverError>,
}

impl SweepPoint {
    /// Node voltages, if the solve succeeded.
    #[must_use]
    pub fn voltages(&self) -> Option<&CVector> {
        self.outcome.as_ref().ok().map(|s| &s.voltages)
    }
}

/// Ordered sweep output, one point per frequency sample.
#[derive(Debug, Clone, Default)]
pub struct SweepResult {
    /// Node count of the swept circuit; every successful solution has this length.
    pub node_count: usize,
    /// Points in sample order.
    pub points: Vec<SweepPoint>,
}

impl SweepResult {
    /// Total sample count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if no samples were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True if every sample solved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.points.iter().all(|p| p.outcome.is_ok())
    }

    /// `(index, error)` for each failed sample.
    #[must_use]
    pub fn failures(&self) -> Vec<(usize, &SolverError)> {
        self.points
            .iter()
            .filter_map(|p| p.outcome.as_ref().err().map(|e| (p.index, e)))
            .collect()
    }

    /// Sample frequencies in hertz.
    #[must_use]
    pub fn frequencies(&self) -> Vec<Scalar> {
        self.points.iter().map(|p| p.frequency_hz).collect()
    }

    /// Voltage at `node` per sample; `None` where the sample failed.
    #[must_use]
    pub fn node_voltages(&self, node: usize) -> Vec<Option<CScalar>> {
        self.points
            .iter()
            .map(|p| p.voltages().and_then(|v| v.get(node).copied()))
            .collect()
    }

    /// Solution vectors in sample order.
    ///
    /// # Errors
    ///
    /// Returns the index and error of the first failed sample.
    pub fn into_solutions(self) -> Result<Vec<CVector>, (usize, SolverError)> {
        self.points
            .into_iter()
            .map(|p| p.outcome.map(|s| s.voltages).map_err(|e| (p.index, e)))
            .collect()
    }
}

fn check_sweep(node_count: usize, rhs: &CVector, f_start_hz: Scalar, f_end_hz: Scalar, partitions: usize) -> Result<(), SweepError> {
    if partitions == 0 {
        return Err(SweepError::InvalidConfig("partition count must be positive".into()));
    }
    if !f_start_hz.is_finite() || !f_end_hz.is_finite() {
        return Err(SweepError::InvalidConfig(format!(
            "frequencies must be finite (got {f_start_hz} .. {f_end_hz})"
        )));
    }
    if rhs.len() != node_count {
        return Err(SweepError::InvalidConfig(format!(
            "source vector has length {}, circuit has {node_count} nodes",
            rhs.len()
        )));
    }
    Ok(())
}

fn solve_sample<B, S>(builder: &B, rhs: &CVector, strategy: &S, sample: FrequencySample) -> Result<SweepPoint, SweepError>
where
    B: AdmittanceBuilder + ?Sized,
    S: SolveStrategy + ?Sized,
{
    let matrix = assemble(builder, sample.s).map_err(|source| SweepError::Build { index: sample.index, source })?;
    let mut outcome = strategy.solve(&matrix, rhs);
    match &mut outcome {
        Ok(solution) => {
            note_conditioning(sample.index, solution);
            debug!(
                "sample {} at {:.6e} Hz solved by {} (residual {:.2e})",
                sample.index, sample.frequency_hz, solution.stats.strategy, solution.stats.residual
            );
        }
        Err(e) => warn!("sample {} at {:.6e} Hz failed: {e}", sample.index, sample.frequency_hz),
    }
    Ok(SweepPoint { index: sample.index, frequency_hz: sample.frequency_hz, s: sample.s, outcome })
}

fn summarize(result: &SweepResult, strategy: &str) {
    let failed = result.points.iter().filter(|p| p.outcome.is_err()).count();
    info!("sweep finished: {} samples via {strategy}, {failed} failed", result.len());
}

/// Sweeps `builder` over `partitions + 1` linearly spaced frequencies in
/// `[f_start_hz, f_end_hz]`, solving `Y(s)·V = rhs` at each.
///
/// Singular samples are recorded as failures and the sweep continues. A build
/// error aborts the sweep.
///
/// # Errors
///
/// [`SweepError::InvalidConfig`] for a zero partition count, non-finite
/// frequencies, or a wrong-length `rhs`; [`SweepError::Build`] if the builder
/// fails at any sample.
pub fn ac_sweep<B, S>(
    builder: &B,
    rhs: &CVector,
    f_start_hz: Scalar,
    f_end_hz: Scalar,
    partitions: usize,
    strategy: &S,
) -> Result<SweepResult, SweepError>
where
    B: AdmittanceBuilder + ?Sized,
    S: SolveStrategy + ?Sized,
{
    check_sweep(builder.node_count(), rhs, f_start_hz, f_end_hz, partitions)?;
    let points = frequency_samples(f_start_hz, f_end_hz, partitions)
        .map(|sample| solve_sample(builder, rhs, strategy, sample))
        .collect::<Result<Vec<_>, _>>()?;
    let result = SweepResult { node_count: builder.node_count(), points };
    summarize(&result, strategy.name());
    Ok(result)
}

/// Parallel variant of [`ac_sweep`] on rayon's global pool.
///
/// Samples are independent; `collect` on an indexed parallel iterator keeps
/// them in sample order.
///
/// # Errors
///
/// Same as [`ac_sweep`]. When several samples fail to build, the reported one
/// is not necessarily the lowest index.
#[cfg(feature = "parallel")]
pub fn ac_sweep_parallel<B, S>(
    builder: &B,
    rhs: &CVector,
    f_start_hz: Scalar,
    f_end_hz: Scalar,
    partitions: usize,
    strategy: &S,
) -> Result<SweepResult, SweepError>
where
    B: AdmittanceBuilder + ?Sized,
    S: SolveStrategy + ?Sized,
{
    use rayon::prelude::*;

    check_sweep(builder.node_count(), rhs, f_start_hz, f_end_hz, partitions)?;
    let samples: Vec<FrequencySample> = frequency_samples(f_start_hz, f_end_hz, partitions).collect();
    let points = samples
        .into_par_iter()
        .map(|sample| solve_sample(builder, rhs, strategy, sample))
        .collect::<Result<Vec<_>, _>>()?;
    let result = SweepResult { node_count: builder.node_count(), points };
    summarize(&result, strategy.name());
    Ok(result)
}

/// Writes a CSV of the voltage at `node_index` across a sweep.
///
/// Failed samples are written with empty voltage columns and the error text.
///
/// # Errors
///
/// [`io::ErrorKind::InvalidInput`] if `node_index` is not a node of the swept
/// circuit, otherwise propagates I/O errors from `w`.
pub fn write_sweep_node_csv<W: Write>(mut w: W, data: &SweepResult, node_index: usize) -> io::Result<()> {
    if node_index >= data.node_count {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("node {node_index} out of range for a {}-node sweep", data.node_count),
        ));
    }
    writeln!(w, "freq_hz,ReV,ImV,cond_estimate,status")?;
    for p in &data.points {
        match &p.outcome {
            Ok(sol) => {
                let v = sol.voltages.get(node_index).copied().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidData, format!("sample {} has no node {node_index}", p.index))
                })?;
                let cond = sol.stats.condition_estimate.unwrap_or(f64::NAN);
                writeln!(w, "{:.16e},{:.16e},{:.16e},{:.6e},ok", p.frequency_hz, v.re, v.im, cond)?;
            }
            Err(e) => writeln!(w, "{:.16e},,,,\"{e}\"", p.frequency_hz)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::circuits::library;
    use crate::circuits::solver::DenseLu;
    use crate::constants::laplace_at;

    fn unit_source(n: usize, at: usize) -> CVector {
        let mut j = CVector::zeros(n);
        j[at] = Complex::new(1.0, 0.0);
        j
    }

    #[test]
    fn single_resistor_scenario() {
        let builder = NetlistAdmittance::new(library::single_resistor(2.0), Assembly::Full).unwrap();
        let y = assemble(&builder, laplace_at(123.0)).unwrap().to_dense().into_owned();
        assert_eq!(y.shape(), (1, 1));
        assert_relative_eq!(y[(0, 0)].re, 0.5);
        assert_relative_eq!(y[(0, 0)].im, 0.0);

        let sol = DenseLu.solve(&SystemMatrix::Dense(y), &unit_source(1, 0)).unwrap();
        assert_relative_eq!(sol.voltages[0].re, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn two_node_scenario_satisfies_kcl() {
        let builder = NetlistAdmittance::new(library::two_node_divider(), Assembly::HalfDense).unwrap();
        let y = assemble(&builder, laplace_at(50.0)).unwrap().to_dense().into_owned();
        let expected = CMatrix::from_row_slice(2, 2, &[
            Complex::new(1.0, 0.0), Complex::new(-1.0, 0.0),
            Complex::new(-1.0, 0.0), Complex::new(2.0, 0.0),
        ]);
        assert_eq!(y, expected);

        let j = unit_source(2, 0);
        let v = DenseLu.solve(&SystemMatrix::Dense(y.clone()), &j).unwrap().voltages;
        let back = &y * &v;
        assert_relative_eq!(back[0].re, 1.0, epsilon = 1e-12);
        assert_relative_eq!(back[1].norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn half_dense_assembly_matches_full_for_phase_splitter() {
        let net = library::phase_splitter();
        let half = NetlistAdmittance::new(net, Assembly::HalfDense).unwrap();
        let full = half.with_assembly(Assembly::Full);
        for f in [1.0, 60.0, 5.0e3] {
            let s = laplace_at(f);
            let a = assemble(&half, s).unwrap().to_dense().into_owned();
            let b = assemble(&full, s).unwrap().to_dense().into_owned();
            assert!((&a - &b).norm() <= 1e-12 * b.norm());
            assert_eq!(crate::circuits::stamp::symmetry_defect(&a), 0.0);
        }
    }

    #[test]
    fn build_is_idempotent() {
        let builder = NetlistAdmittance::new(library::phase_splitter(), Assembly::Full).unwrap();
        let s = laplace_at(60.0);
        assert_eq!(builder.build(s).unwrap(), builder.build(s).unwrap());
    }

    #[test]
    fn fn_admittance_half_dense_is_symmetrized_once() {
        let builder = FnAdmittance::new(2, Assembly::HalfDense, |s: CScalar| {
            let mut m = CMatrix::zeros(2, 2);
            m[(0, 0)] = Complex::new(1.0, 0.0) + s;
            m[(0, 1)] = -s;
            m[(1, 1)] = Complex::new(2.0, 0.0) + s;
            Ok(m)
        });
        let y = assemble(&builder, Complex::new(0.0, 3.0)).unwrap().to_dense().into_owned();
        assert_eq!(y[(1, 0)], Complex::new(0.0, -3.0));
        assert_eq!(y[(0, 0)], Complex::new(1.0, 3.0));
        assert_eq!(y[(1, 1)], Complex::new(2.0, 3.0));
    }

    #[test]
    fn fn_admittance_wrong_shape_is_rejected() {
        let builder = FnAdmittance::new(3, Assembly::Full, |_s: CScalar| Ok(CMatrix::zeros(2, 2)));
        assert!(matches!(
            assemble(&builder, Complex::new(0.0, 1.0)),
            Err(BuildError::DimensionMismatch { rows: 2, cols: 2, expected: 3 })
        ));
    }

    #[test]
    fn sweep_has_partitions_plus_one_increasing_samples() {
        let builder = NetlistAdmittance::new(library::phase_splitter(), Assembly::Full).unwrap();
        let rhs = library::phase_splitter_source();
        let result = ac_sweep(&builder, &rhs, 10.0, 200.0, 19, &DenseLu).unwrap();
        assert_eq!(result.len(), 20);
        assert!(result.is_complete());
        let freqs = result.frequencies();
        assert_relative_eq!(freqs[0], 10.0);
        assert_relative_eq!(freqs[19], 200.0);
        assert!(freqs.windows(2).all(|w| w[1] > w[0]));
        for (i, p) in result.points.iter().enumerate() {
            assert_eq!(p.index, i);
            assert!(p.s.im > 0.0 && p.s.re == 0.0);
            assert!(p.outcome.as_ref().unwrap().stats.residual < 1e-10);
        }
    }

    #[test]
    fn sweep_rejects_zero_partitions_and_bad_rhs() {
        let builder = NetlistAdmittance::new(library::single_resistor(2.0), Assembly::Full).unwrap();
        let rhs = unit_source(1, 0);
        assert!(matches!(ac_sweep(&builder, &rhs, 1.0, 2.0, 0, &DenseLu), Err(SweepError::InvalidConfig(_))));
        let wrong = unit_source(2, 0);
        assert!(matches!(ac_sweep(&builder, &wrong, 1.0, 2.0, 4, &DenseLu), Err(SweepError::InvalidConfig(_))));
        assert!(matches!(
            ac_sweep(&builder, &rhs, f64::NAN, 2.0, 4, &DenseLu),
            Err(SweepError::InvalidConfig(_))
        ));
    }

    #[test]
    fn sweep_aborts_on_inductor_at_dc() {
        let mut net = Netlist::new("rl", 1);
        net.resistor("R1", Some(0), None, 10.0).inductor("L1", Some(0), None, 1e-3);
        let builder = NetlistAdmittance::new(net, Assembly::Full).unwrap();
        let err = ac_sweep(&builder, &unit_source(1, 0), 0.0, 100.0, 4, &DenseLu).unwrap_err();
        assert!(matches!(err, SweepError::Build { index: 0, .. }));
    }

    #[test]
    fn singular_sample_is_reported_and_sweep_continues() {
        // Series LC tank to ground: Y = s·C + 1/(s·L) vanishes at resonance.
        // L = 1/(4π²) H, C = 1 F gives f0 = 1 Hz; the sweep 0.5..1.5 Hz in two
        // partitions hits it exactly at index 1.
        let l = 1.0 / (4.0 * std::f64::consts::PI * std::f64::consts::PI);
        let builder = FnAdmittance::new(1, Assembly::Full, move |s: CScalar| {
            let y = s * 1.0 + (s * l).inv();
            // Snap the round-off residue at resonance to an exact zero.
            let y = if y.norm() < 1e-9 { Complex::new(0.0, 0.0) } else { y };
            Ok(CMatrix::from_element(1, 1, y))
        });
        let result = ac_sweep(&builder, &unit_source(1, 0), 0.5, 1.5, 2, &DenseLu).unwrap();
        assert_eq!(result.len(), 3);
        assert!(!result.is_complete());
        let failures = result.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 1);
        assert!(result.node_voltages(0)[1].is_none());
        assert!(result.node_voltages(0)[0].is_some());
        assert!(result.into_solutions().is_err());
    }

    #[test]
    fn csv_marks_failed_samples() {
        let builder = NetlistAdmittance::new(library::single_resistor(4.0), Assembly::Full).unwrap();
        let result = ac_sweep(&builder, &unit_source(1, 0), 1.0, 2.0, 1, &DenseLu).unwrap();
        let mut buf = Vec::new();
        write_sweep_node_csv(&mut buf, &result, 0).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].ends_with(",ok"));
        assert!(lines[1].contains("4.0000000000000000e0"));
    }

    #[test]
    fn csv_rejects_node_outside_circuit() {
        let builder = NetlistAdmittance::new(library::single_resistor(4.0), Assembly::Full).unwrap();
        let result = ac_sweep(&builder, &unit_source(1, 0), 1.0, 2.0, 1, &DenseLu).unwrap();
        assert_eq!(result.node_count, 1);
        let mut buf = Vec::new();
        let err = write_sweep_node_csv(&mut buf, &result, 5).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(buf.is_empty());
    }

    fn milliohm_and_picofarad() -> NetlistAdmittance {
        let mut net = Netlist::new("mixed-scale", 2);
        net.resistor("R1", Some(0), None, 0.01).capacitor("C1", Some(1), None, 1.0e-12);
        NetlistAdmittance::new(net, Assembly::Full).unwrap()
    }

    #[test]
    fn badly_scaled_nodes_solve_at_every_sample() {
        let builder = milliohm_and_picofarad();
        let rhs = CVector::from_element(2, Complex::new(1.0, 0.0));
        let result = ac_sweep(&builder, &rhs, 1.0, 2.0, 4, &DenseLu).unwrap();
        assert!(result.is_complete(), "failures: {:?}", result.failures());
        for p in &result.points {
            let sol = p.outcome.as_ref().unwrap();
            let b = 2.0 * std::f64::consts::PI * p.frequency_hz * 1.0e-12;
            assert_relative_eq!(sol.voltages[0].re, 0.01, max_relative = 1e-12);
            assert_relative_eq!(sol.voltages[1].im, -1.0 / b, max_relative = 1e-12);
            assert!(sol.stats.notes.iter().any(|n| n.starts_with("Ill-conditioned")));
        }
    }

    #[cfg(feature = "sparse")]
    #[test]
    fn badly_scaled_nodes_solve_sparse() {
        use crate::circuits::solver::SparseLu;

        let builder = milliohm_and_picofarad().with_assembly(Assembly::Sparse);
        let rhs = CVector::from_element(2, Complex::new(1.0, 0.0));
        let result = ac_sweep(&builder, &rhs, 1.0, 2.0, 4, &SparseLu::default()).unwrap();
        assert!(result.is_complete(), "failures: {:?}", result.failures());
    }

    #[cfg(feature = "sparse")]
    #[test]
    fn sparse_line_sweep_matches_dense() {
        use crate::circuits::solver::SparseLu;

        let net = library::transmission_line(60, &library::LineParameters::default());
        let rhs = library::line_source(net.node_count());
        let full = NetlistAdmittance::new(net, Assembly::Full).unwrap();
        let sparse = full.with_assembly(Assembly::Sparse);

        let dense_result = ac_sweep(&full, &rhs, 1.0e6, 1.0e8, 10, &DenseLu).unwrap();
        let sparse_result = ac_sweep(&sparse, &rhs, 1.0e6, 1.0e8, 10, &SparseLu::default()).unwrap();
        assert_eq!(dense_result.len(), 11);
        assert_eq!(sparse_result.len(), 11);
        for (a, b) in dense_result.points.iter().zip(&sparse_result.points) {
            let (a, b) = (a.outcome.as_ref().unwrap(), b.outcome.as_ref().unwrap());
            assert_eq!(b.stats.strategy, "sparse-lu");
            let rel = (&a.voltages - &b.voltages).norm() / a.voltages.norm();
            assert!(rel < 1e-9, "dense vs sparse relative difference {rel:e}");
        }
    }

    #[cfg(feature = "sparse")]
    #[test]
    fn sparse_assembly_matches_full() {
        let net = library::transmission_line(40, &library::LineParameters::default());
        let full = NetlistAdmittance::new(net, Assembly::Full).unwrap();
        let sparse = full.with_assembly(Assembly::Sparse);
        let s = laplace_at(1.0e4);
        let a = assemble(&full, s).unwrap().to_dense().into_owned();
        let b = assemble(&sparse, s).unwrap().to_dense().into_owned();
        assert!((&a - &b).norm() <= 1e-12 * a.norm());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_sweep_matches_sequential() {
        let builder = NetlistAdmittance::new(library::phase_splitter(), Assembly::Full).unwrap();
        let rhs = library::phase_splitter_source();
        let seq = ac_sweep(&builder, &rhs, 10.0, 100.0, 15, &DenseLu).unwrap();
        let par = ac_sweep_parallel(&builder, &rhs, 10.0, 100.0, 15, &DenseLu).unwrap();
        assert_eq!(seq.len(), par.len());
        for (a, b) in seq.points.iter().zip(&par.points) {
            assert_eq!(a.index, b.index);
            assert_eq!(a.voltages(), b.voltages());
        }
    }
}
