use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nodal_sweep::circuits::analysis::{ac_sweep, assemble, Assembly, NetlistAdmittance};
use nodal_sweep::circuits::library::{line_source, phase_splitter, phase_splitter_source, transmission_line, LineParameters};
use nodal_sweep::circuits::solver::{DenseLu, SolveStrategy, SparseLu};
use nodal_sweep::constants::laplace_at;

fn bench_line_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_solve");
    let s = laplace_at(1.0e7);
    for sections in [50_usize, 200, 800] {
        let builder = NetlistAdmittance::new(transmission_line(sections, &LineParameters::default()), Assembly::Sparse)
            .expect("valid line");
        let y = assemble(&builder, s).expect("assembles");
        let dense = nodal_sweep::circuits::analysis::SystemMatrix::Dense(y.to_dense().into_owned());
        let rhs = line_source(sections + 1);

        group.bench_with_input(BenchmarkId::new("dense_lu", sections), &dense, |b, y| {
            b.iter(|| DenseLu.solve(y, &rhs).expect("solves"));
        });
        group.bench_with_input(BenchmarkId::new("sparse_lu", sections), &y, |b, y| {
            b.iter(|| SparseLu::default().solve(y, &rhs).expect("solves"));
        });
    }
    group.finish();
}

fn bench_splitter_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("splitter_sweep");
    let rhs = phase_splitter_source();
    for assembly in [Assembly::HalfDense, Assembly::Full] {
        let builder = NetlistAdmittance::new(phase_splitter(), assembly).expect("valid splitter");
        group.bench_function(BenchmarkId::new(format!("{assembly:?}"), 1_000), |b| {
            b.iter(|| ac_sweep(&builder, &rhs, 1.0, 1.0e3, 1_000, &DenseLu).expect("sweeps"));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_line_solve, bench_splitter_assembly);
criterion_main!(benches);
