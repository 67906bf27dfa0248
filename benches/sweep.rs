#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use cachesweep::config;
use cachesweep::trace::Synthetic;
use cachesweep::Runner;
use criterion::{black_box, Criterion};

fn workload(num_accesses: usize) -> Synthetic {
    Synthetic {
        num_accesses,
        ..Synthetic::default()
    }
}

pub fn replay_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay");
    group.sample_size(10);
    group.sampling_mode(criterion::SamplingMode::Flat);

    let trace = workload(100_000);
    let config = config::Hierarchy::default();
    group.bench_function("baseline/100000", |b| {
        b.iter(|| cachesweep::simulate(black_box(&config), &trace));
    });
}

pub fn sweep_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");
    group.sample_size(10);
    group.sampling_mode(criterion::SamplingMode::Flat);

    let trace = workload(50_000);
    let experiments = config::experiment::reference_experiments();
    for parallel in [false, true] {
        let runner = Runner {
            parallel,
            ..Runner::default()
        };
        let name = if parallel { "parallel" } else { "serial" };
        group.bench_function(name, |b| {
            b.iter(|| runner.run(black_box(&experiments), &trace));
        });
    }
}

criterion::criterion_group!(benches, replay_benchmark, sweep_benchmark);
criterion::criterion_main!(benches);
