use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use ibeam::{IBeamProblem, SerialEvaluator, WeightedSumSweep};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn sweep_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("beam-weighted-sum");
    for divisions in [4, 12, 24] {
        group.bench_function(format!("divisions-{divisions}"), |b| {
            b.iter_batched(
                || SerialEvaluator::new(IBeamProblem::new()),
                |evaluator| {
                    let mut sweep = WeightedSumSweep::new(evaluator)
                        .divisions(divisions)
                        .max_evaluations(10_000);
                    let mut rng = StdRng::seed_from_u64(9001);
                    sweep.run(&mut rng).expect("sweep to succeed");
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, sweep_benchmark);
criterion_main!(benches);
