//! Benchmarks for pipeline compilation and invocation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stepflow::prelude::*;

type M = Blocking<u64>;

fn linear_chain(space: &Space<M>, name: &str, len: usize) -> Pipeline<u64, M> {
    let mut chain = space
        .create_pipeline::<u64>(name)
        .start_with(Linear::new("step_0", |x: u64, (), next: Next<u64, M>| next(x + 1, ())));
    for i in 1..len {
        chain = chain.then(Linear::new(format!("step_{i}"), |x: u64, (), next: Next<u64, M>| {
            next(x + 1, ())
        }));
    }
    chain
        .handle_with(Handler::new("sink", |x: u64, ()| x))
        .unwrap_or_else(|err| panic!("benchmark pipeline failed to build: {err}"))
}

fn pipeline_benchmark(c: &mut Criterion) {
    let space: Space<M> = Space::new();
    let pipeline = linear_chain(&space, "chain", 16);

    c.bench_function("compile_linear_16", |b| {
        b.iter(|| black_box(space.compile(&pipeline, None)))
    });

    let compiled = space.compile(&pipeline, None).expect("compiles");
    c.bench_function("invoke_linear_16", |b| {
        b.iter(|| black_box(compiled.call(black_box(1))))
    });

    let mut mutators = Mutators::new();
    let handle = space
        .get_required_linear_step::<u64, u64>("chain", "step_8")
        .expect("step exists");
    mutators
        .add(&handle, Mutator::identity("noop"), AddingMode::Append)
        .expect("mutator attaches");
    let mutated = space.compile(&pipeline, Some(&mutators)).expect("compiles");
    c.bench_function("invoke_linear_16_mutated", |b| {
        b.iter(|| black_box(mutated.call(black_box(1))))
    });
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
