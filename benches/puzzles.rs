use criterion::{black_box, criterion_group, criterion_main, Criterion};
use logic_grids::{
  gen::*,
  puzzles::{rects::Rects, ripple::Ripple, tapa::Tapa},
  rules::Construct,
};

fn criterion_benchmark(c: &mut Criterion) {
  c.bench_function("ripple 6x6 x5", |b| b.iter(|| gen_puzzles::<Ripple>(6, black_box(5))));
  c.bench_function("tapa 7x7 x5", |b| b.iter(|| gen_puzzles::<Tapa>(7, black_box(5))));
  c.bench_function("rects 7x7 x5", |b| b.iter(|| gen_puzzles::<Rects>(7, black_box(5))));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

/// Generates N square puzzles of the given size from consecutive seeds.
fn gen_puzzles<R: Construct>(size: usize, count: usize) -> usize {
  let config = GenConfig::new::<R>(size, size, Difficulty::Medium);
  Batch::<R>::new(&config, 1, 1000).take(count).count()
}
