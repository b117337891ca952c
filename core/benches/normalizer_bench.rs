use criterion::{criterion_group, criterion_main, Criterion};
use keyword_core::{Document, InvertedIndex, Normalizer};

const PLOT: &str = "When a young princess defies an age-old custom, she unleashes chaos in her \
kingdom. Racing against time, she must rely on her bravery and archery skills to undo a \
beastly curse before it's too late. Running through misty highlands, she learns what it \
means to be truly brave.";

fn bench_normalize(c: &mut Criterion) {
    let normalizer = Normalizer::english();
    c.bench_function("normalize_plot", |b| b.iter(|| normalizer.normalize(PLOT)));
}

fn bench_build(c: &mut Criterion) {
    let docs: Vec<Document> = (0..500).map(|id| Document::new(id, format!("Movie {id}"), PLOT)).collect();
    c.bench_function("build_500_docs", |b| {
        b.iter(|| InvertedIndex::build(Normalizer::english(), docs.clone()))
    });
}

criterion_group!(benches, bench_normalize, bench_build);
criterion_main!(benches);
