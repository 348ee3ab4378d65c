use criterion::{Criterion, criterion_group, criterion_main};
use ragserve::config::ChunkingConfig;
use ragserve::embeddings::TextSplitter;
use std::hint::black_box;

/// A synthetic document with paragraph structure, large enough to push the
/// splitter through several overlap windows
fn sample_document() -> String {
    let paragraph = "Retrieval systems split documents into overlapping chunks so that \
every passage stays within the embedding model's context budget. Each chunk is \
embedded separately and stored in a vector index keyed by its position. At query \
time the question is embedded with the same model and the nearest chunks come \
back in similarity order.\n";
    let mut document = String::new();
    for _ in 0..200 {
        document.push_str(paragraph);
        document.push('\n');
    }
    document
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let splitter = TextSplitter::new(&ChunkingConfig::default()).expect("tokenizer loads");
    let document = sample_document();
    c.bench_function("chunking", |b| b.iter(|| splitter.split(black_box(&document))));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
