//! # Sentence Parser Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nav_lib::{
    loc::{LocParams, PoseStore},
    sentence::{self, SentenceFramer},
};

const PANDA: &[u8] =
    b"$PANDA,123519,4807.038,N,01131.000,E,4,08,0.9,545.4,1.2,5.5,270.5,1.2,-0.5,0.1*5E\r\n";

fn sentence_benchmark(c: &mut Criterion) {
    c.bench_function("sentence::parse", |b| {
        b.iter(|| sentence::parse(black_box(PANDA)).unwrap())
    });

    // A burst of sentences arriving in small serial chunks
    let stream: Vec<u8> = PANDA.iter().cycle().take(PANDA.len() * 10).copied().collect();

    c.bench_function("SentenceFramer::push", |b| {
        b.iter(|| {
            let mut framer = SentenceFramer::new();
            let mut num_sentences = 0;
            for chunk in stream.chunks(16) {
                framer.push(black_box(chunk), |_| num_sentences += 1);
            }
            num_sentences
        })
    });

    let mut store = PoseStore::new(&LocParams::default());

    c.bench_function("PoseStore::ingest", |b| {
        b.iter(|| store.ingest(black_box(PANDA)).unwrap())
    });
}

criterion_group!(benches, sentence_benchmark);
criterion_main!(benches);
