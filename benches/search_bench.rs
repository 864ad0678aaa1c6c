use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::TempDir;

use triedex::segment::IndexWriter;
use triedex::{Document, IndexSettings, Searcher};

const VOCABULARY: &[&str] = &[
    "rain", "raid", "rainy", "man", "check", "sunny", "day", "storm", "cloud", "river", "stone",
    "street", "window", "garden", "light", "night", "morning", "winter", "summer", "market",
];

struct BenchEnv {
    _tmp: TempDir,
    searcher: Searcher,
}

fn build_env(doc_count: u32, generations: u32) -> BenchEnv {
    let tmp = TempDir::new().unwrap();
    let mut rng = fastrand::Rng::with_seed(42);
    let per_generation = doc_count / generations;

    let mut writer = IndexWriter::open(tmp.path(), IndexSettings::default()).unwrap();
    for generation in 0..generations {
        for i in 0..per_generation {
            let id = generation * per_generation + i + 1;
            let words: Vec<&str> = (0..rng.usize(4..12))
                .map(|_| VOCABULARY[rng.usize(0..VOCABULARY.len())])
                .collect();
            let title = format!("{} doc{}", words.join(" "), id);
            writer
                .add_document(&Document::new(id).with_field("title", title))
                .unwrap();
        }
        writer.commit().unwrap();
    }

    let searcher = Searcher::open(tmp.path()).unwrap();
    BenchEnv { _tmp: tmp, searcher }
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    for &docs in &[1_000u32, 10_000] {
        let env = build_env(docs, 4);
        for (name, query) in [
            ("term", "+title:rain"),
            ("boolean", "+title:rain +title:storm -title:night"),
            ("prefix", "+title:doc1*"),
            ("fuzzy", "+title:rian~1"),
            ("range", "+title:[market TO river]"),
        ] {
            group.bench_with_input(BenchmarkId::new(name, docs), &query, |b, query| {
                b.iter(|| env.searcher.search_str(black_box(query), 0, 10).unwrap())
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_queries);
criterion_main!(benches);
