// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_term_match::{Document, MatchStrategy, MatcherConfig, TermMatcher};

const WORDS: &[&str] = &[
    "the", "request", "hits", "an", "endpoint", "and", "returns", "json", "over", "http", "while",
    "the", "cache", "layer", "keeps", "latency", "low", "for", "each", "client",
];

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_index(&mut self, len: usize) -> usize {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        (x % len as u64) as usize
    }
}

fn glossary(n: usize) -> Vec<(String, Vec<String>)> {
    (0..n)
        .map(|i| (format!("Term{i}"), vec![format!("term-alias-{i}")]))
        .chain([
            ("API".to_owned(), vec!["interface".to_owned()]),
            ("REST API".to_owned(), Vec::new()),
            ("HTTP".to_owned(), Vec::new()),
            ("JSON".to_owned(), Vec::new()),
        ])
        .collect()
}

fn matcher(terms: usize, strategy: MatchStrategy) -> TermMatcher {
    let mut m = TermMatcher::new(MatcherConfig {
        strategy,
        ..MatcherConfig::default()
    });
    m.add_terms(glossary(terms)).unwrap();
    m
}

fn paragraph(rng: &mut Rng, words: usize, terms: usize) -> String {
    let mut out = String::new();
    for i in 0..words {
        if i > 0 {
            out.push(' ');
        }
        if i % 9 == 4 {
            out.push_str(&format!("Term{}", rng.next_index(terms)));
        } else if i % 13 == 7 {
            out.push_str("REST API");
        } else {
            out.push_str(WORDS[rng.next_index(WORDS.len())]);
        }
    }
    out
}

fn bench_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_in_text");
    for &terms in &[10_usize, 100, 1_000, 5_000] {
        let mut rng = Rng::new(0x5eed);
        let text = paragraph(&mut rng, 2000, terms);
        group.throughput(Throughput::Bytes(text.len() as u64));
        for (name, strategy) in [
            ("word_boundary", MatchStrategy::WordBoundary),
            ("substring", MatchStrategy::Substring),
        ] {
            let m = matcher(terms, strategy);
            group.bench_function(format!("{name}_terms{terms}"), |b| {
                b.iter(|| black_box(m.find_in_text(black_box(&text))).len());
            });
        }
    }
    group.finish();
}

fn bench_document(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_matches");
    let m = matcher(100, MatchStrategy::WordBoundary);
    let mut rng = Rng::new(42);
    let mut doc = Document::new();
    for i in 0..200 {
        let tag = if i % 10 == 0 { "pre" } else { "p" };
        let p = doc.append_element(doc.root(), tag);
        let text = paragraph(&mut rng, 40, 100);
        doc.append_text(p, &text);
    }
    group.throughput(Throughput::Elements(200));
    group.bench_function("paragraphs200_terms100", |b| {
        b.iter(|| black_box(m.find_matches(&doc, doc.root())).len());
    });
    group.finish();

    let mut group = c.benchmark_group("load_glossary");
    group.sample_size(10);
    for &terms in &[100_usize, 1_000, 5_000] {
        group.throughput(Throughput::Elements(terms as u64));
        group.bench_function(format!("batch_terms{terms}"), |b| {
            b.iter_batched(
                || glossary(terms),
                |glossary| {
                    let mut m = TermMatcher::new(MatcherConfig::default());
                    m.add_terms(glossary).unwrap();
                    black_box(m.len())
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_text, bench_document);
criterion_main!(benches);
