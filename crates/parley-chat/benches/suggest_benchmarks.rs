//! Benchmarks for the suggestion engine.
//!
//! Suggestions are recomputed on every keystroke, so a query against a
//! realistic corpus (the default topics plus a long chat history) should stay
//! well under a frame.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use parley_chat::SuggestionEngine;
use parley_core::config::SuggestionConfig;

/// Number of recorded user utterances in the large corpus.
const HISTORY_SIZE: usize = 500;

fn engine_with_history(size: usize) -> SuggestionEngine {
    let mut engine = SuggestionEngine::new(&SuggestionConfig::default());
    for i in 0..size {
        engine.record_utterance(&format!(
            "What is the fee structure for department number {}?",
            i
        ));
    }
    engine
}

fn bench_topics_only(c: &mut Criterion) {
    let engine = engine_with_history(0);
    c.bench_function("suggest_topics_only", |b| {
        b.iter(|| engine.suggest(black_box("admi")))
    });
}

fn bench_with_history(c: &mut Criterion) {
    let engine = engine_with_history(HISTORY_SIZE);
    c.bench_function("suggest_with_history", |b| {
        b.iter(|| engine.suggest(black_box("fee struc")))
    });
}

fn bench_no_match(c: &mut Criterion) {
    let engine = engine_with_history(HISTORY_SIZE);
    c.bench_function("suggest_no_match", |b| {
        b.iter(|| engine.suggest(black_box("zzqx")))
    });
}

criterion_group!(benches, bench_topics_only, bench_with_history, bench_no_match);
criterion_main!(benches);
