// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Response cache and form parsing benchmarks
//! © 2026 Bountyy Oy

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lonkero_mapper::crawler::parse_forms;
use lonkero_mapper::response_cache::{CacheEntry, ResponseCache};
use std::collections::HashMap;
use std::time::{Duration, Instant};

fn entry(body: &str) -> CacheEntry {
    CacheEntry {
        status_code: 200,
        body: body.to_string(),
        headers: HashMap::new(),
        final_url: "https://example.com/".to_string(),
        cached_at: Instant::now(),
    }
}

fn benchmark_cache_key(c: &mut Criterion) {
    let params: Vec<(String, String)> = (0..8)
        .map(|i| (format!("param{}", i), format!("value{}", i)))
        .collect();

    c.bench_function("cache_key", |b| {
        b.iter(|| {
            ResponseCache::key(
                black_box("GET"),
                black_box("https://example.com/search?sort=asc&page=2#results"),
                black_box(&params),
            )
        })
    });
}

fn benchmark_cache_put_with_eviction(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_put");

    for capacity in [100usize, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &capacity| {
            let cache = ResponseCache::new(capacity, Duration::from_secs(3600));
            let mut i = 0u64;
            b.iter(|| {
                cache.put(format!("key-{}", i), entry("body"));
                i += 1;
            })
        });
    }

    group.finish();
}

fn benchmark_cache_hit(c: &mut Criterion) {
    let cache = ResponseCache::new(1000, Duration::from_secs(3600));
    let keys: Vec<String> = (0..1000)
        .map(|i| ResponseCache::key("GET", &format!("https://example.com/page/{}", i), &[]))
        .collect();
    for key in &keys {
        cache.put(key.clone(), entry("<html>cached</html>"));
    }

    c.bench_function("cache_hit", |b| {
        let mut i = 0usize;
        b.iter(|| {
            let hit = cache.get(black_box(&keys[i % keys.len()]));
            i += 1;
            hit
        })
    });
}

fn benchmark_parse_forms(c: &mut Criterion) {
    let forms: String = (0..20)
        .map(|i| {
            format!(
                r#"<form action="/submit/{i}" method="post"><input name="a{i}"><input name="b{i}" type="email"><textarea name="c{i}"></textarea></form>"#
            )
        })
        .collect();
    let html = format!("<html><body>{}</body></html>", forms);

    c.bench_function("parse_forms_20", |b| {
        b.iter(|| parse_forms(black_box(&html), "https://example.com/page"))
    });
}

criterion_group!(
    benches,
    benchmark_cache_key,
    benchmark_cache_put_with_eviction,
    benchmark_cache_hit,
    benchmark_parse_forms
);
criterion_main!(benches);
