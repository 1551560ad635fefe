use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use telemark::{tags, with_tags, Registry};

fn layered_registry() -> Registry {
    let registry = Registry::new();
    registry
        .configure(|c| {
            c.default_tag("service", "api");
            c.default_tag("region", "us-east-1");
            c.group("http", |c| {
                c.default_tag("env", "production");
                c.counter("requests", |m| m.tags(["path", "status"]))?;
                Ok(())
            })
        })
        .expect("configure");
    registry.activate().expect("activate");
    registry
}

fn resolve_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    group.bench_function("bare", |b| {
        let registry = Registry::new();
        b.iter(|| black_box(registry.resolve_tags(None, tags! {})));
    });
    group.bench_function("defaults", |b| {
        let registry = layered_registry();
        b.iter(|| black_box(registry.resolve_tags(Some("http"), tags! {})));
    });
    group.bench_function("defaults/call_site", |b| {
        let registry = layered_registry();
        b.iter(|| {
            black_box(
                registry
                    .resolve_tags(Some("http"), tags! { "path" => "/users", "status" => "200" }),
            )
        });
    });
    group.bench_function("defaults/overlay", |b| {
        let registry = layered_registry();
        with_tags(tags! { "request_id" => "01J8ZQ6W" }, || {
            b.iter(|| {
                black_box(registry.resolve_tags(Some("http"), tags! { "status" => "200" }))
            });
        });
    });
    group.finish();
}

fn write_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("write");
    group.bench_function("counter/fresh_tags", |b| {
        let registry = layered_registry();
        let requests = registry.counter("http_requests").expect("declared");
        b.iter(|| requests.increment(tags! { "path" => "/users", "status" => "200" }, 1));
    });
    group.bench_function("counter/cached_tags", |b| {
        let registry = layered_registry();
        let requests = registry.counter("http_requests").expect("declared");
        let call_tags = tags! { "path" => "/users", "status" => "200" };
        b.iter(|| requests.increment(call_tags.clone(), 1));
    });
    group.finish();
}

criterion_group!(benches, resolve_benchmark, write_benchmark);
criterion_main!(benches);
