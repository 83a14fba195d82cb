//! Benchmarks for xds-cache operations.
//!
//! Run with: `cargo bench --package xds-cache`
//!
//! These benchmarks measure:
//! - Full replace cost as the resource set grows
//! - Single-resource upsert against a populated partition
//! - Snapshot reads
//! - Change fan-out cost as listener count grows

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use xds_cache::ResourceCache;
use xds_core::{AnyResource, BoxResource, TypeUrl};

/// Create a set of resources for one type URL.
fn make_resources(type_url: &str, count: usize) -> Vec<BoxResource> {
    (0..count)
        .map(|i| {
            let any = prost_types::Any {
                type_url: type_url.to_string(),
                value: vec![0u8; 64],
            };
            Arc::new(AnyResource::new(type_url, format!("resource-{i}"), any)) as BoxResource
        })
        .collect()
}

/// Benchmark full state-of-the-world replaces.
fn bench_replace(c: &mut Criterion) {
    let mut group = c.benchmark_group("replace");

    for num_resources in [1, 10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*num_resources as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_resources),
            num_resources,
            |b, &num_resources| {
                let cache = ResourceCache::new();
                let clusters: TypeUrl = TypeUrl::CLUSTER.into();
                let resources = make_resources(TypeUrl::CLUSTER, num_resources);

                b.iter(|| {
                    black_box(
                        cache
                            .replace(clusters.clone(), resources.clone())
                            .expect("replace"),
                    );
                });
            },
        );
    }

    group.finish();
}

/// Benchmark upserting one resource into a populated partition.
fn bench_upsert(c: &mut Criterion) {
    let mut group = c.benchmark_group("upsert");

    for partition_size in [10, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(partition_size),
            partition_size,
            |b, &partition_size| {
                let cache = ResourceCache::new();
                let clusters: TypeUrl = TypeUrl::CLUSTER.into();
                cache
                    .replace(
                        clusters.clone(),
                        make_resources(TypeUrl::CLUSTER, partition_size),
                    )
                    .expect("replace");
                let resource = make_resources(TypeUrl::CLUSTER, 1).pop().expect("resource");

                b.iter(|| {
                    black_box(
                        cache
                            .upsert(clusters.clone(), resource.clone())
                            .expect("upsert"),
                    );
                });
            },
        );
    }

    group.finish();
}

/// Benchmark snapshot reads against populated and empty partitions.
fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    group.bench_function("populated", |b| {
        let cache = ResourceCache::new();
        let clusters: TypeUrl = TypeUrl::CLUSTER.into();
        cache
            .replace(clusters.clone(), make_resources(TypeUrl::CLUSTER, 100))
            .expect("replace");

        b.iter(|| {
            black_box(cache.snapshot(&clusters));
        });
    });

    group.bench_function("unknown_type", |b| {
        let cache = ResourceCache::new();
        let routes: TypeUrl = TypeUrl::ROUTE.into();

        b.iter(|| {
            black_box(cache.snapshot(&routes));
        });
    });

    group.finish();
}

/// Benchmark change fan-out with a growing listener population.
fn bench_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("fanout");

    for num_listeners in [1, 10, 100].iter() {
        group.throughput(Throughput::Elements(*num_listeners as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_listeners),
            num_listeners,
            |b, &num_listeners| {
                let cache = ResourceCache::new();
                let clusters: TypeUrl = TypeUrl::CLUSTER.into();

                // Wide inboxes so fan-out never hits the full-channel path
                let receivers: Vec<_> = (0..num_listeners)
                    .map(|_| {
                        let (tx, rx) = tokio::sync::mpsc::channel(1_000_000);
                        cache.router().subscribe(clusters.clone(), tx);
                        rx
                    })
                    .collect();

                let resources = make_resources(TypeUrl::CLUSTER, 1);
                b.iter(|| {
                    black_box(
                        cache
                            .replace(clusters.clone(), resources.clone())
                            .expect("replace"),
                    );
                });

                drop(receivers);
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_replace, bench_upsert, bench_snapshot, bench_fanout);

criterion_main!(benches);
