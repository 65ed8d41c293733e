use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use snapshot_di::*;
use std::sync::Arc;

// ===== Micro Benchmarks =====

fn bench_singleton_hit(c: &mut Criterion) {
    let mut sc = ServiceCollection::new();
    sc.add_singleton(42u64).unwrap();
    let sp = sc.build().unwrap();

    // Prime the singleton
    let _ = sp.get::<u64>().unwrap();

    c.bench_function("singleton_hit_u64", |b| {
        b.iter(|| {
            let v = sp.get::<u64>().unwrap();
            black_box(v);
        })
    });
}

fn bench_singleton_cold(c: &mut Criterion) {
    struct ExpensiveToCreate {
        data: Vec<u64>,
    }

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<ExpensiveToCreate, _>(|_| ExpensiveToCreate {
        data: (0..1000).collect(),
    })
    .unwrap();
    let registry = sc.freeze().unwrap();

    c.bench_function("singleton_cold_per_provider", |b| {
        b.iter(|| {
            let sp = registry.build_provider();
            let v = sp.get::<ExpensiveToCreate>().unwrap();
            black_box(v.data.len());
        })
    });
}

fn bench_singleton_vs_transient(c: &mut Criterion) {
    struct Service {
        data: [u8; 64],
    }

    let mut group = c.benchmark_group("singleton_vs_transient");

    let mut sc_singleton = ServiceCollection::new();
    sc_singleton
        .add_singleton_factory::<Service, _>(|_| Service { data: [0; 64] })
        .unwrap();
    let sp_singleton = sc_singleton.build().unwrap();
    let _ = sp_singleton.get::<Service>().unwrap();

    group.bench_function("singleton", |b| {
        b.iter(|| {
            let v = sp_singleton.get::<Service>().unwrap();
            black_box(v.data[0]);
        })
    });

    let mut sc_transient = ServiceCollection::new();
    sc_transient
        .add_transient_factory::<Service, _>(|_| Service { data: [0; 64] })
        .unwrap();
    let sp_transient = sc_transient.build().unwrap();

    group.bench_function("transient", |b| {
        b.iter(|| {
            let v = sp_transient.get::<Service>().unwrap();
            black_box(v.data[0]);
        })
    });

    group.finish();
}

fn bench_options_hit(c: &mut Criterion) {
    #[derive(Default)]
    struct ProtectionOptions {
        discriminator: String,
    }

    let mut sc = ServiceCollection::new();
    sc.configure_options::<ProtectionOptions, _>(|_, o| o.discriminator = "my-app".into())
        .unwrap()
        .configure_options::<ProtectionOptions, _>(|_, o| o.discriminator = "app".into())
        .unwrap();
    let sp = sc.build().unwrap();
    let _ = sp.get_options::<ProtectionOptions>().unwrap();

    let mut group = c.benchmark_group("options");
    group.bench_function("get_options", |b| {
        b.iter(|| {
            let o = sp.get_options::<ProtectionOptions>().unwrap();
            black_box(o.discriminator.len());
        })
    });
    group.bench_function("options_wrapper", |b| {
        b.iter(|| {
            let o = sp.get::<Options<ProtectionOptions>>().unwrap();
            black_box(o.value().discriminator.len());
        })
    });
    group.finish();
}

fn bench_trait_resolution(c: &mut Criterion) {
    trait Sink: Send + Sync {
        fn write(&self, n: u64) -> u64;
    }

    struct Null;
    impl Sink for Null {
        fn write(&self, n: u64) -> u64 {
            n
        }
    }

    let mut sc = ServiceCollection::new();
    sc.add_singleton_trait::<dyn Sink>(Arc::new(Null)).unwrap();
    let sp = sc.build().unwrap();

    c.bench_function("trait_single", |b| {
        b.iter(|| {
            let s = sp.get_trait::<dyn Sink>().unwrap();
            black_box(s.write(1));
        })
    });
}

// ===== Dependency Chains =====

fn bench_dependency_depth(c: &mut Criterion) {
    struct Level0;
    struct Level1(#[allow(dead_code)] Arc<Level0>);
    struct Level2(#[allow(dead_code)] Arc<Level1>);
    struct Level3(#[allow(dead_code)] Arc<Level2>);
    struct Level4(#[allow(dead_code)] Arc<Level3>);

    let mut sc = ServiceCollection::new();
    sc.add_transient_factory::<Level0, _>(|_| Level0)
        .unwrap()
        .add_transient_factory::<Level1, _>(|r| Level1(r.get_required::<Level0>()))
        .unwrap()
        .add_transient_factory::<Level2, _>(|r| Level2(r.get_required::<Level1>()))
        .unwrap()
        .add_transient_factory::<Level3, _>(|r| Level3(r.get_required::<Level2>()))
        .unwrap()
        .add_transient_factory::<Level4, _>(|r| Level4(r.get_required::<Level3>()))
        .unwrap();
    let sp = sc.build().unwrap();

    c.bench_function("transient_chain_depth_5", |b| {
        b.iter(|| {
            black_box(sp.get::<Level4>().unwrap());
        })
    });
}

// ===== Provider Construction =====

fn bench_provider_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("provider_build");

    for count in [10usize, 100, 1000] {
        let keys: Vec<Key> = (0..count)
            .map(|i| Key::Trait(Box::leak(format!("bench-{}", i).into_boxed_str())))
            .collect();
        group.bench_with_input(BenchmarkId::new("freeze_and_build", count), &keys, |b, keys| {
            b.iter(|| {
                let mut sc = ServiceCollection::new();
                for (i, key) in keys.iter().enumerate() {
                    sc.register(*key, Lifetime::Singleton, move |_| Ok(Arc::new(i) as AnyArc))
                        .unwrap();
                }
                black_box(sc.build().unwrap());
            })
        });
    }

    group.finish();
}

// ===== Concurrent Access =====

fn bench_concurrent_singleton(c: &mut Criterion) {
    struct Shared {
        value: u64,
    }

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Shared, _>(|_| Shared { value: 7 })
        .unwrap();
    let sp = sc.build().unwrap();
    let _ = sp.get::<Shared>().unwrap();

    c.bench_function("singleton_hit_4_threads", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let sp = sp.clone();
                    std::thread::spawn(move || {
                        let mut total = 0;
                        for _ in 0..100 {
                            total += sp.get::<Shared>().unwrap().value;
                        }
                        total
                    })
                })
                .collect();
            for handle in handles {
                black_box(handle.join().unwrap());
            }
        })
    });
}

criterion_group!(
    benches,
    bench_singleton_hit,
    bench_singleton_cold,
    bench_singleton_vs_transient,
    bench_options_hit,
    bench_trait_resolution,
    bench_dependency_depth,
    bench_provider_build,
);

criterion_group!(concurrent, bench_concurrent_singleton);

criterion_main!(benches, concurrent);
