/// Benchmarks for the profile crate
///
/// Measures performance of:
/// - Glob pattern compilation
/// - Cached pattern matching
/// - Rule compression
use comarmor_profile::{compile, compress, ObjectKind, PatternCache, Permission, Profile, Rule};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_pattern_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern_compilation");

    let test_cases = vec![
        ("literal", "/robot/sensors/imu"),
        ("segment", "/robot/*/imu"),
        ("recursive", "/robot/**"),
        ("braces", "/{left,right}/{camera,lidar}/{raw,rect}"),
    ];

    for (name, pattern) in test_cases {
        group.bench_with_input(BenchmarkId::from_parameter(name), &pattern, |b, &p| {
            b.iter(|| compile(black_box(p)).unwrap());
        });
    }

    group.finish();
}

fn bench_cached_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_matching");
    let cache = PatternCache::default();

    group.bench_function("warm_hit", |b| {
        b.iter(|| {
            cache
                .is_match(black_box("/robot/**"), black_box("/robot/arm/joint_states"))
                .unwrap()
        });
    });

    group.bench_function("uncached", |b| {
        b.iter(|| {
            compile(black_box("/robot/**"))
                .unwrap()
                .is_match(black_box("/robot/arm/joint_states"))
        });
    });

    group.finish();
}

fn bench_compress(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress");

    for size in [10usize, 100, 1000] {
        let profile = (0..size).fold(Profile::new("/bench"), |p, i| {
            let permission = if i % 2 == 0 {
                Permission::Publish
            } else {
                Permission::Subscribe
            };
            p.with_rule(
                Rule::allow(ObjectKind::Topic)
                    .with_attachment(format!("/topic_{}", i))
                    .with_permission(permission),
            )
        });

        group.bench_with_input(BenchmarkId::from_parameter(size), &profile, |b, p| {
            b.iter(|| compress(black_box(p)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_pattern_compilation,
    bench_cached_matching,
    bench_compress
);
criterion_main!(benches);
