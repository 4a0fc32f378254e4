use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use forgeml_ai::{
    algorithm_for, AlgorithmParams, ModelType, TrainingConfig, TrainingData,
};

/// Deterministic blobs around `k` well separated centres.
fn blobs(rows: usize, k: usize) -> Vec<Vec<f64>> {
    (0..rows)
        .map(|i| {
            let centre = (i % k) as f64 * 20.0;
            let jitter = ((i * 7919) % 100) as f64 / 100.0;
            vec![centre + jitter, centre - jitter]
        })
        .collect()
}

fn bench_k_means(c: &mut Criterion) {
    let mut group = c.benchmark_group("k_means_training");
    let algorithm = algorithm_for(ModelType::Clustering);
    let config = TrainingConfig::defaults_for(ModelType::Clustering).with_params(
        AlgorithmParams::Clustering {
            k: 4,
            max_iterations: 100,
        },
    );

    for rows in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(rows as u64));
        let data = TrainingData::unlabeled(blobs(rows, 4));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &data, |b, data| {
            b.iter(|| algorithm.train(black_box(data), &config).unwrap());
        });
    }

    group.finish();
}

fn bench_regression(c: &mut Criterion) {
    let mut group = c.benchmark_group("regression_training");
    let algorithm = algorithm_for(ModelType::Regression);
    let config = TrainingConfig::defaults_for(ModelType::Regression);

    for rows in [1_000usize, 100_000] {
        group.throughput(Throughput::Elements(rows as u64));
        let xs: Vec<Vec<f64>> = (0..rows).map(|i| vec![i as f64]).collect();
        let ys: Vec<f64> = (0..rows).map(|i| 3.0 * i as f64 - 1.0 + (i % 5) as f64).collect();
        let data = TrainingData::numeric(xs, ys);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &data, |b, data| {
            b.iter(|| algorithm.train(black_box(data), &config).unwrap());
        });
    }

    group.finish();
}

fn bench_classifier_epoch(c: &mut Criterion) {
    let mut group = c.benchmark_group("classifier_training");
    group.sample_size(10);
    let algorithm = algorithm_for(ModelType::Classification);
    let config = TrainingConfig::defaults_for(ModelType::Classification).with_epochs(5);

    let features: Vec<Vec<f64>> = (0..500).map(|i| vec![(i % 50) as f64 - 25.0, (i % 7) as f64]).collect();
    let target: Vec<f64> = features.iter().map(|r| if r[0] > 0.0 { 1.0 } else { 0.0 }).collect();
    let data = TrainingData::numeric(features, target);

    group.bench_function("default_architecture_5_epochs", |b| {
        b.iter(|| algorithm.train(black_box(&data), &config).unwrap());
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_k_means,
    bench_regression,
    bench_classifier_epoch
);
criterion_main!(benches);
