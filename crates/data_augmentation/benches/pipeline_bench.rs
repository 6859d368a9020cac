use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use data_augmentation::config::classification_pipeline;
use data_augmentation::dataloader::init_worker_rng;
use data_augmentation::transforms::vision::{
    Compose, HorizontalFlip, Normalize, RandomCrop, Resize, Targets, TargetsToSample,
};
use data_augmentation::transforms::Transform;
use data_augmentation::{DataLoader, DataLoaderConfig, InMemoryDataset};
use image::{Rgb, RgbImage};

/// Benchmarks for augmentation pipelines and the DataLoader.
///
/// This measures:
/// 1. Pipeline cost: the full classification pipeline on one image
/// 2. Loader throughput: an augmented in-memory dataset across worker counts
///
/// To run these, use:
/// ```bash
/// cargo bench --bench pipeline_bench
/// ```

/// Worker counts swept by the loader benchmark.
const WORKERS: [usize; 4] = [0, 1, 2, 4];

const SAMPLES: usize = 256;

fn make_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

/// The full classification pipeline on a 1920x1080 frame.
fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("Pipeline");
    let pipeline = classification_pipeline().unwrap();
    let image = make_image(1920, 1080);
    init_worker_rng(0, 0, 42);

    group.bench_function("classification", |b| {
        b.iter(|| {
            let out = pipeline.apply(Targets::new(image.clone())).unwrap();
            black_box(out)
        })
    });
    group.finish();
}

/// Augmented 128x128 crops batched by the DataLoader.
fn bench_dataloader(c: &mut Criterion) {
    let mut group = c.benchmark_group("DataLoader");
    group.throughput(Throughput::Elements(SAMPLES as u64));

    let images: Vec<RgbImage> = (0..SAMPLES).map(|_| make_image(160, 160)).collect();
    let pipeline = Compose::new()
        .with_step(RandomCrop::new(144, 144).unwrap())
        .with_step(Resize::new(128, 128).unwrap())
        .with_step(HorizontalFlip::new(0.5).unwrap());
    let dataset = InMemoryDataset::new(images).with_transform(
        (|image: RgbImage| -> anyhow::Result<Targets> { Ok(Targets::new(image)) })
            .then(pipeline)
            .then(TargetsToSample::new().normalize(Normalize::half())),
    );

    for &workers in &WORKERS {
        let config = DataLoaderConfig::builder()
            .batch_size(32)
            .shuffle(true)
            .seed(0)
            .num_workers(workers)
            .build();
        let loader = DataLoader::new(dataset.clone(), config).unwrap();

        group.bench_with_input(BenchmarkId::new("workers", workers), &loader, |b, loader| {
            b.iter(|| {
                let batches = loader
                    .iter()
                    .unwrap()
                    .map(|batch| black_box(batch.unwrap()))
                    .count();
                black_box(batches)
            })
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default()
        .warm_up_time(std::time::Duration::from_secs(2))
        .measurement_time(std::time::Duration::from_secs(5))
        .sample_size(20);
    targets = bench_pipeline, bench_dataloader
);
criterion_main!(benches);
