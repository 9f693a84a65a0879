use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use imbridge_image::{Image, ImageSize, MetaDataDictionary, Rgb};
use imbridge_io::{decode_image, BufferRegistry, Descriptor, ImageEncoder};
use imbridge_tensor::CpuAllocator;

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("Codec");

    let metadata: MetaDataDictionary = (0..32).map(|i| (format!("key_{i}"), i as f64 * 0.5)).collect();
    let image = Image::<Rgb<u8>, 2>::from_size_val(ImageSize::from([1920, 1080]), 128, CpuAllocator)
        .unwrap()
        .with_metadata(metadata);

    let mut registry = BufferRegistry::new();
    let json = ImageEncoder::new(&mut registry).encode(&image).unwrap();

    group.bench_function("parse_descriptor", |b| {
        b.iter(|| Descriptor::parse(black_box(&json)).unwrap())
    });

    group.bench_function("decode_rgb8_1080p", |b| {
        b.iter(|| decode_image::<Rgb<u8>, 2, _>(black_box(&json), &registry).unwrap())
    });

    group.bench_function("encode_rgb8_1080p", |b| {
        b.iter_batched(
            BufferRegistry::new,
            |mut registry| ImageEncoder::new(&mut registry).encode(black_box(&image)).unwrap(),
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
