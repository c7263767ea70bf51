use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{ImageFormat, Rgba, RgbaImage};
use imgly_reframe::{
    process_batch, BatchItem, FitPolicy, FloodFillSegmenter, OutputFormat, TransformOptions,
};
use std::io::Cursor;
use tokio::runtime::Runtime;

/// Light backdrop with a darker subject in the middle
fn product_shot(size: u32) -> RgbaImage {
    let margin = size / 5;
    RgbaImage::from_fn(size, size, |x, y| {
        if (margin..size - margin).contains(&x) && (margin..size - margin).contains(&y) {
            Rgba([((x * 7) % 200) as u8, 60, ((y * 3) % 200) as u8, 255])
        } else {
            Rgba([245, 245, 245, 255])
        }
    })
}

fn encoded(size: u32) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    product_shot(size)
        .write_to(&mut cursor, ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}

fn bench_flood_fill(c: &mut Criterion) {
    let segmenter = FloodFillSegmenter::new();
    let mut group = c.benchmark_group("flood_fill");

    for size in [256u32, 512, 1024] {
        let image = product_shot(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &image, |b, image| {
            b.iter(|| black_box(segmenter.segment(black_box(image))));
        });
    }
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let bytes = encoded(800);
    let mut group = c.benchmark_group("batch_pipeline");
    group.sample_size(10);

    let cases = [
        ("cover_png", OutputFormat::Png, false, 0),
        ("cover_jpeg_rounded", OutputFormat::Jpeg, false, 48),
        ("cover_webp_cutout", OutputFormat::WebP, true, 0),
    ];

    for (name, format, remove_background, radius) in cases {
        let options = TransformOptions::builder()
            .target_size(512, 512)
            .fit(FitPolicy::Cover)
            .output_format(format)
            .remove_background(remove_background)
            .corner_radius(radius)
            .build()
            .unwrap();

        group.bench_function(name, |b| {
            b.iter(|| {
                rt.block_on(async {
                    let items = (0..4)
                        .map(|i| BatchItem::new(format!("{i}.png"), bytes.clone()))
                        .collect();
                    let output = process_batch(items, &options).await.unwrap();
                    black_box(output.summary.succeeded)
                })
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_flood_fill, bench_batch);
criterion_main!(benches);
