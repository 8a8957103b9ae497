use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use image::{ImageFormat, Rgb, RgbImage};
use inference::decode;
use inference::processing::post::PostProcessor;
use ndarray::{Array, IxDyn};
use preprocess::LetterboxTransform;
use std::io::Cursor;

const NUM_CLASSES: usize = 80;
const NUM_ANCHORS: usize = 8400;

/// Create mock YOLOv8 output `[1, 84, 8400]` with N confident, spread-out boxes
fn create_mock_yolo_output(num_detections: usize) -> Array<f32, IxDyn> {
    let features = 4 + NUM_CLASSES;
    let mut data = vec![0.001f32; features * NUM_ANCHORS];

    for anchor in 0..num_detections.min(NUM_ANCHORS) {
        let col = (anchor % 20) as f32;
        let row = (anchor / 20) as f32;
        data[anchor] = 16.0 + col * 32.0; // cx
        data[NUM_ANCHORS + anchor] = 16.0 + row * 32.0; // cy
        data[2 * NUM_ANCHORS + anchor] = 24.0; // w
        data[3 * NUM_ANCHORS + anchor] = 24.0; // h
        data[(4 + anchor % NUM_CLASSES) * NUM_ANCHORS + anchor] = 0.9;
    }

    Array::from_shape_vec(IxDyn(&[1, features, NUM_ANCHORS]), data).unwrap()
}

fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
    buf.into_inner()
}

fn benchmark_postprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("postprocessing");

    let post_processor = PostProcessor::new(0.25, 0.7, 300);
    let transform = LetterboxTransform {
        scale: 0.5,
        offset_x: 0.0,
        offset_y: 80.0,
        orig_width: 1280,
        orig_height: 960,
    };

    for num_detections in [0, 10, 100, 400] {
        let output = create_mock_yolo_output(num_detections);

        group.bench_with_input(
            BenchmarkId::new("yolo_nms", num_detections),
            &output,
            |b, output| {
                b.iter(|| {
                    post_processor
                        .parse_detections(
                            black_box(&output.view()),
                            NUM_CLASSES,
                            black_box(&transform),
                        )
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

fn benchmark_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for (width, height) in [(640, 480), (1920, 1080)] {
        let jpeg = create_test_jpeg(width, height);

        group.bench_with_input(
            BenchmarkId::new("jpeg", format!("{}x{}", width, height)),
            &jpeg,
            |b, jpeg| b.iter(|| decode(black_box(jpeg)).unwrap()),
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_postprocessing, benchmark_decode);
criterion_main!(benches);
