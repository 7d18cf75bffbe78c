use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sonoscope::analysis::spectrogram::SpectrogramEngine;

const SAMPLE_RATE: u32 = 44_100;
const SECONDS: usize = 10;

fn swept_tone() -> Vec<f32> {
    let count = SECONDS * SAMPLE_RATE as usize;
    (0..count)
        .map(|n| {
            let t = n as f64 / f64::from(SAMPLE_RATE);
            let freq = 100.0 + 300.0 * t;
            0.5 * (2.0 * std::f64::consts::PI * freq * t).sin() as f32
        })
        .collect()
}

fn bench_spectrogram(c: &mut Criterion) {
    let engine = SpectrogramEngine::new();
    let mono = swept_tone();
    c.bench_with_input(
        BenchmarkId::new("spectrogram", mono.len()),
        &mono,
        |b, mono| {
            b.iter(|| {
                engine
                    .compute(black_box(mono), SAMPLE_RATE, 8_000.0)
                    .expect("spectrogram")
            });
        },
    );
}

criterion_group!(benches, bench_spectrogram);
criterion_main!(benches);
