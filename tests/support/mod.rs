//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::path::Path;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Write interleaved samples as a 32-bit float WAV.
pub fn write_wav_f32(path: &Path, samples: &[f32], channels: u16, sample_rate: u32) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create wav parent dirs");
    }
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav writer");
    for &sample in samples {
        writer.write_sample(sample).expect("write wav sample");
    }
    writer.finalize().expect("finalize wav");
}

/// Mono sine wave starting at phase zero.
pub fn sine(freq: f64, seconds: f64, sample_rate: u32, amplitude: f32) -> Vec<f32> {
    let count = (seconds * f64::from(sample_rate)).round() as usize;
    (0..count)
        .map(|n| {
            amplitude
                * (2.0 * std::f64::consts::PI * freq * n as f64 / f64::from(sample_rate)).sin()
                    as f32
        })
        .collect()
}

/// Duplicate a mono signal into interleaved stereo.
pub fn to_stereo(mono: &[f32]) -> Vec<f32> {
    let mut stereo = Vec::with_capacity(mono.len() * 2);
    for &sample in mono {
        stereo.push(sample);
        stereo.push(sample);
    }
    stereo
}

/// Gaussian white noise from a seeded generator, via the Box-Muller
/// transform.
pub fn gaussian_noise(count: usize, sigma: f32, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let sigma = f64::from(sigma);
    let mut samples = Vec::with_capacity(count + 1);
    while samples.len() < count {
        // Shift the uniform draw into (0, 1] so the log stays finite.
        let u1 = 1.0 - rng.random::<f64>();
        let u2 = rng.random::<f64>();
        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = 2.0 * std::f64::consts::PI * u2;
        samples.push((radius * angle.cos() * sigma) as f32);
        samples.push((radius * angle.sin() * sigma) as f32);
    }
    samples.truncate(count);
    samples
}
