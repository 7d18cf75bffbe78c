//! Clipping, signal-to-noise and dynamic-range metrics.

use rayon::prelude::*;

/// Samples at or above this magnitude count as clipped.
pub(crate) const CLIP_THRESHOLD: f32 = 0.99;
const NOISE_FLOOR_POWER: f64 = 1e-12;
const DB_RANGE_MAX: f64 = 120.0;
/// Fraction of samples (by |x|) treated as the noise floor.
const NOISE_FRACTION: f64 = 0.1;

/// Count of clipped samples over all channels of the interleaved buffer.
pub(crate) fn clipped_count(interleaved: &[f32]) -> u64 {
    interleaved
        .par_iter()
        .filter(|sample| sample.abs() >= CLIP_THRESHOLD)
        .count() as u64
}

/// Median-split SNR estimate in dB, clamped to `[0, 120]`.
///
/// Signal power is the mean of `x²` over samples louder than the median
/// magnitude; noise power is the mean over the quietest tenth.
pub(crate) fn snr_db(mono: &[f32]) -> f64 {
    if mono.is_empty() {
        return 0.0;
    }
    let mut magnitudes: Vec<f32> = mono.iter().map(|sample| sample.abs()).collect();

    let median_idx = magnitudes.len() / 2;
    let (_, median, _) = magnitudes.select_nth_unstable_by(median_idx, f32::total_cmp);
    let median = *median;

    let noise_count = ((mono.len() as f64 * NOISE_FRACTION) as usize).max(1);
    let (quietest, nth, _) = magnitudes.select_nth_unstable_by(noise_count - 1, f32::total_cmp);
    let mut noise_power: f64 = quietest
        .iter()
        .map(|&magnitude| f64::from(magnitude) * f64::from(magnitude))
        .sum();
    noise_power += f64::from(*nth) * f64::from(*nth);
    noise_power /= noise_count as f64;

    let mut signal_power = 0.0_f64;
    let mut signal_count = 0_u64;
    for &sample in mono {
        if sample.abs() > median {
            signal_power += f64::from(sample) * f64::from(sample);
            signal_count += 1;
        }
    }
    if signal_count == 0 {
        return 0.0;
    }
    signal_power /= signal_count as f64;

    (10.0 * (signal_power / noise_power.max(NOISE_FLOOR_POWER)).log10()).clamp(0.0, DB_RANGE_MAX)
}

/// Peak-to-RMS ratio in dB, clamped to `[0, 120]`.
pub(crate) fn dynamic_range_db(mono: &[f32]) -> f64 {
    if mono.is_empty() {
        return 0.0;
    }
    let mut peak = 0.0_f64;
    let mut sum_sq = 0.0_f64;
    for &sample in mono {
        let value = f64::from(sample);
        peak = peak.max(value.abs());
        sum_sq += value * value;
    }
    if peak <= 0.0 {
        return 0.0;
    }
    let rms = (sum_sq / mono.len() as f64).sqrt();
    (20.0 * (peak / rms.max(NOISE_FLOOR_POWER.sqrt())).log10()).clamp(0.0, DB_RANGE_MAX)
}
