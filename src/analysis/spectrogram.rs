//! Short-time Fourier spectrogram of the mono mix.

use std::f32::consts::PI;
use std::sync::Arc;

use rayon::prelude::*;
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use serde::Serialize;

use crate::error::EngineError;

/// Analysis window length in samples.
pub const WINDOW_SIZE: usize = 2_048;
/// Hop between adjacent frames (75% overlap).
pub const HOP_SIZE: usize = WINDOW_SIZE / 4;
/// Highest displayed frequency when the caller does not pick one.
pub const DEFAULT_MAX_FREQ: f64 = 8_000.0;

const MAGNITUDE_EPSILON: f32 = 1e-10;
const DB_FLOOR: f32 = -200.0;

/// Time–frequency magnitude matrix in dB.
///
/// `data` is frame-major: one row per time frame, one column per frequency
/// bin up to `max_freq`. `times` holds each frame's start in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrogram {
    pub data: Vec<Vec<f32>>,
    pub times: Vec<f64>,
    pub max_freq: f64,
}

/// Spectrogram computer with a reusable window and FFT plan.
///
/// The plan is shared read-only across frames of one call and cached across
/// calls; the window size is fixed.
pub struct SpectrogramEngine {
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
}

struct FrameScratch {
    input: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    fft_scratch: Vec<Complex<f32>>,
}

impl FrameScratch {
    fn new(fft: &dyn RealToComplex<f32>) -> Self {
        Self {
            input: fft.make_input_vec(),
            spectrum: fft.make_output_vec(),
            fft_scratch: fft.make_scratch_vec(),
        }
    }
}

impl SpectrogramEngine {
    pub fn new() -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        Self {
            fft: planner.plan_fft_forward(WINDOW_SIZE),
            window: hann_window(WINDOW_SIZE),
        }
    }

    /// Compute the magnitude spectrogram of `mono`, truncated to bins whose
    /// center frequency does not exceed `max_freq`.
    ///
    /// `max_freq` above the Nyquist rate silently clamps; `max_freq ≤ 0` is
    /// rejected. Signals shorter than one window yield an empty matrix.
    pub fn compute(
        &self,
        mono: &[f32],
        sample_rate: u32,
        max_freq: f64,
    ) -> Result<Spectrogram, EngineError> {
        if !max_freq.is_finite() || max_freq <= 0.0 {
            return Err(EngineError::InvalidParameter {
                message: format!("max_freq must be positive, got {max_freq}"),
            });
        }
        let nyquist = f64::from(sample_rate) / 2.0;
        let max_freq = max_freq.min(nyquist);

        if mono.len() < WINDOW_SIZE {
            return Ok(Spectrogram {
                data: Vec::new(),
                times: Vec::new(),
                max_freq,
            });
        }

        let frame_count = (mono.len() - WINDOW_SIZE) / HOP_SIZE + 1;
        let bin_count = truncated_bin_count(max_freq, sample_rate);

        let data: Vec<Vec<f32>> = (0..frame_count)
            .into_par_iter()
            .map_init(
                || FrameScratch::new(self.fft.as_ref()),
                |scratch, frame| self.frame_row(mono, frame, bin_count, scratch),
            )
            .collect();
        let times = (0..frame_count)
            .map(|frame| (frame * HOP_SIZE) as f64 / f64::from(sample_rate))
            .collect();

        Ok(Spectrogram {
            data,
            times,
            max_freq,
        })
    }

    fn frame_row(
        &self,
        mono: &[f32],
        frame: usize,
        bin_count: usize,
        scratch: &mut FrameScratch,
    ) -> Vec<f32> {
        let start = frame * HOP_SIZE;
        let source = &mono[start..start + WINDOW_SIZE];
        for ((cell, &sample), &win) in scratch.input.iter_mut().zip(source).zip(&self.window) {
            *cell = sample * win;
        }
        // Lengths come from the plan itself; a mismatch cannot happen.
        if self
            .fft
            .process_with_scratch(
                &mut scratch.input,
                &mut scratch.spectrum,
                &mut scratch.fft_scratch,
            )
            .is_err()
        {
            return vec![DB_FLOOR; bin_count];
        }
        scratch.spectrum[..bin_count]
            .iter()
            .map(|bin| magnitude_db(bin.norm()))
            .collect()
    }
}

impl Default for SpectrogramEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of bins with center frequency `k·sample_rate/N ≤ max_freq`.
fn truncated_bin_count(max_freq: f64, sample_rate: u32) -> usize {
    let full = WINDOW_SIZE / 2 + 1;
    let limit = (max_freq * WINDOW_SIZE as f64 / f64::from(sample_rate)).floor() as usize + 1;
    limit.min(full)
}

fn magnitude_db(magnitude: f32) -> f32 {
    // A NaN magnitude falls through max() to the epsilon and lands on the
    // dB floor.
    (20.0 * magnitude.max(MAGNITUDE_EPSILON).log10()).max(DB_FLOOR)
}

/// Raised-cosine taper: `w[n] = 0.5·(1 − cos(2π·n/(N−1)))`.
pub(crate) fn hann_window(length: usize) -> Vec<f32> {
    if length <= 1 {
        return vec![1.0_f32; length.max(1)];
    }
    let denom = (length - 1) as f32;
    (0..length)
        .map(|n| 0.5_f32 * (1.0 - (2.0 * PI * n as f32 / denom).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn sine(freq: f64, seconds: f64, sample_rate: u32, amplitude: f32) -> Vec<f32> {
        let count = (seconds * f64::from(sample_rate)).round() as usize;
        (0..count)
            .map(|n| {
                amplitude * (2.0 * std::f64::consts::PI * freq * n as f64
                    / f64::from(sample_rate))
                .sin() as f32
            })
            .collect()
    }

    #[test]
    fn hann_window_is_symmetric_and_zero_at_edges() {
        let w = hann_window(8);
        assert!(w[0].abs() < 1e-6);
        assert!(w[7].abs() < 1e-6);
        assert!((w[1] - w[6]).abs() < 1e-6);
    }

    #[test]
    fn short_signal_yields_empty_matrix() {
        let engine = SpectrogramEngine::new();
        let spectrogram = engine
            .compute(&vec![0.1; WINDOW_SIZE - 1], 44_100, 8_000.0)
            .unwrap();
        assert!(spectrogram.data.is_empty());
        assert!(spectrogram.times.is_empty());
    }

    #[test]
    fn rows_are_uniform_finite_and_floored() {
        let engine = SpectrogramEngine::new();
        let mono = sine(1_000.0, 0.5, 44_100, 0.5);
        let spectrogram = engine.compute(&mono, 44_100, 8_000.0).unwrap();
        assert!(!spectrogram.data.is_empty());
        let width = spectrogram.data[0].len();
        assert_eq!(spectrogram.data.len(), spectrogram.times.len());
        for row in &spectrogram.data {
            assert_eq!(row.len(), width);
            for &value in row {
                assert!(value.is_finite());
                assert!(value >= -200.0);
            }
        }
    }

    #[test]
    fn tone_peaks_in_the_matching_bin() {
        let engine = SpectrogramEngine::new();
        let sample_rate = 44_100_u32;
        let mono = sine(1_000.0, 0.5, sample_rate, 0.5);
        let spectrogram = engine.compute(&mono, sample_rate, 8_000.0).unwrap();
        let row = &spectrogram.data[spectrogram.data.len() / 2];
        let peak_bin = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(bin, _)| bin)
            .unwrap();
        let peak_freq = peak_bin as f64 * f64::from(sample_rate) / WINDOW_SIZE as f64;
        assert!((peak_freq - 1_000.0).abs() < 50.0);
    }

    #[test]
    fn frame_times_follow_the_hop() {
        let engine = SpectrogramEngine::new();
        let mono = vec![0.0_f32; WINDOW_SIZE + 3 * HOP_SIZE];
        let spectrogram = engine.compute(&mono, 44_100, 8_000.0).unwrap();
        assert_eq!(spectrogram.times.len(), 4);
        assert_eq!(spectrogram.times[0], 0.0);
        let step = HOP_SIZE as f64 / 44_100.0;
        assert!((spectrogram.times[1] - step).abs() < 1e-12);
    }

    #[test]
    fn max_freq_above_nyquist_clamps() {
        let engine = SpectrogramEngine::new();
        let mono = sine(440.0, 0.5, 8_000, 0.5);
        let clamped = engine.compute(&mono, 8_000, 1e9).unwrap();
        let nyquist = engine.compute(&mono, 8_000, 4_000.0).unwrap();
        assert_eq!(clamped, nyquist);
        assert_eq!(clamped.data[0].len(), WINDOW_SIZE / 2 + 1);
    }

    #[test]
    fn non_positive_max_freq_is_invalid() {
        let engine = SpectrogramEngine::new();
        let mono = vec![0.0_f32; WINDOW_SIZE];
        let err = engine.compute(&mono, 44_100, 0.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        let err = engine.compute(&mono, 44_100, -1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn nan_input_lands_on_the_floor_not_infinity() {
        let engine = SpectrogramEngine::new();
        let mut mono = vec![0.0_f32; WINDOW_SIZE];
        mono[100] = f32::NAN;
        let spectrogram = engine.compute(&mono, 44_100, 8_000.0).unwrap();
        for row in &spectrogram.data {
            for &value in row {
                assert!(value.is_finite());
                assert!(value >= -200.0);
            }
        }
    }
}
