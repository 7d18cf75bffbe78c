//! Mains-hum (ENF) detection over the mono mix.
//!
//! The electrical network frequency leaks into recordings made near
//! mains-powered equipment; its presence and nominal frequency (50 or 60 Hz)
//! are estimated from a high-resolution averaged periodogram.

use realfft::RealFftPlanner;

use super::spectrogram::hann_window;

const CANDIDATE_GRID_FREQS: [f64; 2] = [50.0, 60.0];
/// Band-to-sideband ratio above which hum is reported present.
pub(crate) const PRESENCE_THRESHOLD_DB: f64 = 6.0;
/// Seconds of signal per Welch segment; fixes the resolution at or below 0.1 Hz.
const SEGMENT_SECONDS: usize = 10;
const BAND_HALF_WIDTH_HZ: f64 = 0.5;
const SIDE_BAND_OFFSET_HZ: f64 = 3.0;
const SIDE_BAND_HALF_WIDTH_HZ: f64 = 1.0;
const POWER_EPSILON: f64 = 1e-30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct EnfReading {
    pub(crate) present: bool,
    pub(crate) strength_db: f64,
    pub(crate) grid_freq: u32,
}

impl EnfReading {
    fn silent() -> Self {
        Self {
            present: false,
            strength_db: 0.0,
            grid_freq: 50,
        }
    }
}

/// Score both candidate grid frequencies and report the stronger one.
pub(crate) fn detect(mono: &[f32], sample_rate: u32) -> EnfReading {
    if mono.is_empty() || sample_rate == 0 {
        return EnfReading::silent();
    }
    let (power, bin_hz) = welch_power_spectrum(mono, sample_rate);
    if power.iter().sum::<f64>() <= POWER_EPSILON {
        return EnfReading::silent();
    }

    let mut best: Option<(u32, f64)> = None;
    for &freq in &CANDIDATE_GRID_FREQS {
        let Some(score) = band_score(&power, bin_hz, freq) else {
            continue;
        };
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((freq as u32, score));
        }
    }

    match best {
        Some((grid_freq, strength_db)) => EnfReading {
            present: strength_db >= PRESENCE_THRESHOLD_DB,
            strength_db,
            grid_freq,
        },
        None => EnfReading::silent(),
    }
}

/// Hann-windowed Welch periodogram with 50% overlap.
///
/// Signals shorter than one segment are windowed over their actual length
/// and zero-padded, which keeps the bin spacing and interpolates the
/// spectrum instead of truncating it.
fn welch_power_spectrum(mono: &[f32], sample_rate: u32) -> (Vec<f64>, f64) {
    let segment_len = (sample_rate as usize * SEGMENT_SECONDS).next_power_of_two();
    let mut planner = RealFftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(segment_len);
    let mut input = fft.make_input_vec();
    let mut spectrum = fft.make_output_vec();
    let mut scratch = fft.make_scratch_vec();
    let mut power = vec![0.0_f64; spectrum.len()];
    let mut segments = 0_u32;

    if mono.len() < segment_len {
        let window = hann_window(mono.len());
        for ((cell, &sample), &win) in input.iter_mut().zip(mono).zip(&window) {
            *cell = sample * win;
        }
        input[mono.len()..].fill(0.0);
        if fft
            .process_with_scratch(&mut input, &mut spectrum, &mut scratch)
            .is_ok()
        {
            accumulate(&mut power, &spectrum);
            segments = 1;
        }
    } else {
        let window = hann_window(segment_len);
        let hop = segment_len / 2;
        let mut start = 0_usize;
        while start + segment_len <= mono.len() {
            for ((cell, &sample), &win) in input
                .iter_mut()
                .zip(&mono[start..start + segment_len])
                .zip(&window)
            {
                *cell = sample * win;
            }
            if fft
                .process_with_scratch(&mut input, &mut spectrum, &mut scratch)
                .is_err()
            {
                break;
            }
            accumulate(&mut power, &spectrum);
            segments += 1;
            start += hop;
        }
    }

    if segments > 0 {
        for bin in &mut power {
            *bin /= f64::from(segments);
        }
    }
    (power, f64::from(sample_rate) / segment_len as f64)
}

fn accumulate(power: &mut [f64], spectrum: &[realfft::num_complex::Complex<f32>]) {
    for (acc, bin) in power.iter_mut().zip(spectrum) {
        *acc += f64::from(bin.norm_sqr());
    }
}

/// `10·log10(band / mean(side bands))` for a candidate frequency, or `None`
/// when the bands fall outside the representable spectrum.
fn band_score(power: &[f64], bin_hz: f64, freq: f64) -> Option<f64> {
    let band = band_power(
        power,
        bin_hz,
        freq - BAND_HALF_WIDTH_HZ,
        freq + BAND_HALF_WIDTH_HZ,
    )?;
    let low_side = band_power(
        power,
        bin_hz,
        freq - SIDE_BAND_OFFSET_HZ - SIDE_BAND_HALF_WIDTH_HZ,
        freq - SIDE_BAND_OFFSET_HZ + SIDE_BAND_HALF_WIDTH_HZ,
    )?;
    let high_side = band_power(
        power,
        bin_hz,
        freq + SIDE_BAND_OFFSET_HZ - SIDE_BAND_HALF_WIDTH_HZ,
        freq + SIDE_BAND_OFFSET_HZ + SIDE_BAND_HALF_WIDTH_HZ,
    )?;
    let noise = (low_side + high_side) / 2.0;
    Some(10.0 * (band.max(POWER_EPSILON) / noise.max(POWER_EPSILON)).log10())
}

fn band_power(power: &[f64], bin_hz: f64, lo_hz: f64, hi_hz: f64) -> Option<f64> {
    if lo_hz < 0.0 {
        return None;
    }
    let lo_bin = (lo_hz / bin_hz).ceil() as usize;
    let hi_bin = (hi_hz / bin_hz).floor() as usize;
    if hi_bin >= power.len() || hi_bin < lo_bin {
        return None;
    }
    Some(power[lo_bin..=hi_bin].iter().sum())
}
