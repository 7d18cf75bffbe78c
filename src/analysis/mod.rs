//! Forensic analyses over the current track.

mod enf;
mod levels;
mod splice;
/// Short-time Fourier spectrogram of the mono mix.
pub mod spectrogram;

use serde::Serialize;

/// Forensic findings for the loaded track.
///
/// Field names are part of the command surface; the UI consumes the
/// serialized record unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forensics {
    pub enf_present: bool,
    pub enf_strength_db: f64,
    pub grid_freq: u32,
    pub splice_times: Vec<f64>,
    pub snr_db: f64,
    pub dynamic_range_db: f64,
    pub has_clipping: bool,
    pub clipped_count: u64,
}

/// Run every forensic sub-analysis.
///
/// Clipping is counted over the interleaved samples of all channels; the
/// remaining analyses run over the mono mix. Silent or empty input never
/// fails and yields zeroed metrics.
pub(crate) fn analyze(interleaved: &[f32], mono: &[f32], sample_rate: u32) -> Forensics {
    let clipped_count = levels::clipped_count(interleaved);
    let enf = enf::detect(mono, sample_rate);
    Forensics {
        enf_present: enf.present,
        enf_strength_db: enf.strength_db,
        grid_freq: enf.grid_freq,
        splice_times: splice::detect(mono, sample_rate),
        snr_db: levels::snr_db(mono),
        dynamic_range_db: levels::dynamic_range_db(mono),
        has_clipping: clipped_count > 0,
        clipped_count,
    }
}
