//! Discontinuity (splice) detection over the mono mix.
//!
//! An edit boundary usually leaves a sample-level step that stands far
//! outside the local distribution of first differences. Candidates are
//! samples whose |difference| exceeds the rolling mean by
//! [`THRESHOLD_SIGMAS`] standard deviations.

use rayon::prelude::*;

pub(crate) const THRESHOLD_SIGMAS: f64 = 6.0;
const STAT_WINDOW_SECONDS: f64 = 0.1;
const COALESCE_WINDOW_SECONDS: f64 = 0.05;
const EDGE_GUARD_SECONDS: f64 = 0.01;

/// Timestamps (seconds, strictly increasing) of suspected splices.
pub(crate) fn detect(mono: &[f32], sample_rate: u32) -> Vec<f64> {
    if sample_rate == 0 || mono.len() < 2 {
        return Vec::new();
    }

    let diffs: Vec<f64> = mono
        .windows(2)
        .map(|pair| f64::from((pair[1] - pair[0]).abs()))
        .collect();

    // f64 prefix sums keep the rolling statistics stable over long tracks
    // and make each window query O(1).
    let mut prefix = Vec::with_capacity(diffs.len() + 1);
    let mut prefix_sq = Vec::with_capacity(diffs.len() + 1);
    let mut sum = 0.0_f64;
    let mut sum_sq = 0.0_f64;
    prefix.push(sum);
    prefix_sq.push(sum_sq);
    for &diff in &diffs {
        sum += diff;
        sum_sq += diff * diff;
        prefix.push(sum);
        prefix_sq.push(sum_sq);
    }

    let window = ((f64::from(sample_rate) * STAT_WINDOW_SECONDS) as usize).max(1);
    let half = window / 2;
    let candidates: Vec<usize> = (0..diffs.len())
        .into_par_iter()
        .filter(|&idx| {
            let lo = idx.saturating_sub(half);
            let hi = (lo + window).min(diffs.len());
            let count = (hi - lo) as f64;
            let mean = (prefix[hi] - prefix[lo]) / count;
            let variance = ((prefix_sq[hi] - prefix_sq[lo]) / count - mean * mean).max(0.0);
            diffs[idx] > mean + THRESHOLD_SIGMAS * variance.sqrt()
        })
        .collect();

    // Candidates within the coalescing window chain into a single event
    // stamped at the earliest of them.
    let coalesce_gap = (f64::from(sample_rate) * COALESCE_WINDOW_SECONDS) as usize;
    let mut events: Vec<usize> = Vec::new();
    let mut previous: Option<usize> = None;
    for diff_idx in candidates {
        let sample_idx = diff_idx + 1;
        match previous {
            Some(last) if sample_idx - last <= coalesce_gap => {}
            _ => events.push(sample_idx),
        }
        previous = Some(sample_idx);
    }

    let duration = mono.len() as f64 / f64::from(sample_rate);
    events
        .into_iter()
        .map(|idx| idx as f64 / f64::from(sample_rate))
        .filter(|&t| t >= EDGE_GUARD_SECONDS && t <= duration - EDGE_GUARD_SECONDS)
        .collect()
}
