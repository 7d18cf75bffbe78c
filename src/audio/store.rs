//! Single-slot store for the current decoded track.

use std::sync::{OnceLock, PoisonError, RwLock};

use crate::error::EngineError;

use super::{SampleBuffer, TrackInfo, downmix_to_mono};

struct LoadedTrack {
    info: TrackInfo,
    buffer: SampleBuffer,
    mono: OnceLock<Vec<f32>>,
}

impl LoadedTrack {
    fn mono_mix(&self) -> &[f32] {
        if self.buffer.channels <= 1 {
            return &self.buffer.samples;
        }
        self.mono
            .get_or_init(|| downmix_to_mono(&self.buffer.samples, self.buffer.channels))
    }
}

/// Process-wide container for at most one decoded track.
///
/// Writers (decode) take the exclusive guard; readers take shared guards and
/// only ever see views scoped to their closure, so no reader can retain a
/// borrow past the command that produced it. The mono mix is materialized at
/// most once per occupant and discarded with it.
#[derive(Default)]
pub struct TrackStore {
    slot: RwLock<Option<LoadedTrack>>,
}

impl TrackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current track. The previous buffer is dropped before this
    /// returns, after all shared holders release.
    pub fn put(&self, info: TrackInfo, buffer: SampleBuffer) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(LoadedTrack {
            info,
            buffer,
            mono: OnceLock::new(),
        });
    }

    pub fn info(&self) -> Result<TrackInfo, EngineError> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref()
            .map(|track| track.info)
            .ok_or(EngineError::NoTrack)
    }

    /// Run `reader` against the interleaved buffer of the current track.
    pub fn with_samples<R>(
        &self,
        reader: impl FnOnce(&SampleBuffer) -> R,
    ) -> Result<R, EngineError> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        let track = slot.as_ref().ok_or(EngineError::NoTrack)?;
        Ok(reader(&track.buffer))
    }

    /// Run `reader` against the mono mix and sample rate of the current track.
    pub fn with_mono<R>(&self, reader: impl FnOnce(&[f32], u32) -> R) -> Result<R, EngineError> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        let track = slot.as_ref().ok_or(EngineError::NoTrack)?;
        Ok(reader(track.mono_mix(), track.buffer.sample_rate))
    }

    /// Run `reader` against both the interleaved buffer and the mono mix
    /// under a single shared guard.
    pub fn with_samples_and_mono<R>(
        &self,
        reader: impl FnOnce(&SampleBuffer, &[f32]) -> R,
    ) -> Result<R, EngineError> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        let track = slot.as_ref().ok_or(EngineError::NoTrack)?;
        Ok(reader(&track.buffer, track.mono_mix()))
    }
}
