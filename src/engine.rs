//! Command surface: the operations the UI layer issues against the engine.

use std::path::Path;

use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analysis::spectrogram::{Spectrogram, SpectrogramEngine};
use crate::analysis::{self, Forensics};
use crate::audio::store::TrackStore;
use crate::audio::{TrackInfo, decoder, export};
use crate::config::{EngineConfig, clamp_worker_threads};
use crate::error::EngineError;

/// Interleaved samples of the current track, as returned by
/// `get_audio_samples`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioSamples {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// The analysis engine behind the workstation UI.
///
/// Commands run to completion and return a value; there is no cancellation.
/// CPU-bound inner loops fan out across the engine's worker pool, and the
/// UI thread never executes analysis itself.
pub struct Engine {
    store: TrackStore,
    spectrogram: SpectrogramEngine,
    pool: ThreadPool,
    config: EngineConfig,
}

impl Engine {
    pub fn new() -> Result<Self, EngineError> {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Result<Self, EngineError> {
        let threads = clamp_worker_threads(config.worker_threads);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("sonoscope-worker-{index}"))
            .build()
            .map_err(|err| EngineError::Io {
                source: std::io::Error::other(err),
            })?;
        debug!(threads, "Worker pool ready");
        Ok(Self {
            store: TrackStore::new(),
            spectrogram: SpectrogramEngine::new(),
            pool,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Decode `path` and make it the current track.
    ///
    /// A failing decode leaves any previously loaded track intact.
    pub fn load_audio(&self, path: &Path) -> Result<TrackInfo, EngineError> {
        info!(path = %path.display(), "Loading audio");
        let (track_info, buffer) = match decoder::decode(path, self.config.max_track_bytes) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Decode failed");
                return Err(err);
            }
        };
        self.store.put(track_info, buffer);
        info!(
            duration_s = track_info.duration,
            sample_rate = track_info.sample_rate,
            channels = track_info.channels,
            "Track loaded"
        );
        Ok(track_info)
    }

    /// Compute the spectrogram of the mono mix up to `max_freq` Hz.
    pub fn compute_spectrogram(&self, max_freq: f64) -> Result<Spectrogram, EngineError> {
        debug!(max_freq, "Computing spectrogram");
        let result = self.pool.install(|| {
            self.store.with_mono(|mono, sample_rate| {
                self.spectrogram.compute(mono, sample_rate, max_freq)
            })
        })?;
        result
    }

    /// Run the full forensic battery over the current track.
    pub fn analyze_forensics(&self) -> Result<Forensics, EngineError> {
        let forensics = self.pool.install(|| {
            self.store.with_samples_and_mono(|buffer, mono| {
                analysis::analyze(&buffer.samples, mono, buffer.sample_rate)
            })
        })?;
        info!(
            enf_present = forensics.enf_present,
            splice_count = forensics.splice_times.len(),
            clipped_count = forensics.clipped_count,
            "Forensic analysis complete"
        );
        Ok(forensics)
    }

    /// Interleaved samples of the current track.
    ///
    /// This clones for the serialization boundary; in-process consumers that
    /// want a zero-copy view go through the store's scoped readers instead.
    pub fn get_audio_samples(&self) -> Result<AudioSamples, EngineError> {
        self.store.with_samples(|buffer| AudioSamples {
            samples: buffer.samples.clone(),
            sample_rate: buffer.sample_rate,
            channels: buffer.channels,
        })
    }

    /// Export `[start_s, end_s)` of the current track as 16-bit PCM.
    pub fn export_audio(
        &self,
        out_path: &Path,
        start_s: f64,
        end_s: f64,
    ) -> Result<(), EngineError> {
        info!(path = %out_path.display(), start_s, end_s, "Exporting audio");
        let result = self
            .store
            .with_samples(|buffer| export::export_range(buffer, out_path, start_s, end_s))?;
        result
    }

    /// Metadata of the current track.
    pub fn track_info(&self) -> Result<TrackInfo, EngineError> {
        self.store.info()
    }
}
