//! Analysis engine of the audio forensics workstation: streaming decode to a
//! canonical buffer, spectrogram computation, forensic analyses, and
//! waveform export.

/// Forensic analyses and the spectrogram engine.
pub mod analysis;
/// Decoding, the track store, and waveform export.
pub mod audio;
/// Engine configuration with TOML persistence.
pub mod config;
/// Command surface exposed to the UI layer.
pub mod engine;
/// Crate-wide error taxonomy.
pub mod error;
/// Logging setup helpers.
pub mod logging;
