//! Engine configuration with TOML persistence.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::{fs, thread};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_MAX_TRACK_BYTES: u64 = 2 * 1024 * 1024 * 1024;
const MAX_WORKER_THREADS: usize = 64;

/// Engine tunables loaded from disk.
///
/// Config keys (TOML): `max_track_bytes`, `worker_threads`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Ceiling on the decoded track size in bytes.
    #[serde(default = "default_max_track_bytes")]
    pub max_track_bytes: u64,
    /// Worker pool size; 0 selects the host parallelism.
    #[serde(default)]
    pub worker_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_track_bytes: default_max_track_bytes(),
            worker_threads: 0,
        }
    }
}

fn default_max_track_bytes() -> u64 {
    DEFAULT_MAX_TRACK_BYTES
}

/// Clamp a configured worker count to a usable pool size.
pub fn clamp_worker_threads(requested: usize) -> usize {
    let resolved = if requested == 0 {
        thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    } else {
        requested
    };
    resolved.clamp(1, MAX_WORKER_THREADS)
}

/// Errors reported while loading or saving the engine config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl EngineConfig {
    /// Load a config from a TOML file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the config as pretty TOML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
