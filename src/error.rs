//! Error taxonomy shared by every engine command.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Errors reported by the engine command surface.
///
/// Each variant carries a human-readable message via `Display`; the stable
/// machine-readable kind is available through [`EngineError::kind`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },
    #[error("Unsupported or unrecognized audio format: {path}")]
    UnsupportedFormat { path: PathBuf },
    #[error("Malformed audio input: {message}")]
    MalformedInput { message: String },
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },
    #[error("Empty export range: start {start_s} s, end {end_s} s")]
    EmptyRange { start_s: f64, end_s: f64 },
    #[error("No track is loaded")]
    NoTrack,
    #[error("Track needs {required_bytes} bytes, above the {limit_bytes} byte ceiling")]
    OutOfMemory { required_bytes: u64, limit_bytes: u64 },
    #[error("I/O error: {source}")]
    Io { source: std::io::Error },
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },
}

/// Stable machine-readable error kinds, serialized as `snake_case` strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FileNotFound,
    UnsupportedFormat,
    MalformedInput,
    InvalidParameter,
    EmptyRange,
    NoTrack,
    OutOfMemory,
    IoError,
    PermissionDenied,
}

impl EngineError {
    /// The stable kind for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound { .. } => ErrorKind::FileNotFound,
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::MalformedInput { .. } => ErrorKind::MalformedInput,
            Self::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            Self::EmptyRange { .. } => ErrorKind::EmptyRange,
            Self::NoTrack => ErrorKind::NoTrack,
            Self::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            Self::Io { .. } => ErrorKind::IoError,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
        }
    }

    /// Map an I/O error raised while touching `path` onto the taxonomy.
    pub(crate) fn from_io(path: &Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => Self::Io { source },
        }
    }
}
