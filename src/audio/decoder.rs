//! Symphonia-based decode into the canonical interleaved buffer.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer as SymphoniaSampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::error::EngineError;

use super::{SampleBuffer, TrackInfo, sanitize_sample};

const BYTES_PER_SAMPLE: u64 = std::mem::size_of::<f32>() as u64;

/// Decode the first audio track of `path` into interleaved `f32` samples.
///
/// Integer PCM is normalized to full scale, float PCM is clamped to
/// `[-1, 1]` (non-finite values become 0). The whole track is materialized;
/// `max_track_bytes` caps the canonical buffer size.
pub fn decode(path: &Path, max_track_bytes: u64) -> Result<(TrackInfo, SampleBuffer), EngineError> {
    let file = File::open(path).map_err(|source| EngineError::from_io(path, source))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| match err {
            SymphoniaError::IoError(source) => EngineError::from_io(path, source),
            SymphoniaError::Unsupported(_) => EngineError::UnsupportedFormat {
                path: path.to_path_buf(),
            },
            other => EngineError::MalformedInput {
                message: format!("Probe failed for {}: {other}", path.display()),
            },
        })?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| EngineError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| EngineError::MalformedInput {
            message: format!("Missing sample rate in {}", path.display()),
        })?;
    let mut channels: Option<u16> = codec_params
        .channels
        .map(|channels| channels.count() as u16);

    // Containers that declare their frame count can be rejected before any
    // packet is decoded.
    if let (Some(frames), Some(channels)) = (codec_params.n_frames, channels) {
        let required = frames
            .saturating_mul(u64::from(channels))
            .saturating_mul(BYTES_PER_SAMPLE);
        if required > max_track_bytes {
            return Err(EngineError::OutOfMemory {
                required_bytes: required,
                limit_bytes: max_track_bytes,
            });
        }
    }

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|_| EngineError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;

    let mut samples: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(SymphoniaError::IoError(source)) => {
                return Err(EngineError::from_io(path, source));
            }
            Err(other) => {
                return Err(EngineError::MalformedInput {
                    message: format!("Packet read failed for {}: {other}", path.display()),
                });
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(message)) => {
                return Err(EngineError::MalformedInput {
                    message: format!("Corrupt frame in {}: {message}", path.display()),
                });
            }
            Err(SymphoniaError::IoError(source)) => {
                return Err(EngineError::from_io(path, source));
            }
            Err(other) => {
                return Err(EngineError::MalformedInput {
                    message: format!("Decode failed for {}: {other}", path.display()),
                });
            }
        };

        let spec = *decoded.spec();
        let channels = *channels.get_or_insert(spec.channels.count() as u16);
        if channels == 0 {
            return Err(EngineError::MalformedInput {
                message: format!("Missing channel layout in {}", path.display()),
            });
        }

        let mut interleaved = SymphoniaSampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        interleaved.copy_interleaved_ref(decoded);

        let projected = (samples.len() + interleaved.samples().len()) as u64 * BYTES_PER_SAMPLE;
        if projected > max_track_bytes {
            return Err(EngineError::OutOfMemory {
                required_bytes: projected,
                limit_bytes: max_track_bytes,
            });
        }
        samples.extend(interleaved.samples().iter().copied().map(sanitize_sample));
    }

    let channels = channels.filter(|&count| count > 0).ok_or_else(|| {
        EngineError::MalformedInput {
            message: format!("Missing channel layout in {}", path.display()),
        }
    })?;

    let frames = samples.len() / usize::from(channels);
    let duration = frames as f64 / f64::from(sample_rate);
    debug!(
        path = %path.display(),
        frames,
        sample_rate,
        channels,
        "Decoded track"
    );

    Ok((
        TrackInfo {
            duration,
            sample_rate,
            channels,
        },
        SampleBuffer {
            samples,
            sample_rate,
            channels,
        },
    ))
}
