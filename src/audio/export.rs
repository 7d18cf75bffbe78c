//! 16-bit PCM export of a time range of the current track.

use std::io::BufWriter;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::EngineError;

use super::SampleBuffer;

const PCM16_FULL_SCALE: f32 = 32_767.0;

/// Write `[start_s, end_s)` of the buffer as 16-bit PCM at the original
/// sample rate and channel count.
///
/// The file appears atomically: samples go to a temporary sibling that is
/// renamed over the destination on success; any failure removes the sibling
/// and leaves an existing destination untouched.
pub fn export_range(
    buffer: &SampleBuffer,
    out_path: &Path,
    start_s: f64,
    end_s: f64,
) -> Result<(), EngineError> {
    let duration = buffer.duration_seconds();
    let clipped_start = start_s.clamp(0.0, duration);
    let clipped_end = end_s.clamp(0.0, duration);
    if clipped_end <= clipped_start {
        return Err(EngineError::EmptyRange { start_s, end_s });
    }

    let sample_rate = f64::from(buffer.sample_rate);
    let start_frame = (clipped_start * sample_rate).floor() as usize;
    let end_frame = ((clipped_end * sample_rate).floor() as usize).min(buffer.frame_count());
    if end_frame <= start_frame {
        return Err(EngineError::EmptyRange { start_s, end_s });
    }
    let channels = usize::from(buffer.channels.max(1));
    let segment = &buffer.samples[start_frame * channels..end_frame * channels];

    let parent = out_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged =
        NamedTempFile::new_in(parent).map_err(|source| EngineError::from_io(out_path, source))?;

    let spec = WavSpec {
        channels: buffer.channels,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::new(BufWriter::new(staged.as_file_mut()), spec)
        .map_err(|err| map_wav_error(out_path, err))?;
    for &sample in segment {
        writer
            .write_sample(pcm16_sample(sample))
            .map_err(|err| map_wav_error(out_path, err))?;
    }
    writer
        .finalize()
        .map_err(|err| map_wav_error(out_path, err))?;

    staged
        .persist(out_path)
        .map_err(|err| EngineError::from_io(out_path, err.error))?;
    debug!(
        path = %out_path.display(),
        frames = end_frame - start_frame,
        "Export finished"
    );
    Ok(())
}

fn pcm16_sample(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * PCM16_FULL_SCALE).round() as i16
}

fn map_wav_error(path: &Path, err: hound::Error) -> EngineError {
    match err {
        hound::Error::IoError(source) => EngineError::from_io(path, source),
        other => EngineError::Io {
            source: std::io::Error::other(other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn one_second_stereo() -> SampleBuffer {
        let mut samples = Vec::with_capacity(16_000);
        for frame in 0..8_000 {
            let value = (frame as f32 / 8_000.0) - 0.5;
            samples.push(value);
            samples.push(-value);
        }
        SampleBuffer {
            samples,
            sample_rate: 8_000,
            channels: 2,
        }
    }

    #[test]
    fn exports_requested_frame_range() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("cut.wav");
        let buffer = one_second_stereo();
        export_range(&buffer, &out, 0.25, 0.75).unwrap();

        let reader = hound::WavReader::open(&out).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 8_000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, SampleFormat::Int);
        assert_eq!(reader.len(), 4_000 * 2);
    }

    #[test]
    fn empty_and_inverted_ranges_are_rejected() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("cut.wav");
        let buffer = one_second_stereo();
        let err = export_range(&buffer, &out, 0.5, 0.5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyRange);
        let err = export_range(&buffer, &out, 0.75, 0.25).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyRange);
        let err = export_range(&buffer, &out, 2.0, 3.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyRange);
        assert!(!out.exists());
    }

    #[test]
    fn range_is_clipped_to_track_bounds() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("cut.wav");
        let buffer = one_second_stereo();
        export_range(&buffer, &out, -5.0, 5.0).unwrap();
        let reader = hound::WavReader::open(&out).unwrap();
        assert_eq!(reader.len(), 8_000 * 2);
    }

    #[test]
    fn samples_quantize_with_round_half_away_from_zero() {
        assert_eq!(pcm16_sample(1.0), 32_767);
        assert_eq!(pcm16_sample(-1.0), -32_767);
        assert_eq!(pcm16_sample(0.0), 0);
        assert_eq!(pcm16_sample(0.5), 16_384);
        assert_eq!(pcm16_sample(2.0), 32_767);
        assert_eq!(pcm16_sample(-2.0), -32_767);
    }

    #[test]
    fn export_overwrites_existing_destination() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("cut.wav");
        std::fs::write(&out, b"stale bytes").unwrap();
        let buffer = one_second_stereo();
        export_range(&buffer, &out, 0.0, 0.5).unwrap();
        let reader = hound::WavReader::open(&out).unwrap();
        assert_eq!(reader.len(), 4_000 * 2);
    }
}
