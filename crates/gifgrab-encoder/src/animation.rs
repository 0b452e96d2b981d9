//! GIF animation writer.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use gifgrab_ipc::{Frame, SizeEstimate};

use crate::error::EncoderError;
use crate::EncoderResult;

/// Delay between frames in the output.
pub const FRAME_DELAY: Duration = Duration::from_millis(100);

/// NeuQuant sampling speed used when a frame has more than 256 colours
/// (1 = best quality, 30 = fastest).
pub const QUANTIZE_SPEED: i32 = 10;

/// GIF delays are in hundredths of a second.
const FRAME_DELAY_CS: u16 = (FRAME_DELAY.as_millis() / 10) as u16;

/// Serializes frames into an infinitely looping GIF.
#[derive(Debug, Clone)]
pub struct AnimationEncoder {
    speed: i32,
}

impl AnimationEncoder {
    /// Create an encoder with the default quantization speed.
    pub fn new() -> Self {
        Self::with_speed(QUANTIZE_SPEED)
    }

    /// Create an encoder with a custom quantization speed, clamped to 1..=30.
    pub fn with_speed(speed: i32) -> Self {
        Self {
            speed: speed.clamp(1, 30),
        }
    }

    /// Write `frames` to `path`. Returns the size of the written file.
    ///
    /// The animation is written to a sibling `.part` file and renamed into
    /// place, so a failed encode never leaves a truncated output behind.
    #[instrument(name = "encode_to_file", skip(self, frames), fields(frames = frames.len()))]
    pub fn encode_to(&self, frames: &[Frame], path: &Path) -> EncoderResult<u64> {
        check_frames(frames)?;

        let partial = partial_path(path);
        let result = File::create(&partial)
            .map_err(EncoderError::from)
            .and_then(|file| {
                let counter = CountingWriter::new(BufWriter::new(file));
                let writer = self.encode_to_writer(frames, counter)?;
                let bytes = writer.count;
                writer.inner.into_inner().map_err(|e| e.into_error())?.sync_all()?;
                Ok(bytes)
            });

        match result {
            Ok(bytes) => {
                fs::rename(&partial, path)?;
                info!(path = %path.display(), bytes, "GIF written");
                Ok(bytes)
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&partial) {
                    if cleanup.kind() != io::ErrorKind::NotFound {
                        warn!("Failed to remove partial output: {}", cleanup);
                    }
                }
                Err(e)
            }
        }
    }

    /// Encode `frames` into `writer` and hand the writer back.
    pub fn encode_to_writer<W: Write>(&self, frames: &[Frame], writer: W) -> EncoderResult<W> {
        check_frames(frames)?;

        // Frames of differing sizes (after a re-selection) share a canvas
        // large enough for the biggest one.
        let canvas_width = frames.iter().map(|f| f.width).max().unwrap_or(0);
        let canvas_height = frames.iter().map(|f| f.height).max().unwrap_or(0);
        let (canvas_width, canvas_height) = gif_dimensions(canvas_width, canvas_height, 0)?;

        let mut encoder = gif::Encoder::new(writer, canvas_width, canvas_height, &[])?;
        encoder.set_repeat(gif::Repeat::Infinite)?;

        for frame in frames {
            let (width, height) = gif_dimensions(frame.width, frame.height, frame.sequence)?;
            let mut pixels = frame.data.to_vec();
            let mut gif_frame = gif::Frame::from_rgba_speed(width, height, &mut pixels, self.speed);
            gif_frame.delay = FRAME_DELAY_CS;
            encoder.write_frame(&gif_frame)?;
        }

        debug!(
            frames = frames.len(),
            width = canvas_width,
            height = canvas_height,
            "Encoded animation"
        );

        Ok(encoder.into_inner()?)
    }

    /// Encode `frames` into memory.
    pub fn encode_to_vec(&self, frames: &[Frame]) -> EncoderResult<Vec<u8>> {
        self.encode_to_writer(frames, Vec::new())
    }

    /// Size the encoded output would have.
    ///
    /// Runs the full encode against a byte counter, so the cost grows with
    /// frame count and area. Returns [`SizeEstimate::Unavailable`] for an
    /// empty slice or a failed encode.
    pub fn estimate_encoded_size(&self, frames: &[Frame]) -> SizeEstimate {
        if frames.is_empty() {
            return SizeEstimate::Unavailable;
        }

        match self.encode_to_writer(frames, CountingWriter::new(io::sink())) {
            Ok(counter) => SizeEstimate::Bytes(counter.count),
            Err(e) => {
                warn!("Size estimate failed: {}", e);
                SizeEstimate::Unavailable
            }
        }
    }
}

impl Default for AnimationEncoder {
    fn default() -> Self {
        Self::new()
    }
}

fn check_frames(frames: &[Frame]) -> EncoderResult<()> {
    if frames.is_empty() {
        return Err(EncoderError::EmptyBuffer);
    }
    if let Some(bad) = frames.iter().find(|f| !f.is_valid()) {
        return Err(EncoderError::InvalidFrame(bad.sequence));
    }
    Ok(())
}

fn gif_dimensions(width: u32, height: u32, sequence: u64) -> EncoderResult<(u16, u16)> {
    match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(EncoderError::FrameTooLarge {
            sequence,
            width,
            height,
        }),
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

/// Writer adapter that counts the bytes passing through.
struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.count += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const GREEN: [u8; 4] = [0, 255, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    /// A frame with a coloured left half and a black right half.
    fn split_frame(width: u32, height: u32, rgba: [u8; 4], sequence: u64) -> Frame {
        let mut data = Vec::new();
        for _ in 0..height {
            for x in 0..width {
                let px = if x < width / 2 { rgba } else { [0, 0, 0, 255] };
                data.extend_from_slice(&px);
            }
        }
        Frame::new(data, width, height, sequence).unwrap()
    }

    fn decode(bytes: &[u8]) -> (u16, u16, Vec<(u16, Vec<u8>)>) {
        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::RGBA);
        let mut decoder = options.read_info(bytes).unwrap();
        let (width, height) = (decoder.width(), decoder.height());

        let mut frames = Vec::new();
        while let Some(frame) = decoder.read_next_frame().unwrap() {
            frames.push((frame.delay, frame.buffer.to_vec()));
        }
        (width, height, frames)
    }

    #[test]
    fn test_round_trip_preserves_order_and_pixels() {
        let frames = vec![
            split_frame(12, 10, RED, 0),
            split_frame(12, 10, GREEN, 1),
            split_frame(12, 10, BLUE, 2),
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.gif");

        let written = AnimationEncoder::new().encode_to(&frames, &path).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(written, bytes.len() as u64);
        assert!(!partial_path(&path).exists());

        let (width, height, decoded) = decode(&bytes);
        assert_eq!((width, height), (12, 10));
        assert_eq!(decoded.len(), 3);
        for (original, (delay, pixels)) in frames.iter().zip(&decoded) {
            assert_eq!(*delay, 10);
            assert_eq!(pixels.as_slice(), original.data.as_ref());
        }
    }

    #[test]
    fn test_output_loops_forever() {
        let frames = vec![split_frame(4, 4, RED, 0)];
        let bytes = AnimationEncoder::new().encode_to_vec(&frames).unwrap();

        // NETSCAPE2.0 application extension with a loop count of zero.
        let marker = b"NETSCAPE2.0\x03\x01\x00\x00";
        assert!(bytes.windows(marker.len()).any(|w| w == marker));
    }

    #[test]
    fn test_empty_buffer_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.gif");

        let err = AnimationEncoder::new().encode_to(&[], &path).unwrap_err();
        assert!(matches!(err, EncoderError::EmptyBuffer));
        assert!(!path.exists());
    }

    #[test]
    fn test_estimate_matches_encoded_length() {
        let encoder = AnimationEncoder::new();
        let frames = vec![split_frame(16, 16, RED, 0), split_frame(16, 16, BLUE, 1)];

        let encoded = encoder.encode_to_vec(&frames).unwrap();
        assert_eq!(
            encoder.estimate_encoded_size(&frames),
            SizeEstimate::Bytes(encoded.len() as u64)
        );
    }

    #[test]
    fn test_estimate_of_nothing_is_unavailable() {
        assert_eq!(
            AnimationEncoder::new().estimate_encoded_size(&[]),
            SizeEstimate::Unavailable
        );
    }

    #[test]
    fn test_mixed_sizes_share_largest_canvas() {
        let frames = vec![split_frame(8, 6, RED, 0), split_frame(20, 4, GREEN, 1)];
        let bytes = AnimationEncoder::new().encode_to_vec(&frames).unwrap();

        let (width, height, decoded) = decode(&bytes);
        assert_eq!((width, height), (20, 6));
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let frame = Frame::solid(70_000, 1, RED, 4);

        let err = AnimationEncoder::new().encode_to_vec(&[frame]).unwrap_err();
        assert!(matches!(
            err,
            EncoderError::FrameTooLarge { width: 70_000, height: 1, .. }
        ));
    }

    #[test]
    fn test_failed_encode_leaves_no_file() {
        let bad = Frame {
            data: vec![0u8; 3].into(),
            width: 2,
            height: 2,
            sequence: 9,
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.gif");

        let err = AnimationEncoder::new().encode_to(&[bad], &path).unwrap_err();
        assert!(matches!(err, EncoderError::InvalidFrame(9)));
        assert!(!path.exists());
        assert!(!partial_path(&path).exists());
    }
}
