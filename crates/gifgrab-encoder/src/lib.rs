//! Animated GIF encoding for gifgrab.
//!
//! Recorded frames are written with a fixed 100 ms delay and an infinite
//! loop count. The same encoder runs against a byte counter to estimate the
//! output size without touching the disk.

mod animation;
mod error;
mod filename;

pub use animation::{AnimationEncoder, FRAME_DELAY, QUANTIZE_SPEED};
pub use error::EncoderError;
pub use filename::{normalize_filename, DEFAULT_FILENAME};

/// Result type for encoder operations.
pub type EncoderResult<T> = Result<T, EncoderError>;
