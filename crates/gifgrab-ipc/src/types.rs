//! Common types used across IPC messages.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A pointer position in screen pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A screen region in pixels.
///
/// Always normalized so that `left <= right` and `top <= bottom`. The right
/// and bottom edges are exclusive: a rectangle spans `right - left` columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rectangle {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rectangle {
    /// Build a normalized rectangle spanning two arbitrary corners.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            right: a.x.max(b.x),
            bottom: a.y.max(b.y),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.right.abs_diff(self.left)
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.bottom.abs_diff(self.top)
    }

    /// Returns true if both sides are at least `min` pixels long.
    pub fn meets_minimum(&self, min: u32) -> bool {
        self.width() >= min && self.height() >= min
    }

    /// Returns true if the pixel at (x, y) lies inside the rectangle.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}) {}x{}",
            self.left,
            self.top,
            self.right,
            self.bottom,
            self.width(),
            self.height()
        )
    }
}

/// Frame construction errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Pixel buffer does not match the declared dimensions.
    #[error("pixel buffer is {actual} bytes, {width}x{height} RGBA needs {expected}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// An immutable RGBA8 raster.
///
/// Pixel storage is reference counted, so cloning a frame to hand it to both
/// the display and the frame buffer does not copy pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// RGBA pixel data, row-major, no padding.
    pub data: Bytes,

    /// Frame width in pixels.
    pub width: u32,

    /// Frame height in pixels.
    pub height: u32,

    /// Monotonically increasing capture sequence number.
    pub sequence: u64,
}

impl Frame {
    /// Bytes per pixel in the fixed RGBA layout.
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Create a frame, checking the buffer against the dimensions.
    pub fn new(
        data: impl Into<Bytes>,
        width: u32,
        height: u32,
        sequence: u64,
    ) -> Result<Self, FrameError> {
        let data = data.into();
        let expected = Self::rgba_buffer_size(width, height);
        if data.len() != expected {
            return Err(FrameError::SizeMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            data,
            width,
            height,
            sequence,
        })
    }

    /// A frame filled with a single colour.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4], sequence: u64) -> Self {
        let pixels = Self::rgba_buffer_size(width, height) / Self::BYTES_PER_PIXEL;
        let data: Vec<u8> = std::iter::repeat(rgba).take(pixels).flatten().collect();
        Self {
            data: Bytes::from(data),
            width,
            height,
            sequence,
        }
    }

    /// Calculate the RGBA buffer size for given dimensions.
    pub fn rgba_buffer_size(width: u32, height: u32) -> usize {
        width as usize * height as usize * Self::BYTES_PER_PIXEL
    }

    /// Validate that the frame data matches its dimensions.
    pub fn is_valid(&self) -> bool {
        self.data.len() == Self::rgba_buffer_size(self.width, self.height)
    }

    /// The RGBA value at (x, y), if inside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * Self::BYTES_PER_PIXEL;
        let px = self.data.get(offset..offset + Self::BYTES_PER_PIXEL)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Estimated size of the encoded output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeEstimate {
    /// Nothing to encode, or the trial encode failed.
    #[default]
    Unavailable,

    /// Encoded size in bytes.
    Bytes(u64),
}

impl SizeEstimate {
    /// The byte count, if available.
    pub fn bytes(&self) -> Option<u64> {
        match self {
            Self::Unavailable => None,
            Self::Bytes(n) => Some(*n),
        }
    }
}

impl fmt::Display for SizeEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const KB: u64 = 1024;
        const MB: u64 = 1024 * 1024;

        match *self {
            Self::Unavailable => f.write_str("N/A"),
            Self::Bytes(n) if n < KB => write!(f, "{n} bytes"),
            Self::Bytes(n) if n < MB => write!(f, "{:.2} KB", n as f64 / KB as f64),
            Self::Bytes(n) => write!(f, "{:.2} MB", n as f64 / MB as f64),
        }
    }
}

/// Snapshot of the capture statistics shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordingStatus {
    /// Frames retained since the last save or reset.
    pub frame_count: u64,

    /// Seconds since recording started, zero when not recording.
    pub elapsed_secs: u64,

    /// Capture throughput, capped at the desired rate.
    pub fps: f64,

    /// Desired capture rate.
    pub desired_fps: f64,
}

impl RecordingStatus {
    /// Elapsed recording time as `MM:SS`.
    pub fn elapsed_text(&self) -> String {
        format_elapsed(self.elapsed_secs)
    }
}

/// Format seconds as `MM:SS`. Minutes keep counting past an hour.
pub fn format_elapsed(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
