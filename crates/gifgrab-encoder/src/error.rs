//! Error types for the encoder module.

use thiserror::Error;

/// Errors that can occur during encoding operations.
#[derive(Debug, Error)]
pub enum EncoderError {
    /// Nothing was recorded.
    #[error("No frames to encode")]
    EmptyBuffer,

    /// GIF dimensions are limited to 16 bits.
    #[error("Frame #{sequence} is {width}x{height}, larger than a GIF can hold")]
    FrameTooLarge {
        sequence: u64,
        width: u32,
        height: u32,
    },

    /// Pixel data does not match the frame dimensions.
    #[error("Frame #{0} pixel data does not match its dimensions")]
    InvalidFrame(u64),

    /// GIF encoder error.
    #[error("GIF encoding error: {0}")]
    Gif(#[from] gif::EncodingError),

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
