//! Error types for the capture module.

use thiserror::Error;

use gifgrab_ipc::{FrameError, Rectangle};

/// Errors that can occur during capture operations.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The frame source could not produce a frame.
    #[error("Frame source failure: {0}")]
    SourceFailure(String),

    /// The requested region is not on the screen.
    #[error("Region {0} lies outside the screen")]
    OutOfBounds(Rectangle),

    /// The frame source produced a malformed frame.
    #[error("Invalid frame: {0}")]
    InvalidFrame(#[from] FrameError),

    /// The capture thread could not be spawned.
    #[error("Failed to spawn capture thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Channel send error.
    #[error("Failed to send update: channel disconnected")]
    ChannelDisconnected,
}
