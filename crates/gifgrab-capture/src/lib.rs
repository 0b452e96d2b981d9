//! Region capture for gifgrab.
//!
//! This crate owns the background capture worker: it repeatedly grabs the
//! committed region from a [`FrameSource`] at a bounded rate, retains frames
//! in a [`FrameBuffer`] while recording, and reports every result to the
//! display consumer over the update channel.

mod buffer;
mod error;
mod fps;
mod pattern;
mod scheduler;
mod update;

pub use buffer::{FrameBuffer, SharedFrameBuffer};
pub use error::CaptureError;
pub use fps::{DesiredFps, DEFAULT_FPS};
pub use pattern::PatternSource;
pub use scheduler::{CaptureScheduler, CaptureSession};
pub use update::{update_channel, CaptureUpdate, UpdateSender, UPDATE_CHANNEL_CAPACITY};

use gifgrab_ipc::{Frame, Rectangle};

/// Result type for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Trait for platform pixel sources.
///
/// Implementations are called from the capture worker thread and from the
/// host thread (for the selection background), so they must be shareable.
pub trait FrameSource: Send + Sync {
    /// Synchronously grab one RGBA frame of `region`.
    fn grab(&self, region: Rectangle) -> CaptureResult<Frame>;

    /// Grab the whole screen, used as the selection background.
    fn grab_screen(&self) -> CaptureResult<Frame>;

    /// Source name for diagnostics.
    fn name(&self) -> &'static str {
        "frame source"
    }
}
