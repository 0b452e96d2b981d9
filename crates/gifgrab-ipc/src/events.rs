//! Events sent from the recorder to the host.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::state::RecorderState;
use crate::types::{Frame, Rectangle, RecordingStatus, SizeEstimate};

/// Events that the recorder can send to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RecorderEvent {
    /// Recorder state has changed.
    StateChanged {
        /// Previous state.
        previous: Box<RecorderState>,

        /// Current state.
        current: Box<RecorderState>,
    },

    /// A selection session opened; the host should present the background
    /// full-screen.
    SelectionStarted {
        /// The full-screen background snapshot.
        background: Frame,
    },

    /// Dimmed selection preview for the current drag.
    SelectionPreview(Frame),

    /// A rectangle passed validation and capture started on it.
    SelectionCommitted(Rectangle),

    /// The selection was discarded.
    SelectionRejected {
        /// Human readable reason.
        reason: String,
    },

    /// Latest captured frame of the region, for display.
    FrameCaptured(Frame),

    /// Frame count, elapsed time and throughput.
    Status(RecordingStatus),

    /// Updated estimate of the encoded output size.
    SizeEstimate(SizeEstimate),

    /// Buffered frames were written to disk.
    Saved {
        /// Destination file.
        path: PathBuf,

        /// Number of frames written.
        frames: usize,

        /// Size of the written file in bytes.
        bytes: u64,
    },

    /// Error occurred.
    Error {
        /// Whether the error is recoverable.
        recoverable: bool,

        /// Error message.
        message: String,
    },

    /// Recorder is ready for commands.
    Ready,

    /// Recorder has shut down.
    Shutdown,
}
