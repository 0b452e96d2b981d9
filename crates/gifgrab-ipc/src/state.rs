//! Recorder state machine types.

use serde::{Deserialize, Serialize};

use crate::types::Rectangle;

/// The current state of the capture session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum RecorderState {
    /// No region committed; nothing is being captured.
    #[default]
    Idle,

    /// The region is captured and shown live, frames are not retained.
    Previewing {
        /// Region being captured.
        rectangle: Rectangle,
    },

    /// The region is captured and every frame is retained for the output.
    Recording {
        /// Region being captured.
        rectangle: Rectangle,
    },
}

impl RecorderState {
    /// Returns true if no capture session exists.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Returns true if a capture session exists but frames are not retained.
    pub fn is_previewing(&self) -> bool {
        matches!(self, Self::Previewing { .. })
    }

    /// Returns true if frames are being retained.
    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    /// The captured region, if a session exists.
    pub fn rectangle(&self) -> Option<Rectangle> {
        match self {
            Self::Idle => None,
            Self::Previewing { rectangle } | Self::Recording { rectangle } => Some(*rectangle),
        }
    }

    /// Returns a simple string representation of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Previewing { .. } => "Previewing",
            Self::Recording { .. } => "Recording",
        }
    }
}

/// Phases of the region selection state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionPhase {
    /// No selection in progress.
    #[default]
    Closed,

    /// Background shown, waiting for the pointer to go down.
    AwaitingPress,

    /// Pointer held down, preview follows the pointer.
    Dragging,

    /// A valid rectangle was produced; transient before returning to Closed.
    Committed,
}

impl SelectionPhase {
    /// Returns true while a selection session holds the background snapshot.
    pub fn is_open(self) -> bool {
        matches!(self, Self::AwaitingPress | Self::Dragging)
    }

    /// Returns the display name for this phase.
    pub fn name(self) -> &'static str {
        match self {
            Self::Closed => "Closed",
            Self::AwaitingPress => "Awaiting press",
            Self::Dragging => "Dragging",
            Self::Committed => "Committed",
        }
    }
}

/// Reason a capture session ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CaptureEndReason {
    /// A new region was committed.
    Replaced,

    /// The host closed the recorder.
    Closed,

    /// The frame source failed; the region must be selected again.
    SourceFailure { message: String },
}

impl CaptureEndReason {
    /// Returns a display message for this reason.
    pub fn message(&self) -> String {
        match self {
            Self::Replaced => "Capture replaced by a new selection".to_string(),
            Self::Closed => "Capture stopped by user".to_string(),
            Self::SourceFailure { message } => format!("Capture failed: {message}"),
        }
    }
}
