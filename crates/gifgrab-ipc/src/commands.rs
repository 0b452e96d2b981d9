//! Commands sent from the host to the recorder.

use serde::{Deserialize, Serialize};

/// Commands that the host UI can send to the recorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecorderCommand {
    /// Grab the full screen and open a selection session over it.
    BeginSelection,

    /// Pointer pressed on the selection background.
    PointerPress { x: i32, y: i32 },

    /// Pointer moved while pressed.
    PointerDrag { x: i32, y: i32 },

    /// Pointer released; commits or rejects the selection.
    PointerRelease { x: i32, y: i32 },

    /// Abandon an open selection session.
    CancelSelection,

    /// Start or stop appending captured frames to the buffer.
    ToggleRecord,

    /// Encode the buffered frames to the named file.
    Save { filename: String },

    /// Drop all buffered frames without saving.
    ResetRecording,

    /// Set the capture rate cap from raw user input (e.g. "15", "", "abc").
    SetDesiredFps(String),

    /// Recompute the encoded size estimate.
    EstimateSize,

    /// Request the current recorder state.
    GetState,

    /// Stop capture and shut the recorder down.
    Close,
}
