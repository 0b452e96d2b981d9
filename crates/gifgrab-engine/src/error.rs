//! Recorder error types.

use thiserror::Error;

use gifgrab_capture::CaptureError;
use gifgrab_encoder::EncoderError;
use gifgrab_ipc::SelectionPhase;

/// Errors from the region selection state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// A selection session is already open.
    #[error("A selection is already in progress")]
    Busy,

    /// The released rectangle is below the minimum size.
    #[error("Selection too small: {width}x{height} (minimum {min}x{min})")]
    TooSmall { width: u32, height: u32, min: u32 },

    /// The pointer event does not apply to the current phase.
    #[error("Cannot handle {event} while selection is {phase:?}")]
    InvalidPhase {
        event: &'static str,
        phase: SelectionPhase,
    },
}

/// Errors surfaced by recorder operations.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// The screen snapshot for a new selection failed. Any running capture
    /// is unaffected.
    #[error("Failed to grab the screen: {0}")]
    ScreenGrab(#[source] CaptureError),

    /// Recording was requested without a live capture session.
    #[error("No capture region selected")]
    NoCaptureSession,

    /// Saving is refused while frames are still being appended.
    #[error("Stop recording before saving")]
    RecordingInProgress,

    /// Save was requested with nothing buffered.
    #[error("Nothing recorded to save")]
    EmptyBuffer,

    /// The GIF could not be written. Buffered frames are kept.
    #[error("Failed to save GIF: {0}")]
    Encode(#[source] EncoderError),
}

impl From<EncoderError> for RecorderError {
    fn from(e: EncoderError) -> Self {
        match e {
            EncoderError::EmptyBuffer => Self::EmptyBuffer,
            other => Self::Encode(other),
        }
    }
}

impl RecorderError {
    /// False when the capture session is gone and the user must select a
    /// region again.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Capture(_))
    }
}
