//! Recorder core for gifgrab.
//!
//! This crate ties region selection, capture and GIF encoding together
//! behind the [`Recorder`], which consumes host commands and reports back
//! through typed events.

mod compositor;
mod config;
mod error;
mod orchestrator;
mod recording;
mod selection;

pub use compositor::{DimmedOverlay, PreviewCompositor, DIM_FACTOR, OUTLINE_COLOR, OUTLINE_WIDTH};
pub use config::{ConfigError, RecorderConfig};
pub use error::{RecorderError, SelectionError};
pub use orchestrator::{Recorder, SavedRecording};
pub use recording::RecordingState;
pub use selection::{SelectionMachine, MIN_SELECTION_SIZE};

use std::sync::Arc;

use crossbeam_channel::Sender;

use gifgrab_capture::FrameSource;
use gifgrab_ipc::RecorderEvent;

/// Result type for selection operations.
pub type SelectionResult<T> = Result<T, SelectionError>;

/// Result type for recorder operations.
pub type RecorderResult<T> = Result<T, RecorderError>;

/// Create a recorder that reports to `event_tx`.
pub fn create_recorder(
    source: Arc<dyn FrameSource>,
    config: RecorderConfig,
    event_tx: Sender<RecorderEvent>,
) -> Recorder {
    Recorder::new(source, config, event_tx)
}
