//! Typed host<->recorder messages for gifgrab.
//!
//! This crate defines the message types exchanged between a host UI and the
//! recorder core, plus the frame and geometry types every other crate shares.

mod commands;
mod events;
mod state;
mod types;

pub use commands::RecorderCommand;
pub use events::RecorderEvent;
pub use state::{CaptureEndReason, RecorderState, SelectionPhase};
pub use types::{
    format_elapsed, Frame, FrameError, Point, Rectangle, RecordingStatus, SizeEstimate,
};

use crossbeam_channel::{Receiver, Sender};

/// Channel capacity for commands (host → recorder).
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Channel capacity for events (recorder → host).
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Creates a bounded command channel.
pub fn command_channel() -> (Sender<RecorderCommand>, Receiver<RecorderCommand>) {
    crossbeam_channel::bounded(COMMAND_CHANNEL_CAPACITY)
}

/// Creates a bounded event channel.
pub fn event_channel() -> (Sender<RecorderEvent>, Receiver<RecorderEvent>) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY)
}
