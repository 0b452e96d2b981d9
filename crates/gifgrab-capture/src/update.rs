//! Capture worker → display consumer channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, TrySendError};
use tracing::{debug, warn};

use gifgrab_ipc::Frame;

use crate::error::CaptureError;
use crate::CaptureResult;

/// Default capacity of the update channel.
pub const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// How long the worker waits to deliver its terminal failure notice.
const FAILURE_SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Messages from the capture worker, in capture order.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureUpdate {
    /// A new frame of the region, for display.
    FrameReady(Frame),

    /// Frames recorded since the last clear.
    FrameCountChanged(u64),

    /// Instantaneous capture rate of the last iteration.
    ThroughputSample(f64),

    /// The frame source failed and the worker has exited.
    Failed { message: String },
}

/// Producer half of the update channel.
///
/// Regular updates never block the worker: when the consumer falls behind
/// they are dropped, and later updates of the same kind supersede them. The
/// failure notice is the last message the worker sends and waits briefly
/// for room instead.
#[derive(Debug, Clone)]
pub struct UpdateSender {
    tx: Sender<CaptureUpdate>,
    dropped: Arc<AtomicU64>,
}

impl UpdateSender {
    /// Queue an update. Fails only if the consumer is gone.
    pub fn push(&self, update: CaptureUpdate) -> CaptureResult<()> {
        match self.tx.try_send(update) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(update)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(dropped, kind = update.kind(), "Update channel full, dropping update");
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(CaptureError::ChannelDisconnected),
        }
    }

    /// Deliver the terminal failure notice.
    pub fn push_failure(&self, message: String) -> CaptureResult<()> {
        match self
            .tx
            .send_timeout(CaptureUpdate::Failed { message }, FAILURE_SEND_TIMEOUT)
        {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => {
                warn!("Update channel stayed full, failure notice lost");
                Ok(())
            }
            Err(SendTimeoutError::Disconnected(_)) => Err(CaptureError::ChannelDisconnected),
        }
    }

    /// Updates dropped because the channel was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl CaptureUpdate {
    fn kind(&self) -> &'static str {
        match self {
            Self::FrameReady(_) => "frame",
            Self::FrameCountChanged(_) => "frame_count",
            Self::ThroughputSample(_) => "throughput",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Creates a bounded update channel.
pub fn update_channel(capacity: usize) -> (UpdateSender, Receiver<CaptureUpdate>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    (
        UpdateSender {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        rx,
    )
}
