//! Rate-limited capture loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info, instrument, trace, warn};

use gifgrab_ipc::Rectangle;

use crate::buffer::SharedFrameBuffer;
use crate::error::CaptureError;
use crate::fps::DesiredFps;
use crate::update::{CaptureUpdate, UpdateSender};
use crate::{CaptureResult, FrameSource};

/// Interval between periodic capture statistics log lines.
const STATS_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Description of the capture session currently owned by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureSession {
    /// Region being captured.
    pub rectangle: Rectangle,

    /// False once the worker has exited (after a source failure).
    pub running: bool,

    /// Desired rate at the time of the query.
    pub desired_fps: f64,
}

/// Handle to a spawned capture worker.
struct ActiveLoop {
    rectangle: Rectangle,
    stop_tx: Sender<()>,
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Owns the capture worker thread. At most one worker is alive at a time.
pub struct CaptureScheduler {
    source: Arc<dyn FrameSource>,
    buffer: SharedFrameBuffer,
    desired_fps: DesiredFps,
    updates: UpdateSender,
    recording: Arc<AtomicBool>,
    active: Option<ActiveLoop>,
}

impl CaptureScheduler {
    /// Create a scheduler. Nothing is captured until [`start`](Self::start).
    pub fn new(
        source: Arc<dyn FrameSource>,
        buffer: SharedFrameBuffer,
        desired_fps: DesiredFps,
        updates: UpdateSender,
    ) -> Self {
        Self {
            source,
            buffer,
            desired_fps,
            updates,
            recording: Arc::new(AtomicBool::new(false)),
            active: None,
        }
    }

    /// Start capturing `rectangle`, replacing any running worker.
    ///
    /// The previous worker is stopped and joined before the new one is
    /// spawned, so two workers never append to the buffer concurrently.
    #[instrument(name = "capture_start", skip(self), fields(region = %rectangle))]
    pub fn start(&mut self, rectangle: Rectangle, desired_fps: f64) -> CaptureResult<()> {
        self.stop();

        let fps = self.desired_fps.set(desired_fps);
        info!(fps, source = self.source.name(), "Starting capture");

        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let running = Arc::new(AtomicBool::new(true));

        let worker = CaptureWorker {
            source: Arc::clone(&self.source),
            rectangle,
            buffer: Arc::clone(&self.buffer),
            recording: Arc::clone(&self.recording),
            desired_fps: self.desired_fps.clone(),
            updates: self.updates.clone(),
            stop_rx,
            running: Arc::clone(&running),
        };

        let handle = thread::Builder::new()
            .name("gifgrab-capture".to_string())
            .spawn(move || worker.run())
            .map_err(CaptureError::Spawn)?;

        self.active = Some(ActiveLoop {
            rectangle,
            stop_tx,
            running,
            handle,
        });

        Ok(())
    }

    /// Stop the worker and wait for it to exit. Safe to call repeatedly.
    #[instrument(name = "capture_stop", skip(self))]
    pub fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        let ActiveLoop {
            rectangle,
            stop_tx,
            handle,
            ..
        } = active;

        // Disconnecting the stop channel wakes the worker out of its sleep.
        drop(stop_tx);

        if handle.join().is_err() {
            error!("Capture thread panicked");
        }

        info!(region = %rectangle, "Capture stopped");
    }

    /// Toggle whether captured frames are appended to the buffer.
    ///
    /// The flag flips under the buffer lock, so once this returns `false`
    /// the worker appends nothing more and the buffer can be read.
    pub fn set_recording(&self, recording: bool) {
        let _buffer = self.buffer.lock();
        self.recording.store(recording, Ordering::SeqCst);
        debug!(recording, "Recording flag set");
    }

    /// Returns true if captured frames are being appended to the buffer.
    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    /// Returns true if a worker is alive and capturing.
    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.running.load(Ordering::SeqCst))
    }

    /// The current capture session, if any.
    pub fn session(&self) -> Option<CaptureSession> {
        self.active.as_ref().map(|active| CaptureSession {
            rectangle: active.rectangle,
            running: active.running.load(Ordering::SeqCst),
            desired_fps: self.desired_fps.get(),
        })
    }

    /// The shared desired-rate cell read by the worker.
    pub fn desired_fps(&self) -> &DesiredFps {
        &self.desired_fps
    }

    /// The frame buffer the worker appends to.
    pub fn buffer(&self) -> &SharedFrameBuffer {
        &self.buffer
    }
}

impl Drop for CaptureScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State moved onto the capture thread.
struct CaptureWorker {
    source: Arc<dyn FrameSource>,
    rectangle: Rectangle,
    buffer: SharedFrameBuffer,
    recording: Arc<AtomicBool>,
    desired_fps: DesiredFps,
    updates: UpdateSender,
    stop_rx: Receiver<()>,
    running: Arc<AtomicBool>,
}

/// Clears the running flag when the worker exits, including by unwinding.
/// A panicking worker also sends a failure notice so the host leaves the
/// capture phase.
struct RunningGuard {
    running: Arc<AtomicBool>,
    updates: UpdateSender,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("Capture loop panicked");
            let _ = self
                .updates
                .push_failure("capture thread panicked".to_string());
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

impl CaptureWorker {
    fn run(self) {
        debug!(region = %self.rectangle, "Capture loop starting");
        let _guard = RunningGuard {
            running: Arc::clone(&self.running),
            updates: self.updates.clone(),
        };

        let start_time = Instant::now();
        let mut last_log_time = Instant::now();
        let mut sequence: u64 = 0;

        loop {
            let frame_start = Instant::now();

            match self.capture_once(sequence) {
                Ok(()) => sequence += 1,
                Err(CaptureError::ChannelDisconnected) => {
                    info!("Update channel disconnected, stopping capture");
                    break;
                }
                Err(e) => {
                    warn!("Capture failed, ending session: {}", e);
                    if self.updates.push_failure(e.to_string()).is_err() {
                        debug!("Consumer gone before failure notice");
                    }
                    break;
                }
            }

            let elapsed = frame_start.elapsed();
            if elapsed > Duration::ZERO {
                let fps = 1.0 / elapsed.as_secs_f64();
                if self.updates.push(CaptureUpdate::ThroughputSample(fps)).is_err() {
                    info!("Update channel disconnected, stopping capture");
                    break;
                }
            }

            if last_log_time.elapsed() >= STATS_LOG_INTERVAL {
                info!(
                    "Capture stats: frames={}, dropped_updates={}, uptime={:.1}s",
                    sequence,
                    self.updates.dropped(),
                    start_time.elapsed().as_secs_f32()
                );
                last_log_time = Instant::now();
            }

            // Sleep off the rest of the frame interval. The wait doubles as
            // the cancellation check, so stop() never waits longer than one
            // interval.
            let budget = self.desired_fps.frame_interval().saturating_sub(elapsed);
            match self.stop_rx.recv_timeout(budget) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        info!(frames = sequence, "Capture loop stopped");
    }

    /// Grab one frame, retain it if recording, and hand it to the display.
    fn capture_once(&self, sequence: u64) -> CaptureResult<()> {
        let mut frame = self.source.grab(self.rectangle)?;
        if !frame.is_valid() {
            return Err(CaptureError::SourceFailure(format!(
                "frame #{sequence} does not match its {}x{} dimensions",
                frame.width, frame.height
            )));
        }
        frame.sequence = sequence;

        trace!(sequence, "Captured frame");

        let recorded = {
            let mut buffer = self.buffer.lock();
            self.recording
                .load(Ordering::SeqCst)
                .then(|| buffer.append(frame.clone()))
        };
        if let Some(recorded) = recorded {
            self.updates.push(CaptureUpdate::FrameCountChanged(recorded))?;
        }

        self.updates.push(CaptureUpdate::FrameReady(frame))
    }
}
