//! Recorder orchestrator.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info, instrument, trace, warn};

use gifgrab_capture::{
    update_channel, CaptureError, CaptureScheduler, CaptureUpdate, DesiredFps, FrameBuffer,
    FrameSource, SharedFrameBuffer,
};
use gifgrab_encoder::{normalize_filename, AnimationEncoder};
use gifgrab_ipc::{
    CaptureEndReason, Frame, Point, RecorderCommand, RecorderEvent, RecorderState,
    RecordingStatus, Rectangle, SelectionPhase, SizeEstimate,
};

use crate::config::RecorderConfig;
use crate::error::{RecorderError, SelectionError};
use crate::recording::RecordingState;
use crate::selection::SelectionMachine;
use crate::RecorderResult;

/// A completed save.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRecording {
    /// Destination file.
    pub path: PathBuf,

    /// Frames written.
    pub frames: usize,

    /// File size in bytes.
    pub bytes: u64,
}

/// Owns the selection, capture and save pipeline and drives it from host
/// commands.
pub struct Recorder {
    config: RecorderConfig,
    source: Arc<dyn FrameSource>,
    event_tx: Sender<RecorderEvent>,
    state: RecorderState,
    selection: SelectionMachine,
    scheduler: CaptureScheduler,
    updates_rx: Receiver<CaptureUpdate>,
    buffer: SharedFrameBuffer,
    encoder: AnimationEncoder,
    recording: RecordingState,
    preview: Option<Frame>,
    estimate: SizeEstimate,
    last_status: Option<RecordingStatus>,
}

impl Recorder {
    /// Create a recorder reading pixels from `source`.
    pub fn new(
        source: Arc<dyn FrameSource>,
        config: RecorderConfig,
        event_tx: Sender<RecorderEvent>,
    ) -> Self {
        let buffer = FrameBuffer::shared(config.buffer_capacity());
        let desired_fps = DesiredFps::with_fallback(config.default_fps, config.default_fps);
        let (updates, updates_rx) = update_channel(config.update_channel_capacity);
        let scheduler = CaptureScheduler::new(
            Arc::clone(&source),
            Arc::clone(&buffer),
            desired_fps,
            updates,
        );

        Self {
            config,
            source,
            event_tx,
            state: RecorderState::Idle,
            selection: SelectionMachine::new(),
            scheduler,
            updates_rx,
            buffer,
            encoder: AnimationEncoder::new(),
            recording: RecordingState::new(),
            preview: None,
            estimate: SizeEstimate::Unavailable,
            last_status: None,
        }
    }

    /// Process commands until `Close` or until the command channel
    /// disconnects (blocking). Capture updates are drained every poll
    /// interval.
    #[instrument(name = "recorder_run", skip_all)]
    pub fn run(&mut self, command_rx: Receiver<RecorderCommand>) {
        info!(source = self.source.name(), "Recorder starting");
        self.send_event(RecorderEvent::Ready);

        let poll_interval = self.config.poll_interval();
        let mut last_poll = Instant::now();

        loop {
            match command_rx.recv_timeout(poll_interval) {
                Ok(command) => {
                    if !self.handle_command(command) {
                        break;
                    }
                    // Keep the display cadence under a steady stream of
                    // pointer events.
                    if last_poll.elapsed() >= poll_interval {
                        self.poll();
                        last_poll = Instant::now();
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    self.poll();
                    last_poll = Instant::now();
                }
                Err(RecvTimeoutError::Disconnected) => {
                    info!("Command channel disconnected, shutting down");
                    self.shutdown();
                    break;
                }
            }
        }

        info!("Recorder stopped");
    }

    /// Handle a command. Returns false if the recorder should stop.
    ///
    /// Failures are reported to the host as events.
    pub fn handle_command(&mut self, command: RecorderCommand) -> bool {
        trace!(?command, "Handling command");

        let result = match command {
            RecorderCommand::BeginSelection => self.begin_selection(),
            RecorderCommand::PointerPress { x, y } => self.pointer_press(Point::new(x, y)),
            RecorderCommand::PointerDrag { x, y } => self.pointer_drag(Point::new(x, y)),
            RecorderCommand::PointerRelease { x, y } => {
                self.pointer_release(Point::new(x, y)).map(|_| ())
            }
            RecorderCommand::CancelSelection => {
                self.cancel_selection();
                Ok(())
            }
            RecorderCommand::ToggleRecord => self.toggle_record().map(|_| ()),
            RecorderCommand::Save { filename } => self.save(&filename).map(|_| ()),
            RecorderCommand::ResetRecording => {
                self.reset_recording();
                Ok(())
            }
            RecorderCommand::SetDesiredFps(input) => {
                self.set_desired_fps(&input);
                Ok(())
            }
            RecorderCommand::EstimateSize => {
                self.refresh_estimate();
                Ok(())
            }
            RecorderCommand::GetState => {
                self.send_state();
                Ok(())
            }
            RecorderCommand::Close => {
                self.shutdown();
                return false;
            }
        };

        if let Err(e) = result {
            self.report_error(e);
        }

        true
    }

    /// Grab the screen and open a selection over it.
    #[instrument(name = "begin_selection", skip(self))]
    pub fn begin_selection(&mut self) -> RecorderResult<()> {
        if self.selection.phase().is_open() {
            return Err(SelectionError::Busy.into());
        }

        let background = self
            .source
            .grab_screen()
            .and_then(|frame| {
                if frame.width == 0 || frame.height == 0 || !frame.is_valid() {
                    return Err(CaptureError::SourceFailure(format!(
                        "screen snapshot is not a usable {}x{} frame",
                        frame.width, frame.height
                    )));
                }
                Ok(frame)
            })
            .map_err(RecorderError::ScreenGrab)?;
        self.selection.begin(background.clone())?;

        info!(
            width = background.width,
            height = background.height,
            "Selection started"
        );
        self.send_event(RecorderEvent::SelectionStarted { background });
        Ok(())
    }

    pub fn pointer_press(&mut self, point: Point) -> RecorderResult<()> {
        self.selection.press(point)?;
        Ok(())
    }

    /// Update the drag and emit a preview when the rectangle changed.
    pub fn pointer_drag(&mut self, point: Point) -> RecorderResult<()> {
        if let Some(preview) = self.selection.drag(point)? {
            self.send_event(RecorderEvent::SelectionPreview(preview));
        }
        Ok(())
    }

    /// Finish the selection and start capturing the committed rectangle.
    pub fn pointer_release(&mut self, point: Point) -> RecorderResult<Rectangle> {
        let rectangle = self.selection.release(point)?;
        self.start_capture(rectangle)?;
        Ok(rectangle)
    }

    /// Abandon an open selection. The running capture is untouched.
    pub fn cancel_selection(&mut self) {
        if self.selection.cancel() {
            self.send_event(RecorderEvent::SelectionRejected {
                reason: "Selection cancelled".to_string(),
            });
        }
    }

    /// Start or stop appending frames. Returns true if now recording.
    #[instrument(name = "toggle_record", skip(self))]
    pub fn toggle_record(&mut self) -> RecorderResult<bool> {
        let rectangle = self
            .state
            .rectangle()
            .ok_or(RecorderError::NoCaptureSession)?;

        if self.state.is_recording() {
            self.scheduler.set_recording(false);
            self.recording.stop();
            self.sync_frame_count();
            info!(frames = self.recording.frame_count(), "Recording stopped");
            self.transition_to(RecorderState::Previewing { rectangle });
        } else {
            if !self.scheduler.is_running() {
                return Err(RecorderError::NoCaptureSession);
            }
            self.recording.start();
            self.scheduler.set_recording(true);
            info!(region = %rectangle, "Recording started");
            self.transition_to(RecorderState::Recording { rectangle });
        }

        self.refresh_estimate();
        self.emit_status();
        Ok(self.state.is_recording())
    }

    /// Encode the buffered frames to `filename` and clear the buffer.
    ///
    /// On failure the buffer is kept so the save can be retried.
    #[instrument(name = "save", skip(self))]
    pub fn save(&mut self, filename: &str) -> RecorderResult<SavedRecording> {
        if self.state.is_recording() {
            return Err(RecorderError::RecordingInProgress);
        }

        let frames = self.buffer.lock().snapshot();
        if frames.is_empty() {
            return Err(RecorderError::EmptyBuffer);
        }

        let path = self
            .config
            .resolve_output(normalize_filename(filename, &self.config.default_filename));
        let bytes = self.encoder.encode_to(&frames, &path)?;

        self.buffer.lock().clear();
        self.recording.reset();
        self.estimate = SizeEstimate::Unavailable;

        let saved = SavedRecording {
            path,
            frames: frames.len(),
            bytes,
        };
        info!(
            path = %saved.path.display(),
            frames = saved.frames,
            bytes,
            "Recording saved"
        );

        self.send_event(RecorderEvent::Saved {
            path: saved.path.clone(),
            frames: saved.frames,
            bytes,
        });
        self.send_event(RecorderEvent::SizeEstimate(SizeEstimate::Unavailable));
        self.emit_status();
        Ok(saved)
    }

    /// Drop all buffered frames without saving.
    pub fn reset_recording(&mut self) {
        let dropped = {
            let mut buffer = self.buffer.lock();
            let len = buffer.len();
            buffer.clear();
            len
        };
        self.recording.reset();
        if self.state.is_recording() {
            self.recording.start();
        }
        self.sync_frame_count();
        self.estimate = SizeEstimate::Unavailable;

        info!(dropped, "Recording reset");
        self.send_event(RecorderEvent::SizeEstimate(SizeEstimate::Unavailable));
        self.emit_status();
    }

    /// Apply raw rate input. Empty or invalid input selects the default.
    pub fn set_desired_fps(&mut self, input: &str) -> f64 {
        let applied = self.scheduler.desired_fps().set_from_input(input);
        info!(input, applied, "Desired FPS set");
        self.emit_status();
        applied
    }

    /// Recompute and emit the encoded size estimate.
    ///
    /// Encodes a snapshot of the buffer outside the buffer lock.
    pub fn refresh_estimate(&mut self) -> SizeEstimate {
        let frames = self.buffer.lock().snapshot();
        let started = Instant::now();
        let estimate = self.encoder.estimate_encoded_size(&frames);
        debug!(
            frames = frames.len(),
            %estimate,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Size estimate refreshed"
        );

        self.estimate = estimate;
        self.send_event(RecorderEvent::SizeEstimate(estimate));
        estimate
    }

    /// Drain pending capture updates in order and publish the result.
    pub fn poll(&mut self) {
        let mut latest = None;
        let mut failure = None;
        let mut count_changed = false;

        for update in self.updates_rx.try_iter() {
            match update {
                CaptureUpdate::FrameReady(frame) => latest = Some(frame),
                CaptureUpdate::FrameCountChanged(count) => {
                    trace!(count, "Frame count update");
                    count_changed = true;
                }
                CaptureUpdate::ThroughputSample(fps) => self.recording.record_throughput(fps),
                CaptureUpdate::Failed { message } => failure = Some(message),
            }
        }

        // The queued count may predate a reset, so the buffer total is used
        // instead. Counts from a finished recording were already synced
        // when it stopped.
        if count_changed && self.state.is_recording() {
            self.sync_frame_count();
        }

        if let Some(frame) = latest {
            self.preview = Some(frame.clone());
            self.send_event(RecorderEvent::FrameCaptured(frame));
        }

        if let Some(message) = failure {
            self.end_capture(CaptureEndReason::SourceFailure { message });
        }

        let status = self.status();
        if self.last_status.as_ref() != Some(&status) {
            self.last_status = Some(status.clone());
            self.send_event(RecorderEvent::Status(status));
        }
    }

    /// Current recorder state.
    pub fn state(&self) -> &RecorderState {
        &self.state
    }

    /// Current selection phase.
    pub fn selection_phase(&self) -> SelectionPhase {
        self.selection.phase()
    }

    /// Frame count, timer and throughput.
    pub fn status(&self) -> RecordingStatus {
        self.recording.status(self.scheduler.desired_fps().get())
    }

    /// Latest captured frame of the region.
    pub fn preview(&self) -> Option<&Frame> {
        self.preview.as_ref()
    }

    /// Last computed size estimate.
    pub fn estimate(&self) -> SizeEstimate {
        self.estimate
    }

    /// Frames currently held in the buffer.
    pub fn buffered_frames(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Returns true while a capture worker is alive.
    pub fn is_capturing(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Replace the capture session with one on `rectangle`.
    #[instrument(name = "start_capture", skip(self), fields(region = %rectangle))]
    fn start_capture(&mut self, rectangle: Rectangle) -> RecorderResult<()> {
        if !self.state.is_idle() {
            self.end_capture(CaptureEndReason::Replaced);
        }

        self.preview = None;
        let fps = self.scheduler.desired_fps().get();
        if let Err(e) = self.scheduler.start(rectangle, fps) {
            error!("Capture start failed: {}", e);
            return Err(e.into());
        }

        self.transition_to(RecorderState::Previewing { rectangle });
        self.send_event(RecorderEvent::SelectionCommitted(rectangle));
        self.emit_status();
        Ok(())
    }

    /// Stop the worker and return to idle. Buffered frames are kept.
    fn end_capture(&mut self, reason: CaptureEndReason) {
        self.scheduler.stop();
        self.scheduler.set_recording(false);
        self.recording.stop();

        // Whatever the old worker left queued is stale now.
        let stale = self.updates_rx.try_iter().count();
        if stale > 0 {
            trace!(stale, "Discarded stale capture updates");
        }
        self.sync_frame_count();

        if !self.state.is_idle() {
            self.transition_to(RecorderState::Idle);
        }

        match &reason {
            CaptureEndReason::SourceFailure { .. } => {
                error!(reason = %reason.message(), "Capture ended");
                self.send_event(RecorderEvent::Error {
                    recoverable: false,
                    message: reason.message(),
                });
            }
            CaptureEndReason::Replaced | CaptureEndReason::Closed => {
                info!(reason = %reason.message(), "Capture ended");
            }
        }
    }

    fn shutdown(&mut self) {
        self.selection.cancel();
        self.end_capture(CaptureEndReason::Closed);
        self.send_event(RecorderEvent::Shutdown);
    }

    fn sync_frame_count(&mut self) {
        let recorded = self.buffer.lock().recorded();
        self.recording.set_frame_count(recorded);
    }

    fn report_error(&self, e: RecorderError) {
        match e {
            RecorderError::Selection(reason @ SelectionError::TooSmall { .. }) => {
                info!("{}", reason);
                self.send_event(RecorderEvent::SelectionRejected {
                    reason: reason.to_string(),
                });
            }
            e => {
                warn!("Command failed: {}", e);
                self.send_event(RecorderEvent::Error {
                    recoverable: e.is_recoverable(),
                    message: e.to_string(),
                });
            }
        }
    }

    fn emit_status(&mut self) {
        let status = self.status();
        self.last_status = Some(status.clone());
        self.send_event(RecorderEvent::Status(status));
    }

    fn send_state(&self) {
        self.send_event(RecorderEvent::StateChanged {
            previous: Box::new(self.state.clone()),
            current: Box::new(self.state.clone()),
        });
    }

    fn transition_to(&mut self, new_state: RecorderState) {
        let previous = std::mem::replace(&mut self.state, new_state.clone());

        debug!(
            previous = %previous.name(),
            current = %new_state.name(),
            "State transition"
        );

        self.send_event(RecorderEvent::StateChanged {
            previous: Box::new(previous),
            current: Box::new(new_state),
        });
    }

    fn send_event(&self, event: RecorderEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("Failed to send event: {}", e);
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.scheduler.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use gifgrab_capture::{CaptureError, CaptureResult, PatternSource};
    use gifgrab_ipc::event_channel;

    /// Source that fails every grab after the first `ok_grabs`.
    struct FlakySource {
        ok_grabs: usize,
        grabs: AtomicUsize,
    }

    impl FrameSource for FlakySource {
        fn grab(&self, region: Rectangle) -> CaptureResult<Frame> {
            if self.grabs.fetch_add(1, Ordering::SeqCst) >= self.ok_grabs {
                return Err(CaptureError::SourceFailure("display lost".to_string()));
            }
            Ok(Frame::solid(region.width(), region.height(), [9, 9, 9, 255], 0))
        }

        fn grab_screen(&self) -> CaptureResult<Frame> {
            Ok(Frame::solid(320, 240, [0, 0, 0, 255], 0))
        }
    }

    /// Source that yields one frame per token and fails once the token
    /// sender is dropped.
    struct GatedSource {
        tokens: Receiver<()>,
    }

    impl FrameSource for GatedSource {
        fn grab(&self, region: Rectangle) -> CaptureResult<Frame> {
            self.tokens
                .recv()
                .map_err(|_| CaptureError::SourceFailure("window closed".to_string()))?;
            Ok(Frame::solid(region.width(), region.height(), [7, 7, 7, 255], 0))
        }

        fn grab_screen(&self) -> CaptureResult<Frame> {
            Ok(Frame::solid(320, 240, [0, 0, 0, 255], 0))
        }
    }

    /// Source whose screen snapshot cannot be grabbed.
    struct NoScreenSource;

    impl FrameSource for NoScreenSource {
        fn grab(&self, region: Rectangle) -> CaptureResult<Frame> {
            Ok(Frame::solid(region.width(), region.height(), [1, 1, 1, 255], 0))
        }

        fn grab_screen(&self) -> CaptureResult<Frame> {
            Err(CaptureError::SourceFailure("display asleep".to_string()))
        }
    }

    fn recorder(source: Arc<dyn FrameSource>) -> (Recorder, Receiver<RecorderEvent>) {
        let config = RecorderConfig {
            default_fps: 100.0,
            ..Default::default()
        };
        recorder_with(source, config)
    }

    fn recorder_with(
        source: Arc<dyn FrameSource>,
        config: RecorderConfig,
    ) -> (Recorder, Receiver<RecorderEvent>) {
        let (event_tx, event_rx) = event_channel();
        (Recorder::new(source, config, event_tx), event_rx)
    }

    fn select(
        recorder: &mut Recorder,
        from: (i32, i32),
        to: (i32, i32),
    ) -> RecorderResult<Rectangle> {
        recorder.begin_selection()?;
        recorder.pointer_press(Point::new(from.0, from.1))?;
        recorder.pointer_drag(Point::new(to.0, to.1))?;
        recorder.pointer_release(Point::new(to.0, to.1))
    }

    fn wait_for(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not met in time");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_toggle_without_selection_fails() {
        let (mut recorder, _events) = recorder(Arc::new(PatternSource::new(320, 240)));
        assert!(matches!(
            recorder.toggle_record(),
            Err(RecorderError::NoCaptureSession)
        ));
    }

    #[test]
    fn test_save_with_empty_buffer_is_recoverable() {
        let (mut recorder, events) = recorder(Arc::new(PatternSource::new(320, 240)));
        recorder.handle_command(RecorderCommand::Save {
            filename: String::new(),
        });

        let event = events.try_iter().last().unwrap();
        assert!(matches!(
            event,
            RecorderEvent::Error {
                recoverable: true,
                ..
            }
        ));
    }

    #[test]
    fn test_small_selection_emits_rejection() {
        let (mut recorder, events) = recorder(Arc::new(PatternSource::new(320, 240)));
        recorder.handle_command(RecorderCommand::BeginSelection);
        recorder.handle_command(RecorderCommand::PointerPress { x: 5, y: 5 });
        recorder.handle_command(RecorderCommand::PointerRelease { x: 9, y: 40 });

        assert!(events
            .try_iter()
            .any(|e| matches!(e, RecorderEvent::SelectionRejected { .. })));
        assert!(recorder.state().is_idle());
        assert!(!recorder.is_capturing());
    }

    #[test]
    fn test_begin_while_selecting_is_busy() {
        let (mut recorder, _events) = recorder(Arc::new(PatternSource::new(320, 240)));
        recorder.begin_selection().unwrap();
        assert!(matches!(
            recorder.begin_selection(),
            Err(RecorderError::Selection(SelectionError::Busy))
        ));
    }

    #[test]
    fn test_save_refused_while_recording() {
        let (mut recorder, _events) = recorder(Arc::new(PatternSource::new(320, 240)));
        select(&mut recorder, (0, 0), (40, 30)).unwrap();
        assert!(recorder.toggle_record().unwrap());

        assert!(matches!(
            recorder.save("clip"),
            Err(RecorderError::RecordingInProgress)
        ));
    }

    #[test]
    fn test_reselect_returns_to_preview_and_keeps_frames() {
        let (mut recorder, _events) = recorder(Arc::new(PatternSource::new(320, 240)));
        select(&mut recorder, (0, 0), (40, 30)).unwrap();
        recorder.toggle_record().unwrap();
        wait_for(|| recorder.buffered_frames() >= 2);

        let rect = select(&mut recorder, (10, 10), (60, 60)).unwrap();
        assert_eq!(recorder.state(), &RecorderState::Previewing { rectangle: rect });
        assert!(recorder.buffered_frames() >= 2);
        assert_eq!(
            recorder.status().frame_count,
            recorder.buffered_frames() as u64
        );
    }

    #[test]
    fn test_source_failure_returns_to_idle() {
        let source = Arc::new(FlakySource {
            ok_grabs: 2,
            grabs: AtomicUsize::new(0),
        });
        let (mut recorder, events) = recorder(source);
        select(&mut recorder, (0, 0), (20, 20)).unwrap();
        // The worker may already have failed, in which case this is refused.
        let _ = recorder.toggle_record();

        wait_for(|| {
            recorder.poll();
            recorder.state().is_idle()
        });

        assert!(!recorder.is_capturing());
        assert!(events.try_iter().any(|e| matches!(
            e,
            RecorderEvent::Error {
                recoverable: false,
                ..
            }
        )));
        assert!(matches!(
            recorder.toggle_record(),
            Err(RecorderError::NoCaptureSession)
        ));
    }

    #[test]
    fn test_invalid_fps_input_uses_default() {
        let (mut recorder, _events) = recorder(Arc::new(PatternSource::new(320, 240)));
        assert_eq!(recorder.set_desired_fps("12"), 12.0);
        assert_eq!(recorder.set_desired_fps("abc"), 100.0);
        assert_eq!(recorder.set_desired_fps(""), 100.0);
        assert_eq!(recorder.status().desired_fps, 100.0);
    }

    #[test]
    fn test_failed_save_keeps_frames_for_retry() {
        let dir = tempfile::tempdir().unwrap();
        let config = RecorderConfig {
            default_fps: 100.0,
            output_dir: Some(dir.path().join("missing")),
            ..Default::default()
        };
        let (mut recorder, _events) = recorder_with(Arc::new(PatternSource::new(320, 240)), config);
        select(&mut recorder, (0, 0), (40, 30)).unwrap();
        recorder.toggle_record().unwrap();
        wait_for(|| recorder.buffered_frames() >= 3);
        assert!(!recorder.toggle_record().unwrap());

        let buffered = recorder.buffered_frames();
        let counted = recorder.status().frame_count;
        assert_eq!(counted, buffered as u64);

        let err = recorder.save("clip").unwrap_err();
        assert!(matches!(err, RecorderError::Encode(_)));
        assert!(err.is_recoverable());
        assert_eq!(recorder.buffered_frames(), buffered);
        assert_eq!(recorder.status().frame_count, counted);

        let target = dir.path().join("retry.gif");
        let saved = recorder.save(target.to_str().unwrap()).unwrap();
        assert_eq!(saved.path, target);
        assert_eq!(saved.frames, buffered);
        assert!(target.exists());
        assert_eq!(recorder.buffered_frames(), 0);
    }

    #[test]
    fn test_frames_survive_source_failure() {
        let (gate, tokens) = crossbeam_channel::unbounded();
        let dir = tempfile::tempdir().unwrap();
        let config = RecorderConfig {
            default_fps: 200.0,
            output_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let (mut recorder, _events) = recorder_with(Arc::new(GatedSource { tokens }), config);
        select(&mut recorder, (0, 0), (20, 20)).unwrap();
        assert!(recorder.toggle_record().unwrap());

        for _ in 0..3 {
            gate.send(()).unwrap();
        }
        wait_for(|| recorder.buffered_frames() == 3);
        drop(gate);

        wait_for(|| {
            recorder.poll();
            recorder.state().is_idle()
        });
        assert_eq!(recorder.buffered_frames(), 3);
        assert_eq!(recorder.status().frame_count, 3);

        let saved = recorder.save("after-failure").unwrap();
        assert_eq!(saved.frames, 3);
        assert_eq!(saved.path, dir.path().join("after-failure.gif"));
    }

    #[test]
    fn test_empty_screen_snapshot_is_refused() {
        let (mut recorder, events) = recorder(Arc::new(PatternSource::new(0, 480)));
        recorder.handle_command(RecorderCommand::BeginSelection);
        recorder.handle_command(RecorderCommand::PointerPress { x: 0, y: 0 });
        recorder.handle_command(RecorderCommand::PointerDrag { x: 40, y: 40 });

        assert_eq!(recorder.selection_phase(), SelectionPhase::Closed);
        assert!(matches!(
            recorder.begin_selection(),
            Err(RecorderError::ScreenGrab(_))
        ));
        assert!(events.try_iter().any(|e| matches!(
            e,
            RecorderEvent::Error {
                recoverable: true,
                ..
            }
        )));
    }

    #[test]
    fn test_screen_grab_failure_is_recoverable() {
        let (mut recorder, events) = recorder(Arc::new(NoScreenSource));
        recorder.handle_command(RecorderCommand::BeginSelection);

        let errors: Vec<bool> = events
            .try_iter()
            .filter_map(|e| match e {
                RecorderEvent::Error { recoverable, .. } => Some(recoverable),
                _ => None,
            })
            .collect();
        assert_eq!(errors, vec![true]);
        assert!(recorder.state().is_idle());
        assert_eq!(recorder.selection_phase(), SelectionPhase::Closed);
    }

    #[test]
    fn test_pointer_moves_without_selection_are_silent() {
        let (mut recorder, events) = recorder(Arc::new(PatternSource::new(320, 240)));
        select(&mut recorder, (0, 0), (40, 30)).unwrap();
        let _ = events.try_iter().count();

        for x in 41..45 {
            recorder.handle_command(RecorderCommand::PointerDrag { x, y: 30 });
        }
        assert!(events
            .try_iter()
            .all(|e| !matches!(e, RecorderEvent::Error { .. })));
    }

    #[test]
    fn test_reset_while_recording_ignores_queued_counts() {
        let (gate, tokens) = crossbeam_channel::unbounded();
        let (mut recorder, _events) = recorder(Arc::new(GatedSource { tokens }));
        select(&mut recorder, (0, 0), (20, 20)).unwrap();
        assert!(recorder.toggle_record().unwrap());

        for _ in 0..5 {
            gate.send(()).unwrap();
        }
        wait_for(|| recorder.buffered_frames() == 5);

        // The five count updates are still queued when the buffer is cleared.
        recorder.reset_recording();
        assert_eq!(recorder.status().frame_count, 0);
        recorder.poll();
        assert_eq!(recorder.buffered_frames(), 0);
        assert_eq!(recorder.status().frame_count, 0);
        assert!(recorder.state().is_recording());

        gate.send(()).unwrap();
        wait_for(|| {
            recorder.poll();
            recorder.status().frame_count == 1
        });
        assert_eq!(recorder.buffered_frames(), 1);

        drop(gate);
    }
}
