//! Select, record and save against a frame source that yields one frame per
//! token, so the number of recorded frames is exact.

use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use gifgrab_capture::{CaptureError, CaptureResult, FrameSource};
use gifgrab_engine::{create_recorder, RecorderConfig};
use gifgrab_ipc::{event_channel, Frame, RecorderCommand, RecorderEvent, RecorderState, Rectangle};

/// Hands out a frame for each token received; fails once the token sender
/// is dropped.
struct GatedSource {
    tokens: Receiver<u8>,
}

impl GatedSource {
    fn new() -> (Arc<Self>, Sender<u8>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Arc::new(Self { tokens: rx }), tx)
    }
}

impl FrameSource for GatedSource {
    fn grab(&self, region: Rectangle) -> CaptureResult<Frame> {
        let shade = self
            .tokens
            .recv()
            .map_err(|_| CaptureError::SourceFailure("gate closed".to_string()))?;
        Ok(Frame::solid(
            region.width(),
            region.height(),
            [shade, 0, 255 - shade, 255],
            0,
        ))
    }

    fn grab_screen(&self) -> CaptureResult<Frame> {
        Ok(Frame::solid(200, 200, [30, 30, 30, 255], 0))
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out");
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn drain(events: &Receiver<RecorderEvent>) -> Vec<RecorderEvent> {
    events.try_iter().collect()
}

#[test]
fn test_drag_selection_is_normalized() {
    let (source, gate) = GatedSource::new();
    let (event_tx, events) = event_channel();
    let mut recorder = create_recorder(source, RecorderConfig::default(), event_tx);

    recorder.handle_command(RecorderCommand::BeginSelection);
    recorder.handle_command(RecorderCommand::PointerPress { x: 100, y: 100 });
    recorder.handle_command(RecorderCommand::PointerDrag { x: 50, y: 50 });
    recorder.handle_command(RecorderCommand::PointerRelease { x: 50, y: 50 });

    let expected = Rectangle {
        left: 50,
        top: 50,
        right: 100,
        bottom: 100,
    };
    let events = drain(&events);
    assert!(events
        .iter()
        .any(|e| matches!(e, RecorderEvent::SelectionStarted { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, RecorderEvent::SelectionPreview(_))));
    assert!(events
        .iter()
        .any(|e| matches!(e, RecorderEvent::SelectionCommitted(r) if *r == expected)));
    assert_eq!(
        recorder.state(),
        &RecorderState::Previewing {
            rectangle: expected
        }
    );

    drop(gate);
    drop(recorder);
}

#[test]
fn test_record_three_frames_and_save() {
    let (source, gate) = GatedSource::new();
    let (event_tx, events) = event_channel();
    let dir = tempfile::tempdir().unwrap();
    let config = RecorderConfig {
        default_fps: 200.0,
        output_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let mut recorder = create_recorder(source, config, event_tx);

    recorder.begin_selection().unwrap();
    recorder
        .pointer_press(gifgrab_ipc::Point::new(10, 10))
        .unwrap();
    let rect = recorder
        .pointer_release(gifgrab_ipc::Point::new(30, 26))
        .unwrap();
    assert_eq!((rect.width(), rect.height()), (20, 16));

    assert!(recorder.toggle_record().unwrap());
    for shade in [0u8, 120, 240] {
        gate.send(shade).unwrap();
    }
    wait_until(|| recorder.buffered_frames() == 3);
    assert!(!recorder.toggle_record().unwrap());
    assert_eq!(recorder.status().frame_count, 3);
    assert!(recorder.estimate().bytes().is_some());

    let saved = recorder.save("capture").unwrap();
    assert_eq!(saved.path, dir.path().join("capture.gif"));
    assert_eq!(saved.frames, 3);
    assert_eq!(recorder.buffered_frames(), 0);
    assert_eq!(recorder.status().frame_count, 0);

    let bytes = fs::read(&saved.path).unwrap();
    assert_eq!(bytes.len() as u64, saved.bytes);

    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options.read_info(bytes.as_slice()).unwrap();
    let mut decoded = 0;
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        assert_eq!(frame.delay, 10);
        decoded += 1;
    }
    assert_eq!(decoded, 3);

    assert!(drain(&events)
        .iter()
        .any(|e| matches!(e, RecorderEvent::Saved { frames: 3, .. })));

    drop(gate);
    drop(recorder);
}

#[test]
fn test_run_loop_reports_ready_and_shutdown() {
    let (source, gate) = GatedSource::new();
    let (event_tx, events) = event_channel();
    let (command_tx, command_rx) = gifgrab_ipc::command_channel();

    let handle = std::thread::spawn(move || {
        let mut recorder = create_recorder(source, RecorderConfig::default(), event_tx);
        recorder.run(command_rx);
    });

    command_tx.send(RecorderCommand::GetState).unwrap();
    command_tx.send(RecorderCommand::Close).unwrap();
    handle.join().unwrap();

    let events = drain(&events);
    assert!(matches!(events.first(), Some(RecorderEvent::Ready)));
    assert!(matches!(events.last(), Some(RecorderEvent::Shutdown)));
    drop(gate);
}
