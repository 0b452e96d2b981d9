//! Recording counters and timer.

use std::time::{Duration, Instant};

use tracing::debug;

use gifgrab_ipc::RecordingStatus;

/// Frame count, timer and throughput shown to the user.
#[derive(Debug, Default)]
pub struct RecordingState {
    started_at: Option<Instant>,
    frames_recorded: u64,
    measured_fps: Option<f64>,
}

impl RecordingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the timer. Has no effect while already running.
    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
            debug!(frames = self.frames_recorded, "Recording timer started");
        }
    }

    /// Stop the timer. The frame count is kept.
    pub fn stop(&mut self) {
        if let Some(started) = self.started_at.take() {
            debug!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                frames = self.frames_recorded,
                "Recording timer stopped"
            );
        }
    }

    /// Clear the frame count and timer.
    pub fn reset(&mut self) {
        self.started_at = None;
        self.frames_recorded = 0;
    }

    /// Returns true while the timer runs.
    pub fn is_recording(&self) -> bool {
        self.started_at.is_some()
    }

    /// Set the number of frames recorded since the last clear.
    pub fn set_frame_count(&mut self, frames: u64) {
        self.frames_recorded = frames;
    }

    pub fn frame_count(&self) -> u64 {
        self.frames_recorded
    }

    /// Record an instantaneous capture rate sample.
    pub fn record_throughput(&mut self, fps: f64) {
        if fps.is_finite() && fps > 0.0 {
            self.measured_fps = Some(fps);
        }
    }

    /// Time since recording started, zero when stopped.
    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Instant::now())
    }

    /// Current status, with throughput capped at `desired_fps`.
    pub fn status(&self, desired_fps: f64) -> RecordingStatus {
        self.status_at(Instant::now(), desired_fps)
    }

    fn elapsed_at(&self, now: Instant) -> Duration {
        self.started_at
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or_default()
    }

    fn status_at(&self, now: Instant, desired_fps: f64) -> RecordingStatus {
        RecordingStatus {
            frame_count: self.frames_recorded,
            elapsed_secs: self.elapsed_at(now).as_secs(),
            fps: self.measured_fps.map_or(0.0, |fps| fps.min(desired_fps)),
            desired_fps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_runs_only_while_recording() {
        let mut state = RecordingState::new();
        assert_eq!(state.elapsed(), Duration::ZERO);

        state.start();
        assert!(state.is_recording());
        let started = state.started_at.unwrap();
        assert_eq!(
            state.status_at(started + Duration::from_secs(3725), 30.0).elapsed_text(),
            "62:05"
        );

        state.stop();
        assert!(!state.is_recording());
        assert_eq!(state.status(30.0).elapsed_secs, 0);
    }

    #[test]
    fn test_start_twice_keeps_original_time() {
        let mut state = RecordingState::new();
        state.start();
        let first = state.started_at;
        state.start();
        assert_eq!(state.started_at, first);
    }

    #[test]
    fn test_fps_capped_at_desired() {
        let mut state = RecordingState::new();
        assert_eq!(state.status(30.0).fps, 0.0);

        state.record_throughput(250.0);
        assert_eq!(state.status(30.0).fps, 30.0);

        state.record_throughput(12.5);
        assert_eq!(state.status(30.0).fps, 12.5);

        state.record_throughput(f64::INFINITY);
        assert_eq!(state.status(30.0).fps, 12.5);
    }

    #[test]
    fn test_reset_clears_count_and_timer() {
        let mut state = RecordingState::new();
        state.start();
        state.set_frame_count(42);
        state.reset();

        assert_eq!(state.frame_count(), 0);
        assert!(!state.is_recording());
    }
}
