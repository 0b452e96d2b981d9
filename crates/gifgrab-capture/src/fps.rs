//! Shared desired-rate cell.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::debug;

/// Rate used when the user input is empty or not a usable number.
pub const DEFAULT_FPS: f64 = 30.0;

/// Desired capture rate, shared between the host and the capture worker.
///
/// The worker reads it once per iteration, so changes apply to the next
/// frame without restarting capture.
#[derive(Debug, Clone)]
pub struct DesiredFps {
    value: Arc<RwLock<f64>>,
    fallback: f64,
}

impl DesiredFps {
    /// Create a cell holding `fps`, falling back to [`DEFAULT_FPS`].
    pub fn new(fps: f64) -> Self {
        Self::with_fallback(fps, DEFAULT_FPS)
    }

    /// Create a cell with a custom fallback rate.
    pub fn with_fallback(fps: f64, fallback: f64) -> Self {
        let fallback = if is_usable(fallback) { fallback } else { DEFAULT_FPS };
        let initial = if is_usable(fps) { fps } else { fallback };
        Self {
            value: Arc::new(RwLock::new(initial)),
            fallback,
        }
    }

    /// Current desired rate.
    pub fn get(&self) -> f64 {
        *self.value.read()
    }

    /// Store `fps`, or the fallback if it is not a usable rate.
    /// Returns the value actually stored.
    pub fn set(&self, fps: f64) -> f64 {
        let applied = if is_usable(fps) { fps } else { self.fallback };
        *self.value.write() = applied;
        debug!(requested = fps, applied, "Desired FPS updated");
        applied
    }

    /// Parse raw user input and store it. Empty or invalid input stores the
    /// fallback.
    pub fn set_from_input(&self, input: &str) -> f64 {
        self.set(Self::parse(input, self.fallback))
    }

    /// Parse raw user input into a rate.
    pub fn parse(input: &str, fallback: f64) -> f64 {
        input
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|fps| is_usable(*fps))
            .unwrap_or(fallback)
    }

    /// Target time between frame starts.
    pub fn frame_interval(&self) -> Duration {
        interval_of(self.get())
            .or_else(|| interval_of(self.fallback))
            .unwrap_or_else(|| Duration::from_secs_f64(1.0 / DEFAULT_FPS))
    }

    /// Returns true if `fps` is positive, finite and its frame interval fits
    /// in a [`Duration`].
    pub fn is_usable(fps: f64) -> bool {
        is_usable(fps)
    }
}

impl Default for DesiredFps {
    fn default() -> Self {
        Self::new(DEFAULT_FPS)
    }
}

fn is_usable(fps: f64) -> bool {
    interval_of(fps).is_some()
}

fn interval_of(fps: f64) -> Option<Duration> {
    if !(fps.is_finite() && fps > 0.0) {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / fps).ok()
}
