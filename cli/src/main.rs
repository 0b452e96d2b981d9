//! Headless host for the gifgrab recorder.
//!
//! Drives one select-record-save session against the built-in test pattern
//! source, the same way an interactive front end would: commands go out on
//! one channel and the recorder's events come back on another.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info};

use gifgrab_capture::PatternSource;
use gifgrab_engine::{create_recorder, RecorderConfig};
use gifgrab_ipc::{
    command_channel, event_channel, Point, RecorderCommand, RecorderEvent, SizeEstimate,
};

/// Longest silence tolerated from the recorder while waiting for an event.
const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Parser)]
#[command(name = "gifgrab", version, about = "Record a screen region to an animated GIF")]
struct Args {
    /// JSON recorder configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Drag start corner as X,Y.
    #[arg(long, default_value = "40,30", value_parser = parse_point)]
    from: Point,

    /// Drag end corner as X,Y.
    #[arg(long, default_value = "280,190", value_parser = parse_point)]
    to: Point,

    /// Frames to record before saving.
    #[arg(long, default_value_t = 30)]
    frames: u64,

    /// Capture rate cap; empty or invalid input uses the configured default.
    #[arg(long, default_value = "")]
    fps: String,

    /// Output file name; `.gif` is appended when missing.
    #[arg(short, long, default_value = "")]
    output: String,

    /// Size of the virtual test-pattern screen as WIDTHxHEIGHT.
    #[arg(long, default_value = "640x480", value_parser = parse_size)]
    screen: (u32, u32),
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {s:?}"))?;
    let x = x.trim().parse().map_err(|e| format!("bad X: {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad Y: {e}"))?;
    Ok(Point::new(x, y))
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let w = w.trim().parse().map_err(|e| format!("bad width: {e}"))?;
    let h = h.trim().parse().map_err(|e| format!("bad height: {e}"))?;
    Ok((w, h))
}

/// Host side of the recorder channels.
struct Session {
    command_tx: Sender<RecorderCommand>,
    event_rx: Receiver<RecorderEvent>,
}

impl Session {
    fn send(&self, command: RecorderCommand) -> Result<()> {
        debug!(?command, "Sending command");
        self.command_tx
            .send(command)
            .context("Recorder is no longer accepting commands")
    }

    /// Consume events until `done` returns a value. Errors and rejected
    /// selections abort the session.
    fn wait_for<T>(&self, mut done: impl FnMut(&RecorderEvent) -> Option<T>) -> Result<T> {
        loop {
            let event = match self.event_rx.recv_timeout(EVENT_TIMEOUT) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => bail!("Recorder stopped responding"),
                Err(RecvTimeoutError::Disconnected) => bail!("Recorder exited unexpectedly"),
            };

            match &event {
                RecorderEvent::Error { message, .. } => bail!("Recorder error: {message}"),
                RecorderEvent::SelectionRejected { reason } => {
                    bail!("Selection rejected: {reason}")
                }
                RecorderEvent::StateChanged { previous, current } => {
                    debug!(from = previous.name(), to = current.name(), "State changed");
                }
                _ => {}
            }

            if let Some(value) = done(&event) {
                return Ok(value);
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => RecorderConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => RecorderConfig::default(),
    };

    info!("Starting gifgrab");

    let (command_tx, command_rx) = command_channel();
    let (event_tx, event_rx) = event_channel();
    let (width, height) = args.screen;
    let source = Arc::new(PatternSource::new(width, height));

    let recorder_thread = thread::Builder::new()
        .name("gifgrab-recorder".to_string())
        .spawn(move || {
            let mut recorder = create_recorder(source, config, event_tx);
            recorder.run(command_rx);
        })
        .context("Failed to spawn recorder thread")?;

    let session = Session {
        command_tx,
        event_rx,
    };
    session.wait_for(|e| matches!(e, RecorderEvent::Ready).then_some(()))?;

    if !args.fps.is_empty() {
        session.send(RecorderCommand::SetDesiredFps(args.fps.clone()))?;
    }

    session.send(RecorderCommand::BeginSelection)?;
    session.send(RecorderCommand::PointerPress {
        x: args.from.x,
        y: args.from.y,
    })?;
    session.send(RecorderCommand::PointerDrag {
        x: args.to.x,
        y: args.to.y,
    })?;
    session.send(RecorderCommand::PointerRelease {
        x: args.to.x,
        y: args.to.y,
    })?;
    let region = session.wait_for(|e| match e {
        RecorderEvent::SelectionCommitted(rect) => Some(*rect),
        _ => None,
    })?;
    info!(%region, "Region selected");

    session.send(RecorderCommand::ToggleRecord)?;
    let frames = args.frames;
    session.wait_for(|e| match e {
        RecorderEvent::Status(status) if status.frame_count >= frames => {
            info!(
                frames = status.frame_count,
                elapsed = %status.elapsed_text(),
                fps = status.fps,
                "Recorded"
            );
            Some(())
        }
        _ => None,
    })?;
    session.send(RecorderCommand::ToggleRecord)?;

    let estimate = session.wait_for(|e| match e {
        RecorderEvent::SizeEstimate(estimate @ SizeEstimate::Bytes(_)) => Some(*estimate),
        _ => None,
    })?;
    info!(%estimate, "Estimated output size");

    session.send(RecorderCommand::Save {
        filename: args.output.clone(),
    })?;
    let (path, written, bytes) = session.wait_for(|e| match e {
        RecorderEvent::Saved {
            path,
            frames,
            bytes,
        } => Some((path.clone(), *frames, *bytes)),
        _ => None,
    })?;
    println!(
        "Saved {} frames to {} ({})",
        written,
        path.display(),
        SizeEstimate::Bytes(bytes)
    );

    session.send(RecorderCommand::Close)?;
    session.wait_for(|e| matches!(e, RecorderEvent::Shutdown).then_some(()))?;

    if recorder_thread.join().is_err() {
        bail!("Recorder thread panicked");
    }

    info!("gifgrab finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("40, 30"), Ok(Point::new(40, 30)));
        assert_eq!(parse_point("-5,7"), Ok(Point::new(-5, 7)));
        assert!(parse_point("40").is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("640x480"), Ok((640, 480)));
        assert_eq!(parse_size("800X600"), Ok((800, 600)));
        assert!(parse_size("640").is_err());
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["gifgrab"]).unwrap();
        assert_eq!(args.frames, 30);
        assert_eq!(args.screen, (640, 480));
        assert_eq!(args.from, Point::new(40, 30));
        assert!(args.output.is_empty());
    }
}
