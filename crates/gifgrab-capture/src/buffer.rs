//! Recorded frame storage.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use gifgrab_ipc::Frame;

/// Frame buffer shared between the capture worker (writer) and the
/// recorder (reader, only while recording is off).
pub type SharedFrameBuffer = Arc<Mutex<FrameBuffer>>;

/// Ordered frames retained while recording.
///
/// Insertion order is capture order and playback order. With a capacity set,
/// appending to a full buffer evicts the oldest frame.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    frames: VecDeque<Frame>,
    capacity: Option<usize>,
    recorded: u64,
    evicted: u64,
}

impl FrameBuffer {
    /// Create a buffer holding at most `capacity` frames (`None` or zero for
    /// no limit).
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            frames: VecDeque::new(),
            capacity: capacity.filter(|&c| c > 0),
            recorded: 0,
            evicted: 0,
        }
    }

    /// Create a buffer without a frame limit.
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Wrap a new buffer for sharing with the capture worker.
    pub fn shared(capacity: Option<usize>) -> SharedFrameBuffer {
        Arc::new(Mutex::new(Self::new(capacity)))
    }

    /// Append a frame, evicting the oldest if the buffer is full.
    /// Returns the number of frames recorded since the last clear.
    pub fn append(&mut self, frame: Frame) -> u64 {
        if let Some(capacity) = self.capacity {
            if self.frames.len() >= capacity {
                self.frames.pop_front();
                self.evicted += 1;
                if self.evicted == 1 || self.evicted % 100 == 0 {
                    warn!(
                        capacity,
                        evicted = self.evicted,
                        "Frame buffer full, dropping oldest frames"
                    );
                }
            }
        }

        self.frames.push_back(frame);
        self.recorded += 1;
        self.recorded
    }

    /// Drop all frames and reset the counters.
    pub fn clear(&mut self) {
        debug!(frames = self.frames.len(), "Clearing frame buffer");
        self.frames.clear();
        self.recorded = 0;
        self.evicted = 0;
    }

    /// Number of frames currently held.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if no frames are held.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames appended since the last clear, including evicted ones.
    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    /// Frames dropped because the buffer was full.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Configured frame limit.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Iterate over the held frames in playback order.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    /// Clone the held frames. Pixel data is reference counted, so this only
    /// copies frame headers.
    pub fn snapshot(&self) -> Vec<Frame> {
        self.frames.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(sequence: u64) -> Frame {
        Frame::solid(2, 2, [sequence as u8, 0, 0, 255], sequence)
    }

    #[test]
    fn test_append_preserves_order() {
        let mut buffer = FrameBuffer::unbounded();
        for seq in 0..5 {
            assert_eq!(buffer.append(frame(seq)), seq + 1);
        }

        let order: Vec<u64> = buffer.frames().map(|f| f.sequence).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut buffer = FrameBuffer::new(Some(3));
        for seq in 0..5 {
            buffer.append(frame(seq));
        }

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.recorded(), 5);
        assert_eq!(buffer.evicted(), 2);
        let order: Vec<u64> = buffer.snapshot().iter().map(|f| f.sequence).collect();
        assert_eq!(order, vec![2, 3, 4]);
    }

    #[test]
    fn test_zero_capacity_means_unbounded() {
        let buffer = FrameBuffer::new(Some(0));
        assert_eq!(buffer.capacity(), None);
    }

    #[test]
    fn test_clear_resets_counters() {
        let mut buffer = FrameBuffer::new(Some(1));
        buffer.append(frame(0));
        buffer.append(frame(1));
        buffer.clear();

        assert!(buffer.is_empty());
        assert_eq!(buffer.recorded(), 0);
        assert_eq!(buffer.evicted(), 0);
    }
}
