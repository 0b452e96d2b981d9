//! Synthetic animated frame source.

use std::sync::atomic::{AtomicU64, Ordering};

use gifgrab_ipc::{Frame, Rectangle};

use crate::error::CaptureError;
use crate::{CaptureResult, FrameSource};

/// Width of one colour band in pixels.
const BAND_WIDTH: u32 = 16;

/// Pixels the bands advance per grab.
const BAND_STEP: u32 = 4;

const PALETTE: [[u8; 4]; 4] = [
    [230, 57, 70, 255],
    [241, 250, 238, 255],
    [69, 123, 157, 255],
    [29, 53, 87, 255],
];

/// A virtual screen of diagonal colour bands that scroll on every grab.
///
/// Output uses four colours, so it encodes losslessly to GIF.
#[derive(Debug)]
pub struct PatternSource {
    width: u32,
    height: u32,
    tick: AtomicU64,
}

impl PatternSource {
    /// Create a virtual screen of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tick: AtomicU64::new(0),
        }
    }

    /// Virtual screen size.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn screen(&self) -> Rectangle {
        Rectangle {
            left: 0,
            top: 0,
            right: self.width as i32,
            bottom: self.height as i32,
        }
    }

    fn render(&self, region: Rectangle, tick: u64) -> CaptureResult<Frame> {
        let offset = (tick % u64::from(BAND_WIDTH * PALETTE.len() as u32)) as u32 * BAND_STEP;
        let mut data = Vec::with_capacity(Frame::rgba_buffer_size(region.width(), region.height()));

        for y in region.top..region.bottom {
            for x in region.left..region.right {
                let diagonal = x as u32 + y as u32 + offset;
                let band = (diagonal / BAND_WIDTH) as usize % PALETTE.len();
                data.extend_from_slice(&PALETTE[band]);
            }
        }

        Ok(Frame::new(data, region.width(), region.height(), tick)?)
    }
}

impl FrameSource for PatternSource {
    fn grab(&self, region: Rectangle) -> CaptureResult<Frame> {
        let screen = self.screen();
        if region.left < screen.left
            || region.top < screen.top
            || region.right > screen.right
            || region.bottom > screen.bottom
        {
            return Err(CaptureError::OutOfBounds(region));
        }

        let tick = self.tick.fetch_add(1, Ordering::Relaxed);
        self.render(region, tick)
    }

    fn grab_screen(&self) -> CaptureResult<Frame> {
        let tick = self.tick.load(Ordering::Relaxed);
        self.render(self.screen(), tick)
    }

    fn name(&self) -> &'static str {
        "pattern"
    }
}
