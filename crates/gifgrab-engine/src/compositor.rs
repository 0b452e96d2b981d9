//! Selection preview compositing.

use gifgrab_ipc::{Frame, Rectangle};

/// Brightness kept outside the selection.
pub const DIM_FACTOR: f32 = 0.3;

/// Width of the selection outline in pixels.
pub const OUTLINE_WIDTH: u32 = 2;

/// Colour of the selection outline.
pub const OUTLINE_COLOR: [u8; 4] = [255, 0, 0, 255];

/// Builds the preview shown while the user drags out a selection.
pub trait PreviewCompositor: Send {
    /// Render `background` with `selection` highlighted.
    fn compose(&mut self, background: &Frame, selection: Rectangle) -> Frame;
}

/// Darkens everything outside the selection and outlines its edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct DimmedOverlay;

impl PreviewCompositor for DimmedOverlay {
    fn compose(&mut self, background: &Frame, selection: Rectangle) -> Frame {
        let width = background.width as usize;
        if width == 0 || !background.is_valid() {
            return background.clone();
        }
        let mut data = Vec::with_capacity(background.data.len());

        for (y, row) in background
            .data
            .chunks_exact(width * Frame::BYTES_PER_PIXEL)
            .enumerate()
        {
            for (x, px) in row.chunks_exact(Frame::BYTES_PER_PIXEL).enumerate() {
                let (x, y) = (x as i32, y as i32);
                if !selection.contains(x, y) {
                    data.extend_from_slice(&[dim(px[0]), dim(px[1]), dim(px[2]), px[3]]);
                } else if on_outline(selection, x, y) {
                    data.extend_from_slice(&OUTLINE_COLOR);
                } else {
                    data.extend_from_slice(px);
                }
            }
        }

        Frame {
            data: data.into(),
            width: background.width,
            height: background.height,
            sequence: background.sequence,
        }
    }
}

fn dim(channel: u8) -> u8 {
    (f32::from(channel) * DIM_FACTOR).round() as u8
}

/// True for pixels inside `rect` within `OUTLINE_WIDTH` of an edge.
fn on_outline(rect: Rectangle, x: i32, y: i32) -> bool {
    let band = OUTLINE_WIDTH as i32;
    x < rect.left + band || x >= rect.right - band || y < rect.top + band || y >= rect.bottom - band
}
