use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::{OVERLAY_COLOR, OVERLAY_FONT_SIZE, OVERLAY_LINE_WIDTH};
use crate::shared::frame::Frame;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: [u8; 3],
    pub width: f32,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: OVERLAY_COLOR,
            width: OVERLAY_LINE_WIDTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub color: [u8; 3],
    /// Font size in pixels.
    pub size: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            color: OVERLAY_COLOR,
            size: OVERLAY_FONT_SIZE,
        }
    }
}

/// Immediate-mode 2D target for the detection overlay.
///
/// Coordinates are in frame pixels. Every call takes effect at once; there
/// is no retained scene beyond what the implementation chooses to keep.
pub trait DrawingSurface {
    /// Sets the surface to `width` x `height` pixels, discarding its contents.
    fn resize(&mut self, width: u32, height: u32);

    fn size(&self) -> (u32, u32);

    fn clear(&mut self);

    /// Paints `frame` at the origin.
    fn draw_frame(&mut self, frame: &Frame);

    fn stroke_rect(&mut self, rect: &BoundingBox, style: &StrokeStyle);

    /// Draws `text` with its baseline starting at `(x, y)`.
    fn fill_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle);
}
