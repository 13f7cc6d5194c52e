use crate::rendering::domain::drawing_surface::{DrawingSurface, StrokeStyle, TextStyle};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

#[derive(Debug, Clone)]
pub enum DrawCommand {
    Frame(Frame),
    StrokeRect(BoundingBox, StrokeStyle),
    FillText {
        text: String,
        x: f32,
        y: f32,
        style: TextStyle,
    },
}

/// A surface that records what was drawn since the last clear.
///
/// Front ends replay the commands with whatever renderer they have; the
/// desktop app paints the frame as an image and the rest on a canvas.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    width: u32,
    height: u32,
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The last frame painted, if any.
    pub fn frame(&self) -> Option<&Frame> {
        self.commands.iter().rev().find_map(|c| match c {
            DrawCommand::Frame(frame) => Some(frame),
            _ => None,
        })
    }

    pub fn rects(&self) -> impl Iterator<Item = &BoundingBox> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::StrokeRect(rect, _) => Some(rect),
            _ => None,
        })
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::FillText { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl DrawingSurface for DisplayList {
    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.commands.clear();
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.commands.clear();
    }

    fn draw_frame(&mut self, frame: &Frame) {
        self.commands.push(DrawCommand::Frame(frame.clone()));
    }

    fn stroke_rect(&mut self, rect: &BoundingBox, style: &StrokeStyle) {
        self.commands.push(DrawCommand::StrokeRect(*rect, *style));
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle) {
        self.commands.push(DrawCommand::FillText {
            text: text.to_string(),
            x,
            y,
            style: *style,
        });
    }
}
