use iced::mouse;
use iced::widget::canvas::{self, Canvas, Frame, Geometry, Path, Stroke};
use iced::widget::{center, container, image, stack, text};
use iced::{Color, ContentFit, Element, Length, Pixels, Point, Rectangle, Renderer, Size, Theme};

use facecap_core::rendering::domain::drawing_surface::DrawingSurface;
use facecap_core::rendering::infrastructure::display_list::{DisplayList, DrawCommand};

use crate::app::{scaled, Message};
use crate::theme::surface_color;

const VIEW_HEIGHT: f32 = 360.0;
const CORNER_RADIUS: f32 = 10.0;

/// The last detected frame with its boxes and labels drawn on top.
pub fn video_view<'a>(
    surface: &'a DisplayList,
    frame: Option<&image::Handle>,
    fs: f32,
    theme: &Theme,
) -> Element<'a, Message> {
    let background = surface_color(theme);

    let content: Element<'a, Message> = match frame {
        Some(handle) => stack![
            image(handle.clone())
                .content_fit(ContentFit::Contain)
                .width(Length::Fill)
                .height(Length::Fill),
            Canvas::new(Overlay { surface })
                .width(Length::Fill)
                .height(Length::Fill),
        ]
        .into(),
        None => center(text("No video").size(scaled(14.0, fs))).into(),
    };

    container(content)
        .width(Length::Fill)
        .height(VIEW_HEIGHT)
        .clip(true)
        .style(move |_theme: &Theme| container::Style {
            background: Some(background.into()),
            border: iced::border::Border {
                radius: CORNER_RADIUS.into(),
                ..iced::border::Border::default()
            },
            ..container::Style::default()
        })
        .into()
}

/// Replays the rectangles and labels of a display list, scaled the same
/// way the image underneath is.
struct Overlay<'a> {
    surface: &'a DisplayList,
}

impl<Message> canvas::Program<Message> for Overlay<'_> {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        let (width, height) = self.surface.size();
        let Some(fit) = Fit::contain(width, height, bounds.size()) else {
            return vec![frame.into_geometry()];
        };

        for command in self.surface.commands() {
            match command {
                DrawCommand::StrokeRect(rect, style) => {
                    let path = Path::rectangle(
                        fit.point(rect.x_min, rect.y_min),
                        Size::new(rect.width * fit.scale, rect.height * fit.scale),
                    );
                    frame.stroke(
                        &path,
                        Stroke {
                            style: canvas::Style::Solid(rgb(style.color)),
                            width: style.width,
                            ..Stroke::default()
                        },
                    );
                }
                DrawCommand::FillText { text, x, y, style } => {
                    let size = style.size * fit.scale;
                    // Anchors are baselines; canvas text is positioned by its top.
                    let top = fit.point(*x, *y - style.size);
                    frame.fill_text(canvas::Text {
                        content: text.clone(),
                        position: top,
                        color: rgb(style.color),
                        size: Pixels(size),
                        ..canvas::Text::default()
                    });
                }
                DrawCommand::Frame(_) => {}
            }
        }

        vec![frame.into_geometry()]
    }
}

/// Maps source pixels onto a `ContentFit::Contain` placement.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Fit {
    scale: f32,
    offset_x: f32,
    offset_y: f32,
}

impl Fit {
    fn contain(width: u32, height: u32, bounds: Size) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let (w, h) = (width as f32, height as f32);
        let scale = (bounds.width / w).min(bounds.height / h);
        Some(Self {
            scale,
            offset_x: (bounds.width - w * scale) / 2.0,
            offset_y: (bounds.height - h * scale) / 2.0,
        })
    }

    fn point(&self, x: f32, y: f32) -> Point {
        Point::new(self.offset_x + x * self.scale, self.offset_y + y * self.scale)
    }
}

fn rgb([r, g, b]: [u8; 3]) -> Color {
    Color::from_rgb8(r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_letterboxes_wide_bounds() {
        let fit = Fit::contain(640, 480, Size::new(960.0, 480.0)).unwrap();
        assert_eq!(fit.scale, 1.0);
        assert_eq!(fit.point(0.0, 0.0), Point::new(160.0, 0.0));
    }

    #[test]
    fn test_fit_scales_down() {
        let fit = Fit::contain(640, 480, Size::new(320.0, 360.0)).unwrap();
        assert_eq!(fit.scale, 0.5);
        assert_eq!(fit.point(640.0, 480.0), Point::new(320.0, 300.0));
    }

    #[test]
    fn test_fit_needs_a_sized_surface() {
        assert!(Fit::contain(0, 480, Size::new(100.0, 100.0)).is_none());
    }
}
