use std::time::Duration;

use iced::widget::{column, container, image, mouse_area, text};
use iced::{Color, Element, Theme};
use iced_anim::transition::Easing;
use iced_anim::AnimationBuilder;

use facecap_core::capture::face_card::FaceCard;

use crate::app::{scaled, Message};
use crate::theme::surface_color;

const IMAGE_HEIGHT: f32 = 110.0;
const CORNER_RADIUS: f32 = 10.0;
const BORDER_WIDTH: f32 = 2.0;
const HOVER_GROW: f32 = 4.0;
const ANIMATION_DURATION: Duration = Duration::from_millis(200);

/// One captured face: the crop above its "Face N" label.
pub fn face_card<'a>(
    card: &FaceCard,
    handle: &image::Handle,
    hovered: bool,
    fs: f32,
    theme: &Theme,
) -> Element<'a, Message> {
    let palette = theme.palette();
    let background = surface_color(theme);
    let handle = handle.clone();
    let label = card.label.clone();
    let aspect = card.width as f32 / card.height.max(1) as f32;
    let index = card.index;

    let target = if hovered { 1.0_f32 } else { 0.0 };
    let animated: Element<'a, Message> = AnimationBuilder::new(target, move |t: f32| {
        let t = t.clamp(0.0, 1.0);
        let height = IMAGE_HEIGHT + HOVER_GROW * t;
        let border = Color {
            a: 0.15 + 0.85 * t,
            ..palette.primary
        };

        let img = image(handle.clone())
            .height(height)
            .width(height * aspect)
            .border_radius(CORNER_RADIUS - BORDER_WIDTH);

        container(
            column![img, text(label.clone()).size(scaled(12.0, fs))]
                .spacing(6)
                .align_x(iced::Alignment::Center),
        )
        .padding(6)
        .style(move |_theme: &Theme| container::Style {
            background: Some(background.into()),
            border: iced::border::Border {
                color: border,
                width: BORDER_WIDTH,
                radius: CORNER_RADIUS.into(),
            },
            ..container::Style::default()
        })
        .into()
    })
    .animates_layout(true)
    .animation(Easing::EASE_OUT.with_duration(ANIMATION_DURATION))
    .into();

    mouse_area(animated)
        .on_enter(Message::CardHover(index, true))
        .on_exit(Message::CardHover(index, false))
        .into()
}
