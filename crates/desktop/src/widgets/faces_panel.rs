use iced::widget::{column, image, row, text};
use iced::{Element, Theme};

use facecap_core::capture::face_card::FaceCard;

use crate::app::{scaled, Message};
use crate::widgets::face_card::face_card;

const CARD_SPACING: f32 = 10.0;

/// Decoded images for the current cards, rebuilt whenever a capture lands.
#[derive(Default)]
pub struct CardImages {
    handles: Vec<image::Handle>,
}

impl CardImages {
    pub fn refresh(&mut self, cards: &[FaceCard]) {
        self.handles = cards
            .iter()
            .map(|card| image::Handle::from_bytes(card.jpeg.clone()))
            .collect();
    }
}

pub fn faces_panel<'a>(
    cards: &[FaceCard],
    images: &CardImages,
    hovered: Option<usize>,
    fs: f32,
    theme: &Theme,
) -> Element<'a, Message> {
    let title = text("Captured Faces").size(scaled(15.0, fs));

    if cards.is_empty() {
        return column![
            title,
            text("Click \"Capture Faces\" to save the faces in view.").size(scaled(12.0, fs)),
        ]
        .spacing(8)
        .into();
    }

    let items: Vec<Element<'a, Message>> = cards
        .iter()
        .zip(&images.handles)
        .map(|(card, handle)| face_card(card, handle, hovered == Some(card.index), fs, theme))
        .collect();

    column![title, row(items).spacing(CARD_SPACING).wrap()]
        .spacing(8)
        .into()
}
