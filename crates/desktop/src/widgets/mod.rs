pub mod face_card;
pub mod faces_panel;
pub mod video_view;
