use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, TryRecvError};
use iced::widget::{button, checkbox, column, container, image, pick_list, row, scrollable, text};
use iced::{Element, Length, Subscription, Task, Theme};

use facecap_core::capture::acquisition::{self, AcquireRequest, Acquisition};
use facecap_core::capture::detection_request::Purpose;
use facecap_core::capture::detection_worker::DetectionWorker;
use facecap_core::capture::orchestrator::CaptureOrchestrator;
use facecap_core::detection::infrastructure::model_loader::{self, ModelLoadMessage};
use facecap_core::shared::frame::Frame;
use facecap_core::video::infrastructure::ffmpeg_media_devices::FfmpegMediaDevices;

use crate::settings::{Appearance, Settings};
use crate::theme;
use crate::widgets::faces_panel::{faces_panel, CardImages};
use crate::widgets::video_view::video_view;

/// How often worker channels are drained while something is pending.
const POLL_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone)]
pub enum Message {
    Start,
    Stop,
    Capture,
    Tick,
    PollWorkers,
    CardHover(usize, bool),
    AppearanceChanged(Appearance),
    HighContrastChanged(bool),
    PollSystemTheme,
}

pub struct App {
    orchestrator: CaptureOrchestrator,
    worker: DetectionWorker,
    devices: Arc<FfmpegMediaDevices>,
    model: Option<Receiver<ModelLoadMessage>>,
    acquisition: Option<Receiver<Acquisition>>,
    frame: Option<image::Handle>,
    /// Index of the live frame shown while no detection loop runs.
    preview_index: Option<usize>,
    card_images: CardImages,
    hovered_card: Option<usize>,
    pub settings: Settings,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        let settings = Settings::load();
        let model = model_loader::spawn(settings.model_options());
        (
            Self {
                orchestrator: CaptureOrchestrator::new(settings.capture_config()),
                worker: DetectionWorker::spawn(),
                devices: Arc::new(FfmpegMediaDevices::new()),
                model: Some(model),
                acquisition: None,
                frame: None,
                preview_index: None,
                card_images: CardImages::default(),
                hovered_card: None,
                settings,
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Start => {
                let request = self.orchestrator.begin_camera();
                self.acquire(request);
            }
            Message::Stop => {
                self.orchestrator.stop();
                self.acquisition = None;
                self.frame = None;
                self.preview_index = None;
            }
            Message::Capture => {
                if let Some(request) = self.orchestrator.capture() {
                    self.worker.submit(request);
                }
            }
            Message::Tick => {
                if let Some(request) = self.orchestrator.tick() {
                    self.worker.submit(request);
                }
            }
            Message::PollWorkers => {
                self.poll_model();
                self.poll_acquisition();
                self.poll_detections();
                self.refresh_preview();
            }
            Message::CardHover(index, hovered) => {
                if hovered {
                    self.hovered_card = Some(index);
                } else if self.hovered_card == Some(index) {
                    self.hovered_card = None;
                }
            }
            Message::AppearanceChanged(appearance) => {
                self.settings.appearance = appearance;
                self.settings.save();
            }
            Message::HighContrastChanged(enabled) => {
                self.settings.high_contrast = enabled;
                self.settings.save();
            }
            Message::PollSystemTheme => {}
        }
        Task::none()
    }

    fn poll_model(&mut self) {
        let Some(ref rx) = self.model else {
            return;
        };
        loop {
            match rx.try_recv() {
                Ok(ModelLoadMessage::Progress(downloaded, total)) => {
                    self.orchestrator.model_progress(downloaded, total);
                }
                Ok(ModelLoadMessage::Loaded(detector)) => {
                    self.orchestrator.model_loaded(Ok(detector));
                }
                Ok(ModelLoadMessage::Failed(e)) => {
                    self.orchestrator.model_loaded(Err(e));
                }
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => break,
            }
        }
        self.model = None;
    }

    fn acquire(&mut self, request: Option<AcquireRequest>) {
        self.acquisition = request.map(|r| acquisition::spawn(r, self.devices.clone()));
    }

    fn poll_acquisition(&mut self) {
        let Some(ref rx) = self.acquisition else {
            return;
        };
        match rx.try_recv() {
            Ok(acquired) => {
                let next = self.orchestrator.source_acquired(acquired);
                self.acquire(next);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                log::error!("Video source could not be opened");
                self.acquisition = None;
                self.orchestrator.stop();
            }
        }
    }

    /// Shows the bound stream directly when no detection loop draws it.
    fn refresh_preview(&mut self) {
        if self.orchestrator.is_detecting() {
            self.preview_index = None;
            return;
        }
        let Some(frame) = self.orchestrator.stream().and_then(|s| s.current_frame()) else {
            return;
        };
        if self.preview_index != Some(frame.index()) {
            self.preview_index = Some(frame.index());
            self.frame = frame_handle(&frame);
        }
    }

    fn poll_detections(&mut self) {
        let mut redraw = false;
        let mut captured = false;
        while let Ok(outcome) = self.worker.outcomes().try_recv() {
            match outcome.ticket.purpose {
                Purpose::Overlay => redraw = true,
                Purpose::Capture => captured = true,
            }
            self.orchestrator.complete(outcome);
        }
        if redraw {
            self.frame = self.orchestrator.surface().frame().and_then(frame_handle);
        }
        if captured {
            self.card_images.refresh(self.orchestrator.cards());
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let fs = self.settings.font_scale;
        let theme = self.theme();
        let controls = self.orchestrator.controls();

        let buttons = row![
            action("Start Camera", controls.start, Message::Start, fs).style(button::primary),
            action("Stop Camera", controls.stop, Message::Stop, fs).style(button::secondary),
            action("Capture Faces", controls.capture, Message::Capture, fs)
                .style(button::success),
        ]
        .spacing(10);

        let status = self.orchestrator.status();
        let palette = theme.palette();
        let status_color = if status.starts_with("Error") {
            palette.danger
        } else {
            palette.text
        };

        let body = column![
            video_view(self.orchestrator.surface(), self.frame.as_ref(), fs, &theme),
            buttons,
            text(status.to_string()).size(scaled(13.0, fs)).color(status_color),
            faces_panel(
                self.orchestrator.cards(),
                &self.card_images,
                self.hovered_card,
                fs,
                &theme,
            ),
        ]
        .spacing(14);

        let footer = row![
            text("Theme").size(scaled(12.0, fs)),
            pick_list(Appearance::ALL, Some(self.settings.appearance), |a| {
                Message::AppearanceChanged(a)
            })
            .text_size(scaled(12.0, fs)),
            checkbox(self.settings.high_contrast)
                .label("High contrast")
                .on_toggle(Message::HighContrastChanged)
                .text_size(scaled(12.0, fs)),
        ]
        .spacing(10)
        .align_y(iced::Alignment::Center);

        column![
            container(scrollable(body).height(Length::Fill))
                .padding(16)
                .height(Length::Fill),
            container(footer).padding([6, 16]),
        ]
        .height(Length::Fill)
        .into()
    }

    pub fn theme(&self) -> Theme {
        theme::resolve_theme(self.settings.appearance, self.settings.high_contrast)
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = Vec::new();

        if let Some(ticker) = self.orchestrator.ticker() {
            subscriptions.push(iced::time::every(ticker.period()).map(|_| Message::Tick));
        }
        if self.model.is_some()
            || self.acquisition.is_some()
            || self.orchestrator.stream().is_some()
        {
            subscriptions.push(iced::time::every(POLL_INTERVAL).map(|_| Message::PollWorkers));
        }
        if self.settings.appearance == Appearance::System {
            subscriptions
                .push(iced::time::every(Duration::from_secs(2)).map(|_| Message::PollSystemTheme));
        }

        Subscription::batch(subscriptions)
    }
}

fn action<'a>(
    label: &'a str,
    enabled: bool,
    message: Message,
    fs: f32,
) -> button::Button<'a, Message> {
    button(text(label).size(scaled(13.0, fs)))
        .padding([8, 16])
        .on_press_maybe(enabled.then_some(message))
}

/// Converts a packed RGB frame to an image handle for display.
fn frame_handle(frame: &Frame) -> Option<image::Handle> {
    if frame.channels() != 3 {
        return None;
    }
    let mut rgba = Vec::with_capacity(frame.data().len() / 3 * 4);
    for px in frame.data().chunks_exact(3) {
        rgba.extend_from_slice(&[px[0], px[1], px[2], 0xFF]);
    }
    Some(image::Handle::from_rgba(frame.width(), frame.height(), rgba))
}

/// Scale a base font size by the user's font_scale setting.
pub fn scaled(base: f32, font_scale: f32) -> f32 {
    (base * font_scale).round()
}
