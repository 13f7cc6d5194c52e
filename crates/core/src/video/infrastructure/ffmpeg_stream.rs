use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::media_devices::CameraError;
use crate::video::domain::video_source::{ReadyState, TrackState, VideoSource};

// errno values carried by AVERROR codes; identical across the C runtimes
// ffmpeg builds against.
const EPERM: i32 = 1;
const ENOENT: i32 = 2;
const EACCES: i32 = 13;
const EBUSY: i32 = 16;
const ENODEV: i32 = 19;

/// What to open and how.
#[derive(Debug, Clone)]
pub struct OpenRequest {
    /// Device path, device index, file path or URL.
    pub location: String,
    /// libavdevice input format (`video4linux2`, `avfoundation`, ...);
    /// `None` lets libavformat probe a file or URL.
    pub device_format: Option<String>,
    /// Demuxer options such as `video_size` and `framerate`.
    pub options: Vec<(String, String)>,
    pub looping: bool,
}

/// Frames decoded by the worker thread, read by the session.
struct Shared {
    latest: Mutex<Option<Frame>>,
    stop: AtomicBool,
    ended: AtomicBool,
}

/// A video source decoded by ffmpeg on its own thread.
///
/// The thread keeps only the newest RGB frame; readers always see the
/// current picture, never a backlog. Looping sources rewind at end of
/// stream and pace themselves to the native frame rate. Audio streams are
/// never decoded.
pub struct FfmpegStream {
    metadata: VideoMetadata,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    looping: bool,
}

impl FfmpegStream {
    /// Opens the input on a fresh decode thread and waits until the
    /// stream has described itself.
    pub fn open(request: OpenRequest) -> Result<Self, CameraError> {
        let shared = Arc::new(Shared {
            latest: Mutex::new(None),
            stop: AtomicBool::new(false),
            ended: AtomicBool::new(false),
        });
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<VideoMetadata, CameraError>>(1);

        let looping = request.looping;
        let thread_shared = shared.clone();
        let worker = thread::Builder::new()
            .name("facecap-video".into())
            .spawn(move || {
                let mut decoder = match Decoder::open(&request) {
                    Ok(decoder) => decoder,
                    Err(e) => {
                        thread_shared.ended.store(true, Ordering::Release);
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(decoder.metadata.clone()));
                if let Err(e) = decoder.run(&thread_shared, request.looping) {
                    log::warn!("Video decode stopped: {e}");
                }
                thread_shared.ended.store(true, Ordering::Release);
            })
            .map_err(|e| CameraError::Open(e.to_string()))?;

        let metadata = match ready_rx.recv() {
            Ok(Ok(metadata)) => metadata,
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(CameraError::Open("video thread exited during open".into()));
            }
        };

        log::info!(
            "Opened {} at {}x{} @ {:.1} fps",
            metadata.source,
            metadata.width,
            metadata.height,
            metadata.fps
        );

        Ok(Self {
            metadata,
            shared,
            worker: Some(worker),
            looping,
        })
    }
}

impl VideoSource for FfmpegStream {
    fn metadata(&self) -> Option<VideoMetadata> {
        if self.worker.is_none() {
            return None;
        }
        Some(self.metadata.clone())
    }

    fn ready_state(&self) -> ReadyState {
        if self.worker.is_none() {
            return ReadyState::HaveNothing;
        }
        match self.shared.latest.lock() {
            Ok(latest) if latest.is_some() => ReadyState::HaveEnoughData,
            _ => ReadyState::HaveMetadata,
        }
    }

    fn current_frame(&self) -> Option<Frame> {
        if self.worker.is_none() {
            return None;
        }
        self.shared.latest.lock().ok()?.clone()
    }

    fn track_states(&self) -> Vec<TrackState> {
        if self.worker.is_none() || self.shared.ended.load(Ordering::Acquire) {
            vec![TrackState::Ended]
        } else {
            vec![TrackState::Live]
        }
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.shared.stop.store(true, Ordering::Release);
        if worker.join().is_err() {
            log::error!("Video thread for {} panicked", self.metadata.source);
        }
        self.shared.ended.store(true, Ordering::Release);
        if let Ok(mut latest) = self.shared.latest.lock() {
            *latest = None;
        }
        log::info!("Released {}", self.metadata.source);
    }

    fn is_looping(&self) -> bool {
        self.looping
    }
}

impl Drop for FfmpegStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Everything the decode thread owns. Lives and dies on that thread.
struct Decoder {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    metadata: VideoMetadata,
    frame_index: usize,
}

impl Decoder {
    fn open(request: &OpenRequest) -> Result<Self, CameraError> {
        ffmpeg_next::init().map_err(|e| CameraError::Open(e.to_string()))?;

        let ictx = open_input(request)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CameraError::Open("no video stream found".into()))?;
        let stream_index = stream.index();
        let rate = stream.avg_frame_rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| CameraError::Open(e.to_string()))?;
        let decoder = codec_ctx
            .decoder()
            .video()
            .map_err(|e| CameraError::Open(e.to_string()))?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| CameraError::Open(e.to_string()))?;

        Ok(Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            metadata: VideoMetadata {
                width,
                height,
                fps,
                source: request.location.clone(),
            },
            frame_index: 0,
        })
    }

    fn run(&mut self, shared: &Shared, looping: bool) -> Result<(), ffmpeg_next::Error> {
        let interval = self.metadata.frame_interval();
        let mut next_due = Instant::now();

        while !shared.stop.load(Ordering::Acquire) {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                if !looping {
                    return Ok(());
                }
                self.ictx.seek(0, ..)?;
                self.decoder.flush();
                continue;
            };

            if stream.index() != self.stream_index {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }

            let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
                self.scaler.run(&decoded, &mut rgb)?;
                let pixels = extract_rgb_pixels(&rgb, self.metadata.width, self.metadata.height);
                let frame = Frame::new(
                    pixels,
                    self.metadata.width,
                    self.metadata.height,
                    3,
                    self.frame_index,
                );
                self.frame_index += 1;

                if let Ok(mut latest) = shared.latest.lock() {
                    *latest = Some(frame);
                }

                // Files decode faster than real time; cameras block on the device.
                if looping {
                    next_due += interval;
                    let now = Instant::now();
                    if next_due > now {
                        thread::sleep(next_due - now);
                    } else {
                        next_due = now;
                    }
                }
            }
        }
        Ok(())
    }
}

fn open_input(request: &OpenRequest) -> Result<ffmpeg_next::format::context::Input, CameraError> {
    let Some(ref format_name) = request.device_format else {
        return ffmpeg_next::format::input(&request.location).map_err(classify);
    };

    ffmpeg_next::device::register_all();
    let format = ffmpeg_next::device::input::video()
        .find(|f| f.name().split(',').any(|n| n == format_name))
        .ok_or(CameraError::NotFound)?;

    let mut options = ffmpeg_next::Dictionary::new();
    for (key, value) in &request.options {
        options.set(key, value);
    }

    let format = ffmpeg_next::format::Format::Input(format);
    let ctx = match ffmpeg_next::format::open_with(&request.location, &format, options) {
        Ok(ctx) => ctx,
        Err(e) => match classify(e) {
            CameraError::Open(reason) if !request.options.is_empty() => {
                // The hints are preferences; let the device pick its own mode.
                log::info!("Device rejected capture hints ({reason}), retrying with defaults");
                ffmpeg_next::format::open_with(
                    &request.location,
                    &format,
                    ffmpeg_next::Dictionary::new(),
                )
                .map_err(classify)?
            }
            other => return Err(other),
        },
    };

    match ctx {
        ffmpeg_next::format::context::Context::Input(input) => Ok(input),
        ffmpeg_next::format::context::Context::Output(_) => {
            Err(CameraError::Open("device opened as output".into()))
        }
    }
}

fn classify(error: ffmpeg_next::Error) -> CameraError {
    match error {
        ffmpeg_next::Error::Other { errno } => classify_errno(errno)
            .unwrap_or_else(|| CameraError::Open(error.to_string())),
        other => CameraError::Open(other.to_string()),
    }
}

fn classify_errno(errno: i32) -> Option<CameraError> {
    match errno {
        ENOENT | ENODEV => Some(CameraError::NotFound),
        EPERM | EACCES => Some(CameraError::PermissionDenied),
        EBUSY => Some(CameraError::Busy),
        _ => None,
    }
}

/// Copies an ffmpeg RGB24 frame into a tightly packed buffer, dropping the
/// per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}
