pub mod ffmpeg_media_devices;
pub mod ffmpeg_stream;
