use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// How much of the stream a source has decoded so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing,
    /// Dimensions are known but no frame is decoded yet.
    HaveMetadata,
    /// A current frame is decoded and can be read.
    HaveEnoughData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Live,
    Ended,
}

/// A live or looping video feed bound to the session.
///
/// Sources own whatever hardware or decoder they were opened with until
/// [`VideoSource::stop`] ends every track.
pub trait VideoSource: Send {
    /// Native stream properties, once known.
    fn metadata(&self) -> Option<VideoMetadata>;

    fn ready_state(&self) -> ReadyState;

    /// The most recently decoded frame, if any.
    fn current_frame(&self) -> Option<Frame>;

    fn track_states(&self) -> Vec<TrackState>;

    /// Ends every track and releases the underlying device. Idempotent.
    fn stop(&mut self);

    /// True for the pre-recorded fallback, which rewinds at end of stream.
    fn is_looping(&self) -> bool;
}
