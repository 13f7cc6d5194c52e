use std::time::Duration;

use crate::detection::domain::face_detector::SharedDetector;
use crate::video::domain::video_source::VideoSource;

/// Lifecycle of the detector: pending at startup, then settled for good.
pub enum DetectorSlot {
    Loading,
    Ready(SharedDetector),
    /// Load failed; detection stays off for the rest of the session.
    Unavailable(String),
}

impl std::fmt::Debug for DetectorSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "Loading"),
            Self::Ready(_) => write!(f, "Ready"),
            Self::Unavailable(e) => write!(f, "Unavailable({e})"),
        }
    }
}

/// Handle for the periodic detection trigger.
///
/// The session only decides whether a ticker exists and how often it
/// fires; the front end owns the actual timer and forwards each firing.
/// A fresh id is issued every time detection starts, so a timer keyed on
/// the id is recreated after a stop/start cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticker {
    id: u64,
    period: Duration,
}

impl Ticker {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

/// Mutable state for one run of the application.
pub struct Session {
    pub stream: Option<Box<dyn VideoSource>>,
    pub detector: DetectorSlot,
    pub detecting: bool,
    /// A source is being opened on behalf of this generation.
    pub acquiring: bool,
    pub ticker: Option<Ticker>,
    pub tick_in_flight: bool,
    pub capture_in_flight: bool,
    /// Bumped on every stop; outcomes from an older generation are stale.
    pub generation: u64,
    pub dropped_ticks: u64,
    next_ticker_id: u64,
}

impl Session {
    pub fn new() -> Self {
        Self {
            stream: None,
            detector: DetectorSlot::Loading,
            detecting: false,
            acquiring: false,
            ticker: None,
            tick_in_flight: false,
            capture_in_flight: false,
            generation: 0,
            dropped_ticks: 0,
            next_ticker_id: 1,
        }
    }

    pub fn detector(&self) -> Option<&SharedDetector> {
        match self.detector {
            DetectorSlot::Ready(ref detector) => Some(detector),
            _ => None,
        }
    }

    pub fn issue_ticker(&mut self, period: Duration) -> Ticker {
        let ticker = Ticker {
            id: self.next_ticker_id,
            period,
        };
        self.next_ticker_id += 1;
        self.ticker = Some(ticker);
        ticker
    }

    /// Ends every track of the bound stream and detaches it.
    /// Returns whether anything was released.
    pub fn release_stream(&mut self) -> bool {
        match self.stream.take() {
            Some(mut stream) => {
                stream.stop();
                true
            }
            None => false,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
