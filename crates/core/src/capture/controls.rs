/// Enabled state of the three user actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub start: bool,
    pub stop: bool,
    pub capture: bool,
}

impl Controls {
    /// Everything off; the state while the model is still loading.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// No stream bound. Start is offered only once a detector exists.
    pub fn initial(detector_ready: bool) -> Self {
        Self {
            start: detector_ready,
            stop: false,
            capture: false,
        }
    }

    /// A camera or sample is being opened; only Stop is offered.
    pub fn acquiring() -> Self {
        Self {
            start: false,
            stop: true,
            capture: false,
        }
    }

    pub fn streaming() -> Self {
        Self {
            start: false,
            stop: true,
            capture: true,
        }
    }
}
