use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use crate::capture::detection_request::{DetectionOutcome, DetectionRequest};

/// Runs detection requests on a dedicated thread, in submission order.
///
/// Outcomes arrive on [`DetectionWorker::outcomes`]; the owner feeds them
/// back into the orchestrator from its own thread.
pub struct DetectionWorker {
    requests: Option<Sender<DetectionRequest>>,
    outcomes: Receiver<DetectionOutcome>,
    handle: Option<JoinHandle<()>>,
}

impl DetectionWorker {
    pub fn spawn() -> Self {
        let (request_tx, request_rx) = crossbeam_channel::unbounded::<DetectionRequest>();
        let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded::<DetectionOutcome>();

        let handle = thread::Builder::new()
            .name("facecap-detect".into())
            .spawn(move || run(request_rx, outcome_tx))
            .map_err(|e| log::error!("Failed to start detection thread: {e}"))
            .ok();

        Self {
            requests: handle.as_ref().map(|_| request_tx),
            outcomes: outcome_rx,
            handle,
        }
    }

    /// Queues a request. Returns `false` if the worker is gone.
    pub fn submit(&self, request: DetectionRequest) -> bool {
        match self.requests {
            Some(ref tx) => tx.send(request).is_ok(),
            None => false,
        }
    }

    pub fn outcomes(&self) -> &Receiver<DetectionOutcome> {
        &self.outcomes
    }
}

impl Drop for DetectionWorker {
    fn drop(&mut self) {
        // Closing the request channel ends the loop.
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(requests: Receiver<DetectionRequest>, outcomes: Sender<DetectionOutcome>) {
    for request in requests {
        if outcomes.send(request.run()).is_err() {
            break;
        }
    }
    log::debug!("Detection thread exiting");
}
