use crate::{classification::Classification, error::InferenceError};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;

pub type InferenceOutcome = Result<Vec<Classification>, InferenceError>;

type Slot = Arc<Mutex<Option<oneshot::Sender<InferenceOutcome>>>>;

/// Handle an engine uses to deliver the result of one inference request.
///
/// The first settlement wins. Dropping every handle without settling
/// resolves the waiting caller with [`InferenceError::Abandoned`].
pub struct Completion {
    slot: Slot,
}

impl Completion {
    pub fn complete(self, outcome: InferenceOutcome) {
        settle(&self.slot, outcome);
    }
}

fn settle(slot: &Slot, outcome: InferenceOutcome) {
    match slot.lock().take() {
        Some(tx) => {
            // Receiver only goes away if the awaiting call was dropped.
            let _ = tx.send(outcome);
        }
        None => tracing::warn!("Inference completion settled more than once, ignoring"),
    }
}

/// Runs a callback-style `start` and waits for its single result.
///
/// An error returned by `start` settles the call unless the engine already
/// completed it.
pub async fn await_completion<F>(start: F) -> InferenceOutcome
where
    F: FnOnce(Completion) -> Result<(), InferenceError>,
{
    let (tx, rx) = oneshot::channel();
    let slot: Slot = Arc::new(Mutex::new(Some(tx)));

    let completion = Completion {
        slot: Arc::clone(&slot),
    };
    if let Err(err) = start(completion) {
        if let Some(tx) = slot.lock().take() {
            let _ = tx.send(Err(err));
        } else {
            tracing::warn!("Engine failed after completing the request: {}", err);
        }
    }
    drop(slot);

    rx.await.unwrap_or(Err(InferenceError::Abandoned))
}
