use super::{
    authority::PuzzleAuthority,
    session::{CallOutcome, PendingCall},
};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tracing::debug;

/// Runs remote calls on a background thread so the event loop never blocks
/// on the network. Outcomes are handed to `deliver` in request order.
/// Dropping the worker closes the queue; the thread exits after the call in
/// flight, if any.
pub struct RemoteWorker {
    tx: Sender<PendingCall>,
}

impl RemoteWorker {
    pub fn spawn<A, F>(authority: A, deliver: F) -> Self
    where
        A: PuzzleAuthority + 'static,
        F: Fn(CallOutcome) -> bool + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<PendingCall>();
        thread::spawn(move || {
            for call in rx {
                let outcome = call.execute(&authority);
                if !deliver(outcome) {
                    break;
                }
            }
            debug!("remote worker stopped");
        });

        Self { tx }
    }

    /// Queue a call. Returns false if the worker has gone away.
    pub fn dispatch(&self, call: PendingCall) -> bool {
        self.tx.send(call).is_ok()
    }
}
