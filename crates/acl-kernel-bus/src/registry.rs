//! Correlation registry.
//!
//! Maps outstanding correlation ids to the completion handle of the caller
//! waiting for that ack. A handle is registered before its request is
//! dispatched so an ack can never arrive for an unknown request.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use crate::messages::{Ack, CorrelationId};

/// Outstanding requests awaiting an ack.
#[derive(Default)]
pub struct Registry {
    pending: Mutex<HashMap<CorrelationId, oneshot::Sender<Ack>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<CorrelationId, oneshot::Sender<Ack>>> {
        // The map stays consistent even if a holder panicked.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a fresh correlation id and return the receiving half.
    pub fn register(&self) -> (CorrelationId, oneshot::Receiver<Ack>) {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending();

        let mut correlation = CorrelationId::new();
        while pending.contains_key(&correlation) {
            correlation = CorrelationId::new();
        }
        pending.insert(correlation, tx);

        (correlation, rx)
    }

    /// Deliver an ack to its waiter.
    ///
    /// Returns false when nobody is waiting for this correlation id.
    pub fn complete(&self, ack: Ack) -> bool {
        let Some(tx) = self.pending().remove(&ack.correlation) else {
            return false;
        };
        // The waiter may have given up; that is not an error here.
        tx.send(ack).is_ok()
    }

    /// Forget a correlation id whose request never reached the dispatcher.
    pub fn cancel(&self, correlation: &CorrelationId) {
        self.pending().remove(correlation);
    }

    /// Number of requests still awaiting an ack.
    pub fn outstanding(&self) -> usize {
        self.pending().len()
    }
}
