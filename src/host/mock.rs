//! In-memory host for tests: records envelopes, settles callbacks on demand

use parking_lot::Mutex;
use serde_json::Value;

use super::{HostCallback, HostTransport, PushSink};
use crate::error::TransportError;
use crate::protocol::{Envelope, QueryId};

#[derive(Default)]
pub(crate) struct MockHost {
    sent: Mutex<Vec<Envelope>>,
    callbacks: Mutex<Vec<Option<HostCallback>>>,
    sink: Mutex<Option<PushSink>>,
    /// When set, every callback is failed inside `send`
    fail_immediately: Mutex<Option<TransportError>>,
}

impl MockHost {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing(error: TransportError) -> Self {
        let host = Self::default();
        *host.fail_immediately.lock() = Some(error);
        host
    }

    pub(crate) fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().clone()
    }

    pub(crate) fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    pub(crate) fn cancels_for(&self, query_id: &QueryId) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|envelope| envelope.is_cancel() && envelope.query_id.as_ref() == Some(query_id))
            .count()
    }

    /// Invoke the callback of the `index`-th envelope. Returns false if it was
    /// already invoked.
    pub(crate) fn complete(&self, index: usize, outcome: Result<Value, TransportError>) -> bool {
        let callback = self
            .callbacks
            .lock()
            .get_mut(index)
            .and_then(|slot| slot.take());
        match callback {
            Some(callback) => {
                callback(outcome);
                true
            }
            None => false,
        }
    }

    pub(crate) fn push(&self, query_id: &QueryId, outcome: Result<Value, TransportError>) {
        let sink = self.sink.lock().clone();
        if let Some(sink) = sink {
            sink.deliver(query_id, outcome);
        }
    }
}

impl HostTransport for MockHost {
    fn send(&self, envelope: Envelope, callback: HostCallback) {
        self.sent.lock().push(envelope);
        let failure = self.fail_immediately.lock().clone();
        match failure {
            Some(error) => {
                self.callbacks.lock().push(None);
                callback(Err(error));
            }
            None => self.callbacks.lock().push(Some(callback)),
        }
    }

    fn attach_push_sink(&self, sink: PushSink) {
        *self.sink.lock() = Some(sink);
    }
}
