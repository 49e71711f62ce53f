//! Correlation registry: generated ids mapped to pending one-shot completions.
//!
//! A slot is removed on exactly one of resolve/reject. Lookups that miss
//! (unknown or already consumed ids) are ignored: stale host replies can
//! arrive after cleanup.

use futures::channel::oneshot;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, trace};

use crate::error::{BridgeError, TransportError};
use crate::protocol::{CorrelationId, QueryId};

type Outcome = Result<Value, TransportError>;

struct PendingCall {
    kind: String,
    tx: oneshot::Sender<Outcome>,
}

#[derive(Default)]
pub struct CorrelationRegistry {
    pending: Mutex<HashMap<CorrelationId, PendingCall>>,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a correlation id and a completion slot for it
    pub fn register(&self, kind: &str) -> (CorrelationId, PendingReply) {
        let id = CorrelationId::generate();
        let (tx, rx) = oneshot::channel();

        let previous = self.pending.lock().insert(
            id.clone(),
            PendingCall {
                kind: kind.to_string(),
                tx,
            },
        );
        debug_assert!(previous.is_none(), "correlation id reused");

        trace!(correlation_id = %id, kind, "Registered pending call");
        (
            id.clone(),
            PendingReply {
                correlation_id: id,
                rx,
            },
        )
    }

    /// Allocate a query id for a streaming subscription
    ///
    /// Query ids have no completion slot here; the subscription manager owns them.
    pub fn issue_query_id(&self) -> QueryId {
        QueryId::generate()
    }

    pub fn resolve(&self, id: &CorrelationId, result: Value) -> bool {
        self.settle(id, Ok(result))
    }

    pub fn reject(&self, id: &CorrelationId, error: TransportError) -> bool {
        self.settle(id, Err(error))
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    fn settle(&self, id: &CorrelationId, outcome: Outcome) -> bool {
        // Lock is released before the continuation runs
        let slot = self.pending.lock().remove(id);
        match slot {
            Some(PendingCall { kind, tx }) => {
                debug!(
                    correlation_id = %id,
                    kind = %kind,
                    ok = outcome.is_ok(),
                    "Settling pending call"
                );
                if tx.send(outcome).is_err() {
                    trace!(correlation_id = %id, "Caller dropped before reply arrived");
                }
                true
            }
            None => {
                debug!(correlation_id = %id, "Ignoring reply for unknown or settled call");
                false
            }
        }
    }
}

/// Future settling when the registry resolves or rejects its id
///
/// Never times out: if the host never calls back this stays pending.
#[must_use = "futures do nothing unless polled"]
pub struct PendingReply {
    correlation_id: CorrelationId,
    rx: oneshot::Receiver<Outcome>,
}

impl PendingReply {
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }
}

impl Future for PendingReply {
    type Output = Result<Value, BridgeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome.map_err(BridgeError::from)),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(BridgeError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}
