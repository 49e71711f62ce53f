//! Streaming query lifecycle
//!
//! Per subscription: Created (observer registered, empty batch queued before
//! the host is contacted) → Active (start envelope sent, pushes delivered in
//! host order) → Cancelled (terminal, one teardown envelope, later pushes
//! dropped). Cancelled subscriptions are removed from the map; ids are never
//! reused, so a missing entry reads as Cancelled.
//!
//! Change feeds (`open_watch`) share the lifecycle but deliver each pushed
//! value as is, with no empty first batch, and tear down with their own
//! envelope instead of `cancelQuery`.

use futures::channel::mpsc;
use futures::Stream;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use tracing::{debug, info, trace, warn};

use super::decoder::{FieldSchema, Record};
use crate::error::{BridgeError, DecodeError, TransportError};
use crate::host::{HostTransport, PushSink};
use crate::protocol::{Envelope, QueryId};

/// One batch delivered to a query subscriber
pub type Batch = Result<Vec<Record>, BridgeError>;

/// One value delivered to a change-feed subscriber
pub type Change = Result<Value, BridgeError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriptionState {
    Created,
    Active,
    Cancelled,
}

enum Feed {
    Records {
        schema: FieldSchema,
        tx: mpsc::UnboundedSender<Batch>,
    },
    Values {
        tx: mpsc::UnboundedSender<Change>,
    },
}

impl Feed {
    fn deliver(&self, query_id: &QueryId, data: Value) -> Result<(), DecodeError> {
        let sent = match self {
            Feed::Records { schema, tx } => {
                let records = schema.decode_rows(&data)?;
                trace!(query_id = %query_id, count = records.len(), "Delivering push");
                tx.unbounded_send(Ok(records)).is_ok()
            }
            Feed::Values { tx } => {
                trace!(query_id = %query_id, "Delivering change");
                tx.unbounded_send(Ok(data)).is_ok()
            }
        };
        if !sent {
            debug!(query_id = %query_id, "Subscriber receiver already gone");
        }
        Ok(())
    }

    fn fail(self, error: BridgeError) {
        match self {
            Feed::Records { tx, .. } => {
                let _ = tx.unbounded_send(Err(error));
            }
            Feed::Values { tx } => {
                let _ = tx.unbounded_send(Err(error));
            }
        }
    }
}

struct ActiveQuery {
    op: String,
    state: SubscriptionState,
    feed: Feed,
    teardown: Envelope,
}

pub struct SubscriptionManager {
    host: Arc<dyn HostTransport>,
    active: Mutex<HashMap<QueryId, ActiveQuery>>,
}

impl SubscriptionManager {
    pub fn new(host: Arc<dyn HostTransport>) -> Arc<Self> {
        let manager = Arc::new(Self {
            host,
            active: Mutex::new(HashMap::new()),
        });
        manager
            .host
            .attach_push_sink(PushSink::new(Arc::downgrade(&manager)));
        manager
    }

    /// Register a subscriber, queue its empty first batch, then send `start`
    pub fn open(self: &Arc<Self>, start: Envelope, schema: FieldSchema) -> Subscription {
        let (tx, rx) = mpsc::unbounded();
        let query_id = start_query_id(&start);

        // Receiver is alive, so this cannot fail
        let _ = tx.unbounded_send(Ok(Vec::new()));

        let teardown = Envelope::cancel_query(query_id.clone());
        self.activate(start, query_id, Feed::Records { schema, tx }, teardown, rx)
    }

    /// Register a change-feed subscriber, then send `start`
    ///
    /// A non-null start reply is the current value; every push after it is a
    /// change. `teardown` is sent exactly once when the feed is cancelled.
    pub fn open_watch(
        self: &Arc<Self>,
        start: Envelope,
        teardown: Envelope,
    ) -> Subscription<Value> {
        let (tx, rx) = mpsc::unbounded();
        let query_id = start_query_id(&start);
        self.activate(start, query_id, Feed::Values { tx }, teardown, rx)
    }

    fn activate<T>(
        self: &Arc<Self>,
        start: Envelope,
        query_id: QueryId,
        feed: Feed,
        teardown: Envelope,
        rx: mpsc::UnboundedReceiver<Result<T, BridgeError>>,
    ) -> Subscription<T> {
        self.active.lock().insert(
            query_id.clone(),
            ActiveQuery {
                op: start.op.clone(),
                state: SubscriptionState::Created,
                feed,
                teardown,
            },
        );
        info!(query_id = %query_id, op = %start.op, "Opening subscription");

        let manager = Arc::downgrade(self);
        let callback_id = query_id.clone();
        self.host.send(
            start,
            Box::new(move |outcome| {
                let Some(manager) = manager.upgrade() else {
                    return;
                };
                match outcome {
                    Ok(Value::Null) => trace!(query_id = %callback_id, "Host acknowledged subscription"),
                    other => manager.dispatch(&callback_id, other),
                }
            }),
        );

        // The host may have failed synchronously inside send
        if let Some(entry) = self.active.lock().get_mut(&query_id) {
            if entry.state == SubscriptionState::Created {
                entry.state = SubscriptionState::Active;
            }
        }

        Subscription {
            query_id,
            rx,
            manager: Arc::downgrade(self),
        }
    }

    /// Route one host push to its subscriber
    pub fn dispatch(&self, query_id: &QueryId, outcome: Result<Value, TransportError>) {
        let data = match outcome {
            Ok(data) => data,
            Err(error) => {
                self.fail(query_id, error.into());
                return;
            }
        };

        let delivered = {
            let active = self.active.lock();
            let Some(entry) = active.get(query_id) else {
                debug!(query_id = %query_id, "Dropping push for cancelled or unknown subscription");
                return;
            };
            entry.feed.deliver(query_id, data)
        };

        if let Err(error) = delivered {
            self.fail(query_id, error.into());
        }
    }

    /// Cancel a subscription. Sends the teardown envelope only on the first call.
    pub fn cancel(&self, query_id: &QueryId) -> bool {
        let removed = self.active.lock().remove(query_id);
        match removed {
            Some(entry) => {
                info!(query_id = %query_id, op = %entry.op, "Cancelling subscription");
                drop(entry.feed);
                self.send_teardown(query_id, entry.teardown);
                true
            }
            None => false,
        }
    }

    pub fn state(&self, query_id: &QueryId) -> SubscriptionState {
        self.active
            .lock()
            .get(query_id)
            .map_or(SubscriptionState::Cancelled, |entry| entry.state)
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// Surface an error once, then cancel
    fn fail(&self, query_id: &QueryId, error: BridgeError) {
        let removed = self.active.lock().remove(query_id);
        let Some(entry) = removed else {
            debug!(query_id = %query_id, error = %error, "Dropping failure for cancelled query");
            return;
        };

        warn!(
            query_id = %query_id,
            op = %entry.op,
            error = %error,
            error_kind = error.kind(),
            "Subscription failed"
        );
        entry.feed.fail(error);
        self.send_teardown(query_id, entry.teardown);
    }

    fn send_teardown(&self, query_id: &QueryId, teardown: Envelope) {
        let id = query_id.clone();
        self.host.send(
            teardown,
            Box::new(move |outcome| {
                if let Err(error) = outcome {
                    debug!(query_id = %id, error = %error, "Host rejected teardown");
                }
            }),
        );
    }
}

fn start_query_id(start: &Envelope) -> QueryId {
    match start.query_id.clone() {
        Some(id) => id,
        None => {
            warn!(op = %start.op, "Start envelope without queryId, generating one");
            QueryId::generate()
        }
    }
}

/// Handle to one streaming query or change feed
///
/// A query yields an empty batch first, then one batch per host push. A
/// change feed yields each value the host sends. Dropping the handle cancels.
#[must_use = "dropping a subscription cancels it"]
pub struct Subscription<T = Vec<Record>> {
    query_id: QueryId,
    rx: mpsc::UnboundedReceiver<Result<T, BridgeError>>,
    manager: Weak<SubscriptionManager>,
}

impl<T> Subscription<T> {
    pub fn query_id(&self) -> &QueryId {
        &self.query_id
    }

    pub fn state(&self) -> SubscriptionState {
        self.manager
            .upgrade()
            .map_or(SubscriptionState::Cancelled, |manager| {
                manager.state(&self.query_id)
            })
    }

    pub fn cancel(self) {
        // Drop does the work
    }
}

impl<T> Stream for Subscription<T> {
    type Item = Result<T, BridgeError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx).poll_next(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.cancel(&self.query_id);
        }
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("query_id", &self.query_id)
            .finish()
    }
}
