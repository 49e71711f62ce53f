//! The injected host transport seam
//!
//! The bridge only assumes one asynchronous primitive: `send(envelope,
//! callback)`, whose callback fires at most once, plus a channel for
//! unsolicited pushes tagged by query id. [`ProcessHost`] implements it over
//! a child process speaking JSONL.

mod process;

#[cfg(test)]
pub(crate) mod mock;

pub use process::ProcessHost;

use serde_json::Value;
use std::sync::Weak;
use tracing::debug;

use crate::bridge::SubscriptionManager;
use crate::error::TransportError;
use crate::protocol::{Envelope, QueryId};

/// Completion for one envelope. Invoked at most once.
pub type HostCallback = Box<dyn FnOnce(Result<Value, TransportError>) + Send + 'static>;

pub trait HostTransport: Send + Sync {
    /// Hand an envelope to the host
    fn send(&self, envelope: Envelope, callback: HostCallback);

    /// Give the transport the sink it delivers query pushes to
    fn attach_push_sink(&self, sink: PushSink);
}

/// Where a transport delivers pushes for active queries
///
/// Holds the subscription manager weakly; once the bridge is gone, delivery
/// is a no-op.
#[derive(Clone)]
pub struct PushSink {
    subscriptions: Weak<SubscriptionManager>,
}

impl PushSink {
    pub(crate) fn new(subscriptions: Weak<SubscriptionManager>) -> Self {
        Self { subscriptions }
    }

    pub fn deliver(&self, query_id: &QueryId, outcome: Result<Value, TransportError>) {
        match self.subscriptions.upgrade() {
            Some(subscriptions) => subscriptions.dispatch(query_id, outcome),
            None => debug!(query_id = %query_id, "Dropping push, bridge is gone"),
        }
    }
}
