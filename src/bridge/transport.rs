//! Transport adapter: one-shot calls and streams on top of the host primitive

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

use super::decoder::FieldSchema;
use super::registry::{CorrelationRegistry, PendingReply};
use super::subscriptions::{Subscription, SubscriptionManager};
use crate::error::BridgeError;
use crate::host::HostTransport;
use crate::protocol::{log_preview, Envelope, QueryDescriptor};

pub struct Transport {
    host: Arc<dyn HostTransport>,
    registry: Arc<CorrelationRegistry>,
    subscriptions: Arc<SubscriptionManager>,
}

impl Transport {
    pub fn new(host: Arc<dyn HostTransport>) -> Self {
        let subscriptions = SubscriptionManager::new(Arc::clone(&host));
        Self {
            host,
            registry: Arc::new(CorrelationRegistry::new()),
            subscriptions,
        }
    }

    /// Send `{type, payload, correlationId}` and settle when the host calls back
    ///
    /// No timeout: a host that never answers leaves the future pending.
    pub fn call(&self, op: &str, payload: Value) -> PendingReply {
        let (correlation_id, reply) = self.registry.register(op);
        let envelope = Envelope::call(op, payload, correlation_id.clone());

        if tracing::enabled!(tracing::Level::DEBUG) {
            let raw = serde_json::to_string(&envelope.payload).unwrap_or_default();
            let (preview, raw_len) = log_preview(&raw);
            debug!(
                correlation_id = %correlation_id,
                op,
                payload_preview = %preview,
                payload_len = raw_len,
                "Sending call envelope"
            );
        }

        let registry = Arc::clone(&self.registry);
        self.host.send(
            envelope,
            Box::new(move |outcome| {
                match outcome {
                    Ok(result) => registry.resolve(&correlation_id, result),
                    Err(error) => registry.reject(&correlation_id, error),
                };
            }),
        );
        reply
    }

    /// Open an independent streaming query
    ///
    /// Every call gets a fresh query id, even for identical descriptors.
    pub fn open_stream(
        &self,
        op: &str,
        descriptor: &QueryDescriptor,
        schema: FieldSchema,
    ) -> Result<Subscription, BridgeError> {
        let query_id = self.registry.issue_query_id();
        let start = Envelope::start_query(op, descriptor, query_id).map_err(|e| {
            error!(op, error = %e, "Failed to build start envelope");
            BridgeError::from(e)
        })?;
        Ok(self.subscriptions.open(start, schema))
    }

    /// Open a change feed; `stop_op` names the teardown envelope
    pub fn open_watch(&self, op: &str, payload: Value, stop_op: &str) -> Subscription<Value> {
        let query_id = self.registry.issue_query_id();
        let start = Envelope::watch(op, payload, query_id.clone());
        let teardown = Envelope::unwatch(stop_op, query_id);
        self.subscriptions.open_watch(start, teardown)
    }

    pub fn registry(&self) -> &CorrelationRegistry {
        &self.registry
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }
}
