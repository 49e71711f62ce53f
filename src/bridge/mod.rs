//! The bridge between capability calls and the native host
//!
//! A [`Bridge`] holds one strategy, chosen at construction from the process
//! [`Mode`]:
//! - `Live`: requests go through the [`Transport`] to the host
//! - `Demo`: requests are answered from a [`FixtureProvider`]
//! - `Unsupported`: requests resolve to nothing, streams emit nothing
//!
//! # Module Structure
//!
//! - `registry`: correlation ids and pending one-shot completions
//! - `transport`: the adapter over the injected host primitive
//! - `subscriptions`: streaming query lifecycle
//! - `decoder`: positional replies → keyed records
//! - `mode`: live/demo/unsupported resolution
//! - `fixtures`: demo data

mod decoder;
mod fixtures;
mod mode;
mod registry;
mod subscriptions;
mod transport;

pub use decoder::*;
pub use fixtures::*;
pub use mode::*;
pub use registry::*;
pub use subscriptions::*;
pub use transport::*;

use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{debug, trace};

use crate::error::{BridgeError, Result};
use crate::host::HostTransport;
use crate::protocol::{QueryDescriptor, QueryId, SPOTLIGHT_QUERY};

type ReshapeStep = Box<dyn FnOnce(Value) -> Result<Value> + Send>;

/// One-shot operation: host op, payload, fixture key and live-reply reshaping
pub struct Request {
    op: String,
    payload: Value,
    fixture: Option<String>,
    reshape: Vec<ReshapeStep>,
}

impl Request {
    pub fn new(op: impl Into<String>, payload: Value) -> Self {
        Self {
            op: op.into(),
            payload,
            fixture: None,
            reshape: Vec::new(),
        }
    }

    /// Fixture key used in demo mode (defaults to the op name)
    pub fn fixture(mut self, key: impl Into<String>) -> Self {
        self.fixture = Some(key.into());
        self
    }

    /// Transform the live host reply. Steps run in the order added.
    /// Fixture values are already in final shape and skip these steps.
    pub fn reshape<F>(mut self, step: F) -> Self
    where
        F: FnOnce(Value) -> Result<Value> + Send + 'static,
    {
        self.reshape.push(Box::new(step));
        self
    }

    /// Decode the live reply into a list of keyed records
    pub fn decode(self, schema: FieldSchema, layout: Layout) -> Self {
        self.reshape(move |reply| Ok(records_to_value(schema.decode(layout, &reply)?)))
    }

    pub fn op(&self) -> &str {
        &self.op
    }

    pub fn fixture_key(&self) -> &str {
        self.fixture.as_deref().unwrap_or(&self.op)
    }

    fn apply_reshape(self, reply: Value) -> Result<Value> {
        self.reshape.into_iter().try_fold(reply, |value, step| step(value))
    }
}

/// Streaming operation over the file index
#[derive(Clone, Debug)]
pub struct QueryRequest {
    op: String,
    descriptor: QueryDescriptor,
    schema: FieldSchema,
    fixture: String,
}

impl QueryRequest {
    /// `schema` names the output keys, one per descriptor attribute, in order
    pub fn new(fixture: impl Into<String>, descriptor: QueryDescriptor, schema: FieldSchema) -> Self {
        Self {
            op: SPOTLIGHT_QUERY.to_string(),
            descriptor,
            schema,
            fixture: fixture.into(),
        }
    }

    pub fn op(mut self, op: impl Into<String>) -> Self {
        self.op = op.into();
        self
    }

    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }
}

/// Change feed: the current value, then every change until dropped
#[derive(Clone, Debug)]
pub struct WatchRequest {
    op: String,
    stop_op: String,
    payload: Value,
    fixture: String,
}

impl WatchRequest {
    /// `op` opens the feed on the host, `stop_op` closes it
    pub fn new(op: impl Into<String>, stop_op: impl Into<String>, payload: Value) -> Self {
        let op = op.into();
        Self {
            fixture: op.clone(),
            op,
            stop_op: stop_op.into(),
            payload,
        }
    }

    /// Fixture key used in demo mode (defaults to the op name)
    pub fn fixture(mut self, key: impl Into<String>) -> Self {
        self.fixture = key.into();
        self
    }
}

enum Strategy {
    Live(Transport),
    Demo(Arc<dyn FixtureProvider>),
    Unsupported,
}

pub struct Bridge {
    strategy: Strategy,
}

impl Bridge {
    pub fn live(host: Arc<dyn HostTransport>) -> Self {
        Self {
            strategy: Strategy::Live(Transport::new(host)),
        }
    }

    pub fn demo(fixtures: Arc<dyn FixtureProvider>) -> Self {
        Self {
            strategy: Strategy::Demo(fixtures),
        }
    }

    pub fn unsupported() -> Self {
        Self {
            strategy: Strategy::Unsupported,
        }
    }

    pub fn mode(&self) -> Mode {
        match self.strategy {
            Strategy::Live(_) => Mode::Live,
            Strategy::Demo(_) => Mode::Demo,
            Strategy::Unsupported => Mode::Unsupported,
        }
    }

    /// The live transport, if this bridge talks to a host
    pub fn transport(&self) -> Option<&Transport> {
        match &self.strategy {
            Strategy::Live(transport) => Some(transport),
            _ => None,
        }
    }

    /// Issue a one-shot request
    ///
    /// `Ok(None)` means there is nothing to return: unsupported mode, or demo
    /// mode without a declared fixture.
    pub async fn call(&self, request: Request) -> Result<Option<Value>> {
        match &self.strategy {
            Strategy::Live(transport) => {
                let reply = transport.call(&request.op, request.payload.clone()).await?;
                request.apply_reshape(reply).map(Some)
            }
            Strategy::Demo(fixtures) => {
                trace!(op = %request.op, fixture = request.fixture_key(), "Serving fixture");
                Ok(fixtures.value(request.fixture_key()))
            }
            Strategy::Unsupported => {
                trace!(op = %request.op, "Operation unsupported on this platform");
                Ok(None)
            }
        }
    }

    /// `call` followed by deserialization into `T`
    pub async fn call_as<T: DeserializeOwned>(&self, request: Request) -> Result<Option<T>> {
        match self.call(request).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// `call` for operations whose result is irrelevant
    pub async fn fire(&self, request: Request) -> Result<()> {
        self.call(request).await.map(|_| ())
    }

    /// Open a streaming query
    pub fn query(&self, request: QueryRequest) -> Result<QueryStream> {
        let source = match &self.strategy {
            Strategy::Live(transport) => StreamSource::Live(transport.open_stream(
                &request.op,
                &request.descriptor,
                request.schema,
            )?),
            Strategy::Demo(fixtures) => {
                debug!(fixture = %request.fixture, "Serving fixture stream");
                let records = fixtures.records(&request.fixture).unwrap_or_default();
                StreamSource::Fixture(vec![Vec::new(), records].into_iter())
            }
            Strategy::Unsupported => StreamSource::Empty,
        };
        Ok(QueryStream { source })
    }

    /// Open a change feed
    ///
    /// Demo emits the fixture once and ends; unsupported emits nothing.
    pub fn watch(&self, request: WatchRequest) -> BoxStream<'static, Result<Value>> {
        match &self.strategy {
            Strategy::Live(transport) => transport
                .open_watch(&request.op, request.payload, &request.stop_op)
                .boxed(),
            Strategy::Demo(fixtures) => {
                debug!(fixture = %request.fixture, "Serving fixture feed");
                stream::iter(fixtures.value(&request.fixture).map(Ok)).boxed()
            }
            Strategy::Unsupported => stream::empty().boxed(),
        }
    }
}

enum StreamSource {
    Live(Subscription),
    /// Empty batch, then the fixture
    Fixture(std::vec::IntoIter<Vec<Record>>),
    Empty,
}

/// Batches of records from a query, whatever the mode
pub struct QueryStream {
    source: StreamSource,
}

impl QueryStream {
    /// Query id of the live subscription, if any
    pub fn query_id(&self) -> Option<&QueryId> {
        match &self.source {
            StreamSource::Live(subscription) => Some(subscription.query_id()),
            _ => None,
        }
    }

    pub fn cancel(self) {
        if let StreamSource::Live(subscription) = self.source {
            subscription.cancel();
        }
    }

    /// Batches deserialized into `T`
    pub fn typed<T>(self) -> BoxStream<'static, Result<Vec<T>>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.map(|batch| batch.and_then(decode_as::<T>)).boxed()
    }
}

impl Stream for QueryStream {
    type Item = std::result::Result<Vec<Record>, BridgeError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match &mut self.source {
            StreamSource::Live(subscription) => Pin::new(subscription).poll_next(cx),
            StreamSource::Fixture(batches) => Poll::Ready(batches.next().map(Ok)),
            StreamSource::Empty => Poll::Ready(None),
        }
    }
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
