//! Envelope and identifier types shared by the bridge and every host transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Operation name of the envelope that tears down a streaming query
pub const CANCEL_QUERY: &str = "cancelQuery";

/// Operation name of the file-index query stream
pub const SPOTLIGHT_QUERY: &str = "spotlightQuery";

/// Operation name of the envelope that opens a configuration change feed
pub const SUBSCRIBE_TO_CHANGES: &str = "subscribeToChanges";

/// Operation name of the envelope that closes a configuration change feed
pub const REMOVE_CHANGE_SUBSCRIPTION: &str = "removeChangeSubscription";

/// Identifier matching a one-shot host reply back to its caller
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier tagging every push that belongs to one streaming subscription
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(Uuid);

impl QueryId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameters of a streaming file-index query. Immutable once built.
///
/// Queries always run with live updates; the start envelope sets
/// `liveUpdate: true`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDescriptor {
    pub query: String,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub directories: Vec<String>,
    /// 0 means unlimited
    #[serde(default)]
    pub limit: u32,
}

impl QueryDescriptor {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            attributes: Vec::new(),
            directories: Vec::new(),
            limit: 0,
        }
    }

    pub fn attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn directories<I, S>(mut self, directories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.directories = directories.into_iter().map(Into::into).collect();
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

/// Host-bound message
///
/// # Example
/// ```json
/// {"type":"applescript","payload":{"script":"beep"},"correlationId":"5b0c..."}
/// {"type":"spotlightQuery","payload":{"query":"...","attributes":[],"directories":[],"limit":0,"liveUpdate":true},"queryId":"9f2e...","liveUpdate":true}
/// {"type":"cancelQuery","payload":{"queryId":"9f2e..."},"queryId":"9f2e..."}
/// {"type":"subscribeToChanges","payload":{},"queryId":"41aa..."}
/// {"type":"removeChangeSubscription","payload":{"subscriptionId":"41aa..."},"queryId":"41aa..."}
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub op: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<QueryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_update: Option<bool>,
}

impl Envelope {
    /// One-shot request/response envelope
    pub fn call(op: impl Into<String>, payload: Value, correlation_id: CorrelationId) -> Self {
        Self {
            op: op.into(),
            payload,
            correlation_id: Some(correlation_id),
            query_id: None,
            live_update: None,
        }
    }

    /// Envelope opening a streaming query
    pub fn start_query(
        op: impl Into<String>,
        descriptor: &QueryDescriptor,
        query_id: QueryId,
    ) -> Result<Self, serde_json::Error> {
        let mut payload = serde_json::to_value(descriptor)?;
        if let Value::Object(fields) = &mut payload {
            fields.insert("liveUpdate".to_string(), Value::Bool(true));
        }
        Ok(Self {
            op: op.into(),
            payload,
            correlation_id: None,
            query_id: Some(query_id),
            live_update: Some(true),
        })
    }

    /// Envelope tearing down a streaming query
    pub fn cancel_query(query_id: QueryId) -> Self {
        Self {
            op: CANCEL_QUERY.to_string(),
            payload: serde_json::json!({ "queryId": query_id }),
            correlation_id: None,
            query_id: Some(query_id),
            live_update: None,
        }
    }

    /// Envelope opening a change feed; pushes are tagged with `query_id`
    pub fn watch(op: impl Into<String>, payload: Value, query_id: QueryId) -> Self {
        Self {
            op: op.into(),
            payload,
            correlation_id: None,
            query_id: Some(query_id),
            live_update: None,
        }
    }

    /// Envelope closing a change feed opened with [`Envelope::watch`]
    pub fn unwatch(op: impl Into<String>, query_id: QueryId) -> Self {
        Self {
            op: op.into(),
            payload: serde_json::json!({ "subscriptionId": query_id }),
            correlation_id: None,
            query_id: Some(query_id),
            live_update: None,
        }
    }

    pub fn is_cancel(&self) -> bool {
        self.op == CANCEL_QUERY
    }
}
