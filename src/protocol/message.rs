//! Line-level messages exchanged with an out-of-process host.
//!
//! Bridge → host lines are an [`Envelope`] flattened next to a transport
//! sequence number. Host → bridge lines are [`HostMessage`]s.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{Envelope, QueryId};

/// Envelope as written to the host's stdin
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireEnvelope {
    /// Transport sequence number echoed back in the matching `reply`
    pub seq: u64,
    #[serde(flatten)]
    pub envelope: Envelope,
}

/// Message read from the host's stdout
///
/// # Example
/// ```json
/// {"type":"reply","seq":3,"result":{"enabled":true}}
/// {"type":"reply","seq":4,"error":"execution error: -1728"}
/// {"type":"push","queryId":"9f2e...","data":[["/a.txt","public.plain-text"]]}
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostMessage {
    /// Completion of the envelope written with the same `seq`
    Reply {
        seq: u64,
        #[serde(default)]
        result: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Unsolicited data (or failure) for an active query
    #[serde(rename_all = "camelCase")]
    Push {
        query_id: QueryId,
        #[serde(default)]
        data: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl HostMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            HostMessage::Reply { .. } => "reply",
            HostMessage::Push { .. } => "push",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::CorrelationId;

    #[test]
    fn test_wire_envelope_flattens_envelope_fields() {
        let wire = WireEnvelope {
            seq: 7,
            envelope: Envelope::call(
                "applescript",
                serde_json::json!({"script": "beep"}),
                CorrelationId::generate(),
            ),
        };
        let json = serde_json::to_value(&wire).unwrap();

        assert_eq!(json["seq"], 7);
        assert_eq!(json["type"], "applescript");
        assert_eq!(json["payload"]["script"], "beep");
    }

    #[test]
    fn test_reply_without_error_parses() {
        let msg: HostMessage =
            serde_json::from_str(r#"{"type":"reply","seq":3,"result":{"enabled":true}}"#).unwrap();
        match msg {
            HostMessage::Reply { seq, result, error } => {
                assert_eq!(seq, 3);
                assert_eq!(result["enabled"], true);
                assert!(error.is_none());
            }
            other => panic!("Expected Reply, got {:?}", other),
        }
    }

    #[test]
    fn test_push_parses_query_id() {
        let json = r#"{"type":"push","queryId":"67e55044-10b1-426f-9247-bb680e5fe0c8","data":[["a"]]}"#;
        let msg: HostMessage = serde_json::from_str(json).unwrap();
        match msg {
            HostMessage::Push {
                query_id, data, ..
            } => {
                assert_eq!(query_id.to_string(), "67e55044-10b1-426f-9247-bb680e5fe0c8");
                assert_eq!(data[0][0], "a");
            }
            other => panic!("Expected Push, got {:?}", other),
        }
    }
}
