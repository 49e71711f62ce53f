//! Capability call sites
//!
//! Thin operations over a [`Bridge`]: each builds a payload, picks a one-shot
//! call or a stream, and declares how a live reply is reshaped. The demo
//! fixture key for every operation is its camelCase capability name.
//!
//! Script and query bodies never interpolate raw values; see [`crate::escape`].

pub mod apps;
pub mod files;
pub mod index;
pub mod music;
pub mod settings;
pub mod system;
pub mod windows;

use serde_json::{json, Value};

use crate::bridge::Request;

/// Host op that runs an AppleScript body and replies with its result
pub const APPLESCRIPT_OP: &str = "applescript";
/// Host op that runs a command with arguments and replies with its stdout
pub const SYSTEM_OP: &str = "system";

pub(crate) fn applescript(script: impl Into<String>) -> Request {
    Request::new(APPLESCRIPT_OP, json!({ "script": script.into() }))
}

pub(crate) fn system_command(command: &str, args: &[&str]) -> Request {
    Request::new(SYSTEM_OP, json!({ "command": command, "args": args }))
}

/// Integer view of a host value that may arrive as a number or a numeric string
pub(crate) fn as_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Text view of a host value; missing values become empty
pub(crate) fn as_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use futures::executor::block_on;
    use futures::FutureExt;
    use serde_json::Value;
    use std::future::Future;
    use std::sync::Arc;

    use crate::bridge::{Bridge, StaticFixtures};
    use crate::error::TransportError;
    use crate::host::mock::MockHost;

    pub(crate) fn live() -> (Bridge, Arc<MockHost>) {
        let host = Arc::new(MockHost::new());
        (Bridge::live(host.clone()), host)
    }

    pub(crate) fn demo(fixtures: StaticFixtures) -> Bridge {
        Bridge::demo(Arc::new(fixtures))
    }

    /// Poll `future` until it waits on the host, answer its last envelope with
    /// `reply`, then run it to completion
    pub(crate) fn settle<F: Future>(
        host: &MockHost,
        future: F,
        reply: Result<Value, TransportError>,
    ) -> F::Output {
        let mut future = Box::pin(future);
        assert!(
            future.as_mut().now_or_never().is_none(),
            "settled before the host replied"
        );
        let index = host.sent_count() - 1;
        assert!(host.complete(index, reply));
        block_on(future)
    }
}
