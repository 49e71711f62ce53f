use thiserror::Error;
use tracing::warn;

/// Failure reported by (or while talking to) the host transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Host reported failure: {0}")]
    Host(String),

    #[error("Failed to write envelope to host: {0}")]
    Io(String),

    #[error("Host process disconnected")]
    Disconnected,
}

/// A host reply whose shape does not match the declared field schema
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Expected a list reply, found {found}")]
    NotAList { found: &'static str },

    #[error("Row {row} is not a list")]
    NotARow { row: usize },

    #[error("Column {column} is not a list")]
    NotAColumn { column: usize },

    #[error("Row {row} has {found} values, schema declares {expected} fields")]
    RowArity {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Reply has {found} columns, schema declares {expected} fields")]
    ColumnCount { expected: usize, found: usize },

    #[error("Column {column} has {found} values, expected {expected}")]
    RaggedColumns {
        column: usize,
        expected: usize,
        found: usize,
    },
}

/// Errors surfaced to capability callers
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to decode host reply: {0}")]
    Decode(#[from] DecodeError),

    #[error("Bridge was dropped before the host replied")]
    Abandoned,

    #[error("Unexpected reply shape: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl BridgeError {
    /// Short label for structured log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Decode(_) => "decode",
            Self::Abandoned => "abandoned",
            Self::Malformed(_) => "malformed",
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Extension trait for silent error logging with caller location tracking.
/// Use when the operation is recoverable and the caller doesn't need to know.
///
/// # Examples
///
/// ```ignore
/// use lacona_bridge::error::ResultExt;
///
/// child.kill().warn_on_err();
/// ```
pub trait ResultExt<T> {
    /// Log as warning with caller location and return None. Use for expected failures.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation warning"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_converts_into_bridge_error() {
        let err: BridgeError = TransportError::Host("boom".into()).into();
        assert_eq!(err.kind(), "transport");
        assert_eq!(err.to_string(), "Host reported failure: boom");
    }

    #[test]
    fn test_decode_error_message_names_row() {
        let err = DecodeError::RowArity {
            row: 2,
            expected: 3,
            found: 1,
        };
        assert_eq!(
            err.to_string(),
            "Row 2 has 1 values, schema declares 3 fields"
        );
    }

    #[test]
    fn test_result_ext_warn_on_err_returns_none_on_error() {
        let result: std::result::Result<u32, &str> = Err("nope");
        assert_eq!(result.warn_on_err(), None);

        let result: std::result::Result<u32, &str> = Ok(3);
        assert_eq!(result.warn_on_err(), Some(3));
    }
}
