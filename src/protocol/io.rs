//! Protocol I/O for JSONL host messages
//!
//! This module provides:
//! - `parse_host_message_graceful` for classifying one line from the host
//! - `serialize_envelope` for the bridge → host direction
//! - `JsonlReader` for streaming reads that survive bad lines

use std::io::{BufRead, BufReader, Read};
use tracing::{debug, warn};

use super::message::{HostMessage, WireEnvelope};
use super::types::Envelope;

/// Maximum length for raw JSON in logs (keeps file contents and clipboard data out of logs)
const MAX_RAW_LOG_PREVIEW: usize = 200;

/// Get a truncated preview of raw JSON for logging
pub fn log_preview(raw: &str) -> (&str, usize) {
    let len = raw.len();
    if len > MAX_RAW_LOG_PREVIEW {
        let mut end = MAX_RAW_LOG_PREVIEW;
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        (&raw[..end], len)
    } else {
        (raw, len)
    }
}

/// Result type for graceful message parsing
#[derive(Debug)]
pub enum ParseResult {
    /// Successfully parsed a known message type
    Ok(HostMessage),
    /// Message has no "type" field
    MissingType { raw: String },
    /// Valid JSON with a "type" we don't recognize
    UnknownType { message_type: String, raw: String },
    /// Known message type but invalid payload
    InvalidPayload {
        message_type: String,
        error: String,
        raw: String,
    },
    /// JSON parsing failed entirely (syntax error)
    ParseError(serde_json::Error),
}

/// Parse a host line, classifying failures instead of returning a bare error
///
/// Parses to `serde_json::Value` once, then converts, so unknown types are
/// not parsed twice.
pub fn parse_host_message_graceful(line: &str) -> ParseResult {
    let (preview, _) = log_preview(line);

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return ParseResult::ParseError(e),
    };

    let msg_type = match value.get("type").and_then(|t| t.as_str()) {
        Some(t) => t.to_string(),
        None => {
            return ParseResult::MissingType {
                raw: preview.to_string(),
            }
        }
    };

    match serde_json::from_value::<HostMessage>(value) {
        Ok(msg) => ParseResult::Ok(msg),
        Err(e) => {
            let error = e.to_string();
            if error.contains("unknown variant") {
                ParseResult::UnknownType {
                    message_type: msg_type,
                    raw: preview.to_string(),
                }
            } else {
                ParseResult::InvalidPayload {
                    message_type: msg_type,
                    error,
                    raw: preview.to_string(),
                }
            }
        }
    }
}

/// Serialize an envelope to one JSONL line (without the newline)
pub fn serialize_envelope(seq: u64, envelope: &Envelope) -> Result<String, serde_json::Error> {
    serde_json::to_string(&WireEnvelope {
        seq,
        envelope: envelope.clone(),
    })
}

/// JSONL reader over the host's stdout
///
/// Uses a reusable line buffer; the buffer is cleared between reads.
pub struct JsonlReader<R: Read> {
    reader: BufReader<R>,
    line_buffer: String,
}

impl<R: Read> JsonlReader<R> {
    pub fn new(reader: R) -> Self {
        JsonlReader {
            reader: BufReader::new(reader),
            line_buffer: String::with_capacity(1024),
        }
    }

    /// Read the next well-formed host message
    ///
    /// Empty lines, malformed JSON and unknown message types are logged and
    /// skipped.
    ///
    /// # Returns
    /// * `Ok(Some(HostMessage))` - Successfully parsed message
    /// * `Ok(None)` - End of stream
    /// * `Err(e)` - IO error
    pub fn next_message_graceful(&mut self) -> Result<Option<HostMessage>, std::io::Error> {
        loop {
            self.line_buffer.clear();
            if self.reader.read_line(&mut self.line_buffer)? == 0 {
                debug!("Reached end of host JSONL stream");
                return Ok(None);
            }

            let trimmed = self.line_buffer.trim();
            if trimmed.is_empty() {
                continue;
            }

            let (preview, raw_len) = log_preview(trimmed);
            match parse_host_message_graceful(trimmed) {
                ParseResult::Ok(msg) => {
                    debug!(kind = msg.kind(), raw_len, "Parsed host message");
                    return Ok(Some(msg));
                }
                ParseResult::MissingType { .. } => {
                    warn!(raw_preview = %preview, raw_len, "Skipping host message with missing 'type' field");
                }
                ParseResult::UnknownType { message_type, .. } => {
                    warn!(
                        message_type = %message_type,
                        raw_preview = %preview,
                        raw_len,
                        "Skipping unknown host message type"
                    );
                }
                ParseResult::InvalidPayload {
                    message_type,
                    error,
                    ..
                } => {
                    warn!(
                        message_type = %message_type,
                        error = %error,
                        raw_preview = %preview,
                        raw_len,
                        "Skipping host message with invalid payload"
                    );
                }
                ParseResult::ParseError(e) => {
                    warn!(error = %e, raw_preview = %preview, raw_len, "Skipping malformed host JSON");
                }
            }
        }
    }
}
