//! Native host as a child process speaking JSONL over stdio
//!
//! Envelopes go to the child's stdin, one per line, tagged with a sequence
//! number. A reader thread parses the child's stdout: `reply` lines complete
//! the callback registered under their `seq`, `push` lines go to the push
//! sink. When stdout closes every outstanding callback fails with
//! `Disconnected`.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::{HostCallback, HostTransport, PushSink};
use crate::config::HostConfig;
use crate::error::{ResultExt, TransportError};
use crate::protocol::{log_preview, serialize_envelope, Envelope, HostMessage, JsonlReader};

#[derive(Default)]
struct Shared {
    pending: Mutex<HashMap<u64, HostCallback>>,
    sink: Mutex<Option<PushSink>>,
    closed: AtomicBool,
}

impl Shared {
    fn take(&self, seq: u64) -> Option<HostCallback> {
        self.pending.lock().remove(&seq)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let drained: Vec<HostCallback> = self.pending.lock().drain().map(|(_, cb)| cb).collect();
        if !drained.is_empty() {
            warn!(count = drained.len(), "Host closed with calls outstanding");
        }
        for callback in drained {
            callback(Err(TransportError::Disconnected));
        }
    }
}

pub struct ProcessHost {
    writer: Mutex<Box<dyn Write + Send>>,
    child: Option<Mutex<Child>>,
    shared: Arc<Shared>,
    next_seq: AtomicU64,
}

impl ProcessHost {
    /// Spawn the configured host command and start reading its stdout
    #[instrument(name = "spawn_host", skip(config), fields(command = %config.command))]
    pub fn spawn(config: &HostConfig) -> std::io::Result<Self> {
        let command = shellexpand::tilde(&config.command).into_owned();
        let mut child = Command::new(&command)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                error!(error = %e, command = %command, "Host spawn failed");
                e
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("host stdin not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("host stdout not captured"))?;

        info!(pid = child.id(), command = %command, "Host process started");
        let mut host = Self::from_io(stdout, stdin);
        host.child = Some(Mutex::new(child));
        Ok(host)
    }

    /// Run over arbitrary streams (the reader is consumed on a background thread)
    pub fn from_io<R, W>(reader: R, writer: W) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let shared = Arc::new(Shared::default());
        let thread_shared = Arc::clone(&shared);
        std::thread::spawn(move || read_loop(reader, thread_shared));

        Self {
            writer: Mutex::new(Box::new(writer)),
            child: None,
            shared,
            next_seq: AtomicU64::new(1),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line)?;
        writer.flush()
    }
}

fn read_loop<R: Read>(reader: R, shared: Arc<Shared>) {
    debug!("Host reader started");
    let mut reader = JsonlReader::new(reader);
    loop {
        match reader.next_message_graceful() {
            Ok(Some(HostMessage::Reply { seq, result, error })) => match shared.take(seq) {
                Some(callback) => callback(match error {
                    Some(message) => Err(TransportError::Host(message)),
                    None => Ok(result),
                }),
                None => debug!(seq, "Reply for unknown or completed envelope"),
            },
            Ok(Some(HostMessage::Push {
                query_id,
                data,
                error,
            })) => {
                let sink = shared.sink.lock().clone();
                match sink {
                    Some(sink) => sink.deliver(
                        &query_id,
                        match error {
                            Some(message) => Err(TransportError::Host(message)),
                            None => Ok(data),
                        },
                    ),
                    None => warn!(query_id = %query_id, "Push arrived before a sink was attached"),
                }
            }
            Ok(None) => {
                info!("Host stdout closed");
                break;
            }
            Err(e) => {
                error!(error = %e, "Failed to read from host stdout");
                break;
            }
        }
    }
    shared.close();
}

impl HostTransport for ProcessHost {
    fn send(&self, envelope: Envelope, callback: HostCallback) {
        if self.is_closed() {
            callback(Err(TransportError::Disconnected));
            return;
        }

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let line = match serialize_envelope(seq, &envelope) {
            Ok(line) => line,
            Err(e) => {
                callback(Err(TransportError::Io(e.to_string())));
                return;
            }
        };

        let (preview, raw_len) = log_preview(&line);
        debug!(seq, op = %envelope.op, raw_preview = %preview, raw_len, "Writing envelope to host");

        self.shared.pending.lock().insert(seq, callback);
        // The reader may have closed between the check above and the insert
        if self.is_closed() {
            if let Some(callback) = self.shared.take(seq) {
                callback(Err(TransportError::Disconnected));
            }
            return;
        }

        if let Err(e) = self.write_line(&line) {
            error!(seq, error = %e, "Failed to write envelope to host");
            if let Some(callback) = self.shared.take(seq) {
                callback(Err(TransportError::Io(e.to_string())));
            }
        }
    }

    fn attach_push_sink(&self, sink: PushSink) {
        *self.shared.sink.lock() = Some(sink);
    }
}

impl Drop for ProcessHost {
    fn drop(&mut self) {
        if let Some(child) = &self.child {
            let mut child = child.lock();
            info!(pid = child.id(), "Stopping host process");
            child.kill().warn_on_err();
            child.wait().warn_on_err();
        }
    }
}
