//! Wire protocol between the bridge and the native host
//!
//! # Module Structure
//!
//! - `types`: Envelope, identifiers and the streaming query descriptor
//! - `message`: JSONL line types for out-of-process hosts (`reply`, `push`)
//! - `io`: graceful JSONL parsing, serialization, streaming reader

mod io;
mod message;
mod types;

pub use io::*;
pub use message::*;
pub use types::*;
