//! Line-oriented control protocol for tapwire.
//!
//! One command per request line, exactly one framed response line per
//! command, strict FIFO. Structured payloads travel as ASCII-armored
//! [`tapwire_types::Value`] blobs produced by [`codec`].

pub mod codec;
pub mod command;
pub mod error;
pub mod frame;

pub use codec::{decode_value, encode_value};
pub use command::Command;
pub use error::ProtocolError;
pub use frame::{format_response, parse_response, ERROR_PREFIX, OK_PREFIX, READY_MARKER};
