//! Protocol errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Unknown command: \"{0}\"")]
    UnknownCommand(String),

    #[error("bad arguments for {verb}: {detail}")]
    BadArguments { verb: String, detail: String },

    #[error("failed to decode payload: {0}")]
    Decode(String),

    #[error("failed to encode payload: {0}")]
    Encode(String),

    #[error("malformed response line: {0:?}")]
    BadFrame(String),
}
