//! Response framing.
//!
//! Every response is one line: `FMBTAGENT OK <blob>` on success,
//! `FMBTAGENT ERROR <blob>` on failure. The bare `FMBTAGENT` marker doubles
//! as the sub-agent readiness signal, since the greeting is the first line a
//! freshly started agent writes.

use tapwire_types::Value;

use crate::codec::{decode_value, encode_value};
use crate::error::ProtocolError;

pub const OK_PREFIX: &str = "FMBTAGENT OK ";
pub const ERROR_PREFIX: &str = "FMBTAGENT ERROR ";

/// Substring a caller waits for to know the agent is up.
pub const READY_MARKER: &str = "FMBTAGENT";

/// Format one response line (without the trailing newline).
pub fn format_response(ok: bool, payload: &Value) -> Result<String, ProtocolError> {
    let prefix = if ok { OK_PREFIX } else { ERROR_PREFIX };
    Ok(format!("{prefix}{}", encode_value(payload)?))
}

/// Parse a response line into `(ok, payload)`.
pub fn parse_response(line: &str) -> Result<(bool, Value), ProtocolError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if let Some(blob) = line.strip_prefix(OK_PREFIX) {
        Ok((true, decode_value(blob)?))
    } else if let Some(blob) = line.strip_prefix(ERROR_PREFIX) {
        Ok((false, decode_value(blob)?))
    } else {
        Err(ProtocolError::BadFrame(line.to_string()))
    }
}
