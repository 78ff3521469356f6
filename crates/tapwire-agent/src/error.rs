use thiserror::Error;

use crate::bridge::BridgeError;
use crate::gesture::GestureError;
use tapwire_input::InputError;
use tapwire_protocol::ProtocolError;

/// Umbrella error for agent setup and the dispatcher loop.
///
/// Per-command failures never surface here; they are reported to the client
/// as error responses. This type covers the failures that end the session.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Gesture(#[from] GestureError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
