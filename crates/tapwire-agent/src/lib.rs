//! Remote input-injection agent core.
//!
//! The agent answers a line-oriented command protocol on its standard
//! streams: synthetic touch, multitouch gesture, mouse and keyboard
//! injection, shell execution, and a privilege bridge that forwards
//! commands to a copy of the agent running under another account.

pub mod bridge;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod gesture;
pub mod shell;

pub use config::{load_config, Config};
pub use context::AgentContext;
pub use dispatch::Dispatcher;
pub use error::AgentError;
