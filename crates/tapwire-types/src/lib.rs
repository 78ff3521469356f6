//! Shared types for tapwire.
//!
//! This crate contains the types shared across the tapwire workspace: the
//! protocol value universe, multitouch gesture specifications, the input-key
//! name table, event recorder filters, and shell execution requests.

pub mod gesture;
pub mod key;
pub mod recorder;
pub mod shell;
pub mod value;

pub use gesture::{FingerPath, GestureSpec, Point};
pub use recorder::{RecordedEvent, RecorderFilter};
pub use shell::ShellRequest;
pub use value::{Value, ValueError};
