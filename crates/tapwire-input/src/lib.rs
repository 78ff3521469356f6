//! Output-sink abstraction for tapwire.
//!
//! This crate defines the [`TouchSurface`], [`Pointer`] and [`Keyboard`]
//! capability traits that concrete injection backends implement, plus the
//! [`EventRecorder`] seam for reading events back out. The uinput (Linux)
//! backend lives behind the `linux` feature; recording mocks for tests
//! live behind `mock`.
//!
//! Multitouch event sequencing (slot selection, tracking IDs) is driven by
//! the gesture engine in `tapwire-agent` through [`TouchSurface::emit_frame`];
//! the single-contact convenience operations keep only the minimal per-device
//! state they need.

use async_trait::async_trait;

use tapwire_types::{RecordedEvent, RecorderFilter};

pub mod error;
pub mod keymap;
#[cfg(feature = "linux")]
pub mod linux;
#[cfg(feature = "mock")]
pub mod mock;

pub use error::InputError;

/// One multitouch protocol event within a frame.
///
/// A frame is the unit passed to [`TouchSurface::emit_frame`]; the backend
/// terminates it with the sync barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchEvent {
    /// `ABS_MT_SLOT` — select the contact slot.
    Slot(i32),
    /// `ABS_MT_TRACKING_ID` — assign (or with -1, lift) the contact.
    TrackingId(i32),
    /// `ABS_MT_POSITION_X`
    PositionX(i32),
    /// `ABS_MT_POSITION_Y`
    PositionY(i32),
    /// `ABS_X` — legacy single-touch X, mirrored for non-MT consumers.
    AbsX(i32),
    /// `ABS_Y`
    AbsY(i32),
}

/// Sentinel tracking ID meaning "contact lifted".
pub const TRACKING_ID_LIFTED: i32 = -1;

/// A touch (or touch-capable) output surface.
#[async_trait]
pub trait TouchSurface: Send {
    /// Emit one multitouch frame followed by a sync barrier.
    async fn emit_frame(&mut self, events: &[TouchEvent]) -> Result<(), InputError>;

    /// Single-contact tap at `(x, y)`.
    async fn tap(&mut self, x: i32, y: i32) -> Result<(), InputError>;

    /// Single-contact hover/drag position update.
    async fn move_to(&mut self, x: i32, y: i32) -> Result<(), InputError>;

    /// Put finger `finger` down at `(x, y)`.
    async fn press_finger(&mut self, finger: u16, x: i32, y: i32) -> Result<(), InputError>;

    /// Lift finger `finger`.
    async fn release_finger(&mut self, finger: u16) -> Result<(), InputError>;

    /// Update the logical screen dimensions used for coordinate mapping.
    fn set_screen_size(&mut self, width: i32, height: i32);

    /// Set the rotation compensation angle (degrees, multiple of 90).
    fn set_screen_angle(&mut self, degrees: i32);
}

/// A relative or absolute pointer device.
#[async_trait]
pub trait Pointer: Send {
    async fn move_to(&mut self, x: i32, y: i32) -> Result<(), InputError>;

    async fn move_rel(&mut self, dx: i32, dy: i32) -> Result<(), InputError>;

    /// Press button `button` (0 = left, 1 = right, 2 = middle).
    async fn press(&mut self, button: u16) -> Result<(), InputError>;

    async fn release(&mut self, button: u16) -> Result<(), InputError>;

    /// Move to `(x, y)` and click.
    async fn tap(&mut self, x: i32, y: i32, button: u16) -> Result<(), InputError>;
}

/// A keyboard device addressed by Linux input keycodes.
#[async_trait]
pub trait Keyboard: Send {
    async fn press(&mut self, code: u16) -> Result<(), InputError>;

    async fn release(&mut self, code: u16) -> Result<(), InputError>;

    async fn tap(&mut self, code: u16) -> Result<(), InputError>;
}

/// Captures raw input events from the system's devices into a queue.
#[async_trait]
pub trait EventRecorder: Send {
    /// Begin capturing events matching `filter`. Starting again restarts
    /// the capture and discards anything still queued.
    async fn start(&mut self, filter: &RecorderFilter) -> Result<(), InputError>;

    /// Stop capturing. Events queued so far stay fetchable.
    async fn stop(&mut self) -> Result<(), InputError>;

    /// Drain the queue.
    async fn fetch(&mut self) -> Vec<RecordedEvent>;
}
