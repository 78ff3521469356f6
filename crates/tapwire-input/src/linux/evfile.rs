//! Backends writing straight to an existing `/dev/input/eventN` file.
//!
//! Used when injecting through a physical device node instead of creating a
//! uinput device, e.g. on targets where the compositor only listens to the
//! real touchscreen.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::info;

use super::{
    frame_to_raw, ContactState, Geometry, ABS_X, ABS_Y, BTN_MOUSE, BTN_TOUCH, EV_ABS, EV_KEY,
    EV_REL, EV_SYN, REL_X, REL_Y, SYN_REPORT,
};
use crate::error::InputError;
use crate::{Keyboard, Pointer, TouchEvent, TouchSurface};

/// A writable event-device file.
struct EventDeviceFile {
    file: File,
    path: PathBuf,
}

impl EventDeviceFile {
    fn open(path: &Path) -> Result<Self, InputError> {
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| InputError::DeviceOpen(format!("{}: {e}", path.display())))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Write raw triples followed by a sync barrier.
    ///
    /// `struct input_event` layout on 64-bit: two 64-bit timeval fields,
    /// then type, code, value.
    fn write_frame(&mut self, raw: &[(u16, u16, i32)]) -> Result<(), InputError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let tv_sec = i64::try_from(now.as_secs()).unwrap_or(0);
        let tv_usec = i64::from(now.subsec_micros());

        let mut buf = Vec::with_capacity((raw.len() + 1) * 24);
        for &(event_type, code, value) in raw.iter().chain(&[(EV_SYN, SYN_REPORT, 0)]) {
            buf.extend_from_slice(&tv_sec.to_ne_bytes());
            buf.extend_from_slice(&tv_usec.to_ne_bytes());
            buf.extend_from_slice(&event_type.to_ne_bytes());
            buf.extend_from_slice(&code.to_ne_bytes());
            buf.extend_from_slice(&value.to_ne_bytes());
        }
        self.file
            .write_all(&buf)
            .map_err(|e| InputError::Emit(format!("{}: {e}", self.path.display())))
    }
}

// ---------------------------------------------------------------------------
// FileTouch
// ---------------------------------------------------------------------------

/// Touch surface over a physical multitouch device node.
pub struct FileTouch {
    device: EventDeviceFile,
    geom: Geometry,
    contacts: ContactState,
}

impl FileTouch {
    pub fn open(path: &Path, width: i32, height: i32) -> Result<Self, InputError> {
        let device = EventDeviceFile::open(path)?;
        info!(path = %path.display(), "opened touch device file");
        Ok(Self {
            device,
            geom: Geometry::new(width, height),
            contacts: ContactState::default(),
        })
    }

    fn emit_contact(
        &mut self,
        frame: Vec<TouchEvent>,
        btn_touch: Option<bool>,
    ) -> Result<(), InputError> {
        let mut raw = frame_to_raw(&frame);
        if let Some(down) = btn_touch {
            raw.push((EV_KEY, BTN_TOUCH, i32::from(down)));
        }
        self.device.write_frame(&raw)
    }
}

#[async_trait]
impl TouchSurface for FileTouch {
    async fn emit_frame(&mut self, events: &[TouchEvent]) -> Result<(), InputError> {
        self.device.write_frame(&frame_to_raw(events))
    }

    async fn tap(&mut self, x: i32, y: i32) -> Result<(), InputError> {
        self.press_finger(0, x, y).await?;
        self.release_finger(0).await
    }

    async fn move_to(&mut self, x: i32, y: i32) -> Result<(), InputError> {
        let (x, y) = self.geom.map(x, y);
        let frame = self.contacts.move_to(x, y);
        self.emit_contact(frame, None)
    }

    async fn press_finger(&mut self, finger: u16, x: i32, y: i32) -> Result<(), InputError> {
        let (x, y) = self.geom.map(x, y);
        let (frame, first) = self.contacts.press(finger, x, y);
        self.emit_contact(frame, first.then_some(true))
    }

    async fn release_finger(&mut self, finger: u16) -> Result<(), InputError> {
        let (frame, last) = self.contacts.release(finger);
        self.emit_contact(frame, last.then_some(false))
    }

    fn set_screen_size(&mut self, width: i32, height: i32) {
        self.geom.width = width;
        self.geom.height = height;
    }

    fn set_screen_angle(&mut self, degrees: i32) {
        self.geom.set_angle(degrees);
    }
}

// ---------------------------------------------------------------------------
// FileMouse
// ---------------------------------------------------------------------------

/// Relative pointer over a physical mouse device node.
pub struct FileMouse {
    device: EventDeviceFile,
    pos: (i32, i32),
}

impl FileMouse {
    pub fn open(path: &Path) -> Result<Self, InputError> {
        let device = EventDeviceFile::open(path)?;
        info!(path = %path.display(), "opened mouse device file");
        Ok(Self {
            device,
            pos: (0, 0),
        })
    }
}

#[async_trait]
impl Pointer for FileMouse {
    async fn move_to(&mut self, x: i32, y: i32) -> Result<(), InputError> {
        let (dx, dy) = (x - self.pos.0, y - self.pos.1);
        self.move_rel(dx, dy).await
    }

    async fn move_rel(&mut self, dx: i32, dy: i32) -> Result<(), InputError> {
        self.pos = (self.pos.0 + dx, self.pos.1 + dy);
        self.device
            .write_frame(&[(EV_REL, REL_X, dx), (EV_REL, REL_Y, dy)])
    }

    async fn press(&mut self, button: u16) -> Result<(), InputError> {
        self.device
            .write_frame(&[(EV_KEY, BTN_MOUSE + button, 1)])
    }

    async fn release(&mut self, button: u16) -> Result<(), InputError> {
        self.device
            .write_frame(&[(EV_KEY, BTN_MOUSE + button, 0)])
    }

    async fn tap(&mut self, x: i32, y: i32, button: u16) -> Result<(), InputError> {
        self.move_to(x, y).await?;
        self.press(button).await?;
        self.release(button).await
    }
}

// ---------------------------------------------------------------------------
// FileKeyboard
// ---------------------------------------------------------------------------

/// Keyboard over a physical input device node.
pub struct FileKeyboard {
    device: EventDeviceFile,
}

impl FileKeyboard {
    pub fn open(path: &Path) -> Result<Self, InputError> {
        let device = EventDeviceFile::open(path)?;
        info!(path = %path.display(), "opened keyboard device file");
        Ok(Self { device })
    }
}

#[async_trait]
impl Keyboard for FileKeyboard {
    async fn press(&mut self, code: u16) -> Result<(), InputError> {
        self.device.write_frame(&[(EV_KEY, code, 1)])
    }

    async fn release(&mut self, code: u16) -> Result<(), InputError> {
        self.device.write_frame(&[(EV_KEY, code, 0)])
    }

    async fn tap(&mut self, code: u16) -> Result<(), InputError> {
        self.press(code).await?;
        self.release(code).await
    }
}
