//! uinput-backed virtual devices.

use async_trait::async_trait;
use evdev::uinput::VirtualDevice;
use evdev::{
    AbsInfo, AbsoluteAxisCode, AttributeSet, EventType, KeyCode as EvdevKey, RelativeAxisCode,
    UinputAbsSetup,
};
use tracing::{debug, info};

use super::{frame_to_raw, ContactState, Geometry};
use crate::error::InputError;
use crate::{Keyboard, Pointer, TouchEvent, TouchSurface};

const MT_SLOTS: i32 = 16;

fn open_err(e: impl std::fmt::Display) -> InputError {
    InputError::DeviceOpen(e.to_string())
}

fn emit_err(e: impl std::fmt::Display) -> InputError {
    InputError::Emit(e.to_string())
}

fn abs_axis(code: AbsoluteAxisCode, max: i32) -> UinputAbsSetup {
    UinputAbsSetup::new(code, AbsInfo::new(0, 0, max, 0, 0, 1))
}

fn mouse_button(button: u16) -> Result<EvdevKey, InputError> {
    match button {
        0 => Ok(EvdevKey::BTN_LEFT),
        1 => Ok(EvdevKey::BTN_RIGHT),
        2 => Ok(EvdevKey::BTN_MIDDLE),
        3 => Ok(EvdevKey::BTN_SIDE),
        4 => Ok(EvdevKey::BTN_EXTRA),
        other => Err(InputError::Emit(format!("unsupported button {other}"))),
    }
}

// ---------------------------------------------------------------------------
// UinputTouch
// ---------------------------------------------------------------------------

/// A virtual multitouch surface (type B protocol, 16 slots).
pub struct UinputTouch {
    device: VirtualDevice,
    geom: Geometry,
    contacts: ContactState,
}

impl UinputTouch {
    /// Create the virtual device with absolute axes sized to the screen.
    pub fn open(width: i32, height: i32) -> Result<Self, InputError> {
        let mut keys = AttributeSet::<EvdevKey>::new();
        keys.insert(EvdevKey::BTN_TOUCH);

        let device = VirtualDevice::builder()
            .map_err(open_err)?
            .name("tapwire virtual touch")
            .with_keys(&keys)
            .map_err(open_err)?
            .with_absolute_axis(&abs_axis(AbsoluteAxisCode::ABS_X, width - 1))
            .map_err(open_err)?
            .with_absolute_axis(&abs_axis(AbsoluteAxisCode::ABS_Y, height - 1))
            .map_err(open_err)?
            .with_absolute_axis(&abs_axis(AbsoluteAxisCode::ABS_MT_SLOT, MT_SLOTS - 1))
            .map_err(open_err)?
            .with_absolute_axis(&abs_axis(AbsoluteAxisCode::ABS_MT_TRACKING_ID, i32::MAX))
            .map_err(open_err)?
            .with_absolute_axis(&abs_axis(AbsoluteAxisCode::ABS_MT_POSITION_X, width - 1))
            .map_err(open_err)?
            .with_absolute_axis(&abs_axis(AbsoluteAxisCode::ABS_MT_POSITION_Y, height - 1))
            .map_err(open_err)?
            .build()
            .map_err(open_err)?;

        info!(width, height, "created virtual touch device");
        Ok(Self {
            device,
            geom: Geometry::new(width, height),
            contacts: ContactState::default(),
        })
    }

    fn emit_raw(&mut self, raw: &[(u16, u16, i32)]) -> Result<(), InputError> {
        let events: Vec<evdev::InputEvent> = raw
            .iter()
            .map(|&(event_type, code, value)| evdev::InputEvent::new(event_type, code, value))
            .collect();
        // VirtualDevice::emit appends the SYN_REPORT barrier.
        self.device.emit(&events).map_err(emit_err)
    }

    fn emit_contact(
        &mut self,
        frame: Vec<TouchEvent>,
        btn_touch: Option<bool>,
    ) -> Result<(), InputError> {
        let mut raw = frame_to_raw(&frame);
        if let Some(down) = btn_touch {
            raw.push((EventType::KEY.0, EvdevKey::BTN_TOUCH.0, i32::from(down)));
        }
        self.emit_raw(&raw)
    }
}

#[async_trait]
impl TouchSurface for UinputTouch {
    async fn emit_frame(&mut self, events: &[TouchEvent]) -> Result<(), InputError> {
        // Gesture-engine frames are emitted verbatim; rotation compensation
        // only applies to the single-contact operations below.
        let raw = frame_to_raw(events);
        debug!(count = raw.len(), "touch frame");
        self.emit_raw(&raw)
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
// UinputMouse
// ---------------------------------------------------------------------------

/// A virtual pointer, either relative or absolute.
pub struct UinputMouse {
    device: VirtualDevice,
    absolute: bool,
    /// Assumed cursor position, used to synthesize absolute moves on a
    /// relative device.
    pos: (i32, i32),
}

impl UinputMouse {
    pub fn open(absolute: bool, width: i32, height: i32) -> Result<Self, InputError> {
        let mut keys = AttributeSet::<EvdevKey>::new();
        keys.insert(EvdevKey::BTN_LEFT);
        keys.insert(EvdevKey::BTN_RIGHT);
        keys.insert(EvdevKey::BTN_MIDDLE);
        keys.insert(EvdevKey::BTN_SIDE);
        keys.insert(EvdevKey::BTN_EXTRA);

        let builder = VirtualDevice::builder()
            .map_err(open_err)?
            .name("tapwire virtual mouse")
            .with_keys(&keys)
            .map_err(open_err)?;

        let device = if absolute {
            builder
                .with_absolute_axis(&abs_axis(AbsoluteAxisCode::ABS_X, width - 1))
                .map_err(open_err)?
                .with_absolute_axis(&abs_axis(AbsoluteAxisCode::ABS_Y, height - 1))
                .map_err(open_err)?
                .build()
                .map_err(open_err)?
        } else {
            let mut rel = AttributeSet::<RelativeAxisCode>::new();
            rel.insert(RelativeAxisCode::REL_X);
            rel.insert(RelativeAxisCode::REL_Y);
            builder
                .with_relative_axes(&rel)
                .map_err(open_err)?
                .build()
                .map_err(open_err)?
        };

        info!(absolute, "created virtual mouse device");
        Ok(Self {
            device,
            absolute,
            pos: (0, 0),
        })
    }

    fn emit(&mut self, events: &[evdev::InputEvent]) -> Result<(), InputError> {
        self.device.emit(events).map_err(emit_err)
    }
}

#[async_trait]
impl Pointer for UinputMouse {
    async fn move_to(&mut self, x: i32, y: i32) -> Result<(), InputError> {
        if self.absolute {
            self.pos = (x, y);
            self.emit(&[
                evdev::InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_X.0, x),
                evdev::InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_Y.0, y),
            ])
        } else {
            let (dx, dy) = (x - self.pos.0, y - self.pos.1);
            self.move_rel(dx, dy).await
        }
    }

    async fn move_rel(&mut self, dx: i32, dy: i32) -> Result<(), InputError> {
        self.pos = (self.pos.0 + dx, self.pos.1 + dy);
        if self.absolute {
            let (x, y) = self.pos;
            self.emit(&[
                evdev::InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_X.0, x),
                evdev::InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_Y.0, y),
            ])
        } else {
            self.emit(&[
                evdev::InputEvent::new(EventType::RELATIVE.0, RelativeAxisCode::REL_X.0, dx),
                evdev::InputEvent::new(EventType::RELATIVE.0, RelativeAxisCode::REL_Y.0, dy),
            ])
        }
    }

    async fn press(&mut self, button: u16) -> Result<(), InputError> {
        let key = mouse_button(button)?;
        self.emit(&[evdev::InputEvent::new(EventType::KEY.0, key.0, 1)])
    }

    async fn release(&mut self, button: u16) -> Result<(), InputError> {
        let key = mouse_button(button)?;
        self.emit(&[evdev::InputEvent::new(EventType::KEY.0, key.0, 0)])
    }

    async fn tap(&mut self, x: i32, y: i32, button: u16) -> Result<(), InputError> {
        self.move_to(x, y).await?;
        self.press(button).await?;
        self.release(button).await
    }
}

// ---------------------------------------------------------------------------
// UinputKeyboard
// ---------------------------------------------------------------------------

/// A virtual keyboard carrying the full standard key range.
pub struct UinputKeyboard {
    device: VirtualDevice,
}

impl UinputKeyboard {
    pub fn open() -> Result<Self, InputError> {
        let mut keys = AttributeSet::<EvdevKey>::new();
        for code in 1..=248 {
            keys.insert(EvdevKey(code));
        }
        let device = VirtualDevice::builder()
            .map_err(open_err)?
            .name("tapwire virtual keyboard")
            .with_keys(&keys)
            .map_err(open_err)?
            .build()
            .map_err(open_err)?;
        info!("created virtual keyboard device");
        Ok(Self { device })
    }

    fn emit_key(&mut self, code: u16, value: i32) -> Result<(), InputError> {
        self.device
            .emit(&[evdev::InputEvent::new(EventType::KEY.0, code, value)])
            .map_err(emit_err)
    }
}

#[async_trait]
impl Keyboard for UinputKeyboard {
    async fn press(&mut self, code: u16) -> Result<(), InputError> {
        self.emit_key(code, 1)
    }

    async fn release(&mut self, code: u16) -> Result<(), InputError> {
        self.emit_key(code, 0)
    }

    async fn tap(&mut self, code: u16) -> Result<(), InputError> {
        self.press(code).await?;
        self.release(code).await
    }
}
