//! Linux injection backends.
//!
//! Two injection families: uinput virtual devices ([`uinput`]) and
//! pre-existing `/dev/input/eventN` device files ([`evfile`]). Both speak the
//! same raw `(type, code, value)` event triples; the shared pieces here keep
//! the two in lockstep. [`capture`] reads events back out for the recorder.

pub mod capture;
pub mod evfile;
pub mod uinput;

pub use capture::EvdevRecorder;
pub use evfile::{FileKeyboard, FileMouse, FileTouch};
pub use uinput::{UinputKeyboard, UinputMouse, UinputTouch};

use crate::{TouchEvent, TRACKING_ID_LIFTED};

// Event types and codes from linux/input-event-codes.h.
pub(crate) const EV_SYN: u16 = 0x00;
pub(crate) const EV_KEY: u16 = 0x01;
pub(crate) const EV_REL: u16 = 0x02;
pub(crate) const EV_ABS: u16 = 0x03;
pub(crate) const SYN_REPORT: u16 = 0x00;
pub(crate) const ABS_X: u16 = 0x00;
pub(crate) const ABS_Y: u16 = 0x01;
pub(crate) const ABS_MT_SLOT: u16 = 0x2f;
pub(crate) const ABS_MT_POSITION_X: u16 = 0x35;
pub(crate) const ABS_MT_POSITION_Y: u16 = 0x36;
pub(crate) const ABS_MT_TRACKING_ID: u16 = 0x39;
pub(crate) const REL_X: u16 = 0x00;
pub(crate) const REL_Y: u16 = 0x01;
pub(crate) const BTN_MOUSE: u16 = 0x110;
pub(crate) const BTN_TOUCH: u16 = 0x14a;

/// Lower a multitouch frame to raw event triples (no sync).
pub(crate) fn frame_to_raw(events: &[TouchEvent]) -> Vec<(u16, u16, i32)> {
    events
        .iter()
        .map(|event| match *event {
            TouchEvent::Slot(v) => (EV_ABS, ABS_MT_SLOT, v),
            TouchEvent::TrackingId(v) => (EV_ABS, ABS_MT_TRACKING_ID, v),
            TouchEvent::PositionX(v) => (EV_ABS, ABS_MT_POSITION_X, v),
            TouchEvent::PositionY(v) => (EV_ABS, ABS_MT_POSITION_Y, v),
            TouchEvent::AbsX(v) => (EV_ABS, ABS_X, v),
            TouchEvent::AbsY(v) => (EV_ABS, ABS_Y, v),
        })
        .collect()
}

/// Logical screen geometry with rotation compensation.
///
/// The angle maps logical coordinates onto a panel mounted rotated by a
/// multiple of 90 degrees; other angles are treated as unrotated.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Geometry {
    pub width: i32,
    pub height: i32,
    pub angle: i32,
}

impl Geometry {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            angle: 0,
        }
    }

    pub fn set_angle(&mut self, degrees: i32) {
        self.angle = degrees.rem_euclid(360);
    }

    /// Map a logical coordinate to device coordinates.
    pub fn map(&self, x: i32, y: i32) -> (i32, i32) {
        match self.angle {
            90 => (y, self.width - 1 - x),
            180 => (self.width - 1 - x, self.height - 1 - y),
            270 => (self.height - 1 - y, x),
            _ => (x, y),
        }
    }
}

/// Single-contact state shared by the touch backends.
///
/// Tracks which fingers are down and hands out device-local tracking IDs for
/// the convenience operations (`tap`, `press_finger`, ...). Gesture-engine
/// frames bypass this entirely via `emit_frame`.
#[derive(Debug, Default)]
pub(crate) struct ContactState {
    down: std::collections::HashMap<u16, (i32, i32)>,
    next_tracking_id: i32,
}

impl ContactState {
    /// Frame for putting `finger` down, plus whether `BTN_TOUCH` goes high.
    pub fn press(&mut self, finger: u16, x: i32, y: i32) -> (Vec<TouchEvent>, bool) {
        self.next_tracking_id += 1;
        let first = self.down.is_empty();
        self.down.insert(finger, (x, y));
        (
            vec![
                TouchEvent::Slot(i32::from(finger)),
                TouchEvent::TrackingId(self.next_tracking_id),
                TouchEvent::PositionX(x),
                TouchEvent::PositionY(y),
                TouchEvent::AbsX(x),
                TouchEvent::AbsY(y),
            ],
            first,
        )
    }

    /// Frame for lifting `finger`, plus whether `BTN_TOUCH` goes low.
    pub fn release(&mut self, finger: u16) -> (Vec<TouchEvent>, bool) {
        self.down.remove(&finger);
        (
            vec![
                TouchEvent::Slot(i32::from(finger)),
                TouchEvent::TrackingId(TRACKING_ID_LIFTED),
            ],
            self.down.is_empty(),
        )
    }

    /// Frame for a position update: follows the primary contact when one is
    /// down, otherwise a plain hover coordinate.
    pub fn move_to(&mut self, x: i32, y: i32) -> Vec<TouchEvent> {
        if self.down.contains_key(&0) {
            self.down.insert(0, (x, y));
            vec![
                TouchEvent::Slot(0),
                TouchEvent::PositionX(x),
                TouchEvent::PositionY(y),
                TouchEvent::AbsX(x),
                TouchEvent::AbsY(y),
            ]
        } else {
            vec![TouchEvent::AbsX(x), TouchEvent::AbsY(y)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_identity_at_zero() {
        let geom = Geometry::new(360, 640);
        assert_eq!(geom.map(10, 20), (10, 20));
    }

    #[test]
    fn geometry_quarter_turns() {
        let mut geom = Geometry::new(360, 640);
        geom.set_angle(90);
        assert_eq!(geom.map(0, 0), (0, 359));
        geom.set_angle(180);
        assert_eq!(geom.map(0, 0), (359, 639));
        geom.set_angle(-90);
        assert_eq!(geom.angle, 270);
        assert_eq!(geom.map(0, 0), (639, 0));
    }

    #[test]
    fn contact_btn_touch_edges() {
        let mut contacts = ContactState::default();
        let (_, first) = contacts.press(0, 1, 1);
        assert!(first);
        let (_, first) = contacts.press(1, 2, 2);
        assert!(!first);
        let (_, last) = contacts.release(0);
        assert!(!last);
        let (_, last) = contacts.release(1);
        assert!(last);
    }

    #[test]
    fn contact_tracking_ids_increase() {
        let mut contacts = ContactState::default();
        let (frame_a, _) = contacts.press(0, 0, 0);
        contacts.release(0);
        let (frame_b, _) = contacts.press(0, 0, 0);
        let id = |frame: &[TouchEvent]| {
            frame.iter().find_map(|e| match e {
                TouchEvent::TrackingId(v) => Some(*v),
                _ => None,
            })
        };
        assert!(id(&frame_b).unwrap() > id(&frame_a).unwrap());
    }
}
