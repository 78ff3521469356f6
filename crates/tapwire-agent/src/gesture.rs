//! Multitouch gesture engine.
//!
//! Owns the slot table for scripted gestures (`td`/`tu`/`ml`). Slots map to
//! kernel multitouch slots one to one; tracking IDs are handed out
//! monotonically so a re-pressed slot never reuses an ID.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use tapwire_input::{InputError, TouchEvent, TouchSurface, TRACKING_ID_LIFTED};
use tapwire_types::GestureSpec;

/// Concurrent contacts supported by the slot table.
pub const SLOT_COUNT: usize = 16;

#[derive(Debug, Error)]
pub enum GestureError {
    #[error("no free multitouch slots")]
    NoFreeSlots,

    #[error("slot {0} is not active")]
    InvalidSlot(u8),

    #[error(transparent)]
    Input(#[from] InputError),
}

#[derive(Debug, Clone, Copy)]
struct SlotState {
    tracking_id: i32,
    x: i32,
    y: i32,
}

/// Slot table plus screen bounds for coordinate clamping.
pub struct GestureEngine {
    slots: [Option<SlotState>; SLOT_COUNT],
    next_tracking_id: i32,
    width: i32,
    height: i32,
}

impl GestureEngine {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            slots: [None; SLOT_COUNT],
            next_tracking_id: 0,
            width,
            height,
        }
    }

    pub fn set_screen_size(&mut self, width: i32, height: i32) {
        self.width = width;
        self.height = height;
    }

    pub fn active_contacts(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    // Coordinates are accepted on the closed range, so a move to exactly
    // (width, height) still lands.
    fn in_x(&self, x: i32) -> bool {
        x >= 0 && x <= self.width
    }

    fn in_y(&self, y: i32) -> bool {
        y >= 0 && y <= self.height
    }

    /// Put a new contact down at the lowest free slot.
    ///
    /// The slot stays free if the device rejects the frame.
    pub async fn start(
        &mut self,
        touch: &mut dyn TouchSurface,
        x: i32,
        y: i32,
    ) -> Result<u8, GestureError> {
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(GestureError::NoFreeSlots)?;
        self.next_tracking_id += 1;
        let tracking_id = self.next_tracking_id;

        touch
            .emit_frame(&[
                TouchEvent::Slot(slot_index(slot)),
                TouchEvent::TrackingId(tracking_id),
                TouchEvent::PositionX(x),
                TouchEvent::PositionY(y),
                TouchEvent::AbsX(x),
                TouchEvent::AbsY(y),
            ])
            .await?;

        self.slots[slot] = Some(SlotState { tracking_id, x, y });
        debug!(slot, tracking_id, x, y, "contact down");
        Ok(slot as u8)
    }

    /// Move an active contact. Axes are updated independently: a coordinate
    /// outside the screen leaves that axis where it was, and a frame where
    /// nothing changes is not emitted at all.
    pub async fn move_contact(
        &mut self,
        touch: &mut dyn TouchSurface,
        slot: u8,
        x: i32,
        y: i32,
    ) -> Result<(), GestureError> {
        let (x_ok, y_ok) = (self.in_x(x), self.in_y(y));
        let state = self
            .slots
            .get_mut(usize::from(slot))
            .and_then(Option::as_mut)
            .ok_or(GestureError::InvalidSlot(slot))?;

        let mut frame = vec![
            TouchEvent::Slot(i32::from(slot)),
            TouchEvent::TrackingId(state.tracking_id),
        ];
        let mut moved = false;
        if x_ok && x != state.x {
            state.x = x;
            frame.push(TouchEvent::PositionX(x));
            moved = true;
        }
        if y_ok && y != state.y {
            state.y = y;
            frame.push(TouchEvent::PositionY(y));
            moved = true;
        }
        if !moved {
            return Ok(());
        }
        if x_ok {
            frame.push(TouchEvent::AbsX(x));
        }
        if y_ok {
            frame.push(TouchEvent::AbsY(y));
        }
        touch.emit_frame(&frame).await?;
        Ok(())
    }

    /// Lift a contact. The slot is released even when the device rejects the
    /// lift frame, so a failed gesture never leaks slots.
    pub async fn end(
        &mut self,
        touch: &mut dyn TouchSurface,
        slot: u8,
    ) -> Result<(), GestureError> {
        if self
            .slots
            .get(usize::from(slot))
            .and_then(Option::as_ref)
            .is_none()
        {
            return Err(GestureError::InvalidSlot(slot));
        }
        self.slots[usize::from(slot)] = None;
        touch
            .emit_frame(&[
                TouchEvent::Slot(i32::from(slot)),
                TouchEvent::TrackingId(TRACKING_ID_LIFTED),
            ])
            .await?;
        debug!(slot, "contact up");
        Ok(())
    }

    /// Play a linear multi-finger gesture in lockstep.
    ///
    /// All fingers go down, interpolated positions are emitted step by step
    /// with the duration spread evenly across steps, and every started finger
    /// is lifted at the end even when a move fails along the way. The first
    /// error encountered is the one returned.
    pub async fn play_linear(
        &mut self,
        touch: &mut dyn TouchSurface,
        spec: &GestureSpec,
    ) -> Result<(), GestureError> {
        let mut failure: Option<GestureError> = None;
        let mut fingers: Vec<u8> = Vec::with_capacity(spec.fingers.len());

        for path in &spec.fingers {
            match self.start(touch, path.start.x, path.start.y).await {
                Ok(slot) => fingers.push(slot),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if failure.is_none() {
            sleep_ms(spec.pre_delay_ms).await;
            let steps = spec.steps.max(0);
            if steps > 0 {
                let interval = Duration::from_secs_f64(
                    (spec.duration_ms.max(0) as f64 / 1000.0) / steps as f64,
                );
                for step in 1..=steps {
                    tokio::time::sleep(interval).await;
                    for (finger, path) in fingers.iter().zip(&spec.fingers) {
                        // Integer interpolation truncates toward zero.
                        let x = path.start.x
                            + (i64::from(path.end.x - path.start.x) * step / steps) as i32;
                        let y = path.start.y
                            + (i64::from(path.end.y - path.start.y) * step / steps) as i32;
                        if let Err(e) = self.move_contact(touch, *finger, x, y).await {
                            failure.get_or_insert(e);
                        }
                    }
                }
            }
            sleep_ms(spec.post_delay_ms).await;
        }

        for finger in fingers {
            if let Err(e) = self.end(touch, finger).await {
                failure.get_or_insert(e);
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn slot_index(slot: usize) -> i32 {
    i32::try_from(slot).unwrap_or(i32::MAX)
}

async fn sleep_ms(ms: i64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms.unsigned_abs())).await;
    }
}
