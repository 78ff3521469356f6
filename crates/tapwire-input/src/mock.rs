//! Mock input backends for testing.
//!
//! Each mock records what was emitted; tests observe through a clonable
//! handle while the device itself is boxed into the agent context.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use tapwire_types::{RecordedEvent, RecorderFilter};

use crate::error::InputError;
use crate::{EventRecorder, Keyboard, Pointer, TouchEvent, TouchSurface};

// ---------------------------------------------------------------------------
// MockTouch
// ---------------------------------------------------------------------------

/// A recorded call on a [`MockTouch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TouchCall {
    /// One `emit_frame` invocation (sync barrier implied at the end).
    Frame(Vec<TouchEvent>),
    Tap(i32, i32),
    MoveTo(i32, i32),
    PressFinger(u16, i32, i32),
    ReleaseFinger(u16),
    SetScreenSize(i32, i32),
    SetScreenAngle(i32),
}

#[derive(Debug, Default)]
struct MockTouchState {
    calls: Vec<TouchCall>,
    fail_moves: bool,
}

/// Mock touch surface recording every frame and capability call.
#[derive(Default)]
pub struct MockTouch {
    state: Arc<Mutex<MockTouchState>>,
}

impl MockTouch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a clonable handle for observing recorded calls from tests.
    pub fn handle(&self) -> MockTouchHandle {
        MockTouchHandle {
            state: Arc::clone(&self.state),
        }
    }
}

/// Clonable observer handle for [`MockTouch`].
#[derive(Clone)]
pub struct MockTouchHandle {
    state: Arc<Mutex<MockTouchState>>,
}

impl MockTouchHandle {
    /// Snapshot of all recorded calls.
    pub fn calls(&self) -> Vec<TouchCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Only the emitted frames, in order.
    pub fn frames(&self) -> Vec<Vec<TouchEvent>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TouchCall::Frame(frame) => Some(frame),
                _ => None,
            })
            .collect()
    }

    /// Make subsequent `emit_frame` calls fail, for error-path tests.
    pub fn fail_moves(&self, fail: bool) {
        self.state.lock().unwrap().fail_moves = fail;
    }
}

#[async_trait]
impl TouchSurface for MockTouch {
    async fn emit_frame(&mut self, events: &[TouchEvent]) -> Result<(), InputError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_moves {
            return Err(InputError::Emit("mock failure".to_string()));
        }
        state.calls.push(TouchCall::Frame(events.to_vec()));
        Ok(())
    }

    async fn tap(&mut self, x: i32, y: i32) -> Result<(), InputError> {
        self.state.lock().unwrap().calls.push(TouchCall::Tap(x, y));
        Ok(())
    }

    async fn move_to(&mut self, x: i32, y: i32) -> Result<(), InputError> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(TouchCall::MoveTo(x, y));
        Ok(())
    }

    async fn press_finger(&mut self, finger: u16, x: i32, y: i32) -> Result<(), InputError> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(TouchCall::PressFinger(finger, x, y));
        Ok(())
    }

    async fn release_finger(&mut self, finger: u16) -> Result<(), InputError> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(TouchCall::ReleaseFinger(finger));
        Ok(())
    }

    fn set_screen_size(&mut self, width: i32, height: i32) {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(TouchCall::SetScreenSize(width, height));
    }

    fn set_screen_angle(&mut self, degrees: i32) {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(TouchCall::SetScreenAngle(degrees));
    }
}

// ---------------------------------------------------------------------------
// MockPointer
// ---------------------------------------------------------------------------

/// A recorded call on a [`MockPointer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerCall {
    MoveTo(i32, i32),
    MoveRel(i32, i32),
    Press(u16),
    Release(u16),
    Tap(i32, i32, u16),
}

/// Mock pointer recording every call.
#[derive(Default)]
pub struct MockPointer {
    calls: Arc<Mutex<Vec<PointerCall>>>,
}

impl MockPointer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> MockPointerHandle {
        MockPointerHandle {
            calls: Arc::clone(&self.calls),
        }
    }
}

/// Clonable observer handle for [`MockPointer`].
#[derive(Clone)]
pub struct MockPointerHandle {
    calls: Arc<Mutex<Vec<PointerCall>>>,
}

impl MockPointerHandle {
    pub fn calls(&self) -> Vec<PointerCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Pointer for MockPointer {
    async fn move_to(&mut self, x: i32, y: i32) -> Result<(), InputError> {
        self.calls.lock().unwrap().push(PointerCall::MoveTo(x, y));
        Ok(())
    }

    async fn move_rel(&mut self, dx: i32, dy: i32) -> Result<(), InputError> {
        self.calls.lock().unwrap().push(PointerCall::MoveRel(dx, dy));
        Ok(())
    }

    async fn press(&mut self, button: u16) -> Result<(), InputError> {
        self.calls.lock().unwrap().push(PointerCall::Press(button));
        Ok(())
    }

    async fn release(&mut self, button: u16) -> Result<(), InputError> {
        self.calls.lock().unwrap().push(PointerCall::Release(button));
        Ok(())
    }

    async fn tap(&mut self, x: i32, y: i32, button: u16) -> Result<(), InputError> {
        self.calls
            .lock()
            .unwrap()
            .push(PointerCall::Tap(x, y, button));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockKeyboard
// ---------------------------------------------------------------------------

/// A recorded call on a [`MockKeyboard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCall {
    Press(u16),
    Release(u16),
    Tap(u16),
}

/// Mock keyboard recording every call.
#[derive(Default)]
pub struct MockKeyboard {
    calls: Arc<Mutex<Vec<KeyCall>>>,
}

impl MockKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> MockKeyboardHandle {
        MockKeyboardHandle {
            calls: Arc::clone(&self.calls),
        }
    }
}

/// Clonable observer handle for [`MockKeyboard`].
#[derive(Clone)]
pub struct MockKeyboardHandle {
    calls: Arc<Mutex<Vec<KeyCall>>>,
}

impl MockKeyboardHandle {
    pub fn calls(&self) -> Vec<KeyCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Keyboard for MockKeyboard {
    async fn press(&mut self, code: u16) -> Result<(), InputError> {
        self.calls.lock().unwrap().push(KeyCall::Press(code));
        Ok(())
    }

    async fn release(&mut self, code: u16) -> Result<(), InputError> {
        self.calls.lock().unwrap().push(KeyCall::Release(code));
        Ok(())
    }

    async fn tap(&mut self, code: u16) -> Result<(), InputError> {
        self.calls.lock().unwrap().push(KeyCall::Tap(code));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockRecorder
// ---------------------------------------------------------------------------

/// A recorded call on a [`MockRecorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderCall {
    Start(RecorderFilter),
    Stop,
    Fetch,
}

#[derive(Debug, Default)]
struct MockRecorderState {
    calls: Vec<RecorderCall>,
    queue: Vec<RecordedEvent>,
    recording: bool,
}

/// Mock event recorder with a test-fed queue.
#[derive(Default)]
pub struct MockRecorder {
    state: Arc<Mutex<MockRecorderState>>,
}

impl MockRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> MockRecorderHandle {
        MockRecorderHandle {
            state: Arc::clone(&self.state),
        }
    }
}

/// Clonable observer handle for [`MockRecorder`].
#[derive(Clone)]
pub struct MockRecorderHandle {
    state: Arc<Mutex<MockRecorderState>>,
}

impl MockRecorderHandle {
    pub fn calls(&self) -> Vec<RecorderCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn is_recording(&self) -> bool {
        self.state.lock().unwrap().recording
    }

    /// Feed an event into the queue, as if a device had produced it.
    pub fn push_event(&self, event: RecordedEvent) {
        self.state.lock().unwrap().queue.push(event);
    }
}

#[async_trait]
impl EventRecorder for MockRecorder {
    async fn start(&mut self, filter: &RecorderFilter) -> Result<(), InputError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecorderCall::Start(filter.clone()));
        state.queue.clear();
        state.recording = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), InputError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecorderCall::Stop);
        state.recording = false;
        Ok(())
    }

    async fn fetch(&mut self) -> Vec<RecordedEvent> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecorderCall::Fetch);
        std::mem::take(&mut state.queue)
    }
}
