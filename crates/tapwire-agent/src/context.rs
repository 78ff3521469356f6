//! Agent runtime context: configuration, devices, gesture state, bridge.

use tracing::warn;

use tapwire_input::{EventRecorder, Keyboard, Pointer, TouchSurface};
use tapwire_types::Value;

use crate::bridge::SubAgentBridge;
use crate::config::Config;
use crate::error::AgentError;
use crate::gesture::GestureEngine;

/// Everything the dispatcher needs to serve one session.
///
/// Device roles are optional; operations on a missing role answer with an
/// error response instead of failing the session. Tests plug mock backends
/// straight into the public fields.
pub struct AgentContext {
    pub config: Config,
    /// Whether this process can inject input itself. When false, device
    /// commands go through the privilege bridge.
    pub privileged: bool,
    pub touch: Option<Box<dyn TouchSurface>>,
    pub pointer: Option<Box<dyn Pointer>>,
    pub keyboard: Option<Box<dyn Keyboard>>,
    pub recorder: Option<Box<dyn EventRecorder>>,
    pub gestures: GestureEngine,
    pub bridge: SubAgentBridge,
}

impl AgentContext {
    /// Build a context with no devices attached yet.
    pub fn new(config: Config) -> Self {
        let gestures = GestureEngine::new(config.screen.width, config.screen.height);
        let bridge = SubAgentBridge::new(&config.bridge);
        Self {
            privileged: nix::unistd::Uid::effective().is_root(),
            touch: None,
            pointer: None,
            keyboard: None,
            recorder: None,
            gestures,
            bridge,
            config,
        }
    }

    /// Open the configured injection backends.
    ///
    /// A malformed spec is a configuration error; a device that fails to
    /// open is logged and left absent so the agent still comes up.
    #[cfg(feature = "linux")]
    pub fn open_devices(&mut self) -> Result<(), AgentError> {
        use std::path::Path;

        use tracing::info;

        use tapwire_input::linux::{
            EvdevRecorder, FileKeyboard, FileMouse, FileTouch, UinputKeyboard, UinputMouse,
            UinputTouch,
        };

        use crate::config::DeviceSpec;

        let (width, height) = (self.config.screen.width, self.config.screen.height);

        match self.config.devices.touch.parse::<DeviceSpec>()? {
            DeviceSpec::Disabled => {}
            DeviceSpec::Virtual { args } => {
                let (w, h) = parse_dimensions(args.as_deref()).unwrap_or((width, height));
                match UinputTouch::open(w, h) {
                    Ok(dev) => self.touch = Some(Box::new(dev)),
                    Err(e) => warn!(error = %e, "touch device unavailable"),
                }
            }
            DeviceSpec::File(path) => match FileTouch::open(Path::new(&path), width, height) {
                Ok(dev) => self.touch = Some(Box::new(dev)),
                Err(e) => warn!(error = %e, "touch device unavailable"),
            },
        }

        match self.config.devices.mouse.parse::<DeviceSpec>()? {
            DeviceSpec::Disabled => {}
            DeviceSpec::Virtual { args } => {
                let absolute = args.as_deref() == Some("abs");
                match UinputMouse::open(absolute, width, height) {
                    Ok(dev) => self.pointer = Some(Box::new(dev)),
                    Err(e) => warn!(error = %e, "mouse device unavailable"),
                }
            }
            DeviceSpec::File(path) => match FileMouse::open(Path::new(&path)) {
                Ok(dev) => self.pointer = Some(Box::new(dev)),
                Err(e) => warn!(error = %e, "mouse device unavailable"),
            },
        }

        match self.config.devices.keyboard.parse::<DeviceSpec>()? {
            DeviceSpec::Disabled => {}
            DeviceSpec::Virtual { .. } => match UinputKeyboard::open() {
                Ok(dev) => self.keyboard = Some(Box::new(dev)),
                Err(e) => warn!(error = %e, "keyboard device unavailable"),
            },
            DeviceSpec::File(path) => match FileKeyboard::open(Path::new(&path)) {
                Ok(dev) => self.keyboard = Some(Box::new(dev)),
                Err(e) => warn!(error = %e, "keyboard device unavailable"),
            },
        }

        // The recorder opens its devices lazily on start, so there is
        // nothing to probe here.
        self.recorder = Some(Box::new(EvdevRecorder::new()));

        if self.touch.is_none() && self.pointer.is_some() {
            info!("no touch surface, pointer will stand in for touch operations");
        }
        Ok(())
    }

    #[cfg(not(feature = "linux"))]
    pub fn open_devices(&mut self) -> Result<(), AgentError> {
        warn!("no injection backend on this platform, devices stay absent");
        Ok(())
    }

    /// Greeting payload: the first response of every session.
    pub fn greeting(&self) -> Value {
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string());
        let mut devices = Vec::new();
        if self.touch.is_some() {
            devices.push(Value::from("touch"));
        }
        if self.pointer.is_some() {
            devices.push(Value::from("mouse"));
        }
        if self.keyboard.is_some() {
            devices.push(Value::from("keyboard"));
        }
        Value::Map(vec![
            ("agent".to_string(), Value::from("tapwire")),
            (
                "version".to_string(),
                Value::from(env!("CARGO_PKG_VERSION")),
            ),
            ("hostname".to_string(), Value::Str(hostname)),
            ("privileged".to_string(), Value::Bool(self.privileged)),
            ("devices".to_string(), Value::List(devices)),
        ])
    }
}

#[cfg(feature = "linux")]
fn parse_dimensions(args: Option<&str>) -> Option<(i32, i32)> {
    let (w, h) = args?.split_once('x')?;
    Some((w.parse().ok()?, h.parse().ok()?))
}
