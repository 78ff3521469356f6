//! Agent configuration.
//!
//! Loaded from a TOML file when one is given, otherwise defaults apply.
//! Device specs are plain strings here; resolution into backends happens in
//! [`crate::context`].

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AgentError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub agent: AgentConfig,
    pub screen: ScreenConfig,
    pub devices: DeviceConfig,
    pub bridge: BridgeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Log level filter: trace, debug, info, warn, error.
    pub log_level: String,
    /// Delay between typed characters in `kt`, milliseconds.
    pub type_delay_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            type_delay_ms: default_type_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub width: i32,
    pub height: i32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: default_screen_width(),
            height: default_screen_height(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Touch surface spec, see [`DeviceSpec`].
    pub touch: String,
    pub mouse: String,
    pub keyboard: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            touch: "virtual".to_string(),
            mouse: "virtual:rel".to_string(),
            keyboard: "virtual".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Account the privilege bridge escalates to.
    pub username: String,
    pub password: String,
    /// Wall-clock budget for each sub-agent handshake phase.
    pub handshake_timeout_ms: u64,
    /// Override for the sub-agent command line. Arguments equal to
    /// `{username}` are substituted before spawning.
    pub agent_command: Option<Vec<String>>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            username: default_bridge_username(),
            password: String::new(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            agent_command: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_type_delay_ms() -> u64 {
    50
}

fn default_screen_width() -> i32 {
    480
}

fn default_screen_height() -> i32 {
    800
}

fn default_bridge_username() -> String {
    "root".to_string()
}

fn default_handshake_timeout_ms() -> u64 {
    5000
}

/// Load configuration from `path`, or defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<Config, AgentError> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let raw = std::fs::read_to_string(path)
        .map_err(|e| AgentError::Config(format!("{}: {e}", path.display())))?;
    let config: Config =
        toml::from_str(&raw).map_err(|e| AgentError::Config(format!("{}: {e}", path.display())))?;
    info!(path = %path.display(), "loaded configuration");
    Ok(config)
}

/// How one input role is backed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSpec {
    /// Create a uinput virtual device; args refine it (`WxH` for touch,
    /// `abs`/`rel` for the mouse).
    Virtual { args: Option<String> },
    /// Write to an existing `/dev/input/eventN` node.
    File(String),
    Disabled,
}

impl FromStr for DeviceSpec {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "disabled" || s.is_empty() {
            return Ok(Self::Disabled);
        }
        if s == "virtual" {
            return Ok(Self::Virtual { args: None });
        }
        if let Some(args) = s.strip_prefix("virtual:") {
            return Ok(Self::Virtual {
                args: Some(args.to_string()),
            });
        }
        if let Some(path) = s.strip_prefix("file:") {
            return Ok(Self::File(path.to_string()));
        }
        Err(AgentError::Config(format!("unknown device spec \"{s}\"")))
    }
}
