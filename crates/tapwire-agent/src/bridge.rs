//! Privilege bridge: sub-agents running under other accounts.
//!
//! When the agent lacks the rights for an operation it spawns a copy of
//! itself under a privileged account (via `su` on a pty by default), scrapes
//! the handshake from the terminal output, and forwards protocol lines
//! verbatim. One sub-agent is kept per username and reused across commands.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::time::Duration;

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use tapwire_protocol::{parse_response, ProtocolError, READY_MARKER};
use tapwire_types::Value;

use crate::config::BridgeConfig;

/// Prompt `su` prints before reading the password.
const PASSWORD_PROMPT: &str = "Password:";

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("sub-agent for \"{username}\" did not answer: {detail}")]
    SubAgentUnreachable {
        username: String,
        detail: String,
        /// Terminal output collected before giving up.
        output: String,
    },

    #[error("failed to spawn sub-agent: {0}")]
    Spawn(String),
}

/// Buffered view over the sub-agent's terminal output.
///
/// A detached thread pumps the blocking pty reader into the channel; the
/// buffer accumulates chunks so markers split across reads are still found.
struct OutputBuffer {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    buf: Vec<u8>,
}

impl OutputBuffer {
    fn spawn(mut reader: Box<dyn Read + Send>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            let mut chunk = [0u8; 4096];
            loop {
                match reader.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if tx.send(chunk[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        Self {
            rx,
            buf: Vec::new(),
        }
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }

    /// Wait until any of `markers` appears in the buffered output. Returns
    /// the markers seen so far, empty on deadline or stream end.
    async fn wait_for(&mut self, markers: &[&str], deadline: Instant) -> Vec<String> {
        loop {
            let text = self.text();
            let found: Vec<String> = markers
                .iter()
                .filter(|m| text.contains(**m))
                .map(|m| (*m).to_string())
                .collect();
            if !found.is_empty() {
                return found;
            }
            match timeout_at(deadline, self.rx.recv()).await {
                Ok(Some(chunk)) => self.buf.extend(chunk),
                Ok(None) | Err(_) => return Vec::new(),
            }
        }
    }

    /// Read one line, blocking until a newline or stream end.
    async fn read_line(&mut self) -> Option<String> {
        loop {
            if let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = self.buf.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                return Some(line);
            }
            match self.rx.recv().await {
                Some(chunk) => self.buf.extend(chunk),
                None => return None,
            }
        }
    }

    /// Drop complete lines until one containing `marker` has been consumed.
    async fn consume_line_with(&mut self, marker: &str, deadline: Instant) -> bool {
        loop {
            if let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = self.buf.drain(..=pos).collect();
                if String::from_utf8_lossy(&raw).contains(marker) {
                    return true;
                }
                continue;
            }
            match timeout_at(deadline, self.rx.recv()).await {
                Ok(Some(chunk)) => self.buf.extend(chunk),
                Ok(None) | Err(_) => return false,
            }
        }
    }
}

struct SubAgent {
    // Keeps the pty alive; dropping it hangs up on the child.
    _master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
    writer: Box<dyn Write + Send>,
    output: OutputBuffer,
}

impl SubAgent {
    fn send_line(&mut self, line: &str) -> std::io::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\r")?;
        self.writer.flush()
    }
}

/// Pool of sub-agents, one per username.
pub struct SubAgentBridge {
    agents: HashMap<String, SubAgent>,
    command: Option<Vec<String>>,
    handshake_timeout: Duration,
}

impl SubAgentBridge {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            agents: HashMap::new(),
            command: config.agent_command.clone(),
            handshake_timeout: Duration::from_millis(config.handshake_timeout_ms),
        }
    }

    pub fn has_agent(&self, username: &str) -> bool {
        self.agents.contains_key(username)
    }

    fn command_for(&self, username: &str) -> Vec<String> {
        if let Some(cmd) = &self.command {
            return cmd
                .iter()
                .map(|arg| arg.replace("{username}", username))
                .collect();
        }
        let exe = std::env::current_exe()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "tapwire".to_string());
        vec![
            "su".to_string(),
            "-c".to_string(),
            format!("{exe} --sub-agent"),
            "-".to_string(),
            username.to_string(),
        ]
    }

    async fn open(&self, username: &str, password: &str) -> Result<SubAgent, BridgeError> {
        let cmd = self.command_for(username);
        debug!(username, command = ?cmd, "spawning sub-agent");

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: 24,
                cols: 80,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| BridgeError::Spawn(e.to_string()))?;
        let mut builder = CommandBuilder::new(&cmd[0]);
        builder.args(&cmd[1..]);
        let child = pair
            .slave
            .spawn_command(builder)
            .map_err(|e| BridgeError::Spawn(e.to_string()))?;
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| BridgeError::Spawn(e.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| BridgeError::Spawn(e.to_string()))?;
        let mut agent = SubAgent {
            _master: pair.master,
            child,
            writer,
            output: OutputBuffer::spawn(reader),
        };

        let deadline = Instant::now() + self.handshake_timeout;
        let found = agent
            .output
            .wait_for(&[PASSWORD_PROMPT, READY_MARKER], deadline)
            .await;

        let unreachable = |detail: &str, output: String| BridgeError::SubAgentUnreachable {
            username: username.to_string(),
            detail: detail.to_string(),
            output,
        };

        if found.iter().any(|m| m == PASSWORD_PROMPT)
            && !found.iter().any(|m| m == READY_MARKER)
        {
            if let Err(e) = agent.send_line(password) {
                let _ = agent.child.kill();
                return Err(unreachable(&format!("password write: {e}"), agent.output.text()));
            }
            let deadline = Instant::now() + self.handshake_timeout;
            if !agent.output.consume_line_with(READY_MARKER, deadline).await {
                let _ = agent.child.kill();
                return Err(unreachable("no greeting after password", agent.output.text()));
            }
        } else if found.iter().any(|m| m == READY_MARKER) {
            if !agent.output.consume_line_with(READY_MARKER, deadline).await {
                let _ = agent.child.kill();
                return Err(unreachable("greeting line never completed", agent.output.text()));
            }
        } else {
            let _ = agent.child.kill();
            return Err(unreachable("no prompt or greeting", agent.output.text()));
        }

        info!(username, "sub-agent ready");
        Ok(agent)
    }

    /// Forward one protocol line to the sub-agent for `username`, spawning it
    /// first if needed. Always reports through the response pair; a failed
    /// spawn yields status false with an `(-1, output, error)` payload and
    /// the next call retries from scratch.
    pub async fn forward(&mut self, username: &str, password: &str, line: &str) -> (bool, Value) {
        if !self.agents.contains_key(username) {
            match self.open(username, password).await {
                Ok(agent) => {
                    self.agents.insert(username.to_string(), agent);
                }
                Err(e) => {
                    warn!(username, error = %e, "sub-agent unavailable");
                    let output = match &e {
                        BridgeError::SubAgentUnreachable { output, .. } => output.clone(),
                        BridgeError::Spawn(_) => String::new(),
                    };
                    return (
                        false,
                        Value::List(vec![
                            Value::Int(-1),
                            Value::Str(output),
                            Value::Str(e.to_string()),
                        ]),
                    );
                }
            }
        }
        let Some(agent) = self.agents.get_mut(username) else {
            return (false, Value::Str("sub-agent missing".to_string()));
        };

        if let Err(e) = agent.send_line(line) {
            self.agents.remove(username);
            return (false, Value::Str(format!("sub-agent write failed: {e}")));
        }
        loop {
            match agent.output.read_line().await {
                // The pty echoes what we wrote; skip it.
                Some(echoed) if echoed.trim_end() == line => {}
                Some(response) => {
                    return match parse_response(&response) {
                        Ok(pair) => pair,
                        Err(ProtocolError::BadFrame(_)) => (false, Value::Str(response)),
                        Err(e) => (false, Value::Str(e.to_string())),
                    };
                }
                None => {
                    self.agents.remove(username);
                    return (false, Value::Str("sub-agent hung up".to_string()));
                }
            }
        }
    }

    /// Ask every sub-agent to quit. Best effort, no exit confirmation.
    pub async fn close_all(&mut self) {
        for (username, mut agent) in self.agents.drain() {
            debug!(username, "closing sub-agent");
            let _ = agent.send_line("quit");
        }
    }
}
