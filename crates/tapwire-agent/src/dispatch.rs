//! The request loop.
//!
//! One command in, one response out, strictly in order. Requests are served
//! sequentially; a long gesture delays everything behind it, which is what a
//! scripted test run wants.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use tapwire_input::keymap::char_to_chord;
use tapwire_input::InputError;
use tapwire_protocol::{encode_value, format_response, Command};
use tapwire_types::key::{key_code, key_names};
use tapwire_types::{RecordedEvent, ShellRequest, Value};

use crate::context::AgentContext;
use crate::error::AgentError;
use crate::shell::run_shell;

enum KeyOp {
    Down,
    Press,
    Up,
}

/// Serves one control-channel session over a line stream.
pub struct Dispatcher {
    ctx: AgentContext,
}

impl Dispatcher {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    /// Run the session to completion: greeting, then the request loop.
    ///
    /// The loop ends on `quit`, an empty line, or end of stream. Sub-agents
    /// are asked to quit on the way out.
    pub async fn run<R, W>(&mut self, mut reader: R, mut writer: W) -> Result<(), AgentError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("session started");
        send(&mut writer, true, &self.ctx.greeting()).await?;

        let mut buf = String::new();
        loop {
            buf.clear();
            if reader.read_line(&mut buf).await? == 0 {
                break;
            }
            let line = buf.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                break;
            }
            debug!(line, "request");
            let (ok, payload, stop) = self.handle(line).await;
            send(&mut writer, ok, &payload).await?;
            if stop {
                break;
            }
        }

        self.ctx.bridge.close_all().await;
        info!("session ended");
        Ok(())
    }

    /// Handle one request line. Returns `(status, payload, stop)`.
    async fn handle(&mut self, line: &str) -> (bool, Value, bool) {
        let cmd = match Command::parse(line) {
            Ok(cmd) => cmd,
            Err(e) => return (false, Value::Str(e.to_string()), false),
        };

        if !self.ctx.privileged && needs_devices(&cmd) {
            let username = self.ctx.config.bridge.username.clone();
            let password = self.ctx.config.bridge.password.clone();
            let (ok, payload) = self.ctx.bridge.forward(&username, &password, line).await;
            return (ok, payload, false);
        }

        let stop = matches!(cmd, Command::Quit);
        let (ok, payload) = self.execute(cmd).await;
        (ok, payload, stop)
    }

    async fn execute(&mut self, cmd: Command) -> (bool, Value) {
        let ctx = &mut self.ctx;
        match cmd {
            Command::TouchMove { x, y } => {
                if let Some(touch) = ctx.touch.as_deref_mut() {
                    report(touch.move_to(x, y).await)
                } else if let Some(pointer) = ctx.pointer.as_deref_mut() {
                    report(pointer.move_to(x, y).await)
                } else {
                    no_device("touch or pointer")
                }
            }
            Command::RelativeMove { dx, dy } => match ctx.pointer.as_deref_mut() {
                Some(pointer) => report(pointer.move_rel(dx, dy).await),
                None => no_device("pointer"),
            },
            Command::Tap { x, y, button } => {
                if let Some(touch) = ctx.touch.as_deref_mut() {
                    report(touch.tap(x, y).await)
                } else if let Some(pointer) = ctx.pointer.as_deref_mut() {
                    report(pointer.tap(x, y, button.saturating_sub(1)).await)
                } else {
                    no_device("touch or pointer")
                }
            }
            Command::TouchDown { x, y, button } => {
                if let Some(touch) = ctx.touch.as_deref_mut() {
                    report(touch.press_finger(button.saturating_sub(1), x, y).await)
                } else if let Some(pointer) = ctx.pointer.as_deref_mut() {
                    let button = button.saturating_sub(1);
                    report(async {
                        pointer.move_to(x, y).await?;
                        pointer.press(button).await
                    }
                    .await)
                } else {
                    no_device("touch or pointer")
                }
            }
            Command::TouchUp { x, y, button } => {
                if let Some(touch) = ctx.touch.as_deref_mut() {
                    report(touch.release_finger(button.saturating_sub(1)).await)
                } else if let Some(pointer) = ctx.pointer.as_deref_mut() {
                    let button = button.saturating_sub(1);
                    report(async {
                        pointer.move_to(x, y).await?;
                        pointer.release(button).await
                    }
                    .await)
                } else {
                    no_device("touch or pointer")
                }
            }
            Command::KeyDown { name } => self.key_op(&name, KeyOp::Down).await,
            Command::KeyPress { name } => self.key_op(&name, KeyOp::Press).await,
            Command::KeyUp { name } => self.key_op(&name, KeyOp::Up).await,
            Command::ListKeys => (
                true,
                Value::List(key_names().into_iter().map(Value::from).collect()),
            ),
            Command::TypeText { text } => self.type_text(&text).await,
            Command::LinearGesture(spec) => match ctx.touch.as_deref_mut() {
                Some(touch) => match ctx.gestures.play_linear(touch, &spec).await {
                    Ok(()) => (true, Value::None),
                    Err(e) => (false, Value::Str(e.to_string())),
                },
                None => no_device("touch"),
            },
            Command::SetScreenSize { width, height } => {
                ctx.config.screen.width = width;
                ctx.config.screen.height = height;
                ctx.gestures.set_screen_size(width, height);
                match ctx.touch.as_deref_mut() {
                    Some(touch) => {
                        touch.set_screen_size(width, height);
                        (true, Value::None)
                    }
                    None => (true, Value::Str("no touch device".to_string())),
                }
            }
            Command::SetScreenAngle { degrees } => match ctx.touch.as_deref_mut() {
                Some(touch) => {
                    // Compensate: a panel rotated by N degrees needs inputs
                    // rotated by -N.
                    touch.set_screen_angle(-degrees);
                    (true, Value::None)
                }
                None => (true, Value::Str("no touch device".to_string())),
            },
            Command::RecorderStart(filter) => match ctx.recorder.as_deref_mut() {
                Some(recorder) => report(recorder.start(&filter).await),
                None => no_device("recorder"),
            },
            Command::RecorderStop => match ctx.recorder.as_deref_mut() {
                Some(recorder) => report(recorder.stop().await),
                None => no_device("recorder"),
            },
            Command::RecorderFetch => match ctx.recorder.as_deref_mut() {
                Some(recorder) => {
                    let events = recorder.fetch().await;
                    (
                        true,
                        Value::List(events.iter().map(RecordedEvent::to_value).collect()),
                    )
                }
                None => no_device("recorder"),
            },
            Command::Shell(req) => {
                if req.username.is_empty() {
                    run_shell(&req).await
                } else {
                    self.forward_shell(req).await
                }
            }
            Command::Quit => (true, Value::Bool(true)),
        }
    }

    /// Route an `es` request for another account through the bridge, with
    /// the credentials stripped from the forwarded payload.
    async fn forward_shell(&mut self, req: ShellRequest) -> (bool, Value) {
        let mut forwarded = req.clone();
        forwarded.username.clear();
        forwarded.password.clear();
        let blob = match encode_value(&forwarded.to_value()) {
            Ok(blob) => blob,
            Err(e) => return (false, Value::Str(e.to_string())),
        };
        self.ctx
            .bridge
            .forward(&req.username, &req.password, &format!("es {blob}"))
            .await
    }

    async fn key_op(&mut self, name: &str, op: KeyOp) -> (bool, Value) {
        let Some(code) = key_code(name) else {
            return (false, Value::Str(format!("no keycode for key \"{name}\"")));
        };
        let Some(keyboard) = self.ctx.keyboard.as_deref_mut() else {
            return no_device("keyboard");
        };
        let result = match op {
            KeyOp::Down => keyboard.press(code).await,
            KeyOp::Press => keyboard.tap(code).await,
            KeyOp::Up => keyboard.release(code).await,
        };
        report(result)
    }

    /// Type a string as a sequence of key chords. Characters with no chord
    /// on the layout are skipped and reported back.
    async fn type_text(&mut self, text: &str) -> (bool, Value) {
        let delay = Duration::from_millis(self.ctx.config.agent.type_delay_ms);
        let Some(keyboard) = self.ctx.keyboard.as_deref_mut() else {
            return no_device("keyboard");
        };

        let mut skipped = Vec::new();
        let mut first = true;
        for c in text.chars() {
            if !first && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            first = false;
            let Some(chord) = char_to_chord(c) else {
                skipped.push(Value::Str(c.to_string()));
                continue;
            };
            for modifier in &chord.modifiers {
                if let Err(e) = keyboard.press(*modifier).await {
                    return (false, Value::Str(e.to_string()));
                }
            }
            let tapped = keyboard.tap(chord.code).await;
            for modifier in chord.modifiers.iter().rev() {
                if let Err(e) = keyboard.release(*modifier).await {
                    return (false, Value::Str(e.to_string()));
                }
            }
            if let Err(e) = tapped {
                return (false, Value::Str(e.to_string()));
            }
        }
        (skipped.is_empty(), Value::List(skipped))
    }
}

/// Device commands are the ones an unprivileged agent hands to the bridge.
fn needs_devices(cmd: &Command) -> bool {
    matches!(
        cmd,
        Command::TouchMove { .. }
            | Command::RelativeMove { .. }
            | Command::Tap { .. }
            | Command::TouchDown { .. }
            | Command::TouchUp { .. }
            | Command::KeyDown { .. }
            | Command::KeyPress { .. }
            | Command::KeyUp { .. }
            | Command::TypeText { .. }
            | Command::LinearGesture(_)
            | Command::SetScreenSize { .. }
            | Command::SetScreenAngle { .. }
            | Command::RecorderStart(_)
            | Command::RecorderStop
            | Command::RecorderFetch
    )
}

fn report(result: Result<(), InputError>) -> (bool, Value) {
    match result {
        Ok(()) => (true, Value::None),
        Err(e) => (false, Value::Str(e.to_string())),
    }
}

fn no_device(role: &str) -> (bool, Value) {
    (false, Value::Str(format!("no {role} device")))
}

async fn send<W>(writer: &mut W, ok: bool, payload: &Value) -> Result<(), AgentError>
where
    W: AsyncWrite + Unpin,
{
    let line = format_response(ok, payload)?;
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
