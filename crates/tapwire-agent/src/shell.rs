//! Shell command execution for the `es` verb.
//!
//! Three modes: synchronous capture (the default), synchronous under a pty
//! for commands that insist on a terminal, and detached with output routed to
//! files. All failures are reported through the response payload, never as
//! dispatcher errors.

use std::fs::{File, OpenOptions};
use std::io::Read;
use std::process::Stdio;

use portable_pty::{native_pty_system, CommandBuilder, PtySize};
use tokio::process::Command;
use tracing::{debug, warn};

use tapwire_types::{ShellRequest, Value};

/// Run a shell request and produce the `(status, payload)` response pair.
///
/// Synchronous payloads are `(exit_code, stdout, stderr)`; detached runs
/// answer `(0, None, None)` immediately. Spawn failures answer
/// `(None, None, error)` with status false.
pub async fn run_shell(req: &ShellRequest) -> (bool, Value) {
    debug!(command = %req.command, detached = req.detached(), "shell request");
    if req.detached() {
        run_detached(req).await
    } else if req.use_pty {
        run_pty(req).await
    } else {
        run_sync(req).await
    }
}

fn spawn_failure(e: impl std::fmt::Display) -> (bool, Value) {
    (
        false,
        Value::List(vec![Value::None, Value::None, Value::Str(e.to_string())]),
    )
}

async fn run_sync(req: &ShellRequest) -> (bool, Value) {
    let output = Command::new("sh")
        .arg("-c")
        .arg(&req.command)
        .stdin(Stdio::null())
        .output()
        .await;
    match output {
        Ok(out) => {
            let code = i64::from(out.status.code().unwrap_or(-1));
            (
                true,
                Value::List(vec![
                    Value::Int(code),
                    Value::Str(String::from_utf8_lossy(&out.stdout).into_owned()),
                    Value::Str(String::from_utf8_lossy(&out.stderr).into_owned()),
                ]),
            )
        }
        Err(e) => spawn_failure(e),
    }
}

/// Synchronous run on a pty. stdout carries the combined terminal output,
/// stderr is empty since the pty merges the streams.
async fn run_pty(req: &ShellRequest) -> (bool, Value) {
    let command = req.command.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<(i64, String), String> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: 24,
                cols: 80,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| e.to_string())?;
        let mut builder = CommandBuilder::new("sh");
        builder.args(["-c", &command]);
        let mut child = pair
            .slave
            .spawn_command(builder)
            .map_err(|e| e.to_string())?;
        drop(pair.slave);
        let mut reader = pair.master.try_clone_reader().map_err(|e| e.to_string())?;

        let mut output = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            // Read errors after child exit mean pty hangup, not failure.
            match reader.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => output.extend_from_slice(&chunk[..n]),
            }
        }
        let status = child.wait().map_err(|e| e.to_string())?;
        Ok((
            i64::from(status.exit_code()),
            String::from_utf8_lossy(&output).into_owned(),
        ))
    })
    .await;

    match result {
        Ok(Ok((code, out))) => (
            true,
            Value::List(vec![
                Value::Int(code),
                Value::Str(out),
                Value::Str(String::new()),
            ]),
        ),
        Ok(Err(e)) => spawn_failure(e),
        Err(e) => spawn_failure(e),
    }
}

fn open_sink(path: Option<&str>) -> std::io::Result<File> {
    match path {
        Some(p) => OpenOptions::new().append(true).create(true).open(p),
        None => OpenOptions::new().write(true).open("/dev/null"),
    }
}

async fn run_detached(req: &ShellRequest) -> (bool, Value) {
    let out = match open_sink(req.out_file.as_deref()) {
        Ok(f) => f,
        Err(e) => return spawn_failure(e),
    };
    let err = match open_sink(req.err_file.as_deref()) {
        Ok(f) => f,
        Err(e) => return spawn_failure(e),
    };
    let child = Command::new("sh")
        .arg("-c")
        .arg(&req.command)
        .stdin(Stdio::null())
        .stdout(Stdio::from(out))
        .stderr(Stdio::from(err))
        .spawn();
    let mut child = match child {
        Ok(c) => c,
        Err(e) => return spawn_failure(e),
    };

    let status_file = req.status_file.clone();
    tokio::spawn(async move {
        let code = match child.wait().await {
            Ok(status) => status.code().unwrap_or(-1),
            Err(_) => -1,
        };
        if let Some(path) = status_file {
            if let Err(e) = append_status(&path, code) {
                warn!(path, error = %e, "could not record exit status");
            }
        }
    });
    (
        true,
        Value::List(vec![Value::Int(0), Value::None, Value::None]),
    )
}

fn append_status(path: &str, code: i32) -> std::io::Result<()> {
    use std::io::Write;
    let mut file = OpenOptions::new().append(true).create(true).open(path)?;
    writeln!(file, "{code}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(command: &str) -> ShellRequest {
        ShellRequest {
            command: command.to_string(),
            username: String::new(),
            password: String::new(),
            status_file: None,
            out_file: None,
            err_file: None,
            use_pty: false,
        }
    }

    fn parts(value: &Value) -> &[Value] {
        match value {
            Value::List(items) => items,
            other => panic!("expected list payload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn sync_captures_streams_and_exit_code() {
        let (ok, payload) = run_shell(&request("echo out; echo err >&2; exit 3")).await;
        assert!(ok);
        let parts = parts(&payload);
        assert_eq!(parts[0], Value::Int(3));
        assert_eq!(parts[1], Value::Str("out\n".to_string()));
        assert_eq!(parts[2], Value::Str("err\n".to_string()));
    }

    #[tokio::test]
    async fn detached_answers_immediately_and_records_status() {
        let dir = std::env::temp_dir();
        let status_path = dir.join(format!("tapwire-status-{}", std::process::id()));
        let mut req = request("exit 7");
        req.status_file = Some(status_path.display().to_string());

        let (ok, payload) = run_shell(&req).await;
        assert!(ok);
        assert_eq!(parts(&payload)[0], Value::Int(0));

        let mut recorded = String::new();
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            recorded = std::fs::read_to_string(&status_path).unwrap_or_default();
            if !recorded.is_empty() {
                break;
            }
        }
        let _ = std::fs::remove_file(&status_path);
        assert_eq!(recorded.trim(), "7");
    }

    #[tokio::test]
    async fn pty_run_merges_output() {
        let mut req = request("echo terminal");
        req.use_pty = true;
        let (ok, payload) = run_shell(&req).await;
        assert!(ok);
        let parts = parts(&payload);
        assert_eq!(parts[0], Value::Int(0));
        match &parts[1] {
            Value::Str(out) => assert!(out.contains("terminal")),
            other => panic!("expected string stdout, got {other:?}"),
        }
    }
}
