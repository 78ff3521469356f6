//! evdev-based event recording.
//!
//! Reads events passively from `/dev/input/event*` devices (no exclusive
//! grab) into an unbounded queue. Injected virtual devices show up in the
//! enumeration like any other node, so a recording session also sees the
//! events this agent emits.

use std::path::PathBuf;

use async_trait::async_trait;
use evdev::Device;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::InputError;
use crate::EventRecorder;
use tapwire_types::{RecordedEvent, RecorderFilter};

/// Kernel event class name used for filter matching.
fn type_name(event_type: u16) -> &'static str {
    match event_type {
        0x00 => "syn",
        0x01 => "key",
        0x02 => "rel",
        0x03 => "abs",
        _ => "other",
    }
}

/// Event recorder over evdev device streams.
#[derive(Default)]
pub struct EvdevRecorder {
    rx: Option<mpsc::UnboundedReceiver<RecordedEvent>>,
    task: Option<JoinHandle<()>>,
    shutdown_tx: Option<watch::Sender<bool>>,
}

impl EvdevRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn matching_devices(filter: &RecorderFilter) -> Vec<(PathBuf, Device)> {
        evdev::enumerate()
            .filter(|(path, _)| filter.accepts_device(&path.display().to_string()))
            .collect()
    }
}

#[async_trait]
impl EventRecorder for EvdevRecorder {
    async fn start(&mut self, filter: &RecorderFilter) -> Result<(), InputError> {
        self.stop().await?;

        let devices = Self::matching_devices(filter);
        if devices.is_empty() {
            return Err(InputError::DeviceOpen(
                "no matching input devices".to_string(),
            ));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut handles = Vec::new();
        for (path, device) in devices {
            let tx = tx.clone();
            let mut shutdown_rx = shutdown_rx.clone();
            let filter = filter.clone();
            let device_path = path.display().to_string();

            let handle: JoinHandle<()> = tokio::spawn(async move {
                let mut stream = match device.into_event_stream() {
                    Ok(s) => s,
                    Err(e) => {
                        warn!(path = %device_path, error = %e, "cannot stream device");
                        return;
                    }
                };
                loop {
                    tokio::select! {
                        _ = shutdown_rx.changed() => break,
                        result = stream.next_event() => match result {
                            Ok(ev) => {
                                let event_type = ev.event_type().0;
                                if !filter.accepts_type(type_name(event_type)) {
                                    continue;
                                }
                                let timestamp_us = ev
                                    .timestamp()
                                    .duration_since(std::time::SystemTime::UNIX_EPOCH)
                                    .ok()
                                    .and_then(|d| i64::try_from(d.as_micros()).ok())
                                    .unwrap_or(0);
                                let recorded = RecordedEvent {
                                    timestamp_us,
                                    device: device_path.clone(),
                                    event_type,
                                    code: ev.code(),
                                    value: ev.value(),
                                };
                                if tx.send(recorded).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(path = %device_path, error = %e, "device read error");
                                break;
                            }
                        }
                    }
                }
            });
            handles.push(handle);
        }

        self.task = Some(tokio::spawn(async move {
            for handle in handles {
                let _ = handle.await;
            }
        }));
        self.shutdown_tx = Some(shutdown_tx);
        self.rx = Some(rx);
        info!("event recording started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), InputError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
            info!("event recording stopped");
        }
        Ok(())
    }

    async fn fetch(&mut self) -> Vec<RecordedEvent> {
        let mut events = Vec::new();
        if let Some(rx) = self.rx.as_mut() {
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
        }
        events
    }
}
