use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::{mpsc, watch};

use super::models::TelemetryFields;
use super::transport::{
    encode_frame, lock, parse_text_frame, EventHub, OpenOutcome, ReadyState, Transport,
    TransportEvent,
};
use crate::error::{ChannelError, Result};

/// In-process transport: records what would go on the wire and lets the
/// caller play the server's side of the conversation.
pub struct MockTransport {
    state: watch::Sender<ReadyState>,
    events: EventHub,
    sent: Mutex<Vec<serde_json::Value>>,
    fail_writes: AtomicBool,
    opens: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ReadyState::Closed);
        Self {
            state,
            events: EventHub::default(),
            sent: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
            opens: AtomicUsize::new(0),
        }
    }

    /// Frames written so far, oldest first.
    pub fn sent_frames(&self) -> Vec<serde_json::Value> {
        lock(&self.sent).clone()
    }

    pub fn take_sent(&self) -> Vec<serde_json::Value> {
        std::mem::take(&mut *lock(&self.sent))
    }

    /// How many times a connection was actually established.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Make subsequent writes fail as if the socket broke.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Deliver a raw text frame from the "server". Ignored unless open.
    pub fn inject_text(&self, text: &str) {
        if self.ready_state() != ReadyState::Open {
            return;
        }
        self.events.emit(parse_text_frame(text));
    }

    pub fn inject(&self, frame: serde_json::Value) {
        self.inject_text(&frame.to_string());
    }

    /// Synthetic `telemetry_update` frame, as a robot agent would report.
    pub fn inject_telemetry(&self, device_id: Option<&str>, fields: &TelemetryFields) {
        let mut frame = serde_json::json!({ "type": "telemetry_update" });
        if let Some(id) = device_id {
            frame["device_id"] = serde_json::Value::from(id);
        }
        for (key, value) in [
            ("battery", fields.battery),
            ("cpu", fields.cpu),
            ("temperature", fields.temperature),
            ("signal", fields.signal),
        ] {
            if let Some(value) = value {
                frame[key] = serde_json::Value::from(value);
            }
        }
        self.inject(frame);
    }

    /// Simulate the server hanging up.
    pub fn drop_connection(&self) {
        if self.state.send_replace(ReadyState::Closed) != ReadyState::Closed {
            self.events.emit(TransportEvent::Closed);
        }
    }

    /// Park the transport in `Connecting`, as if another caller's handshake
    /// were still in flight.
    pub fn begin_handshake(&self) {
        self.state.send_replace(ReadyState::Connecting);
    }

    /// Complete a handshake started with [`MockTransport::begin_handshake`].
    pub fn complete_handshake(&self) {
        if self.state.send_replace(ReadyState::Open) != ReadyState::Open {
            self.opens.fetch_add(1, Ordering::SeqCst);
            self.events.emit(TransportEvent::Opened);
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self) -> Result<OpenOutcome> {
        if self.ready_state() != ReadyState::Closed {
            return Ok(OpenOutcome::AlreadyActive);
        }
        self.complete_handshake();
        Ok(OpenOutcome::Established)
    }

    async fn close(&self) {
        self.drop_connection();
    }

    fn ready_state(&self) -> ReadyState {
        *self.state.borrow()
    }

    fn send(&self, frame: serde_json::Value) -> Result<()> {
        if self.ready_state() != ReadyState::Open {
            return Err(ChannelError::NotOpen);
        }
        let report = |err: ChannelError| {
            self.events.emit(TransportEvent::Error(err.clone()));
            err
        };
        encode_frame(&frame).map_err(report)?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(report(ChannelError::SendFailed(
                "simulated write failure".to_string(),
            )));
        }
        lock(&self.sent).push(frame);
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<TransportEvent> {
        self.events.subscribe()
    }
}
