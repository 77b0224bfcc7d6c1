pub mod mock;
pub mod models;
pub mod throttle;
pub mod transport;
pub mod ws;

use models::{MessageType, OutboundFrame, OutboundMessage};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use throttle::{Clock, SystemClock, Throttle};
use transport::{lock, OpenOutcome, ReadyState, Transport};

use crate::error::{ChannelError, Result};

/// What happened to a control message handed to the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent { client_ts: i64 },
    /// Dropped because a frame of the same type went out too recently.
    Throttled,
}

/// Rate-limited, timestamped control path on top of a [`Transport`].
pub struct ControlChannel<T: Transport> {
    transport: Arc<T>,
    throttle: Mutex<Throttle>,
    clock: Arc<dyn Clock>,
}

impl<T: Transport> ControlChannel<T> {
    pub fn new(transport: Arc<T>, min_interval: Duration) -> Self {
        Self::with_clock(transport, min_interval, Arc::new(SystemClock))
    }

    pub fn with_clock(transport: Arc<T>, min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            transport,
            throttle: Mutex::new(Throttle::new(min_interval)),
            clock,
        }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn is_open(&self) -> bool {
        self.transport.ready_state() == ReadyState::Open
    }

    /// Open the connection. Throttle history starts fresh on every new
    /// connection; calling this while already open changes nothing.
    ///
    /// `AlreadyActive` may also mean another caller's handshake is still
    /// pending, so check [`ControlChannel::is_open`] before sending.
    pub async fn open(&self) -> Result<OpenOutcome> {
        if self.is_open() {
            return Ok(OpenOutcome::AlreadyActive);
        }
        let outcome = self.transport.open().await?;
        if outcome == OpenOutcome::Established {
            lock(&self.throttle).reset();
        }
        Ok(outcome)
    }

    pub async fn close(&self) {
        self.transport.close().await;
    }

    pub fn send(&self, message: &OutboundMessage) -> Result<SendOutcome> {
        let kind = message.message_type();
        if !self.is_open() {
            tracing::warn!(message_type = %kind, "connection not open, cannot send control message");
            return Err(ChannelError::NotOpen);
        }

        let now = self.clock.now_millis();
        if !lock(&self.throttle).try_acquire(kind, now) {
            tracing::trace!(message_type = %kind, "control message throttled");
            return Ok(SendOutcome::Throttled);
        }

        let frame = serde_json::to_value(OutboundFrame {
            message,
            client_ts: now,
        })
        .map_err(|e| ChannelError::InvalidFrame(format!("{kind}: {e}")))?;

        self.transport.send(frame).map_err(|e| {
            tracing::warn!(message_type = %kind, error = %e, "control message dropped");
            e
        })?;

        tracing::debug!(message_type = %kind, client_ts = now, "control message sent");
        Ok(SendOutcome::Sent { client_ts: now })
    }

    /// Send an untyped JSON control frame supplied by the embedder.
    ///
    /// Any `client_ts` already present is replaced by a fresh one.
    pub fn send_frame(&self, frame: serde_json::Value) -> Result<SendOutcome> {
        let kind: MessageType = match frame.get("type").and_then(|t| t.as_str()) {
            Some(kind) => kind.parse()?,
            None => return Err(ChannelError::UnknownMessageType("<missing>".to_string())),
        };
        let message: OutboundMessage = serde_json::from_value(frame)
            .map_err(|e| ChannelError::InvalidFrame(format!("{kind}: {e}")))?;
        self.send(&message)
    }

    pub fn move_robot(&self, x: f64, y: f64) -> Result<SendOutcome> {
        self.send(&OutboundMessage::RobotMove { x, y })
    }

    pub fn move_camera(&self, x: f64, y: f64) -> Result<SendOutcome> {
        self.send(&OutboundMessage::CameraMove { x, y })
    }

    pub fn set_speed(&self, value: u8) -> Result<SendOutcome> {
        self.send(&OutboundMessage::SetSpeed { value })
    }

    pub fn set_brightness(&self, value: u8) -> Result<SendOutcome> {
        self.send(&OutboundMessage::SetBrightness { value })
    }

    /// Zero move sent when the robot joystick is released.
    pub fn stop_robot(&self) -> Result<SendOutcome> {
        self.move_robot(0.0, 0.0)
    }

    pub fn stop_camera(&self) -> Result<SendOutcome> {
        self.move_camera(0.0, 0.0)
    }
}
