use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

use crate::error::{ChannelError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Lifecycle and inbound traffic of one connection.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened,
    /// A text frame that parsed as JSON.
    Message(serde_json::Value),
    Closed,
    Error(ChannelError),
}

/// What a call to [`Transport::open`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// This call performed the handshake; the connection is new.
    Established,
    /// Another call already owns an open or pending connection.
    AlreadyActive,
}

/// Owner of exactly one logical connection to the dashboard server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the connection. A no-op when already open or connecting.
    async fn open(&self) -> Result<OpenOutcome>;

    /// Stop delivering inbound events; later sends fail with `NotOpen`.
    async fn close(&self);

    fn ready_state(&self) -> ReadyState;

    /// Serialize `frame` and hand it to the connection without blocking.
    ///
    /// Write failures are emitted as `TransportEvent::Error(SendFailed)`
    /// in addition to being returned.
    fn send(&self, frame: serde_json::Value) -> Result<()>;

    /// Every event emitted from now on, in order. Nothing is dropped for a
    /// slow subscriber.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<TransportEvent>;
}

/// Fan-out of transport events to every live subscriber.
#[derive(Debug, Default)]
pub(crate) struct EventHub {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<TransportEvent>>>,
}

impl EventHub {
    pub(crate) fn subscribe(&self) -> mpsc::UnboundedReceiver<TransportEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.subscribers).push(tx);
        rx
    }

    pub(crate) fn emit(&self, event: TransportEvent) {
        // Dropped receivers are pruned here; no subscribers at all is fine.
        lock(&self.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Parse one inbound text frame, reporting failures with the raw payload.
pub(crate) fn parse_text_frame(text: &str) -> TransportEvent {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) => TransportEvent::Message(value),
        Err(e) => {
            tracing::warn!(error = %e, raw = %text, "dropping malformed inbound frame");
            TransportEvent::Error(ChannelError::MalformedInbound {
                raw: text.to_string(),
                reason: e.to_string(),
            })
        }
    }
}

pub(crate) fn encode_frame(frame: &serde_json::Value) -> Result<String> {
    serde_json::to_string(frame).map_err(|e| ChannelError::SendFailed(e.to_string()))
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
