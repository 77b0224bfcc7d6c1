use std::sync::Arc;
use tokio::sync::mpsc;

use crate::channel::transport::{Transport, TransportEvent};
use crate::channel::ControlChannel;
use crate::telemetry::registry::DeviceRegistry;
use crate::telemetry::{reducer, ChannelEvent};

/// Single owner of the device registry for one dashboard.
///
/// Holds the transport subscription and turns every inbound transport
/// event into at most one [`ChannelEvent`]. The subscription is unbounded,
/// so a session that falls behind still folds every frame in order.
pub struct Session<T: Transport> {
    channel: Arc<ControlChannel<T>>,
    registry: DeviceRegistry,
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl<T: Transport> Session<T> {
    pub fn new(channel: Arc<ControlChannel<T>>, registry: DeviceRegistry) -> Self {
        let events = channel.transport().subscribe();
        Self {
            channel,
            registry,
            events,
        }
    }

    pub fn channel(&self) -> &Arc<ControlChannel<T>> {
        &self.channel
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn handle(&mut self, event: TransportEvent) -> Option<ChannelEvent> {
        match event {
            TransportEvent::Opened => Some(ChannelEvent::Connected),
            TransportEvent::Closed => Some(ChannelEvent::ConnectionClosed),
            TransportEvent::Error(err) => Some(ChannelEvent::Error(err)),
            TransportEvent::Message(frame) => reducer::apply_frame(&mut self.registry, frame),
        }
    }

    /// Wait for the next event worth surfacing.
    ///
    /// Returns `None` if the transport's event stream has ended.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        while let Some(event) = self.events.recv().await {
            if let Some(event) = self.handle(event) {
                return Some(event);
            }
        }
        None
    }

    /// Like [`Session::next_event`] but returns `None` instead of waiting.
    pub fn try_next_event(&mut self) -> Option<ChannelEvent> {
        while let Ok(event) = self.events.try_recv() {
            if let Some(event) = self.handle(event) {
                return Some(event);
            }
        }
        None
    }

    /// Drain everything already queued.
    pub fn drain_events(&mut self) -> Vec<ChannelEvent> {
        std::iter::from_fn(|| self.try_next_event()).collect()
    }
}
