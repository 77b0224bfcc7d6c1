pub mod channel;
pub mod config;
pub mod error;
pub mod joystick;
pub mod logging;
pub mod session;
pub mod telemetry;

pub use channel::mock::MockTransport;
pub use channel::models::{InboundMessage, MessageType, OutboundMessage, TelemetryFields};
pub use channel::transport::{OpenOutcome, ReadyState, Transport, TransportEvent};
pub use channel::ws::WebSocketTransport;
pub use channel::{ControlChannel, SendOutcome};
pub use config::Config;
pub use error::{ChannelError, Result};
pub use session::Session;
pub use telemetry::registry::{Device, DeviceRegistry};
pub use telemetry::ChannelEvent;

use std::sync::Arc;

/// Wire a WebSocket transport, control channel and session from `config`.
pub fn build_session(config: &Config) -> Session<WebSocketTransport> {
    let transport = Arc::new(WebSocketTransport::new(config.telemetry_ws_url.clone()));
    let channel = Arc::new(ControlChannel::new(transport, config.min_send_interval));
    let registry = DeviceRegistry::with_devices(config.device_ids.iter().cloned());
    Session::new(channel, registry)
}
