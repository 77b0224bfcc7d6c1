use super::registry::DeviceRegistry;
use super::ChannelEvent;
use crate::channel::models::InboundMessage;
use crate::error::ChannelError;

/// Status value that marks a robot as gone.
pub const STATUS_DISCONNECTED: &str = "disconnected";

/// Fold one decoded inbound message into `registry`.
///
/// Only `telemetry_update` mutates the registry, and only the metric
/// fields it carries.
pub fn apply(registry: &mut DeviceRegistry, message: InboundMessage) -> ChannelEvent {
    match message {
        InboundMessage::Ack {
            original_type,
            message,
        } => {
            tracing::info!(
                original_type = %original_type,
                reply = message.as_deref().unwrap_or("OK"),
                "control message acknowledged"
            );
            ChannelEvent::Acknowledged {
                original_type,
                message,
            }
        }
        InboundMessage::TelemetryUpdate { device_id, fields } => {
            let device_id = device_id.unwrap_or_else(|| registry.fallback_id().to_string());
            registry.get_or_provision(&device_id).merge(&fields);
            tracing::debug!(
                device_id = %device_id,
                battery = ?fields.battery,
                cpu = ?fields.cpu,
                temperature = ?fields.temperature,
                signal = ?fields.signal,
                "telemetry applied"
            );
            ChannelEvent::TelemetryApplied { device_id, fields }
        }
        InboundMessage::RobotStatus { device_id, status } => {
            tracing::info!(device_id = %device_id, status = %status, "robot status");
            if status == STATUS_DISCONNECTED {
                ChannelEvent::DeviceDisconnected { device_id }
            } else {
                ChannelEvent::DeviceStatus { device_id, status }
            }
        }
    }
}

/// Decode a raw JSON frame and fold it in.
///
/// Unknown types yield `None` and are only logged; malformed frames of a
/// known type yield an `Error` event. Neither touches the registry.
pub fn apply_frame(registry: &mut DeviceRegistry, frame: serde_json::Value) -> Option<ChannelEvent> {
    match InboundMessage::from_value(frame) {
        Ok(message) => Some(apply(registry, message)),
        Err(ChannelError::UnknownMessageType(kind)) => {
            tracing::debug!(message_type = %kind, "ignoring inbound frame of unknown type");
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, "dropping inbound frame");
            Some(ChannelEvent::Error(err))
        }
    }
}
