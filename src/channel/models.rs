use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ChannelError;

/// Discriminator of an outbound control message. Throttling is keyed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    RobotMove,
    CameraMove,
    SetSpeed,
    SetBrightness,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::RobotMove => "robot_move",
            MessageType::CameraMove => "camera_move",
            MessageType::SetSpeed => "set_speed",
            MessageType::SetBrightness => "set_brightness",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "robot_move" => Ok(MessageType::RobotMove),
            "camera_move" => Ok(MessageType::CameraMove),
            "set_speed" => Ok(MessageType::SetSpeed),
            "set_brightness" => Ok(MessageType::SetBrightness),
            other => Err(ChannelError::UnknownMessageType(other.to_string())),
        }
    }
}

/// Control messages sent from the dashboard to the robot.
///
/// Move coordinates are the absolute accumulated joystick position, not a
/// velocity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    RobotMove { x: f64, y: f64 },
    CameraMove { x: f64, y: f64 },
    SetSpeed { value: u8 },
    SetBrightness { value: u8 },
}

impl OutboundMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            OutboundMessage::RobotMove { .. } => MessageType::RobotMove,
            OutboundMessage::CameraMove { .. } => MessageType::CameraMove,
            OutboundMessage::SetSpeed { .. } => MessageType::SetSpeed,
            OutboundMessage::SetBrightness { .. } => MessageType::SetBrightness,
        }
    }
}

/// An outbound message as it goes on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundFrame<'a> {
    #[serde(flatten)]
    pub message: &'a OutboundMessage,
    pub client_ts: i64,
}

/// Metric fields carried by a `telemetry_update`. Any subset may be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<f64>,
}

impl TelemetryFields {
    pub fn is_empty(&self) -> bool {
        self.battery.is_none()
            && self.cpu.is_none()
            && self.temperature.is_none()
            && self.signal.is_none()
    }
}

/// Messages pushed by the server to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    Ack {
        original_type: String,
        #[serde(default)]
        message: Option<String>,
    },
    TelemetryUpdate {
        #[serde(default, deserialize_with = "lenient_device_id")]
        device_id: Option<String>,
        #[serde(flatten)]
        fields: TelemetryFields,
    },
    RobotStatus {
        device_id: String,
        status: String,
    },
}

/// Robot agents report ids as strings or bare numbers; an empty id counts
/// as no id at all.
fn lenient_device_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(id)) if id.is_empty() => Ok(None),
        Some(serde_json::Value::String(id)) => Ok(Some(id)),
        Some(serde_json::Value::Number(id)) => Ok(Some(id.to_string())),
        Some(other) => Err(de::Error::invalid_type(
            de::Unexpected::Other(&other.to_string()),
            &"a string or numeric device id",
        )),
    }
}

const INBOUND_TYPES: [&str; 3] = ["ack", "telemetry_update", "robot_status"];

impl InboundMessage {
    /// Decode an already-parsed JSON frame.
    ///
    /// Frames with a missing or unrecognised `type` yield
    /// `UnknownMessageType`; a known type with bad fields yields
    /// `MalformedInbound`.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ChannelError> {
        let kind = match value.get("type").and_then(|t| t.as_str()) {
            Some(kind) if INBOUND_TYPES.contains(&kind) => kind.to_string(),
            Some(kind) => return Err(ChannelError::UnknownMessageType(kind.to_string())),
            None => return Err(ChannelError::UnknownMessageType("<missing>".to_string())),
        };

        serde_json::from_value(value.clone()).map_err(|e| ChannelError::MalformedInbound {
            raw: value.to_string(),
            reason: format!("invalid {kind} frame: {e}"),
        })
    }
}
