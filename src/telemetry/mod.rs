pub mod reducer;
pub mod registry;

use crate::channel::models::TelemetryFields;
use crate::error::ChannelError;

/// What the dashboard's UI layer gets told about.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connected,
    ConnectionClosed,
    Acknowledged {
        original_type: String,
        message: Option<String>,
    },
    TelemetryApplied {
        device_id: String,
        fields: TelemetryFields,
    },
    DeviceDisconnected {
        device_id: String,
    },
    DeviceStatus {
        device_id: String,
        status: String,
    },
    Error(ChannelError),
}
