use thiserror::Error;

pub type Result<T, E = ChannelError> = core::result::Result<T, E>;

/// Everything that can go wrong on the control/telemetry channel.
///
/// None of these are fatal: they are either returned to the caller of a
/// send operation or emitted as an event on the inbound stream.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChannelError {
    #[error("connection is not open")]
    NotOpen,
    #[error("failed to connect: {0}")]
    ConnectFailed(String),
    #[error("malformed inbound frame ({reason}): {raw}")]
    MalformedInbound { raw: String, reason: String },
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    #[error("send failed: {0}")]
    SendFailed(String),
    /// An outbound frame of a known type whose fields do not fit it.
    #[error("invalid outbound frame: {0}")]
    InvalidFrame(String),
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),
}
