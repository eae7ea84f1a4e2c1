use crate::types::ChannelState;
use tealbase_core::TealbaseError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RealtimeError {
    /// No transport is wired in, so channels cannot join.
    #[error("Realtime transport is not available")]
    TransportUnavailable,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Join rejected for {topic}: {reason}")]
    JoinRejected { topic: String, reason: String },

    #[error("Leave failed for {topic}: {reason}")]
    LeaveFailed { topic: String, reason: String },

    /// The channel was removed while its join was in flight.
    #[error("Join superseded by removal: {0}")]
    JoinSuperseded(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Invalid channel state: expected {expected:?}, actual {actual:?}")]
    InvalidChannelState {
        expected: ChannelState,
        actual: ChannelState,
    },

    #[error("Access token resolution failed: {0}")]
    TokenResolution(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RealtimeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<TealbaseError> for RealtimeError {
    fn from(e: TealbaseError) -> Self {
        match e {
            TealbaseError::TokenResolution(msg) => Self::TokenResolution(msg),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<RealtimeError> for TealbaseError {
    fn from(e: RealtimeError) -> Self {
        TealbaseError::Realtime(e.to_string())
    }
}
