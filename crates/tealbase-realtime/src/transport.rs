//! The realtime transport seam.
//!
//! Message framing lives behind [`RealtimeTransport`]; the registry only
//! decides when to connect, join, leave and disconnect.

use futures_util::future::BoxFuture;

use crate::error::RealtimeError;
use crate::types::JoinPayload;

/// A request to join `topic` with the given payload.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinRequest {
    pub topic: String,
    pub payload: JoinPayload,
}

/// Shared connection to the realtime endpoint.
///
/// One instance is owned per client and shared by every channel. `join` and
/// `leave` resolve once the server acknowledges (or rejects) the request.
/// `connect` may be called again while a connection is already up and must
/// then succeed without reconnecting.
pub trait RealtimeTransport: Send + Sync {
    fn connect(&self) -> BoxFuture<'_, Result<(), RealtimeError>>;

    fn disconnect(&self) -> BoxFuture<'_, Result<(), RealtimeError>>;

    fn is_connected(&self) -> bool;

    fn join(&self, request: JoinRequest) -> BoxFuture<'_, Result<(), RealtimeError>>;

    fn leave(&self, topic: String) -> BoxFuture<'_, Result<(), RealtimeError>>;
}

/// Transport used when none is configured.
///
/// It never connects: joining fails with
/// [`RealtimeError::TransportUnavailable`]. Leaving and disconnecting succeed,
/// so channels that never joined can still be removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedTransport;

impl RealtimeTransport for DetachedTransport {
    fn connect(&self) -> BoxFuture<'_, Result<(), RealtimeError>> {
        Box::pin(async { Err(RealtimeError::TransportUnavailable) })
    }

    fn disconnect(&self) -> BoxFuture<'_, Result<(), RealtimeError>> {
        Box::pin(async { Ok(()) })
    }

    fn is_connected(&self) -> bool {
        false
    }

    fn join(&self, _request: JoinRequest) -> BoxFuture<'_, Result<(), RealtimeError>> {
        Box::pin(async { Err(RealtimeError::TransportUnavailable) })
    }

    fn leave(&self, _topic: String) -> BoxFuture<'_, Result<(), RealtimeError>> {
        Box::pin(async { Ok(()) })
    }
}
