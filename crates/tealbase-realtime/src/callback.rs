use std::sync::Arc;

use serde_json::Value;

use crate::error::RealtimeError;
use crate::types::{PostgresChangePayload, PostgresChangesEvent, SubscriptionStatus};

// ── Callback type aliases ─────────────────────────────────────────────────────

pub type PostgresChangesCallback =
    Arc<dyn Fn(PostgresChangePayload) + Send + Sync + 'static>;

pub type BroadcastCallback = Arc<dyn Fn(Value) + Send + Sync + 'static>;

pub type StatusCallback =
    Arc<dyn Fn(SubscriptionStatus, Option<RealtimeError>) + Send + Sync + 'static>;

// ── Binding ───────────────────────────────────────────────────────────────────

/// A registered event binding for a channel.
#[derive(Clone)]
pub(crate) enum Binding {
    PostgresChanges {
        /// Index into the channel's postgres_changes filters.
        filter_index: usize,
        event: PostgresChangesEvent,
        callback: PostgresChangesCallback,
    },
    Broadcast {
        /// Event name; `*` receives every broadcast.
        event: String,
        callback: BroadcastCallback,
    },
}
