use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ── Channel Identity ──────────────────────────────────────────────────────────

/// Opaque channel identifier, allocated when the channel is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(Uuid);

impl ChannelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ── Channel State ─────────────────────────────────────────────────────────────

/// The lifecycle state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Closed,
    Joining,
    Joined,
    Leaving,
    Errored,
}

impl ChannelState {
    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: ChannelState) -> bool {
        use ChannelState::*;
        matches!(
            (self, next),
            (Closed, Joining)
                | (Joining, Joined)
                | (Joining, Errored)
                | (Joining, Leaving)
                | (Joined, Leaving)
                | (Joined, Errored)
                | (Leaving, Closed)
                | (Leaving, Errored)
                | (Errored, Joining)
                | (Errored, Leaving)
                | (Errored, Closed)
        )
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Joining => write!(f, "joining"),
            Self::Joined => write!(f, "joined"),
            Self::Leaving => write!(f, "leaving"),
            Self::Errored => write!(f, "errored"),
        }
    }
}

// ── Subscription Status ───────────────────────────────────────────────────────

/// Status reported to a channel's status callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Subscribed,
    Closed,
    ChannelError,
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subscribed => write!(f, "SUBSCRIBED"),
            Self::Closed => write!(f, "CLOSED"),
            Self::ChannelError => write!(f, "CHANNEL_ERROR"),
        }
    }
}

// ── Postgres Changes ──────────────────────────────────────────────────────────

/// Which Postgres change events to listen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostgresChangesEvent {
    #[serde(rename = "*")]
    All,
    #[serde(rename = "INSERT")]
    Insert,
    #[serde(rename = "UPDATE")]
    Update,
    #[serde(rename = "DELETE")]
    Delete,
}

impl PostgresChangesEvent {
    pub fn matches(&self, change_type: &str) -> bool {
        match self {
            Self::All => true,
            other => other.to_string().eq_ignore_ascii_case(change_type),
        }
    }
}

impl fmt::Display for PostgresChangesEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "*"),
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// Filter for postgres_changes subscriptions.
///
/// An empty `schema` is filled in with the channel's schema when the channel
/// is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostgresChangesFilter {
    pub event: String,
    pub schema: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl PostgresChangesFilter {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            event: "*".to_string(),
            schema: schema.into(),
            table: Some(table.into()),
            filter: None,
        }
    }

    /// A filter on `table` in the channel's own schema.
    pub fn table(table: impl Into<String>) -> Self {
        Self::new(String::new(), table)
    }

    /// Every table of `schema`.
    pub fn schema_only(schema: impl Into<String>) -> Self {
        Self {
            event: "*".to_string(),
            schema: schema.into(),
            table: None,
            filter: None,
        }
    }

    pub fn event(mut self, event: PostgresChangesEvent) -> Self {
        self.event = event.to_string();
        self
    }

    /// Add a row-level filter (e.g., "id=eq.1").
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Whether a change on `schema.table` falls under this filter.
    /// Wildcard (`*`) table names match everything.
    pub fn covers(&self, schema: &str, table: &str) -> bool {
        let schema_ok = self.schema == "*" || self.schema == schema;
        let table_ok = match self.table.as_deref() {
            None | Some("*") => true,
            Some(t) => t == table,
        };
        schema_ok && table_ok
    }
}

/// Payload delivered for a postgres_changes event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresChangePayload {
    pub schema: String,
    pub table: String,
    #[serde(rename = "type")]
    pub change_type: String,
    #[serde(default)]
    pub commit_timestamp: Option<String>,
    #[serde(default)]
    pub record: Option<Value>,
    #[serde(default)]
    pub old_record: Option<Value>,
}

// ── Join Payload ──────────────────────────────────────────────────────────────

/// What a channel sends to the transport when joining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinPayload {
    pub config: JoinConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinConfig {
    pub broadcast: BroadcastConfig,
    pub presence: PresenceConfig,
    pub postgres_changes: Vec<PostgresChangesFilter>,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BroadcastConfig {
    pub ack: bool,
    #[serde(rename = "self")]
    pub self_send: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresenceConfig {
    pub key: String,
}
