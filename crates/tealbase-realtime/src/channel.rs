use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use tealbase_core::HeaderResolver;

use crate::callback::{Binding, StatusCallback};
use crate::error::RealtimeError;
use crate::registry::ChannelList;
use crate::transport::{JoinRequest, RealtimeTransport};
use crate::types::{
    BroadcastConfig, ChannelId, ChannelState, JoinConfig, JoinPayload, PostgresChangePayload,
    PostgresChangesEvent, PostgresChangesFilter, PresenceConfig, SubscriptionStatus,
};

// ── ChannelConfig ─────────────────────────────────────────────────────────────

/// Event bindings and join options for a new channel.
///
/// Passed to `ChannelRegistry::create_channel`.
#[derive(Default)]
pub struct ChannelConfig {
    pub(crate) broadcast: BroadcastConfig,
    pub(crate) presence_key: String,
    pub(crate) private: bool,
    pub(crate) postgres_changes: Vec<PostgresChangesFilter>,
    pub(crate) bindings: Vec<Binding>,
    pub(crate) status_callback: Option<StatusCallback>,
}

impl ChannelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen for postgres database changes.
    pub fn on_postgres_changes<F>(
        mut self,
        event: PostgresChangesEvent,
        filter: PostgresChangesFilter,
        callback: F,
    ) -> Self
    where
        F: Fn(PostgresChangePayload) + Send + Sync + 'static,
    {
        let filter_index = self.postgres_changes.len();
        self.postgres_changes.push(filter.event(event));
        self.bindings.push(Binding::PostgresChanges {
            filter_index,
            event,
            callback: Arc::new(callback),
        });
        self
    }

    /// Listen for broadcast messages with the given event name (`*` for all).
    pub fn on_broadcast<F>(mut self, event: &str, callback: F) -> Self
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.bindings.push(Binding::Broadcast {
            event: event.to_string(),
            callback: Arc::new(callback),
        });
        self
    }

    /// Called on every subscription status change.
    pub fn on_status<F>(mut self, callback: F) -> Self
    where
        F: Fn(SubscriptionStatus, Option<RealtimeError>) + Send + Sync + 'static,
    {
        self.status_callback = Some(Arc::new(callback));
        self
    }

    pub fn broadcast_ack(mut self, ack: bool) -> Self {
        self.broadcast.ack = ack;
        self
    }

    pub fn broadcast_self(mut self, self_send: bool) -> Self {
        self.broadcast.self_send = self_send;
        self
    }

    pub fn presence_key(mut self, key: &str) -> Self {
        self.presence_key = key.to_string();
        self
    }

    /// Mark this channel as private (requires RLS).
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }
}

// ── Channel ───────────────────────────────────────────────────────────────────

/// A handle to a realtime channel.
///
/// Cheaply cloneable; all clones refer to the same channel.
#[derive(Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    id: ChannelId,
    name: String,
    topic: String,
    schema: String,
    join_config: JoinConfig,
    bindings: Vec<Binding>,
    status_callback: Option<StatusCallback>,
    state: RwLock<ChannelState>,
    /// Bumped by every join attempt and by removal; a join whose generation
    /// is stale when it completes has been superseded.
    generation: AtomicU64,
    removed: AtomicBool,
    transport: Arc<dyn RealtimeTransport>,
    resolver: Arc<HeaderResolver>,
    /// The owning registry's channel list, for the disconnect-when-empty
    /// check after a superseded join.
    registry: Weak<ChannelList>,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.inner.id)
            .field("topic", &self.inner.topic)
            .field("schema", &self.inner.schema)
            .finish()
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Channel {}

impl Channel {
    pub(crate) fn new(
        name: &str,
        schema: &str,
        config: ChannelConfig,
        transport: Arc<dyn RealtimeTransport>,
        resolver: Arc<HeaderResolver>,
        registry: Weak<ChannelList>,
    ) -> Self {
        let postgres_changes = config
            .postgres_changes
            .into_iter()
            .map(|mut filter| {
                if filter.schema.is_empty() {
                    filter.schema = schema.to_string();
                }
                filter
            })
            .collect();

        Self {
            inner: Arc::new(ChannelInner {
                id: ChannelId::new(),
                name: name.to_string(),
                topic: format!("realtime:{name}"),
                schema: schema.to_string(),
                join_config: JoinConfig {
                    broadcast: config.broadcast,
                    presence: PresenceConfig {
                        key: config.presence_key,
                    },
                    postgres_changes,
                    private: config.private,
                },
                bindings: config.bindings,
                status_callback: config.status_callback,
                state: RwLock::new(ChannelState::Closed),
                generation: AtomicU64::new(0),
                removed: AtomicBool::new(false),
                transport,
                resolver,
                registry,
            }),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.inner.id
    }

    /// The user-provided name, without the `realtime:` prefix.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The channel topic (e.g. `realtime:db-changes`).
    pub fn topic(&self) -> &str {
        &self.inner.topic
    }

    pub fn schema(&self) -> &str {
        &self.inner.schema
    }

    pub fn postgres_changes(&self) -> &[PostgresChangesFilter] {
        &self.inner.join_config.postgres_changes
    }

    pub async fn state(&self) -> ChannelState {
        *self.inner.state.read().await
    }

    /// True once the channel has been removed from its registry.
    pub fn is_removed(&self) -> bool {
        self.inner.removed.load(Ordering::SeqCst)
    }

    /// The payload sent to the transport on join.
    pub fn join_payload(&self, access_token: Option<String>) -> JoinPayload {
        JoinPayload {
            config: self.inner.join_config.clone(),
            access_token,
        }
    }

    /// Join the channel, connecting the shared transport first if needed.
    ///
    /// Subscribing a joined or joining channel is a no-op. A removal issued
    /// while the join is in flight wins: the join then reports
    /// [`RealtimeError::JoinSuperseded`].
    pub async fn subscribe(&self) -> Result<(), RealtimeError> {
        if self.is_removed() {
            return Err(RealtimeError::ChannelNotFound(self.inner.topic.clone()));
        }

        let generation = {
            let mut state = self.inner.state.write().await;
            match *state {
                ChannelState::Joined | ChannelState::Joining => return Ok(()),
                current if !current.can_transition_to(ChannelState::Joining) => {
                    return Err(RealtimeError::InvalidChannelState {
                        expected: ChannelState::Closed,
                        actual: current,
                    });
                }
                _ => {}
            }
            advance(&mut state, ChannelState::Joining);
            self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        debug!(topic = %self.inner.topic, "Joining channel");

        let result = self.join(generation).await;

        let mut state = self.inner.state.write().await;
        if self.is_superseded(generation) {
            drop(state);
            debug!(topic = %self.inner.topic, "Join superseded by removal");
            if result.is_ok() {
                // The removal may have left before the join landed.
                if let Err(e) = self.inner.transport.leave(self.inner.topic.clone()).await {
                    warn!(
                        topic = %self.inner.topic,
                        error = %e,
                        "Leave after superseded join failed"
                    );
                }
            }
            self.release_if_idle().await;
            return Err(RealtimeError::JoinSuperseded(self.inner.topic.clone()));
        }

        match result {
            Ok(()) => {
                advance(&mut state, ChannelState::Joined);
                drop(state);
                debug!(topic = %self.inner.topic, "Channel joined");
                self.notify(SubscriptionStatus::Subscribed, None);
                Ok(())
            }
            Err(e) => {
                advance(&mut state, ChannelState::Errored);
                drop(state);
                warn!(topic = %self.inner.topic, error = %e, "Channel join failed");
                self.notify(SubscriptionStatus::ChannelError, Some(e.clone()));
                Err(e)
            }
        }
    }

    /// Connect if needed, resolve the token and join. Stops before sending
    /// the join once `generation` has been superseded.
    async fn join(&self, generation: u64) -> Result<(), RealtimeError> {
        let transport = &self.inner.transport;
        if !transport.is_connected() {
            transport.connect().await?;
        }
        if self.is_superseded(generation) {
            return Err(RealtimeError::JoinSuperseded(self.inner.topic.clone()));
        }
        let token = self.inner.resolver.bearer_token().await?;
        if self.is_superseded(generation) {
            return Err(RealtimeError::JoinSuperseded(self.inner.topic.clone()));
        }
        transport
            .join(JoinRequest {
                topic: self.inner.topic.clone(),
                payload: self.join_payload(Some(token)),
            })
            .await
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) != generation
    }

    /// Disconnect a transport left connected by a superseded join when the
    /// owning registry has no channels.
    async fn release_if_idle(&self) {
        let Some(registry) = self.inner.registry.upgrade() else {
            return;
        };
        let channels = registry.lock().await;
        if channels.is_empty() && self.inner.transport.is_connected() {
            debug!(
                topic = %self.inner.topic,
                "Registry empty after superseded join, disconnecting"
            );
            if let Err(e) = self.inner.transport.disconnect().await {
                warn!(error = %e, "Realtime disconnect failed");
            }
        }
    }

    /// Drive the channel to `closed`, leaving on the transport if it may be joined.
    ///
    /// On failure the channel is `errored` and the leave can be retried.
    pub(crate) async fn leave(&self) -> Result<(), RealtimeError> {
        let previous = {
            let mut state = self.inner.state.write().await;
            let previous = *state;
            match previous {
                ChannelState::Closed | ChannelState::Leaving => return Ok(()),
                ChannelState::Joining => {
                    self.inner.generation.fetch_add(1, Ordering::SeqCst);
                }
                ChannelState::Joined | ChannelState::Errored => {}
            }
            advance(&mut state, ChannelState::Leaving);
            previous
        };
        debug!(topic = %self.inner.topic, from = %previous, "Leaving channel");

        let result = self.inner.transport.leave(self.inner.topic.clone()).await;

        let mut state = self.inner.state.write().await;
        match result {
            Ok(()) => {
                advance(&mut state, ChannelState::Closed);
                drop(state);
                self.notify(SubscriptionStatus::Closed, None);
                Ok(())
            }
            Err(e) => {
                advance(&mut state, ChannelState::Errored);
                drop(state);
                warn!(topic = %self.inner.topic, error = %e, "Channel leave failed");
                self.notify(SubscriptionStatus::ChannelError, Some(e.clone()));
                Err(e)
            }
        }
    }

    pub(crate) fn mark_removed(&self) {
        self.inner.removed.store(true, Ordering::SeqCst);
    }

    /// Deliver a postgres change to matching bindings. Returns how many callbacks ran.
    pub fn dispatch_postgres_change(&self, payload: &PostgresChangePayload) -> usize {
        let filters = &self.inner.join_config.postgres_changes;
        let mut delivered = 0;
        for binding in &self.inner.bindings {
            if let Binding::PostgresChanges {
                filter_index,
                event,
                callback,
            } = binding
            {
                let covered = filters
                    .get(*filter_index)
                    .map(|f| f.covers(&payload.schema, &payload.table))
                    .unwrap_or(false);
                if covered && event.matches(&payload.change_type) {
                    callback(payload.clone());
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Deliver a broadcast to matching bindings. Returns how many callbacks ran.
    pub fn dispatch_broadcast(&self, event: &str, payload: &Value) -> usize {
        let mut delivered = 0;
        for binding in &self.inner.bindings {
            if let Binding::Broadcast {
                event: bound,
                callback,
            } = binding
            {
                if bound == "*" || bound == event {
                    callback(payload.clone());
                    delivered += 1;
                }
            }
        }
        delivered
    }

    fn notify(&self, status: SubscriptionStatus, error: Option<RealtimeError>) {
        if let Some(callback) = &self.inner.status_callback {
            callback(status, error);
        }
    }
}

/// Move `state` to `next` along an edge of the channel state machine.
fn advance(state: &mut ChannelState, next: ChannelState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal channel transition {state} -> {next}"
    );
    *state = next;
}
