use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use tealbase_core::HeaderResolver;

use crate::channel::{Channel, ChannelConfig};
use crate::error::RealtimeError;
use crate::transport::RealtimeTransport;
use crate::types::{ChannelId, PostgresChangePayload, PostgresChangesEvent, PostgresChangesFilter};

pub(crate) type ChannelList = Mutex<Vec<Channel>>;

/// Owns every channel of one client and the connect/disconnect policy of the
/// shared transport.
///
/// All mutations are serialized by one lock. When the registry goes from one
/// channel to none, the transport is disconnected exactly once.
pub struct ChannelRegistry {
    transport: Arc<dyn RealtimeTransport>,
    resolver: Arc<HeaderResolver>,
    schema: String,
    channels: Arc<ChannelList>,
}

impl fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("schema", &self.schema)
            .field("connected", &self.transport.is_connected())
            .finish()
    }
}

impl ChannelRegistry {
    pub fn new(
        transport: Arc<dyn RealtimeTransport>,
        resolver: Arc<HeaderResolver>,
        schema: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            resolver,
            schema: schema.into(),
            channels: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn transport(&self) -> &Arc<dyn RealtimeTransport> {
        &self.transport
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Create and register a channel for topic `realtime:<name>`.
    ///
    /// The transport is not connected until the channel subscribes.
    pub async fn create_channel(&self, name: &str, config: ChannelConfig) -> Channel {
        let channel = Channel::new(
            name,
            &self.schema,
            config,
            Arc::clone(&self.transport),
            Arc::clone(&self.resolver),
            Arc::downgrade(&self.channels),
        );
        let mut channels = self.channels.lock().await;
        channels.push(channel.clone());
        debug!(
            topic = %channel.topic(),
            id = %channel.id(),
            registered = channels.len(),
            "Channel created"
        );
        channel
    }

    /// Register a channel for changes on `table` in the registry's schema.
    ///
    /// `*` as the table listens to every table of the schema. The topic is
    /// `realtime:<schema>:<table>`, or `realtime:<schema>` for `*`. Like
    /// [`create_channel`](Self::create_channel), nothing is sent until the
    /// channel subscribes.
    pub async fn on_table<F>(
        &self,
        table: &str,
        event: PostgresChangesEvent,
        callback: F,
    ) -> Channel
    where
        F: Fn(PostgresChangePayload) + Send + Sync + 'static,
    {
        let name = match table {
            "*" => self.schema.clone(),
            table => format!("{}:{table}", self.schema),
        };
        let filter = PostgresChangesFilter::new(self.schema.clone(), table);
        let config = ChannelConfig::new().on_postgres_changes(event, filter, callback);
        self.create_channel(&name, config).await
    }

    /// Leave and unregister `channel`, returning how many channels remain open.
    ///
    /// An unknown channel is a no-op, except that an empty registry whose
    /// transport is still connected gets disconnected. A failed leave keeps
    /// the entry so the removal can be retried.
    pub async fn remove_channel(&self, channel: &Channel) -> Result<usize, RealtimeError> {
        let mut channels = self.channels.lock().await;

        let Some(index) = channels.iter().position(|c| c.id() == channel.id()) else {
            debug!(topic = %channel.topic(), "Channel not registered");
            if channels.is_empty() && self.transport.is_connected() {
                self.disconnect().await?;
            }
            return Ok(channels.len());
        };

        let registered = channels[index].clone();
        registered.leave().await?;
        channels.remove(index);
        registered.mark_removed();
        debug!(topic = %registered.topic(), remaining = channels.len(), "Channel removed");

        if channels.is_empty() {
            self.disconnect().await?;
        }
        Ok(channels.len())
    }

    /// Remove every channel, in registration order, returning one outcome per
    /// channel. The transport is disconnected once, after the last removal; a
    /// disconnect failure is reported as the outcome of that last removal.
    pub async fn remove_all_channels(&self) -> Vec<Result<(), RealtimeError>> {
        let mut channels = self.channels.lock().await;
        let snapshot: Vec<Channel> = channels.clone();
        let mut outcomes = Vec::with_capacity(snapshot.len());

        for channel in snapshot {
            match channel.leave().await {
                Ok(()) => {
                    channels.retain(|c| c.id() != channel.id());
                    channel.mark_removed();
                    outcomes.push(Ok(()));
                }
                Err(e) => outcomes.push(Err(e)),
            }
        }
        debug!(
            removed = outcomes.iter().filter(|o| o.is_ok()).count(),
            remaining = channels.len(),
            "Removed all channels"
        );

        let emptied = channels.is_empty() && outcomes.iter().any(|o| o.is_ok());
        let idle = outcomes.is_empty() && self.transport.is_connected();
        if emptied || idle {
            if let Err(e) = self.disconnect().await {
                match outcomes.last_mut() {
                    Some(last) => *last = Err(e),
                    None => outcomes.push(Err(e)),
                }
            }
        }
        outcomes
    }

    /// Registered channels in registration order.
    pub async fn channels(&self) -> Vec<Channel> {
        self.channels.lock().await.clone()
    }

    pub async fn get(&self, id: ChannelId) -> Option<Channel> {
        self.channels
            .lock()
            .await
            .iter()
            .find(|c| c.id() == id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.channels.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.channels.lock().await.is_empty()
    }

    async fn disconnect(&self) -> Result<(), RealtimeError> {
        debug!("No channels left, disconnecting realtime transport");
        self.transport.disconnect().await.map_err(|e| {
            warn!(error = %e, "Realtime disconnect failed");
            e
        })
    }
}
