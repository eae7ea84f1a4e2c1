//! Realtime channels for the tealbase client.
//!
//! A [`ChannelRegistry`] owns the channels of one client and the shared
//! [`RealtimeTransport`]. Channels move through
//! `closed → joining → joined → leaving → closed`, with `errored` reachable
//! on transport failure.
//!
//! # Usage
//!
//! ```ignore
//! let channel = registry
//!     .create_channel(
//!         "db-changes",
//!         ChannelConfig::new().on_postgres_changes(
//!             PostgresChangesEvent::Insert,
//!             PostgresChangesFilter::table("messages"),
//!             |payload| println!("New row: {:?}", payload.record),
//!         ),
//!     )
//!     .await;
//! channel.subscribe().await?;
//! registry.remove_channel(&channel).await?;
//! ```

pub mod callback;
pub mod channel;
pub mod error;
pub mod registry;
pub mod transport;
pub mod types;

pub use callback::{BroadcastCallback, PostgresChangesCallback, StatusCallback};
pub use channel::{Channel, ChannelConfig};
pub use error::RealtimeError;
pub use registry::ChannelRegistry;
pub use transport::{DetachedTransport, JoinRequest, RealtimeTransport};
pub use types::{
    BroadcastConfig, ChannelId, ChannelState, JoinConfig, JoinPayload, PostgresChangePayload,
    PostgresChangesEvent, PostgresChangesFilter, PresenceConfig, SubscriptionStatus,
};
