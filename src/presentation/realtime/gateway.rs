//! Realtime Gateway
//!
//! Named broadcast channels fed by the services through [`EventPublisher`].

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::config::RealtimeSettings;
use crate::domain::services::{EventPublisher, FORUM_CHANNEL};
use crate::infrastructure::metrics::REALTIME_CONNECTIONS_ACTIVE;

/// One published event
#[derive(Debug, Clone)]
pub struct ChannelEvent {
    pub channel: String,
    pub event: String,
    pub data: Value,
}

/// Who may subscribe to a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAccess {
    Public,
    /// Only the identified user with this id
    Owner(i64),
}

/// Classify a channel name, rejecting anything the server never publishes to.
pub fn channel_access(channel: &str) -> Option<ChannelAccess> {
    if channel == FORUM_CHANNEL {
        return Some(ChannelAccess::Public);
    }
    if let Some(id) = channel.strip_prefix("thread-") {
        return id.parse::<i64>().ok().map(|_| ChannelAccess::Public);
    }
    if let Some(id) = channel.strip_prefix("user-") {
        return id.parse::<i64>().ok().map(ChannelAccess::Owner);
    }
    None
}

/// Fan-out hub shared by every connection
pub struct Gateway {
    channels: DashMap<String, broadcast::Sender<ChannelEvent>>,
    connections: AtomicUsize,
    channel_capacity: usize,
    heartbeat_interval_ms: u64,
    heartbeat_grace_ms: u64,
    max_message_size: usize,
}

impl Gateway {
    pub fn new(settings: &RealtimeSettings) -> Self {
        Self {
            channels: DashMap::new(),
            connections: AtomicUsize::new(0),
            channel_capacity: settings.channel_capacity.max(1),
            heartbeat_interval_ms: settings.heartbeat_interval_ms,
            heartbeat_grace_ms: settings.heartbeat_grace_ms,
            max_message_size: settings.max_message_size,
        }
    }

    /// Receiver for `channel`, creating the channel on first use.
    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<ChannelEvent> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.channel_capacity).0)
            .subscribe()
    }

    /// Forget channels nobody listens to anymore.
    pub fn prune(&self) {
        self.channels.retain(|_, sender| sender.receiver_count() > 0);
    }

    pub fn heartbeat_interval(&self) -> u64 {
        self.heartbeat_interval_ms
    }

    /// Silence allowed before a connection is closed
    pub fn heartbeat_timeout(&self) -> u64 {
        self.heartbeat_interval_ms + self.heartbeat_grace_ms
    }

    /// Frames a connection may have queued before new events are dropped.
    pub fn outbox_capacity(&self) -> usize {
        self.channel_capacity
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    pub fn connection_opened(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
        REALTIME_CONNECTIONS_ACTIVE.inc();
    }

    pub fn connection_closed(&self) {
        self.connections.fetch_sub(1, Ordering::Relaxed);
        REALTIME_CONNECTIONS_ACTIVE.dec();
        self.prune();
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl EventPublisher for Gateway {
    fn publish(&self, channel: &str, event: &str, data: Value) {
        let Some(sender) = self.channels.get(channel) else {
            tracing::trace!(channel, event, "No subscribers, event dropped");
            return;
        };

        let delivered = sender
            .send(ChannelEvent {
                channel: channel.to_string(),
                event: event.to_string(),
                data,
            })
            .unwrap_or(0);

        tracing::debug!(channel, event, delivered, "Realtime event published");
    }
}
