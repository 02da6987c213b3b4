//! # Channel Hub
//!
//! In-process implementation of [`ChannelTransport`]. Each channel owns a
//! `tokio::sync::broadcast` sender; peers that join receive everything
//! published to it. Replies from all peers share one inbound broadcast.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::transport::{ChannelTransport, InboundStream};
use crate::{BusError, Message, DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_MESSAGE_BYTES};

struct ChannelState {
    sender: broadcast::Sender<Message>,
    members: usize,
}

type Channels = Arc<RwLock<HashMap<String, ChannelState>>>;

/// In-memory channel hub.
pub struct ChannelHub {
    /// Channel key to broadcast sender and membership count.
    channels: Channels,
    /// Replies from every peer.
    inbound: broadcast::Sender<Message>,
    /// Total messages published to a channel with at least one member.
    messages_published: AtomicU64,
    /// Per-channel buffer size.
    capacity: usize,
    /// Upper bound on the encoded size of a message.
    max_message_bytes: usize,
}

impl ChannelHub {
    /// Create a hub with default capacity and message limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_MESSAGE_BYTES)
    }

    /// Create a hub with an explicit per-channel capacity and message limit.
    #[must_use]
    pub fn with_limits(capacity: usize, max_message_bytes: usize) -> Self {
        let (inbound, _) = broadcast::channel(capacity);
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            inbound,
            messages_published: AtomicU64::new(0),
            capacity,
            max_message_bytes,
        }
    }

    /// Join `channel_key`, creating the channel if this is its first member.
    pub fn join(&self, channel_key: impl Into<String>) -> ChannelPeer {
        let channel_key = channel_key.into();
        let receiver = {
            let mut channels = self.channels.write();
            let state = channels
                .entry(channel_key.clone())
                .or_insert_with(|| ChannelState {
                    sender: broadcast::channel(self.capacity).0,
                    members: 0,
                });
            state.members += 1;
            state.sender.subscribe()
        };

        debug!(channel = %channel_key, "Peer joined channel");

        ChannelPeer {
            channel_key,
            receiver,
            inbound: self.inbound.clone(),
            channels: Arc::clone(&self.channels),
            max_message_bytes: self.max_message_bytes,
        }
    }

    /// Number of channels with at least one member.
    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }

    /// Number of peers joined to `channel_key`.
    pub fn member_count(&self, channel_key: &str) -> usize {
        self.channels
            .read()
            .get(channel_key)
            .map_or(0, |state| state.members)
    }

    /// Total messages delivered to a non-empty channel.
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }

    pub fn max_message_bytes(&self) -> usize {
        self.max_message_bytes
    }
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelTransport for ChannelHub {
    async fn publish(&self, channel_key: &str, message: Message) -> Result<usize, BusError> {
        check_size(&message, self.max_message_bytes)?;

        let sender = {
            let channels = self.channels.read();
            match channels.get(channel_key) {
                Some(state) if state.members > 0 => state.sender.clone(),
                _ => {
                    debug!(channel = %channel_key, route = %message.route, "Publish to unknown channel");
                    return Err(BusError::ChannelNotFound(channel_key.to_string()));
                }
            }
        };

        let route = message.route.clone();
        let delivered = sender
            .send(message)
            .map_err(|_| BusError::ChannelNotFound(channel_key.to_string()))?;

        self.messages_published.fetch_add(1, Ordering::Relaxed);
        debug!(
            channel = %channel_key,
            route = %route,
            receivers = delivered,
            "Message published"
        );
        Ok(delivered)
    }

    fn inbound(&self) -> InboundStream {
        InboundStream::new(self.inbound.subscribe())
    }
}

/// Membership of a single channel.
///
/// Dropping the peer leaves the channel; the channel is removed once its
/// last member has gone.
pub struct ChannelPeer {
    channel_key: String,
    receiver: broadcast::Receiver<Message>,
    inbound: broadcast::Sender<Message>,
    channels: Channels,
    max_message_bytes: usize,
}

impl ChannelPeer {
    pub fn channel_key(&self) -> &str {
        &self.channel_key
    }

    /// Receive the next message published to this channel.
    ///
    /// Returns `None` when the hub is gone.
    pub async fn recv(&mut self) -> Option<Message> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(channel = %self.channel_key, lagged = count, "Peer lagged, messages dropped");
                }
            }
        }
    }

    /// Send a reply back to the hub's inbound stream.
    ///
    /// The reply is stamped with this peer's channel, whatever it claims.
    pub fn reply(&self, mut message: Message) -> Result<(), BusError> {
        message.channel_key.clone_from(&self.channel_key);
        check_size(&message, self.max_message_bytes)?;
        self.inbound
            .send(message)
            .map(|_| ())
            .map_err(|_| BusError::Closed)
    }
}

impl Drop for ChannelPeer {
    fn drop(&mut self) {
        let mut channels = self.channels.write();
        let Some(state) = channels.get_mut(&self.channel_key) else {
            return;
        };

        state.members = state.members.saturating_sub(1);
        if state.members == 0 {
            channels.remove(&self.channel_key);
        }
        debug!(channel = %self.channel_key, "Peer left channel");
    }
}

fn check_size(message: &Message, max: usize) -> Result<(), BusError> {
    let size = message.encoded_len()?;
    if size > max {
        warn!(route = %message.route, size, max, "Message exceeds size limit");
        return Err(BusError::MessageTooLarge { size, max });
    }
    Ok(())
}
