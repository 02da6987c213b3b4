//! # Transport trait
//!
//! The seam the rest of the system talks to. [`crate::ChannelHub`] is the
//! in-process implementation; tests substitute their own.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::warn;

use crate::{BusError, Message};

/// A channel-keyed broadcast transport.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// Broadcast `message` to every peer joined to `channel_key`.
    ///
    /// Returns the number of peers reached, or [`BusError::ChannelNotFound`]
    /// when nobody is listening on the channel.
    async fn publish(&self, channel_key: &str, message: Message) -> Result<usize, BusError>;

    /// Stream of every reply sent by any peer, on any channel.
    fn inbound(&self) -> InboundStream;
}

/// Receiving side of the inbound reply stream.
pub struct InboundStream {
    receiver: broadcast::Receiver<Message>,
}

impl InboundStream {
    pub fn new(receiver: broadcast::Receiver<Message>) -> Self {
        Self { receiver }
    }

    /// Wait for the next reply.
    ///
    /// Returns `None` once the transport has been dropped.
    pub async fn recv(&mut self) -> Option<Message> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(lagged = count, "Inbound stream lagged, replies dropped");
                }
            }
        }
    }
}
