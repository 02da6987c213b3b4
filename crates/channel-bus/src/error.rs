//! Errors raised by the channel bus.

use thiserror::Error;

/// Errors from publishing to, or replying on, the bus.
#[derive(Debug, Error)]
pub enum BusError {
    /// No peer has joined the target channel.
    #[error("channel '{0}' not found")]
    ChannelNotFound(String),

    /// Nobody is listening on the other side of the bus.
    #[error("channel bus closed")]
    Closed,

    /// A message body could not be serialised.
    #[error("failed to encode message body: {0}")]
    Encode(#[source] serde_json::Error),

    /// A message body could not be bound to the requested type.
    #[error("failed to decode message body: {0}")]
    Decode(#[source] serde_json::Error),

    /// The encoded message exceeds the configured limit.
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

impl BusError {
    /// True when the failure was caused by an empty or unknown channel.
    pub fn is_channel_not_found(&self) -> bool {
        matches!(self, Self::ChannelNotFound(_))
    }
}
