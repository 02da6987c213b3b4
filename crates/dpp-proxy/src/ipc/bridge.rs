//! Correlation bridge: a synchronous call over an asynchronous channel.
//!
//! `send_await` registers the call in the [`PendingCallStore`] before
//! publishing, then waits for whichever comes first: the matching reply,
//! the deadline, or caller cancellation. Resolution goes through a single
//! removal from the store, so exactly one outcome is ever reported.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use channel_bus::{BusError, ChannelTransport, Message};
use tracing::{debug, warn};

use crate::domain::{CallContext, CorrelationId, PendingCallStore};
use crate::ipc::ReplyListener;

/// Bridge errors
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Nobody has joined the channel.
    #[error("channel '{0}' not found")]
    ChannelNotFound(String),

    #[error("no reply for correlation id {correlation_id} after {after:?}")]
    Timeout {
        correlation_id: String,
        after: Duration,
    },

    #[error("call {correlation_id} cancelled by caller")]
    Cancelled { correlation_id: String },

    /// Another call with this correlation id is still in flight.
    #[error("correlation id {0} already pending")]
    DuplicateCorrelationId(String),

    /// The completion slot was dropped without a reply.
    #[error("reply channel closed")]
    ReplyDropped,

    #[error("transport error: {0}")]
    Transport(#[source] BusError),
}

impl BridgeError {
    pub fn is_channel_not_found(&self) -> bool {
        matches!(self, Self::ChannelNotFound(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<BusError> for BridgeError {
    fn from(e: BusError) -> Self {
        match e {
            BusError::ChannelNotFound(channel) => Self::ChannelNotFound(channel),
            other => Self::Transport(other),
        }
    }
}

/// Broadcast messages to channel peers, optionally awaiting one reply.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Publish without waiting for a reply.
    async fn send(&self, channel_key: &str, message: Message) -> Result<(), BridgeError>;

    /// Publish and wait for the reply carrying the same correlation id.
    ///
    /// A message without a correlation id is given a fresh one. The wait is
    /// bounded by the earlier of `timeout` and the caller's deadline.
    async fn send_await(
        &self,
        ctx: &CallContext,
        channel_key: &str,
        message: Message,
        timeout: Duration,
    ) -> Result<Message, BridgeError>;
}

/// [`Broadcaster`] over a [`ChannelTransport`].
pub struct CorrelationBridge {
    transport: Arc<dyn ChannelTransport>,
    pending: Arc<PendingCallStore>,
}

impl CorrelationBridge {
    pub fn new(transport: Arc<dyn ChannelTransport>, pending: Arc<PendingCallStore>) -> Self {
        Self { transport, pending }
    }

    /// Listener feeding transport replies back into this bridge.
    ///
    /// Subscribes to the inbound stream immediately, so replies published
    /// after this returns are never missed.
    pub fn listener(&self) -> ReplyListener {
        ReplyListener::new(self.transport.inbound(), Arc::clone(&self.pending))
    }

    pub fn pending(&self) -> &Arc<PendingCallStore> {
        &self.pending
    }

    pub fn pending_count(&self) -> usize {
        self.pending.pending_count()
    }
}

#[async_trait]
impl Broadcaster for CorrelationBridge {
    async fn send(&self, channel_key: &str, message: Message) -> Result<(), BridgeError> {
        let route = message.route.clone();
        let reached = self.transport.publish(channel_key, message).await?;
        debug!(channel = %channel_key, route = %route, reached, "Sent message");
        Ok(())
    }

    async fn send_await(
        &self,
        ctx: &CallContext,
        channel_key: &str,
        mut message: Message,
        timeout: Duration,
    ) -> Result<Message, BridgeError> {
        if message.correlation_id.is_empty() {
            message.correlation_id = CorrelationId::new().to_string();
        }
        let correlation_id = message.correlation_id.clone();

        if ctx.is_cancelled() {
            return Err(BridgeError::Cancelled { correlation_id });
        }

        let started = Instant::now();
        let deadline = ctx.effective_deadline(timeout);
        let route = message.route.clone();

        let Some(mut rx) = self
            .pending
            .register(&correlation_id, channel_key, &route, deadline)
        else {
            return Err(BridgeError::DuplicateCorrelationId(correlation_id));
        };
        let mut guard = Registration::new(&self.pending, &correlation_id);

        let reached = self.transport.publish(channel_key, message).await?;

        debug!(
            correlation_id = %correlation_id,
            channel = %channel_key,
            route = %route,
            reached,
            "Awaiting reply"
        );

        let expired = tokio::select! {
            reply = &mut rx => {
                guard.disarm();
                return reply.map_err(|_| dropped(correlation_id.clone(), started, deadline));
            }
            _ = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => true,
            _ = ctx.cancelled() => false,
        };

        let won = if expired {
            self.pending.expire(&correlation_id)
        } else {
            self.pending.cancel(&correlation_id)
        };
        guard.disarm();
        drop(guard);

        if !won {
            // The reply took the slot first.
            return rx.await.map_err(|_| dropped(correlation_id, started, deadline));
        }

        if expired {
            let after = deadline.saturating_duration_since(started);
            warn!(
                correlation_id = %correlation_id,
                channel = %channel_key,
                route = %route,
                after_ms = after.as_millis(),
                "Timed out waiting for reply"
            );
            Err(BridgeError::Timeout {
                correlation_id,
                after,
            })
        } else {
            debug!(correlation_id = %correlation_id, "Call cancelled by caller");
            Err(BridgeError::Cancelled { correlation_id })
        }
    }
}

/// Error for a completion slot closed without a reply.
///
/// Past the deadline that is the sweeper collecting the entry, which the
/// caller sees as its own timeout.
fn dropped(correlation_id: String, started: Instant, deadline: Instant) -> BridgeError {
    if Instant::now() >= deadline {
        BridgeError::Timeout {
            correlation_id,
            after: deadline.saturating_duration_since(started),
        }
    } else {
        BridgeError::ReplyDropped
    }
}

/// Removes the pending registration if the awaiting future is dropped.
struct Registration<'a> {
    pending: &'a PendingCallStore,
    correlation_id: &'a str,
    armed: bool,
}

impl<'a> Registration<'a> {
    fn new(pending: &'a PendingCallStore, correlation_id: &'a str) -> Self {
        Self {
            pending,
            correlation_id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.pending.cancel(self.correlation_id);
        }
    }
}
