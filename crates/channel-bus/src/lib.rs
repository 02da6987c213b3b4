//! # Channel Bus - socket transport for wallet peers
//!
//! A channel is a named conversation (usually keyed by an invoice or payment
//! id) that zero or more remote peers have joined. The bus knows how to
//! broadcast a [`Message`] to every member of a channel and exposes a single
//! inbound stream carrying every reply any peer sends back.
//!
//! ```text
//!   publish(channel, msg)           ┌──────────────┐
//!  ───────────────────────────────▶ │  ChannelHub  │ ──▶ peer A (channel "inv-1")
//!                                   │              │ ──▶ peer B (channel "inv-1")
//!   inbound().recv()                │              │
//!  ◀─────────────────────────────── │              │ ◀── peer.reply(msg)
//!                                   └──────────────┘
//! ```
//!
//! The bus does not correlate requests with replies; that is the job of
//! whoever consumes [`ChannelTransport::inbound`].

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod error;
pub mod hub;
pub mod message;
pub mod transport;

pub use error::BusError;
pub use hub::{ChannelHub, ChannelPeer};
pub use message::Message;
pub use transport::{ChannelTransport, InboundStream};

/// Maximum messages buffered per channel (and on the inbound stream) before
/// slow receivers start lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Default upper bound on the encoded size of a single message.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 10_000;
