//! Reply listener that feeds transport replies into the pending call store.

use std::sync::Arc;

use channel_bus::InboundStream;
use tracing::{debug, info};

use crate::domain::{PendingCallStore, Resolution};

/// Drains the inbound reply stream, resolving pending calls.
pub struct ReplyListener {
    inbound: InboundStream,
    pending: Arc<PendingCallStore>,
}

impl ReplyListener {
    pub fn new(inbound: InboundStream, pending: Arc<PendingCallStore>) -> Self {
        Self { inbound, pending }
    }

    /// Run the listener loop until the transport goes away.
    pub async fn run(mut self) {
        while let Some(reply) = self.inbound.recv().await {
            let correlation_id = reply.correlation_id.clone();
            let route = reply.route.clone();
            let channel = reply.channel_key.clone();

            match self.pending.resolve(reply) {
                Resolution::Delivered => {}
                Resolution::CallerGone => {
                    debug!(
                        correlation_id = %correlation_id,
                        route = %route,
                        "Caller went away before reply arrived"
                    );
                }
                // Logged by the store; the call keeps waiting.
                Resolution::WrongChannel => {}
                Resolution::Unknown => {
                    // Late replies and unsolicited wallet messages land here.
                    debug!(
                        correlation_id = %correlation_id,
                        channel = %channel,
                        route = %route,
                        "Orphaned reply dropped"
                    );
                }
            }
        }
        info!("Inbound stream closed, stopping reply listener");
    }
}
