//! Pending call registry - the async-to-sync half of the correlation bridge.
//!
//! Maps correlation ids to callers waiting on a socket reply. An entry is
//! resolved at most once: whoever removes it from the map owns the
//! resolution, so a reply racing a timeout can never complete a call twice.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use channel_bus::Message;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// How long past its deadline an entry may linger before the sweeper takes it.
///
/// Live callers expire their own entries at the deadline; the sweeper only
/// collects entries whose caller is gone or never came back.
pub const SWEEP_GRACE: Duration = Duration::from_secs(5);

/// A call waiting on its reply.
struct PendingCall {
    /// Completion slot.
    sender: oneshot::Sender<Message>,
    /// Channel the request went out on.
    channel_key: String,
    /// Route of the request.
    route: String,
    created_at: Instant,
    deadline: Instant,
}

/// Counters for the pending call registry.
#[derive(Debug, Default)]
pub struct PendingStats {
    pub total_registered: AtomicU64,
    pub total_completed: AtomicU64,
    pub total_timeouts: AtomicU64,
    pub total_cancelled: AtomicU64,
    /// Replies that resolved no pending call.
    pub total_orphaned: AtomicU64,
}

/// Outcome of trying to resolve a call with a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The waiting caller received the reply.
    Delivered,
    /// The entry existed but the caller had already gone away.
    CallerGone,
    /// No pending call carries this correlation id.
    Unknown,
    /// A call carries this correlation id but went out on another channel.
    /// The call stays pending.
    WrongChannel,
}

/// Registry of in-flight calls keyed by correlation id.
///
/// Flow:
/// 1. Caller picks a correlation id and calls `register()` for a receiver
/// 2. Caller publishes the request
/// 3. The reply listener calls `resolve()` when a reply arrives
/// 4. Caller awaits the receiver; on timeout or cancellation it calls
///    `cancel()` and only reports the failure if it won the removal
pub struct PendingCallStore {
    pending: DashMap<String, PendingCall>,
    stats: Arc<PendingStats>,
}

impl PendingCallStore {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            stats: Arc::new(PendingStats::default()),
        }
    }

    /// Register interest in exactly one reply carrying `correlation_id`.
    ///
    /// Returns `None` if the id is already pending; the existing call is left
    /// untouched.
    pub fn register(
        &self,
        correlation_id: &str,
        channel_key: &str,
        route: &str,
        deadline: Instant,
    ) -> Option<oneshot::Receiver<Message>> {
        let Entry::Vacant(slot) = self.pending.entry(correlation_id.to_string()) else {
            warn!(correlation_id = %correlation_id, "Correlation id already pending, registration refused");
            return None;
        };

        let (tx, rx) = oneshot::channel();
        slot.insert(PendingCall {
            sender: tx,
            channel_key: channel_key.to_string(),
            route: route.to_string(),
            created_at: Instant::now(),
            deadline,
        });
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        debug!(
            correlation_id = %correlation_id,
            channel = %channel_key,
            route = %route,
            "Registered pending call"
        );

        Some(rx)
    }

    /// Resolve the call waiting on `reply.correlation_id`.
    ///
    /// Only a reply arriving on the channel the call went out on resolves it.
    pub fn resolve(&self, reply: Message) -> Resolution {
        let removed = self
            .pending
            .remove_if(&reply.correlation_id, |_, call| call.channel_key == reply.channel_key);
        let Some((correlation_id, call)) = removed else {
            self.stats.total_orphaned.fetch_add(1, Ordering::Relaxed);
            if self.pending.contains_key(&reply.correlation_id) {
                warn!(
                    correlation_id = %reply.correlation_id,
                    channel = %reply.channel_key,
                    route = %reply.route,
                    "Reply arrived on the wrong channel, ignored"
                );
                return Resolution::WrongChannel;
            }
            debug!(
                correlation_id = %reply.correlation_id,
                route = %reply.route,
                "Reply for unknown or expired correlation id"
            );
            return Resolution::Unknown;
        };

        let elapsed = call.created_at.elapsed();
        let reply_route = reply.route.clone();
        match call.sender.send(reply) {
            Ok(()) => {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    channel = %call.channel_key,
                    route = %call.route,
                    reply_route = %reply_route,
                    response_time_ms = elapsed.as_millis(),
                    "Completed pending call"
                );
                Resolution::Delivered
            }
            Err(_) => {
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(correlation_id = %correlation_id, "Pending call receiver dropped");
                Resolution::CallerGone
            }
        }
    }

    /// Remove a call that timed out. True if this call won the removal.
    pub fn expire(&self, correlation_id: &str) -> bool {
        if self.pending.remove(correlation_id).is_some() {
            self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Remove a call whose caller gave up. True if this call won the removal.
    pub fn cancel(&self, correlation_id: &str) -> bool {
        if self.pending.remove(correlation_id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Drop abandoned calls: those whose caller is gone, and those more than
    /// `grace` past their deadline. Returns the number removed.
    pub fn remove_expired(&self, grace: Duration) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.pending.retain(|id, call| {
            let abandoned = call.sender.is_closed();
            if !abandoned && now < call.deadline + grace {
                return true;
            }
            warn!(
                correlation_id = %id,
                channel = %call.channel_key,
                route = %call.route,
                abandoned,
                elapsed_ms = now.duration_since(call.created_at).as_millis(),
                "Removing stale pending call"
            );
            if abandoned {
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            } else {
                self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
            }
            removed += 1;
            false
        });

        removed
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, correlation_id: &str) -> bool {
        self.pending.contains_key(correlation_id)
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

impl Default for PendingCallStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Background task sweeping calls whose caller never cleaned up.
pub async fn cleanup_task(store: Arc<PendingCallStore>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let removed = store.remove_expired(SWEEP_GRACE);
        if removed > 0 {
            debug!(removed, "Cleaned up expired pending calls");
        }
    }
}
