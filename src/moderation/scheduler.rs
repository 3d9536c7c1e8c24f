//! Expiry scheduler
//!
//! Holds every currently-unexpired time-bound reprimand and fires its reversal
//! exactly once when the expiry time is reached. The queue is rebuilt from the
//! history store at startup, which is the durability mechanism across
//! restarts.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{Receiver, Sender, channel};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::moderation::{
    ExpirableEntry, ExpiryRequest, HistoryStore, ModerationAction, ModerationGateway,
    ReprimandStatus,
};

/// Capacity of the scheduler's request channel
const REQUEST_BUFFER: usize = 128;

/// Heap entry ordered so the earliest expiry is popped first
#[derive(Debug, Clone, PartialEq, Eq)]
struct QueuedExpiry(ExpirableEntry);

impl Ord for QueuedExpiry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert so the earliest expiry wins
        other
            .0
            .expire_at
            .cmp(&self.0.expire_at)
            .then_with(|| other.0.reprimand_id.cmp(&self.0.reprimand_id))
    }
}

impl PartialOrd for QueuedExpiry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Scheduler for time-bound reprimand reversals
///
/// Constructed once at startup with an explicit `start`/`shutdown` lifecycle
/// so tests can run isolated instances.
#[derive(Clone)]
pub struct ExpiryScheduler {
    store: HistoryStore,
    gateway: Arc<dyn ModerationGateway>,
    tx: Sender<ExpiryRequest>,
}

impl ExpiryScheduler {
    /// Create a new scheduler and the receiver its task will drain
    #[must_use]
    pub fn new(
        store: HistoryStore,
        gateway: Arc<dyn ModerationGateway>,
    ) -> (Self, Receiver<ExpiryRequest>) {
        let (tx, rx) = channel(REQUEST_BUFFER);
        (Self { store, gateway, tx }, rx)
    }

    /// Spawn the scheduler task
    pub fn start(&self, rx: Receiver<ExpiryRequest>) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler.run(rx).await;
        })
    }

    /// Arm a timer for a time-bound reprimand
    pub async fn schedule(&self, entry: ExpirableEntry) {
        if let Err(error) = self.tx.send(ExpiryRequest::Schedule(entry)).await {
            error!(%error, "Failed to send schedule request");
        }
    }

    /// Remove a still-scheduled entry; a fire already in flight is absorbed by
    /// the authoritative status re-check
    pub async fn cancel(&self, reprimand_id: uuid::Uuid) {
        if let Err(error) = self.tx.send(ExpiryRequest::Cancel(reprimand_id)).await {
            error!(%error, "Failed to send cancel request");
        }
    }

    /// Stop the scheduler task
    pub async fn shutdown(&self) {
        if let Err(error) = self.tx.send(ExpiryRequest::Shutdown).await {
            error!(%error, "Failed to send shutdown request");
        }
    }

    /// Re-arm timers for every active expirable record in the store
    ///
    /// Called once at startup; entries whose expiry already passed fire
    /// immediately.
    pub async fn load_and_reschedule(&self, guild_id: Option<u64>) -> usize {
        let entries = self.store.find_active_expirable(guild_id);
        let count = entries.len();

        for entry in entries {
            self.schedule(entry).await;
        }

        info!(count, "Rescheduled pending reprimand expirations");
        count
    }

    /// The main scheduler task
    async fn run(&self, mut rx: Receiver<ExpiryRequest>) {
        info!("Starting expiry scheduler task");

        let mut queue: BinaryHeap<QueuedExpiry> = BinaryHeap::new();

        loop {
            let next = queue.peek().map(|queued| queued.0.expire_at);

            tokio::select! {
                request = rx.recv() => {
                    match request {
                        Some(ExpiryRequest::Schedule(entry)) => {
                            // A record is only ever queued once
                            let already = queue
                                .iter()
                                .any(|queued| queued.0.reprimand_id == entry.reprimand_id);
                            if already {
                                debug!(reprimand_id = %entry.reprimand_id, "Entry already scheduled");
                            } else {
                                debug!(
                                    reprimand_id = %entry.reprimand_id,
                                    expire_at = %entry.expire_at,
                                    "Entry scheduled"
                                );
                                queue.push(QueuedExpiry(entry));
                            }
                        }
                        Some(ExpiryRequest::Cancel(reprimand_id)) => {
                            let before = queue.len();
                            let kept: Vec<QueuedExpiry> = queue
                                .drain()
                                .filter(|queued| queued.0.reprimand_id != reprimand_id)
                                .collect();
                            queue = kept.into_iter().collect();

                            if queue.len() < before {
                                info!(%reprimand_id, "Scheduled expiry cancelled");
                            } else {
                                debug!(%reprimand_id, "Cancel for an unscheduled entry");
                            }
                        }
                        Some(ExpiryRequest::Shutdown) | None => break,
                    }
                }
                () = sleep_until(next), if next.is_some() => {
                    self.fire_due(&mut queue).await;
                }
            }
        }

        info!("Expiry scheduler task shut down");
    }

    /// Fire the head entry and everything due at the same instant
    async fn fire_due(&self, queue: &mut BinaryHeap<QueuedExpiry>) {
        let Some(head) = queue.pop() else {
            return;
        };

        let cutoff = head.0.expire_at;
        self.fire(head.0).await;

        while queue
            .peek()
            .is_some_and(|queued| queued.0.expire_at <= cutoff)
        {
            if let Some(queued) = queue.pop() {
                self.fire(queued.0).await;
            }
        }
    }

    /// Reverse one expired reprimand
    ///
    /// The store is re-read first: the record may have been pardoned or
    /// deleted while the timer was armed, in which case this is a no-op. A
    /// failed reversal leaves the status untouched so the entry is re-armed
    /// by the next restart's `load_and_reschedule`.
    async fn fire(&self, entry: ExpirableEntry) {
        let Some(record) = self.store.get(entry.reprimand_id) else {
            debug!(reprimand_id = %entry.reprimand_id, "Expired entry no longer exists");
            return;
        };

        if !record.is_expiry_pending() {
            debug!(
                reprimand_id = %entry.reprimand_id,
                status = %record.status,
                "Expired entry already settled"
            );
            return;
        }

        if let Err(error) = self.gateway.reverse(&record).await {
            error!(
                reprimand_id = %entry.reprimand_id,
                user_id = %entry.user_id,
                guild_id = %entry.guild_id,
                %error,
                "Failed to reverse expired reprimand; retrying after next restart"
            );
            return;
        }

        let actor = self.gateway.resolve_actor(entry.guild_id);
        let action = ModerationAction::new(actor, "[Reprimand Expired]");

        match self
            .store
            .update_status(entry.reprimand_id, ReprimandStatus::Expired, action)
        {
            Ok(record) => {
                if let Err(error) = self.store.save().await {
                    error!(%error, "Failed to persist expired reprimand");
                }
                info!(
                    reprimand_id = %record.id,
                    user_id = %record.user_id,
                    guild_id = %record.guild_id,
                    kind = %record.kind.get_type(),
                    "Reprimand expired"
                );
            }
            Err(error) => {
                debug!(
                    reprimand_id = %entry.reprimand_id,
                    %error,
                    "Expired entry settled concurrently"
                );
            }
        }
    }
}

/// Sleep until a wall-clock instant; past instants return immediately
async fn sleep_until(at: Option<DateTime<Utc>>) {
    let Some(at) = at else {
        // Guarded out by the select precondition
        return;
    };

    let delay = (at - Utc::now())
        .to_std()
        .unwrap_or(std::time::Duration::ZERO);
    tokio::time::sleep(delay).await;
}
