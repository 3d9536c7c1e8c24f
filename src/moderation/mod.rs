//! Reprimand and escalation engine
//!
//! Records punitive and advisory actions against members, cascades automatic
//! secondary reprimands when configured thresholds are crossed, and reverses
//! time-bound reprimands once they expire.

mod dedup;
mod error;
mod gateway;
mod history;
mod reprimand;
mod scheduler;
mod service;
mod trigger;

#[cfg(test)]
pub(crate) mod test_support;

pub use dedup::{DuplicateDetector, levenshtein};
pub use error::{ModerationError, ModerationResult};
pub use gateway::{ActionHandler, ActionHandlerRegistry, DiscordGateway, ModerationGateway};
pub use history::HistoryStore;
pub use reprimand::{
    ExpirableEntry, ExpiryKind, ModerationAction, Reprimand, ReprimandKind, ReprimandResult,
    ReprimandSource, ReprimandStatus, ReprimandTemplate, ReprimandType,
};
pub use scheduler::ExpiryScheduler;
pub use service::{ModerationService, Notifier, ReprimandRequest, TracingNotifier};
pub use trigger::{Trigger, TriggerMode, TriggerRule, TriggerSource, is_triggered, select_trigger};

/// Request type for the expiry scheduler task
#[derive(Debug, Clone)]
pub enum ExpiryRequest {
    /// Arm a timer for a time-bound reprimand
    Schedule(ExpirableEntry),
    /// Drop a still-scheduled entry
    Cancel(uuid::Uuid),
    /// Shutdown the scheduler task
    Shutdown,
}
