//! Reprimand records and status management
//!
//! This module defines the reprimand record structure, its kind payloads, and
//! the status state machine governing the reprimand lifecycle.

use chrono::{DateTime, Duration, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::moderation::{ModerationError, ModerationResult};

/// Reprimand lifecycle states
///
/// Transitions are monotonic toward `Deleted`, which is terminal. A deleted
/// record can never be re-activated and is excluded from every history count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ReprimandStatus {
    /// Freshly applied and in effect
    Added,
    /// Reason or details were edited after the fact
    Updated,
    /// Kept on record but excluded from default counts
    Hidden,
    /// Lifted early by a moderator
    Pardoned,
    /// Lapsed on its own once the expiry time passed
    Expired,
    /// Hard-purged; terminal
    Deleted,
}

impl Default for ReprimandStatus {
    fn default() -> Self {
        Self::Added
    }
}

impl ReprimandStatus {
    /// Whether a transition from `self` to `next` is allowed
    #[must_use]
    pub fn can_transition(self, next: Self) -> bool {
        match (self, next) {
            // Deleted is terminal, Added only exists at creation
            (Self::Deleted, _) | (_, Self::Added) => false,
            (_, Self::Deleted) => true,
            // Expired and Pardoned records can only still be purged
            (Self::Expired | Self::Pardoned, _) => false,
            (Self::Added | Self::Updated | Self::Hidden, _) => true,
        }
    }
}

/// Discriminant of a reprimand kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ReprimandType {
    Ban,
    Kick,
    Mute,
    Warning,
    Notice,
    Note,
    Censored,
}

/// How a reprimand came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ReprimandSource {
    /// Issued directly by a moderator command
    Manual,
    /// Cascaded from a warning-count trigger
    WarningCascade,
    /// Cascaded from a notice-count trigger
    NoticeCascade,
    /// Cascaded from a censor trigger
    CensorCascade,
}

/// Actor, reason and timestamp of a creation or modification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationAction {
    pub actor_id: u64,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

impl ModerationAction {
    pub fn new(actor_id: u64, reason: impl Into<String>) -> Self {
        Self {
            actor_id,
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Kind-specific payload of a reprimand
///
/// Durations are stored in seconds so the records serialize cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReprimandKind {
    /// Server ban, optionally timed, deleting recent message history
    Ban {
        delete_history_days: u8,
        length: Option<u64>,
    },
    /// Server kick
    Kick,
    /// Mute via the guild's mute role, optionally timed
    Mute { length: Option<u64> },
    /// Formal warning carrying a weight toward escalation
    Warning { amount: u32 },
    /// Informal notice, optionally auto-pardoned after a delay
    Notice { auto_pardon_after: Option<u64> },
    /// Moderator-only note, never counted toward escalation
    Note,
    /// Record of a censored message
    Censored { content: String, pattern: String },
}

impl ReprimandKind {
    /// Get the discriminant of this kind
    #[must_use]
    pub fn get_type(&self) -> ReprimandType {
        match self {
            Self::Ban { .. } => ReprimandType::Ban,
            Self::Kick => ReprimandType::Kick,
            Self::Mute { .. } => ReprimandType::Mute,
            Self::Warning { .. } => ReprimandType::Warning,
            Self::Notice { .. } => ReprimandType::Notice,
            Self::Note => ReprimandType::Note,
            Self::Censored { .. } => ReprimandType::Censored,
        }
    }

    /// Whether applying this reprimand requires a platform call
    #[must_use]
    pub fn needs_platform_action(&self) -> bool {
        matches!(self, Self::Ban { .. } | Self::Kick | Self::Mute { .. })
    }

    /// Seconds until this reprimand lapses on its own, if any
    #[must_use]
    pub fn length(&self) -> Option<u64> {
        match self {
            Self::Ban { length, .. } | Self::Mute { length } => *length,
            Self::Notice { auto_pardon_after } => *auto_pardon_after,
            Self::Kick | Self::Warning { .. } | Self::Note | Self::Censored { .. } => None,
        }
    }

    /// Create a new Mute kind
    pub fn mute(length: impl Into<Option<u64>>) -> Self {
        Self::Mute {
            length: length.into(),
        }
    }

    /// Create a new `Ban` kind
    pub fn ban(delete_history_days: u8, length: impl Into<Option<u64>>) -> Self {
        Self::Ban {
            delete_history_days,
            length: length.into(),
        }
    }

    /// Create a new `Warning` kind
    pub fn warning(amount: u32) -> Self {
        Self::Warning { amount }
    }

    /// Create a new `Notice` kind
    pub fn notice(auto_pardon_after: impl Into<Option<u64>>) -> Self {
        Self::Notice {
            auto_pardon_after: auto_pardon_after.into(),
        }
    }
}

/// Reprimand a fired trigger cascades into
///
/// Mirrors [`ReprimandKind`] minus `Censored`, which only ever records an
/// observed message and cannot be configured as an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReprimandTemplate {
    Ban {
        delete_history_days: u8,
        length: Option<u64>,
    },
    Kick,
    Mute {
        length: Option<u64>,
    },
    Warning {
        amount: u32,
    },
    Notice,
    Note,
}

impl ReprimandTemplate {
    /// Instantiate the kind this template produces
    #[must_use]
    pub fn to_kind(&self) -> ReprimandKind {
        match self {
            Self::Ban {
                delete_history_days,
                length,
            } => ReprimandKind::Ban {
                delete_history_days: *delete_history_days,
                length: *length,
            },
            Self::Kick => ReprimandKind::Kick,
            Self::Mute { length } => ReprimandKind::Mute { length: *length },
            Self::Warning { amount } => ReprimandKind::Warning { amount: *amount },
            Self::Notice => ReprimandKind::Notice {
                auto_pardon_after: None,
            },
            Self::Note => ReprimandKind::Note,
        }
    }
}

/// Kind of effect an expiry reverses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ExpiryKind {
    Ban,
    Mute,
    Warning,
    Notice,
}

impl ExpiryKind {
    fn of(kind: &ReprimandKind) -> Option<Self> {
        match kind {
            ReprimandKind::Ban { .. } => Some(Self::Ban),
            ReprimandKind::Mute { .. } => Some(Self::Mute),
            ReprimandKind::Warning { .. } => Some(Self::Warning),
            ReprimandKind::Notice { .. } => Some(Self::Notice),
            ReprimandKind::Kick | ReprimandKind::Note | ReprimandKind::Censored { .. } => None,
        }
    }
}

/// Scheduling-only projection of a time-bound reprimand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirableEntry {
    pub reprimand_id: Uuid,
    pub guild_id: u64,
    pub user_id: u64,
    pub expire_at: DateTime<Utc>,
    pub kind: ExpiryKind,
}

/// Record of a reprimand against a member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reprimand {
    /// Unique ID of this reprimand
    pub id: Uuid,
    /// ID of the member the reprimand is against
    pub user_id: u64,
    /// ID of the guild where the reprimand applies
    pub guild_id: u64,
    /// How this reprimand came to exist
    pub source: ReprimandSource,
    /// Current lifecycle status
    pub status: ReprimandStatus,
    /// Kind-specific payload
    pub kind: ReprimandKind,
    /// Actor, reason and timestamp of creation
    pub created: ModerationAction,
    /// Actor, reason and timestamp of the latest modification (if any)
    pub modified: Option<ModerationAction>,
    /// ID of the trigger that produced this reprimand (if any)
    pub trigger_id: Option<Uuid>,
    /// ID of the primary reprimand this one cascaded from (if any)
    pub cascade_of: Option<Uuid>,
    /// When the reprimand lapses on its own (if time-bound)
    pub expire_at: Option<DateTime<Utc>>,
}

impl Reprimand {
    /// Create a new reprimand record in the `Added` state
    pub fn new(
        user_id: u64,
        guild_id: u64,
        source: ReprimandSource,
        kind: ReprimandKind,
        created: ModerationAction,
    ) -> Self {
        let expire_at = Self::compute_expiry(&kind);

        Self {
            id: Uuid::new_v4(),
            user_id,
            guild_id,
            source,
            status: ReprimandStatus::Added,
            kind,
            created,
            modified: None,
            trigger_id: None,
            cascade_of: None,
            expire_at,
        }
    }

    /// Calculate when a kind lapses, relative to now
    #[must_use]
    pub fn compute_expiry(kind: &ReprimandKind) -> Option<DateTime<Utc>> {
        let length = kind.length()?;
        if length == 0 {
            return None;
        }

        let delta = Duration::try_seconds(i64::try_from(length).ok()?)?;
        Utc::now().checked_add_signed(delta)
    }

    /// Transition this reprimand to a new status
    ///
    /// # Errors
    /// Returns an error if the transition would move backwards or out of a
    /// terminal state.
    pub fn transition(
        &mut self,
        status: ReprimandStatus,
        action: ModerationAction,
    ) -> ModerationResult<()> {
        if !self.status.can_transition(status) {
            return Err(ModerationError::InvalidTransition {
                from: self.status,
                to: status,
            });
        }

        self.status = status;
        self.modified = Some(action);

        info!(
            reprimand_id = %self.id,
            user_id = %self.user_id,
            guild_id = %self.guild_id,
            kind = %self.kind.get_type(),
            status = %self.status,
            "Reprimand status changed"
        );

        Ok(())
    }

    /// Whether this record contributes to history counts
    #[must_use]
    pub fn is_counted(&self, count_hidden: bool) -> bool {
        match self.status {
            ReprimandStatus::Deleted => false,
            ReprimandStatus::Hidden => count_hidden,
            _ => true,
        }
    }

    /// Whether the reprimand's effect is still standing, so an expiry or
    /// pardon has something to reverse
    #[must_use]
    pub fn is_expiry_pending(&self) -> bool {
        matches!(
            self.status,
            ReprimandStatus::Added | ReprimandStatus::Updated | ReprimandStatus::Hidden
        )
    }

    /// Project this record into a scheduler entry, if it is time-bound and
    /// its effect is still standing
    #[must_use]
    pub fn expirable(&self) -> Option<ExpirableEntry> {
        if !self.is_expiry_pending() {
            return None;
        }

        let expire_at = self.expire_at?;
        let kind = ExpiryKind::of(&self.kind)?;

        Some(ExpirableEntry {
            reprimand_id: self.id,
            guild_id: self.guild_id,
            user_id: self.user_id,
            expire_at,
            kind,
        })
    }
}

/// Read-only summary of an applied reprimand and its cascade, returned to the
/// caller for reporting; never persisted
#[derive(Debug, Clone)]
pub struct ReprimandResult {
    pub primary: Reprimand,
    pub secondary: Option<Reprimand>,
}

impl ReprimandResult {
    #[must_use]
    pub fn new(primary: Reprimand) -> Self {
        Self {
            primary,
            secondary: None,
        }
    }

    #[must_use]
    pub fn with_secondary(primary: Reprimand, secondary: Reprimand) -> Self {
        Self {
            primary,
            secondary: Some(secondary),
        }
    }
}
