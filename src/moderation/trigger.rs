//! Escalation triggers
//!
//! A trigger is a configured threshold rule: when a member's history count in
//! a source category satisfies the trigger's amount and mode, the trigger's
//! cascade template is applied automatically as a secondary reprimand.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::moderation::{ReprimandSource, ReprimandTemplate, ReprimandType};

/// How a trigger's amount is compared against the history count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum TriggerMode {
    /// Fires only when the count equals the amount
    Exact,
    /// Fires on every violation once the count has reached the amount
    Retroactive,
    /// Fires on every multiple of the amount
    Multiple,
}

/// History category a count trigger watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum TriggerSource {
    Warning,
    Notice,
    Censored,
}

impl TriggerSource {
    /// The source category a reprimand kind counts toward, if any
    ///
    /// Bans, kicks, mutes and notes record history but never feed triggers.
    #[must_use]
    pub fn of(kind: ReprimandType) -> Option<Self> {
        match kind {
            ReprimandType::Warning => Some(Self::Warning),
            ReprimandType::Notice => Some(Self::Notice),
            ReprimandType::Censored => Some(Self::Censored),
            ReprimandType::Ban
            | ReprimandType::Kick
            | ReprimandType::Mute
            | ReprimandType::Note => None,
        }
    }

    /// The source a reprimand cascaded from this category carries
    #[must_use]
    pub fn cascade_source(self) -> ReprimandSource {
        match self {
            Self::Warning => ReprimandSource::WarningCascade,
            Self::Notice => ReprimandSource::NoticeCascade,
            Self::Censored => ReprimandSource::CensorCascade,
        }
    }
}

/// What a trigger watches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerRule {
    /// Watches the member's history count in a source category
    Count { source: TriggerSource },
    /// Watches messages matching a pattern; counts its own censored records
    Censor { pattern: String, silent: bool },
}

/// A configured escalation rule for a guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    /// Unique ID of this trigger
    pub id: Uuid,
    /// ID of the guild the trigger belongs to
    pub guild_id: u64,
    /// Threshold amount, always at least 1
    pub amount: u32,
    /// How the amount is compared against the count
    pub mode: TriggerMode,
    /// Inactive triggers are kept in config but never fire
    pub is_active: bool,
    /// Reprimand applied when the trigger fires
    pub cascade: ReprimandTemplate,
    /// What the trigger watches
    pub rule: TriggerRule,
}

impl Trigger {
    /// Create a new count trigger; a zero amount is clamped to 1
    pub fn count(
        guild_id: u64,
        source: TriggerSource,
        amount: u32,
        mode: TriggerMode,
        cascade: ReprimandTemplate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            guild_id,
            amount: amount.max(1),
            mode,
            is_active: true,
            cascade,
            rule: TriggerRule::Count { source },
        }
    }

    /// Create a new censor trigger; a zero amount is clamped to 1
    pub fn censor(
        guild_id: u64,
        pattern: impl Into<String>,
        silent: bool,
        amount: u32,
        mode: TriggerMode,
        cascade: ReprimandTemplate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            guild_id,
            amount: amount.max(1),
            mode,
            is_active: true,
            cascade,
            rule: TriggerRule::Censor {
                pattern: pattern.into(),
                silent,
            },
        }
    }

    /// The censor pattern, if this is a censor trigger
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        match &self.rule {
            TriggerRule::Censor { pattern, .. } => Some(pattern),
            TriggerRule::Count { .. } => None,
        }
    }
}

/// Whether a trigger fires at the given history count
#[must_use]
pub fn is_triggered(count: u32, trigger: &Trigger) -> bool {
    match trigger.mode {
        TriggerMode::Exact => count == trigger.amount,
        TriggerMode::Retroactive => count >= trigger.amount,
        TriggerMode::Multiple => count != 0 && count % trigger.amount == 0,
    }
}

/// Pick the count trigger to cascade for a source category
///
/// Filters to active count triggers of `source` that fire at `count`, then
/// picks the one with the largest amount. Ties break on the id so the choice
/// is deterministic. At most one trigger ever fires per evaluation.
#[must_use]
pub fn select_trigger(
    count: u32,
    source: TriggerSource,
    triggers: &[Trigger],
) -> Option<&Trigger> {
    triggers
        .iter()
        .filter(|t| t.is_active)
        .filter(|t| matches!(&t.rule, TriggerRule::Count { source: s } if *s == source))
        .filter(|t| is_triggered(count, t))
        .max_by_key(|t| (t.amount, t.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_trigger(amount: u32, mode: TriggerMode) -> Trigger {
        Trigger::count(
            67890,
            TriggerSource::Warning,
            amount,
            mode,
            ReprimandTemplate::Note,
        )
    }

    #[test]
    fn test_exact_mode() {
        let trigger = count_trigger(3, TriggerMode::Exact);
        for count in 0..10 {
            assert_eq!(is_triggered(count, &trigger), count == 3, "count {count}");
        }
    }

    #[test]
    fn test_retroactive_mode() {
        let trigger = count_trigger(5, TriggerMode::Retroactive);
        for count in 0..10 {
            assert_eq!(is_triggered(count, &trigger), count >= 5, "count {count}");
        }
    }

    #[test]
    fn test_multiple_mode() {
        let trigger = count_trigger(2, TriggerMode::Multiple);
        assert!(!is_triggered(0, &trigger));
        assert!(!is_triggered(1, &trigger));
        assert!(is_triggered(2, &trigger));
        assert!(!is_triggered(3, &trigger));
        assert!(is_triggered(4, &trigger));
        assert!(is_triggered(6, &trigger));
    }

    #[test]
    fn test_zero_amount_clamped() {
        let trigger = count_trigger(0, TriggerMode::Multiple);
        assert_eq!(trigger.amount, 1);
        // Never fires at zero even when every count is a multiple of 1
        assert!(!is_triggered(0, &trigger));
        assert!(is_triggered(1, &trigger));
    }

    #[test]
    fn test_select_highest_amount_wins() {
        let low = count_trigger(2, TriggerMode::Retroactive);
        let high = count_trigger(5, TriggerMode::Retroactive);
        let triggers = vec![low.clone(), high.clone()];

        // Both fire at 6; the larger amount is preferred
        let selected = select_trigger(6, TriggerSource::Warning, &triggers).unwrap();
        assert_eq!(selected.id, high.id);

        // Only the low one fires at 3
        let selected = select_trigger(3, TriggerSource::Warning, &triggers).unwrap();
        assert_eq!(selected.id, low.id);

        // Nothing fires at 1
        assert!(select_trigger(1, TriggerSource::Warning, &triggers).is_none());
    }

    #[test]
    fn test_select_is_deterministic_on_ties() {
        let a = count_trigger(3, TriggerMode::Retroactive);
        let b = count_trigger(3, TriggerMode::Retroactive);
        let expected = a.id.max(b.id);

        let forward = vec![a.clone(), b.clone()];
        let backward = vec![b, a];

        let picked_forward = select_trigger(4, TriggerSource::Warning, &forward).unwrap();
        let picked_backward = select_trigger(4, TriggerSource::Warning, &backward).unwrap();
        assert_eq!(picked_forward.id, expected);
        assert_eq!(picked_backward.id, expected);
    }

    #[test]
    fn test_select_ignores_inactive_and_other_sources() {
        let mut inactive = count_trigger(2, TriggerMode::Retroactive);
        inactive.is_active = false;

        let other_source = Trigger::count(
            67890,
            TriggerSource::Notice,
            2,
            TriggerMode::Retroactive,
            ReprimandTemplate::Note,
        );

        let censor = Trigger::censor(
            67890,
            "spam",
            false,
            2,
            TriggerMode::Retroactive,
            ReprimandTemplate::Note,
        );

        let triggers = vec![inactive, other_source, censor];
        assert!(select_trigger(10, TriggerSource::Warning, &triggers).is_none());
    }

    #[test]
    fn test_source_of_kind() {
        assert_eq!(
            TriggerSource::of(ReprimandType::Warning),
            Some(TriggerSource::Warning)
        );
        assert_eq!(
            TriggerSource::of(ReprimandType::Censored),
            Some(TriggerSource::Censored)
        );
        assert_eq!(TriggerSource::of(ReprimandType::Ban), None);
        assert_eq!(TriggerSource::of(ReprimandType::Note), None);
    }
}
