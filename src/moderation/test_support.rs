//! Shared fixtures for engine tests

pub(crate) use crate::moderation::gateway::MockModerationGateway as MockGateway;

use crate::moderation::{ModerationAction, Reprimand, ReprimandKind, ReprimandSource};

/// Build a manual reprimand record for a member
pub(crate) fn reprimand_for(user_id: u64, guild_id: u64, kind: ReprimandKind) -> Reprimand {
    Reprimand::new(
        user_id,
        guild_id,
        ReprimandSource::Manual,
        kind,
        ModerationAction::new(1, "test"),
    )
}
