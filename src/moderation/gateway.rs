//! Platform action handlers
//!
//! This module is the boundary to the chat platform: applying a reprimand may
//! require a ban, kick or mute-role call, and reversing one the inverse. The
//! engine only ever talks to the platform through [`ModerationGateway`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use poise::serenity_prelude::{GuildId, Http, RoleId, UserId};
use tracing::{info, warn};

use crate::data::GuildConfigs;
use crate::moderation::{ModerationError, ModerationResult, Reprimand, ReprimandKind, ReprimandType};

/// Boundary the engine uses for platform side effects
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModerationGateway: Send + Sync {
    /// Make a reprimand effective on the platform
    async fn apply(&self, reprimand: &Reprimand) -> ModerationResult<()>;

    /// Reverse a reprimand's platform effect
    async fn reverse(&self, reprimand: &Reprimand) -> ModerationResult<()>;

    /// The system actor used for cascades and expiry reversals
    fn resolve_actor(&self, guild_id: u64) -> u64;
}

/// Trait for handling one reprimand kind's platform calls
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Execute the platform action
    async fn apply(
        &self,
        http: &Http,
        configs: &GuildConfigs,
        reprimand: &Reprimand,
    ) -> ModerationResult<()>;

    /// Reverse the platform action (if applicable)
    async fn reverse(
        &self,
        http: &Http,
        configs: &GuildConfigs,
        reprimand: &Reprimand,
    ) -> ModerationResult<()>;
}

/// Registry of action handlers
pub struct ActionHandlerRegistry {
    handlers: HashMap<ReprimandType, Box<dyn ActionHandler>>,
}

impl Default for ActionHandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionHandlerRegistry {
    /// Create a new registry with all handlers registered
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
        };

        registry.register(ReprimandType::Ban, Box::new(BanHandler));
        registry.register(ReprimandType::Kick, Box::new(KickHandler));
        registry.register(ReprimandType::Mute, Box::new(MuteHandler));
        // Record-only kinds have no platform effect
        registry.register(ReprimandType::Warning, Box::new(RecordOnlyHandler));
        registry.register(ReprimandType::Notice, Box::new(RecordOnlyHandler));
        registry.register(ReprimandType::Note, Box::new(RecordOnlyHandler));
        registry.register(ReprimandType::Censored, Box::new(RecordOnlyHandler));

        registry
    }

    /// Register a handler for a reprimand kind
    pub fn register(&mut self, kind: ReprimandType, handler: Box<dyn ActionHandler>) {
        self.handlers.insert(kind, handler);
    }

    /// Get the handler for a reprimand kind
    #[must_use]
    pub fn get(&self, kind: ReprimandType) -> Option<&dyn ActionHandler> {
        self.handlers.get(&kind).map(AsRef::as_ref)
    }

    /// Execute a reprimand's platform action
    ///
    /// # Errors
    /// Returns `UnknownTemplate` if no handler is registered for the kind.
    pub async fn apply(
        &self,
        http: &Http,
        configs: &GuildConfigs,
        reprimand: &Reprimand,
    ) -> ModerationResult<()> {
        let kind = reprimand.kind.get_type();
        match self.get(kind) {
            Some(handler) => handler.apply(http, configs, reprimand).await,
            None => Err(ModerationError::UnknownTemplate(kind.to_string())),
        }
    }

    /// Reverse a reprimand's platform action
    ///
    /// # Errors
    /// Returns `UnknownTemplate` if no handler is registered for the kind.
    pub async fn reverse(
        &self,
        http: &Http,
        configs: &GuildConfigs,
        reprimand: &Reprimand,
    ) -> ModerationResult<()> {
        let kind = reprimand.kind.get_type();
        match self.get(kind) {
            Some(handler) => handler.reverse(http, configs, reprimand).await,
            None => Err(ModerationError::UnknownTemplate(kind.to_string())),
        }
    }
}

/// Serenity-backed gateway used by the running bot
pub struct DiscordGateway {
    http: Arc<Http>,
    configs: GuildConfigs,
    handlers: ActionHandlerRegistry,
    bot_user_id: u64,
}

impl DiscordGateway {
    #[must_use]
    pub fn new(http: Arc<Http>, configs: GuildConfigs, bot_user_id: u64) -> Self {
        Self {
            http,
            configs,
            handlers: ActionHandlerRegistry::new(),
            bot_user_id,
        }
    }
}

#[async_trait]
impl ModerationGateway for DiscordGateway {
    async fn apply(&self, reprimand: &Reprimand) -> ModerationResult<()> {
        self.handlers.apply(&self.http, &self.configs, reprimand).await
    }

    async fn reverse(&self, reprimand: &Reprimand) -> ModerationResult<()> {
        self.handlers
            .reverse(&self.http, &self.configs, reprimand)
            .await
    }

    fn resolve_actor(&self, _guild_id: u64) -> u64 {
        self.bot_user_id
    }
}

/// Look up the configured mute role for a guild
fn mute_role(configs: &GuildConfigs, guild_id: u64) -> ModerationResult<RoleId> {
    configs
        .get(guild_id)
        .and_then(|config| config.mute_role_id)
        .map(RoleId::new)
        .ok_or_else(|| {
            ModerationError::PermissionDenied("no mute role configured for this guild".to_string())
        })
}

/// Handler for kinds that only record history
struct RecordOnlyHandler;

#[async_trait]
impl ActionHandler for RecordOnlyHandler {
    async fn apply(
        &self,
        _http: &Http,
        _configs: &GuildConfigs,
        reprimand: &Reprimand,
    ) -> ModerationResult<()> {
        info!(
            reprimand_id = %reprimand.id,
            user_id = %reprimand.user_id,
            guild_id = %reprimand.guild_id,
            kind = %reprimand.kind.get_type(),
            "Record-only reprimand applied"
        );
        Ok(())
    }

    async fn reverse(
        &self,
        _http: &Http,
        _configs: &GuildConfigs,
        reprimand: &Reprimand,
    ) -> ModerationResult<()> {
        // Lapsing a warning or notice is purely a status change
        info!(
            reprimand_id = %reprimand.id,
            user_id = %reprimand.user_id,
            guild_id = %reprimand.guild_id,
            kind = %reprimand.kind.get_type(),
            "Record-only reprimand lapsed"
        );
        Ok(())
    }
}

/// Handler for the Mute kind, backed by the guild's mute role
struct MuteHandler;

#[async_trait]
impl ActionHandler for MuteHandler {
    async fn apply(
        &self,
        http: &Http,
        configs: &GuildConfigs,
        reprimand: &Reprimand,
    ) -> ModerationResult<()> {
        let role = mute_role(configs, reprimand.guild_id)?;

        http.add_member_role(
            GuildId::new(reprimand.guild_id),
            UserId::new(reprimand.user_id),
            role,
            Some(&reprimand.created.reason),
        )
        .await
        .map_err(ModerationError::from_discord)?;

        info!(
            reprimand_id = %reprimand.id,
            user_id = %reprimand.user_id,
            guild_id = %reprimand.guild_id,
            "Mute role added"
        );
        Ok(())
    }

    async fn reverse(
        &self,
        http: &Http,
        configs: &GuildConfigs,
        reprimand: &Reprimand,
    ) -> ModerationResult<()> {
        let role = mute_role(configs, reprimand.guild_id)?;

        http.remove_member_role(
            GuildId::new(reprimand.guild_id),
            UserId::new(reprimand.user_id),
            role,
            Some("Mute lifted"),
        )
        .await
        .map_err(ModerationError::from_discord)?;

        info!(
            reprimand_id = %reprimand.id,
            user_id = %reprimand.user_id,
            guild_id = %reprimand.guild_id,
            "Mute role removed"
        );
        Ok(())
    }
}

/// Handler for the Ban kind
struct BanHandler;

#[async_trait]
impl ActionHandler for BanHandler {
    async fn apply(
        &self,
        http: &Http,
        _configs: &GuildConfigs,
        reprimand: &Reprimand,
    ) -> ModerationResult<()> {
        let ReprimandKind::Ban {
            delete_history_days,
            ..
        } = reprimand.kind
        else {
            return Ok(());
        };

        http.ban_user(
            GuildId::new(reprimand.guild_id),
            UserId::new(reprimand.user_id),
            delete_history_days,
            Some(&reprimand.created.reason),
        )
        .await
        .map_err(ModerationError::from_discord)?;

        info!(
            reprimand_id = %reprimand.id,
            user_id = %reprimand.user_id,
            guild_id = %reprimand.guild_id,
            "Member banned"
        );
        Ok(())
    }

    async fn reverse(
        &self,
        http: &Http,
        _configs: &GuildConfigs,
        reprimand: &Reprimand,
    ) -> ModerationResult<()> {
        http.remove_ban(
            GuildId::new(reprimand.guild_id),
            UserId::new(reprimand.user_id),
            Some("Ban lifted"),
        )
        .await
        .map_err(ModerationError::from_discord)?;

        info!(
            reprimand_id = %reprimand.id,
            user_id = %reprimand.user_id,
            guild_id = %reprimand.guild_id,
            "Member unbanned"
        );
        Ok(())
    }
}

/// Handler for the Kick kind
struct KickHandler;

#[async_trait]
impl ActionHandler for KickHandler {
    async fn apply(
        &self,
        http: &Http,
        _configs: &GuildConfigs,
        reprimand: &Reprimand,
    ) -> ModerationResult<()> {
        http.kick_member(
            GuildId::new(reprimand.guild_id),
            UserId::new(reprimand.user_id),
            Some(&reprimand.created.reason),
        )
        .await
        .map_err(ModerationError::from_discord)?;

        info!(
            reprimand_id = %reprimand.id,
            user_id = %reprimand.user_id,
            guild_id = %reprimand.guild_id,
            "Member kicked"
        );
        Ok(())
    }

    async fn reverse(
        &self,
        _http: &Http,
        _configs: &GuildConfigs,
        reprimand: &Reprimand,
    ) -> ModerationResult<()> {
        // A kick cannot be reversed
        warn!(
            reprimand_id = %reprimand.id,
            "Attempted to reverse a kick; nothing to do"
        );
        Ok(())
    }
}
