use poise::serenity_prelude::{self as serenity, Context, EventHandler, GuildId, Message, Ready};
use tracing::{error, info, warn};

use crate::moderation::{ReprimandKind, ReprimandRequest, TriggerRule};
use crate::{Data, EVENT_TARGET};

pub struct Handler;

#[serenity::async_trait]
impl EventHandler for Handler {
    /// Called when the bot is ready, but the cache may not be fully populated yet.
    async fn ready(&self, ctx: Context, ready: Ready) {
        let user_name = ready.user.name.clone();
        let shard_id = ctx.shard_id;
        info!("Connected as {user_name}, shard {shard_id}");
    }

    /// Called when the cache is fully populated.
    async fn cache_ready(&self, ctx: Context, guilds: Vec<GuildId>) {
        let guild_count_cache = ctx.cache.guild_count();
        let guild_count = guilds.len();
        if guild_count != guild_count_cache {
            warn!(
                "Cache guild count mismatch: {guild_count_cache} (cache) vs {guild_count} (actual)"
            );
        }
        info!("Cache ready! The bot is in {guild_count} guild(s)");
    }

    /// Scan guild messages against the guild's censor triggers.
    async fn message(&self, ctx: Context, message: Message) {
        // Ignore bots and webhooks.
        if message.author.bot || message.webhook_id.is_some() {
            return;
        }

        let Some(guild_id) = message.guild_id else {
            return;
        };

        let data = {
            let map = ctx.data.read().await;
            map.get::<Data>().cloned()
        };
        let Some(data) = data else {
            return;
        };
        let Some(service) = data.moderation().cloned() else {
            return;
        };

        let content_lower = message.content.to_lowercase();
        let censors = data.configs.active_censors(guild_id.get());
        let matched = censors.iter().find_map(|trigger| match &trigger.rule {
            TriggerRule::Censor { pattern, silent }
                if content_lower.contains(&pattern.to_lowercase()) =>
            {
                Some((trigger, pattern.clone(), *silent))
            }
            _ => None,
        });
        let Some((censor, pattern, silent)) = matched else {
            return;
        };

        info!(
            target: EVENT_TARGET,
            guild_id = %guild_id,
            user_id = %message.author.id,
            trigger_id = %censor.id,
            pattern = %pattern,
            "Message matched a censor"
        );

        if !silent {
            if let Err(error) = message.delete(&ctx.http).await {
                warn!(
                    target: EVENT_TARGET,
                    %error,
                    "Failed to delete censored message"
                );
            }
        }

        let mut request = ReprimandRequest::manual(
            guild_id.get(),
            message.author.id.get(),
            service.system_actor(guild_id.get()),
            format!("Censored message matching `{pattern}`"),
            ReprimandKind::Censored {
                content: message.content.clone(),
                pattern,
            },
        );
        request.trigger_id = Some(censor.id);

        if let Err(error) = service.apply(request).await {
            error!(
                target: EVENT_TARGET,
                %error,
                "Failed to record censored message"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test the Handler struct can be created
    #[test]
    fn test_handler_creation() {
        let _handler = Handler;
    }

    // Since we can't easily mock Context and Message objects due to their
    // complex structure, we verify what we can about the implementation.
    #[test]
    fn test_handler_implements_event_handler() {
        // This test verifies at compile time that Handler implements EventHandler
        fn assert_impl<T: EventHandler>() {}
        assert_impl::<Handler>();
    }
}
