use crate::moderation::{
    ModerationResult, ReprimandKind, ReprimandRequest, ReprimandResult, ReprimandStatus,
    ReprimandType,
};
use crate::{Context, Error};
use poise::command;
use poise::serenity_prelude as serenity;
use uuid::Uuid;

/// Basic ping command
/// This command is used to check if the bot is responsive.
#[command(prefix_command, slash_command, guild_only)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say("Pong!").await?;
    Ok(())
}

/// Warn a member
#[command(prefix_command, slash_command, guild_only)]
pub async fn warn(
    ctx: Context<'_>,
    #[description = "Member to warn"] user: serenity::User,
    #[description = "Warning weight (defaults to 1)"] amount: Option<u32>,
    #[description = "Reason for the warning"] reason: String,
) -> Result<(), Error> {
    apply(ctx, user, reason, ReprimandKind::warning(amount.unwrap_or(1))).await
}

/// Send a member a notice
#[command(prefix_command, slash_command, guild_only)]
pub async fn notice(
    ctx: Context<'_>,
    #[description = "Member to notice"] user: serenity::User,
    #[description = "Reason for the notice"] reason: String,
) -> Result<(), Error> {
    apply(ctx, user, reason, ReprimandKind::notice(None)).await
}

/// Add a moderator-only note about a member
#[command(prefix_command, slash_command, guild_only)]
pub async fn note(
    ctx: Context<'_>,
    #[description = "Member the note is about"] user: serenity::User,
    #[description = "Note contents"] reason: String,
) -> Result<(), Error> {
    apply(ctx, user, reason, ReprimandKind::Note).await
}

/// Mute a member via the configured mute role
#[command(prefix_command, slash_command, guild_only)]
pub async fn mute(
    ctx: Context<'_>,
    #[description = "Member to mute"] user: serenity::User,
    #[description = "Minutes until the mute lifts (omit for indefinite)"] minutes: Option<u64>,
    #[description = "Reason for the mute"] reason: String,
) -> Result<(), Error> {
    apply(
        ctx,
        user,
        reason,
        ReprimandKind::mute(minutes.map(|m| m.saturating_mul(60))),
    )
    .await
}

/// Ban a member
#[command(prefix_command, slash_command, guild_only)]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "Member to ban"] user: serenity::User,
    #[description = "Days of message history to delete"] delete_days: Option<u8>,
    #[description = "Minutes until the ban lifts (omit for permanent)"] minutes: Option<u64>,
    #[description = "Reason for the ban"] reason: String,
) -> Result<(), Error> {
    apply(
        ctx,
        user,
        reason,
        ReprimandKind::ban(
            delete_days.unwrap_or(0),
            minutes.map(|m| m.saturating_mul(60)),
        ),
    )
    .await
}

/// Kick a member
#[command(prefix_command, slash_command, guild_only)]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "Member to kick"] user: serenity::User,
    #[description = "Reason for the kick"] reason: String,
) -> Result<(), Error> {
    apply(ctx, user, reason, ReprimandKind::Kick).await
}

/// Pardon a reprimand, lifting its effect early
#[command(prefix_command, slash_command, guild_only)]
pub async fn pardon(
    ctx: Context<'_>,
    #[description = "Reprimand id"] id: String,
    #[description = "Reason for the pardon"] reason: String,
) -> Result<(), Error> {
    modify(ctx, &id, ReprimandStatus::Pardoned, reason, false).await
}

/// Update a reprimand's reason
#[command(prefix_command, slash_command, guild_only)]
pub async fn update(
    ctx: Context<'_>,
    #[description = "Reprimand id"] id: String,
    #[description = "New reason"] reason: String,
) -> Result<(), Error> {
    modify(ctx, &id, ReprimandStatus::Updated, reason, false).await
}

/// Hide a reprimand from default history counts
#[command(prefix_command, slash_command, guild_only)]
pub async fn hide(
    ctx: Context<'_>,
    #[description = "Reprimand id"] id: String,
    #[description = "Reason for hiding"] reason: String,
) -> Result<(), Error> {
    modify(ctx, &id, ReprimandStatus::Hidden, reason, false).await
}

/// Permanently delete a reprimand and anything it cascaded into
#[command(prefix_command, slash_command, guild_only)]
pub async fn delete(
    ctx: Context<'_>,
    #[description = "Reprimand id"] id: String,
    #[description = "Skip the notification"] silent: Option<bool>,
) -> Result<(), Error> {
    modify(
        ctx,
        &id,
        ReprimandStatus::Deleted,
        "[Deleted]".to_string(),
        silent.unwrap_or(false),
    )
    .await
}

/// Summarize a member's reprimand history
#[command(prefix_command, slash_command, guild_only)]
pub async fn history(
    ctx: Context<'_>,
    #[description = "Member to look up"] user: serenity::User,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let Some(service) = ctx.data().moderation() else {
        ctx.say("The moderation engine is not ready yet.").await?;
        return Ok(());
    };

    let store = service.history();
    let (guild, target) = (guild_id.get(), user.id.get());

    let counts: Vec<String> = [
        ReprimandType::Warning,
        ReprimandType::Notice,
        ReprimandType::Note,
        ReprimandType::Mute,
        ReprimandType::Ban,
        ReprimandType::Kick,
        ReprimandType::Censored,
    ]
    .into_iter()
    .map(|kind| {
        let count = store.count_active(target, guild, kind, false);
        format!("{kind}: {count}")
    })
    .collect();

    ctx.say(format!("History for {}: {}", user.name, counts.join(", ")))
        .await?;
    Ok(())
}

/// Apply a manual reprimand and report the outcome
async fn apply(
    ctx: Context<'_>,
    user: serenity::User,
    reason: String,
    kind: ReprimandKind,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let Some(service) = ctx.data().moderation() else {
        ctx.say("The moderation engine is not ready yet.").await?;
        return Ok(());
    };

    let request = ReprimandRequest::manual(
        guild_id.get(),
        user.id.get(),
        ctx.author().id.get(),
        reason,
        kind,
    );

    report(ctx, service.apply(request).await).await
}

/// Transition a reprimand's status and report the outcome
async fn modify(
    ctx: Context<'_>,
    id: &str,
    status: ReprimandStatus,
    reason: String,
    silent: bool,
) -> Result<(), Error> {
    let Some(service) = ctx.data().moderation() else {
        ctx.say("The moderation engine is not ready yet.").await?;
        return Ok(());
    };

    let Ok(id) = Uuid::parse_str(id) else {
        ctx.say("That is not a valid reprimand id.").await?;
        return Ok(());
    };

    match service
        .modify(id, status, ctx.author().id.get(), reason, silent)
        .await
    {
        Ok(record) => {
            ctx.say(format!(
                "{} `{}` is now {}.",
                record.kind.get_type(),
                record.id,
                record.status
            ))
            .await?;
        }
        Err(error) if !error.is_fatal() => {
            ctx.say(format!("Could not modify: {error}")).await?;
        }
        Err(error) => return Err(Box::new(error)),
    }
    Ok(())
}

/// Report an apply outcome as a short line
async fn report(
    ctx: Context<'_>,
    result: ModerationResult<Option<ReprimandResult>>,
) -> Result<(), Error> {
    match result {
        Ok(Some(result)) => {
            let primary = &result.primary;
            let mut line = format!(
                "{} recorded against <@{}> (`{}`).",
                primary.kind.get_type(),
                primary.user_id,
                primary.id
            );
            if let Some(secondary) = &result.secondary {
                line.push_str(&format!(
                    " Escalated to {} (`{}`).",
                    secondary.kind.get_type(),
                    secondary.id
                ));
            }
            ctx.say(line).await?;
        }
        Ok(None) => {
            ctx.say("The platform refused the action; it was recorded but not applied.")
                .await?;
        }
        Err(error) if !error.is_fatal() => {
            ctx.say(format!("Could not apply: {error}")).await?;
        }
        Err(error) => return Err(Box::new(error)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test that the moderation commands are properly defined
    #[test]
    fn test_command_definitions() {
        for (cmd, name) in [
            (ping(), "ping"),
            (warn(), "warn"),
            (notice(), "notice"),
            (note(), "note"),
            (mute(), "mute"),
            (ban(), "ban"),
            (kick(), "kick"),
            (pardon(), "pardon"),
            (update(), "update"),
            (hide(), "hide"),
            (delete(), "delete"),
            (history(), "history"),
        ] {
            assert_eq!(cmd.name, name);
            assert!(cmd.guild_only, "{name} must be guild-only");
        }
    }

    #[test]
    fn test_commands_register_as_slash_commands() {
        for cmd in [warn(), mute(), ban(), pardon(), history()] {
            assert!(cmd.create_as_slash_command().is_some());
        }
    }
}
