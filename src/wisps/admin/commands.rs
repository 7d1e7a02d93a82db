use std::time::Duration;

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use super::{
    checks::{self, ADMIN},
    db,
    models::RuleKind,
};
use crate::{
    bot::CommandContext,
    error::CogError,
    wisps::users,
};

const HALT_WAIT: Duration = Duration::from_secs(60);

#[poise::command(
    slash_command,
    subcommands("add", "remove", "cast", "deny", "dump", "halt", "scan", "cycle", "info")
)]
#[allow(clippy::unused_async)]
pub async fn admin(_ctx: CommandContext<'_>) -> Result<()> {
    Ok(())
}

#[poise::command(slash_command, subcommands("add_member", "add_channel", "add_role"))]
#[allow(clippy::unused_async)]
pub async fn add(_ctx: CommandContext<'_>) -> Result<()> {
    Ok(())
}

#[poise::command(slash_command, subcommands("remove_member", "remove_channel", "remove_role"))]
#[allow(clippy::unused_async)]
pub async fn remove(_ctx: CommandContext<'_>) -> Result<()> {
    Ok(())
}

/// Command names that rules may be attached to.
fn check_rule_target(ctx: CommandContext<'_>, cmd: &str) -> Result<(), CogError> {
    if cmd == ADMIN {
        return Err(CogError::invalid_args("The admin command cannot be restricted."));
    }
    let known = ctx
        .framework()
        .options()
        .commands
        .iter()
        .any(|c| c.name == cmd);
    if !known {
        return Err(CogError::invalid_args(format!("There is no `{cmd}` command.")));
    }
    Ok(())
}

fn guild_key(ctx: CommandContext<'_>) -> Result<String> {
    Ok(ctx
        .guild_id()
        .ok_or(eyre!("Command run without guild"))?
        .to_string())
}

/// Make a member an admin.
#[poise::command(slash_command, rename = "member")]
pub async fn add_member(
    ctx: CommandContext<'_>,
    #[description = "The member to promote"] user: serenity::User,
) -> Result<()> {
    db::add_admin(&ctx.data().db, &user.id.to_string(), Utc::now()).await?;
    ctx.say(format!("{} is now an admin.", serenity::Mention::from(user.id)))
        .await?;
    Ok(())
}

/// Remove an admin added after you.
#[poise::command(slash_command, rename = "member")]
pub async fn remove_member(
    ctx: CommandContext<'_>,
    #[description = "The admin to remove"] user: serenity::User,
) -> Result<()> {
    let me = checks::require_admin(ctx)
        .await?
        .ok_or_else(|| CogError::invalid_perms("Add yourself as an admin first."))?;

    db::remove_admin(&ctx.data().db, &me, &user.id.to_string()).await?;
    ctx.say(format!("{} is no longer an admin.", serenity::Mention::from(user.id)))
        .await?;
    Ok(())
}

/// Only respond to a command in the given channel (and any others added).
#[poise::command(slash_command, rename = "channel")]
pub async fn add_channel(
    ctx: CommandContext<'_>,
    #[description = "The command to restrict"] command: String,
    #[description = "A channel it may be used in"] channel: serenity::GuildChannel,
) -> Result<()> {
    check_rule_target(ctx, &command)?;
    db::add_rule(
        &ctx.data().db,
        RuleKind::Channel,
        &command,
        &guild_key(ctx)?,
        &channel.id.to_string(),
    )
    .await?;
    ctx.say(format!("`{command}` now works in {}.", serenity::Mention::from(channel.id)))
        .await?;
    Ok(())
}

#[poise::command(slash_command, rename = "channel")]
pub async fn remove_channel(
    ctx: CommandContext<'_>,
    #[description = "The restricted command"] command: String,
    #[description = "The channel to drop from its rules"] channel: serenity::GuildChannel,
) -> Result<()> {
    db::remove_rule(
        &ctx.data().db,
        RuleKind::Channel,
        &command,
        &guild_key(ctx)?,
        &channel.id.to_string(),
    )
    .await?;
    ctx.say(format!("`{command}` is no longer tied to {}.", serenity::Mention::from(channel.id)))
        .await?;
    Ok(())
}

/// Only let members with the given role (or any others added) use a command.
#[poise::command(slash_command, rename = "role")]
pub async fn add_role(
    ctx: CommandContext<'_>,
    #[description = "The command to restrict"] command: String,
    #[description = "A role allowed to use it"] role: serenity::Role,
) -> Result<()> {
    check_rule_target(ctx, &command)?;
    db::add_rule(
        &ctx.data().db,
        RuleKind::Role,
        &command,
        &guild_key(ctx)?,
        &role.id.to_string(),
    )
    .await?;
    ctx.say(format!("`{command}` can now be used by {}.", role.name))
        .await?;
    Ok(())
}

#[poise::command(slash_command, rename = "role")]
pub async fn remove_role(
    ctx: CommandContext<'_>,
    #[description = "The restricted command"] command: String,
    #[description = "The role to drop from its rules"] role: serenity::Role,
) -> Result<()> {
    db::remove_rule(
        &ctx.data().db,
        RuleKind::Role,
        &command,
        &guild_key(ctx)?,
        &role.id.to_string(),
    )
    .await?;
    ctx.say(format!("`{command}` is no longer tied to {}.", role.name))
        .await?;
    Ok(())
}

/// Send a message to every text channel the bot can post in.
#[poise::command(slash_command)]
pub async fn cast(
    ctx: CommandContext<'_>,
    #[description = "What to broadcast"] message: String,
) -> Result<()> {
    let guild = ctx.guild().ok_or(eyre!("Command run without guild"))?;
    let http = &ctx.serenity_context().http;

    let mut sent = 0;
    for channel in guild.channels.values() {
        let serenity::Channel::Guild(channel) = channel else { continue };
        if channel.kind != serenity::ChannelType::Text {
            continue;
        }
        match channel.say(http, &message).await {
            Ok(_) => sent += 1,
            Err(e) => warn!("Could not broadcast to {}: {e}", channel.name),
        }
    }

    ctx.say(format!("Broadcast to {sent} channels.")).await?;
    Ok(())
}

/// Toggle deny mode, where only admin commands are accepted.
#[poise::command(slash_command)]
pub async fn deny(ctx: CommandContext<'_>) -> Result<()> {
    let bot = ctx.data();
    let denying = !bot.is_denying();
    bot.set_deny(denying);
    info!("Deny mode set to {denying} by {}", ctx.author().name);

    let state = if denying { "ignoring" } else { "accepting" };
    ctx.say(format!("The bot is now {state} commands.")).await?;
    Ok(())
}

/// Copy the database to a temporary file on the bot's host.
#[poise::command(slash_command)]
pub async fn dump(ctx: CommandContext<'_>) -> Result<()> {
    let stamp = Utc::now().format("%Y%m%d-%H%M%S");
    let path = std::env::temp_dir().join(format!("cog-dump-{stamp}.db"));
    db::dump(&ctx.data().db, &path).await?;
    info!("Database dumped to {}", path.display());

    ctx.say(format!("Database dumped to `{}`.", path.display()))
        .await?;
    Ok(())
}

/// Stop taking commands, let sheet writes finish, then shut down.
#[poise::command(slash_command)]
pub async fn halt(ctx: CommandContext<'_>) -> Result<()> {
    let bot = ctx.data();
    bot.set_deny(true);

    let pending = bot.writes.pending();
    ctx.say(format!(
        "Shutting down once {pending} pending sheet updates are done (at most {}s).",
        HALT_WAIT.as_secs()
    ))
    .await?;

    if !bot.writes.wait_idle(HALT_WAIT).await {
        warn!("Halting with {} sheet updates unfinished", bot.writes.pending());
    }

    info!("Halted by {}", ctx.author().name);
    ctx.say("Goodbye.").await?;
    ctx.framework()
        .shard_manager()
        .lock()
        .await
        .shutdown_all()
        .await;
    Ok(())
}

/// Rescan every sheet now.
#[poise::command(slash_command)]
pub async fn scan(ctx: CommandContext<'_>) -> Result<()> {
    ctx.defer().await?;
    ctx.data().scan_all().await?;
    ctx.say("All sheets scanned.").await?;
    Ok(())
}

/// Move the fort and undermining sheets on to the next cycle's pages.
#[poise::command(slash_command)]
pub async fn cycle(ctx: CommandContext<'_>) -> Result<()> {
    ctx.defer().await?;
    let bot = ctx.data();
    let pages = bot.sheets.cycle(&bot.db).await?;
    ctx.say(format!(
        "Cycle incremented, now reading: {}",
        pages.join(", ")
    ))
    .await?;
    Ok(())
}

/// Have the bot message you the details of a member.
#[poise::command(slash_command)]
pub async fn info(
    ctx: CommandContext<'_>,
    #[description = "The member to look up"] member: serenity::Member,
) -> Result<()> {
    let guild = ctx.guild().ok_or(eyre!("Command run without guild"))?;
    let roles = member
        .roles
        .iter()
        .filter_map(|id| guild.roles.get(id).map(|role| role.name.clone()))
        .collect::<Vec<_>>()
        .join(", ");
    let joined = member
        .joined_at
        .map_or_else(|| "unknown".to_owned(), |at| at.to_string());

    let mut lines = vec![
        format!("**{}**", member.display_name()),
        format!("Username: {}", member.user.tag()),
        format!("Id: {}", member.user.id),
        format!("Joined: {joined}"),
        format!("Roles: {roles}"),
    ];
    if let Some(duser) = users::db::get_duser(&ctx.data().db, &member.user.id.to_string()).await? {
        lines.push(format!("Sheet name: {}", duser.pref_name));
        lines.push(format!("Faction: {}", duser.faction));
    }

    ctx.author()
        .direct_message(ctx.serenity_context(), |m| m.content(lines.join("\n")))
        .await?;
    ctx.send(|b| b.content("Sent you the details.").ephemeral(true))
        .await?;
    Ok(())
}
