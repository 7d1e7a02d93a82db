use chrono::Utc;
use color_eyre::Result;
use tracing::{error, info};

use super::{
    db,
    models::{Admin, RuleKind},
};
use crate::{bot::CommandContext, error::CogError};

/// Name of the command group that permission rules never apply to.
pub const ADMIN: &str = "admin";

/// Rules attach to top level commands, `fort show` is governed by `fort`.
pub fn root_name(qualified_name: &str) -> &str {
    qualified_name.split(' ').next().unwrap_or(qualified_name)
}

/// Whether rules for a command allow the channel and roles of the invoker.
pub fn check_rules(
    channel: &str,
    roles: &[String],
    channel_rules: &[String],
    role_rules: &[String],
) -> Result<(), CogError> {
    if !channel_rules.is_empty() && !channel_rules.iter().any(|c| c == channel) {
        return Err(CogError::invalid_perms(
            "The bot does not respond to that command in this channel.",
        ));
    }
    if !role_rules.is_empty() && !role_rules.iter().any(|r| roles.contains(r)) {
        return Err(CogError::invalid_perms(
            "You do not have a role that can use that command.",
        ));
    }
    Ok(())
}

/// The invoking admin. With no admins at all, the guild owner stands in so
/// the first admin can be added.
pub async fn require_admin(ctx: CommandContext<'_>) -> Result<Option<Admin>> {
    let db = &ctx.data().db;
    if let Some(admin) = db::get_admin(db, &ctx.author().id.to_string()).await? {
        return Ok(Some(admin));
    }

    let is_owner = ctx
        .guild()
        .map_or(false, |guild| guild.owner_id == ctx.author().id);
    if is_owner && db::admins(db).await?.is_empty() {
        return Ok(None);
    }

    Err(CogError::invalid_perms("Only admins can use that command.").into())
}

pub async fn command_check(ctx: CommandContext<'_>) -> Result<bool> {
    let Some(guild_id) = ctx.guild_id() else {
        return Err(CogError::invalid_perms("Commands only work inside a server.").into());
    };

    let root = root_name(&ctx.command().qualified_name);
    if root == ADMIN {
        require_admin(ctx).await?;
        return Ok(true);
    }

    let bot = ctx.data();
    if bot.is_denying() {
        return Err(CogError::invalid_perms(
            "The bot is not accepting commands right now. Please try again shortly.",
        )
        .into());
    }

    let guild = guild_id.to_string();
    let channel_rules = db::rules(&bot.db, RuleKind::Channel, root, &guild).await?;
    let role_rules = db::rules(&bot.db, RuleKind::Role, root, &guild).await?;

    let roles: Vec<String> = if role_rules.is_empty() {
        vec![]
    } else {
        ctx.author_member()
            .await
            .map(|member| member.roles.iter().map(ToString::to_string).collect())
            .unwrap_or_default()
    };

    check_rules(&ctx.channel_id().to_string(), &roles, &channel_rules, &role_rules)?;
    Ok(true)
}

/// Log and record every command before it runs.
pub async fn pre_command(ctx: CommandContext<'_>) {
    let cmd = ctx.invocation_string();
    let author = ctx.author();
    info!(
        guild = ?ctx.guild_id(),
        channel = %ctx.channel_id(),
        "{} ({}) ran {cmd}",
        author.name,
        author.id
    );

    if let Err(e) = db::audit(&ctx.data().db, &cmd, &author.id.to_string(), Utc::now()).await {
        error!("Failed to audit command {cmd}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn subcommands_share_rules() {
        assert_eq!(root_name("fort show"), "fort");
        assert_eq!(root_name("admin add channel"), ADMIN);
        assert_eq!(root_name("drop"), "drop");
    }

    #[test]
    fn no_rules_allows_all() {
        assert!(check_rules("1", &[], &[], &[]).is_ok());
    }

    #[test]
    fn channel_must_be_listed() {
        let channels = ids(&["1", "2"]);
        assert!(check_rules("2", &[], &channels, &[]).is_ok());
        assert!(matches!(
            check_rules("3", &[], &channels, &[]),
            Err(CogError::InvalidPerms(_))
        ));
    }

    #[test]
    fn one_listed_role_is_enough() {
        let roles = ids(&["10"]);
        assert!(check_rules("1", &ids(&["9", "10"]), &[], &roles).is_ok());
        assert!(check_rules("1", &ids(&["9"]), &[], &roles).is_err());
        assert!(check_rules("1", &[], &[], &roles).is_err());
    }
}
