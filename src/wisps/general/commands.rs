use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use tracing::info;

use super::tick;
use crate::{
    bot::{self, CommandContext},
    config,
    error::CogError,
    tbl,
};

const HELP: &[[&str; 2]] = &[
    ["/admin", "Admin commands"],
    ["/drop", "Drop forts into the fort sheet"],
    ["/feedback", "Give feedback or report a bug"],
    ["/fort", "Get information about our fort systems"],
    ["/hold", "Declare held merits or redeem them"],
    ["/kos", "Manage or search the kos list"],
    ["/pin", "Show the current objectives"],
    ["/status", "Info about this bot"],
    ["/time", "Show game time and time to the tick"],
    ["/um", "Get information about undermining targets"],
    ["/user", "Manage your user, set sheet name and cry"],
    ["/help", "This help message"],
];

/// An overview of the commands.
#[poise::command(slash_command)]
pub async fn help(ctx: CommandContext<'_>) -> Result<()> {
    let mut lines = vec![vec!["Command", "Effect"]];
    lines.extend(HELP.iter().map(|row| row.to_vec()));

    let text = format!(
        "Here is an overview of my commands.\n\n\
         Each command describes its options as you type it.\n{}",
        tbl::table_block(&lines)
    );
    ctx.send(|b| b.content(text).ephemeral(true)).await?;
    Ok(())
}

/// Who runs this bot and for how long it has been up.
#[poise::command(slash_command)]
pub async fn status(ctx: CommandContext<'_>) -> Result<()> {
    let uptime = tick::format_duration(Utc::now() - ctx.data().started);
    let lines = vec![
        vec!["Created By".to_owned(), "GearsandCogs".to_owned()],
        vec!["Uptime".to_owned(), uptime],
        vec!["Version".to_owned(), env!("CARGO_PKG_VERSION").to_owned()],
    ];
    bot::say(ctx, tbl::wrap_markdown(&tbl::format_table(&lines, " | ", false, false))).await
}

/// Game time and time left in the cycle.
#[poise::command(slash_command)]
pub async fn time(ctx: CommandContext<'_>) -> Result<()> {
    let now = Utc::now();
    let lines = [
        format!("Game Time: **{}**", now.format("%H:%M:%S")),
        format!("Cycle Ends in **{}**", tick::format_duration(tick::until(now))),
        "All Times UTC".to_owned(),
    ];
    bot::say(ctx, lines.join("\n")).await
}

/// Report a bug or leave feedback for the maintainers.
#[poise::command(slash_command)]
pub async fn feedback(
    ctx: CommandContext<'_>,
    #[description = "What went wrong or could be better"] report: String,
) -> Result<()> {
    let channel = config::feedback_channel()
        .ok_or_else(|| CogError::invalid_args("Feedback is not set up on this bot."))?;
    let guild = ctx.guild().ok_or(eyre!("Command run without guild"))?;
    let channel_name = ctx
        .channel_id()
        .name(&ctx.serenity_context().cache)
        .await
        .unwrap_or_else(|| ctx.channel_id().to_string());

    let lines = vec![
        vec!["Server".to_owned(), guild.name.clone()],
        vec!["Channel".to_owned(), channel_name],
        vec!["Author".to_owned(), ctx.author().name.clone()],
        vec!["Date (UTC)".to_owned(), Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()],
    ];
    let text = format!(
        "{}\n\n__Bug Report Follows__\n\n{report}",
        tbl::wrap_markdown(&tbl::format_table(&lines, " | ", false, false))
    );

    info!("{} left feedback", ctx.author().name);
    for part in tbl::split_message(&text) {
        channel.say(&ctx.serenity_context().http, part).await?;
    }
    ctx.send(|b| b.content("Thanks, your feedback has been passed on.").ephemeral(true))
        .await?;
    Ok(())
}
