use color_eyre::Result;
use tracing::info;

use super::db;
use crate::{
    bot::{self, CommandContext},
    scanners, tbl,
};

#[poise::command(slash_command, subcommands("report", "search", "pull"))]
#[allow(clippy::unused_async)]
pub async fn kos(_ctx: CommandContext<'_>) -> Result<()> {
    Ok(())
}

/// Report a commander for the moderators to review.
#[poise::command(slash_command)]
pub async fn report(
    ctx: CommandContext<'_>,
    #[description = "The commander to report"] cmdr: String,
    #[description = "Why they should be on the list"] reason: String,
) -> Result<()> {
    let reporter = ctx.author().name.clone();
    scanners::kos::report(&ctx.data().sheets.kos_reports, &reporter, &cmdr, &reason).await?;
    info!("{reporter} reported {cmdr} for kos");

    bot::say(ctx, format!("CMDR {cmdr} has been reported for moderation.")).await
}

/// Search the list for commanders by part of their name.
#[poise::command(slash_command)]
pub async fn search(
    ctx: CommandContext<'_>,
    #[description = "Part of a commander's name"] term: String,
) -> Result<()> {
    let found = db::search(&ctx.data().db, &term).await?;

    let mut msg = format!("Searching for \"{term}\" against known CMDRs\n\n");
    if found.is_empty() {
        msg.push_str("No matches!");
    } else {
        let mut lines = vec![["CMDR Name", "Faction", "Danger", "Is Friendly?"]
            .map(str::to_owned)
            .to_vec()];
        lines.extend(found.iter().map(|e| e.table_row()));
        msg.push_str(&tbl::table_block(&lines));
    }
    bot::say(ctx, msg).await
}

/// Refresh the list from its sheet.
#[poise::command(slash_command)]
pub async fn pull(ctx: CommandContext<'_>) -> Result<()> {
    ctx.defer().await?;
    let bot = ctx.data();
    bot.sheets.scan_kos(&bot.db).await?;

    bot::say(ctx, "KOS list refreshed from sheet.").await
}
