use color_eyre::Result;

use crate::bot::{self, JobContext};

pub async fn rescan(ctx: JobContext) -> Result<()> {
    ctx.sheets.scan_all(&ctx.db).await?;
    bot::lift_initial_deny(&ctx.unscanned, &ctx.deny);
    Ok(())
}
