use chrono::Utc;
use color_eyre::Result;
use poise::serenity_prelude as serenity;

use super::{db, models::Hold};
use crate::{
    bot::{self, CommandContext},
    error::CogError,
    scanners::{um, Write},
    tbl,
    wisps::{
        general::tick,
        users::{commands as users, models::SheetKind},
    },
};

fn hold_writes(holds: &[Hold]) -> Result<Vec<Write>, CogError> {
    holds
        .iter()
        .map(|h| Ok(um::hold_write(h.sheet_col.parse()?, h.sheet_row, h.held, h.redeemed)))
        .collect()
}

fn holds_table(holds: &[Hold]) -> String {
    let mut lines = vec![vec!["System".to_owned(), "Hold".to_owned(), "Redeemed".to_owned()]];
    lines.extend(
        holds
            .iter()
            .map(|h| vec![h.system.clone(), h.held.to_string(), h.redeemed.to_string()]),
    );
    tbl::table_block(&lines)
}

/// Report merits held in an undermining system, redeem them, or lose them.
#[poise::command(slash_command)]
#[allow(clippy::too_many_arguments)]
pub async fn hold(
    ctx: CommandContext<'_>,
    #[description = "Merits now held in the system"] amount: Option<i64>,
    #[description = "The system the merits are held in"] system: Option<String>,
    #[description = "Redeem everything held"] redeem: Option<bool>,
    #[description = "Lost all held merits"] died: Option<bool>,
    #[description = "Update the system's progress as us[:them]"] set: Option<String>,
    #[description = "Report for another member"] user: Option<serenity::Member>,
) -> Result<()> {
    let bot = ctx.data();
    let duser = users::target_duser(ctx, user.as_ref()).await?;
    let _scan = bot.sheets.read(SheetKind::Undermine).await;
    let sheet = users::ensure_sheet(ctx, &duser, SheetKind::Undermine).await?;

    if died.unwrap_or(false) {
        let changed = db::reset_held(&bot.db, sheet.id).await?;
        bot::write_sheet(
            ctx,
            format!("{}'s lost merits", sheet.name),
            SheetKind::Undermine,
            hold_writes(&changed)?,
        );
        return bot::say(ctx, "Sorry to hear that. All held merits have been reset.").await;
    }

    if redeem.unwrap_or(false) {
        let (changed, total) = db::redeem(&bot.db, sheet.id).await?;
        bot::write_sheet(
            ctx,
            format!("{}'s redeemed merits", sheet.name),
            SheetKind::Undermine,
            hold_writes(&changed)?,
        );
        return bot::say(
            ctx,
            format!(
                "**Redeemed Now** {}\n\n__Cycle Summary__\n{}",
                total,
                holds_table(&db::user_holds(&bot.db, sheet.id).await?)
            ),
        )
        .await;
    }

    let (Some(amount), Some(system)) = (amount, system) else {
        return Err(CogError::invalid_args(
            "Give an amount and a system, or choose redeem or died.",
        )
        .into());
    };
    if amount < 0 {
        return Err(CogError::invalid_args("Held merits can't be negative.").into());
    }

    let mut system = db::find_system(&bot.db, &system).await?;
    let hold = db::add_hold(&bot.db, system.id, sheet.id, amount).await?;
    let mut writes = hold_writes(&[hold])?;

    if let Some(status) = set {
        system.set_status(&status)?;
        db::save_system(&bot.db, &system).await?;
        writes.extend(um::system_writes(
            system.column()?,
            system.progress_us,
            system.progress_them,
            system.map_offset,
        ));
    }
    bot::write_sheet(
        ctx,
        format!("{}'s hold in {}", sheet.name, system.name),
        SheetKind::Undermine,
        writes,
    );

    let system = db::get_system(&bot.db, system.id).await?;
    let mut msg = system.display();
    if system.is_undermined() {
        msg.push_str("\n\nSystem is finished with held merits. Type `/um` for more targets.");
    }
    bot::say(ctx, msg).await
}

/// Undermining targets, or one system's details.
#[poise::command(slash_command)]
pub async fn um(
    ctx: CommandContext<'_>,
    #[description = "Show or update this system"] system: Option<String>,
    #[description = "Update progress as us[:them]"] set: Option<String>,
    #[description = "Merits not yet on the sheet to count towards the goal"] offset: Option<i64>,
    #[description = "List everyone's held merits"] list: Option<bool>,
) -> Result<()> {
    let bot = ctx.data();
    let _scan = bot.sheets.read(SheetKind::Undermine).await;

    if list.unwrap_or(false) {
        let held = db::all_held(&bot.db).await?;
        let until = tick::until(Utc::now());
        let table = if held.is_empty() {
            "Nobody is holding merits.".to_owned()
        } else {
            tbl::table_block(&db::held_table(&held))
        };
        let deadline = tick::format_duration(until);
        return bot::say(
            ctx,
            format!("**Held Merits**\n\nDeadline: {deadline}\n\n{table}"),
        )
        .await;
    }

    let Some(system) = system else {
        let systems = db::get_systems(&bot.db, true).await?;
        if systems.is_empty() {
            return bot::say(ctx, "All undermining targets completed.").await;
        }
        let lines: Vec<String> = systems.iter().map(|s| s.display()).collect();
        return bot::say(ctx, format!("__Current UM Targets__\n\n{}", lines.join("\n"))).await;
    };

    let mut system = db::find_system(&bot.db, &system).await?;
    if set.is_some() || offset.is_some() {
        if let Some(status) = set {
            system.set_status(&status)?;
        }
        if let Some(offset) = offset {
            system.map_offset = offset;
        }
        db::save_system(&bot.db, &system).await?;
        bot::write_sheet(
            ctx,
            format!("{} progress", system.name),
            SheetKind::Undermine,
            um::system_writes(
                system.column()?,
                system.progress_us,
                system.progress_them,
                system.map_offset,
            ),
        );
        system = db::get_system(&bot.db, system.id).await?;
    }

    bot::say(ctx, system.display()).await
}
