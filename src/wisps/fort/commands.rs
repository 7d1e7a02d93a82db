use color_eyre::Result;
use poise::serenity_prelude as serenity;

use super::{
    db,
    models::{System, SystemStates, OTHIME},
    targets,
};
use crate::{
    bot::{self, CommandContext},
    error::CogError,
    scanners::fort::{drop_write, system_write},
    tbl,
    wisps::users::{commands as users, models::SheetKind},
};

const MAX_DROP: i64 = 800;

fn lines(systems: &[&System]) -> String {
    systems
        .iter()
        .map(|s| s.display())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Thank the top contributors of a finished system and point at the next.
async fn finished(ctx: CommandContext<'_>, display_name: &str, system: &System) -> Result<String> {
    let bot = ctx.data();
    let systems = db::get_systems(&bot.db).await?;
    let order = db::order_get(&bot.db).await?;

    let mut msg = match targets::targets(&systems, &order) {
        Ok(found) => format!("\n\n__Next Fort Target__:\n{}", found[0].display()),
        Err(_) => "\n\nCould not determine next fort target.".to_owned(),
    };

    msg.push_str(&format!(
        "\n\n**{display_name}** Have a :cookie: for completing {}",
        system.name
    ));
    let merits = db::system_merits(&bot.db, system.id).await?;
    match merits.first() {
        Some(top) => {
            msg.push_str("\nBonus for highest contribution:");
            for merit in merits.iter().take_while(|m| m.amount == top.amount) {
                msg.push_str(&format!(
                    "\n    :cookie: for **{}** with {} supplies",
                    merit.user, merit.amount
                ));
            }
        }
        None => msg.push_str(
            "\nNo found contributions. Heres a :cookie: for the unknown commanders.",
        ),
    }
    Ok(msg)
}

/// Record supplies delivered to a fort system.
#[poise::command(slash_command)]
pub async fn drop(
    ctx: CommandContext<'_>,
    #[description = "Supplies delivered"] amount: i64,
    #[description = "The system delivered to"] system: String,
    #[description = "Also set the system's status as fort[:um]"] set: Option<String>,
    #[description = "Deliver for another member"] user: Option<serenity::Member>,
) -> Result<()> {
    if !(-MAX_DROP..=MAX_DROP).contains(&amount) {
        return Err(CogError::invalid_args(format!(
            "Drop amount must be between -{MAX_DROP} and {MAX_DROP}."
        ))
        .into());
    }

    let bot = ctx.data();
    let duser = users::target_duser(ctx, user.as_ref()).await?;
    let _scan = bot.sheets.read(SheetKind::Cattle).await;
    let sheet = users::ensure_sheet(ctx, &duser, SheetKind::Cattle).await?;
    let system = db::find_system(&bot.db, &system).await?;

    let (mut system, total) = db::add_drop(&bot.db, system.id, sheet.id, amount).await?;
    if let Some(status) = set {
        system.set_status(&status)?;
        db::save_status(&bot.db, &system).await?;
    }
    tracing::info!(
        "{} dropped {amount} at {} ({total} total)",
        sheet.name,
        system.name
    );

    let col = system.column()?;
    bot::write_sheet(
        ctx,
        format!("{}'s drop at {}", sheet.name, system.name),
        SheetKind::Cattle,
        vec![
            drop_write(col, sheet.sheet_row, total),
            system_write(col, system.fort_status, system.um_status),
        ],
    );

    let mut msg = system.display();
    if system.is_fortified() {
        msg.push_str(&finished(ctx, &duser.display_name, &system).await?);
    }
    bot::say(ctx, msg).await
}

#[poise::command(
    slash_command,
    subcommands("show", "summary", "set", "miss", "details", "order", "search", "next")
)]
#[allow(clippy::unused_async)]
pub async fn fort(_ctx: CommandContext<'_>) -> Result<()> {
    Ok(())
}

/// Current targets, what comes next and what is almost done.
#[poise::command(slash_command)]
pub async fn show(ctx: CommandContext<'_>) -> Result<()> {
    let bot = ctx.data();
    let _scan = bot.sheets.read(SheetKind::Cattle).await;
    let systems = db::get_systems(&bot.db).await?;
    let order = db::order_get(&bot.db).await?;

    let mut msg = format!(
        "__Active Targets__\n{}",
        lines(&targets::targets(&systems, &order)?)
    );
    let next = targets::next_targets(&systems, &order, 3);
    if !next.is_empty() {
        msg.push_str(&format!("\n\n__Next Targets__\n{}", lines(&next)));
    }
    let deferred: Vec<&System> = targets::deferred(&systems)
        .into_iter()
        .filter(|s| s.name != OTHIME)
        .collect();
    if !deferred.is_empty() {
        msg.push_str(&format!("\n\n__Almost Done__\n{}", lines(&deferred)));
    }

    bot::say(ctx, msg).await
}

/// How many systems are in each state.
#[poise::command(slash_command)]
pub async fn summary(ctx: CommandContext<'_>) -> Result<()> {
    let bot = ctx.data();
    let _scan = bot.sheets.read(SheetKind::Cattle).await;
    let systems = db::get_systems(&bot.db).await?;
    let states = SystemStates::from_systems(&systems);

    let counts = [
        states.cancelled.len(),
        states.fortified.len(),
        states.undermined.len(),
        states.skipped.len(),
        states.left.len(),
    ];
    let table = vec![
        vec!["Cancelled", "Fortified", "Undermined", "Skipped", "Left", "Total"]
            .into_iter()
            .map(str::to_owned)
            .collect(),
        counts
            .iter()
            .chain(std::iter::once(&systems.len()))
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
    ];
    bot::say(ctx, tbl::wrap_markdown(&tbl::format_table(&table, " | ", true, true))).await
}

/// Correct a system's status as fort[:um].
#[poise::command(slash_command)]
pub async fn set(
    ctx: CommandContext<'_>,
    #[description = "The system to update"] system: String,
    #[description = "New status as fort[:um]"] status: String,
) -> Result<()> {
    let bot = ctx.data();
    let _scan = bot.sheets.read(SheetKind::Cattle).await;
    let mut system = db::find_system(&bot.db, &system).await?;
    system.set_status(&status)?;
    db::save_status(&bot.db, &system).await?;

    bot::write_sheet(
        ctx,
        format!("status of {}", system.name),
        SheetKind::Cattle,
        vec![system_write(system.column()?, system.fort_status, system.um_status)],
    );
    bot::say(ctx, system.display()).await
}

/// Unfinished systems needing at most some more supplies.
#[poise::command(slash_command)]
pub async fn miss(
    ctx: CommandContext<'_>,
    #[description = "Most supplies still missing"] limit: i64,
) -> Result<()> {
    let bot = ctx.data();
    let _scan = bot.sheets.read(SheetKind::Cattle).await;
    let systems = db::get_systems(&bot.db).await?;
    let found = targets::missing_at_most(&systems, limit);

    let msg = if found.is_empty() {
        format!("No systems missing {limit} supplies or less.")
    } else {
        format!(
            "__Systems Missing {limit} Supplies__\n{}",
            lines(&found)
        )
    };
    bot::say(ctx, msg).await
}

/// Everything known about one system, with who delivered there.
#[poise::command(slash_command)]
pub async fn details(
    ctx: CommandContext<'_>,
    #[description = "The system"] system: String,
) -> Result<()> {
    let bot = ctx.data();
    let _scan = bot.sheets.read(SheetKind::Cattle).await;
    let system = db::find_system(&bot.db, &system).await?;
    let merits = db::system_merits(&bot.db, system.id).await?;

    let mut msg = system.display_details();
    if !merits.is_empty() {
        let mut table = vec![vec!["CMDR".to_owned(), "Merits".to_owned()]];
        table.extend(
            merits
                .iter()
                .map(|m| vec![m.user.clone(), m.amount.to_string()]),
        );
        msg.push_str(&format!("\n{}", tbl::table_block(&table)));
    }
    bot::say(ctx, msg).await
}

/// Set a manual fort order as comma separated systems, or clear it.
#[poise::command(slash_command)]
pub async fn order(
    ctx: CommandContext<'_>,
    #[description = "Systems in order, comma separated. Leave empty to clear."]
    systems: Option<String>,
) -> Result<()> {
    let bot = ctx.data();
    let db = &bot.db;
    let _scan = bot.sheets.read(SheetKind::Cattle).await;
    let Some(systems) = systems else {
        db::order_drop(db).await?;
        return bot::say(ctx, "Fort order has been manually cleared.").await;
    };

    let names: Vec<&str> = systems
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if names.is_empty() {
        return Err(CogError::invalid_args("List at least one system.").into());
    }
    db::order_set(db, &names).await?;

    let all = db::get_systems(db).await?;
    let order = db::order_get(db).await?;
    bot::say(
        ctx,
        format!(
            "Fort order now:\n\n{}",
            lines(&targets::targets(&all, &order)?)
        ),
    )
    .await
}

/// Look up several systems at once, comma separated.
#[poise::command(slash_command)]
pub async fn search(
    ctx: CommandContext<'_>,
    #[description = "Systems to look up, comma separated"] systems: String,
) -> Result<()> {
    let bot = ctx.data();
    let db = &bot.db;
    let _scan = bot.sheets.read(SheetKind::Cattle).await;
    let mut found = vec![];
    for name in systems.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        found.push(db::find_system(db, name).await?);
    }
    if found.is_empty() {
        return Err(CogError::invalid_args("List at least one system.").into());
    }

    bot::say(ctx, lines(&found.iter().collect::<Vec<_>>())).await
}

/// The systems to work on after the current targets.
#[poise::command(slash_command)]
pub async fn next(
    ctx: CommandContext<'_>,
    #[description = "How many systems"]
    #[min = 1]
    #[max = 20]
    count: Option<u32>,
) -> Result<()> {
    let bot = ctx.data();
    let _scan = bot.sheets.read(SheetKind::Cattle).await;
    let systems = db::get_systems(&bot.db).await?;
    let order = db::order_get(&bot.db).await?;

    let count = count.map_or(5, |c| c as usize);
    let next = targets::next_targets(&systems, &order, count);
    if next.is_empty() {
        return Err(CogError::NoMoreTargets.into());
    }
    bot::say(ctx, format!("__Next Targets__\n{}", lines(&next))).await
}

/// The objectives to pin for the cycle.
#[poise::command(slash_command)]
pub async fn pin(ctx: CommandContext<'_>) -> Result<()> {
    let bot = ctx.data();
    let _scan = bot.sheets.read(SheetKind::Cattle).await;
    let systems = db::get_systems(&bot.db).await?;
    let order = db::order_get(&bot.db).await?;

    let mut found = targets::targets(&systems, &order)?;
    found.reverse();
    found.extend(targets::next_targets(&systems, &order, 5));
    found.extend(
        targets::deferred(&systems)
            .into_iter()
            .filter(|s| s.name != OTHIME),
    );

    let mut lines: Vec<String> = found
        .iter()
        .map(|s| {
            if s.notes.is_empty() {
                format!(":Fortifying: {}", s.name)
            } else {
                format!(":Fortifying: {} **{}**", s.name, s.notes)
            }
        })
        .collect();
    lines.push(":Fortifying: The things in the list after that".to_owned());

    bot::say(ctx, tbl::wrap_markdown(&lines.join("\n"))).await
}
