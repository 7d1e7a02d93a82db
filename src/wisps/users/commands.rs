use color_eyre::Result;
use poise::serenity_prelude as serenity;

use super::{
    db,
    models::{DiscordUser, SheetKind, SheetUser},
};
use crate::{
    bot::{self, CommandContext},
    error::CogError,
    scanners, tbl,
    wisps::{fort, undermine},
};

/// The invoker, or `member` when acting for someone else.
pub async fn target_duser(
    ctx: CommandContext<'_>,
    member: Option<&serenity::Member>,
) -> Result<DiscordUser> {
    let (id, name) = match member {
        Some(member) => (member.user.id, member.display_name().to_string()),
        None => {
            let name = ctx
                .author_member()
                .await
                .map_or_else(|| ctx.author().name.clone(), |m| m.display_name().to_string());
            (ctx.author().id, name)
        }
    };
    db::ensure_duser(&ctx.data().db, &id.to_string(), &name).await
}

/// The user's row on a sheet, adding one at the bottom if they have none.
/// Callers hold the sheet's scan lock.
pub async fn ensure_sheet(
    ctx: CommandContext<'_>,
    duser: &DiscordUser,
    kind: SheetKind,
) -> Result<SheetUser> {
    let bot = ctx.data();
    if let Some(sheet) = db::get_sheet(&bot.db, duser, kind).await? {
        return Ok(sheet);
    }

    let sheet = db::add_sheet(&bot.db, duser, kind).await?;
    let (col, _) = db::anchor(&bot.db, kind).await?;
    bot::write_sheet(
        ctx,
        format!("adding {} to the {kind} sheet", sheet.name),
        kind,
        vec![scanners::user_write(col, sheet.sheet_row, &sheet.cry, &sheet.name)?],
    );
    bot::say(
        ctx,
        format!("Will automatically add {} to the {kind} sheet.", sheet.name),
    )
    .await?;

    Ok(sheet)
}

async fn sheet_summary(ctx: CommandContext<'_>, sheet: &SheetUser) -> Result<String> {
    let db = &ctx.data().db;
    let summary = match sheet.kind {
        SheetKind::Cattle => {
            let merits = fort::db::user_merits(db, sheet.id).await?;
            let total: i64 = merits.iter().map(|m| m.amount).sum();
            let mut lines = vec![vec!["System".to_owned(), "Amount".to_owned()]];
            lines.extend(
                merits
                    .iter()
                    .map(|m| vec![m.system.clone(), m.amount.to_string()]),
            );
            format!("    Dropped: {total}\n{}", tbl::table_block(&lines))
        }
        SheetKind::Undermine => {
            let holds = undermine::db::user_holds(db, sheet.id).await?;
            let held: i64 = holds.iter().map(|h| h.held).sum();
            let redeemed: i64 = holds.iter().map(|h| h.redeemed).sum();
            let mut lines = vec![vec![
                "System".to_owned(),
                "Hold".to_owned(),
                "Redeemed".to_owned(),
            ]];
            lines.extend(
                holds
                    .iter()
                    .map(|h| vec![h.system.clone(), h.held.to_string(), h.redeemed.to_string()]),
            );
            format!(
                "    Holding {held}, Redeemed {redeemed}\n{}",
                tbl::table_block(&lines)
            )
        }
    };
    Ok(format!("**{} Sheet**\n{summary}", sheet.kind))
}

/// Show or change the name and battle cry used for you on the sheets.
#[poise::command(slash_command)]
pub async fn user(
    ctx: CommandContext<'_>,
    #[description = "The name to use on the sheets"] name: Option<String>,
    #[description = "Your battle cry"] cry: Option<String>,
) -> Result<()> {
    let bot = ctx.data();
    let mut duser = target_duser(ctx, None).await?;
    // renames touch rows of both sheets, always fort first
    let _fort_scan = bot.sheets.read(SheetKind::Cattle).await;
    let _um_scan = bot.sheets.read(SheetKind::Undermine).await;

    if name.is_some() || cry.is_some() {
        let new_name = name.map_or_else(|| duser.pref_name.clone(), |n| n.trim().to_owned());
        let new_cry = cry.map_or_else(|| duser.pref_cry.clone(), |c| c.trim().to_owned());
        if new_name.is_empty() {
            return Err(CogError::invalid_args("Your sheet name can't be blank.").into());
        }

        db::check_pref_name(&bot.db, &duser, &new_name).await?;
        duser = db::update_pref(&bot.db, &duser, &new_name, &new_cry).await?;

        for sheet in db::sheets(&bot.db, &duser).await? {
            let (col, _) = db::anchor(&bot.db, sheet.kind).await?;
            bot::write_sheet(
                ctx,
                format!("renaming {} on the {} sheet", sheet.name, sheet.kind),
                sheet.kind,
                vec![scanners::user_write(col, sheet.sheet_row, &sheet.cry, &sheet.name)?],
            );
        }
    }

    let mut msg = format!(
        "__{}__\nSheet Name: {}\nDefault Cry: {}\n",
        duser.display_name,
        duser.pref_name,
        if duser.pref_cry.is_empty() { "None" } else { duser.pref_cry.as_str() }
    );
    for sheet in db::sheets(&bot.db, &duser).await? {
        msg.push('\n');
        msg.push_str(&sheet_summary(ctx, &sheet).await?);
    }

    bot::say(ctx, msg).await
}
