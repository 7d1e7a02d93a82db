use std::collections::HashMap;

use color_eyre::Result;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;

use super::models::{DiscordUser, Faction, SheetKind, SheetUser};
use crate::{db, error::CogError, scanners::SheetRow, sheets::Column};

pub async fn get_duser(db: &SqlitePool, id: &str) -> Result<Option<DiscordUser>> {
    Ok(sqlx::query_as(include_str!("queries/duser-get.sql"))
        .bind(id)
        .fetch_optional(db)
        .await?)
}

async fn duser_by_pref(db: &SqlitePool, name: &str) -> Result<Option<DiscordUser>> {
    Ok(sqlx::query_as(include_str!("queries/duser-by-pref.sql"))
        .bind(name)
        .fetch_optional(db)
        .await?)
}

/// Fetch the user, registering them under their display name on first use.
pub async fn ensure_duser(db: &SqlitePool, id: &str, display_name: &str) -> Result<DiscordUser> {
    if let Some(duser) = get_duser(db, id).await? {
        return Ok(duser);
    }

    if let Some(other) = duser_by_pref(db, display_name).await? {
        return Err(CogError::invalid_args(format!(
            "The sheet name `{display_name}` is taken by {}. Pick your own with `/user name`.",
            other.display_name
        ))
        .into());
    }

    info!("Registering new user {display_name} ({id})");
    sqlx::query(include_str!("queries/duser-insert.sql"))
        .bind(id)
        .bind(display_name)
        .bind(display_name)
        .execute(db)
        .await?;

    Ok(DiscordUser {
        id: id.to_owned(),
        display_name: display_name.to_owned(),
        pref_name: display_name.to_owned(),
        pref_cry: String::new(),
        faction: Faction::Hudson,
    })
}

/// A new sheet name must not belong to someone else, on Discord or a sheet.
pub async fn check_pref_name(db: &SqlitePool, duser: &DiscordUser, name: &str) -> Result<()> {
    if let Some(other) = duser_by_pref(db, name).await? {
        if other.id != duser.id {
            return Err(CogError::invalid_args(format!(
                "Sheet name {name}, taken by {}.\n\nPlease choose another.",
                other.display_name
            ))
            .into());
        }
    }

    let (taken,): (i64,) = sqlx::query_as(include_str!("queries/suser-name-taken.sql"))
        .bind(name)
        .fetch_one(db)
        .await?;
    if taken > 0 && name != duser.pref_name {
        return Err(CogError::invalid_args(format!(
            "Sheet name {name}, already in a sheet. Please choose another."
        ))
        .into());
    }

    Ok(())
}

/// Change a user's sheet name and cry, along with every sheet row they own.
pub async fn update_pref(
    db: &SqlitePool,
    duser: &DiscordUser,
    name: &str,
    cry: &str,
) -> Result<DiscordUser> {
    let mut tx = db.begin().await?;

    sqlx::query(include_str!("queries/suser-rename.sql"))
        .bind(name)
        .bind(cry)
        .bind(&duser.pref_name)
        .bind(duser.faction)
        .execute(&mut tx)
        .await?;
    sqlx::query(include_str!("queries/duser-update.sql"))
        .bind(&duser.display_name)
        .bind(name)
        .bind(cry)
        .bind(&duser.id)
        .execute(&mut tx)
        .await?;

    tx.commit().await?;

    Ok(DiscordUser {
        pref_name: name.to_owned(),
        pref_cry: cry.to_owned(),
        ..duser.clone()
    })
}

/// Every sheet row carrying the user's name.
pub async fn sheets(db: &SqlitePool, duser: &DiscordUser) -> Result<Vec<SheetUser>> {
    Ok(sqlx::query_as(include_str!("queries/suser-named.sql"))
        .bind(&duser.pref_name)
        .bind(duser.faction)
        .fetch_all(db)
        .await?)
}

pub async fn get_sheet(
    db: &SqlitePool,
    duser: &DiscordUser,
    kind: SheetKind,
) -> Result<Option<SheetUser>> {
    Ok(sqlx::query_as(include_str!("queries/suser-get.sql"))
        .bind(&duser.pref_name)
        .bind(duser.faction)
        .bind(kind)
        .fetch_optional(db)
        .await?)
}

/// Where names are listed on a sheet: the column and the first row.
pub async fn anchor(db: &SqlitePool, kind: SheetKind) -> Result<(Column, i64)> {
    let (default_col, default_row) = kind.default_anchor();
    let col = match db::get_setting(db, &format!("{}.user_col", kind.key())).await? {
        Some(col) => col.parse()?,
        None => default_col,
    };
    let row = match db::get_setting(db, &format!("{}.user_row", kind.key())).await? {
        Some(row) => row.parse()?,
        None => default_row,
    };
    Ok((col, row))
}

pub async fn save_anchor(db: &SqlitePool, kind: SheetKind, col: Column, row: i64) -> Result<()> {
    db::set_setting(db, &format!("{}.user_col", kind.key()), &col.to_string()).await?;
    db::set_setting(db, &format!("{}.user_row", kind.key()), &row.to_string()).await
}

/// Give the user a row on the sheet, after the last one in use.
pub async fn add_sheet(db: &SqlitePool, duser: &DiscordUser, kind: SheetKind) -> Result<SheetUser> {
    let (_, first_row) = anchor(db, kind).await?;
    let (last,): (Option<i64>,) = sqlx::query_as(include_str!("queries/suser-last-row.sql"))
        .bind(kind)
        .fetch_one(db)
        .await?;
    let row = last.map_or(first_row, |last| last + 1);

    info!("Adding {} to the {kind} sheet at row {row}", duser.pref_name);
    Ok(sqlx::query_as(include_str!("queries/suser-insert.sql"))
        .bind(kind)
        .bind(duser.faction)
        .bind(&duser.pref_name)
        .bind(&duser.pref_cry)
        .bind(row)
        .fetch_one(db)
        .await?)
}

/// Replace the rows of one sheet inside a scan. Returns ids by name.
pub async fn replace_sheet_users(
    tx: &mut Transaction<'_, Sqlite>,
    kind: SheetKind,
    rows: &[SheetRow],
) -> Result<HashMap<String, i64>> {
    sqlx::query(include_str!("queries/suser-clear.sql"))
        .bind(kind)
        .execute(&mut *tx)
        .await?;

    let mut ids = HashMap::with_capacity(rows.len());
    for row in rows {
        if ids.contains_key(&row.name) {
            continue;
        }
        let user: SheetUser = sqlx::query_as(include_str!("queries/suser-insert.sql"))
            .bind(kind)
            .bind(Faction::Hudson)
            .bind(&row.name)
            .bind(&row.cry)
            .bind(row.row)
            .fetch_one(&mut *tx)
            .await?;
        ids.insert(user.name, user.id);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn registers_once() {
        let db = test_pool().await;
        let first = ensure_duser(&db, "1000", "Gears").await.unwrap();
        assert_eq!(first.pref_name, "Gears");

        let again = ensure_duser(&db, "1000", "Renamed On Discord").await.unwrap();
        assert_eq!(again, first);
    }

    #[tokio::test]
    async fn display_name_clash() {
        let db = test_pool().await;
        ensure_duser(&db, "1000", "Gears").await.unwrap();
        assert!(ensure_duser(&db, "2000", "Gears").await.is_err());
    }

    #[tokio::test]
    async fn sheet_rows_follow_name_changes() {
        let db = test_pool().await;
        let duser = ensure_duser(&db, "1000", "Gears").await.unwrap();

        let cattle = add_sheet(&db, &duser, SheetKind::Cattle).await.unwrap();
        assert_eq!(cattle.sheet_row, 11);
        let again = add_sheet(
            &db,
            &ensure_duser(&db, "2000", "Toliman").await.unwrap(),
            SheetKind::Cattle,
        )
        .await
        .unwrap();
        assert_eq!(again.sheet_row, 12);
        add_sheet(&db, &duser, SheetKind::Undermine).await.unwrap();

        check_pref_name(&db, &duser, "GearsAndCogs").await.unwrap();
        let duser = update_pref(&db, &duser, "GearsAndCogs", "Cogs turn").await.unwrap();

        let rows = sheets(&db, &duser).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.name == "GearsAndCogs" && r.cry == "Cogs turn"));
        assert_eq!(rows[0].kind, SheetKind::Cattle);
        assert_eq!(
            get_duser(&db, "1000").await.unwrap().unwrap().pref_name,
            "GearsAndCogs"
        );
    }

    #[tokio::test]
    async fn names_already_on_sheets_are_refused() {
        let db = test_pool().await;
        let gears = ensure_duser(&db, "1000", "Gears").await.unwrap();
        let toliman = ensure_duser(&db, "2000", "Toliman").await.unwrap();
        add_sheet(&db, &toliman, SheetKind::Cattle).await.unwrap();

        assert!(check_pref_name(&db, &gears, "Toliman").await.is_err());
        assert!(check_pref_name(&db, &toliman, "Toliman").await.is_ok());
    }

    #[tokio::test]
    async fn anchors_default_and_persist() {
        let db = test_pool().await;
        let (col, row) = anchor(&db, SheetKind::Undermine).await.unwrap();
        assert_eq!((col.to_string().as_str(), row), ("B", 14));

        save_anchor(&db, SheetKind::Cattle, "C".parse().unwrap(), 9).await.unwrap();
        let (col, row) = anchor(&db, SheetKind::Cattle).await.unwrap();
        assert_eq!((col.to_string().as_str(), row), ("C", 9));
    }
}
