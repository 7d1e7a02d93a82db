use std::collections::HashMap;

use color_eyre::Result;
use itertools::Itertools;
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::models::{Hold, UmSystem};
use crate::{
    fuzzy,
    scanners::um::UmScan,
    wisps::users::{self, models::SheetKind},
};

/// Replace every undermining system, commander row and hold with a scan.
pub async fn replace_sheet(db: &SqlitePool, scan: &UmScan) -> Result<()> {
    let mut tx = db.begin().await?;

    sqlx::query(include_str!("queries/hold-clear.sql"))
        .execute(&mut tx)
        .await?;
    sqlx::query(include_str!("queries/system-clear.sql"))
        .execute(&mut tx)
        .await?;
    let user_ids =
        users::db::replace_sheet_users(&mut tx, SheetKind::Undermine, &scan.users).await?;

    let mut system_ids = HashMap::with_capacity(scan.systems.len());
    for system in &scan.systems {
        let (id,): (i64,) = sqlx::query_as(include_str!("queries/system-insert.sql"))
            .bind(&system.name)
            .bind(system.kind)
            .bind(&system.sheet_col)
            .bind(system.goal)
            .bind(&system.security)
            .bind(&system.notes)
            .bind(&system.close_control)
            .bind(system.progress_us)
            .bind(system.progress_them)
            .bind(system.map_offset)
            .fetch_one(&mut tx)
            .await?;
        system_ids.insert(system.name.as_str(), id);
    }

    for hold in &scan.holds {
        let (Some(system_id), Some(user_id)) = (
            system_ids.get(hold.system.as_str()),
            user_ids.get(&hold.user),
        ) else {
            warn!("Dropping hold of {} for unknown {}", hold.user, hold.system);
            continue;
        };
        sqlx::query(include_str!("queries/hold-insert.sql"))
            .bind(hold.held)
            .bind(hold.redeemed)
            .bind(system_id)
            .bind(user_id)
            .execute(&mut tx)
            .await?;
    }

    tx.commit().await?;

    if let Some(first) = scan.users.first() {
        let (col, _) = SheetKind::Undermine.default_anchor();
        users::db::save_anchor(db, SheetKind::Undermine, col, first.row).await?;
    }
    Ok(())
}

/// Systems in sheet order, optionally leaving out those already finished.
pub async fn get_systems(db: &SqlitePool, exclude_finished: bool) -> Result<Vec<UmSystem>> {
    let systems: Vec<UmSystem> = sqlx::query_as(include_str!("queries/system-all.sql"))
        .fetch_all(db)
        .await?;
    Ok(systems
        .into_iter()
        .filter(|s| !exclude_finished || !s.is_undermined())
        .collect())
}

pub async fn get_system(db: &SqlitePool, id: i64) -> Result<UmSystem> {
    Ok(sqlx::query_as(include_str!("queries/system-get.sql"))
        .bind(id)
        .fetch_one(db)
        .await?)
}

pub async fn find_system(db: &SqlitePool, name: &str) -> Result<UmSystem> {
    let exact: Option<UmSystem> = sqlx::query_as(include_str!("queries/system-by-name.sql"))
        .bind(name.trim())
        .fetch_optional(db)
        .await?;
    if let Some(system) = exact {
        return Ok(system);
    }

    let systems = get_systems(db, false).await?;
    Ok(fuzzy::fuzzy_find(name.trim(), &systems, |s| s.name.as_str())?.clone())
}

pub async fn save_system(db: &SqlitePool, system: &UmSystem) -> Result<()> {
    sqlx::query(include_str!("queries/system-save.sql"))
        .bind(system.progress_us)
        .bind(system.progress_them)
        .bind(system.map_offset)
        .bind(system.id)
        .execute(db)
        .await?;
    Ok(())
}

/// Set the merits a commander holds in a system. Redeemed merits are kept.
pub async fn add_hold(db: &SqlitePool, system_id: i64, user_id: i64, held: i64) -> Result<Hold> {
    let mut tx = db.begin().await?;
    sqlx::query(include_str!("queries/hold-set.sql"))
        .bind(held)
        .bind(system_id)
        .bind(user_id)
        .execute(&mut tx)
        .await?;
    let hold = sqlx::query_as(include_str!("queries/hold-get.sql"))
        .bind(system_id)
        .bind(user_id)
        .fetch_one(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(hold)
}

pub async fn user_holds(db: &SqlitePool, user_id: i64) -> Result<Vec<Hold>> {
    Ok(sqlx::query_as(include_str!("queries/hold-by-user.sql"))
        .bind(user_id)
        .fetch_all(db)
        .await?)
}

/// Lost held merits, e.g. on death. Returns the rows that changed.
pub async fn reset_held(db: &SqlitePool, user_id: i64) -> Result<Vec<Hold>> {
    let changed: Vec<String> = user_holds(db, user_id)
        .await?
        .into_iter()
        .filter(|h| h.held > 0)
        .map(|h| h.system)
        .collect();

    sqlx::query(include_str!("queries/hold-reset.sql"))
        .bind(user_id)
        .execute(db)
        .await?;

    Ok(user_holds(db, user_id)
        .await?
        .into_iter()
        .filter(|h| changed.contains(&h.system))
        .collect())
}

/// Move everything held to redeemed. Returns the rows that changed and the
/// commander's redeemed total.
pub async fn redeem(db: &SqlitePool, user_id: i64) -> Result<(Vec<Hold>, i64)> {
    let changed: Vec<String> = user_holds(db, user_id)
        .await?
        .into_iter()
        .filter(|h| h.held > 0)
        .map(|h| h.system)
        .collect();

    sqlx::query(include_str!("queries/hold-redeem.sql"))
        .bind(user_id)
        .execute(db)
        .await?;

    let holds = user_holds(db, user_id).await?;
    let total = holds.iter().map(|h| h.redeemed).sum();
    info!("User {user_id} redeemed in {} systems, {total} total", changed.len());
    Ok((
        holds
            .into_iter()
            .filter(|h| changed.contains(&h.system))
            .collect(),
        total,
    ))
}

pub async fn all_held(db: &SqlitePool) -> Result<Vec<Hold>> {
    Ok(sqlx::query_as(include_str!("queries/hold-all-held.sql"))
        .fetch_all(db)
        .await?)
}

/// One row per commander, one column per system anyone holds merits in.
pub fn held_table(holds: &[Hold]) -> Vec<Vec<String>> {
    let systems: Vec<&str> = holds.iter().map(|h| h.system.as_str()).unique().collect();

    let mut header = vec!["CMDR".to_owned()];
    header.extend(systems.iter().map(|s| (*s).to_owned()));
    let mut lines = vec![header];

    for (user, group) in &holds.iter().group_by(|h| h.user.as_str()) {
        let group: Vec<&Hold> = group.collect();
        let mut line = vec![user.to_owned()];
        line.extend(systems.iter().map(|system| {
            group
                .iter()
                .find(|h| h.system == *system)
                .map_or_else(|| "0".to_owned(), |h| h.held.to_string())
        }));
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::test_pool, scanners::um};

    async fn scanned() -> SqlitePool {
        let db = test_pool().await;
        let scan = um::parse(&um::fixtures::cells());
        replace_sheet(&db, &scan).await.unwrap();
        db
    }

    async fn user_id(db: &SqlitePool, name: &str) -> i64 {
        sqlx::query_as::<_, (i64,)>(
            "SELECT id FROM sheet_users WHERE name = ? AND kind = 'undermine'",
        )
            .bind(name)
            .fetch_one(db)
            .await
            .unwrap()
            .0
    }

    #[tokio::test]
    async fn merits_summed_per_system() {
        let db = scanned().await;
        let systems = get_systems(&db, false).await.unwrap();
        let names: Vec<_> = systems.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Burr", "Muncheim"]);
        assert_eq!(systems[0].cmdr_merits, 1700);
        assert_eq!(systems[1].cmdr_merits, 0);

        assert_eq!(find_system(&db, "munch").await.unwrap().name, "Muncheim");
    }

    #[tokio::test]
    async fn finished_systems_excluded() {
        let db = scanned().await;
        let mut burr = find_system(&db, "burr").await.unwrap();
        burr.set_status("10000").unwrap();
        save_system(&db, &burr).await.unwrap();

        assert!(get_system(&db, burr.id).await.unwrap().is_undermined());
        let left = get_systems(&db, true).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].name, "Muncheim");
    }

    #[tokio::test]
    async fn hold_then_redeem() {
        let db = scanned().await;
        let alice = user_id(&db, "Alice").await;
        let burr = find_system(&db, "Burr").await.unwrap();
        let muncheim = find_system(&db, "Muncheim").await.unwrap();

        let hold = add_hold(&db, burr.id, alice, 750).await.unwrap();
        assert_eq!((hold.held, hold.redeemed), (750, 1000));
        add_hold(&db, muncheim.id, alice, 300).await.unwrap();

        let held = all_held(&db).await.unwrap();
        assert_eq!(
            held_table(&held),
            vec![
                vec!["CMDR", "Burr", "Muncheim"],
                vec!["Alice", "750", "300"],
            ]
        );

        let (changed, total) = redeem(&db, alice).await.unwrap();
        assert_eq!(changed.len(), 2);
        assert_eq!(total, 2050);
        assert!(all_held(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn death_clears_held_only() {
        let db = scanned().await;
        let alice = user_id(&db, "Alice").await;

        let changed = reset_held(&db, alice).await.unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!((changed[0].held, changed[0].redeemed), (0, 1000));
        assert!(reset_held(&db, alice).await.unwrap().is_empty());
    }
}
