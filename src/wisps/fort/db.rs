use std::collections::HashMap;

use color_eyre::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::models::{Merit, System};
use crate::{
    error::CogError,
    fuzzy,
    scanners::fort::FortScan,
    wisps::users::{self, models::SheetKind},
};

/// Replace every system, commander row and merit with a fresh scan.
pub async fn replace_sheet(db: &SqlitePool, scan: &FortScan) -> Result<()> {
    let mut tx = db.begin().await?;

    sqlx::query(include_str!("queries/merit-clear.sql"))
        .execute(&mut tx)
        .await?;
    sqlx::query(include_str!("queries/system-clear.sql"))
        .execute(&mut tx)
        .await?;
    let user_ids = users::db::replace_sheet_users(&mut tx, SheetKind::Cattle, &scan.users).await?;

    let mut system_ids = HashMap::with_capacity(scan.systems.len());
    for system in &scan.systems {
        let (id,): (i64,) = sqlx::query_as(include_str!("queries/system-insert.sql"))
            .bind(&system.name)
            .bind(system.cmdr_merits)
            .bind(system.fort_status)
            .bind(system.trigger)
            .bind(system.um_status)
            .bind(system.undermine)
            .bind(system.distance)
            .bind(&system.notes)
            .bind(&system.sheet_col)
            .bind(system.sheet_order)
            .fetch_one(&mut tx)
            .await?;
        system_ids.insert(system.name.as_str(), id);
    }

    for merit in &scan.merits {
        let (Some(system_id), Some(user_id)) = (
            system_ids.get(merit.system.as_str()),
            user_ids.get(&merit.user),
        ) else {
            warn!("Dropping merit of {} for unknown {}", merit.user, merit.system);
            continue;
        };
        sqlx::query(include_str!("queries/merit-insert.sql"))
            .bind(merit.amount)
            .bind(system_id)
            .bind(user_id)
            .execute(&mut tx)
            .await?;
    }

    tx.commit().await?;
    users::db::save_anchor(db, SheetKind::Cattle, scan.user_col, scan.first_row).await
}

/// Every system in sheet order.
pub async fn get_systems(db: &SqlitePool) -> Result<Vec<System>> {
    Ok(sqlx::query_as(include_str!("queries/system-all.sql"))
        .fetch_all(db)
        .await?)
}

pub async fn get_system(db: &SqlitePool, id: i64) -> Result<System> {
    Ok(sqlx::query_as(include_str!("queries/system-get.sql"))
        .bind(id)
        .fetch_one(db)
        .await?)
}

/// Exact name regardless of case, otherwise a unique fuzzy match.
pub async fn find_system(db: &SqlitePool, name: &str) -> Result<System> {
    let exact: Option<System> = sqlx::query_as(include_str!("queries/system-by-name.sql"))
        .bind(name.trim())
        .fetch_optional(db)
        .await?;
    if let Some(system) = exact {
        return Ok(system);
    }

    let systems = get_systems(db).await?;
    Ok(fuzzy::fuzzy_find(name.trim(), &systems, |s| s.name.as_str())?.clone())
}

/// Record supplies delivered by a commander. Returns the updated system and
/// the commander's total for it.
pub async fn add_drop(
    db: &SqlitePool,
    system_id: i64,
    user_id: i64,
    amount: i64,
) -> Result<(System, i64)> {
    let mut tx = db.begin().await?;

    let (total,): (i64,) = sqlx::query_as(include_str!("queries/merit-add.sql"))
        .bind(amount)
        .bind(system_id)
        .bind(user_id)
        .fetch_one(&mut tx)
        .await?;
    sqlx::query(include_str!("queries/system-add-drop.sql"))
        .bind(amount)
        .bind(system_id)
        .execute(&mut tx)
        .await?;
    let system: System = sqlx::query_as(include_str!("queries/system-get.sql"))
        .bind(system_id)
        .fetch_one(&mut tx)
        .await?;

    tx.commit().await?;
    Ok((system, total))
}

pub async fn save_status(db: &SqlitePool, system: &System) -> Result<()> {
    sqlx::query(include_str!("queries/system-save-status.sql"))
        .bind(system.fort_status)
        .bind(system.um_status)
        .bind(system.id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn system_merits(db: &SqlitePool, system_id: i64) -> Result<Vec<Merit>> {
    Ok(sqlx::query_as(include_str!("queries/merit-by-system.sql"))
        .bind(system_id)
        .fetch_all(db)
        .await?)
}

pub async fn user_merits(db: &SqlitePool, user_id: i64) -> Result<Vec<Merit>> {
    Ok(sqlx::query_as(include_str!("queries/merit-by-user.sql"))
        .bind(user_id)
        .fetch_all(db)
        .await?)
}

pub async fn order_get(db: &SqlitePool) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(include_str!("queries/order-get.sql"))
        .fetch_all(db)
        .await?;
    Ok(rows.into_iter().map(|(name,)| name).collect())
}

/// Replace the manual order. Each name must match a known system.
pub async fn order_set(db: &SqlitePool, names: &[&str]) -> Result<Vec<String>> {
    let mut resolved: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let system = find_system(db, name).await?;
        if resolved.contains(&system.name) {
            return Err(CogError::invalid_args(format!(
                "`{}` appears more than once in the order.",
                system.name
            ))
            .into());
        }
        resolved.push(system.name);
    }

    let mut tx = db.begin().await?;
    sqlx::query(include_str!("queries/order-clear.sql"))
        .execute(&mut tx)
        .await?;
    for (position, name) in (1_i64..).zip(&resolved) {
        sqlx::query(include_str!("queries/order-insert.sql"))
            .bind(position)
            .bind(name)
            .execute(&mut tx)
            .await?;
    }
    tx.commit().await?;

    info!("Manual fort order set to {resolved:?}");
    Ok(resolved)
}

pub async fn order_drop(db: &SqlitePool) -> Result<()> {
    sqlx::query(include_str!("queries/order-clear.sql"))
        .execute(db)
        .await?;
    info!("Manual fort order cleared");
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use sqlx::SqlitePool;

    use crate::scanners::fort::{
        self,
        fixtures::{cells, formatted},
    };

    /// A database holding the sample cattle sheet.
    pub async fn scanned(db: &SqlitePool) {
        let scan = fort::parse(&cells(), &formatted()).unwrap();
        super::replace_sheet(db, &scan).await.unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::scanned;
    use super::*;
    use crate::{db::test_pool, wisps::fort::targets};

    #[tokio::test]
    async fn scan_is_mirrored() {
        let db = test_pool().await;
        scanned(&db).await;
        // a second scan replaces rather than duplicates
        scanned(&db).await;

        let systems = get_systems(&db).await.unwrap();
        assert_eq!(systems.len(), 7);
        assert_eq!(systems[0].name, "Frey");

        let frey = find_system(&db, "frey").await.unwrap();
        let merits = system_merits(&db, frey.id).await.unwrap();
        assert_eq!(merits[0].user, "Toliman");
        assert_eq!(merits[0].amount, 2222);
        assert_eq!(merits[0].sheet_row, 12);

        let (col, row) = users::db::anchor(&db, SheetKind::Cattle).await.unwrap();
        assert_eq!((col.to_string().as_str(), row), ("B", 11));
    }

    #[tokio::test]
    async fn targets_from_scan() {
        let db = test_pool().await;
        scanned(&db).await;
        let systems = get_systems(&db).await.unwrap();

        let found = targets::targets(&systems, &[]).unwrap();
        let names: Vec<_> = found.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Nurundere", "Othime"]);

        let next = targets::next_targets(&systems, &[], 3);
        let names: Vec<_> = next.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["LHS 3749", "Dongkum", "Alpha Fornacis"]);
    }

    #[tokio::test]
    async fn fuzzy_and_missing_names() {
        let db = test_pool().await;
        scanned(&db).await;

        assert_eq!(find_system(&db, "alp").await.unwrap().name, "Alpha Fornacis");
        assert_eq!(find_system(&db, "LHS 3749").await.unwrap().name, "LHS 3749");
        assert!(find_system(&db, "zzzz").await.is_err());
    }

    #[tokio::test]
    async fn drops_accumulate() {
        let db = test_pool().await;
        scanned(&db).await;
        let frey = find_system(&db, "Frey").await.unwrap();
        let user_id =
            sqlx::query_as::<_, (i64,)>("SELECT id FROM sheet_users WHERE name = 'Toliman'")
            .fetch_one(&db)
            .await
            .unwrap()
            .0;

        let (system, total) = add_drop(&db, frey.id, user_id, 100).await.unwrap();
        assert_eq!(total, 2322);
        assert_eq!(system.fort_status, frey.fort_status + 100);
        assert_eq!(system.cmdr_merits, frey.cmdr_merits + 100);

        let nurundere = find_system(&db, "Nurundere").await.unwrap();
        let (_, total) = add_drop(&db, nurundere.id, user_id, 50).await.unwrap();
        assert_eq!(total, 280);

        let mine = user_merits(&db, user_id).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].system, "Frey");
    }

    #[tokio::test]
    async fn status_saved() {
        let db = test_pool().await;
        scanned(&db).await;
        let mut sol = find_system(&db, "Sol").await.unwrap();
        sol.set_status("5000:1200").unwrap();
        save_status(&db, &sol).await.unwrap();

        let sol = get_system(&db, sol.id).await.unwrap();
        assert_eq!((sol.fort_status, sol.um_status), (5000, 1200));
    }

    #[tokio::test]
    async fn manual_order() {
        let db = test_pool().await;
        scanned(&db).await;

        let order = order_set(&db, &["dongkum", "alpha"]).await.unwrap();
        assert_eq!(order, ["Dongkum", "Alpha Fornacis"]);
        assert_eq!(order_get(&db).await.unwrap(), order);
        assert!(order_set(&db, &["dongkum", "Dongkum"]).await.is_err());

        order_drop(&db).await.unwrap();
        assert!(order_get(&db).await.unwrap().is_empty());
    }
}
