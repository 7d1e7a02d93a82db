use std::path::Path;

use chrono::{DateTime, Utc};
use color_eyre::Result;
use sqlx::SqlitePool;
use tracing::info;

use super::models::{Admin, RuleKind};
use crate::error::CogError;

pub async fn get_admin(db: &SqlitePool, id: &str) -> Result<Option<Admin>> {
    Ok(sqlx::query_as(include_str!("queries/admin-get.sql"))
        .bind(id)
        .fetch_optional(db)
        .await?)
}

pub async fn admins(db: &SqlitePool) -> Result<Vec<Admin>> {
    Ok(sqlx::query_as(include_str!("queries/admin-all.sql"))
        .fetch_all(db)
        .await?)
}

pub async fn add_admin(db: &SqlitePool, id: &str, date: DateTime<Utc>) -> Result<()> {
    let added = sqlx::query(include_str!("queries/admin-insert.sql"))
        .bind(id)
        .bind(date)
        .execute(db)
        .await?
        .rows_affected();
    if added == 0 {
        return Err(CogError::invalid_args("Already an admin.").into());
    }
    info!("Added admin {id}");
    Ok(())
}

pub async fn remove_admin(db: &SqlitePool, by: &Admin, id: &str) -> Result<()> {
    let target = get_admin(db, id)
        .await?
        .ok_or_else(|| CogError::invalid_args("That member is not an admin."))?;
    if !by.can_remove(&target) {
        return Err(CogError::invalid_perms("You may only remove admins added after you.").into());
    }

    sqlx::query(include_str!("queries/admin-delete.sql"))
        .bind(id)
        .execute(db)
        .await?;
    info!("Admin {} removed admin {id}", by.id);
    Ok(())
}

/// Ids a command is restricted to in a guild. Empty means unrestricted.
pub async fn rules(
    db: &SqlitePool,
    kind: RuleKind,
    cmd: &str,
    guild_id: &str,
) -> Result<Vec<String>> {
    let query = match kind {
        RuleKind::Channel => include_str!("queries/channel-rules.sql"),
        RuleKind::Role => include_str!("queries/role-rules.sql"),
    };
    let rows: Vec<(String,)> = sqlx::query_as(query)
        .bind(cmd)
        .bind(guild_id)
        .fetch_all(db)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn add_rule(
    db: &SqlitePool,
    kind: RuleKind,
    cmd: &str,
    guild_id: &str,
    target: &str,
) -> Result<()> {
    let query = match kind {
        RuleKind::Channel => include_str!("queries/channel-rule-insert.sql"),
        RuleKind::Role => include_str!("queries/role-rule-insert.sql"),
    };
    let added = sqlx::query(query)
        .bind(cmd)
        .bind(guild_id)
        .bind(target)
        .execute(db)
        .await?
        .rows_affected();
    if added == 0 {
        return Err(CogError::invalid_args(format!("`{cmd}` already has that rule.")).into());
    }
    Ok(())
}

pub async fn remove_rule(
    db: &SqlitePool,
    kind: RuleKind,
    cmd: &str,
    guild_id: &str,
    target: &str,
) -> Result<()> {
    let query = match kind {
        RuleKind::Channel => include_str!("queries/channel-rule-delete.sql"),
        RuleKind::Role => include_str!("queries/role-rule-delete.sql"),
    };
    let removed = sqlx::query(query)
        .bind(cmd)
        .bind(guild_id)
        .bind(target)
        .execute(db)
        .await?
        .rows_affected();
    if removed == 0 {
        return Err(CogError::invalid_args(format!("`{cmd}` has no such rule.")).into());
    }
    Ok(())
}

pub async fn audit(
    db: &SqlitePool,
    cmd_str: &str,
    discord_id: &str,
    date: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(include_str!("queries/command-insert.sql"))
        .bind(cmd_str)
        .bind(date)
        .bind(discord_id)
        .execute(db)
        .await?;
    Ok(())
}

/// Copy the whole database to `path`.
pub async fn dump(db: &SqlitePool, path: &Path) -> Result<()> {
    sqlx::query(include_str!("queries/dump.sql"))
        .bind(path.to_string_lossy().into_owned())
        .execute(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn only_newer_admins_removed() {
        let db = test_pool().await;
        let now = Utc::now();
        add_admin(&db, "1", now).await.unwrap();
        add_admin(&db, "2", now + Duration::seconds(5)).await.unwrap();
        assert!(add_admin(&db, "2", now).await.is_err());

        let first = get_admin(&db, "1").await.unwrap().unwrap();
        let second = get_admin(&db, "2").await.unwrap().unwrap();

        assert!(remove_admin(&db, &second, "1").await.is_err());
        assert!(remove_admin(&db, &first, "3").await.is_err());
        remove_admin(&db, &first, "2").await.unwrap();

        let left: Vec<_> = admins(&db).await.unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(left, ["1"]);
    }

    #[tokio::test]
    async fn rules_per_guild_and_kind() {
        let db = test_pool().await;
        add_rule(&db, RuleKind::Channel, "drop", "10", "100").await.unwrap();
        add_rule(&db, RuleKind::Channel, "drop", "10", "101").await.unwrap();
        add_rule(&db, RuleKind::Role, "drop", "10", "500").await.unwrap();
        assert!(add_rule(&db, RuleKind::Channel, "drop", "10", "100").await.is_err());

        let mut channels = rules(&db, RuleKind::Channel, "drop", "10").await.unwrap();
        channels.sort();
        assert_eq!(channels, ["100", "101"]);
        assert_eq!(rules(&db, RuleKind::Role, "drop", "10").await.unwrap(), ["500"]);
        assert!(rules(&db, RuleKind::Channel, "drop", "11").await.unwrap().is_empty());
        assert!(rules(&db, RuleKind::Channel, "fort", "10").await.unwrap().is_empty());

        remove_rule(&db, RuleKind::Channel, "drop", "10", "100").await.unwrap();
        assert!(remove_rule(&db, RuleKind::Channel, "drop", "10", "100").await.is_err());
        assert_eq!(rules(&db, RuleKind::Channel, "drop", "10").await.unwrap(), ["101"]);
    }

    #[tokio::test]
    async fn commands_audited() {
        let db = test_pool().await;
        audit(&db, "/fort show", "1000", Utc::now()).await.unwrap();

        let (cmd, user): (String, String) =
            sqlx::query_as("SELECT cmd_str, discord_id FROM commands")
                .fetch_one(&db)
                .await
                .unwrap();
        assert_eq!((cmd.as_str(), user.as_str()), ("/fort show", "1000"));
    }
}
