use color_eyre::Result;
use sqlx::SqlitePool;

use super::models::KosEntry;

/// Replace the whole list with a fresh scan.
pub async fn replace_all(db: &SqlitePool, entries: &[KosEntry]) -> Result<()> {
    let mut tx = db.begin().await?;

    sqlx::query(include_str!("queries/kos-clear.sql"))
        .execute(&mut tx)
        .await?;
    for entry in entries {
        sqlx::query(include_str!("queries/kos-insert.sql"))
            .bind(&entry.cmdr)
            .bind(&entry.faction)
            .bind(entry.danger)
            .bind(entry.friendly)
            .execute(&mut tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// `term` with LIKE wildcards taken literally.
fn like_literal(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Commanders whose name contains `term`, ignoring case.
pub async fn search(db: &SqlitePool, term: &str) -> Result<Vec<KosEntry>> {
    Ok(sqlx::query_as(include_str!("queries/kos-search.sql"))
        .bind(like_literal(term.trim()))
        .fetch_all(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn entry(cmdr: &str, faction: &str, danger: i64, friendly: bool) -> KosEntry {
        KosEntry {
            cmdr: cmdr.to_owned(),
            faction: faction.to_owned(),
            danger,
            friendly,
        }
    }

    #[tokio::test]
    async fn search_ignores_case() {
        let db = test_pool().await;
        replace_all(
            &db,
            &[
                entry("Bad Guy", "Winters", 3, false),
                entry("good guy", "Hudson", 0, true),
                entry("Someone", "Mahon", 1, false),
            ],
        )
        .await
        .unwrap();

        let found = search(&db, "GUY").await.unwrap();
        let names: Vec<_> = found.iter().map(|e| e.cmdr.as_str()).collect();
        assert_eq!(names, ["Bad Guy", "good guy"]);
        assert!(found[1].friendly);
        assert!(search(&db, "nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn wildcards_match_literally() {
        let db = test_pool().await;
        replace_all(
            &db,
            &[
                entry("100%_pure", "Winters", 3, false),
                entry("1000 pure", "Winters", 1, false),
                entry("back\\slash", "Mahon", 0, false),
            ],
        )
        .await
        .unwrap();

        let names = |found: Vec<KosEntry>| found.into_iter().map(|e| e.cmdr).collect::<Vec<_>>();
        assert_eq!(names(search(&db, "%_").await.unwrap()), ["100%_pure"]);
        assert_eq!(names(search(&db, "0_p").await.unwrap()), Vec::<String>::new());
        assert_eq!(names(search(&db, "k\\s").await.unwrap()), ["back\\slash"]);
    }

    #[tokio::test]
    async fn rescan_replaces_list() {
        let db = test_pool().await;
        replace_all(&db, &[entry("Old", "Winters", 2, false)])
            .await
            .unwrap();
        replace_all(
            &db,
            &[entry("New", "Winters", 1, false), entry("New", "Hudson", 0, true)],
        )
        .await
        .unwrap();

        assert!(search(&db, "old").await.unwrap().is_empty());
        assert_eq!(
            search(&db, "new").await.unwrap(),
            [entry("New", "Hudson", 0, true)]
        );
    }
}
