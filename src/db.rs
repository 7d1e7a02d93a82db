use color_eyre::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::info;

pub async fn connect(path: &str) -> Result<SqlitePool> {
    let db = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true),
        )
        .await?;

    sqlx::migrate!("./migrations").run(&db).await?;
    info!("Database ready at {path}");

    Ok(db)
}

pub async fn get_setting(db: &SqlitePool, key: &str) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as(include_str!("queries/setting-get.sql"))
        .bind(key)
        .fetch_optional(db)
        .await?;
    Ok(row.map(|(value,)| value))
}

pub async fn set_setting(db: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(include_str!("queries/setting-set.sql"))
        .bind(key)
        .bind(value)
        .execute(db)
        .await?;
    Ok(())
}

#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&db).await.unwrap();
    db
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn settings_overwrite() {
        let db = test_pool().await;
        assert_eq!(get_setting(&db, "cattle.page").await.unwrap(), None);

        set_setting(&db, "cattle.page", "Cycle 159").await.unwrap();
        set_setting(&db, "cattle.page", "Cycle 160").await.unwrap();

        assert_eq!(
            get_setting(&db, "cattle.page").await.unwrap().as_deref(),
            Some("Cycle 160")
        );
    }
}
