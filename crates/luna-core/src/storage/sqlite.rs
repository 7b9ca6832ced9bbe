use super::kv::KeyValueStore;
use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

fn now_ts() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

const MIGRATE: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key         TEXT    PRIMARY KEY,
    value       TEXT    NOT NULL,
    updated_at  INTEGER NOT NULL
);
"#;

/// `KeyValueStore` backed by a single SQLite file (`~/.luna/luna.db` by default).
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePool::connect(&url).await?;
        sqlx::query(MIGRATE).execute(&pool).await?;
        debug!(path = %db_path.display(), "kv store opened");
        Ok(Self { pool })
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        let updated_at = now_ts();
        let mut tx = self.pool.begin().await?;
        for (key, value) in entries {
            sqlx::query(
                "INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )
            .bind(*key)
            .bind(*value)
            .bind(updated_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        debug!(count = entries.len(), "kv entries written");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.try_get::<String, _>("value").map_err(Into::into))
            .transpose()
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_is_created_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("sub").join("luna.db"))
            .await
            .expect("open store");
        assert!(store.get("lastPeriodDate").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_overwrites_existing_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("luna.db")).await.unwrap();

        store
            .set_many(&[("lastPeriodDate", "2025-01-01"), ("cycleLength", "28")])
            .await
            .unwrap();
        store.set_many(&[("cycleLength", "30")]).await.unwrap();

        assert_eq!(store.get("cycleLength").await.unwrap().as_deref(), Some("30"));
        assert_eq!(
            store.get("lastPeriodDate").await.unwrap().as_deref(),
            Some("2025-01-01")
        );
    }

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("luna.db");

        {
            let store = SqliteStore::open(&path).await.unwrap();
            store
                .set_many(&[("lastPeriodDate", "2025-01-01")])
                .await
                .unwrap();
            store.pool.close().await;
        }

        let reopened = SqliteStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get("lastPeriodDate").await.unwrap().as_deref(),
            Some("2025-01-01")
        );
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("luna.db")).await.unwrap();

        store.set_many(&[("a", "1")]).await.unwrap();
        store.delete("a").await.unwrap();
        store.delete("never-set").await.unwrap();

        assert!(store.get("a").await.unwrap().is_none());
    }
}
