use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Executor, Pool, Row, Sqlite, Transaction,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
    time::Duration,
};
use tokio::sync::{watch, Mutex};

use shared::domain::ItemId;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://./data/feed.db";

/// Local feed store backed by SQLite.
///
/// Every mutation reads the `feed_items` table inside its own transaction and,
/// once the commit succeeds, publishes that ordered snapshot to all receivers
/// returned by [`Storage::observe_feed_items`]. Mutations hold `write_lock`
/// until their snapshot is published, so receivers observe snapshots in commit
/// order.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
    snapshot: Arc<watch::Sender<Vec<StoredFeedItem>>>,
    write_lock: Arc<Mutex<()>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFeedItem {
    pub id: ItemId,
    pub thumbnail_path: String,
    pub is_premium: bool,
}

impl StoredFeedItem {
    pub fn new(id: ItemId, thumbnail_path: impl Into<String>, is_premium: bool) -> Self {
        Self {
            id,
            thumbnail_path: thumbnail_path.into(),
            is_premium,
        }
    }
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool_options = if is_in_memory(database_url) {
            // Each in-memory connection is a separate database.
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open sqlite database '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run feed store migrations")?;

        let initial = select_feed_items(&pool).await?;
        let (snapshot, _) = watch::channel(initial);
        Ok(Self {
            pool,
            snapshot: Arc::new(snapshot),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Inserts rows, replacing any existing row with the same id.
    pub async fn insert_feed_items(&self, items: &[StoredFeedItem]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        insert_rows(&mut tx, items).await?;
        self.commit_and_publish(tx, "insert").await
    }

    pub async fn delete_all_feed_items(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        delete_rows(&mut tx).await?;
        self.commit_and_publish(tx, "delete").await
    }

    /// Swaps the whole table content for `items` in a single transaction.
    ///
    /// Either every old row is gone and every new row is present, or (on any
    /// error) the table and the published snapshot are left untouched.
    pub async fn replace_feed_items(&self, items: &[StoredFeedItem]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        delete_rows(&mut tx).await?;
        insert_rows(&mut tx, items).await?;
        self.commit_and_publish(tx, "replace").await
    }

    pub async fn list_feed_items(&self) -> Result<Vec<StoredFeedItem>> {
        select_feed_items(&self.pool).await
    }

    pub async fn count_feed_items(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(id) FROM feed_items")
            .fetch_one(&self.pool)
            .await
            .context("failed to count feed items")?;
        Ok(count)
    }

    /// Live view of the table. The receiver already holds the current rows.
    pub fn observe_feed_items(&self) -> watch::Receiver<Vec<StoredFeedItem>> {
        self.snapshot.subscribe()
    }

    async fn commit_and_publish(&self, mut tx: Transaction<'_, Sqlite>, op: &str) -> Result<()> {
        let rows = select_feed_items(&mut *tx).await?;
        tx.commit()
            .await
            .with_context(|| format!("failed to commit feed item {op}"))?;
        self.snapshot.send_replace(rows);
        Ok(())
    }
}

async fn insert_rows(tx: &mut Transaction<'_, Sqlite>, items: &[StoredFeedItem]) -> Result<()> {
    for item in items {
        sqlx::query(
            "INSERT OR REPLACE INTO feed_items (id, thumbnail_path, is_premium) VALUES (?, ?, ?)",
        )
        .bind(item.id.as_str())
        .bind(&item.thumbnail_path)
        .bind(item.is_premium)
        .execute(&mut **tx)
        .await
        .with_context(|| format!("failed to insert feed item '{}'", item.id))?;
    }
    Ok(())
}

async fn delete_rows(tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
    sqlx::query("DELETE FROM feed_items")
        .execute(&mut **tx)
        .await
        .context("failed to clear feed items")?;
    Ok(())
}

async fn select_feed_items<'e, E>(executor: E) -> Result<Vec<StoredFeedItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query("SELECT id, thumbnail_path, is_premium FROM feed_items ORDER BY rowid")
        .fetch_all(executor)
        .await
        .context("failed to query feed items")?;
    Ok(rows
        .into_iter()
        .map(|row| StoredFeedItem {
            id: ItemId(row.get::<String, _>("id")),
            thumbnail_path: row.get::<String, _>("thumbnail_path"),
            is_premium: row.get::<bool, _>("is_premium"),
        })
        .collect())
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_in_memory(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
