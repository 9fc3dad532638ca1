//! Metadata store trait and the SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{CacheStats, ResourceRow, ResourceStatus};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;

/// Durable index of cached resources.
///
/// All operations are independently serializable; `try_claim` is the
/// atomic primitive the cross-process single-flight protocol is built on
/// and must hold unconditionally for concurrent callers, whether they
/// share this process or only the database file.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;

    /// Report whether a key is uncached, mid-download, or servable.
    async fn status_by_key(&self, key: &str) -> MetadataResult<ResourceStatus>;

    /// Atomically insert a stub row for a URL, claiming the exclusive
    /// right to fetch it. Returns the new row id, or `None` if a live
    /// row with the same key or URL already exists (in which case there
    /// is no side effect and the caller lost the race).
    async fn try_claim(
        &self,
        url: &str,
        key: &str,
        request_headers: &str,
        now: OffsetDateTime,
    ) -> MetadataResult<Option<i64>>;

    /// Fetch the completed record for a key.
    ///
    /// Fails with [`MetadataError::NotFound`] when no live row exists and
    /// [`MetadataError::NotReady`] while the row's download is in flight.
    async fn get_completed(&self, key: &str) -> MetadataResult<ResourceRow>;

    /// Finalize a claimed row after its blob writer has closed: store the
    /// response headers and final sizes, stamp `download_finished`, and
    /// flip `download_complete`.
    async fn finalize_claim(
        &self,
        id: i64,
        response_headers: &str,
        raw_bytes: i64,
        bytes_on_disk: i64,
        now: OffsetDateTime,
    ) -> MetadataResult<()>;

    /// Aggregate count and disk usage over completed live rows.
    async fn stats(&self) -> MetadataResult<CacheStats>;

    /// List live rows ordered by `download_started` descending.
    async fn list(&self, offset: i64, limit: i64) -> MetadataResult<Vec<ResourceRow>>;

    /// Soft-delete a row. The row and its blob remain on disk but become
    /// invisible to every lookup.
    async fn soft_delete(&self, id: i64, now: OffsetDateTime) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store, running migrations.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MetadataError::Internal(format!(
                    "failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))
            .map_err(MetadataError::Database)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors when several
            // instances share the database file.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection
            // per instance avoids persistent "database is locked" failures.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS resources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                key TEXT NOT NULL,
                request_headers TEXT NOT NULL DEFAULT '',
                response_headers TEXT NOT NULL DEFAULT '',
                download_started TIMESTAMP NOT NULL,
                download_finished TIMESTAMP NOT NULL,
                raw_bytes INTEGER NOT NULL DEFAULT 0,
                bytes_on_disk INTEGER NOT NULL DEFAULT 0,
                download_complete INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL,
                deleted_at TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Uniqueness applies to live rows only; soft-deleted rows keep
        // their key so the blob on disk stays attributable.
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_resources_key
             ON resources(key) WHERE deleted_at IS NULL",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_resources_url
             ON resources(url) WHERE deleted_at IS NULL",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_resources_started
             ON resources(download_started DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn status_by_key(&self, key: &str) -> MetadataResult<ResourceStatus> {
        let complete: Option<bool> = sqlx::query_scalar(
            "SELECT download_complete FROM resources WHERE key = ? AND deleted_at IS NULL",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match complete {
            None => ResourceStatus::NotCached,
            Some(false) => ResourceStatus::Downloading,
            Some(true) => ResourceStatus::Cached,
        })
    }

    async fn try_claim(
        &self,
        url: &str,
        key: &str,
        request_headers: &str,
        now: OffsetDateTime,
    ) -> MetadataResult<Option<i64>> {
        // The check and insert must be one atomic statement: the partial
        // unique indexes on key and url reject a second live row, and
        // DO NOTHING turns that rejection into rows_affected = 0.
        let result = sqlx::query(
            r#"
            INSERT INTO resources (
                url, key, request_headers, response_headers,
                download_started, download_finished,
                raw_bytes, bytes_on_disk, download_complete,
                created_at, updated_at
            ) VALUES (?, ?, ?, '', ?, ?, 0, 0, 0, ?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(url)
        .bind(key)
        .bind(request_headers)
        .bind(now)
        .bind(OffsetDateTime::UNIX_EPOCH)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(result.last_insert_rowid()))
    }

    async fn get_completed(&self, key: &str) -> MetadataResult<ResourceRow> {
        let row = sqlx::query_as::<_, ResourceRow>(
            "SELECT * FROM resources WHERE key = ? AND deleted_at IS NULL",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| MetadataError::NotFound(format!("no resource for key {key}")))?;

        if !row.download_complete {
            return Err(MetadataError::NotReady(format!(
                "resource {} is still downloading",
                row.id
            )));
        }
        Ok(row)
    }

    async fn finalize_claim(
        &self,
        id: i64,
        response_headers: &str,
        raw_bytes: i64,
        bytes_on_disk: i64,
        now: OffsetDateTime,
    ) -> MetadataResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE resources
            SET response_headers = ?, raw_bytes = ?, bytes_on_disk = ?,
                download_finished = ?, download_complete = 1, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(response_headers)
        .bind(raw_bytes)
        .bind(bytes_on_disk)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!("resource id {id} not found")));
        }
        Ok(())
    }

    async fn stats(&self) -> MetadataResult<CacheStats> {
        let (count, bytes): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(bytes_on_disk), 0) FROM resources
             WHERE download_complete = 1 AND deleted_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(CacheStats {
            record_count: count as u64,
            total_bytes_on_disk: bytes as u64,
        })
    }

    async fn list(&self, offset: i64, limit: i64) -> MetadataResult<Vec<ResourceRow>> {
        let rows = sqlx::query_as::<_, ResourceRow>(
            "SELECT * FROM resources WHERE deleted_at IS NULL
             ORDER BY download_started DESC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn soft_delete(&self, id: i64, now: OffsetDateTime) -> MetadataResult<()> {
        let result = sqlx::query(
            "UPDATE resources SET deleted_at = ?, updated_at = ?
             WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!("resource id {id} not found")));
        }
        Ok(())
    }
}
