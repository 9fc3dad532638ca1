//! Database models mapping to the metadata schema.

use sqlx::FromRow;
use time::OffsetDateTime;

/// One cached resource: a single row per distinct source URL.
///
/// The numeric `id` doubles as the blob filename. While a download is in
/// flight, `download_complete` is false and `download_finished` holds the
/// epoch-zero sentinel; both sizes become final only at finalization.
#[derive(Debug, Clone, FromRow)]
pub struct ResourceRow {
    pub id: i64,
    /// Original absolute source URL. Unique among live rows.
    pub url: String,
    /// Encoded form of `url`. Unique among live rows.
    pub key: String,
    /// Header block sent upstream when the resource was fetched.
    pub request_headers: String,
    /// Header block of the upstream response, post filtering.
    pub response_headers: String,
    pub download_started: OffsetDateTime,
    pub download_finished: OffsetDateTime,
    /// Uncompressed body length.
    pub raw_bytes: i64,
    /// Size of the compressed blob file.
    pub bytes_on_disk: i64,
    pub download_complete: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    /// Soft-delete marker; a deleted row is invisible to lookups but the
    /// row and its blob remain on disk.
    pub deleted_at: Option<OffsetDateTime>,
}

impl ResourceRow {
    /// Wall-clock duration of the download, if it has finished.
    pub fn download_duration(&self) -> Option<time::Duration> {
        self.download_complete
            .then(|| self.download_finished - self.download_started)
    }
}

/// Cache-wide status of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    /// No live row exists for this key.
    NotCached,
    /// A row exists but its fetcher has not finalized it.
    Downloading,
    /// The row is complete and servable.
    Cached,
}

/// Aggregate statistics over completed resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub record_count: u64,
    pub total_bytes_on_disk: u64,
}
