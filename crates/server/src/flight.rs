//! Single-flight coordination over the metadata index.
//!
//! The at-most-one-fetch-per-URL guarantee rests entirely on
//! [`MetadataStore::try_claim`]: the unique index on the key plus an
//! atomic insert-or-ignore decides the race, across every request and
//! every instance sharing the database file. Losers (and any caller that
//! observes an in-flight download) poll for the finalized record with
//! exponential backoff instead of holding locks or listening on a
//! channel, which keeps the protocol portable across storage backends.

use crate::error::{ApiError, ApiResult};
use crate::fetch;
use crate::state::AppState;
use axum::http::HeaderMap;
use knox_core::{encoder, headers};
use knox_metadata::{MetadataError, MetadataStore, ResourceRow, ResourceStatus};
use std::time::Duration;
use time::OffsetDateTime;

/// First delay between completion polls.
pub const POLL_BASE_DELAY: Duration = Duration::from_millis(100);
/// Geometric growth factor applied to the delay after each poll.
pub const POLL_GROWTH_FACTOR: f64 = 1.5;
/// Ceiling on any individual delay.
pub const POLL_MAX_DELAY: Duration = Duration::from_secs(10);
/// Overall deadline on the waiter path. A fetcher that died mid-download
/// leaves its row in the downloading state forever; waiters give up here.
pub const WAIT_DEADLINE: Duration = Duration::from_secs(30 * 60);

/// Produce the completed record for a key, fetching it from upstream if
/// no instance has cached it yet.
///
/// Exactly one caller across all instances becomes the fetcher for an
/// uncached key; everyone else blocks until the fetcher finalizes.
pub async fn obtain(
    state: &AppState,
    key: &str,
    request_headers: &HeaderMap,
) -> ApiResult<ResourceRow> {
    match state.metadata.status_by_key(key).await? {
        ResourceStatus::Cached => Ok(state.metadata.get_completed(key).await?),
        ResourceStatus::Downloading => await_completion(state.metadata.as_ref(), key).await,
        ResourceStatus::NotCached => {
            let url = encoder::decode(key)?;
            let upstream_headers = fetch::upstream_request_headers(request_headers);
            let serialized = headers::write_headers(&upstream_headers)?;
            let now = OffsetDateTime::now_utc();

            match state.metadata.try_claim(&url, key, &serialized, now).await? {
                Some(id) => {
                    // We hold the claim; a failure from here on leaves the
                    // row downloading (no rollback) and surfaces to the
                    // client as an internal error.
                    fetch::fetch_and_store(state, &url, id, &upstream_headers).await?;
                    Ok(state.metadata.get_completed(key).await?)
                }
                // Another caller beat us to the claim; wait on them.
                None => await_completion(state.metadata.as_ref(), key).await,
            }
        }
    }
}

/// Poll until the record for `key` is finalized, with exponential backoff.
pub async fn await_completion(
    metadata: &dyn MetadataStore,
    key: &str,
) -> ApiResult<ResourceRow> {
    let deadline = tokio::time::Instant::now() + WAIT_DEADLINE;
    let mut delay = POLL_BASE_DELAY;

    loop {
        match metadata.get_completed(key).await {
            Ok(row) => return Ok(row),
            // Keep polling while the fetcher is working. NotFound can
            // only mean the row was deleted out from under us; treat it
            // the same way rather than erroring a still-valid wait.
            Err(MetadataError::NotReady(_)) | Err(MetadataError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        if tokio::time::Instant::now() + delay >= deadline {
            return Err(ApiError::ResourceStuck(format!(
                "timed out waiting for another fetcher to complete {key}"
            )));
        }
        tokio::time::sleep(delay).await;
        delay = delay.mul_f64(POLL_GROWTH_FACTOR).min(POLL_MAX_DELAY);
    }
}
