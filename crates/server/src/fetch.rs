//! Upstream fetcher: downloads a claimed resource into the blob store.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use futures::StreamExt;
use knox_core::{headers, FILTERED_RESPONSE_HEADERS};
use time::OffsetDateTime;

/// Build the header map sent upstream, propagating the client's
/// User-Agent when it supplied one.
pub fn upstream_request_headers(client_headers: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(agent) = client_headers.get(USER_AGENT) {
        headers.insert(USER_AGENT, agent.clone());
    }
    headers
}

/// Fetch `url` and stream its body into the blob for `id`, then finalize
/// the metadata row.
///
/// The response header block is filtered before it is stored, so hop
/// headers such as `Date` and `Via` never reach later clients. Any
/// failure before finalization aborts the blob temp file and leaves the
/// row in the downloading state.
pub async fn fetch_and_store(
    state: &AppState,
    url: &str,
    id: i64,
    request_headers: &HeaderMap,
) -> ApiResult<()> {
    let response = state
        .http
        .get(url)
        .headers(request_headers.clone())
        .send()
        .await
        .map_err(|e| ApiError::UpstreamFetch(format!("GET {url}: {e}")))?;

    tracing::info!(url, id, status = %response.status(), "caching resource");

    let mut response_headers = response.headers().clone();
    for name in FILTERED_RESPONSE_HEADERS {
        response_headers.remove(name);
    }
    let serialized = headers::write_headers(&response_headers)?;

    let mut writer = state.blobs.create(id).await?;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                writer.abort().await.ok();
                return Err(ApiError::UpstreamFetch(format!("reading body of {url}: {e}")));
            }
        };
        if let Err(e) = writer.write(&chunk).await {
            writer.abort().await.ok();
            return Err(e.into());
        }
    }

    let sizes = writer.finish().await?;
    state
        .metadata
        .finalize_claim(
            id,
            &serialized,
            sizes.raw_bytes as i64,
            sizes.bytes_on_disk as i64,
            OffsetDateTime::now_utc(),
        )
        .await?;

    tracing::info!(
        url,
        id,
        raw_bytes = sizes.raw_bytes,
        bytes_on_disk = sizes.bytes_on_disk,
        "resource cached"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn user_agent_is_propagated() {
        let mut client = HeaderMap::new();
        client.insert(USER_AGENT, HeaderValue::from_static("test-agent/1.0"));
        client.insert("cookie", HeaderValue::from_static("secret=1"));

        let upstream = upstream_request_headers(&client);
        assert_eq!(upstream.get(USER_AGENT).unwrap(), "test-agent/1.0");
        // Nothing else crosses over.
        assert_eq!(upstream.len(), 1);
    }

    #[test]
    fn absent_user_agent_sends_empty_headers() {
        let upstream = upstream_request_headers(&HeaderMap::new());
        assert!(upstream.is_empty());
    }
}
