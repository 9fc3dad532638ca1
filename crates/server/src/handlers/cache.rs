//! Cache read path: GET /c/{key}.

use crate::error::{ApiError, ApiResult};
use crate::flight;
use crate::rewrite;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_TYPE, HOST};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use knox_core::headers;
use knox_metadata::ResourceRow;
use url::Url;

/// GET /c/{key} - serve a cached resource, fetching it first if needed.
///
/// The first request for a key claims and downloads it; concurrent
/// requests for the same key block until that download finalizes, then
/// everyone serves from the store.
pub async fn serve_cached(
    State(state): State<AppState>,
    Path(key): Path<String>,
    request_headers: HeaderMap,
) -> ApiResult<Response> {
    let row = flight::obtain(&state, &key, &request_headers).await?;
    serve_resource(&state, row, &request_headers).await
}

async fn serve_resource(
    state: &AppState,
    row: ResourceRow,
    request_headers: &HeaderMap,
) -> ApiResult<Response> {
    let stored = headers::parse_headers(&row.response_headers)?;
    let reader = state.blobs.open(row.id).await?;
    tracing::info!(url = %row.url, key = %row.key, "serving cached resource");

    let mut response = if is_html(&stored) {
        let body = reader.read_to_end().await?;
        let base = Url::parse(&row.url)
            .map_err(|e| ApiError::Internal(format!("stored url {} unparseable: {e}", row.url)))?;
        let scheme = forwarded_proto(request_headers);
        let host = request_host(request_headers, state);
        let rewritten = rewrite::rewrite_html(&body, &base, scheme, &host)
            .map_err(|e| ApiError::Internal(format!("failed to transform html: {e}")))?;
        (StatusCode::OK, Html(rewritten)).into_response()
    } else {
        (StatusCode::OK, Body::from_stream(reader.into_stream())).into_response()
    };

    // The stored block was filtered at cache time; replay it verbatim.
    // Content-Type in particular must win over the default axum set.
    for name in stored.keys() {
        response.headers_mut().remove(name);
    }
    for (name, value) in stored.iter() {
        response.headers_mut().append(name.clone(), value.clone());
    }
    Ok(response)
}

/// Decide whether a stored response is HTML from its content type.
/// Missing or unparseable content types are treated as HTML.
fn is_html(stored: &HeaderMap) -> bool {
    match stored.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        Some(raw) => match raw.parse::<mime::Mime>() {
            Ok(media_type) => media_type.essence_str() == "text/html",
            Err(_) => true,
        },
        None => true,
    }
}

/// Scheme the client reached us on, from the forwarded-protocol header.
pub fn forwarded_proto(request_headers: &HeaderMap) -> &str {
    request_headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http")
}

/// Host embedded into rewritten links: the inbound Host header, falling
/// back to the configured advertise address.
pub fn request_host(request_headers: &HeaderMap, state: &AppState) -> String {
    request_headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(|h| h.to_string())
        .unwrap_or_else(|| state.config.server.advertise_address.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn html_detection_follows_content_type_essence() {
        let mut stored = HeaderMap::new();
        stored.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        assert!(is_html(&stored));

        stored.insert(CONTENT_TYPE, HeaderValue::from_static("image/png"));
        assert!(!is_html(&stored));
    }

    #[test]
    fn missing_or_garbled_content_type_is_html() {
        assert!(is_html(&HeaderMap::new()));

        let mut stored = HeaderMap::new();
        stored.insert(CONTENT_TYPE, HeaderValue::from_static("not a mime"));
        assert!(is_html(&stored));
    }

    #[test]
    fn forwarded_proto_defaults_to_http() {
        assert_eq!(forwarded_proto(&HeaderMap::new()), "http");

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(forwarded_proto(&headers), "https");
    }
}
