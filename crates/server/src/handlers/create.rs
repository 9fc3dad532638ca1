//! User-facing create form: GET / and GET /?url=...

use crate::error::{ApiError, ApiResult};
use crate::flight;
use crate::handlers::cache::{forwarded_proto, request_host};
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Html;
use knox_core::encoder;
use std::collections::HashMap;
use url::Url;

const PAGE_HEADER: &str = r#"<!DOCTYPE html>
<html>
    <head><title>Knox Cache</title></head>
    <body>
"#;

const CREATE_FORM: &str = r#"        <style>
        .input-form {
            position: fixed;
            left: 0;
            top: 20%;
            width: 100%;
            text-align: center;
        }
        body {
            font-family: Sans-Serif;
        }
        </style>
        <div class="input-form">
            <form>
                <input type="text" size="80" name="url"><br /><br />
                <input type="submit" value="Create">
            </form>
        </div>
"#;

const PAGE_FOOTER: &str = r#"        <style>
        .footer {
            position: fixed;
            left: 0;
            bottom: 0;
            width: 100%;
            text-align: center;
        }
        </style>
        <div class="footer">
            <p><a href="admin/list/0">Cached Resources</a></p>
        </div>
    </body>
</html>
"#;

/// GET / - render the create form; with a `url` query parameter, cache
/// that URL through the regular single-flight path and link the result.
pub async fn create_page(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    request_headers: HeaderMap,
) -> ApiResult<Html<String>> {
    if params.is_empty() {
        return Ok(Html(format!("{PAGE_HEADER}{CREATE_FORM}{PAGE_FOOTER}")));
    }

    if params.len() != 1 {
        return Err(ApiError::BadRequest("invalid query".to_string()));
    }
    let url = params
        .get("url")
        .ok_or_else(|| ApiError::BadRequest("invalid query".to_string()))?;
    Url::parse(url).map_err(|e| ApiError::BadRequest(format!("invalid url {url}: {e}")))?;

    let key = encoder::encode(url);
    flight::obtain(&state, &key, &request_headers).await?;

    let scheme = forwarded_proto(&request_headers);
    let host = request_host(&request_headers, &state);
    let cached_url = format!("{scheme}://{host}/c/{key}");
    let success = format!("        <br />Created <a href=\"{cached_url}\">{cached_url}</a>\n");
    Ok(Html(format!(
        "{PAGE_HEADER}{CREATE_FORM}{success}{PAGE_FOOTER}"
    )))
}
