//! Admin listing and soft delete.

use crate::error::ApiResult;
use crate::handlers::cache::{forwarded_proto, request_host};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Html;
use knox_core::encoder;
use std::fmt::Write as _;
use time::format_description::well_known::Rfc2822;
use time::OffsetDateTime;

/// Rows per admin listing page.
const MAX_RESOURCES_PER_PAGE: i64 = 100;

/// Source URLs longer than this are elided in the listing.
const MAX_URL_DISPLAY_SIZE: usize = 160;

const DATA_SIZE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

const ADMIN_HEADER: &str = r#"<!DOCTYPE html>
<html>
    <style>
        body {
            font-family: Sans-Serif;
        }
        table {
            width: 80%;
        }
        table, th, td {
            border: 1px solid black;
            border-collapse: collapse;
            padding: 4px;
            white-space: nowrap;
        }
        .source-url {
            overflow: hidden;
            text-overflow: ellipsis;
        }
    </style>
    <head>
        <title>Knox Admin List</title>
    </head>
    <body>
        <center>
        <div style="overflow-x: auto;">
"#;

const ADMIN_FOOTER: &str = r#"        </center>
    </body>
</html>
"#;

const STATS_TABLE_HEADER: &str = r#"        <table>
            <tr>
                <th>Resource Count</th>
                <th>Disk Usage</th>
            </tr>
"#;

const RESOURCE_TABLE_HEADER: &str = r#"        <table>
            <tr>
                <th>Source Page</th>
                <th>Cached Resource</th>
                <th>Download Initiated</th>
                <th>Download Duration</th>
                <th>Original Size</th>
                <th>Size on Disk</th>
            </tr>
"#;

/// GET /admin/list/{page} - stats plus a page of cached resources,
/// newest download first.
pub async fn admin_list(
    State(state): State<AppState>,
    Path(page): Path<u32>,
    request_headers: HeaderMap,
) -> ApiResult<Html<String>> {
    let stats = state.metadata.stats().await?;
    let rows = state
        .metadata
        .list(page as i64 * MAX_RESOURCES_PER_PAGE, MAX_RESOURCES_PER_PAGE)
        .await?;

    let scheme = forwarded_proto(&request_headers);
    let host = request_host(&request_headers, &state);

    let mut out = String::from(ADMIN_HEADER);
    out.push_str(STATS_TABLE_HEADER);
    let _ = write!(
        out,
        "            <tr><td>{}</td><td>{}</td></tr>\n        </table>\n        <br />\n",
        stats.record_count,
        format_data_size(stats.total_bytes_on_disk)
    );

    out.push_str(RESOURCE_TABLE_HEADER);
    for row in &rows {
        let cached_url = format!("{scheme}://{host}/c/{}", encoder::encode(&row.url));
        let started = row
            .download_started
            .format(&Rfc2822)
            .unwrap_or_else(|_| "-".to_string());
        let duration = row
            .download_duration()
            .map(format_duration)
            .unwrap_or_else(|| "downloading".to_string());
        let _ = write!(
            out,
            concat!(
                "            <tr>",
                "<td class=\"source-url\"><a href=\"{url}\">{display}</a></td>",
                "<td><a href=\"{cached}\">Cached</a></td>",
                "<td>{started}</td>",
                "<td>{duration}</td>",
                "<td>{raw}</td>",
                "<td>{disk}</td>",
                "</tr>\n",
            ),
            url = row.url,
            display = shortened_url(&row.url),
            cached = cached_url,
            started = started,
            duration = duration,
            raw = format_data_size(row.raw_bytes as u64),
            disk = format_data_size(row.bytes_on_disk as u64),
        );
    }
    out.push_str("        </table></div><br />\n");

    if page != 0 {
        let _ = write!(
            out,
            "        <a href=\"/admin/list/{}\">&lt; previous</a> &nbsp;&nbsp;\n",
            page - 1
        );
    }
    if rows.len() as i64 == MAX_RESOURCES_PER_PAGE {
        let _ = write!(out, "        <a href=\"/admin/list/{}\">next &gt;</a>\n", page + 1);
    }
    out.push_str(ADMIN_FOOTER);
    Ok(Html(out))
}

/// DELETE /admin/resource/{id} - soft-delete a cached resource. The row
/// and blob stay on disk but the key becomes claimable again.
pub async fn delete_resource(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state
        .metadata
        .soft_delete(id, OffsetDateTime::now_utc())
        .await?;
    tracing::info!(id, "resource soft-deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Format a byte count with the largest unit that keeps the magnitude
/// under 1024, trimming trailing zeros ("1.5MB", "12B").
fn format_data_size(bytes: u64) -> String {
    let mut magnitude = bytes as f64;
    for unit in &DATA_SIZE_UNITS[..DATA_SIZE_UNITS.len() - 1] {
        if magnitude < 1024.0 {
            return format_unit(magnitude, unit);
        }
        magnitude /= 1024.0;
    }
    format_unit(magnitude, DATA_SIZE_UNITS[DATA_SIZE_UNITS.len() - 1])
}

fn format_unit(magnitude: f64, unit: &str) -> String {
    let formatted = format!("{magnitude:.2}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed}{unit}")
}

fn format_duration(duration: time::Duration) -> String {
    format!("{:.2}s", duration.as_seconds_f64())
}

fn shortened_url(url: &str) -> String {
    if url.len() <= MAX_URL_DISPLAY_SIZE {
        return url.to_string();
    }
    let mut cut = MAX_URL_DISPLAY_SIZE;
    while !url.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &url[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_sizes_use_the_largest_fitting_unit() {
        assert_eq!(format_data_size(0), "0B");
        assert_eq!(format_data_size(12), "12B");
        assert_eq!(format_data_size(1024), "1KB");
        assert_eq!(format_data_size(1536), "1.5KB");
        assert_eq!(format_data_size(1024 * 1024), "1MB");
        assert_eq!(format_data_size(5 * 1024 * 1024 * 1024), "5GB");
    }

    #[test]
    fn short_urls_are_untouched() {
        assert_eq!(shortened_url("http://a/b"), "http://a/b");
    }

    #[test]
    fn long_urls_are_elided() {
        let long = format!("http://example.com/{}", "x".repeat(200));
        let short = shortened_url(&long);
        assert!(short.ends_with("..."));
        assert_eq!(short.len(), MAX_URL_DISPLAY_SIZE + 3);
    }
}
