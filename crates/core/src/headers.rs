//! Stored header-block wire format.
//!
//! Headers are persisted as a sequence of `Key: Value` lines, each
//! CRLF-terminated, with a trailing empty CRLF marking the end of the
//! block. A key with multiple values repeats the line. Parsing is
//! lenient: whitespace around the separating colon is stripped, and only
//! the *first* colon separates. Later colons belong to the value, so
//! `h: i : j` parses to `"h" -> "i : j"`. A non-empty line without any
//! colon is a parse error.

use crate::error::{Error, Result};
use http::header::{HeaderMap, HeaderName, HeaderValue};

/// Serialize a header map into the stored block form.
pub fn write_headers(headers: &HeaderMap) -> Result<String> {
    let mut out = String::new();
    for (name, value) in headers.iter() {
        let value = value
            .to_str()
            .map_err(|e| Error::HeaderParse(format!("non-text value for {name}: {e}")))?;
        out.push_str(name.as_str());
        out.push_str(": ");
        out.push_str(value);
        out.push_str("\r\n");
    }
    out.push_str("\r\n");
    Ok(out)
}

/// Parse a stored block back into a header map.
pub fn parse_headers(block: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for line in block.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            break;
        }
        let colon = line
            .find(':')
            .ok_or_else(|| Error::HeaderParse(format!("no colon in header line: {line}")))?;
        let key = line[..colon].trim_end_matches([' ', '\t']);
        let value = line[colon + 1..].trim_start_matches([' ', '\t']);
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| Error::HeaderParse(format!("bad header name {key:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::HeaderParse(format!("bad header value for {key}: {e}")))?;
        headers.append(name, value);
    }
    Ok(headers)
}
