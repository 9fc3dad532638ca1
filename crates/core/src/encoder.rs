//! Bijective encoding between source URLs and opaque cache keys.
//!
//! The key is the URL-safe, unpadded base64 form of the source URL, so it
//! can appear as the final segment of a `/c/<key>` path without further
//! escaping. `decode` is a full inverse of `encode`: the original URL is
//! always recoverable from a key alone, which is what lets an instance
//! fetch a resource on demand when only the key is known. A hash would
//! not be invertible and is deliberately not used here.

use crate::error::{Error, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

/// Encode a source URL into its cache key.
pub fn encode(url: &str) -> String {
    URL_SAFE_NO_PAD.encode(url.as_bytes())
}

/// Decode a cache key back into the source URL it was created from.
///
/// Fails with [`Error::InvalidKey`] when the input is not a well-formed
/// encoding (bad alphabet, stray padding, or a non-UTF-8 payload).
pub fn decode(key: &str) -> Result<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(key.as_bytes())
        .map_err(|e| Error::InvalidKey(format!("{key}: {e}")))?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidKey(format!("{key}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_recovers_url() {
        let urls = [
            "http://example.com/",
            "https://example.com/a/b?q=1&r=2#frag",
            "http://host:8080/path with spaces",
            "https://ünïcode.example/päge",
        ];
        for url in urls {
            assert_eq!(decode(&encode(url)).unwrap(), url);
        }
    }

    #[test]
    fn key_is_path_safe() {
        let key = encode("https://example.com/a/b?q=1&r=/slashes+plus");
        assert!(
            key.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "key contains unsafe characters: {key}"
        );
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode("not!base64").is_err());
        // Padded input is not a valid key in the unpadded alphabet.
        assert!(decode("aGVsbG8=").is_err());
        // Valid base64 of invalid UTF-8.
        let bad = URL_SAFE_NO_PAD.encode([0xff, 0xfe, 0xfd]);
        assert!(decode(&bad).is_err());
    }
}
