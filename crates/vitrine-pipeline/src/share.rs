//! Share-link encoding.
//!
//! A share link carries either the full source (`?code=...`) or an example
//! slug (`?example=...`). The code form is URL-safe base64 over UTF-8 —
//! reversible for any Unicode text, including the empty string.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// What a share link carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareLink {
    /// Full source text.
    Code(String),
    /// Example slug.
    Example(String),
}

/// Encode source text into the URL-safe compact form.
pub fn encode_share(text: &str) -> String {
    URL_SAFE_NO_PAD.encode(text.as_bytes())
}

/// Decode the compact form back to source text. `None` for anything that is
/// not valid base64-encoded UTF-8.
pub fn decode_share(encoded: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(encoded.as_bytes()).ok()?;
    String::from_utf8(bytes).ok()
}

/// Parse a query string (with or without the leading `?`). `code` wins over
/// `example` when both are present.
pub fn parse_query(query: &str) -> Option<ShareLink> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut example = None;
    for pair in query.split('&') {
        if let Some(encoded) = pair.strip_prefix("code=") {
            if let Some(text) = decode_share(encoded) {
                return Some(ShareLink::Code(text));
            }
        } else if let Some(slug) = pair.strip_prefix("example=") {
            example = Some(ShareLink::Example(slug.to_string()));
        }
    }
    example
}

/// Render a share link as a query string.
pub fn to_query(link: &ShareLink) -> String {
    match link {
        ShareLink::Code(text) => format!("?code={}", encode_share(text)),
        ShareLink::Example(slug) => format!("?example={slug}"),
    }
}
