//! Small helpers shared by the listing and object paths.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::error::GatewayError;

/// Content type for keys with a `.yaml`/`.yml` extension. Browsers render it inline.
pub const YAML_CONTENT_TYPE: &str = "text/plain+yaml";

/// Characters left as-is by [`url_encode`]: unreserved characters plus `/`.
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

// ---------------------------------------------------------------------------
// Continuation tokens
// ---------------------------------------------------------------------------

/// Encode a listing boundary (the last key or common prefix returned) as an opaque token.
///
/// # Examples
///
/// ```
/// use s3gate_core::utils::{decode_continuation_token, encode_continuation_token};
///
/// let token = encode_continuation_token("photos/2024/");
/// assert_eq!(decode_continuation_token(&token).unwrap(), "photos/2024/");
/// ```
#[must_use]
pub fn encode_continuation_token(boundary: &str) -> String {
    URL_SAFE_NO_PAD.encode(boundary.as_bytes())
}

/// Decode a continuation token back into its boundary key.
pub fn decode_continuation_token(token: &str) -> Result<String, GatewayError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token.trim_end_matches('='))
        .map_err(|_| GatewayError::InvalidArgument("Invalid continuation token".to_owned()))?;
    String::from_utf8(bytes).map_err(|_| {
        GatewayError::InvalidArgument("Continuation token contains invalid UTF-8".to_owned())
    })
}

// ---------------------------------------------------------------------------
// encoding-type=url
// ---------------------------------------------------------------------------

/// Percent-encode a key the way S3 does for `encoding-type=url`: `/` is kept and spaces
/// become `+`.
///
/// ```
/// use s3gate_core::utils::url_encode;
///
/// assert_eq!(url_encode("my dir/a&b.txt"), "my+dir/a%26b.txt");
/// ```
#[must_use]
pub fn url_encode(value: &str) -> String {
    utf8_percent_encode(value, KEY_ENCODE_SET)
        .to_string()
        .replace("%20", "+")
}

// ---------------------------------------------------------------------------
// Content type
// ---------------------------------------------------------------------------

/// Guess the `Content-Type` of a key from its extension.
#[must_use]
pub fn guess_content_type(key: &str) -> String {
    let name = basename(key);
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".yaml") || lower.ends_with(".yml") {
        return YAML_CONTENT_TYPE.to_owned();
    }
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_owned()
}

/// `Content-Disposition` for a response of the given content type. Only opaque binary
/// content is forced to download.
#[must_use]
pub fn content_disposition(key: &str, content_type: &str) -> Option<String> {
    (content_type == mime::APPLICATION_OCTET_STREAM.essence_str()).then(|| {
        let name = basename(key).replace('"', "");
        format!("attachment; filename=\"{name}\"")
    })
}

/// Last path segment of a key.
#[must_use]
pub fn basename(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
