//! Credential-stripping cache key generation.
//!
//! The fingerprint computed here is the key the cache transport stores
//! entries under, reproduced locally so cache existence can be checked
//! without issuing a request.

use sha2::{Digest, Sha256};
use url::Url;

/// Query parameter carrying the API credential. Stripped from every URL
/// before a key is derived or an entry is persisted.
pub const CREDENTIAL_PARAM: &str = "apikey";

/// Remove the credential parameter from a URL's query string.
///
/// Matching is case-insensitive on the parameter name. Remaining
/// parameters are re-encoded in their original relative order. Returns
/// the input unchanged when it does not parse as a URL.
pub fn strip_api_key_param(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(name, _)| !name.eq_ignore_ascii_case(CREDENTIAL_PARAM))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query.extend_pairs(kept.iter().map(|(name, value)| (name.as_str(), value.as_str())));
        parsed.set_query(Some(&query.finish()));
    }

    parsed.to_string()
}

/// Compute the cache fingerprint for a request.
///
/// SHA-256 over the method and the sanitized URL, hex-encoded. The same
/// request with and without its credential parameter hashes identically.
pub fn fingerprint(method: &str, url: &str) -> String {
    let sanitized = strip_api_key_param(url);
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(sanitized.as_bytes());
    hex::encode(hasher.finalize())
}
